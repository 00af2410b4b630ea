//! End-to-end ledger walk-through against the library API.

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;

use healthpool::db;
use healthpool::models::claim::{Claim, ClaimPriority, ClaimStatus, NewClaim};
use healthpool::models::contribution::{Contribution, ContributionStatus};
use healthpool::services::claim_workflow;
use healthpool::services::credentials::{self, NewAccount, DEFAULT_ADMIN_PASSWORD};
use healthpool::services::pool_stats::{PoolStats, RecentActivity};

async fn fresh_pool() -> SqlitePool {
    let pool = db::create_pool("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test]
async fn test_admin_and_alice_scenario() {
    let pool = fresh_pool().await;

    assert!(credentials::ensure_default_admin(&pool, DEFAULT_ADMIN_PASSWORD)
        .await
        .unwrap());
    let admin = credentials::authenticate(&pool, "admin", "admin123")
        .await
        .unwrap();
    assert!(admin.is_admin());

    let alice_id = credentials::create_account(
        &pool,
        NewAccount {
            username: "alice".to_string(),
            password: "pw1".to_string(),
            phone: "0821234567".to_string(),
            email: "a@x.com".to_string(),
            monthly_amount: dec("50.00"),
        },
    )
    .await
    .unwrap();
    let alice = credentials::authenticate(&pool, "alice", "pw1").await.unwrap();
    assert_eq!(alice.member_id, Some(alice_id));

    assert!(Contribution::record(&pool, alice_id, dec("50.00"), "ref-1", ContributionStatus::Paid)
        .await
        .unwrap());

    let stats = PoolStats::snapshot(&pool).await;
    assert_eq!(stats.total_contributions, dec("50.00"));
    assert_eq!(stats.current_balance, dec("50.00"));
    assert_eq!(stats.member_count, 1);

    let claim_id = claim_workflow::submit(
        &pool,
        &alice,
        NewClaim {
            amount: dec("200.00"),
            description: "flu treatment".to_string(),
            claim_type: String::new(),
            hospital: None,
            priority: ClaimPriority::Normal,
        },
    )
    .await
    .unwrap();

    assert!(claim_workflow::approve(&pool, &admin, claim_id, Some("ok"))
        .await
        .unwrap());

    let claims = Claim::list_for_member(&pool, alice_id).await.unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].status, ClaimStatus::Approved);
    assert_eq!(claims[0].reviewed_by, Some(admin.id));
    assert_eq!(claims[0].admin_notes.as_deref(), Some("ok"));

    assert!(Claim::list_pending(&pool).await.unwrap().is_empty());
    let all = Claim::list_all(&pool).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].reviewer_name.as_deref(), Some("admin"));

    let recent = RecentActivity::load(&pool).await;
    assert_eq!(recent.contributions.len(), 1);
    assert_eq!(recent.claims.len(), 1);
    assert_eq!(recent.claims[0].member_name, "alice");

    // Approval does not move money; payouts are not written by any workflow
    let stats = PoolStats::snapshot(&pool).await;
    assert_eq!(stats.approved_claims, 1);
    assert_eq!(stats.pending_claims, 0);
    assert_eq!(stats.current_balance, stats.total_contributions - stats.total_payouts);
}

#[tokio::test]
async fn test_reused_reference_does_not_duplicate() {
    let pool = fresh_pool().await;
    let member_id = credentials::create_account(
        &pool,
        NewAccount {
            username: "bob".to_string(),
            password: "pw".to_string(),
            phone: "0831112222".to_string(),
            email: "b@x.com".to_string(),
            monthly_amount: dec("50"),
        },
    )
    .await
    .unwrap();

    assert!(Contribution::record(&pool, member_id, dec("20"), "ref-9", ContributionStatus::Paid)
        .await
        .unwrap());
    assert!(!Contribution::record(&pool, member_id, dec("20"), "ref-9", ContributionStatus::Paid)
        .await
        .unwrap());

    let history = Contribution::list_for_member(&pool, member_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount(), dec("20"));
    assert_eq!(history[0].status, ContributionStatus::Paid);
}
