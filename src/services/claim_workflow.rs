//! Actor-aware claim operations.
//!
//! The acting identity is always passed in explicitly; nothing here reads
//! session state.

use sqlx::SqlitePool;

use crate::error::{LedgerError, LedgerResult};
use crate::models::claim::{Claim, ClaimId, NewClaim, ReviewDecision};
use crate::models::identity::AuthenticatedIdentity;

fn require_admin(actor: &AuthenticatedIdentity) -> LedgerResult<()> {
    if !actor.is_admin() {
        tracing::warn!(identity_id = actor.id, "Non-admin attempted a claim review");
        return Err(LedgerError::Forbidden(
            "Admin access required.".to_string(),
        ));
    }
    Ok(())
}

fn non_blank(notes: Option<&str>) -> Option<&str> {
    notes.map(str::trim).filter(|n| !n.is_empty())
}

/// Files a claim on behalf of the actor's own member record.
pub async fn submit(
    pool: &SqlitePool,
    actor: &AuthenticatedIdentity,
    claim: NewClaim,
) -> LedgerResult<ClaimId> {
    let member_id = actor.member_id.ok_or_else(|| {
        LedgerError::Forbidden("Admins cannot submit claims.".to_string())
    })?;

    Claim::submit(pool, member_id, claim).await
}

/// Approves a pending claim. Blank notes are stored as no notes.
#[tracing::instrument(skip(pool, actor, notes), fields(admin_id = actor.id))]
pub async fn approve(
    pool: &SqlitePool,
    actor: &AuthenticatedIdentity,
    claim_id: ClaimId,
    notes: Option<&str>,
) -> LedgerResult<bool> {
    require_admin(actor)?;
    Claim::review(pool, claim_id, ReviewDecision::Approve, actor.id, non_blank(notes)).await
}

/// Declines a pending claim. A reason is mandatory.
#[tracing::instrument(skip(pool, actor, notes), fields(admin_id = actor.id))]
pub async fn decline(
    pool: &SqlitePool,
    actor: &AuthenticatedIdentity,
    claim_id: ClaimId,
    notes: &str,
) -> LedgerResult<bool> {
    require_admin(actor)?;
    let Some(notes) = non_blank(Some(notes)) else {
        return Err(LedgerError::Validation(
            "Please provide a reason for declining the claim.".to_string(),
        ));
    };
    Claim::review(pool, claim_id, ReviewDecision::Decline, actor.id, Some(notes)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::claim::{ClaimPriority, ClaimStatus};
    use crate::services::credentials::{
        authenticate, create_account, ensure_default_admin, NewAccount, DEFAULT_ADMIN_PASSWORD,
    };
    use rust_decimal::Decimal;

    struct Fixture {
        pool: SqlitePool,
        admin: AuthenticatedIdentity,
        alice: AuthenticatedIdentity,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        ensure_default_admin(&pool, DEFAULT_ADMIN_PASSWORD).await.unwrap();
        create_account(
            &pool,
            NewAccount {
                username: "alice".to_string(),
                password: "pw1".to_string(),
                phone: "0821234567".to_string(),
                email: "a@x.com".to_string(),
                monthly_amount: Decimal::new(5000, 2),
            },
        )
        .await
        .unwrap();

        let admin = authenticate(&pool, "admin", DEFAULT_ADMIN_PASSWORD).await.unwrap();
        let alice = authenticate(&pool, "alice", "pw1").await.unwrap();
        Fixture { pool, admin, alice }
    }

    fn flu_claim() -> NewClaim {
        NewClaim {
            amount: Decimal::new(20000, 2),
            description: "flu treatment".to_string(),
            claim_type: "General".to_string(),
            hospital: None,
            priority: ClaimPriority::Normal,
        }
    }

    #[tokio::test]
    async fn test_admin_approves_with_notes() {
        let f = fixture().await;
        let id = submit(&f.pool, &f.alice, flu_claim()).await.unwrap();

        assert!(approve(&f.pool, &f.admin, id, Some("ok")).await.unwrap());

        let claim = Claim::find_by_id(&f.pool, id).await.unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Approved);
        assert_eq!(claim.reviewed_by, Some(f.admin.id));
        assert_eq!(claim.admin_notes.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_approve_blank_notes_stored_as_null() {
        let f = fixture().await;
        let id = submit(&f.pool, &f.alice, flu_claim()).await.unwrap();

        assert!(approve(&f.pool, &f.admin, id, Some("   ")).await.unwrap());
        let claim = Claim::find_by_id(&f.pool, id).await.unwrap().unwrap();
        assert_eq!(claim.admin_notes, None);
    }

    #[tokio::test]
    async fn test_decline_requires_reason() {
        let f = fixture().await;
        let id = submit(&f.pool, &f.alice, flu_claim()).await.unwrap();

        assert!(matches!(
            decline(&f.pool, &f.admin, id, "  ").await,
            Err(LedgerError::Validation(_))
        ));
        let claim = Claim::find_by_id(&f.pool, id).await.unwrap().unwrap();
        assert!(claim.is_pending());

        assert!(decline(&f.pool, &f.admin, id, "no receipt").await.unwrap());
        let claim = Claim::find_by_id(&f.pool, id).await.unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Declined);
    }

    #[tokio::test]
    async fn test_members_cannot_review() {
        let f = fixture().await;
        let id = submit(&f.pool, &f.alice, flu_claim()).await.unwrap();

        assert!(matches!(
            approve(&f.pool, &f.alice, id, None).await,
            Err(LedgerError::Forbidden(_))
        ));
        assert!(matches!(
            decline(&f.pool, &f.alice, id, "nope").await,
            Err(LedgerError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_cannot_submit() {
        let f = fixture().await;
        assert!(matches!(
            submit(&f.pool, &f.admin, flu_claim()).await,
            Err(LedgerError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_second_review_is_refused() {
        let f = fixture().await;
        let id = submit(&f.pool, &f.alice, flu_claim()).await.unwrap();

        assert!(approve(&f.pool, &f.admin, id, None).await.unwrap());
        assert!(!decline(&f.pool, &f.admin, id, "too late").await.unwrap());

        let claim = Claim::find_by_id(&f.pool, id).await.unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Approved);
    }
}
