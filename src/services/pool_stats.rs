use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::LedgerResult;
use crate::models::claim::{Claim, ClaimActivity};
use crate::models::contribution::{Contribution, ContributionActivity};
use crate::models::money::from_cents;

/// Number of entries shown in each activity feed.
pub const RECENT_ACTIVITY_LIMIT: i64 = 5;

/// Pool figures derived from the journal, claims and payouts on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub current_balance: Decimal,
    pub total_contributions: Decimal,
    pub total_payouts: Decimal,
    pub member_count: i64,
    pub pending_claims: i64,
    pub approved_claims: i64,
    pub total_claims: i64,
    pub monthly_expected: Decimal,
}

async fn scalar(conn: &mut SqliteConnection, sql: &str) -> LedgerResult<i64> {
    let value: i64 = sqlx::query_scalar(sql).fetch_one(conn).await?;
    Ok(value)
}

impl PoolStats {
    /// Computes the snapshot. Storage failures are logged and produce the
    /// zero snapshot so dashboards always render.
    pub async fn snapshot(pool: &SqlitePool) -> Self {
        match Self::compute(pool).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to empty pool statistics");
                Self::default()
            }
        }
    }

    async fn compute(pool: &SqlitePool) -> LedgerResult<Self> {
        // One read transaction so every figure sees the same state.
        let mut tx = pool.begin().await?;

        let member_count = scalar(&mut tx, "SELECT COUNT(*) FROM members WHERE status = 'active'").await?;
        let monthly_expected = scalar(
            &mut tx,
            "SELECT COALESCE(SUM(monthly_amount_cents), 0) FROM members WHERE status = 'active'",
        )
        .await?;
        let total_contributions = scalar(
            &mut tx,
            "SELECT COALESCE(SUM(amount_cents), 0) FROM contributions WHERE status = 'paid'",
        )
        .await?;
        let total_payouts = scalar(
            &mut tx,
            "SELECT COALESCE(SUM(amount_cents), 0) FROM payouts WHERE status = 'paid'",
        )
        .await?;
        let pending_claims = scalar(&mut tx, "SELECT COUNT(*) FROM claims WHERE status = 'pending'").await?;
        let approved_claims = scalar(&mut tx, "SELECT COUNT(*) FROM claims WHERE status = 'approved'").await?;
        let total_claims = scalar(&mut tx, "SELECT COUNT(*) FROM claims").await?;

        tx.commit().await?;

        Ok(Self {
            current_balance: from_cents(total_contributions - total_payouts),
            total_contributions: from_cents(total_contributions),
            total_payouts: from_cents(total_payouts),
            member_count,
            pending_claims,
            approved_claims,
            total_claims,
            monthly_expected: from_cents(monthly_expected),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecentActivity {
    pub contributions: Vec<ContributionActivity>,
    pub claims: Vec<ClaimActivity>,
}

impl RecentActivity {
    /// Latest paid contributions and latest claims. Each feed falls back to
    /// empty on storage failure.
    pub async fn load(pool: &SqlitePool) -> Self {
        let contributions = Contribution::recent_paid(pool, RECENT_ACTIVITY_LIMIT)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Recent contributions unavailable");
                Vec::new()
            });
        let claims = Claim::recent(pool, RECENT_ACTIVITY_LIMIT)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Recent claims unavailable");
                Vec::new()
            });

        Self {
            contributions,
            claims,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::claim::{ClaimPriority, NewClaim, ReviewDecision};
    use crate::models::contribution::ContributionStatus;
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn seed_member(pool: &SqlitePool, phone: &str, status: &str, monthly_cents: i64) -> i64 {
        sqlx::query(
            "INSERT INTO members (name, phone, email, monthly_amount_cents, status, created_at)
             VALUES (?1, ?1, ?1, ?2, ?3, ?4)",
        )
        .bind(phone)
        .bind(monthly_cents)
        .bind(status)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_empty_store_is_zero() {
        let pool = test_pool().await;
        assert_eq!(PoolStats::snapshot(&pool).await, PoolStats::default());

        let activity = RecentActivity::load(&pool).await;
        assert!(activity.contributions.is_empty());
        assert!(activity.claims.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_degrades_to_zero() {
        let pool = test_pool().await;
        seed_member(&pool, "1", "active", 5000).await;
        pool.close().await;

        assert_eq!(PoolStats::snapshot(&pool).await, PoolStats::default());
        assert!(RecentActivity::load(&pool).await.claims.is_empty());
    }

    #[tokio::test]
    async fn test_counts_and_sums() {
        let pool = test_pool().await;
        let alice = seed_member(&pool, "1", "active", 5000).await;
        seed_member(&pool, "2", "active", 7550).await;
        seed_member(&pool, "3", "inactive", 10000).await;

        Contribution::record(&pool, alice, dec("50.00"), "r1", ContributionStatus::Paid)
            .await
            .unwrap();
        Contribution::record(&pool, alice, dec("20.00"), "r2", ContributionStatus::Pending)
            .await
            .unwrap();

        let claim = |amount: &str| NewClaim {
            amount: dec(amount),
            description: "x".to_string(),
            claim_type: String::new(),
            hospital: None,
            priority: ClaimPriority::Normal,
        };
        let first = Claim::submit(&pool, alice, claim("10")).await.unwrap();
        Claim::submit(&pool, alice, claim("20")).await.unwrap();
        Claim::submit(&pool, alice, claim("30")).await.unwrap();
        let admin = sqlx::query(
            "INSERT INTO users (username, password_hash, user_type, created_at) VALUES ('admin', 'x', 'admin', ?1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();
        assert!(Claim::review(&pool, first, ReviewDecision::Approve, admin, None)
            .await
            .unwrap());

        let stats = PoolStats::snapshot(&pool).await;
        assert_eq!(stats.member_count, 2);
        assert_eq!(stats.monthly_expected, dec("125.50"));
        assert_eq!(stats.total_contributions, dec("50.00"));
        assert_eq!(stats.total_payouts, Decimal::ZERO);
        assert_eq!(stats.current_balance, dec("50.00"));
        assert_eq!(stats.total_claims, 3);
        assert_eq!(stats.pending_claims, 2);
        assert_eq!(stats.approved_claims, 1);
    }

    #[tokio::test]
    async fn test_balance_subtracts_paid_payouts() {
        let pool = test_pool().await;
        let alice = seed_member(&pool, "1", "active", 5000).await;
        Contribution::record(&pool, alice, dec("300"), "r1", ContributionStatus::Paid)
            .await
            .unwrap();
        let claim_id = Claim::submit(
            &pool,
            alice,
            NewClaim {
                amount: dec("120"),
                description: "x".to_string(),
                claim_type: String::new(),
                hospital: None,
                priority: ClaimPriority::Normal,
            },
        )
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO payouts (claim_id, amount_cents, payment_reference, status, created_at)
             VALUES (?1, 12000, 'po-1', 'paid', ?2), (?1, 500, 'po-2', 'pending', ?2)",
        )
        .bind(claim_id)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let stats = PoolStats::snapshot(&pool).await;
        assert_eq!(stats.total_payouts, dec("120"));
        assert_eq!(stats.current_balance, dec("180"));
        assert_eq!(
            stats.current_balance,
            stats.total_contributions - stats.total_payouts
        );
    }
}
