use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::fmt;

use super::member::MemberId;
use super::money::{from_cents, positive_cents};
use crate::error::{LedgerError, LedgerResult};

pub type ContributionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContributionStatus {
    Pending,
    Paid,
}

impl fmt::Display for ContributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContributionStatus::Pending => f.write_str("pending"),
            ContributionStatus::Paid => f.write_str("paid"),
        }
    }
}

/// A journal entry. Entries are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contribution {
    pub id: ContributionId,
    pub member_id: MemberId,
    pub amount_cents: i64,
    pub payment_reference: String,
    pub status: ContributionStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// A paid contribution with the contributing member's name, for activity
/// feeds.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContributionActivity {
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub member_name: String,
}

impl ContributionActivity {
    pub fn amount(&self) -> Decimal {
        from_cents(self.amount_cents)
    }
}

impl Contribution {
    pub fn amount(&self) -> Decimal {
        from_cents(self.amount_cents)
    }

    /// Appends a contribution to the journal.
    ///
    /// `reference` is the idempotency token for the payment event. Returns
    /// `false` without writing when the reference was already recorded or
    /// the member does not exist.
    #[tracing::instrument(skip(pool))]
    pub async fn record(
        pool: &SqlitePool,
        member_id: MemberId,
        amount: Decimal,
        reference: &str,
        status: ContributionStatus,
    ) -> LedgerResult<bool> {
        let amount_cents = positive_cents(amount)?;
        if reference.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Payment reference is required".to_string(),
            ));
        }

        let now = Utc::now();
        let paid_at = (status == ContributionStatus::Paid).then_some(now);

        let result = sqlx::query(
            r#"
            INSERT INTO contributions (member_id, amount_cents, payment_reference, status, created_at, paid_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(member_id)
        .bind(amount_cents)
        .bind(reference)
        .bind(status)
        .bind(now)
        .bind(paid_at)
        .execute(pool)
        .await;

        match result.map_err(LedgerError::from) {
            Ok(_) => {
                tracing::info!(member_id, amount_cents, "Contribution recorded");
                Ok(true)
            }
            Err(LedgerError::Duplicate) => {
                tracing::warn!(member_id, reference, "Payment reference already recorded");
                Ok(false)
            }
            Err(LedgerError::NotFound(_)) => {
                tracing::warn!(member_id, "Contribution for unknown member");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Lists a member's contributions, newest first
    pub async fn list_for_member(pool: &SqlitePool, member_id: MemberId) -> LedgerResult<Vec<Self>> {
        let contributions = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM contributions
            WHERE member_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;

        Ok(contributions)
    }

    /// Most recent paid contributions across all members
    pub async fn recent_paid(pool: &SqlitePool, limit: i64) -> LedgerResult<Vec<ContributionActivity>> {
        let rows = sqlx::query_as::<_, ContributionActivity>(
            r#"
            SELECT c.amount_cents, c.created_at, m.name AS member_name
            FROM contributions c
            JOIN members m ON c.member_id = m.id
            WHERE c.status = 'paid'
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
