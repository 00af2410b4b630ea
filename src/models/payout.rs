use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::claim::ClaimId;
use super::money::from_cents;
use crate::error::LedgerResult;

pub type PayoutId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Paid,
}

/// A disbursement against an approved claim.
///
/// No operation creates payouts yet; readers must treat the table as
/// possibly empty.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payout {
    pub id: PayoutId,
    pub claim_id: ClaimId,
    pub amount_cents: i64,
    pub payment_reference: String,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payout {
    pub fn amount(&self) -> Decimal {
        from_cents(self.amount_cents)
    }

    pub async fn find_by_claim_id(pool: &SqlitePool, claim_id: ClaimId) -> LedgerResult<Option<Self>> {
        let payout = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payouts WHERE claim_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(claim_id)
        .fetch_optional(pool)
        .await?;

        Ok(payout)
    }
}
