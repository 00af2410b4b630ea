use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::fmt;

use super::identity::IdentityId;
use super::member::MemberId;
use super::money::{from_cents, positive_cents};
use crate::error::{LedgerError, LedgerResult};

pub type ClaimId = i64;

pub const DEFAULT_CLAIM_TYPE: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Declined,
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimStatus::Pending => f.write_str("pending"),
            ClaimStatus::Approved => f.write_str("approved"),
            ClaimStatus::Declined => f.write_str("declined"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClaimPriority {
    #[default]
    Normal,
    Urgent,
    Emergency,
}

impl fmt::Display for ClaimPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimPriority::Normal => f.write_str("normal"),
            ClaimPriority::Urgent => f.write_str("urgent"),
            ClaimPriority::Emergency => f.write_str("emergency"),
        }
    }
}

impl std::str::FromStr for ClaimPriority {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "normal" => Ok(ClaimPriority::Normal),
            "urgent" => Ok(ClaimPriority::Urgent),
            "emergency" => Ok(ClaimPriority::Emergency),
            other => Err(LedgerError::Validation(format!("Unknown priority: {other}"))),
        }
    }
}

/// Terminal outcome of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Decline,
}

impl ReviewDecision {
    pub fn status(self) -> ClaimStatus {
        match self {
            ReviewDecision::Approve => ClaimStatus::Approved,
            ReviewDecision::Decline => ClaimStatus::Declined,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Claim {
    pub id: ClaimId,
    pub member_id: MemberId,
    pub amount_cents: i64,
    pub description: String,
    pub claim_type: String,
    pub hospital: Option<String>,
    pub priority: ClaimPriority,
    pub status: ClaimStatus,
    pub reviewed_by: Option<IdentityId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pending claim with the claimant's contact fields (admin work queue).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingClaim {
    #[sqlx(flatten)]
    pub claim: Claim,
    pub member_name: String,
    pub member_phone: String,
    pub member_email: String,
}

/// Claim with the claimant's name and, once reviewed, the reviewer's
/// username.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClaimWithReviewer {
    #[sqlx(flatten)]
    pub claim: Claim,
    pub member_name: String,
    pub reviewer_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClaimActivity {
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub status: ClaimStatus,
    pub member_name: String,
}

impl ClaimActivity {
    pub fn amount(&self) -> Decimal {
        from_cents(self.amount_cents)
    }
}

#[derive(Debug, Clone)]
pub struct NewClaim {
    pub amount: Decimal,
    pub description: String,
    pub claim_type: String,
    pub hospital: Option<String>,
    pub priority: ClaimPriority,
}

impl Claim {
    pub fn amount(&self) -> Decimal {
        from_cents(self.amount_cents)
    }

    pub fn is_pending(&self) -> bool {
        self.status == ClaimStatus::Pending
    }

    /// Files a new pending claim for a member
    #[tracing::instrument(skip(pool, data), fields(amount = %data.amount))]
    pub async fn submit(pool: &SqlitePool, member_id: MemberId, data: NewClaim) -> LedgerResult<ClaimId> {
        let amount_cents = positive_cents(data.amount)?;

        let description = data.description.trim();
        if description.is_empty() {
            return Err(LedgerError::Validation("Description is required.".to_string()));
        }

        let claim_type = match data.claim_type.trim() {
            "" => DEFAULT_CLAIM_TYPE,
            other => other,
        };
        let hospital = data
            .hospital
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty());

        let result = sqlx::query(
            r#"
            INSERT INTO claims (member_id, amount_cents, description, claim_type, hospital, priority, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)
            "#,
        )
        .bind(member_id)
        .bind(amount_cents)
        .bind(description)
        .bind(claim_type)
        .bind(hospital)
        .bind(data.priority)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        let claim_id = result.last_insert_rowid();
        tracing::info!(claim_id, member_id, "Claim submitted");

        Ok(claim_id)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: ClaimId) -> LedgerResult<Option<Self>> {
        let claim = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM claims WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(claim)
    }

    /// Pending claims, newest first
    pub async fn list_pending(pool: &SqlitePool) -> LedgerResult<Vec<PendingClaim>> {
        let claims = sqlx::query_as::<_, PendingClaim>(
            r#"
            SELECT c.*, m.name AS member_name, m.phone AS member_phone, m.email AS member_email
            FROM claims c
            JOIN members m ON c.member_id = m.id
            WHERE c.status = 'pending'
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(claims)
    }

    /// Every claim, newest first
    pub async fn list_all(pool: &SqlitePool) -> LedgerResult<Vec<ClaimWithReviewer>> {
        let claims = sqlx::query_as::<_, ClaimWithReviewer>(
            r#"
            SELECT c.*, m.name AS member_name, u.username AS reviewer_name
            FROM claims c
            JOIN members m ON c.member_id = m.id
            LEFT JOIN users u ON c.reviewed_by = u.id
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(claims)
    }

    pub async fn list_for_member(pool: &SqlitePool, member_id: MemberId) -> LedgerResult<Vec<Self>> {
        let claims = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM claims
            WHERE member_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;

        Ok(claims)
    }

    /// Most recent claims of any status
    pub async fn recent(pool: &SqlitePool, limit: i64) -> LedgerResult<Vec<ClaimActivity>> {
        let rows = sqlx::query_as::<_, ClaimActivity>(
            r#"
            SELECT c.amount_cents, c.created_at, c.status, m.name AS member_name
            FROM claims c
            JOIN members m ON c.member_id = m.id
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Records a review decision.
    ///
    /// Only pending claims transition; a missing or already reviewed claim
    /// affects no rows and yields `false`. Role checks and the notes rule
    /// live in `services::claim_workflow`.
    pub async fn review(
        pool: &SqlitePool,
        id: ClaimId,
        decision: ReviewDecision,
        reviewer_id: IdentityId,
        notes: Option<&str>,
    ) -> LedgerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE claims
            SET status = ?1, reviewed_by = ?2, reviewed_at = ?3, admin_notes = ?4
            WHERE id = ?5 AND status = 'pending'
            "#,
        )
        .bind(decision.status())
        .bind(reviewer_id)
        .bind(Utc::now())
        .bind(notes)
        .bind(id)
        .execute(pool)
        .await?;

        let updated = result.rows_affected() > 0;
        tracing::info!(
            claim_id = id,
            reviewer_id,
            status = %decision.status(),
            updated,
            "Claim review applied"
        );

        Ok(updated)
    }
}
