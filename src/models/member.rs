use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::fmt;

use super::identity::IdentityId;
use super::money::from_cents;
use crate::error::{LedgerError, LedgerResult};

pub type MemberId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Inactive,
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberStatus::Active => f.write_str("active"),
            MemberStatus::Inactive => f.write_str("inactive"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub monthly_amount_cents: i64,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

/// A member with counts derived from the journal and the claim table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberSummary {
    #[sqlx(flatten)]
    pub member: Member,
    pub total_claims: i64,
    pub total_contributions: i64,
    pub total_contributed_cents: i64,
}

impl MemberSummary {
    pub fn total_contributed(&self) -> Decimal {
        from_cents(self.total_contributed_cents)
    }
}

#[derive(Debug, Clone)]
pub struct CreateMemberData {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub monthly_amount_cents: i64,
}

/// Accepts digits separated by spaces or hyphens and returns the trimmed
/// number.
pub fn validate_phone(phone: &str) -> LedgerResult<String> {
    let phone = phone.trim();
    let has_digit = phone.chars().any(|c| c.is_ascii_digit());
    let well_formed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-');

    if !has_digit || !well_formed {
        return Err(LedgerError::Validation(
            "Please enter a valid phone number.".to_string(),
        ));
    }

    Ok(phone.to_string())
}

impl Member {
    pub fn monthly_amount(&self) -> Decimal {
        from_cents(self.monthly_amount_cents)
    }

    /// Inserts a member on an open connection so the caller can link an
    /// identity in the same transaction.
    pub(crate) async fn insert(
        conn: &mut SqliteConnection,
        data: &CreateMemberData,
    ) -> LedgerResult<MemberId> {
        if data.monthly_amount_cents < 0 {
            return Err(LedgerError::Validation(
                "Monthly amount cannot be negative".to_string(),
            ));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO members (name, phone, email, monthly_amount_cents, status, created_at)
            VALUES (?1, ?2, ?3, ?4, 'active', ?5)
            "#,
        )
        .bind(&data.name)
        .bind(&data.phone)
        .bind(&data.email)
        .bind(data.monthly_amount_cents)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Finds a member by their internal ID
    pub async fn find_by_id(pool: &SqlitePool, id: MemberId) -> LedgerResult<Option<Self>> {
        let member = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM members WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Finds the member linked to a login identity
    pub async fn find_by_identity_id(
        pool: &SqlitePool,
        identity_id: IdentityId,
    ) -> LedgerResult<Option<Self>> {
        let member = sqlx::query_as::<_, Self>(
            r#"
            SELECT m.*
            FROM members m
            JOIN users u ON u.member_id = m.id
            WHERE u.id = ?1
            "#,
        )
        .bind(identity_id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Lists every member, newest first, with claim and contribution totals
    pub async fn list_with_totals(pool: &SqlitePool) -> LedgerResult<Vec<MemberSummary>> {
        let members = sqlx::query_as::<_, MemberSummary>(
            r#"
            SELECT m.*,
                   (SELECT COUNT(*) FROM claims cl WHERE cl.member_id = m.id) AS total_claims,
                   (SELECT COUNT(*) FROM contributions co WHERE co.member_id = m.id) AS total_contributions,
                   (SELECT COALESCE(SUM(co.amount_cents), 0)
                      FROM contributions co
                     WHERE co.member_id = m.id AND co.status = 'paid') AS total_contributed_cents
            FROM members m
            ORDER BY m.created_at DESC, m.id DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Replaces the member's phone number. Returns `false` when no member
    /// has the given id.
    pub async fn update_phone(pool: &SqlitePool, id: MemberId, phone: &str) -> LedgerResult<bool> {
        let phone = validate_phone(phone)?;

        let result = sqlx::query(
            r#"
            UPDATE members SET phone = ?1 WHERE id = ?2
            "#,
        )
        .bind(&phone)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
