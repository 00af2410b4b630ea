use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::fmt;

use super::member::MemberId;
use crate::error::LedgerResult;

pub type IdentityId = i64;

/// Name shown for admin identities that have no member record.
pub const ADMIN_DISPLAY_NAME: &str = "Administrator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Member => f.write_str("member"),
        }
    }
}

/// A login credential record (`users` table).
#[derive(Debug, Clone, FromRow)]
pub struct Identity {
    pub id: IdentityId,
    pub username: String,
    pub password_hash: String,
    #[sqlx(rename = "user_type")]
    pub role: Role,
    pub member_id: Option<MemberId>,
    pub created_at: DateTime<Utc>,
}

/// Identity row joined with the linked member's contact fields.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct IdentityWithMember {
    #[sqlx(flatten)]
    pub identity: Identity,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// The resolved principal carried in the session and passed explicitly to
/// every operation that needs an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub id: IdentityId,
    pub username: String,
    pub role: Role,
    pub member_id: Option<MemberId>,
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl AuthenticatedIdentity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<IdentityWithMember> for AuthenticatedIdentity {
    fn from(row: IdentityWithMember) -> Self {
        let IdentityWithMember {
            identity,
            name,
            phone,
            email,
        } = row;

        match identity.member_id {
            Some(member_id) => Self {
                id: identity.id,
                username: identity.username,
                role: identity.role,
                member_id: Some(member_id),
                name: name.unwrap_or_default(),
                phone: phone.unwrap_or_default(),
                email: email.unwrap_or_default(),
            },
            None => Self {
                id: identity.id,
                username: identity.username,
                role: identity.role,
                member_id: None,
                name: ADMIN_DISPLAY_NAME.to_string(),
                phone: String::new(),
                email: String::new(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateIdentityData {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub member_id: Option<MemberId>,
}

impl Identity {
    pub(crate) async fn insert(
        conn: &mut SqliteConnection,
        data: &CreateIdentityData,
    ) -> LedgerResult<IdentityId> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, user_type, member_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&data.username)
        .bind(&data.password_hash)
        .bind(data.role)
        .bind(data.member_id)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_username(pool: &SqlitePool, username: &str) -> LedgerResult<Option<Self>> {
        let identity = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM users WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(identity)
    }

    pub(crate) async fn find_with_member(
        pool: &SqlitePool,
        username: &str,
    ) -> LedgerResult<Option<IdentityWithMember>> {
        let row = sqlx::query_as::<_, IdentityWithMember>(
            r#"
            SELECT u.*, m.name AS name, m.phone AS phone, m.email AS email
            FROM users u
            LEFT JOIN members m ON u.member_id = m.id
            WHERE u.username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }
}
