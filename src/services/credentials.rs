//! Credential store: account creation, login and the bootstrap admin.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::sync::OnceLock;

use crate::error::{LedgerError, LedgerResult};
use crate::models::identity::{AuthenticatedIdentity, CreateIdentityData, Identity, Role};
use crate::models::member::{validate_phone, CreateMemberData, Member, MemberId};
use crate::models::money::to_cents;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Seed password for the bootstrap admin when none is configured.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub phone: String,
    pub email: String,
    pub monthly_amount: Decimal,
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hash verified against when the username does not exist, so both failure
/// paths cost the same.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("not-a-real-password").unwrap_or_default())
}

async fn hash_blocking(password: String) -> LedgerResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing task failed");
            LedgerError::Transient
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            LedgerError::Transient
        })
}

async fn verify_blocking(password: String, hash: Option<String>) -> LedgerResult<bool> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&password, &hash),
        None => {
            verify_password(&password, dummy_hash());
            false
        }
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Password verification task failed");
        LedgerError::Transient
    })
}

fn required(value: &str, field: &str) -> LedgerResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LedgerError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Creates a member and its login identity in one transaction.
///
/// A collision on username, phone or email is reported as
/// `LedgerError::Duplicate` whichever column caused it, and leaves no rows
/// behind.
#[tracing::instrument(skip(pool, account), fields(username = %account.username))]
pub async fn create_account(pool: &SqlitePool, account: NewAccount) -> LedgerResult<MemberId> {
    let username = required(&account.username, "Username")?;
    let email = required(&account.email, "Email")?;
    let phone = validate_phone(&account.phone)?;
    if account.password.is_empty() {
        return Err(LedgerError::Validation("Password is required".to_string()));
    }
    let monthly_amount_cents = to_cents(account.monthly_amount)?;

    let password_hash = hash_blocking(account.password).await?;

    let mut tx = pool.begin().await?;

    let member_id = Member::insert(
        &mut tx,
        &CreateMemberData {
            name: username.clone(),
            phone,
            email,
            monthly_amount_cents,
        },
    )
    .await?;

    Identity::insert(
        &mut tx,
        &CreateIdentityData {
            username,
            password_hash,
            role: Role::Member,
            member_id: Some(member_id),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(member_id, "Account created");
    Ok(member_id)
}

/// Resolves a username/password pair to an identity. Any failure is the
/// same `InvalidCredentials` error.
#[tracing::instrument(skip(pool, password))]
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> LedgerResult<AuthenticatedIdentity> {
    let row = Identity::find_with_member(pool, username.trim()).await?;
    let hash = row.as_ref().map(|r| r.identity.password_hash.clone());

    if !verify_blocking(password.to_string(), hash).await? {
        tracing::info!("Login rejected");
        return Err(LedgerError::InvalidCredentials);
    }

    match row {
        Some(row) => {
            let identity = AuthenticatedIdentity::from(row);
            tracing::info!(identity_id = identity.id, role = %identity.role, "Login accepted");
            Ok(identity)
        }
        None => Err(LedgerError::InvalidCredentials),
    }
}

/// Creates the `admin` identity if it does not exist yet.
///
/// Returns `true` when an identity was created.
pub async fn ensure_default_admin(pool: &SqlitePool, password: &str) -> LedgerResult<bool> {
    if Identity::find_by_username(pool, DEFAULT_ADMIN_USERNAME)
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let password_hash = hash_blocking(password.to_string()).await?;
    let mut conn = pool.acquire().await?;
    let created = Identity::insert(
        &mut conn,
        &CreateIdentityData {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password_hash,
            role: Role::Admin,
            member_id: None,
        },
    )
    .await;

    match created {
        Ok(id) => {
            tracing::info!(identity_id = id, "Created default admin user");
            Ok(true)
        }
        // Another process seeded it first.
        Err(LedgerError::Duplicate) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::identity::ADMIN_DISPLAY_NAME;

    fn account(username: &str, phone: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            password: "pw1".to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            monthly_amount: Decimal::new(5000, 2),
        }
    }

    async fn member_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret").unwrap();
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("secret", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_create_then_authenticate() {
        let pool = test_pool().await;
        let member_id = create_account(&pool, account("alice", "0821234567", "a@x.com"))
            .await
            .unwrap();

        let identity = authenticate(&pool, "alice", "pw1").await.unwrap();
        assert_eq!(identity.member_id, Some(member_id));
        assert_eq!(identity.role, Role::Member);
        assert_eq!(identity.name, "alice");
        assert_eq!(identity.phone, "0821234567");
        assert_eq!(identity.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_failures_are_uniform() {
        let pool = test_pool().await;
        create_account(&pool, account("alice", "0821234567", "a@x.com"))
            .await
            .unwrap();

        assert!(matches!(
            authenticate(&pool, "alice", "wrong").await,
            Err(LedgerError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&pool, "nobody", "pw1").await,
            Err(LedgerError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicates_leave_no_partial_member() {
        let pool = test_pool().await;
        create_account(&pool, account("alice", "0821234567", "a@x.com"))
            .await
            .unwrap();

        // username collides after the member row was inserted
        let same_username = create_account(&pool, account("alice", "0830000000", "other@x.com")).await;
        assert!(matches!(same_username, Err(LedgerError::Duplicate)));

        let same_phone = create_account(&pool, account("bob", "0821234567", "b@x.com")).await;
        assert!(matches!(same_phone, Err(LedgerError::Duplicate)));

        let same_email = create_account(&pool, account("carol", "0841111111", "a@x.com")).await;
        assert!(matches!(same_email, Err(LedgerError::Duplicate)));

        assert_eq!(member_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_create_account_validates_phone() {
        let pool = test_pool().await;
        let result = create_account(&pool, account("alice", "phone?", "a@x.com")).await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(member_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_default_admin_is_seeded_once() {
        let pool = test_pool().await;
        assert!(ensure_default_admin(&pool, DEFAULT_ADMIN_PASSWORD).await.unwrap());
        assert!(!ensure_default_admin(&pool, "other").await.unwrap());

        let admin = authenticate(&pool, "admin", DEFAULT_ADMIN_PASSWORD).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.member_id, None);
        assert_eq!(admin.name, ADMIN_DISPLAY_NAME);
        assert!(admin.phone.is_empty());
        assert_eq!(member_count(&pool).await, 0);
    }
}
