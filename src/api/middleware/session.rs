use axum::extract::FromRef;
use sqlx::SqlitePool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::services::notifier::Notifier;

/// Session keys used in the application
pub const SESSION_KEY_IDENTITY: &str = "identity";
pub const SESSION_KEY_FLASH: &str = "flash";

/// Creates a session layer backed by the ledger database
pub async fn create_session_layer(
    pool: SqlitePool,
    secure_cookies: bool,
) -> Result<SessionManagerLayer<SqliteStore>, sqlx::Error> {
    let session_store = SqliteStore::new(pool);
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(12)));

    Ok(session_layer)
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: crate::config::Config,
    pub notifier: Notifier,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> SqlitePool {
        state.pool.clone()
    }
}
