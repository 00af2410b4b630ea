//! One-shot user messages carried across a redirect in the session.

use serde::{Deserialize, Serialize};
use std::fmt;
use tower_sessions::Session;

use super::middleware::session::SESSION_KEY_FLASH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

impl fmt::Display for FlashLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashLevel::Success => f.write_str("success"),
            FlashLevel::Info => f.write_str("info"),
            FlashLevel::Warning => f.write_str("warning"),
            FlashLevel::Danger => f.write_str("danger"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

pub async fn push(
    session: &Session,
    level: FlashLevel,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    let mut pending: Vec<Flash> = session.get(SESSION_KEY_FLASH).await?.unwrap_or_default();
    pending.push(Flash {
        level,
        message: message.into(),
    });
    session.insert(SESSION_KEY_FLASH, pending).await
}

/// Removes and returns every pending message.
pub async fn take(session: &Session) -> Result<Vec<Flash>, tower_sessions::session::Error> {
    let pending: Option<Vec<Flash>> = session.remove(SESSION_KEY_FLASH).await?;
    Ok(pending.unwrap_or_default())
}
