use tower_sessions::Session;

use super::flash::{self, Flash};
use super::middleware::auth::current_identity;
use super::middleware::auth::AuthError;
use crate::models::identity::AuthenticatedIdentity;

/// Layout data shared by every rendered page.
#[derive(Debug, Default)]
pub struct Page {
    pub flashes: Vec<Flash>,
    pub identity: Option<AuthenticatedIdentity>,
}

impl Page {
    /// Drains pending flash messages and reads the logged-in identity.
    pub async fn load(session: &Session) -> Result<Self, AuthError> {
        let flashes = flash::take(session).await?;
        let identity = current_identity(session).await?;
        Ok(Self { flashes, identity })
    }

    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(|i| i.is_admin())
    }

    pub fn display_name(&self) -> &str {
        self.identity.as_ref().map(|i| i.name.as_str()).unwrap_or("")
    }
}
