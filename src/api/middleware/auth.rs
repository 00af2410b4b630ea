use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::session::SESSION_KEY_IDENTITY;
use crate::api::flash::{self, FlashLevel};
use crate::models::identity::{AuthenticatedIdentity, Role};
use crate::models::member::MemberId;

/// Authentication error responses
#[derive(Debug)]
pub enum AuthError {
    Unauthorized,
    /// Logged in, but the route belongs to the other role.
    WrongRole(Role),
    SessionError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthorized => Redirect::to("/login").into_response(),
            AuthError::WrongRole(Role::Admin) => Redirect::to("/dashboard").into_response(),
            AuthError::WrongRole(Role::Member) => Redirect::to("/member").into_response(),
            AuthError::SessionError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Session error occurred.").into_response()
            }
        }
    }
}

impl From<tower_sessions::session::Error> for AuthError {
    fn from(e: tower_sessions::session::Error) -> Self {
        tracing::error!(error = %e, "Session store failure");
        AuthError::SessionError
    }
}

/// Middleware that requires the user to be authenticated
pub async fn require_auth(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity: Option<AuthenticatedIdentity> = session.get(SESSION_KEY_IDENTITY).await?;

    if identity.is_none() {
        flash::push(&session, FlashLevel::Warning, "Please log in to access this page.").await?;
        return Err(AuthError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Returns the logged-in identity, if any
pub async fn current_identity(
    session: &Session,
) -> Result<Option<AuthenticatedIdentity>, AuthError> {
    Ok(session.get(SESSION_KEY_IDENTITY).await?)
}

/// Extracts the authenticated identity from the session
pub async fn get_authenticated_identity(
    session: &Session,
) -> Result<AuthenticatedIdentity, AuthError> {
    current_identity(session).await?.ok_or(AuthError::Unauthorized)
}

/// Extracts an identity with role=admin
pub async fn require_admin(session: &Session) -> Result<AuthenticatedIdentity, AuthError> {
    let identity = get_authenticated_identity(session).await?;
    if !identity.is_admin() {
        flash::push(session, FlashLevel::Danger, "Admin access required.").await?;
        return Err(AuthError::WrongRole(identity.role));
    }
    Ok(identity)
}

/// Extracts a member-linked identity together with its member id.
///
/// `refusal` is shown to admins who reach a member-only page.
pub async fn require_member(
    session: &Session,
    refusal: &str,
) -> Result<(AuthenticatedIdentity, MemberId), AuthError> {
    let identity = get_authenticated_identity(session).await?;
    match identity.member_id {
        Some(member_id) if !identity.is_admin() => Ok((identity, member_id)),
        _ => {
            flash::push(session, FlashLevel::Warning, refusal).await?;
            Err(AuthError::WrongRole(identity.role))
        }
    }
}
