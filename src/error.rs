use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use sqlx::error::ErrorKind;
use thiserror::Error;

use crate::api::middleware::auth::AuthError;

/// Errors surfaced by the ledger core. Storage errors are classified and
/// logged on conversion so no `sqlx::Error` escapes the core.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Record already exists")]
    Duplicate,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage temporarily unavailable")]
    Transient,
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    tracing::debug!(error = %db_err, "Unique constraint violated");
                    return LedgerError::Duplicate;
                }
                ErrorKind::ForeignKeyViolation => {
                    tracing::debug!(error = %db_err, "Foreign key constraint violated");
                    return LedgerError::NotFound("referenced record".to_string());
                }
                ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                    tracing::debug!(error = %db_err, "Column constraint violated");
                    return LedgerError::Validation(db_err.message().to_string());
                }
                _ => {}
            }
        }

        tracing::error!(error = ?err, "Storage error");
        LedgerError::Transient
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Errors returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Not found")]
    NotFound,

    #[error("Access denied")]
    Auth(AuthError),

    /// Abandon the request and send the browser elsewhere, typically after
    /// a flash message was queued.
    #[error("Redirect to {0}")]
    Redirect(&'static str),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    title: &'static str,
    message: &'static str,
}

impl ErrorTemplate {
    fn page(status: StatusCode, title: &'static str, message: &'static str) -> Response {
        let page = ErrorTemplate { title, message };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render error page");
                (status, message).into_response()
            }
        }
    }
}

/// Renders the 404 page for unmatched routes.
pub async fn not_found() -> Response {
    AppError::NotFound.into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Auth(e) => e.into_response(),
            AppError::Redirect(to) => Redirect::to(to).into_response(),
            AppError::NotFound => ErrorTemplate::page(
                StatusCode::NOT_FOUND,
                "Page not found",
                "The page you were looking for does not exist.",
            ),
            AppError::Ledger(LedgerError::Transient) => {
                ErrorTemplate::page(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Please try again",
                    "The service is busy right now. Please try again in a moment.",
                )
            }
            other => {
                tracing::error!(error = ?other, "Request failed");
                ErrorTemplate::page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong",
                    "An unexpected error occurred. Please try again.",
                )
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
