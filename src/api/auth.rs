use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::flash::{self, FlashLevel};
use crate::api::middleware::auth::current_identity;
use crate::api::middleware::session::{AppState, SESSION_KEY_IDENTITY};
use crate::api::page::Page;
use crate::error::{LedgerError, Result};
use crate::models::identity::AuthenticatedIdentity;
use crate::models::member::validate_phone;
use crate::services::credentials::{self, NewAccount};

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    page: Page,
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    page: Page,
}

fn home_for(identity: &AuthenticatedIdentity) -> Redirect {
    if identity.is_admin() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/member")
    }
}

/// Sends logged-in users to their dashboard, everyone else sees the login form
async fn index(session: Session) -> Result<Response> {
    if let Some(identity) = current_identity(&session).await? {
        return Ok(home_for(&identity).into_response());
    }

    let page = Page::load(&session).await?;
    Ok(LoginTemplate { page }.into_response())
}

async fn login_form(session: Session) -> Result<LoginTemplate> {
    let page = Page::load(&session).await?;
    Ok(LoginTemplate { page })
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        flash::push(&session, FlashLevel::Danger, "Username and password are required.").await?;
        return Ok(Redirect::to("/login"));
    }

    match credentials::authenticate(&state.pool, username, &form.password).await {
        Ok(identity) => {
            // New session id on privilege change
            session.cycle_id().await?;
            session.insert(SESSION_KEY_IDENTITY, &identity).await?;
            flash::push(
                &session,
                FlashLevel::Success,
                format!("Welcome back, {}!", identity.name),
            )
            .await?;
            Ok(home_for(&identity))
        }
        Err(LedgerError::InvalidCredentials) => {
            flash::push(&session, FlashLevel::Danger, "Invalid username or password.").await?;
            Ok(Redirect::to("/login"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Login failed");
            flash::push(&session, FlashLevel::Danger, "An error occurred during login.").await?;
            Ok(Redirect::to("/login"))
        }
    }
}

async fn register_form(session: Session) -> Result<RegisterTemplate> {
    let page = Page::load(&session).await?;
    Ok(RegisterTemplate { page })
}

#[derive(Deserialize)]
struct RegisterForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect> {
    let missing = [&form.username, &form.phone, &form.email]
        .iter()
        .any(|f| f.trim().is_empty())
        || form.password.is_empty();
    if missing {
        flash::push(&session, FlashLevel::Danger, "All fields are required.").await?;
        return Ok(Redirect::to("/register"));
    }

    if validate_phone(&form.phone).is_err() {
        flash::push(&session, FlashLevel::Danger, "Please enter a valid phone number.").await?;
        return Ok(Redirect::to("/register"));
    }

    let account = NewAccount {
        username: form.username,
        password: form.password,
        phone: form.phone,
        email: form.email,
        monthly_amount: state.config.default_monthly_amount,
    };

    let (level, message, target) = match credentials::create_account(&state.pool, account).await {
        Ok(_) => (
            FlashLevel::Success,
            "Registration successful! Please log in.",
            "/login",
        ),
        Err(LedgerError::Duplicate) => (
            FlashLevel::Danger,
            "Username, email or phone number already exists.",
            "/register",
        ),
        Err(LedgerError::Validation(detail)) => {
            tracing::info!(detail = %detail, "Registration rejected");
            (FlashLevel::Danger, "All fields are required.", "/register")
        }
        Err(e) => {
            tracing::error!(error = %e, "Registration failed");
            (
                FlashLevel::Danger,
                "An error occurred during registration.",
                "/register",
            )
        }
    };

    flash::push(&session, level, message).await?;
    Ok(Redirect::to(target))
}

async fn logout(session: Session) -> Result<Redirect> {
    session.flush().await?;
    flash::push(&session, FlashLevel::Info, "You have been logged out.").await?;
    Ok(Redirect::to("/"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", get(logout))
}
