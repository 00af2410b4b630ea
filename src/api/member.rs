use askama::Template;
use axum::{
    extract::State,
    middleware,
    response::Redirect,
    routing::get,
    Form, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::flash::{self, FlashLevel};
use crate::api::middleware::auth::{require_auth, require_member, AuthError};
use crate::api::middleware::session::{AppState, SESSION_KEY_IDENTITY};
use crate::api::page::Page;
use crate::error::{AppError, LedgerError, Result};
use crate::models::claim::{Claim, ClaimPriority, NewClaim};
use crate::models::contribution::{Contribution, ContributionStatus};
use crate::models::identity::AuthenticatedIdentity;
use crate::models::member::{Member, MemberId};
use crate::models::money::{from_cents, round_to_cents};
use crate::services::claim_workflow;
use crate::services::notifier::TransactionKind;

#[derive(Template)]
#[template(path = "member/dashboard.html")]
struct MemberDashboardTemplate {
    page: Page,
    member: Member,
    contributions: Vec<Contribution>,
    claims: Vec<Claim>,
    total_contributed: Decimal,
}

#[derive(Template)]
#[template(path = "member/contribute.html")]
struct ContributeTemplate {
    page: Page,
    member: Member,
}

#[derive(Template)]
#[template(path = "member/submit_claim.html")]
struct SubmitClaimTemplate {
    page: Page,
    member: Member,
}

#[derive(Template)]
#[template(path = "member/update_phone.html")]
struct UpdatePhoneTemplate {
    page: Page,
    member: Member,
}

/// Parses a user-entered amount, rounded to the cents the ledger stores.
/// Anything that is not a positive number after rounding is rejected.
fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim())
        .ok()
        .map(round_to_cents)
        .filter(|amount| amount.is_sign_positive() && !amount.is_zero())
}

/// Loads the member record behind the session, bouncing to `fallback` when
/// it has disappeared.
async fn load_member(
    state: &AppState,
    session: &Session,
    member_id: MemberId,
    fallback: &'static str,
) -> Result<Member> {
    match Member::find_by_id(&state.pool, member_id).await? {
        Some(member) => Ok(member),
        None => {
            tracing::warn!(member_id, "Session refers to a missing member");
            flash::push(session, FlashLevel::Danger, "Member profile not found.").await?;
            Err(AppError::Redirect(fallback))
        }
    }
}

/// Profile, contribution history and claims of the logged-in member
async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<MemberDashboardTemplate> {
    let (_, member_id) = require_member(&session, "Admins use the pool dashboard.").await?;
    let member = load_member(&state, &session, member_id, "/logout").await?;

    let contributions = Contribution::list_for_member(&state.pool, member_id).await?;
    let claims = Claim::list_for_member(&state.pool, member_id).await?;
    let total_contributed = from_cents(
        contributions
            .iter()
            .filter(|c| c.status == ContributionStatus::Paid)
            .map(|c| c.amount_cents)
            .sum(),
    );

    let page = Page::load(&session).await?;
    Ok(MemberDashboardTemplate {
        page,
        member,
        contributions,
        claims,
        total_contributed,
    })
}

async fn contribute_form(
    State(state): State<AppState>,
    session: Session,
) -> Result<ContributeTemplate> {
    let (_, member_id) = require_member(&session, "Admins cannot make contributions.").await?;
    let member = load_member(&state, &session, member_id, "/member").await?;

    let page = Page::load(&session).await?;
    Ok(ContributeTemplate { page, member })
}

#[derive(Deserialize)]
struct ContributeForm {
    #[serde(default)]
    amount: String,
}

async fn contribute(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ContributeForm>,
) -> Result<Redirect> {
    let (_, member_id) = require_member(&session, "Admins cannot make contributions.").await?;
    let member = load_member(&state, &session, member_id, "/member").await?;

    let Some(amount) = parse_amount(&form.amount) else {
        flash::push(&session, FlashLevel::Danger, "Please enter a valid amount.").await?;
        return Ok(Redirect::to("/contribute"));
    };

    let reference = Uuid::new_v4().to_string();
    let recorded = Contribution::record(
        &state.pool,
        member_id,
        amount,
        &reference,
        ContributionStatus::Paid,
    )
    .await;

    match recorded {
        Ok(true) => {
            state
                .notifier
                .notify(&member.phone, amount, TransactionKind::Contribution);
            flash::push(
                &session,
                FlashLevel::Success,
                format!("Contribution of R{amount:.2} successful!"),
            )
            .await?;
            Ok(Redirect::to("/member"))
        }
        Ok(false) => {
            flash::push(&session, FlashLevel::Danger, "Error processing contribution.").await?;
            Ok(Redirect::to("/contribute"))
        }
        Err(LedgerError::Validation(_)) => {
            flash::push(&session, FlashLevel::Danger, "Please enter a valid amount.").await?;
            Ok(Redirect::to("/contribute"))
        }
        Err(e) => {
            tracing::error!(member_id, error = %e, "Contribution failed");
            flash::push(&session, FlashLevel::Danger, "Error processing contribution.").await?;
            Ok(Redirect::to("/contribute"))
        }
    }
}

async fn submit_claim_form(
    State(state): State<AppState>,
    session: Session,
) -> Result<SubmitClaimTemplate> {
    let (_, member_id) = require_member(&session, "Admins cannot submit claims.").await?;
    let member = load_member(&state, &session, member_id, "/member").await?;

    let page = Page::load(&session).await?;
    Ok(SubmitClaimTemplate { page, member })
}

#[derive(Deserialize)]
struct ClaimForm {
    #[serde(default)]
    amount: String,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "type")]
    claim_type: String,
    #[serde(default)]
    hospital: String,
    #[serde(default)]
    priority: String,
}

async fn submit_claim(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ClaimForm>,
) -> Result<Redirect> {
    let (identity, _) = require_member(&session, "Admins cannot submit claims.").await?;

    let Some(amount) = parse_amount(&form.amount) else {
        flash::push(&session, FlashLevel::Danger, "Please enter a valid amount.").await?;
        return Ok(Redirect::to("/claims/new"));
    };
    if form.description.trim().is_empty() {
        flash::push(&session, FlashLevel::Danger, "Description is required.").await?;
        return Ok(Redirect::to("/claims/new"));
    }
    let Ok(priority) = ClaimPriority::from_str(&form.priority) else {
        flash::push(&session, FlashLevel::Danger, "Please choose a valid priority.").await?;
        return Ok(Redirect::to("/claims/new"));
    };

    let claim = NewClaim {
        amount,
        description: form.description,
        claim_type: form.claim_type,
        hospital: Some(form.hospital),
        priority,
    };

    match claim_workflow::submit(&state.pool, &identity, claim).await {
        Ok(claim_id) => {
            tracing::info!(claim_id, "Claim filed from web");
            flash::push(&session, FlashLevel::Success, "Claim submitted successfully!").await?;
            Ok(Redirect::to("/member"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Claim submission failed");
            flash::push(&session, FlashLevel::Danger, "Error submitting claim.").await?;
            Ok(Redirect::to("/claims/new"))
        }
    }
}

async fn update_phone_form(
    State(state): State<AppState>,
    session: Session,
) -> Result<UpdatePhoneTemplate> {
    let (_, member_id) = require_member(&session, "Admins cannot update phone numbers.").await?;
    let member = load_member(&state, &session, member_id, "/member").await?;

    let page = Page::load(&session).await?;
    Ok(UpdatePhoneTemplate { page, member })
}

#[derive(Deserialize)]
struct PhoneForm {
    #[serde(default)]
    phone: String,
}

/// Keeps the identity cached in the session in step with the stored phone.
async fn refresh_session_phone(
    session: &Session,
    mut identity: AuthenticatedIdentity,
    phone: &str,
) -> std::result::Result<(), AuthError> {
    identity.phone = phone.to_string();
    session.insert(SESSION_KEY_IDENTITY, identity).await?;
    Ok(())
}

async fn update_phone(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PhoneForm>,
) -> Result<Redirect> {
    let (identity, member_id) =
        require_member(&session, "Admins cannot update phone numbers.").await?;

    let phone = form.phone.trim();
    if phone.is_empty() {
        flash::push(&session, FlashLevel::Danger, "Phone number is required.").await?;
        return Ok(Redirect::to("/profile/phone"));
    }

    let (level, message, target) = match Member::update_phone(&state.pool, member_id, phone).await
    {
        Ok(true) => {
            refresh_session_phone(&session, identity, phone).await?;
            (
                FlashLevel::Success,
                "Phone number updated successfully!",
                "/member",
            )
        }
        Ok(false) => (
            FlashLevel::Danger,
            "Member profile not found.",
            "/member",
        ),
        Err(LedgerError::Validation(_)) => (
            FlashLevel::Danger,
            "Please enter a valid phone number.",
            "/profile/phone",
        ),
        Err(LedgerError::Duplicate) => (
            FlashLevel::Danger,
            "That phone number is already registered.",
            "/profile/phone",
        ),
        Err(e) => {
            tracing::error!(member_id, error = %e, "Phone update failed");
            (
                FlashLevel::Danger,
                "Error updating phone number.",
                "/profile/phone",
            )
        }
    };

    flash::push(&session, level, message).await?;
    Ok(Redirect::to(target))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/member", get(dashboard))
        .route("/contribute", get(contribute_form).post(contribute))
        .route("/claims/new", get(submit_claim_form).post(submit_claim))
        .route("/profile/phone", get(update_phone_form).post(update_phone))
        .route_layer(middleware::from_fn(require_auth))
}
