use askama::Template;
use axum::{
    extract::{Path, State},
    middleware,
    response::Redirect,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::flash::{self, FlashLevel};
use crate::api::middleware::auth::{require_admin, require_auth};
use crate::api::middleware::session::AppState;
use crate::api::page::Page;
use crate::error::{LedgerError, Result};
use crate::models::claim::{Claim, ClaimId, ClaimWithReviewer, PendingClaim};
use crate::models::member::{Member, MemberSummary};
use crate::services::claim_workflow;
use crate::services::notifier::TransactionKind;
use crate::services::pool_stats::{PoolStats, RecentActivity};

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct DashboardTemplate {
    page: Page,
    stats: PoolStats,
    pending_claims: Vec<PendingClaim>,
    recent: RecentActivity,
    members: Vec<MemberSummary>,
}

#[derive(Template)]
#[template(path = "admin/members.html")]
struct MembersTemplate {
    page: Page,
    members: Vec<MemberSummary>,
}

#[derive(Template)]
#[template(path = "admin/claims.html")]
struct ClaimsTemplate {
    page: Page,
    claims: Vec<ClaimWithReviewer>,
}

/// Pool overview for administrators
async fn dashboard(State(state): State<AppState>, session: Session) -> Result<DashboardTemplate> {
    require_admin(&session).await?;

    let stats = PoolStats::snapshot(&state.pool).await;
    let recent = RecentActivity::load(&state.pool).await;
    let pending_claims = Claim::list_pending(&state.pool).await?;
    let members = Member::list_with_totals(&state.pool).await?;

    let page = Page::load(&session).await?;
    Ok(DashboardTemplate {
        page,
        stats,
        pending_claims,
        recent,
        members,
    })
}

async fn list_members(State(state): State<AppState>, session: Session) -> Result<MembersTemplate> {
    require_admin(&session).await?;

    let members = Member::list_with_totals(&state.pool).await?;
    let page = Page::load(&session).await?;
    Ok(MembersTemplate { page, members })
}

async fn list_claims(State(state): State<AppState>, session: Session) -> Result<ClaimsTemplate> {
    require_admin(&session).await?;

    let claims = Claim::list_all(&state.pool).await?;
    let page = Page::load(&session).await?;
    Ok(ClaimsTemplate { page, claims })
}

#[derive(Deserialize)]
struct ReviewForm {
    #[serde(default)]
    admin_notes: String,
}

/// Sends the review outcome to the claimant's phone, if the claim still resolves.
async fn notify_claimant(state: &AppState, claim_id: ClaimId, kind: TransactionKind) {
    let claimant = match Claim::find_by_id(&state.pool, claim_id).await {
        Ok(Some(claim)) => Member::find_by_id(&state.pool, claim.member_id)
            .await
            .map(|member| member.map(|m| (m, claim.amount()))),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };

    match claimant {
        Ok(Some((member, amount))) => state.notifier.notify(&member.phone, amount, kind),
        Ok(None) => tracing::warn!(claim_id, "Claimant not found for notification"),
        Err(e) => tracing::warn!(claim_id, error = %e, "Could not load claimant for notification"),
    }
}

async fn approve_claim(
    State(state): State<AppState>,
    session: Session,
    Path(claim_id): Path<ClaimId>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect> {
    let admin = require_admin(&session).await?;

    match claim_workflow::approve(&state.pool, &admin, claim_id, Some(&form.admin_notes)).await {
        Ok(true) => {
            notify_claimant(&state, claim_id, TransactionKind::ClaimApproved).await;
            flash::push(&session, FlashLevel::Success, "Claim approved successfully!").await?;
        }
        Ok(false) => {
            tracing::warn!(claim_id, "Approve had no effect");
            flash::push(&session, FlashLevel::Danger, "Error approving claim.").await?;
        }
        Err(e) => {
            tracing::error!(claim_id, error = %e, "Approve failed");
            flash::push(&session, FlashLevel::Danger, "Error approving claim.").await?;
        }
    }

    Ok(Redirect::to("/admin/claims"))
}

async fn decline_claim(
    State(state): State<AppState>,
    session: Session,
    Path(claim_id): Path<ClaimId>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect> {
    let admin = require_admin(&session).await?;

    match claim_workflow::decline(&state.pool, &admin, claim_id, &form.admin_notes).await {
        Ok(true) => {
            notify_claimant(&state, claim_id, TransactionKind::ClaimDeclined).await;
            flash::push(&session, FlashLevel::Success, "Claim declined successfully!").await?;
        }
        Err(LedgerError::Validation(_)) => {
            flash::push(
                &session,
                FlashLevel::Warning,
                "Please provide a reason for declining the claim.",
            )
            .await?;
        }
        Ok(false) => {
            tracing::warn!(claim_id, "Decline had no effect");
            flash::push(&session, FlashLevel::Danger, "Error declining claim.").await?;
        }
        Err(e) => {
            tracing::error!(claim_id, error = %e, "Decline failed");
            flash::push(&session, FlashLevel::Danger, "Error declining claim.").await?;
        }
    }

    Ok(Redirect::to("/admin/claims"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/admin/members", get(list_members))
        .route("/admin/claims", get(list_claims))
        .route("/admin/claims/:id/approve", post(approve_claim))
        .route("/admin/claims/:id/decline", post(decline_claim))
        .route_layer(middleware::from_fn(require_auth))
}
