//! HTTP Handlers

use axum::{
    extract::{Query, State},
    http::{header::ORIGIN, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

use enroll_core::{EnrollError, Enrollment, SessionStatus};
use enroll_payments::{CheckoutRequest, ReconcileOutcome};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::inquiry::{self, Inquiry};
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub webhooks_verified: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    /// Course tier; older clients send `level_id`
    #[serde(alias = "level_id")]
    pub tier: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionStatusParams {
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentsResponse {
    pub enrollments: Vec<Enrollment>,
}

#[derive(Debug, Serialize)]
pub struct Acknowledged {
    pub received: bool,
}

#[derive(Debug, Serialize)]
pub struct InquiryResponse {
    pub success: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        webhooks_verified: state.webhooks_verified,
    })
}

/// Start a hosted checkout for the caller
pub async fn create_checkout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let request_origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    let return_origin = state
        .settings
        .return_origin(request_origin)
        .ok_or_else(|| EnrollError::InvalidRequest("cannot determine return origin".into()))?;

    let started = state
        .checkout
        .start_checkout(
            &user,
            CheckoutRequest {
                tier: body.tier,
                user_name: body.user_name,
                user_email: body.user_email,
                return_origin,
            },
        )
        .await?;

    Ok(Json(CheckoutResponse {
        session_id: started.session_id,
        url: started.url,
    }))
}

/// Stripe webhook receiver
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Acknowledged>, ApiError> {
    let signature = headers.get("stripe-signature").and_then(|v| v.to_str().ok());

    let outcome = state
        .reconciler
        .handle_notification(&body, signature)
        .await
        .map_err(ApiError::webhook)?;

    match outcome {
        ReconcileOutcome::Enrolled {
            enrollment,
            created,
            email_sent,
        } => tracing::info!(
            enrollment_id = %enrollment.id,
            created,
            email_sent,
            "Checkout reconciled"
        ),
        ReconcileOutcome::PaymentLogged { event_type } => {
            tracing::info!(event_type = event_type.as_str(), "Payment event logged");
        }
        ReconcileOutcome::Ignored { event_type } => {
            tracing::debug!(%event_type, "Webhook event ignored");
        }
    }

    Ok(Json(Acknowledged { received: true }))
}

/// Read-only status for the buyer's return page
pub async fn session_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<SessionStatusParams>,
) -> Result<Json<SessionStatus>, ApiError> {
    let status = state.status.session_status(&user, &params.session_id).await?;
    Ok(Json(status))
}

/// The caller's paid enrollments
pub async fn list_enrollments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<EnrollmentsResponse>, ApiError> {
    let enrollments = state.store.list_paid_for_user(user.id).await?;
    Ok(Json(EnrollmentsResponse { enrollments }))
}

/// Public contact form
pub async fn submit_inquiry(
    State(state): State<AppState>,
    Json(body): Json<Inquiry>,
) -> Result<Json<InquiryResponse>, ApiError> {
    inquiry::submit(
        state.email.as_ref(),
        state.settings.admin_email.as_deref(),
        &body,
    )
    .await?;
    Ok(Json(InquiryResponse { success: true }))
}
