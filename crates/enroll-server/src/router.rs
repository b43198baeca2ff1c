//! Router Assembly

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    create_checkout, health_check, list_enrollments, session_status, stripe_webhook,
    submit_inquiry,
};
use crate::state::AppState;

fn cors_layer(allowed_origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let origin = match allowed_origin {
        Some(origin) => AllowOrigin::exact(HeaderValue::from_str(origin)?),
        None => AllowOrigin::from(Any),
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("stripe-signature"),
        ]))
}

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(state.settings.allowed_origin.as_deref())?;

    Ok(Router::new()
        // Health
        .route("/health", get(health_check))
        // Checkout + reconciliation
        .route("/checkout", post(create_checkout))
        .route("/webhook", post(stripe_webhook))
        .route("/session-status", get(session_status))
        // Account
        .route("/enrollments", get(list_enrollments))
        // Contact form
        .route("/inquiry", post(submit_inquiry))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
