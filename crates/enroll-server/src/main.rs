//! course-enrollment HTTP Server
//!
//! Axum-based server for hosted checkout, Stripe webhook reconciliation
//! and the buyer's session-status poll.

mod auth;
mod config;
mod error;
mod handlers;
mod inquiry;
mod router;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use enroll_core::{EmailSender, EnrollmentStore};
use enroll_payments::{SignaturePolicy, StripeClient, WebhookVerifier};
use enroll_runtime::{LogEmailSender, ResendConfig, ResendEmailSender, SupabaseIdentity};

use crate::config::ServerConfig;
use crate::router::build_router;
use crate::state::{AppState, SiteSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;

    // Payments
    let stripe = StripeClient::new(&config.stripe_secret_key, config.stripe_webhook_secret.clone());
    let signature = match stripe.webhook_secret() {
        Some(secret) => SignaturePolicy::Required(WebhookVerifier::new(secret)),
        None => {
            tracing::warn!("⚠ STRIPE_WEBHOOK_SECRET not set - webhooks will NOT be verified");
            tracing::warn!("  This is only allowed outside production");
            SignaturePolicy::Unverified
        }
    };

    // Email
    let email: Arc<dyn EmailSender> = match ResendConfig::from_env() {
        Some(resend) => {
            tracing::info!("✓ Resend configured");
            Arc::new(ResendEmailSender::new(resend))
        }
        None => {
            tracing::warn!("⚠ RESEND_API_KEY not set - emails will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    let store = build_store(&config).await?;
    let identity = Arc::new(SupabaseIdentity::new(&config.supabase_jwt_secret));

    // Build application state
    let state = AppState::new(
        Arc::new(stripe),
        store,
        identity,
        email,
        signature,
        SiteSettings {
            app_base_url: config.app_base_url.clone(),
            admin_email: config.admin_email.clone(),
            allowed_origin: config.allowed_origin.clone(),
        },
    );

    let app = build_router(state)?;

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 enroll-server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health          - Health check");
    tracing::info!("  POST /checkout        - Start Stripe checkout");
    tracing::info!("  POST /webhook         - Stripe webhook");
    tracing::info!("  GET  /session-status  - Enrollment status after payment");
    tracing::info!("  GET  /enrollments     - Caller's paid enrollments");
    tracing::info!("  POST /inquiry         - Contact form");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "postgres")]
async fn build_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn EnrollmentStore>> {
    use enroll_runtime::PostgresEnrollmentStore;

    let Some(url) = config.database_url.as_deref() else {
        anyhow::bail!("DATABASE_URL is required when built with the postgres feature");
    };
    let store = PostgresEnrollmentStore::connect(url).await?;
    store.migrate().await?;
    tracing::info!("✓ Connected to Postgres");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn build_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn EnrollmentStore>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but this build has no postgres feature");
    }
    tracing::warn!("⚠ Using in-memory enrollment store - data is lost on restart");
    Ok(Arc::new(enroll_core::MemoryEnrollmentStore::new()))
}
