//! # enroll-payments
//!
//! Payment-to-enrollment reconciliation.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐  create   ┌─────────────────┐  webhook  ┌──────────────┐
//! │   Checkout   │──────────▶│  Stripe Hosted  │──────────▶│  Completion  │
//! │   Initiator  │           │  Checkout Page  │           │  Reconciler  │
//! └──────────────┘           └────────┬────────┘           └──────┬───────┘
//!                                     │ redirect                  │ upsert
//!                                     ▼                           ▼
//!                            ┌─────────────────┐  read   ┌──────────────┐
//!                            │ Session Status  │────────▶│    Store     │
//!                            │     Query       │         └──────────────┘
//!                            └─────────────────┘
//! ```
//!
//! - The initiator never writes an enrollment; it only opens the session
//!   and logs `checkout_session_created`.
//! - The reconciler is the single writer. It upserts by `(user, tier)`, so
//!   at-least-once delivery collapses to one row.
//! - The status query is read-only and answers `pending`, `processing` or
//!   `completed` while the buyer polls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use enroll_payments::{CheckoutInitiator, CheckoutRequest, StripeClient};
//!
//! let stripe = Arc::new(StripeClient::from_env()?);
//! let initiator = CheckoutInitiator::new(stripe, store);
//!
//! let started = initiator.start_checkout(&user, CheckoutRequest {
//!     tier: "beginner".into(),
//!     user_name: None,
//!     user_email: None,
//!     return_origin: "https://courses.example.com".into(),
//! }).await?;
//!
//! // Redirect user to: started.url
//! ```

mod checkout;
pub mod confirmation;
pub mod metadata;
mod processor;
mod signature;
mod status;
mod stripe;
mod webhook;

#[cfg(test)]
mod test_support;

pub use checkout::{CheckoutInitiator, CheckoutRequest, CheckoutStarted};
pub use metadata::CheckoutMetadata;
pub use processor::{
    CreateSessionRequest, CreatedSession, LineItem, PaymentProcessor, SessionSnapshot,
};
pub use signature::{SignaturePolicy, WebhookVerifier, DEFAULT_TOLERANCE_SECS};
pub use status::{SessionStatusQuery, UserStatusSource};
pub use stripe::StripeClient;
pub use webhook::{
    CompletedSession, CompletionReconciler, PaymentIntentSummary, ReconcileOutcome, WebhookEvent,
};
