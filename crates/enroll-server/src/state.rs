//! Application State

use std::sync::Arc;

use enroll_core::{EmailSender, EnrollmentStore, IdentityProvider};
use enroll_payments::{
    CheckoutInitiator, CompletionReconciler, PaymentProcessor, SessionStatusQuery,
    SignaturePolicy,
};

/// Site-level settings the handlers need
#[derive(Clone, Debug, Default)]
pub struct SiteSettings {
    /// Fallback return origin for checkout
    pub app_base_url: Option<String>,

    /// Recipient of contact-form notices
    pub admin_email: Option<String>,

    /// Only browser origin permitted by CORS and as a checkout return origin
    pub allowed_origin: Option<String>,
}

impl SiteSettings {
    /// Origin the processor should send the buyer back to
    ///
    /// A request `Origin` is used only when it matches `allowed_origin`
    /// (or no origin is configured); otherwise the configured site URL wins.
    pub fn return_origin(&self, request_origin: Option<&str>) -> Option<String> {
        request_origin
            .filter(|o| !o.is_empty() && *o != "null")
            .filter(|o| self.allowed_origin.as_deref().is_none_or(|allowed| allowed == *o))
            .map(str::to_string)
            .or_else(|| self.app_base_url.clone())
            .or_else(|| self.allowed_origin.clone())
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Bearer token validation
    pub identity: Arc<dyn IdentityProvider>,

    /// Enrollment and payment-log storage
    pub store: Arc<dyn EnrollmentStore>,

    pub email: Arc<dyn EmailSender>,

    pub checkout: Arc<CheckoutInitiator>,
    pub reconciler: Arc<CompletionReconciler>,
    pub status: Arc<SessionStatusQuery>,

    pub settings: Arc<SiteSettings>,

    /// Whether webhook payloads are signature checked
    pub webhooks_verified: bool,
}

impl AppState {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        store: Arc<dyn EnrollmentStore>,
        identity: Arc<dyn IdentityProvider>,
        email: Arc<dyn EmailSender>,
        signature: SignaturePolicy,
        settings: SiteSettings,
    ) -> Self {
        let webhooks_verified = signature.is_verified();

        Self {
            checkout: Arc::new(CheckoutInitiator::new(processor.clone(), store.clone())),
            reconciler: Arc::new(CompletionReconciler::new(
                store.clone(),
                email.clone(),
                signature,
            )),
            status: Arc::new(SessionStatusQuery::new(processor, store.clone())),
            identity,
            store,
            email,
            settings: Arc::new(settings),
            webhooks_verified,
        }
    }
}
