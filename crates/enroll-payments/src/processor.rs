//! Payment Processor Seam
//!
//! The processor is opaque to us: it opens hosted checkout sessions and
//! reports their status. Amounts and payment status are only ever trusted
//! when read back from here, never from the page that started checkout.

use async_trait::async_trait;
use std::collections::HashMap;

use enroll_core::Result;

/// Single line item of a one-time checkout
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub description: String,

    /// Unit amount in cents (USD)
    pub unit_amount: i64,
}

/// Parameters for opening a checkout session
#[derive(Clone, Debug)]
pub struct CreateSessionRequest {
    /// Existing processor customer to bill, if one was found
    pub customer_id: Option<String>,

    /// Used when no customer id is reused
    pub customer_email: String,

    pub line_item: LineItem,
    pub metadata: HashMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// A freshly created session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedSession {
    pub id: String,

    /// Hosted payment page to redirect the buyer to
    pub url: String,
}

/// Processor-side view of a session
#[derive(Clone, Debug, Default)]
pub struct SessionSnapshot {
    pub id: String,
    pub paid: bool,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub payment_intent: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Payment processor trait
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Look up an existing customer record by email
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>>;

    /// Open a hosted checkout session
    async fn create_session(&self, request: CreateSessionRequest) -> Result<CreatedSession>;

    /// Read a session's current state
    async fn get_session(&self, session_id: &str) -> Result<SessionSnapshot>;
}
