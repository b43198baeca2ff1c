//! Payment Event Log
//!
//! Append-only audit trail of payment-lifecycle occurrences. Rows are
//! diagnostic; nothing reads them to serve requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of payment-lifecycle occurrence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventType {
    CheckoutSessionCreated,
    CheckoutCompleted,
    PaymentSucceeded,
    PaymentFailed,
    WebhookError,
}

impl PaymentEventType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CheckoutSessionCreated => "checkout_session_created",
            Self::CheckoutCompleted => "checkout_completed",
            Self::PaymentSucceeded => "payment_succeeded",
            Self::PaymentFailed => "payment_failed",
            Self::WebhookError => "webhook_error",
        }
    }
}

/// Status recorded with a log row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentLogStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentLogStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// One audit row
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentLogEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub enrollment_id: Option<Uuid>,
    pub event_type: PaymentEventType,

    /// Processor event id (webhook deliveries only)
    pub external_event_id: Option<String>,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,

    /// Amount in cents
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub status: PaymentLogStatus,
    pub metadata: serde_json::Value,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentLogEntry {
    pub fn new(event_type: PaymentEventType, status: PaymentLogStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: None,
            enrollment_id: None,
            event_type,
            external_event_id: None,
            session_id: None,
            payment_intent_id: None,
            amount: None,
            currency: None,
            status,
            metadata: serde_json::Value::Null,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// A checkout session was opened with the processor
    pub fn session_created(user_id: Uuid, session_id: impl Into<String>, amount: i64) -> Self {
        Self {
            user_id: Some(user_id),
            session_id: Some(session_id.into()),
            amount: Some(amount),
            currency: Some("usd".into()),
            ..Self::new(PaymentEventType::CheckoutSessionCreated, PaymentLogStatus::Pending)
        }
    }

    /// A webhook delivery could not be processed
    pub fn webhook_error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::new(PaymentEventType::WebhookError, PaymentLogStatus::Failed)
        }
    }

    #[must_use]
    pub const fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub const fn with_enrollment(mut self, enrollment_id: Uuid) -> Self {
        self.enrollment_id = Some(enrollment_id);
        self
    }

    #[must_use]
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.external_event_id = Some(event_id.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
