//! Checkout Initiator
//!
//! Opens a hosted checkout session for an authenticated user and records a
//! pending audit row. No enrollment is touched here; that only happens
//! once the processor confirms payment.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use enroll_core::{CourseTier, CurrentUser, EnrollmentStore, PaymentLogEntry, Result};

use crate::metadata::CheckoutMetadata;
use crate::processor::{CreateSessionRequest, LineItem, PaymentProcessor};

/// Request to start a checkout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Requested tier, validated against the fixed table
    pub tier: String,

    /// Override for the name shown in the confirmation email
    #[serde(default)]
    pub user_name: Option<String>,

    /// Override for the confirmation email recipient
    #[serde(default)]
    pub user_email: Option<String>,

    /// Site origin the processor redirects back to
    pub return_origin: String,
}

/// Result of starting a checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutStarted {
    pub session_id: String,

    /// Hosted payment page
    pub url: String,
}

pub struct CheckoutInitiator {
    processor: Arc<dyn PaymentProcessor>,
    store: Arc<dyn EnrollmentStore>,
}

impl CheckoutInitiator {
    pub fn new(processor: Arc<dyn PaymentProcessor>, store: Arc<dyn EnrollmentStore>) -> Self {
        Self { processor, store }
    }

    pub async fn start_checkout(
        &self,
        user: &CurrentUser,
        request: CheckoutRequest,
    ) -> Result<CheckoutStarted> {
        let tier: CourseTier = request.tier.parse()?;
        let info = tier.info();

        tracing::info!(
            user_id = %user.id,
            tier = %tier,
            amount = info.price_cents,
            "Starting checkout"
        );

        let customer_id = match self.processor.find_customer_by_email(&user.email).await {
            Ok(found) => {
                if let Some(ref id) = found {
                    tracing::debug!(customer_id = %id, "Reusing existing customer");
                }
                found
            }
            Err(e) => {
                tracing::warn!(error = %e, "Customer lookup failed, continuing without one");
                None
            }
        };

        let metadata = CheckoutMetadata {
            user_id: user.id,
            tier,
            user_email: Some(request.user_email.unwrap_or_else(|| user.email.clone())),
            user_name: Some(
                request
                    .user_name
                    .unwrap_or_else(|| user.name_or_email().to_string()),
            ),
        };

        let origin = request.return_origin.trim_end_matches('/');
        let session = self
            .processor
            .create_session(CreateSessionRequest {
                customer_id,
                customer_email: user.email.clone(),
                line_item: LineItem {
                    name: format!("{} Course", info.name),
                    description: info.description.to_string(),
                    unit_amount: info.price_cents,
                },
                metadata: metadata.to_map(),
                success_url: format!("{origin}/payment-success?session_id={{CHECKOUT_SESSION_ID}}"),
                cancel_url: format!("{origin}/courses"),
            })
            .await?;

        tracing::info!(session_id = %session.id, "Checkout session created");

        let entry = PaymentLogEntry::session_created(user.id, &session.id, info.price_cents)
            .with_metadata(metadata.to_json(true));
        // The session exists either way; losing the audit row must not make
        // the buyer start over with a second session.
        if let Err(e) = self.store.insert_payment_log(&entry).await {
            tracing::warn!(session_id = %session.id, error = %e, "Failed to log session creation");
        }

        Ok(CheckoutStarted {
            session_id: session.id,
            url: session.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TIER;
    use crate::test_support::{user, FakeProcessor};
    use enroll_core::{EnrollError, MemoryEnrollmentStore, PaymentEventType, PaymentLogStatus};

    fn request(tier: &str) -> CheckoutRequest {
        CheckoutRequest {
            tier: tier.into(),
            user_name: Some("Ada".into()),
            user_email: None,
            return_origin: "https://courses.example.com/".into(),
        }
    }

    #[tokio::test]
    async fn test_checkout_creates_session_and_pending_log() {
        let processor = Arc::new(FakeProcessor::new());
        let store = Arc::new(MemoryEnrollmentStore::new());
        let initiator = CheckoutInitiator::new(processor.clone(), store.clone());
        let buyer = user();

        let started = initiator.start_checkout(&buyer, request("Beginner")).await.unwrap();

        let created = processor.created_requests().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].line_item.unit_amount, 25_000);
        assert_eq!(created[0].metadata.get(TIER).map(String::as_str), Some("beginner"));
        assert_eq!(
            created[0].success_url,
            "https://courses.example.com/payment-success?session_id={CHECKOUT_SESSION_ID}"
        );

        let snapshot = processor.get_session(&started.session_id).await.unwrap();
        assert_eq!(snapshot.amount_total, Some(25_000));

        let log = store.payment_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].event_type, PaymentEventType::CheckoutSessionCreated);
        assert_eq!(log[0].status, PaymentLogStatus::Pending);
        assert_eq!(log[0].session_id.as_deref(), Some(started.session_id.as_str()));

        // no premature enrollment
        assert_eq!(store.enrollment_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_tier_is_rejected_before_processor() {
        let processor = Arc::new(FakeProcessor::new());
        let store = Arc::new(MemoryEnrollmentStore::new());
        let initiator = CheckoutInitiator::new(processor.clone(), store.clone());

        let err = initiator.start_checkout(&user(), request("expert")).await.unwrap_err();

        assert!(matches!(err, EnrollError::InvalidTier(_)));
        assert!(processor.created_requests().await.is_empty());
        assert!(store.payment_log().await.is_empty());
    }

    #[tokio::test]
    async fn test_customer_lookup_failure_is_not_fatal() {
        let processor = Arc::new(FakeProcessor::new().failing_customer_lookup());
        let store = Arc::new(MemoryEnrollmentStore::new());
        let initiator = CheckoutInitiator::new(processor.clone(), store);

        initiator.start_checkout(&user(), request("advanced")).await.unwrap();

        let created = processor.created_requests().await;
        assert!(created[0].customer_id.is_none());
    }

    #[tokio::test]
    async fn test_existing_customer_is_reused() {
        let buyer = user();
        let processor = Arc::new(FakeProcessor::new().with_customer(&buyer.email, "cus_42"));
        let initiator =
            CheckoutInitiator::new(processor.clone(), Arc::new(MemoryEnrollmentStore::new()));

        initiator.start_checkout(&buyer, request("intermediate")).await.unwrap();

        let created = processor.created_requests().await;
        assert_eq!(created[0].customer_id.as_deref(), Some("cus_42"));
    }

    #[tokio::test]
    async fn test_session_failure_writes_nothing() {
        let processor = Arc::new(FakeProcessor::new().failing_session_creation());
        let store = Arc::new(MemoryEnrollmentStore::new());
        let initiator = CheckoutInitiator::new(processor, store.clone());

        let err = initiator.start_checkout(&user(), request("beginner")).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(store.payment_log().await.is_empty());
        assert_eq!(store.enrollment_count().await, 0);
    }
}
