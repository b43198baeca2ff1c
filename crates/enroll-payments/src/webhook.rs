//! Stripe Webhook Handling
//!
//! Turns processor notifications into enrollment state. Deliveries are
//! at-least-once and may race the buyer's status poll, so everything here
//! must be safe to run again from scratch.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use enroll_core::{
    EmailSender, EnrollError, Enrollment, EnrollmentStore, PaidEnrollment, PaymentEventType,
    PaymentLogEntry, PaymentLogStatus, Result,
};
use uuid::Uuid;

use crate::confirmation;
use crate::metadata::{self, CheckoutMetadata};
use crate::signature::SignaturePolicy;

/// Completed checkout session, as carried by the notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedSession {
    pub id: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub payment_intent: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Payment intent summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentIntentSummary {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Checkout completed - create or refresh the enrollment
    CheckoutCompleted {
        event_id: String,
        session: CompletedSession,
    },

    /// Payment intent succeeded - audit only
    PaymentSucceeded {
        event_id: String,
        intent: PaymentIntentSummary,
    },

    /// Payment failed - audit only, enrollments untouched
    PaymentFailed {
        event_id: String,
        intent: PaymentIntentSummary,
        reason: String,
    },

    /// Unhandled event type
    Other { event_id: String, event_type: String },
}

#[derive(Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

/// Stripe sends either an id or the expanded object
#[derive(Deserialize)]
#[serde(untagged)]
enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

#[derive(Deserialize)]
struct SessionObject {
    id: String,
    amount_total: Option<i64>,
    currency: Option<String>,
    payment_intent: Option<Expandable>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct PaymentErrorObject {
    message: Option<String>,
}

#[derive(Deserialize)]
struct IntentObject {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
    last_payment_error: Option<PaymentErrorObject>,
}

impl From<IntentObject> for PaymentIntentSummary {
    fn from(obj: IntentObject) -> Self {
        Self {
            id: obj.id,
            amount: obj.amount,
            currency: obj.currency,
            metadata: obj.metadata.unwrap_or_default(),
        }
    }
}

impl WebhookEvent {
    /// Parse the raw delivery body
    pub fn parse(payload: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(payload)?;
        let event_id = envelope.id;

        match envelope.event_type.as_str() {
            "checkout.session.completed" => {
                let obj: SessionObject = serde_json::from_value(envelope.data.object)?;
                Ok(Self::CheckoutCompleted {
                    event_id,
                    session: CompletedSession {
                        id: obj.id,
                        amount_total: obj.amount_total,
                        currency: obj.currency,
                        payment_intent: obj.payment_intent.map(Expandable::into_id),
                        metadata: obj.metadata.unwrap_or_default(),
                    },
                })
            }
            "payment_intent.succeeded" => {
                let obj: IntentObject = serde_json::from_value(envelope.data.object)?;
                Ok(Self::PaymentSucceeded {
                    event_id,
                    intent: obj.into(),
                })
            }
            "payment_intent.payment_failed" => {
                let mut obj: IntentObject = serde_json::from_value(envelope.data.object)?;
                let reason = obj
                    .last_payment_error
                    .take()
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "Payment failed".into());
                Ok(Self::PaymentFailed {
                    event_id,
                    intent: obj.into(),
                    reason,
                })
            }
            _ => Ok(Self::Other {
                event_id,
                event_type: envelope.event_type,
            }),
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            Self::CheckoutCompleted { event_id, .. }
            | Self::PaymentSucceeded { event_id, .. }
            | Self::PaymentFailed { event_id, .. }
            | Self::Other { event_id, .. } => event_id,
        }
    }
}

/// What a delivery resulted in
#[derive(Clone, Debug)]
pub enum ReconcileOutcome {
    /// Enrollment written (or confirmed unchanged on replay)
    Enrolled {
        enrollment: Enrollment,
        created: bool,
        email_sent: bool,
    },

    /// Audit row appended, no enrollment change
    PaymentLogged { event_type: PaymentEventType },

    /// Event type we don't act on
    Ignored { event_type: String },
}

/// Completion reconciler
pub struct CompletionReconciler {
    store: Arc<dyn EnrollmentStore>,
    email: Arc<dyn EmailSender>,
    signature: SignaturePolicy,
}

impl CompletionReconciler {
    pub fn new(
        store: Arc<dyn EnrollmentStore>,
        email: Arc<dyn EmailSender>,
        signature: SignaturePolicy,
    ) -> Self {
        if !signature.is_verified() {
            tracing::warn!(
                "Webhook signature verification disabled - payloads will be trusted as-is"
            );
        }
        Self {
            store,
            email,
            signature,
        }
    }

    /// Authenticate, parse and apply one webhook delivery.
    ///
    /// Signature failures are returned without touching the store. Any
    /// later failure is recorded as a `webhook_error` audit row and
    /// returned so the processor re-delivers.
    pub async fn handle_notification(
        &self,
        payload: &str,
        signature: Option<&str>,
    ) -> Result<ReconcileOutcome> {
        self.authenticate(payload, signature)?;

        let result = match WebhookEvent::parse(payload) {
            Ok(event) => self.reconcile(&event).await,
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            tracing::error!(error = %e, "Webhook processing failed");
            let entry = PaymentLogEntry::webhook_error(e.to_string()).with_metadata(
                serde_json::json!({ "signature_verified": self.signature.is_verified() }),
            );
            if let Err(log_err) = self.store.insert_payment_log(&entry).await {
                tracing::warn!(error = %log_err, "Failed to log webhook error");
            }
        }

        result
    }

    fn authenticate(&self, payload: &str, signature: Option<&str>) -> Result<()> {
        match &self.signature {
            SignaturePolicy::Required(verifier) => {
                let header = signature.ok_or_else(|| {
                    EnrollError::SignatureInvalid("missing Stripe-Signature header".into())
                })?;
                verifier.verify(payload, header).inspect_err(|e| {
                    tracing::warn!(error = %e, "Webhook signature verification failed");
                })
            }
            SignaturePolicy::Unverified => {
                tracing::warn!("Processing webhook without signature verification");
                Ok(())
            }
        }
    }

    /// Apply an already-authenticated event
    pub async fn reconcile(&self, event: &WebhookEvent) -> Result<ReconcileOutcome> {
        match event {
            WebhookEvent::CheckoutCompleted { event_id, session } => {
                self.on_checkout_completed(event_id, session).await
            }
            WebhookEvent::PaymentSucceeded { event_id, intent } => {
                tracing::info!(payment_intent = %intent.id, "Payment intent succeeded");
                let entry = self.intent_entry(
                    PaymentEventType::PaymentSucceeded,
                    PaymentLogStatus::Succeeded,
                    event_id,
                    intent,
                );
                self.store.insert_payment_log(&entry).await?;
                Ok(ReconcileOutcome::PaymentLogged {
                    event_type: PaymentEventType::PaymentSucceeded,
                })
            }
            WebhookEvent::PaymentFailed {
                event_id,
                intent,
                reason,
            } => {
                tracing::warn!(payment_intent = %intent.id, reason = %reason, "Payment failed");
                let mut entry = self.intent_entry(
                    PaymentEventType::PaymentFailed,
                    PaymentLogStatus::Failed,
                    event_id,
                    intent,
                );
                entry.error_message = Some(reason.clone());
                self.store.insert_payment_log(&entry).await?;
                Ok(ReconcileOutcome::PaymentLogged {
                    event_type: PaymentEventType::PaymentFailed,
                })
            }
            WebhookEvent::Other { event_type, .. } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(ReconcileOutcome::Ignored {
                    event_type: event_type.clone(),
                })
            }
        }
    }

    async fn on_checkout_completed(
        &self,
        event_id: &str,
        session: &CompletedSession,
    ) -> Result<ReconcileOutcome> {
        tracing::info!(session_id = %session.id, event_id, "Processing checkout completion");

        let meta = CheckoutMetadata::from_map(&session.metadata)?;
        let amount_paid = session.amount_total.unwrap_or_else(|| {
            tracing::warn!(session_id = %session.id, "Completed session has no amount_total");
            0
        });

        let paid = PaidEnrollment {
            user_id: meta.user_id,
            course_tier: meta.tier,
            amount_paid,
            payment_session_id: session.id.clone(),
            payment_intent_id: session.payment_intent.clone(),
            access_link: meta.tier.access_link().to_string(),
        };

        let outcome = self.store.upsert_paid_enrollment(&paid).await?;
        let enrollment = outcome.enrollment;

        if outcome.created {
            tracing::info!(enrollment_id = %enrollment.id, "Created new enrollment");
        } else if outcome.replayed {
            tracing::info!(
                enrollment_id = %enrollment.id,
                "Duplicate completion, enrollment unchanged"
            );
        } else {
            tracing::info!(enrollment_id = %enrollment.id, "Updated existing enrollment");
        }

        let mut entry = PaymentLogEntry::new(
            PaymentEventType::CheckoutCompleted,
            PaymentLogStatus::Succeeded,
        )
        .with_user(meta.user_id)
        .with_enrollment(enrollment.id)
        .with_event_id(event_id)
        .with_metadata(meta.to_json(self.signature.is_verified()));
        entry.session_id = Some(session.id.clone());
        entry.payment_intent_id = session.payment_intent.clone();
        entry.amount = Some(amount_paid);
        entry.currency = Some(session.currency.clone().unwrap_or_else(|| "usd".into()));
        self.store.insert_payment_log(&entry).await?;

        let email_sent = if enrollment.confirmation_email_sent {
            true
        } else if let Some(ref to) = meta.user_email {
            let name = meta.user_name.as_deref().unwrap_or(to);
            confirmation::send_confirmation(
                self.email.as_ref(),
                self.store.as_ref(),
                &enrollment,
                to,
                name,
            )
            .await
        } else {
            tracing::warn!(
                enrollment_id = %enrollment.id,
                "No email in metadata, skipping confirmation"
            );
            false
        };

        Ok(ReconcileOutcome::Enrolled {
            enrollment: Enrollment {
                confirmation_email_sent: email_sent,
                ..enrollment
            },
            created: outcome.created,
            email_sent,
        })
    }

    fn intent_entry(
        &self,
        event_type: PaymentEventType,
        status: PaymentLogStatus,
        event_id: &str,
        intent: &PaymentIntentSummary,
    ) -> PaymentLogEntry {
        let mut entry = PaymentLogEntry::new(event_type, status)
            .with_event_id(event_id)
            .with_metadata(serde_json::json!({
                "intent_metadata": intent.metadata,
                "signature_verified": self.signature.is_verified(),
            }));
        entry.user_id = intent
            .metadata
            .get(metadata::USER_ID)
            .and_then(|id| Uuid::parse_str(id).ok());
        entry.payment_intent_id = Some(intent.id.clone());
        entry.amount = Some(intent.amount);
        entry.currency = Some(intent.currency.clone());
        entry
    }
}
