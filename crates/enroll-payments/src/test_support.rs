//! Hand-written fakes shared by this crate's tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use enroll_core::{CurrentUser, EmailMessage, EmailSender, EnrollError, Result};

use crate::processor::{CreateSessionRequest, CreatedSession, PaymentProcessor, SessionSnapshot};

pub fn user() -> CurrentUser {
    CurrentUser {
        id: Uuid::new_v4(),
        email: "ada@example.com".into(),
        display_name: Some("Ada Lovelace".into()),
    }
}

/// In-memory stand-in for the payment processor
#[derive(Default)]
pub struct FakeProcessor {
    customers: HashMap<String, String>,
    fail_lookup: bool,
    fail_create: bool,
    created: Mutex<Vec<CreateSessionRequest>>,
    sessions: Mutex<HashMap<String, SessionSnapshot>>,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer(mut self, email: &str, id: &str) -> Self {
        self.customers.insert(email.into(), id.into());
        self
    }

    pub fn failing_customer_lookup(mut self) -> Self {
        self.fail_lookup = true;
        self
    }

    pub fn failing_session_creation(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub async fn created_requests(&self) -> Vec<CreateSessionRequest> {
        self.created.lock().await.clone()
    }

    /// Simulate the buyer finishing payment on the hosted page
    pub async fn mark_paid(&self, session_id: &str) {
        if let Some(session) = self.sessions.lock().await.get_mut(session_id) {
            session.paid = true;
            session.payment_intent = Some(format!("pi_{session_id}"));
        }
    }

    pub async fn session(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.sessions.lock().await.get(session_id).cloned()
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>> {
        if self.fail_lookup {
            return Err(EnrollError::upstream("stripe", "customer search unavailable"));
        }
        Ok(self.customers.get(email).cloned())
    }

    async fn create_session(&self, request: CreateSessionRequest) -> Result<CreatedSession> {
        if self.fail_create {
            return Err(EnrollError::upstream("stripe", "connection reset"));
        }

        let id = format!("cs_test_{}", Uuid::new_v4().simple());
        self.sessions.lock().await.insert(
            id.clone(),
            SessionSnapshot {
                id: id.clone(),
                paid: false,
                amount_total: Some(request.line_item.unit_amount),
                currency: Some("usd".into()),
                payment_intent: None,
                metadata: request.metadata.clone(),
            },
        );
        self.created.lock().await.push(request);

        Ok(CreatedSession {
            url: format!("https://checkout.stripe.com/c/pay/{id}"),
            id,
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionSnapshot> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| EnrollError::InvalidRequest(format!("no such session: {session_id}")))
    }
}

/// Email sender that records messages, or fails every send
#[derive(Default)]
pub struct RecordingEmail {
    fail: bool,
    latency: Option<Duration>,
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Provider that takes `latency` to accept each message
    pub fn slow(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmail {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail {
            return Err(EnrollError::upstream("email", "provider returned 503"));
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// `checkout.session.completed` delivery for a session snapshot
pub fn completed_event(event_id: &str, session: &SessionSnapshot) -> String {
    serde_json::json!({
        "id": event_id,
        "object": "event",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session.id,
                "object": "checkout.session",
                "amount_total": session.amount_total,
                "currency": session.currency,
                "payment_intent": session.payment_intent,
                "payment_status": "paid",
                "metadata": session.metadata,
            }
        }
    })
    .to_string()
}

/// `payment_intent.payment_failed` delivery
pub fn payment_failed_event(event_id: &str, intent_id: &str, reason: &str) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "payment_intent.payment_failed",
        "data": {
            "object": {
                "id": intent_id,
                "object": "payment_intent",
                "amount": 25_000,
                "currency": "usd",
                "metadata": {},
                "last_payment_error": { "message": reason }
            }
        }
    })
    .to_string()
}
