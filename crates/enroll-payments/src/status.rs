//! Session Status Query
//!
//! Read-only view for the buyer returning from the hosted checkout page.
//! All enrollment writes stay with the webhook path so there is only one
//! writer per key.

use async_trait::async_trait;
use std::sync::Arc;

use enroll_core::{
    CurrentUser, EnrollError, EnrollmentStore, Result, SessionStatus, SessionStatusSource,
};

use crate::metadata;
use crate::processor::PaymentProcessor;

pub struct SessionStatusQuery {
    processor: Arc<dyn PaymentProcessor>,
    store: Arc<dyn EnrollmentStore>,
}

impl SessionStatusQuery {
    pub fn new(processor: Arc<dyn PaymentProcessor>, store: Arc<dyn EnrollmentStore>) -> Self {
        Self { processor, store }
    }

    pub async fn session_status(
        &self,
        user: &CurrentUser,
        session_id: &str,
    ) -> Result<SessionStatus> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(EnrollError::InvalidRequest("session_id is required".into()));
        }

        let session = self.processor.get_session(session_id).await?;

        // Sessions belong to whoever started them; no owner means no match.
        let owner = session.metadata.get(metadata::USER_ID).map(String::as_str);
        if owner != Some(user.id.to_string().as_str()) {
            tracing::warn!(
                session_id,
                user_id = %user.id,
                "Status query for a session the caller does not own"
            );
            return Err(EnrollError::InvalidRequest("unknown session".into()));
        }

        if !session.paid {
            return Ok(SessionStatus::Pending);
        }

        match self.store.find_by_session(session_id, user.id).await? {
            Some(enrollment) => {
                tracing::debug!(session_id, enrollment_id = %enrollment.id, "Enrollment found");
                Ok(SessionStatus::Completed { enrollment })
            }
            None => {
                tracing::debug!(session_id, "Paid but enrollment not yet created");
                Ok(SessionStatus::Processing)
            }
        }
    }

    /// Bind the query to one caller so it can drive the poll loop in-process
    pub fn for_user(self: &Arc<Self>, user: CurrentUser) -> UserStatusSource {
        UserStatusSource {
            query: Arc::clone(self),
            user,
        }
    }
}

/// `SessionStatusSource` for a fixed caller
pub struct UserStatusSource {
    query: Arc<SessionStatusQuery>,
    user: CurrentUser,
}

#[async_trait]
impl SessionStatusSource for UserStatusSource {
    async fn session_status(&self, session_id: &str) -> Result<SessionStatus> {
        self.query.session_status(&self.user, session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{CheckoutInitiator, CheckoutRequest};
    use crate::processor::{CreateSessionRequest, LineItem};
    use crate::signature::SignaturePolicy;
    use crate::test_support::{completed_event, user, FakeProcessor, RecordingEmail};
    use crate::webhook::CompletionReconciler;
    use enroll_core::{poll_session_status, MemoryEnrollmentStore, PollPolicy};
    use std::collections::HashMap;
    use std::time::Duration;

    struct Flow {
        processor: Arc<FakeProcessor>,
        store: Arc<MemoryEnrollmentStore>,
        query: Arc<SessionStatusQuery>,
        reconciler: CompletionReconciler,
        buyer: CurrentUser,
        session_id: String,
    }

    async fn started_flow() -> Flow {
        let processor = Arc::new(FakeProcessor::new());
        let store = Arc::new(MemoryEnrollmentStore::new());
        let buyer = user();

        let started = CheckoutInitiator::new(processor.clone(), store.clone())
            .start_checkout(
                &buyer,
                CheckoutRequest {
                    tier: "intermediate".into(),
                    user_name: None,
                    user_email: None,
                    return_origin: "https://courses.example.com".into(),
                },
            )
            .await
            .unwrap();

        Flow {
            query: Arc::new(SessionStatusQuery::new(processor.clone(), store.clone())),
            reconciler: CompletionReconciler::new(
                store.clone(),
                Arc::new(RecordingEmail::new()),
                SignaturePolicy::Unverified,
            ),
            processor,
            store,
            buyer,
            session_id: started.session_id,
        }
    }

    impl Flow {
        async fn deliver_webhook(&self) {
            let session = self.processor.session(&self.session_id).await.unwrap();
            self.reconciler
                .handle_notification(&completed_event("evt_1", &session), None)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_unpaid_session_is_pending() {
        let flow = started_flow().await;

        let status = flow.query.session_status(&flow.buyer, &flow.session_id).await.unwrap();

        assert_eq!(status, SessionStatus::Pending);
    }

    #[tokio::test]
    async fn test_paid_before_webhook_is_processing_and_read_only() {
        let flow = started_flow().await;
        flow.processor.mark_paid(&flow.session_id).await;

        for _ in 0..3 {
            let status = flow.query.session_status(&flow.buyer, &flow.session_id).await.unwrap();
            assert_eq!(status, SessionStatus::Processing);
        }
        assert_eq!(flow.store.enrollment_count().await, 0);
    }

    #[tokio::test]
    async fn test_completed_after_webhook() {
        let flow = started_flow().await;
        flow.processor.mark_paid(&flow.session_id).await;
        flow.deliver_webhook().await;

        let status = flow.query.session_status(&flow.buyer, &flow.session_id).await.unwrap();

        let SessionStatus::Completed { enrollment } = status else {
            panic!("expected completed status");
        };
        assert_eq!(enrollment.user_id, flow.buyer.id);
        assert_eq!(enrollment.amount_paid, 35_000);
        assert!(enrollment.access_link.is_some());
    }

    #[tokio::test]
    async fn test_other_users_cannot_query_session() {
        let flow = started_flow().await;
        flow.processor.mark_paid(&flow.session_id).await;
        flow.deliver_webhook().await;

        let err = flow
            .query
            .session_status(&user(), &flow.session_id)
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_session_without_owner_is_rejected() {
        let flow = started_flow().await;
        let orphan = flow
            .processor
            .create_session(CreateSessionRequest {
                customer_id: None,
                customer_email: flow.buyer.email.clone(),
                line_item: LineItem {
                    name: "Intermediate".into(),
                    description: "Untagged session".into(),
                    unit_amount: 35_000,
                },
                metadata: HashMap::new(),
                success_url: "https://courses.example.com/success".into(),
                cancel_url: "https://courses.example.com/cancel".into(),
            })
            .await
            .unwrap();
        flow.processor.mark_paid(&orphan.id).await;

        let err = flow
            .query
            .session_status(&flow.buyer, &orphan.id)
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_empty_session_id() {
        let flow = started_flow().await;
        let err = flow.query.session_status(&flow.buyer, "  ").await.unwrap_err();
        assert!(matches!(err, EnrollError::InvalidRequest(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_poll_sees_late_webhook() {
        let flow = Arc::new(started_flow().await);
        flow.processor.mark_paid(&flow.session_id).await;

        let late = {
            let flow = flow.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                flow.deliver_webhook().await;
            })
        };

        let source = flow.query.for_user(flow.buyer.clone());
        let policy = PollPolicy {
            max_attempts: 200,
            interval: Duration::from_millis(5),
            ..PollPolicy::default()
        };
        let enrollment = poll_session_status(&source, &flow.session_id, &policy)
            .await
            .unwrap();

        late.await.unwrap();
        assert_eq!(enrollment.payment_session_id.as_deref(), Some(flow.session_id.as_str()));
    }
}
