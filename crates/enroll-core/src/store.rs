//! Enrollment State Store
//!
//! Persistence contract shared by the checkout initiator, the completion
//! reconciler and the status query.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::enrollment::{Enrollment, PaidEnrollment, UpsertOutcome};
use crate::error::Result;
use crate::payment_log::PaymentLogEntry;
use crate::tier::CourseTier;

/// Enrollment storage trait
///
/// `upsert_paid_enrollment` must be atomic per `(user_id, course_tier)`:
/// two concurrent first writes for the same key end as a single row, and
/// the losing writer observes that row instead of an error.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Insert or update-in-place the enrollment for the payment's key
    async fn upsert_paid_enrollment(&self, paid: &PaidEnrollment) -> Result<UpsertOutcome>;

    /// Get enrollment by natural key
    async fn find_by_key(&self, user_id: Uuid, tier: CourseTier) -> Result<Option<Enrollment>>;

    /// Get enrollment by processor session id, scoped to the caller
    async fn find_by_session(&self, session_id: &str, user_id: Uuid)
    -> Result<Option<Enrollment>>;

    /// All paid enrollments of a user
    async fn list_paid_for_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>>;

    /// Atomically flip the confirmation flag from unset to set.
    ///
    /// Returns `true` only for the caller that flipped it; that caller owns
    /// the send. Concurrent deliveries of one completion get `false`.
    async fn claim_confirmation(&self, enrollment_id: Uuid) -> Result<bool>;

    /// Clear the flag after a failed send so a later delivery can retry
    async fn release_confirmation(&self, enrollment_id: Uuid) -> Result<()>;

    /// Append an audit row
    async fn insert_payment_log(&self, entry: &PaymentLogEntry) -> Result<()>;
}

#[derive(Default)]
struct Tables {
    enrollments: HashMap<Uuid, Enrollment>,
    by_key: HashMap<(Uuid, CourseTier), Uuid>,
}

/// In-memory enrollment store (for development and tests)
#[derive(Default)]
pub struct MemoryEnrollmentStore {
    tables: RwLock<Tables>,
    payment_log: RwLock<Vec<PaymentLogEntry>>,
}

impl MemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row as-is, replacing whatever holds its key
    pub async fn seed(&self, enrollment: Enrollment) {
        let mut tables = self.tables.write().await;
        let key = (enrollment.user_id, enrollment.course_tier);
        if let Some(old) = tables.by_key.insert(key, enrollment.id) {
            tables.enrollments.remove(&old);
        }
        tables.enrollments.insert(enrollment.id, enrollment);
    }

    pub async fn enrollment_count(&self) -> usize {
        self.tables.read().await.enrollments.len()
    }

    /// Snapshot of the audit log in insertion order
    pub async fn payment_log(&self) -> Vec<PaymentLogEntry> {
        self.payment_log.read().await.clone()
    }
}

#[async_trait]
impl EnrollmentStore for MemoryEnrollmentStore {
    async fn upsert_paid_enrollment(&self, paid: &PaidEnrollment) -> Result<UpsertOutcome> {
        // Lookup and write share one guard; that is our uniqueness constraint.
        let mut tables = self.tables.write().await;
        let key = (paid.user_id, paid.course_tier);

        let existing = tables
            .by_key
            .get(&key)
            .and_then(|id| tables.enrollments.get(id));
        let outcome = Enrollment::apply_payment(existing, paid, Utc::now());

        tables.by_key.insert(key, outcome.enrollment.id);
        tables
            .enrollments
            .insert(outcome.enrollment.id, outcome.enrollment.clone());

        Ok(outcome)
    }

    async fn find_by_key(&self, user_id: Uuid, tier: CourseTier) -> Result<Option<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_key
            .get(&(user_id, tier))
            .and_then(|id| tables.enrollments.get(id))
            .cloned())
    }

    async fn find_by_session(
        &self,
        session_id: &str,
        user_id: Uuid,
    ) -> Result<Option<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .values()
            .find(|e| {
                e.user_id == user_id && e.payment_session_id.as_deref() == Some(session_id)
            })
            .cloned())
    }

    async fn list_paid_for_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<_> = tables
            .enrollments
            .values()
            .filter(|e| e.user_id == user_id && e.is_paid())
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.enrolled_at);
        Ok(rows)
    }

    async fn claim_confirmation(&self, enrollment_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.enrollments.get_mut(&enrollment_id) {
            Some(row) if !row.confirmation_email_sent => {
                row.confirmation_email_sent = true;
                true
            }
            _ => false,
        })
    }

    async fn release_confirmation(&self, enrollment_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(row) = tables.enrollments.get_mut(&enrollment_id) {
            row.confirmation_email_sent = false;
        }
        Ok(())
    }

    async fn insert_payment_log(&self, entry: &PaymentLogEntry) -> Result<()> {
        self.payment_log.write().await.push(entry.clone());
        Ok(())
    }
}
