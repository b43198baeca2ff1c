//! Enrollment Records
//!
//! An enrollment is a user's paid access to one course tier. The natural
//! key is `(user_id, course_tier)`; at most one row exists per key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tier::CourseTier;

/// Payment status of an enrollment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            // older rows were written as "completed"
            "paid" | "completed" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A persisted enrollment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_tier: CourseTier,
    pub payment_status: PaymentStatus,

    /// Amount paid in cents
    pub amount_paid: i64,

    pub payment_session_id: Option<String>,
    pub payment_intent_id: Option<String>,

    /// Live-class join link; always set once paid
    pub access_link: Option<String>,

    pub confirmation_email_sent: bool,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub const fn is_paid(&self) -> bool {
        matches!(self.payment_status, PaymentStatus::Paid)
    }

    /// Apply a confirmed payment to the row stored under the same key.
    ///
    /// Returns the resulting row plus whether it was freshly created and
    /// whether this was a replay of a payment already recorded (same
    /// session, already paid). A replay keeps `enrolled_at` and the
    /// confirmation flag so repeated delivery is a no-op.
    pub fn apply_payment(
        existing: Option<&Self>,
        paid: &PaidEnrollment,
        now: DateTime<Utc>,
    ) -> UpsertOutcome {
        match existing {
            None => UpsertOutcome {
                enrollment: Self {
                    id: Uuid::new_v4(),
                    user_id: paid.user_id,
                    course_tier: paid.course_tier,
                    payment_status: PaymentStatus::Paid,
                    amount_paid: paid.amount_paid,
                    payment_session_id: Some(paid.payment_session_id.clone()),
                    payment_intent_id: paid.payment_intent_id.clone(),
                    access_link: Some(paid.access_link.clone()),
                    confirmation_email_sent: false,
                    enrolled_at: now,
                },
                created: true,
                replayed: false,
            },
            Some(row) => {
                let replayed = row.is_paid()
                    && row.payment_session_id.as_deref() == Some(paid.payment_session_id.as_str());

                UpsertOutcome {
                    enrollment: Self {
                        id: row.id,
                        user_id: row.user_id,
                        course_tier: row.course_tier,
                        payment_status: PaymentStatus::Paid,
                        amount_paid: paid.amount_paid,
                        payment_session_id: Some(paid.payment_session_id.clone()),
                        payment_intent_id: paid.payment_intent_id.clone(),
                        access_link: Some(paid.access_link.clone()),
                        confirmation_email_sent: replayed && row.confirmation_email_sent,
                        enrolled_at: if replayed { row.enrolled_at } else { now },
                    },
                    created: false,
                    replayed,
                }
            }
        }
    }
}

/// Input for the upsert-by-key operation.
///
/// Only confirmed payments reach the store, and `access_link` is not
/// optional here, so a paid row can never lack its artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaidEnrollment {
    pub user_id: Uuid,
    pub course_tier: CourseTier,
    pub amount_paid: i64,
    pub payment_session_id: String,
    pub payment_intent_id: Option<String>,
    pub access_link: String,
}

/// Result of upserting a paid enrollment
#[derive(Clone, Debug)]
pub struct UpsertOutcome {
    pub enrollment: Enrollment,

    /// No row existed for the key before this write
    pub created: bool,

    /// The row was already paid for the same session
    pub replayed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn paid(session: &str) -> PaidEnrollment {
        PaidEnrollment {
            user_id: Uuid::new_v4(),
            course_tier: CourseTier::Beginner,
            amount_paid: 25_000,
            payment_session_id: session.into(),
            payment_intent_id: Some("pi_1".into()),
            access_link: CourseTier::Beginner.access_link().into(),
        }
    }

    #[test]
    fn test_first_payment_creates_paid_row() {
        let input = paid("cs_1");
        let outcome = Enrollment::apply_payment(None, &input, Utc::now());

        assert!(outcome.created);
        assert!(!outcome.replayed);
        assert!(outcome.enrollment.is_paid());
        assert!(outcome.enrollment.access_link.is_some());
        assert!(!outcome.enrollment.confirmation_email_sent);
    }

    #[test]
    fn test_replay_keeps_row_unchanged() {
        let input = paid("cs_1");
        let first_at = Utc::now();
        let mut first = Enrollment::apply_payment(None, &input, first_at).enrollment;
        first.confirmation_email_sent = true;

        let again =
            Enrollment::apply_payment(Some(&first), &input, first_at + Duration::minutes(5));

        assert!(again.replayed);
        assert!(!again.created);
        assert_eq!(again.enrollment, first);
    }

    #[test]
    fn test_new_session_overwrites_pending_row() {
        let input = paid("cs_2");
        let pending = Enrollment {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            course_tier: input.course_tier,
            payment_status: PaymentStatus::Pending,
            amount_paid: 0,
            payment_session_id: Some("cs_old".into()),
            payment_intent_id: None,
            access_link: None,
            confirmation_email_sent: false,
            enrolled_at: Utc::now() - Duration::days(1),
        };

        let outcome = Enrollment::apply_payment(Some(&pending), &input, Utc::now());

        assert!(!outcome.replayed);
        assert_eq!(outcome.enrollment.id, pending.id);
        assert!(outcome.enrollment.is_paid());
        assert_eq!(outcome.enrollment.payment_session_id.as_deref(), Some("cs_2"));
    }

    #[test]
    fn test_legacy_completed_status_reads_as_paid() {
        assert_eq!(PaymentStatus::parse("completed"), Some(PaymentStatus::Paid));
        assert_eq!(PaymentStatus::parse("refunded"), None);
    }
}
