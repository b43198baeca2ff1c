//! # enroll-core
//!
//! Domain model and collaborator seams for course enrollment.
//!
//! A paid enrollment comes into existence through exactly one path:
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────┐   ┌──────────────────┐
//! │   Checkout   │──▶│ Payment processor │──▶│    Completion    │
//! │   Initiator  │   │  (hosted page)    │   │    Reconciler    │
//! └──────────────┘   └───────────────────┘   └────────┬─────────┘
//!                                                     │ upsert by
//!                                                     ▼ (user, tier)
//!                                            ┌──────────────────┐
//!                                            │ EnrollmentStore  │
//!                                            └──────────────────┘
//! ```
//!
//! This crate holds the pieces shared by every stage: the fixed tier
//! table, the enrollment and payment-log records, the store / identity /
//! email traits, and the bounded poll loop clients use while waiting for
//! the reconciler to land.

pub mod email;
pub mod enrollment;
pub mod error;
pub mod identity;
pub mod payment_log;
pub mod poll;
pub mod store;
pub mod tier;

pub use email::{escape_html, EmailMessage, EmailSender};
pub use enrollment::{Enrollment, PaidEnrollment, PaymentStatus, UpsertOutcome};
pub use error::{EnrollError, Result};
pub use identity::{CurrentUser, IdentityProvider};
pub use payment_log::{PaymentEventType, PaymentLogEntry, PaymentLogStatus};
pub use poll::{poll_session_status, PollPolicy, SessionStatus, SessionStatusSource};
pub use store::{EnrollmentStore, MemoryEnrollmentStore};
pub use tier::{format_usd, CourseTier, TierInfo};
