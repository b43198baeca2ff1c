//! Session Status Polling
//!
//! After the hosted checkout page redirects back, the buyer's client polls
//! the status endpoint until the reconciler has written the enrollment.
//! The loop is bounded; running out of attempts is reported as
//! `AlreadyProcessing`, which callers present as "we'll email you" rather
//! than as a failure, since the webhook may simply be late.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::enrollment::Enrollment;
use crate::error::{EnrollError, Result};

/// Status of a checkout session as seen by the buyer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SessionStatus {
    /// Processor has not marked the session paid
    Pending,

    /// Paid, but the enrollment row has not landed yet
    Processing,

    /// Paid and enrolled
    Completed { enrollment: Enrollment },
}

impl SessionStatus {
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Anything that can answer "what is the status of this session?"
#[async_trait]
pub trait SessionStatusSource: Send + Sync {
    async fn session_status(&self, session_id: &str) -> Result<SessionStatus>;
}

/// Retry bound for the poll loop
#[derive(Clone, Debug)]
pub struct PollPolicy {
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub interval: Duration,

    /// Multiplier applied to the delay after each attempt (1.0 = fixed)
    pub backoff_factor: f64,

    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
            backoff_factor: 1.0,
            max_interval: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    /// Delay to wait after the given (zero-based) attempt
    ///
    /// Growth is computed in float seconds and capped before it becomes a
    /// `Duration`, so any attempt number is safe.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let cap = self.max_interval.max(self.interval);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.interval.as_secs_f64() * self.backoff_factor.max(1.0).powi(exponent);

        Duration::try_from_secs_f64(secs).map_or(cap, |delay| delay.min(cap))
    }
}

/// Poll until the session is completed or the bound is exhausted.
///
/// Transient upstream errors consume an attempt and the loop keeps going;
/// any other error is returned immediately.
pub async fn poll_session_status(
    source: &dyn SessionStatusSource,
    session_id: &str,
    policy: &PollPolicy,
) -> Result<Enrollment> {
    for attempt in 0..policy.max_attempts {
        match source.session_status(session_id).await {
            Ok(SessionStatus::Completed { enrollment }) => {
                tracing::info!(session_id, attempt, "Enrollment confirmed");
                return Ok(enrollment);
            }
            Ok(status) => {
                tracing::debug!(session_id, attempt, ?status, "Session not settled yet");
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(session_id, attempt, error = %e, "Status check failed, retrying");
            }
            Err(e) => return Err(e),
        }

        if attempt + 1 < policy.max_attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    tracing::warn!(session_id, attempts = policy.max_attempts, "Giving up on session poll");
    Err(EnrollError::AlreadyProcessing {
        attempts: policy.max_attempts,
    })
}
