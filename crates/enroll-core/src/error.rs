//! Error Types

use thiserror::Error;

/// Result type alias for enrollment operations
pub type Result<T> = std::result::Result<T, EnrollError>;

/// Enrollment error types
#[derive(Error, Debug)]
pub enum EnrollError {
    /// Missing or invalid bearer credential
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Requested tier is not one of the fixed tiers
    #[error("Invalid course tier: {0}")]
    InvalidTier(String),

    /// Processor metadata names a tier we do not know
    #[error("Unknown course tier in payment metadata: {0}")]
    UnknownTier(String),

    /// Notification lacks a required correlation field
    #[error("Missing required metadata: {0}")]
    MissingMetadata(&'static str),

    /// Webhook authenticity check failed
    #[error("Webhook signature invalid: {0}")]
    SignatureInvalid(String),

    /// Payment processor, email provider or data store call failed
    #[error("{service} unavailable: {reason}")]
    UpstreamUnavailable {
        service: &'static str,
        reason: String,
    },

    /// Reconciliation has not landed within the poll window
    #[error("Enrollment still processing after {attempts} attempts")]
    AlreadyProcessing { attempts: u32 },

    /// Malformed request or payload
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnrollError {
    pub fn upstream(service: &'static str, reason: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            service,
            reason: reason.to_string(),
        }
    }

    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    /// Stable machine-readable code for HTTP error bodies
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::InvalidTier(_) => "INVALID_TIER",
            Self::UnknownTier(_) => "UNKNOWN_TIER",
            Self::MissingMetadata(_) => "MISSING_METADATA",
            Self::SignatureInvalid(_) => "SIGNATURE_INVALID",
            Self::UpstreamUnavailable { .. } => "UPSTREAM_UNAVAILABLE",
            Self::AlreadyProcessing { .. } => "ALREADY_PROCESSING",
            Self::InvalidRequest(_) | Self::Json(_) => "INVALID_REQUEST",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated(_) => "Please sign in to continue.".into(),
            Self::InvalidTier(tier) | Self::UnknownTier(tier) => {
                format!("'{tier}' is not an available course level.")
            }
            Self::UpstreamUnavailable { .. } => {
                "We couldn't reach the payment service. Please try again.".into()
            }
            Self::AlreadyProcessing { .. } => {
                "Your payment was successful! \
                 We'll email you once your enrollment is fully processed."
                    .into()
            }
            Self::InvalidRequest(msg) => format!("Invalid request: {msg}"),
            _ => "An error occurred processing your request.".into(),
        }
    }
}

impl From<anyhow::Error> for EnrollError {
    fn from(err: anyhow::Error) -> Self {
        Self::upstream("internal", err)
    }
}
