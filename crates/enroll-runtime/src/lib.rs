//! # enroll-runtime
//!
//! Concrete collaborators for the enrollment flow.
//!
//! ## Adapters
//!
//! - **Supabase**: access-token validation (`IdentityProvider`)
//! - **Resend**: transactional email (`EmailSender`)
//! - **Postgres** (feature `postgres`): durable `EnrollmentStore`
//! - **API client**: `SessionStatusSource` over HTTP for the poll loop
//!
//! ## Usage
//!
//! ```rust,ignore
//! use enroll_runtime::{EnrollmentApiClient, SupabaseIdentity};
//!
//! let identity = Arc::new(SupabaseIdentity::from_env()?);
//! let client = EnrollmentApiClient::new("https://api.example.com", token);
//! let enrollment = poll_session_status(&client, &session_id, &PollPolicy::default()).await?;
//! ```

pub mod client;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod resend;
pub mod supabase;

pub use client::EnrollmentApiClient;
#[cfg(feature = "postgres")]
pub use postgres::PostgresEnrollmentStore;
pub use resend::{LogEmailSender, ResendConfig, ResendEmailSender};
pub use supabase::SupabaseIdentity;
