//! Identity Seam
//!
//! Resolves a bearer credential into the current user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Authenticated caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,

    /// Verified email
    pub email: String,

    pub display_name: Option<String>,
}

impl CurrentUser {
    /// Name to greet the user with, falling back to their email
    pub fn name_or_email(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Identity provider trait
///
/// Implementations fail with `EnrollError::Unauthenticated` when the token
/// is missing, expired or forged.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self, bearer_token: &str) -> Result<CurrentUser>;
}
