//! Checkout Session Metadata
//!
//! Correlation fields written onto the session at checkout and read back
//! when the completion notification arrives.

use std::collections::HashMap;
use uuid::Uuid;

use enroll_core::{CourseTier, EnrollError, Result};

pub const USER_ID: &str = "user_id";
pub const USER_EMAIL: &str = "user_email";
pub const USER_NAME: &str = "user_name";
pub const TIER: &str = "tier";

/// Metadata attached to every checkout session we create
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub user_id: Uuid,
    pub tier: CourseTier,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

impl CheckoutMetadata {
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(USER_ID.to_string(), self.user_id.to_string());
        map.insert(TIER.to_string(), self.tier.as_str().to_string());
        if let Some(ref email) = self.user_email {
            map.insert(USER_EMAIL.to_string(), email.clone());
        }
        if let Some(ref name) = self.user_name {
            map.insert(USER_NAME.to_string(), name.clone());
        }
        map
    }

    /// Read the correlation fields back.
    ///
    /// `user_id` and `tier` are required; an unparseable user id counts as
    /// missing. A tier we don't know is `UnknownTier`.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let user_id = non_empty(map, USER_ID)
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(EnrollError::MissingMetadata(USER_ID))?;

        let tier = non_empty(map, TIER).ok_or(EnrollError::MissingMetadata(TIER))?;
        let tier = CourseTier::from_metadata(tier)?;

        Ok(Self {
            user_id,
            tier,
            user_email: non_empty(map, USER_EMAIL).map(str::to_string),
            user_name: non_empty(map, USER_NAME).map(str::to_string),
        })
    }

    pub fn to_json(&self, signature_verified: bool) -> serde_json::Value {
        serde_json::json!({
            "tier": self.tier,
            "user_email": self.user_email,
            "user_name": self.user_name,
            "signature_verified": signature_verified,
        })
    }
}

fn non_empty<'a>(map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    map.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
}
