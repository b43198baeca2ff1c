//! Server Configuration
//!
//! Everything comes from the environment (optionally seeded from `.env`).

use enroll_core::{EnrollError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub environment: Environment,

    /// Return origin used when a checkout request carries no `Origin`
    pub app_base_url: Option<String>,

    /// CORS origin; any origin when unset
    pub allowed_origin: Option<String>,

    pub stripe_secret_key: String,
    pub stripe_webhook_secret: Option<String>,
    pub supabase_jwt_secret: String,

    /// Recipient of contact-form notices
    pub admin_email: Option<String>,

    pub database_url: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| {
            get(key).ok_or_else(|| EnrollError::Config(format!("{key} not set")))
        };

        let environment = match get("APP_ENV").as_deref() {
            Some("production" | "prod") => Environment::Production,
            Some("development" | "dev") | None => Environment::Development,
            Some(other) => {
                return Err(EnrollError::Config(format!("unknown APP_ENV '{other}'")));
            }
        };

        let config = Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            environment,
            app_base_url: get("APP_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            allowed_origin: get("ALLOWED_ORIGIN"),
            stripe_secret_key: require("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: get("STRIPE_WEBHOOK_SECRET"),
            supabase_jwt_secret: require("SUPABASE_JWT_SECRET")?,
            admin_email: get("ADMIN_EMAIL"),
            database_url: get("DATABASE_URL"),
        };

        if config.environment == Environment::Production && config.stripe_webhook_secret.is_none() {
            return Err(EnrollError::Config(
                "STRIPE_WEBHOOK_SECRET is required when APP_ENV=production".into(),
            ));
        }

        Ok(config)
    }
}
