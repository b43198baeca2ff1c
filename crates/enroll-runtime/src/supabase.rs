//! Supabase Identity
//!
//! Validates Supabase access tokens (HS256, audience `authenticated`)
//! and maps their claims onto `CurrentUser`.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use enroll_core::{CurrentUser, EnrollError, IdentityProvider, Result};

const AUDIENCE: &str = "authenticated";

#[derive(Debug, Serialize, Deserialize)]
pub struct SupabaseClaims {
    pub sub: String,
    pub aud: String,
    pub email: Option<String>,
    pub exp: usize,

    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
}

pub struct SupabaseIdentity {
    key: DecodingKey,
    validation: Validation,
}

impl SupabaseIdentity {
    pub fn new(jwt_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);

        Self {
            key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Create from `SUPABASE_JWT_SECRET`
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("SUPABASE_JWT_SECRET")
            .map_err(|_| EnrollError::Config("SUPABASE_JWT_SECRET not set".into()))?;
        Ok(Self::new(&secret))
    }

    pub fn validate(&self, token: &str) -> Result<CurrentUser> {
        let data = decode::<SupabaseClaims>(token, &self.key, &self.validation)
            .map_err(|e| EnrollError::Unauthenticated(format!("JWT validation failed: {e}")))?;
        let claims = data.claims;

        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| EnrollError::Unauthenticated("invalid user id in token".into()))?;
        let email = claims
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| EnrollError::Unauthenticated("token carries no email".into()))?;

        Ok(CurrentUser {
            id,
            email,
            display_name: claims.user_metadata.full_name.filter(|n| !n.trim().is_empty()),
        })
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn current_user(&self, bearer_token: &str) -> Result<CurrentUser> {
        self.validate(bearer_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "supersecretjwtsecretforunittesting123";
    const SUB: &str = "123e4567-e89b-12d3-a456-426614174000";

    fn token(secret: &str, claims: &SupabaseClaims) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn claims() -> SupabaseClaims {
        SupabaseClaims {
            sub: SUB.into(),
            aud: AUDIENCE.into(),
            email: Some("test@example.com".into()),
            exp: 9_999_999_999,
            user_metadata: UserMetadata {
                full_name: Some("Grace Hopper".into()),
            },
        }
    }

    #[test]
    fn test_valid_token() {
        let identity = SupabaseIdentity::new(SECRET);

        let user = identity.validate(&token(SECRET, &claims())).unwrap();

        assert_eq!(user.id.to_string(), SUB);
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.display_name.as_deref(), Some("Grace Hopper"));
    }

    #[test]
    fn test_expired_token() {
        let identity = SupabaseIdentity::new(SECRET);
        let expired = SupabaseClaims { exp: 1, ..claims() };

        let err = identity.validate(&token(SECRET, &expired)).unwrap_err();
        assert!(matches!(err, EnrollError::Unauthenticated(_)));
    }

    #[test]
    fn test_wrong_secret() {
        let identity = SupabaseIdentity::new(SECRET);
        let err = identity.validate(&token("wrongsecret", &claims())).unwrap_err();
        assert!(matches!(err, EnrollError::Unauthenticated(_)));
    }

    #[test]
    fn test_wrong_audience() {
        let identity = SupabaseIdentity::new(SECRET);
        let service = SupabaseClaims {
            aud: "service_role".into(),
            ..claims()
        };

        assert!(identity.validate(&token(SECRET, &service)).is_err());
    }

    #[test]
    fn test_missing_email_or_bad_sub() {
        let identity = SupabaseIdentity::new(SECRET);

        let anonymous = SupabaseClaims { email: None, ..claims() };
        assert!(identity.validate(&token(SECRET, &anonymous)).is_err());

        let bad_sub = SupabaseClaims {
            sub: "not-a-uuid".into(),
            ..claims()
        };
        assert!(identity.validate(&token(SECRET, &bad_sub)).is_err());
    }

    #[test]
    fn test_garbage_token() {
        let identity = SupabaseIdentity::new(SECRET);
        assert!(identity.validate("not.a.jwt").is_err());
    }
}
