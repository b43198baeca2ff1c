//! Webhook Signature Verification
//!
//! Stripe signs each delivery with a `Stripe-Signature` header of the form
//! `t=<unix>,v1=<hex hmac>[,v1=...]`, where the HMAC-SHA256 covers
//! `"<t>.<raw body>"` keyed by the endpoint's signing secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use enroll_core::{EnrollError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Default replay window in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// How incoming webhook payloads are authenticated
#[derive(Clone, Debug)]
pub enum SignaturePolicy {
    /// Reject any delivery without a valid signature
    Required(WebhookVerifier),

    /// Trust payloads as-is. Development only: anyone who can reach the
    /// endpoint can forge a completion.
    Unverified,
}

impl SignaturePolicy {
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Required(_))
    }
}

/// Verifies Stripe webhook signatures
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    #[must_use]
    pub const fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify against the current time
    pub fn verify(&self, payload: &str, header: &str) -> Result<()> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, payload: &str, header: &str, now: i64) -> Result<()> {
        let mut timestamp: Option<i64> = None;
        let mut candidates = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => candidates.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| EnrollError::SignatureInvalid("missing timestamp".into()))?;
        if candidates.is_empty() {
            return Err(EnrollError::SignatureInvalid("missing v1 signature".into()));
        }

        if (now - timestamp).abs() > self.tolerance_secs {
            return Err(EnrollError::SignatureInvalid(format!(
                "timestamp outside tolerance ({}s)",
                self.tolerance_secs
            )));
        }

        let mac = self.mac_for(payload, timestamp)?;
        let matched = candidates.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });

        if matched {
            Ok(())
        } else {
            Err(EnrollError::SignatureInvalid("no matching signature".into()))
        }
    }

    /// Produce a header value for `payload`, as Stripe would send it
    pub fn sign(&self, payload: &str, timestamp: i64) -> Result<String> {
        let digest = self.mac_for(payload, timestamp)?.finalize().into_bytes();
        Ok(format!("t={timestamp},v1={}", hex::encode(digest)))
    }

    fn mac_for(&self, payload: &str, timestamp: i64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| EnrollError::Config(format!("invalid webhook secret: {e}")))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";
    const PAYLOAD: &str = r#"{"type":"checkout.session.completed"}"#;
    const NOW: i64 = 1_760_000_000;

    /// Independent reference implementation
    fn reference_signature(payload: &str, secret: &str, timestamp: i64) -> String {
        let signed = format!("{timestamp}.{payload}");
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = format!("t={NOW},v1={}", reference_signature(PAYLOAD, SECRET, NOW));

        assert!(verifier.verify_at(PAYLOAD, &header, NOW + 10).is_ok());
    }

    #[test]
    fn test_sign_matches_reference() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = verifier.sign(PAYLOAD, NOW).unwrap();
        assert_eq!(header, format!("t={NOW},v1={}", reference_signature(PAYLOAD, SECRET, NOW)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = format!("t={NOW},v1={}", reference_signature(PAYLOAD, "wrong", NOW));

        assert!(matches!(
            verifier.verify_at(PAYLOAD, &header, NOW),
            Err(EnrollError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_modified_payload_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = verifier.sign(PAYLOAD, NOW).unwrap();
        let tampered = r#"{"type":"checkout.session.completed","hacked":true}"#;

        assert!(verifier.verify_at(tampered, &header, NOW).is_err());
    }

    #[test]
    fn test_old_timestamp_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = verifier.sign(PAYLOAD, NOW - 600).unwrap();

        assert!(verifier.verify_at(PAYLOAD, &header, NOW).is_err());
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let sig = reference_signature(PAYLOAD, SECRET, NOW);

        assert!(verifier.verify_at(PAYLOAD, &format!("v1={sig}"), NOW).is_err());
        assert!(verifier.verify_at(PAYLOAD, &format!("t={NOW}"), NOW).is_err());
        assert!(verifier.verify_at(PAYLOAD, &format!("t={NOW},v1=zz"), NOW).is_err());
    }

    #[test]
    fn test_any_matching_v1_accepted() {
        let verifier = WebhookVerifier::new(SECRET);
        let good = reference_signature(PAYLOAD, SECRET, NOW);
        let header = format!("t={NOW},v1={},v1={good}", "0".repeat(64));

        assert!(verifier.verify_at(PAYLOAD, &header, NOW).is_ok());
    }
}
