//! Enrollment API Client
//!
//! HTTP client for the session-status endpoint. Implements
//! `SessionStatusSource`, so a returning buyer's page (or a CLI) can drive
//! `poll_session_status` against a running server.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use enroll_core::{EnrollError, Result, SessionStatus, SessionStatusSource};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct EnrollmentApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl EnrollmentApiClient {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
        }
    }
}

/// Map a non-success response onto the error taxonomy
fn classify(status: StatusCode, body: &str) -> EnrollError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| status.to_string());

    if status == StatusCode::UNAUTHORIZED {
        EnrollError::Unauthenticated(message)
    } else if status.is_server_error() {
        EnrollError::upstream("enrollment-api", message)
    } else {
        EnrollError::InvalidRequest(message)
    }
}

#[async_trait]
impl SessionStatusSource for EnrollmentApiClient {
    async fn session_status(&self, session_id: &str) -> Result<SessionStatus> {
        let response = self
            .http
            .get(format!("{}/session-status", self.base_url))
            .query(&[("session_id", session_id)])
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| EnrollError::upstream("enrollment-api", e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EnrollError::upstream("enrollment-api", e.to_string()))?;

        if !status.is_success() {
            return Err(classify(status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_responses() {
        let body = r#"{"error":"Invalid or expired token","code":"UNAUTHENTICATED"}"#;
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, body),
            EnrollError::Unauthenticated(m) if m == "Invalid or expired token"
        ));

        let upstream = classify(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert!(upstream.is_retryable());

        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, r#"{"error":"unknown session"}"#),
            EnrollError::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_status_bodies_decode() {
        let processing: SessionStatus = serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        assert_eq!(processing, SessionStatus::Processing);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_retryable() {
        let client = EnrollmentApiClient::new("http://127.0.0.1:1/", "token");
        let err = client.session_status("cs_test_1").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
