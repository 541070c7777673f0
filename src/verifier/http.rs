// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP adapter for the identity provider's account-lookup API.
//!
//! ## Endpoint Shape
//!
//! - `GET {base_url}/{user_id}`: account lookup
//! - `POST {base_url}/{user_id}/revoke`: refresh-token revocation
//!
//! ## Outcome Mapping
//!
//! | Provider response          | Verification outcome      |
//! |----------------------------|---------------------------|
//! | 2xx, body `disabled: true` | `Invalid(Disabled)`       |
//! | other 2xx                  | `Valid`                   |
//! | 404 / 410                  | `Invalid(NotFound)`       |
//! | 400 / 422                  | `Invalid(MalformedId)`    |
//! | other 4xx (401, 403, 429)  | `Unavailable(Provider)`   |
//! | 5xx                        | `Unavailable(Provider)`   |
//! | request timeout            | `Unavailable(Timeout)`    |
//! | connect/transport failure  | `Unavailable(Transport)`  |
//!
//! 401/403/429 mean the adapter's own standing with the provider is the
//! problem, which says nothing about the user; hence `Unavailable`, not
//! `Invalid`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{IdentityVerifier, InvalidReason, UnavailableReason, Verification};

/// Default bound on a single provider call. Callers typically add their
/// own shorter deadline around `verify`.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Characters permitted in a user id destined for a URL path segment.
/// Anything else cannot name an account and never reaches the wire.
fn id_is_url_safe(user_id: &str) -> bool {
    !user_id.is_empty()
        && user_id.len() <= 255
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | ':'))
}

/// Account lookup response body. Unknown provider fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct AccountStatus {
    #[serde(default)]
    disabled: bool,
}

/// Identity verifier speaking the provider's REST lookup API.
#[derive(Clone)]
pub struct HttpIdentityVerifier {
    /// Account collection URL, e.g. `https://idp.example.com/v1/accounts`
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl HttpIdentityVerifier {
    /// Create a new verifier for the given account collection URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Replace the client-level timeout (tests use short deadlines).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        self
    }

    /// Get the account collection URL.
    #[allow(dead_code)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn account_url(&self, user_id: &str) -> String {
        format!("{}/{}", self.base_url, user_id)
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, user_id: &str) -> Verification {
        if !id_is_url_safe(user_id) {
            return Verification::Invalid(InvalidReason::MalformedId);
        }

        let response = match self.client.get(self.account_url(user_id)).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Verification::Unavailable(UnavailableReason::Timeout)
            }
            Err(_) => return Verification::Unavailable(UnavailableReason::Transport),
        };

        let status = response.status();
        if status.is_success() {
            // The lookup itself succeeded; an unparseable body still
            // confirms the account exists.
            return match response.json::<AccountStatus>().await {
                Ok(body) if body.disabled => Verification::Invalid(InvalidReason::Disabled),
                _ => Verification::Valid,
            };
        }

        match status.as_u16() {
            404 | 410 => Verification::Invalid(InvalidReason::NotFound),
            400 | 422 => Verification::Invalid(InvalidReason::MalformedId),
            _ => Verification::Unavailable(UnavailableReason::Provider),
        }
    }

    async fn revoke(&self, user_id: &str) -> bool {
        if !id_is_url_safe(user_id) {
            return false;
        }

        let url = format!("{}/revoke", self.account_url(user_id));
        match self.client.post(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, user_id, "Token revocation call failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    async fn lookup(Path(id): Path<String>) -> (StatusCode, Json<serde_json::Value>) {
        match id.as_str() {
            "alive" => (StatusCode::OK, Json(serde_json::json!({"email": "a@example.com"}))),
            "suspended" => (StatusCode::OK, Json(serde_json::json!({"disabled": true}))),
            "ghost" => (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "no account"}))),
            "odd" => (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "bad id"}))),
            "slow" => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                (StatusCode::OK, Json(serde_json::json!({})))
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "boom"})),
            ),
        }
    }

    async fn revoke(Path(id): Path<String>) -> StatusCode {
        if id == "alive" {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Spin up a stub provider and return its account collection URL.
    async fn spawn_stub() -> String {
        let app = Router::new()
            .route("/accounts/{id}", get(lookup))
            .route("/accounts/{id}/revoke", post(revoke));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/accounts")
    }

    #[tokio::test]
    async fn live_account_is_valid() {
        let verifier = HttpIdentityVerifier::new(spawn_stub().await);
        assert_eq!(verifier.verify("alive").await, Verification::Valid);
    }

    #[tokio::test]
    async fn disabled_account_is_invalid() {
        let verifier = HttpIdentityVerifier::new(spawn_stub().await);
        assert_eq!(
            verifier.verify("suspended").await,
            Verification::Invalid(InvalidReason::Disabled)
        );
    }

    #[tokio::test]
    async fn missing_account_is_invalid() {
        let verifier = HttpIdentityVerifier::new(spawn_stub().await);
        assert_eq!(
            verifier.verify("ghost").await,
            Verification::Invalid(InvalidReason::NotFound)
        );
    }

    #[tokio::test]
    async fn rejected_lookup_is_malformed() {
        let verifier = HttpIdentityVerifier::new(spawn_stub().await);
        assert_eq!(
            verifier.verify("odd").await,
            Verification::Invalid(InvalidReason::MalformedId)
        );
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let verifier = HttpIdentityVerifier::new(spawn_stub().await);
        assert_eq!(
            verifier.verify("anyone-else").await,
            Verification::Unavailable(UnavailableReason::Provider)
        );
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let verifier =
            HttpIdentityVerifier::new(spawn_stub().await).with_timeout(Duration::from_millis(200));
        assert_eq!(
            verifier.verify("slow").await,
            Verification::Unavailable(UnavailableReason::Timeout)
        );
    }

    #[tokio::test]
    async fn unreachable_provider_is_transport_failure() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let verifier = HttpIdentityVerifier::new(format!("http://{addr}/accounts"));
        assert_eq!(
            verifier.verify("alive").await,
            Verification::Unavailable(UnavailableReason::Transport)
        );
    }

    #[tokio::test]
    async fn unsafe_id_never_reaches_the_wire() {
        // No server at all; a path-unsafe id must short-circuit locally.
        let verifier = HttpIdentityVerifier::new("http://127.0.0.1:9/accounts");
        assert_eq!(
            verifier.verify("../../etc/passwd").await,
            Verification::Invalid(InvalidReason::MalformedId)
        );
        assert_eq!(
            verifier.verify("").await,
            Verification::Invalid(InvalidReason::MalformedId)
        );
        assert!(!verifier.revoke("a/b").await);
    }

    #[tokio::test]
    async fn revoke_reports_provider_confirmation() {
        let verifier = HttpIdentityVerifier::new(spawn_stub().await);
        assert!(verifier.revoke("alive").await);
        assert!(!verifier.revoke("ghost").await);
    }

    #[test]
    fn base_url_is_normalized() {
        let verifier = HttpIdentityVerifier::new("https://idp.example.com/v1/accounts///");
        assert_eq!(verifier.base_url(), "https://idp.example.com/v1/accounts");
        assert_eq!(
            verifier.account_url("u1"),
            "https://idp.example.com/v1/accounts/u1"
        );
    }
}
