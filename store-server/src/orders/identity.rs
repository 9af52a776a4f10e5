//! Identity provider lookups
//!
//! Best-effort email enrichment for orders submitted without one. A
//! failing or slow identity service must never block order creation, so
//! every error path degrades to `None` with a warning log.

use serde::Deserialize;
use std::time::Duration;

/// Thin client for the identity provider's user endpoint
#[derive(Clone)]
pub struct IdentityClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct IdentityUser {
    email: Option<String>,
}

impl IdentityClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Look up a user's email; `None` on any failure
    pub async fn fetch_email(&self, user_id: &str) -> Option<String> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Identity lookup failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(user_id = %user_id, status = %response.status(), "Identity lookup rejected");
            return None;
        }
        match response.json::<IdentityUser>().await {
            Ok(user) => user.email.filter(|e| !e.trim().is_empty()),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Identity response unreadable");
                None
            }
        }
    }
}
