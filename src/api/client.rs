//! HTTP client with auth header injection and client type header.
//!
//! All requests include `X-Client-Type: offline-queue` so the backend can
//! tell replayed uploads apart from interactive ones.

use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Value of the `X-Client-Type` header sent with every request.
pub const CLIENT_TYPE: &str = "offline-queue";

/// HTTP client wrapper for the ElecMate backend API.
///
/// Manages base URL and access token, and ensures all requests include the
/// `X-Client-Type` header.
pub struct ApiClient {
    client: Client,
    base_url: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create a new API client with the given base URL.
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store the access token for authenticated requests.
    pub async fn set_access_token(&self, token: String) {
        let mut guard = self.access_token.write().await;
        *guard = Some(token);
    }

    /// Send an authenticated multipart POST request to a relative API path.
    pub async fn authenticated_multipart_post(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<Response, reqwest::Error> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.access_token.read().await.clone();

        let mut builder = self
            .client
            .post(&url)
            .header("X-Client-Type", CLIENT_TYPE)
            .multipart(form);

        if let Some(ref t) = token {
            builder = builder.bearer_auth(t);
        }

        builder.send().await
    }
}
