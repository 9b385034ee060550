//! HTTP transport used by the API client.
//!
//! The vendor contract is a single shape: form-encoded POST in, JSON out.
//! `HttpTransport` captures exactly that so the client can be exercised
//! without a live server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::ApiError;

/// Form fields for a single vendor request.
pub type Form = [(&'static str, String)];

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `form` as `application/x-www-form-urlencoded` and decode the JSON body.
    async fn post_form(&self, url: &str, form: &Form) -> Result<Value, ApiError>;
}

/// Production transport backed by `reqwest`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport. Without a timeout the reqwest default applies.
    pub fn new(timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_form(&self, url: &str, form: &Form) -> Result<Value, ApiError> {
        let response = self.client.post(url).form(form).send().await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(url = url, status = status.as_u16(), bytes = body.len(), "Vendor response");

        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Response is not JSON: {}", e)))
    }
}
