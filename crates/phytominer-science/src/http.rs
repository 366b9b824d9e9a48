use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::{Result, ScienceError};

// ─── LookupClient ─────────────────────────────────────────────────────────────

/// Thin wrapper over `reqwest::Client` for lookup services.
///
/// It performs exactly one request per call. Pacing and retries belong to
/// the caller's [`Backoff`](crate::backoff::Backoff); a 404 is reported as
/// "no result" rather than an error.
pub struct LookupClient {
    client: reqwest::Client,
    service: String,
}

impl LookupClient {
    pub fn new(service: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            service: service.to_string(),
        })
    }

    pub async fn get_text(&self, url: &str) -> Result<Option<String>> {
        let resp = self.client.get(url).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => Err(ScienceError::Status {
                service: self.service.clone(),
                status: status.as_u16(),
            }),
            _ => Ok(Some(resp.text().await?)),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let Some(text) = self.get_text(url).await? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ScienceError::Parse(self.service.clone(), e.to_string()))
    }
}
