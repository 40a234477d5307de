//! HTTP client bound to a single total request timeout.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin wrapper over a pooled [`reqwest::Client`]. The timeout covers the
/// whole request, connect and read included.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
}

impl Client {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self { http })
    }

    /// Fetch a URL and return the raw body. Non-2xx statuses are not errors
    /// here; callers that care about the payload shape will fail on decode.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await.map_err(|e| Error::Http {
            url: url.to_string(),
            source: e,
        })?;
        let body = response.bytes().await.map_err(|e| Error::Http {
            url: url.to_string(),
            source: e,
        })?;
        Ok(body.to_vec())
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let body = self.fetch_bytes(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetch_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|e| Error::Decode {
            url: url.to_string(),
            source: e,
        })
    }
}
