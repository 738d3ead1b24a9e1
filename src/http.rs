use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{NpsError, Result};

/// Plain GET access to upstream pages and APIs.
///
/// Both the catalog pipeline and the places client go through this seam, so the whole
/// pipeline can run against canned bodies in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NpsError::upstream(redact(url), e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NpsError::upstream(redact(url), format!("HTTP {}", status)));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| NpsError::upstream(redact(url), e.without_url()))?;
        debug!(url = redact(url), size = body.len(), "fetched");
        Ok(body)
    }
}

/// Drop the query string so API keys never reach logs or error messages.
pub fn redact(url: &str) -> &str {
    url.split_once('?').map(|(base, _)| base).unwrap_or(url)
}
