//! HTTP client for the streaming generation endpoint.

use crate::error::{Error, Result};
use crate::protocol::describe_error_body;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::debug;

/// Sends generation requests and hands back the open response.
pub struct StreamClient {
    url: String,
    client: Client,
}

impl StreamClient {
    /// Create a client for the given endpoint.
    ///
    /// No overall timeout is set: a generation can legitimately run for
    /// minutes. The daemon is local, so system proxies are bypassed.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let client = Client::builder()
            .no_proxy()
            .build()
            .map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST an already-encoded request body.
    ///
    /// On a non-success status the body is drained into the error and the
    /// response is dropped, closing it.
    pub async fn send(&self, body: Vec<u8>) -> Result<Response> {
        debug!("POST {} ({} bytes)", self.url, body.len());
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| Error::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Protocol {
                status,
                body: describe_error_body(&body),
            });
        }

        debug!("Daemon answered {}", status);
        Ok(response)
    }
}
