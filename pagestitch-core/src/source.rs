//! Where page bodies come from
//!
//! The acquisition loop only needs "give me the bytes behind this URL or
//! tell me why not". [`HttpPageSource`] answers that with `reqwest`; tests
//! and embedders can plug in anything else that implements [`PageSource`].

use crate::config::HttpOptions;
use crate::error::{FetchError, Result, StitchError};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// A provider of raw page bodies
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the body behind `url`. Network failures and non-2xx statuses
    /// are both errors.
    async fn fetch(&self, url: &str) -> std::result::Result<Bytes, FetchError>;
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for std::sync::Arc<T> {
    async fn fetch(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
        (**self).fetch(url).await
    }
}

/// `reqwest`-backed page source
#[derive(Clone, Debug)]
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(options: &HttpOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(timeout) = options.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StitchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(body)
    }
}
