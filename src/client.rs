use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::domain::{ResponseOutcome, TransactionRequest};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Sends one transaction request and reports what came back.
///
/// Any HTTP status counts as a response; only failures to complete the
/// exchange are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionClient: Send + Sync {
    async fn submit(&self, request: &TransactionRequest) -> Result<ResponseOutcome, TransportError>;
}

#[derive(Clone)]
pub struct HttpTransactionClient {
    url: String,
    client: reqwest::Client,
}

impl HttpTransactionClient {
    pub fn new(url: impl Into<String>, api_key: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key).context("API key is not a valid header value")?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("payment-load-driver/", env!("CARGO_PKG_VERSION"))),
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TransactionClient for HttpTransactionClient {
    async fn submit(&self, request: &TransactionRequest) -> Result<ResponseOutcome, TransportError> {
        let body = serde_json::to_vec(request)?;
        let started = Instant::now();
        let resp = self
            .client
            .post(&self.url)
            .body(body)
            .send()
            .await
            .map_err(TransportError::Request)?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(TransportError::Body)?;
        Ok(ResponseOutcome::new(status, text, started.elapsed()))
    }
}
