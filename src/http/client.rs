//! HTTP client for engine containers
//!
//! Thin wrapper around reqwest used by the executor and the pre-flight
//! checks. Runner requests can legitimately take many minutes, so the
//! timeout is always caller-supplied.

#![allow(dead_code)]

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// HTTP client errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),
}

/// HTTP client for engine requests
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout_secs: u64,
}

impl HttpClient {
    /// Create a client with the given request timeout
    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// GET a URL with query parameters appended
    pub async fn get_with_query(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        debug!("GET {} ({} params)", url, query.len());

        let start = std::time::Instant::now();

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!(HttpError::Timeout(self.timeout_secs))
                } else if e.is_connect() {
                    anyhow::anyhow!(HttpError::ConnectionRefused(url.to_string()))
                } else {
                    anyhow::anyhow!(HttpError::RequestFailed(e.to_string()))
                }
            })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        let mut headers = HashMap::new();
        for (key, value) in response.headers().iter() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string(), v.to_string());
            }
        }

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        debug!(
            "Response: {} {} in {}ms ({} bytes)",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            duration_ms,
            body.len()
        );

        Ok(HttpResponse {
            status_code: status.as_u16(),
            headers,
            body,
            duration_ms,
        })
    }

    /// Plain GET
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.get_with_query(url, &[]).await
    }
}

/// HTTP response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub duration_ms: u64,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }
}
