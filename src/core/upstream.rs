//! Upstream HTTP client
//!
//! Async client for the configured upstream provider. The transformer core
//! deals only in bytes, so this client sends raw JSON bodies and returns
//! raw response bytes; for streaming it re-frames the upstream body into
//! whole SSE frames (all lines up to the blank-line terminator) so each
//! frame can be handed to the stream transformer as a unit.

use crate::conversion::Dialect;
use futures::stream::Stream;
use reqwest::Client;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Anthropic API version header value sent to Claude upstreams
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Error types that can occur during upstream API interactions
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl UpstreamError {
    /// HTTP status to relay to the client.
    pub fn status_code(&self) -> u16 {
        match self {
            UpstreamError::Authentication(_) => 401,
            UpstreamError::RateLimit(_) => 429,
            UpstreamError::BadRequest(_) => 400,
            UpstreamError::Api { status, .. } => *status,
            UpstreamError::Unexpected(_) => 502,
        }
    }
}

/// A stream of whole SSE frames from the upstream
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, UpstreamError>> + Send>>;

/// Async client for one configured upstream
pub struct UpstreamClient {
    client: Client,
    dialect: Dialect,
    base_url: String,
    api_key: String,
}

impl UpstreamClient {
    /// Create a new upstream client
    ///
    /// # Arguments
    ///
    /// * `dialect` - Wire dialect the upstream speaks
    /// * `base_url` - API base URL including any version prefix
    /// * `api_key` - Upstream API key
    /// * `timeout` - Request timeout in seconds
    pub fn new(dialect: Dialect, base_url: String, api_key: String, timeout: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            dialect,
            base_url,
            api_key,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn request_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.dialect.endpoint_path()
        )
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.dialect {
            Dialect::Claude => builder
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Dialect::Chat | Dialect::Responses => builder.bearer_auth(&self.api_key),
        }
    }

    /// Send a buffered request and return the raw response bytes.
    pub async fn send(&self, body: Vec<u8>) -> Result<Vec<u8>, UpstreamError> {
        let response = self
            .apply_auth(self.client.post(self.request_url()))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| UpstreamError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = Self::classify_error(&error_text);
            return Err(match status.as_u16() {
                401 => UpstreamError::Authentication(message),
                429 => UpstreamError::RateLimit(message),
                400 => UpstreamError::BadRequest(message),
                other => UpstreamError::Api {
                    status: other,
                    message,
                },
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Unexpected(format!("Failed to read response: {}", e)))?;
        Ok(bytes.to_vec())
    }

    /// Send a streaming request and return a stream of whole SSE frames.
    pub async fn send_stream(&self, body: Vec<u8>) -> Result<FrameStream, UpstreamError> {
        let response = self
            .apply_auth(self.client.post(self.request_url()))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| UpstreamError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = Self::classify_error(&error_text);
            return Err(match status.as_u16() {
                401 => UpstreamError::Authentication(message),
                429 => UpstreamError::RateLimit(message),
                400 => UpstreamError::BadRequest(message),
                other => UpstreamError::Api {
                    status: other,
                    message,
                },
            });
        }

        use futures_util::TryStreamExt;
        let byte_stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let reader = tokio_util::io::StreamReader::new(byte_stream);
        let mut lines = BufReader::new(reader).lines();

        let stream = async_stream::stream! {
            let mut frame = String::new();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            if !frame.is_empty() {
                                yield Ok(std::mem::take(&mut frame).into_bytes());
                            }
                        } else {
                            frame.push_str(&line);
                            frame.push('\n');
                        }
                    }
                    Ok(None) => {
                        if !frame.is_empty() {
                            yield Ok(std::mem::take(&mut frame).into_bytes());
                        }
                        break;
                    }
                    Err(e) => {
                        warn!("Upstream stream read error: {}", e);
                        yield Err(UpstreamError::Unexpected(e.to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    /// Classify upstream errors and provide helpful messages
    fn classify_error(error_detail: &str) -> String {
        let error_lower = error_detail.to_lowercase();

        if error_lower.contains("invalid_api_key")
            || error_lower.contains("authentication_error")
            || error_lower.contains("unauthorized")
        {
            return "Invalid API key. Please check the upstream api_key configuration.".to_string();
        }

        if error_lower.contains("rate_limit") || error_lower.contains("quota") {
            return "Rate limit exceeded. Please wait and try again, or upgrade your API plan."
                .to_string();
        }

        if error_lower.contains("model")
            && (error_lower.contains("not found") || error_lower.contains("does not exist"))
        {
            return "Model not found. Please check the model mapping configuration.".to_string();
        }

        if error_lower.contains("billing") || error_lower.contains("payment") {
            return "Billing issue. Please check the upstream account billing status.".to_string();
        }

        error_detail.to_string()
    }
}
