//! HTTP client for the relay endpoint

use medichat_models::{ErrorEnvelope, RelayRequest};
use reqwest::Client;

use crate::decoder::{FrameStream, decode_stream};
use crate::error::{Result, StreamError};
use crate::http_client::build_http_client;

/// Posts questions to the relay and decodes the streamed answer
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: Client,
    endpoint: String,
    access_token: String,
}

impl RelayClient {
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            endpoint: endpoint.into(),
            access_token: access_token.into(),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies)
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one question. A non-success status becomes `StreamError::Relay`
    /// carrying the relay's human-readable message.
    pub async fn stream_chat(&self, request: &RelayRequest) -> Result<FrameStream> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error)
                .unwrap_or_else(|_| format!("Connection error ({})", status.as_u16()));
            tracing::warn!(status = status.as_u16(), message = %message, "Relay rejected request");
            return Err(StreamError::Relay {
                status: status.as_u16(),
                message,
            });
        }

        Ok(decode_stream(response.bytes_stream()))
    }
}
