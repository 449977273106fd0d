//! Outbound chat-completion dispatch

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use medichat_models::ProviderRequest;
use reqwest::Client;
use std::io;
use thiserror::Error;

/// Raw provider event-stream body, relayed without inspection
pub type ByteStream = BoxStream<'static, Result<Bytes, io::Error>>;

const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum ProviderFailure {
    /// The provider answered with a non-success status
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider unreachable: {0}")]
    Transport(String),
}

/// A streaming chat-completion backend
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send `request` and return the event-stream body once the provider has
    /// accepted it
    async fn open_stream(&self, request: &ProviderRequest) -> Result<ByteStream, ProviderFailure>;
}

/// OpenAI-compatible gateway reached at `{base_url}/chat/completions`
pub struct HttpModelProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpModelProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ModelProvider for HttpModelProvider {
    async fn open_stream(&self, request: &ProviderRequest) -> Result<ByteStream, ProviderFailure> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| ProviderFailure::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Status {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        Ok(response.bytes_stream().map_err(io::Error::other).boxed())
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut cut = MAX_ERROR_BODY;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body.truncate(cut);
    body.push_str("... [truncated]");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        assert_eq!(truncate_body("short".to_string()), "short");

        let long = "é".repeat(400);
        let truncated = truncate_body(long);
        assert!(truncated.ends_with("... [truncated]"));
        assert!(truncated.len() <= MAX_ERROR_BODY + "... [truncated]".len());
    }
}
