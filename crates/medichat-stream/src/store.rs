//! Hand-off of finished conversations to the record store

use async_trait::async_trait;
use medichat_models::ChatMessage;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};
use crate::http_client::build_http_client;

/// Persists a finished conversation and returns its record id
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn save_conversation(
        &self,
        patient_id: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String>;
}

/// Record store behind a PostgREST-style endpoint.
///
/// Writes one `medical_conversations` row, then one `conversation_messages`
/// row per transcript entry.
pub struct RestConversationStore {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: String,
}

#[derive(Serialize)]
struct ConversationRow<'a> {
    patient_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct InsertedRow {
    id: String,
}

#[derive(Serialize)]
struct MessageRow<'a> {
    conversation_id: &'a str,
    role: &'static str,
    content: &'a str,
    image_url: Option<&'a str>,
}

impl RestConversationStore {
    /// `base_url` is the REST root, e.g. `https://project.example.co/rest/v1`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: access_token.into(),
        }
    }

    fn insert(&self, table: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
    }
}

#[async_trait]
impl ConversationStore for RestConversationStore {
    async fn save_conversation(
        &self,
        patient_id: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String> {
        let response = self
            .insert("medical_conversations")
            .header("Prefer", "return=representation")
            .json(&[ConversationRow { patient_id }])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, body = %body, "Failed to create conversation record");
            return Err(StreamError::Store(format!(
                "conversation insert failed ({status})"
            )));
        }

        let rows: Vec<InsertedRow> = response.json().await?;
        let conversation_id = rows
            .into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| StreamError::Store("conversation insert returned no id".to_string()))?;

        let rows: Vec<MessageRow<'_>> = messages
            .iter()
            .map(|message| MessageRow {
                conversation_id: &conversation_id,
                role: message.role.as_str(),
                content: &message.content,
                image_url: message.attachment.as_ref().map(|a| a.url.as_str()),
            })
            .collect();

        if !rows.is_empty() {
            let response = self.insert("conversation_messages").json(&rows).send().await?;
            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status, body = %body, "Failed to store conversation messages");
                return Err(StreamError::Store(format!(
                    "message insert failed ({status})"
                )));
            }
        }

        tracing::info!(
            conversation_id = %conversation_id,
            messages = messages.len(),
            "Conversation saved"
        );
        Ok(conversation_id)
    }
}

/// A saved conversation held by `MemoryConversationStore`
#[derive(Debug, Clone)]
pub struct SavedConversation {
    pub id: String,
    pub patient_id: Option<String>,
    pub messages: Vec<ChatMessage>,
}

/// Process-local store, used in tests and offline runs
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    saved: Mutex<Vec<SavedConversation>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<SavedConversation> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn save_conversation(
        &self,
        patient_id: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.saved.lock().push(SavedConversation {
            id: id.clone(),
            patient_id: patient_id.map(str::to_string),
            messages: messages.to_vec(),
        });
        Ok(id)
    }
}
