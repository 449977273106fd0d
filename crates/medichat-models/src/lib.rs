//! Medichat Models - shared wire and domain types.
//!
//! This crate provides:
//! - Chat transcript types (`ChatMessage`, `Role`, `ImageAttachment`)
//! - The inbound relay payload and error envelope
//! - Provider chat-completion request and stream chunk types
//! - The doctor persona catalog

pub mod chat;
pub mod patient;
pub mod persona;
pub mod provider;
pub mod relay;

pub use chat::{ChatMessage, ImageAttachment, Role};
pub use patient::PatientInfo;
pub use persona::{DEFAULT_PERSONA_ID, PERSONAS, Persona, find_persona};
pub use provider::{
    ChatCompletionChunk, ContentPart, ImageUrl, MessageContent, ProviderMessage, ProviderRequest,
    StreamChoice, StreamDelta,
};
pub use relay::{ErrorEnvelope, RelayRequest};
