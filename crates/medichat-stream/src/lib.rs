//! Medichat Stream - client side of the streaming chat relay.
//!
//! This crate provides:
//! - `SseDecoder`: incremental event-stream decoding into text deltas
//! - `ConversationAccumulator`: transcript state with one open assistant turn
//! - `ChatSession`: drives one relay turn into the transcript, with cancellation
//! - `RelayClient`: HTTP client for the relay endpoint
//! - `ConversationStore`: hand-off of finished conversations to the record store

pub mod accumulator;
pub mod client;
pub mod decoder;
pub mod error;
mod http_client;
pub mod session;
pub mod store;
mod utf8;

pub use accumulator::{ConversationAccumulator, TurnState, TurnStatus};
pub use client::RelayClient;
pub use decoder::{FrameStream, SseDecoder, StreamEnd, StreamFrame, decode_stream};
pub use error::{Result, StreamError};
pub use session::{ChatSession, TurnOutcome, drive_turn};
pub use store::{ConversationStore, MemoryConversationStore, RestConversationStore};
