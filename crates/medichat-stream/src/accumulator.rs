//! In-memory conversation transcript

use medichat_models::{ChatMessage, ImageAttachment};

use crate::error::{Result, StreamError};

/// Whether an assistant turn is currently being grown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    /// The assistant message at `index` receives incoming deltas
    Streaming { index: usize },
}

/// How an open assistant turn was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Complete,
    Incomplete,
}

/// Ordered, chronological transcript of one conversation.
///
/// Only the most recently appended assistant message can be open. Appending a
/// user turn closes it.
#[derive(Debug, Default)]
pub struct ConversationAccumulator {
    messages: Vec<ChatMessage>,
    state: TurnState,
}

impl ConversationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The assistant message currently being grown
    pub fn open_turn(&self) -> Option<&ChatMessage> {
        match self.state {
            TurnState::Streaming { index } => self.messages.get(index),
            TurnState::Idle => None,
        }
    }

    /// Append a user message. Blank text counts as absent.
    pub fn append_user_turn(
        &mut self,
        text: impl Into<String>,
        attachment: Option<ImageAttachment>,
    ) -> Result<&ChatMessage> {
        let text = text.into();
        if text.trim().is_empty() && attachment.is_none() {
            return Err(StreamError::EmptyTurn);
        }

        self.finish_turn(TurnStatus::Complete);
        self.messages.push(ChatMessage::user(text, attachment));
        Ok(self.last())
    }

    /// Append `text` to the open assistant turn, opening one if needed
    pub fn apply_delta(&mut self, text: &str) -> &ChatMessage {
        let index = match self.state {
            TurnState::Streaming { index } => index,
            TurnState::Idle => {
                self.messages.push(ChatMessage::assistant(String::new()));
                let index = self.messages.len() - 1;
                self.state = TurnState::Streaming { index };
                index
            }
        };

        let message = &mut self.messages[index];
        message.content.push_str(text);
        message
    }

    /// Close the open assistant turn, if any. Returns whether one was open.
    pub fn finish_turn(&mut self, status: TurnStatus) -> bool {
        let TurnState::Streaming { index } = std::mem::take(&mut self.state) else {
            return false;
        };
        if status == TurnStatus::Incomplete
            && let Some(message) = self.messages.get_mut(index)
        {
            message.incomplete = true;
        }
        true
    }

    /// Clear the transcript
    pub fn reset(&mut self) {
        self.messages.clear();
        self.state = TurnState::Idle;
    }

    fn last(&self) -> &ChatMessage {
        // append_user_turn always pushes before calling this
        &self.messages[self.messages.len() - 1]
    }
}
