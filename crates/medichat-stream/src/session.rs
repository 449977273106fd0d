//! Drives relay turns into a conversation transcript

use futures::{Stream, StreamExt};
use medichat_models::{ChatMessage, ImageAttachment, PatientInfo, Persona, RelayRequest};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::accumulator::{ConversationAccumulator, TurnStatus};
use crate::client::RelayClient;
use crate::decoder::{StreamEnd, StreamFrame};
use crate::error::{Result, StreamError};
use crate::store::ConversationStore;

/// How a streamed assistant turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The provider finished the answer
    Completed,
    /// The connection closed mid-event; the partial answer is kept
    Truncated,
    /// The caller stopped reading; the partial answer is kept
    Cancelled,
}

impl TurnOutcome {
    fn status(self) -> TurnStatus {
        match self {
            TurnOutcome::Completed => TurnStatus::Complete,
            TurnOutcome::Truncated | TurnOutcome::Cancelled => TurnStatus::Incomplete,
        }
    }
}

/// Apply decoded frames to `conversation` until the stream ends or `cancel`
/// fires. `on_update` sees the open assistant message after every delta.
///
/// Deltas are applied in arrival order within the poll that produced them. A
/// transport error or cancellation leaves the partial answer in place, marked
/// incomplete.
pub async fn drive_turn<S, F>(
    mut frames: S,
    conversation: &mut ConversationAccumulator,
    cancel: &CancellationToken,
    mut on_update: F,
) -> Result<TurnOutcome>
where
    S: Stream<Item = Result<StreamFrame>> + Unpin,
    F: FnMut(&ChatMessage),
{
    let mut ended: Option<TurnOutcome> = None;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let outcome = ended.unwrap_or(TurnOutcome::Cancelled);
                conversation.finish_turn(outcome.status());
                return Ok(outcome);
            }
            next = frames.next() => next,
        };

        match next {
            None => break,
            Some(Err(err)) => {
                conversation.finish_turn(TurnStatus::Incomplete);
                return Err(err);
            }
            Some(Ok(StreamFrame::Delta(text))) => {
                if ended.is_none() {
                    on_update(conversation.apply_delta(&text));
                }
            }
            Some(Ok(StreamFrame::End(end))) => {
                ended = Some(match end {
                    StreamEnd::Done | StreamEnd::Closed => TurnOutcome::Completed,
                    StreamEnd::Truncated { .. } => TurnOutcome::Truncated,
                });
            }
        }
    }

    let outcome = ended.unwrap_or(TurnOutcome::Completed);
    conversation.finish_turn(outcome.status());
    Ok(outcome)
}

/// One patient consultation: transcript plus the context sent with each turn
pub struct ChatSession {
    client: RelayClient,
    conversation: ConversationAccumulator,
    patient: PatientInfo,
    persona: Option<&'static Persona>,
}

impl ChatSession {
    pub fn new(client: RelayClient, patient: PatientInfo) -> Self {
        Self {
            client,
            conversation: ConversationAccumulator::new(),
            patient,
            persona: None,
        }
    }

    pub fn with_persona(mut self, persona: &'static Persona) -> Self {
        self.persona = Some(persona);
        self
    }

    pub fn conversation(&self) -> &ConversationAccumulator {
        &self.conversation
    }

    pub fn patient(&self) -> &PatientInfo {
        &self.patient
    }

    /// Ask one question and stream the answer into the transcript.
    ///
    /// The relay only accepts inline (`data:`) images; any other attachment
    /// is rejected before the turn is recorded.
    pub async fn ask<F>(
        &mut self,
        question: Option<String>,
        image: Option<ImageAttachment>,
        cancel: &CancellationToken,
        on_update: F,
    ) -> Result<TurnOutcome>
    where
        F: FnMut(&ChatMessage),
    {
        if image.as_ref().is_some_and(|image| !image.is_inline()) {
            return Err(StreamError::RemoteImage);
        }
        self.conversation
            .append_user_turn(question.clone().unwrap_or_default(), image.clone())?;

        let request = RelayRequest {
            patient_info: self.patient.clone(),
            question: question.filter(|q| !q.trim().is_empty()),
            doctor_type: self.persona.map(|p| p.id.to_string()),
            doctor_prompt: self.persona.map(|p| p.prompt.to_string()),
            image: image.map(|image| image.url),
        };

        let frames = self.client.stream_chat(&request).await?;
        let outcome = drive_turn(frames, &mut self.conversation, cancel, on_update).await?;
        if outcome != TurnOutcome::Completed {
            warn!(?outcome, "Assistant turn ended early");
        }
        Ok(outcome)
    }

    /// Save the transcript and clear it. Returns `None` when there is nothing
    /// to save; on a store error the transcript is kept.
    pub async fn hand_off(
        &mut self,
        store: &dyn ConversationStore,
        patient_id: Option<&str>,
    ) -> Result<Option<String>> {
        if self.conversation.is_empty() {
            return Ok(None);
        }

        let id = store
            .save_conversation(patient_id, self.conversation.messages())
            .await?;
        info!(conversation_id = %id, "Conversation handed off");
        self.conversation.reset();
        Ok(Some(id))
    }
}
