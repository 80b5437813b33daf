use thiserror::Error;
use tq_engine::player::{MessageRef, PlayerId};
use tq_engine::question::Question;

/// Transport failure. Non-fatal to session state: callers log and move on.
#[derive(Debug, Error)]
#[error("messenger transport error: {0}")]
pub struct MessengerError(pub String);

/// Everything the transport needs to render one question message:
/// the prompt payload, the labeled options, and the sequence number
/// to embed in each answer button's callback data.
#[derive(Debug, Clone)]
pub struct QuestionMessage<'a> {
    pub token: &'a str,
    pub sequence: u64,
    pub question: &'a Question,
}

/// Outbound side of the messaging platform, as the game core needs it.
pub trait Messenger: Send + Sync {
    /// Delivers a question to one player; returns a handle usable for
    /// later deletion.
    fn send_question(
        &self,
        player: PlayerId,
        message: &QuestionMessage<'_>,
    ) -> Result<MessageRef, MessengerError>;

    fn delete_message(&self, player: PlayerId, message: MessageRef) -> Result<(), MessengerError>;

    fn send_status(&self, player: PlayerId, text: &str) -> Result<(), MessengerError>;

    /// Edits the shared announcement surface of one session.
    fn edit_shared_announcement(&self, token: &str, text: &str) -> Result<(), MessengerError>;

    /// Answers a button tap with ephemeral feedback text.
    fn acknowledge(&self, callback: &str, text: &str) -> Result<(), MessengerError>;
}
