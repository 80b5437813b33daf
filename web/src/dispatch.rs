use crate::messenger::Messenger;
use crate::registry::SessionRegistry;
use crate::session::{CallbackToken, SessionError, SessionToken};
use std::sync::Arc;
use tokio::sync::mpsc;
use tq_engine::player::PlayerId;
use tq_engine::question::QuestionId;
use tracing::{info, warn};

/// Inbound platform events, already decoded from the wire by the
/// transport. Delivery may be duplicated, reordered or stale; the
/// session core is idempotent against all three.
#[derive(Debug, Clone)]
pub enum Update {
    Start {
        token: SessionToken,
        category: String,
    },
    Join {
        token: SessionToken,
        player_id: PlayerId,
        display_name: String,
    },
    Answer {
        token: SessionToken,
        callback: CallbackToken,
        player_id: PlayerId,
        sequence: u64,
        option: QuestionId,
    },
}

pub const GAME_NOT_FOUND_TEXT: &str = "Game not found. Start a new one!";
const RESTART_NOTICE: &str = "Sorry, the bot was restarted. Please start a new game.";

/// Applies inbound updates to the registry and turns registry errors
/// into short user-visible messages. Errors never stop the loop.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    messenger: Arc<dyn Messenger>,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            registry,
            messenger,
        }
    }

    pub fn handle(&self, update: Update) {
        match update {
            Update::Start { token, category } => {
                if let Err(err) = self.registry.on_start(token.clone(), &category) {
                    warn!(%token, category, %err, "could not start session");
                    if let Err(err) = self
                        .messenger
                        .edit_shared_announcement(&token, &format!("Could not start a game: {}", err))
                    {
                        warn!(%token, %err, "failed to report start failure");
                    }
                }
            }
            Update::Join {
                token,
                player_id,
                display_name,
            } => match self.registry.on_join(&token, player_id, &display_name) {
                Ok(()) => {}
                Err(SessionError::NotFound(_)) => {
                    info!(%token, player = %player_id, "join for unknown session");
                    if let Err(err) = self.messenger.send_status(player_id, GAME_NOT_FOUND_TEXT) {
                        warn!(%token, player = %player_id, %err, "failed to send join feedback");
                    }
                }
                Err(err) => warn!(%token, player = %player_id, %err, "join failed"),
            },
            Update::Answer {
                token,
                callback,
                player_id,
                sequence,
                option,
            } => match self
                .registry
                .on_answer(&token, &callback, player_id, sequence, option)
            {
                Ok(_) => {}
                Err(SessionError::NotFound(_)) => {
                    // Registry restarted or session swept. The tap still
                    // gets feedback so the external UI never hangs.
                    if let Err(err) = self.messenger.acknowledge(&callback, GAME_NOT_FOUND_TEXT) {
                        warn!(%token, %err, "failed to acknowledge orphan answer");
                    }
                    if let Err(err) = self.messenger.edit_shared_announcement(&token, RESTART_NOTICE)
                    {
                        warn!(%token, %err, "failed to post restart notice");
                    }
                }
                Err(err) => warn!(%token, player = %player_id, %err, "answer failed"),
            },
        }
    }

    /// The single inbound-event loop: drains updates until the channel
    /// closes.
    pub async fn run(&self, mut updates: mpsc::UnboundedReceiver<Update>) {
        while let Some(update) = updates.recv().await {
            self.handle(update);
        }
    }
}
