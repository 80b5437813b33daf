pub mod dispatch;
pub mod events;
pub mod handlers;
pub mod messenger;
pub mod registry;
pub mod server;
pub mod session;
pub mod source;
pub mod store;

pub use dispatch::{Dispatcher, Update};
pub use events::{EventBus, GameEvent};
pub use messenger::{Messenger, MessengerError, QuestionMessage};
pub use registry::{spawn_sweeper, SessionRegistry};
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use session::{AnswerOutcome, Session, SessionError, SessionSnapshot, SessionToken};
pub use source::{MemoryQuestionBank, QuestionSource, SourceError};
pub use store::SqliteQuestionStore;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tq_engine::player::{MessageRef, PlayerId};

    struct NullMessenger;

    impl Messenger for NullMessenger {
        fn send_question(
            &self,
            _player: PlayerId,
            _message: &QuestionMessage<'_>,
        ) -> Result<MessageRef, MessengerError> {
            Ok(MessageRef(0))
        }

        fn delete_message(
            &self,
            _player: PlayerId,
            _message: MessageRef,
        ) -> Result<(), MessengerError> {
            Ok(())
        }

        fn send_status(&self, _player: PlayerId, _text: &str) -> Result<(), MessengerError> {
            Ok(())
        }

        fn edit_shared_announcement(&self, _token: &str, _text: &str) -> Result<(), MessengerError> {
            Ok(())
        }

        fn acknowledge(&self, _callback: &str, _text: &str) -> Result<(), MessengerError> {
            Ok(())
        }
    }

    #[test]
    fn context_provides_shared_components() {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(SessionRegistry::new(
            Arc::new(NullMessenger),
            Arc::new(MemoryQuestionBank::with_seed(Vec::new(), 0)),
            Arc::clone(&bus),
        ));
        let ctx = AppContext::new(ServerConfig::for_tests(), registry);

        assert_eq!(ctx.event_bus().subscriber_count(), 0);
        assert_eq!(ctx.registry().active_count(), 0);
        assert_eq!(ctx.registry().created_total(), 0);
    }
}
