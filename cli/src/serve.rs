use crate::config::Config;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tq_engine::player::{MessageRef, PlayerId};
use tq_web::{
    spawn_sweeper, AppContext, Dispatcher, EventBus, Messenger, MessengerError, QuestionMessage,
    ServerConfig, SessionRegistry, SqliteQuestionStore, WebServer,
};
use tracing::info;

/// Stand-in transport: outbound traffic goes to the log until a real
/// messaging platform adapter is wired to the dispatch channel.
struct LogMessenger;

impl Messenger for LogMessenger {
    fn send_question(
        &self,
        player: PlayerId,
        message: &QuestionMessage<'_>,
    ) -> Result<MessageRef, MessengerError> {
        info!(player = %player, sequence = message.sequence, "send question");
        Ok(MessageRef(0))
    }

    fn delete_message(&self, player: PlayerId, _message: MessageRef) -> Result<(), MessengerError> {
        info!(player = %player, "delete message");
        Ok(())
    }

    fn send_status(&self, player: PlayerId, _text: &str) -> Result<(), MessengerError> {
        info!(player = %player, "send status");
        Ok(())
    }

    fn edit_shared_announcement(&self, token: &str, _text: &str) -> Result<(), MessengerError> {
        info!(token, "edit announcement");
        Ok(())
    }

    fn acknowledge(&self, callback: &str, text: &str) -> Result<(), MessengerError> {
        info!(callback, text, "acknowledge");
        Ok(())
    }
}

pub fn run_serve(cfg: Config, err: &mut dyn Write) -> i32 {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = writeln!(err, "Error: failed to start runtime: {}", e);
            return 1;
        }
    };
    match runtime.block_on(serve(cfg)) {
        Ok(()) => 0,
        Err(message) => {
            let _ = writeln!(err, "Error: {}", message);
            1
        }
    }
}

async fn serve(cfg: Config) -> Result<(), String> {
    let store = SqliteQuestionStore::open(&cfg.db_path)
        .map_err(|e| format!("open question store: {}", e))?;
    if let Ok(count) = store.question_count() {
        info!(db = %cfg.db_path, questions = count, "question store opened");
    }

    let messenger: Arc<dyn Messenger> = Arc::new(LogMessenger);
    let registry = Arc::new(SessionRegistry::with_limits(
        Arc::clone(&messenger),
        Arc::new(store),
        Arc::new(EventBus::new()),
        cfg.score_limit,
        Duration::from_secs(cfg.session_ttl_secs),
    ));

    let sweeper = spawn_sweeper(
        Arc::clone(&registry),
        Duration::from_secs(cfg.sweep_interval_secs),
    );

    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry), messenger));
    let dispatch_task = tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        async move { dispatcher.run(update_rx).await }
    });
    // The transport adapter owns the sending side; held here so the
    // dispatch loop stays open for the process lifetime.
    let _update_tx = update_tx;

    let server = WebServer::start(AppContext::new(
        ServerConfig::new(cfg.admin_host.clone(), cfg.admin_port),
        Arc::clone(&registry),
    ))
    .map_err(|e| e.to_string())?;
    info!(addr = %server.addr(), "admin server listening");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("wait for shutdown: {}", e))?;
    info!("shutting down");
    server.shutdown().await;
    sweeper.abort();
    dispatch_task.abort();
    Ok(())
}
