use crate::events::{EventBus, GameEvent};
use crate::messenger::Messenger;
use crate::session::{
    AnswerOutcome, Session, SessionError, SessionSnapshot, SessionToken, DEFAULT_SCORE_LIMIT,
};
use crate::source::QuestionSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tq_engine::player::PlayerId;
use tq_engine::question::QuestionId;
use tracing::{debug, info, warn};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// The concurrent collection of running games. The map lock guards only
/// insertion, lookup and removal; gameplay runs under each session's own
/// lock so unrelated sessions never contend.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionToken, Arc<Session>>>,
    messenger: Arc<dyn Messenger>,
    source: Arc<dyn QuestionSource>,
    event_bus: Arc<EventBus>,
    score_limit: i32,
    session_ttl: Duration,
    created_total: AtomicU64,
}

impl SessionRegistry {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        source: Arc<dyn QuestionSource>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::with_limits(
            messenger,
            source,
            event_bus,
            DEFAULT_SCORE_LIMIT,
            DEFAULT_SESSION_TTL,
        )
    }

    pub fn with_limits(
        messenger: Arc<dyn Messenger>,
        source: Arc<dyn QuestionSource>,
        event_bus: Arc<EventBus>,
        score_limit: i32,
        session_ttl: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            messenger,
            source,
            event_bus,
            score_limit,
            session_ttl,
            created_total: AtomicU64::new(0),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Creates and starts a session for a start trigger. A trigger for a
    /// token that is already active replaces the old session: last start
    /// wins. Nothing is registered when `start()` fails.
    pub fn on_start(
        &self,
        token: SessionToken,
        category: &str,
    ) -> Result<Arc<Session>, SessionError> {
        let session = Arc::new(Session::new(
            token.clone(),
            category,
            self.score_limit,
            Arc::clone(&self.messenger),
            Arc::clone(&self.source),
        ));
        session.start()?;

        let replaced = {
            let mut sessions = self
                .sessions
                .write()
                .map_err(|_| SessionError::StatePoisoned)?;
            sessions.insert(token.clone(), Arc::clone(&session))
        };
        if replaced.is_some() {
            warn!(%token, "start trigger for an active session; replacing it");
        }
        self.created_total.fetch_add(1, Ordering::Relaxed);
        info!(%token, category, "session started");
        self.event_bus.publish(
            &token,
            GameEvent::SessionStarted {
                token: token.clone(),
                category: category.to_string(),
            },
        );
        Ok(session)
    }

    pub fn on_join(
        &self,
        token: &str,
        player_id: PlayerId,
        display_name: &str,
    ) -> Result<(), SessionError> {
        let session = self
            .get(token)
            .ok_or_else(|| SessionError::NotFound(token.to_string()))?;
        session.join(player_id, display_name)?;
        self.event_bus.publish(
            token,
            GameEvent::PlayerJoined {
                token: token.to_string(),
                player_id,
                display_name: display_name.to_string(),
            },
        );
        Ok(())
    }

    pub fn on_answer(
        &self,
        token: &str,
        callback: &str,
        player_id: PlayerId,
        sequence: u64,
        option: QuestionId,
    ) -> Result<AnswerOutcome, SessionError> {
        let session = self
            .get(token)
            .ok_or_else(|| SessionError::NotFound(token.to_string()))?;
        let outcome = session.submit_answer(callback, player_id, sequence, option)?;
        match outcome {
            AnswerOutcome::Advanced { sequence } => self.event_bus.publish(
                token,
                GameEvent::QuestionAdvanced {
                    token: token.to_string(),
                    sequence,
                },
            ),
            AnswerOutcome::Won { winner } => self.event_bus.publish(
                token,
                GameEvent::GameEnded {
                    token: token.to_string(),
                    winner,
                },
            ),
            AnswerOutcome::Stale | AnswerOutcome::Incorrect => {}
        }
        Ok(outcome)
    }

    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .ok()
            .and_then(|sessions| sessions.get(token).cloned())
    }

    /// Removes every session inactive past the TTL, terminal or not.
    /// The sweep is the only mechanism that bounds memory growth.
    pub fn sweep(&self, now: Instant) -> usize {
        let removed: Vec<SessionToken> = {
            let mut sessions = match self.sessions.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let expired: Vec<SessionToken> = sessions
                .iter()
                .filter(|(_, session)| session.is_expired(self.session_ttl, now))
                .map(|(token, _)| token.clone())
                .collect();
            for token in &expired {
                sessions.remove(token);
            }
            expired
        };
        for token in &removed {
            self.event_bus
                .publish(token, GameEvent::SessionExpired { token: token.clone() });
        }
        if !removed.is_empty() {
            debug!(count = removed.len(), "swept expired sessions");
        }
        removed.len()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn created_total(&self) -> u64 {
        self.created_total.load(Ordering::Relaxed)
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<SessionSnapshot> = match self.sessions.read() {
            Ok(sessions) => sessions.values().map(|s| s.snapshot()).collect(),
            Err(_) => Vec::new(),
        };
        snapshots.sort_by(|a, b| a.token.cmp(&b.token));
        snapshots
    }
}

/// Runs the TTL sweep on a fixed interval for the registry's lifetime.
pub fn spawn_sweeper(registry: Arc<SessionRegistry>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.sweep(Instant::now());
        }
    })
}
