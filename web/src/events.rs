use crate::session::SessionToken;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tq_engine::player::PlayerId;

pub type EventSender = mpsc::UnboundedSender<GameEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<GameEvent>;

/// Operational events published per session token. Gameplay never depends
/// on the bus; it exists for observers (admin tooling, tests).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    SessionStarted {
        token: SessionToken,
        category: String,
    },
    PlayerJoined {
        token: SessionToken,
        player_id: PlayerId,
        display_name: String,
    },
    QuestionAdvanced {
        token: SessionToken,
        sequence: u64,
    },
    GameEnded {
        token: SessionToken,
        winner: PlayerId,
    },
    SessionExpired {
        token: SessionToken,
    },
}

struct Subscriber {
    id: usize,
    sender: EventSender,
}

#[derive(Default)]
struct BusInner {
    subscribers: RwLock<HashMap<SessionToken, Vec<Subscriber>>>,
    next_id: AtomicUsize,
}

/// Token-keyed fan-out of `GameEvent`s over unbounded channels.
/// Subscribers whose receiver is gone are pruned on the next publish.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, token: SessionToken) -> (usize, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        let mut subscribers = match self.inner.subscribers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers
            .entry(token)
            .or_default()
            .push(Subscriber { id, sender: tx });
        (id, rx)
    }

    pub fn publish(&self, token: &str, event: GameEvent) {
        let mut dead = Vec::new();
        {
            let subscribers = match self.inner.subscribers.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let Some(list) = subscribers.get(token) else {
                return;
            };
            for subscriber in list {
                if subscriber.sender.send(event.clone()).is_err() {
                    dead.push(subscriber.id);
                }
            }
        }
        if !dead.is_empty() {
            self.remove(token, &dead);
        }
    }

    pub fn unsubscribe(&self, token: &str, subscriber_id: usize) {
        self.remove(token, &[subscriber_id]);
    }

    pub fn subscriber_count(&self) -> usize {
        match self.inner.subscribers.read() {
            Ok(guard) => guard.values().map(|list| list.len()).sum(),
            Err(_) => 0,
        }
    }

    fn remove(&self, token: &str, ids: &[usize]) {
        let mut subscribers = match self.inner.subscribers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(list) = subscribers.get_mut(token) {
            list.retain(|subscriber| !ids.contains(&subscriber.id));
            if list.is_empty() {
                subscribers.remove(token);
            }
        }
    }
}
