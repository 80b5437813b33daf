use crate::messenger::{Messenger, QuestionMessage};
use crate::source::{QuestionSource, SourceError};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tq_engine::player::{Player, PlayerId};
use tq_engine::question::{Question, QuestionId, WILDCARD_CATEGORY};
use tq_engine::rank;
use tracing::warn;

pub type SessionToken = String;
pub type CallbackToken = String;

pub const DEFAULT_SCORE_LIMIT: i32 = 5;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    QuestionUnavailable(#[from] SourceError),
    #[error("session not found: {0}")]
    NotFound(SessionToken),
    #[error("player {0} is not part of this session")]
    UnknownPlayer(PlayerId),
    #[error("session state lock poisoned")]
    StatePoisoned,
}

/// What one answer submission amounted to. Decided under the session
/// state lock, so at most one submission per question can advance or win.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AnswerOutcome {
    /// Session already over, or the answer cited an earlier question.
    Stale,
    Incorrect,
    /// First correct answer: the session advanced to `sequence`.
    Advanced { sequence: u64 },
    /// First correct answer, and it reached the score limit.
    Won { winner: PlayerId },
}

enum Feedback {
    Outdated,
    Right,
    Wrong,
}

impl Feedback {
    fn text(&self) -> &'static str {
        match self {
            Feedback::Outdated => "Your answer is outdated!",
            Feedback::Right => "You are right!",
            Feedback::Wrong => "That is the wrong answer",
        }
    }
}

struct LastCorrect {
    player_name: String,
    question: Question,
}

struct SessionState {
    players: HashMap<PlayerId, Player>,
    join_counter: u64,
    current: Option<Question>,
    sequence: u64,
    last_joined: Option<PlayerId>,
    last_correct: Option<LastCorrect>,
    winner: Option<PlayerId>,
}

/// One game instance. All read-then-write access to the question,
/// sequence, roster and winner goes through the inner state mutex;
/// messenger calls always happen with the lock released.
pub struct Session {
    token: SessionToken,
    category: String,
    score_limit: i32,
    created_at: Instant,
    last_active: Mutex<Instant>,
    state: Mutex<SessionState>,
    messenger: Arc<dyn Messenger>,
    source: Arc<dyn QuestionSource>,
}

impl Session {
    pub fn new(
        token: SessionToken,
        category: impl Into<String>,
        score_limit: i32,
        messenger: Arc<dyn Messenger>,
        source: Arc<dyn QuestionSource>,
    ) -> Self {
        let now = Instant::now();
        Self {
            token,
            category: category.into(),
            score_limit,
            created_at: now,
            last_active: Mutex::new(now),
            state: Mutex::new(SessionState {
                players: HashMap::new(),
                join_counter: 0,
                current: None,
                sequence: 0,
                last_joined: None,
                last_correct: None,
                winner: None,
            }),
            messenger,
            source,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn score_limit(&self) -> i32 {
        self.score_limit
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Fetches the first question and announces the game. A session that
    /// fails here must not be registered.
    pub fn start(&self) -> Result<(), SessionError> {
        let question = self.next_question()?;
        {
            let mut state = self.lock_state()?;
            state.sequence += 1;
            state.current = Some(question);
        }
        self.touch();
        self.broadcast_question();
        self.update_announcement();
        Ok(())
    }

    /// Admits a player, or refreshes an existing one. Rejoining never
    /// resets the score; the current question is resent privately.
    pub fn join(&self, player_id: PlayerId, display_name: &str) -> Result<(), SessionError> {
        {
            let mut guard = self.lock_state()?;
            let state = &mut *guard;
            let joined_seq = state.join_counter;
            match state.players.entry(player_id) {
                Entry::Occupied(mut entry) => entry.get_mut().rename(display_name),
                Entry::Vacant(entry) => {
                    entry.insert(Player::new(player_id, display_name, joined_seq));
                    state.join_counter += 1;
                }
            }
            state.last_joined = Some(player_id);
        }
        self.touch();
        self.send_question_to(player_id);
        self.update_announcement();
        Ok(())
    }

    /// The correctness-critical operation. The tap is acknowledged first
    /// so the external UI never hangs; the scoring decision then runs
    /// under the state lock; fan-out follows with the lock released.
    pub fn submit_answer(
        &self,
        callback: &str,
        player_id: PlayerId,
        answer_seq: u64,
        option: QuestionId,
    ) -> Result<AnswerOutcome, SessionError> {
        let feedback = {
            let state = self.lock_state()?;
            feedback_for(&state, answer_seq, option)
        };
        if let Err(err) = self.messenger.acknowledge(callback, feedback.text()) {
            warn!(token = %self.token, %err, "failed to acknowledge answer tap");
        }

        let outcome = self.decide(player_id, answer_seq, option)?;
        self.touch();

        match outcome {
            AnswerOutcome::Stale | AnswerOutcome::Incorrect => {}
            AnswerOutcome::Advanced { .. } => {
                self.broadcast_question();
                self.update_announcement();
            }
            AnswerOutcome::Won { .. } => self.finish(),
        }
        Ok(outcome)
    }

    pub fn is_ended(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.winner.is_some(),
            Err(_) => true,
        }
    }

    pub fn touch(&self) {
        if let Ok(mut guard) = self.last_active.lock() {
            *guard = Instant::now();
        }
    }

    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        match self.last_active.lock() {
            Ok(last) => now.saturating_duration_since(*last) >= ttl,
            Err(_) => false,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (sequence, ended, players) = match self.lock_state() {
            Ok(state) => (
                state.sequence,
                state.winner.is_some(),
                rank::ranked(state.players.values())
                    .into_iter()
                    .map(|p| PlayerEntry {
                        id: p.id(),
                        display_name: p.display_name().to_string(),
                        score: p.score(),
                    })
                    .collect(),
            ),
            Err(_) => (0, true, Vec::new()),
        };
        SessionSnapshot {
            token: self.token.clone(),
            category: self.category.clone(),
            sequence,
            score_limit: self.score_limit,
            ended,
            players,
        }
    }

    /// Sequence check, scoring, and advancement or winner declaration —
    /// a single transition under the state lock. The next question is
    /// fetched before anything is mutated, so a source failure leaves
    /// score and sequence untouched.
    fn decide(
        &self,
        player_id: PlayerId,
        answer_seq: u64,
        option: QuestionId,
    ) -> Result<AnswerOutcome, SessionError> {
        let mut guard = self.lock_state()?;
        let state = &mut *guard;

        if state.winner.is_some() || state.sequence != answer_seq {
            return Ok(AnswerOutcome::Stale);
        }
        let current = match &state.current {
            Some(question) => question.clone(),
            None => return Ok(AnswerOutcome::Stale),
        };

        let correct = current.is_correct(option);
        let Some(player) = state.players.get_mut(&player_id) else {
            return Err(SessionError::UnknownPlayer(player_id));
        };

        if !correct {
            player.deduct_point();
            return Ok(AnswerOutcome::Incorrect);
        }

        let player_name = player.display_name().to_string();
        if player.score() + 1 >= self.score_limit {
            player.add_point();
            state.last_correct = Some(LastCorrect {
                player_name,
                question: current,
            });
            state.winner = Some(player_id);
            return Ok(AnswerOutcome::Won { winner: player_id });
        }

        let next = self.next_question()?;
        player.add_point();
        state.last_correct = Some(LastCorrect {
            player_name,
            question: current,
        });
        state.current = Some(next);
        state.sequence += 1;
        Ok(AnswerOutcome::Advanced {
            sequence: state.sequence,
        })
    }

    fn next_question(&self) -> Result<Question, SessionError> {
        match self.source.next(&self.category) {
            Err(SourceError::NoQuestionForCategory(_)) if self.category != WILDCARD_CATEGORY => {
                Ok(self.source.next(WILDCARD_CATEGORY)?)
            }
            result => Ok(result?),
        }
    }

    /// Privately (re)sends the current question, deleting the player's
    /// previous question message first — a player may re-join.
    fn send_question_to(&self, player_id: PlayerId) {
        let (stale_msg, status, question, sequence) = {
            let mut guard = match self.lock_state() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            let state = &mut *guard;
            let stale_msg = state
                .players
                .get_mut(&player_id)
                .and_then(|p| p.take_last_question_msg());
            (
                stale_msg,
                self.render_status(state),
                state.current.clone(),
                state.sequence,
            )
        };

        if let Some(msg) = stale_msg {
            if let Err(err) = self.messenger.delete_message(player_id, msg) {
                warn!(token = %self.token, player = %player_id, %err, "failed to delete stale question message");
            }
        }
        if let Err(err) = self.messenger.send_status(player_id, &status) {
            warn!(token = %self.token, player = %player_id, %err, "failed to send status");
        }
        let Some(question) = question else { return };
        let message = QuestionMessage {
            token: &self.token,
            sequence,
            question: &question,
        };
        match self.messenger.send_question(player_id, &message) {
            Ok(msg_ref) => {
                if let Ok(mut state) = self.lock_state() {
                    if let Some(player) = state.players.get_mut(&player_id) {
                        player.set_last_question_msg(msg_ref);
                    }
                }
            }
            Err(err) => {
                warn!(token = %self.token, player = %player_id, %err, "failed to send question");
            }
        }
    }

    fn broadcast_question(&self) {
        let ids: Vec<PlayerId> = match self.lock_state() {
            Ok(state) => state.players.keys().copied().collect(),
            Err(_) => return,
        };
        for player_id in ids {
            self.send_question_to(player_id);
        }
    }

    /// Terminal fan-out: clear every pending question prompt and show
    /// each player the final status.
    fn finish(&self) {
        let (targets, status) = {
            let mut guard = match self.lock_state() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            let state = &mut *guard;
            let targets: Vec<_> = state
                .players
                .values_mut()
                .map(|p| (p.id(), p.take_last_question_msg()))
                .collect();
            (targets, self.render_status(state))
        };

        for (player_id, msg) in targets {
            if let Some(msg) = msg {
                if let Err(err) = self.messenger.delete_message(player_id, msg) {
                    warn!(token = %self.token, player = %player_id, %err, "failed to delete question message");
                }
            }
            if let Err(err) = self.messenger.send_status(player_id, &status) {
                warn!(token = %self.token, player = %player_id, %err, "failed to send final status");
            }
        }
        self.update_announcement();
    }

    fn update_announcement(&self) {
        let text = match self.lock_state() {
            Ok(state) => self.announcement_text(&state),
            Err(_) => return,
        };
        if let Err(err) = self.messenger.edit_shared_announcement(&self.token, &text) {
            warn!(token = %self.token, %err, "failed to update shared announcement");
        }
    }

    fn render_status(&self, state: &SessionState) -> String {
        let mut text = String::new();

        if let Some(winner_id) = state.winner {
            text.push_str("Game over!\n");
            if let Some(winner) = state.players.get(&winner_id) {
                text.push_str(&format!("-->>Winner is *{}*<<--\n\n", winner.display_name()));
            }
        }

        if !state.players.is_empty() {
            text.push_str(&format!("Players in this session: {}.", state.players.len()));
            if let Some(last) = state.last_joined.and_then(|id| state.players.get(&id)) {
                text.push_str(&format!(" Last joined is _{}_.", last.display_name()));
            }
            text.push_str("\n\n");
        }

        if let Some(last) = &state.last_correct {
            text.push_str(&format!(
                "The right answer was\n*{}*.\n",
                last.question.correct_label()
            ));
            text.push_str(&format!("*{}* was the first!\n\n", last.player_name));
        }

        if !state.players.is_empty() {
            let ranked = rank::ranked(state.players.values());
            text.push_str(&format!(
                "Current top (limit {}):\n{}\n",
                self.score_limit,
                rank::high_score_lines(&ranked)
            ));
        }

        if state.current.is_some() && state.winner.is_none() {
            text.push_str(&format!("Question number: {}\n", state.sequence));
        }

        text
    }

    fn announcement_text(&self, state: &SessionState) -> String {
        let mut text = String::new();
        if state.winner.is_none() {
            text.push_str(&format!("A new game is on, category = {}. ", self.category));
            text.push_str("Guess the track from a short sound clip. Tap your answer below.\n\n");
        }
        text.push_str(&self.render_status(state));
        text
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, SessionState>, SessionError> {
        self.state.lock().map_err(|_| SessionError::StatePoisoned)
    }
}

fn feedback_for(state: &SessionState, answer_seq: u64, option: QuestionId) -> Feedback {
    if state.winner.is_some() || state.sequence != answer_seq {
        return Feedback::Outdated;
    }
    match &state.current {
        Some(question) if question.is_correct(option) => Feedback::Right,
        Some(_) => Feedback::Wrong,
        None => Feedback::Outdated,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub token: SessionToken,
    pub category: String,
    pub sequence: u64,
    pub score_limit: i32,
    pub ended: bool,
    pub players: Vec<PlayerEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerEntry {
    pub id: PlayerId,
    pub display_name: String,
    pub score: i32,
}
