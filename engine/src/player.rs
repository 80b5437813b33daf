use serde::{Deserialize, Serialize};
use std::fmt;

/// External platform identity of a participant (e.g. a private chat id).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to an outbound message, issued by the messenger.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MessageRef(pub i64);

/// One participant in one session. Owns the authoritative score.
#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    display_name: String,
    score: i32,
    joined_seq: u64,
    last_question_msg: Option<MessageRef>,
}

impl Player {
    pub fn new(id: PlayerId, display_name: impl Into<String>, joined_seq: u64) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            score: 0,
            joined_seq,
            last_question_msg: None,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Score may go negative; wrong answers penalize.
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Join-order ordinal, used as the stable ranking tie-break.
    pub fn joined_seq(&self) -> u64 {
        self.joined_seq
    }

    pub fn add_point(&mut self) {
        self.score += 1;
    }

    pub fn deduct_point(&mut self) {
        self.score -= 1;
    }

    /// Rejoin keeps the score; only the display name may change.
    pub fn rename(&mut self, display_name: &str) {
        if !display_name.is_empty() {
            self.display_name = display_name.to_string();
        }
    }

    pub fn set_last_question_msg(&mut self, msg: MessageRef) {
        self.last_question_msg = Some(msg);
    }

    pub fn take_last_question_msg(&mut self) -> Option<MessageRef> {
        self.last_question_msg.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_keeps_score() {
        let mut player = Player::new(PlayerId(7), "Ann", 0);
        player.add_point();
        player.add_point();
        player.rename("Annette");
        assert_eq!(player.display_name(), "Annette");
        assert_eq!(player.score(), 2);
    }

    #[test]
    fn rename_ignores_empty_name() {
        let mut player = Player::new(PlayerId(7), "Ann", 0);
        player.rename("");
        assert_eq!(player.display_name(), "Ann");
    }

    #[test]
    fn question_msg_is_taken_once() {
        let mut player = Player::new(PlayerId(1), "Bo", 0);
        player.set_last_question_msg(MessageRef(42));
        assert_eq!(player.take_last_question_msg(), Some(MessageRef(42)));
        assert_eq!(player.take_last_question_msg(), None);
    }

    #[test]
    fn score_goes_negative_on_penalties() {
        let mut player = Player::new(PlayerId(1), "Bo", 0);
        player.deduct_point();
        player.deduct_point();
        assert_eq!(player.score(), -2);
    }
}
