use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tq_engine::player::{MessageRef, PlayerId};
use tq_engine::question::{Candidate, Question, QuestionId};
use tq_web::{Messenger, MessengerError, QuestionMessage, QuestionSource, SourceError};

/// One recorded outbound messenger call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Question {
        player: PlayerId,
        sequence: u64,
        correct: QuestionId,
        options: Vec<QuestionId>,
        msg: i64,
    },
    Deleted {
        player: PlayerId,
        msg: i64,
    },
    Status {
        player: PlayerId,
        text: String,
    },
    Announcement {
        token: String,
        text: String,
    },
    Ack {
        callback: String,
        text: String,
    },
}

/// Messenger double that records every call and hands out message ids.
#[derive(Default)]
pub struct RecordingMessenger {
    next_msg_id: AtomicI64,
    log: Mutex<Vec<Outbound>>,
}

impl RecordingMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<Outbound> {
        self.log.lock().expect("log lock").clone()
    }

    pub fn acks(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Ack { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Sequence and correct option of the question most recently sent to
    /// the player. Tests use this to produce right or wrong answers.
    pub fn last_question_for(&self, player: PlayerId) -> Option<(u64, QuestionId, Vec<QuestionId>)> {
        self.entries()
            .into_iter()
            .rev()
            .find_map(|o| match o {
                Outbound::Question {
                    player: p,
                    sequence,
                    correct,
                    options,
                    ..
                } if p == player => Some((sequence, correct, options)),
                _ => None,
            })
    }

    pub fn questions_sent_to(&self, player: PlayerId) -> usize {
        self.entries()
            .iter()
            .filter(|o| matches!(o, Outbound::Question { player: p, .. } if *p == player))
            .count()
    }

    fn record(&self, entry: Outbound) {
        self.log.lock().expect("log lock").push(entry);
    }
}

impl Messenger for RecordingMessenger {
    fn send_question(
        &self,
        player: PlayerId,
        message: &QuestionMessage<'_>,
    ) -> Result<MessageRef, MessengerError> {
        let id = self.next_msg_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(Outbound::Question {
            player,
            sequence: message.sequence,
            correct: message.question.correct,
            options: message.question.options.iter().map(|o| o.id).collect(),
            msg: id,
        });
        Ok(MessageRef(id))
    }

    fn delete_message(&self, player: PlayerId, message: MessageRef) -> Result<(), MessengerError> {
        self.record(Outbound::Deleted {
            player,
            msg: message.0,
        });
        Ok(())
    }

    fn send_status(&self, player: PlayerId, text: &str) -> Result<(), MessengerError> {
        self.record(Outbound::Status {
            player,
            text: text.to_string(),
        });
        Ok(())
    }

    fn edit_shared_announcement(&self, token: &str, text: &str) -> Result<(), MessengerError> {
        self.record(Outbound::Announcement {
            token: token.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn acknowledge(&self, callback: &str, text: &str) -> Result<(), MessengerError> {
        self.record(Outbound::Ack {
            callback: callback.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Source double that serves a fixed script of responses, then reports
/// the category as empty.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Question>>,
}

impl ScriptedSource {
    pub fn new(questions: Vec<Question>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(questions.into()),
        })
    }

    pub fn push(&self, question: Question) {
        self.responses.lock().expect("responses lock").push_back(question);
    }
}

impl QuestionSource for ScriptedSource {
    fn next(&self, category: &str) -> Result<Question, SourceError> {
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .ok_or_else(|| SourceError::NoQuestionForCategory(category.to_string()))
    }
}

pub fn sample_candidates(category: &str, count: i64) -> Vec<Candidate> {
    (1..=count)
        .map(|i| Candidate {
            id: QuestionId(i),
            label: format!("Track {}", i),
            prompt: format!("clip-{}", i),
            category: category.to_string(),
        })
        .collect()
}

/// A five-option question whose correct answer is `correct_id`.
pub fn fixed_question(correct_id: i64, category: &str) -> Question {
    let pool = sample_candidates(category, 5);
    Question {
        id: QuestionId(correct_id),
        prompt: format!("clip-{}", correct_id),
        category: category.to_string(),
        options: pool
            .iter()
            .map(|c| tq_engine::question::AnswerOption {
                label: c.label.clone(),
                id: c.id,
            })
            .collect(),
        correct: QuestionId(correct_id),
    }
}
