use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Wildcard category value: matches a question of any stored category.
pub const WILDCARD_CATEGORY: &str = "any";

/// Number of answer options shown per question (correct entry plus decoys).
pub const OPTION_COUNT: usize = 5;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct QuestionId(pub i64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One labeled answer button.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub label: String,
    pub id: QuestionId,
}

/// A raw row from question storage, before option selection.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: QuestionId,
    pub label: String,
    pub prompt: String,
    pub category: String,
}

impl Candidate {
    fn option(&self) -> AnswerOption {
        AnswerOption {
            label: self.label.clone(),
            id: self.id,
        }
    }
}

/// Immutable for the lifetime of one question turn.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    /// Opaque payload reference (e.g. an audio clip file id).
    pub prompt: String,
    pub category: String,
    pub options: Vec<AnswerOption>,
    pub correct: QuestionId,
}

impl Question {
    /// Builds a question around `correct`, drawing decoys from `pool`.
    /// `pool` is expected to contain the correct candidate itself.
    pub fn from_candidates<R: Rng>(correct: &Candidate, pool: &[Candidate], rng: &mut R) -> Self {
        let mut seen = HashSet::new();
        let unique = pool.iter().filter(|c| seen.insert(c.id)).count();
        let options = select_options(pool, unique.min(OPTION_COUNT), correct.id, rng);
        Self {
            id: correct.id,
            prompt: correct.prompt.clone(),
            category: correct.category.clone(),
            options,
            correct: correct.id,
        }
    }

    pub fn is_correct(&self, option: QuestionId) -> bool {
        self.correct == option
    }

    pub fn correct_label(&self) -> &str {
        self.options
            .iter()
            .find(|o| o.id == self.correct)
            .map(|o| o.label.as_str())
            .unwrap_or("")
    }
}

/// Picks `count` options out of `candidates`: the correct entry exactly once,
/// no duplicate ids, shuffled order. `candidates` must contain the correct id.
pub fn select_options<R: Rng>(
    candidates: &[Candidate],
    count: usize,
    correct: QuestionId,
    rng: &mut R,
) -> Vec<AnswerOption> {
    let mut seen = HashSet::new();
    let mut correct_option = None;
    let mut decoys = Vec::new();
    for candidate in candidates {
        if !seen.insert(candidate.id) {
            continue;
        }
        if candidate.id == correct {
            correct_option = Some(candidate.option());
        } else {
            decoys.push(candidate.option());
        }
    }

    decoys.shuffle(rng);

    let mut options: Vec<AnswerOption> = correct_option.into_iter().collect();
    options.extend(decoys.into_iter().take(count.saturating_sub(options.len())));
    options.shuffle(rng);
    options
}
