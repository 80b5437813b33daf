use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use thiserror::Error;
use tq_engine::question::{Candidate, Question, OPTION_COUNT, WILDCARD_CATEGORY};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no question available for category `{0}`")]
    NoQuestionForCategory(String),
    #[error("question storage error: {0}")]
    Storage(String),
}

/// Supplies random questions for a requested category. The wildcard
/// category must match regardless of a question's own stored category.
pub trait QuestionSource: Send + Sync {
    fn next(&self, category: &str) -> Result<Question, SourceError>;
}

/// Shared selection step: one candidate from the pool becomes the correct
/// answer, the rest become decoys.
pub fn pick_question<R: Rng>(
    pool: &[Candidate],
    category: &str,
    rng: &mut R,
) -> Result<Question, SourceError> {
    if pool.is_empty() {
        return Err(SourceError::NoQuestionForCategory(category.to_string()));
    }
    let correct = &pool[rng.gen_range(0..pool.len())];
    Ok(Question::from_candidates(correct, pool, rng))
}

/// In-memory question bank. Backs tests and the CLI demo; selection
/// semantics match the SQLite store.
pub struct MemoryQuestionBank {
    candidates: Vec<Candidate>,
    rng: Mutex<StdRng>,
}

impl MemoryQuestionBank {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self::with_seed(candidates, rand::random())
    }

    pub fn with_seed(candidates: Vec<Candidate>, seed: u64) -> Self {
        Self {
            candidates,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl QuestionSource for MemoryQuestionBank {
    fn next(&self, category: &str) -> Result<Question, SourceError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| SourceError::Storage("rng lock poisoned".to_string()))?;
        let mut pool: Vec<Candidate> = self
            .candidates
            .iter()
            .filter(|c| category == WILDCARD_CATEGORY || c.category == category)
            .cloned()
            .collect();
        pool.shuffle(&mut *rng);
        pool.truncate(OPTION_COUNT);
        pick_question(&pool, category, &mut *rng)
    }
}
