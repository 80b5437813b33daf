use crate::source::{pick_question, QuestionSource, SourceError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tq_engine::question::{Candidate, Question, QuestionId, WILDCARD_CATEGORY};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    clip_ref TEXT NOT NULL,
    category TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_questions_category ON questions (category);";

/// SQLite-backed question storage: up to five random rows per category,
/// one of which becomes the correct answer.
pub struct SqliteQuestionStore {
    conn: Mutex<Connection>,
    rng: Mutex<StdRng>,
}

impl SqliteQuestionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let conn = Connection::open(path).map_err(storage)?;
        Self::from_connection(conn, rand::random())
    }

    pub fn open_in_memory() -> Result<Self, SourceError> {
        Self::in_memory_with_seed(rand::random())
    }

    pub fn in_memory_with_seed(seed: u64) -> Result<Self, SourceError> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::from_connection(conn, seed)
    }

    fn from_connection(conn: Connection, seed: u64) -> Result<Self, SourceError> {
        conn.execute_batch(SCHEMA).map_err(storage)?;
        Ok(Self {
            conn: Mutex::new(conn),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    pub fn insert(
        &self,
        title: &str,
        clip_ref: &str,
        category: &str,
    ) -> Result<QuestionId, SourceError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO questions (title, clip_ref, category) VALUES (?1, ?2, ?3)",
            (title, clip_ref, category),
        )
        .map_err(storage)?;
        Ok(QuestionId(conn.last_insert_rowid()))
    }

    pub fn question_count(&self) -> Result<u64, SourceError> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))
            .map_err(storage)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SourceError> {
        self.conn
            .lock()
            .map_err(|_| SourceError::Storage("connection lock poisoned".to_string()))
    }
}

impl QuestionSource for SqliteQuestionStore {
    fn next(&self, category: &str) -> Result<Question, SourceError> {
        let pool = {
            let conn = self.lock_conn()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, clip_ref, category FROM questions
                     WHERE (category = ?1 OR ?1 = ?2)
                     ORDER BY RANDOM() LIMIT 5",
                )
                .map_err(storage)?;
            let rows = stmt
                .query_map((category, WILDCARD_CATEGORY), |row| {
                    Ok(Candidate {
                        id: QuestionId(row.get(0)?),
                        label: row.get(1)?,
                        prompt: row.get(2)?,
                        category: row.get(3)?,
                    })
                })
                .map_err(storage)?;
            rows.collect::<Result<Vec<Candidate>, _>>().map_err(storage)?
        };
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| SourceError::Storage("rng lock poisoned".to_string()))?;
        pick_question(&pool, category, &mut *rng)
    }
}

fn storage(err: rusqlite::Error) -> SourceError {
    SourceError::Storage(err.to_string())
}
