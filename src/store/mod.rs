//! Problem Store: the SQLite-backed catalog of problems, topics and the full-text index.
//!
//! The store is opened once at startup and shared read-only by every request; SQLite in
//! WAL mode lets readers proceed while the importer writes.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{info, instrument, warn};

use crate::domain::{Example, Problem};
use crate::error::Result;

mod import;
mod query;
mod schema;
mod topics;

pub use import::{parse_dump, ImportReport, RawQuestion};

#[derive(Clone, Debug)]
pub struct ProblemStore {
  pool: SqlitePool,
}

const PROBLEM_COLUMNS: &str = "id, source, source_id, slug, title, difficulty, description, \
   examples, constraints, hints, python3_snippet";

impl ProblemStore {
  /// Open an existing catalog database.
  #[instrument(level = "info")]
  pub async fn open(path: &str) -> Result<Self> {
    Self::connect(path, false).await
  }

  /// Open (creating if needed) a catalog database and apply the schema. Used by the importer.
  #[instrument(level = "info")]
  pub async fn open_or_create(path: &str) -> Result<Self> {
    let store = Self::connect(path, true).await?;
    store.migrate().await?;
    Ok(store)
  }

  async fn connect(path: &str, create: bool) -> Result<Self> {
    let options = SqliteConnectOptions::new()
      .filename(path)
      .journal_mode(SqliteJournalMode::Wal)
      .foreign_keys(true)
      .create_if_missing(create);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    info!(target: "store", %path, "Problem store opened");
    Ok(Self::from_pool(pool))
  }

  pub fn from_pool(pool: SqlitePool) -> Self {
    Self { pool }
  }

  pub async fn migrate(&self) -> Result<()> {
    sqlx::raw_sql(schema::SCHEMA).execute(&self.pool).await?;
    Ok(())
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn get_problem(&self, id: i64) -> Result<Option<Problem>> {
    let sql = format!("SELECT {PROBLEM_COLUMNS} FROM problems WHERE id = ?");
    let row = sqlx::query_as::<_, ProblemRow>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    self.attach_topics(row).await
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn get_problem_by_slug(&self, slug: &str) -> Result<Option<Problem>> {
    let sql = format!("SELECT {PROBLEM_COLUMNS} FROM problems WHERE slug = ? ORDER BY id LIMIT 1");
    let row = sqlx::query_as::<_, ProblemRow>(&sql)
      .bind(slug)
      .fetch_optional(&self.pool)
      .await?;
    self.attach_topics(row).await
  }

  /// All topic names, alphabetically.
  pub async fn list_topics(&self) -> Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>("SELECT name FROM topics ORDER BY name")
      .fetch_all(&self.pool)
      .await?;
    Ok(names)
  }

  async fn attach_topics(&self, row: Option<ProblemRow>) -> Result<Option<Problem>> {
    let Some(row) = row else { return Ok(None) };
    let mut topics = self.topics_for(&[row.id]).await?;
    let names = topics.remove(&row.id).unwrap_or_default();
    Ok(Some(row.into_problem(names)))
  }
}

#[derive(sqlx::FromRow)]
struct ProblemRow {
  id: i64,
  source: String,
  source_id: String,
  slug: String,
  title: String,
  difficulty: String,
  description: String,
  examples: String,
  constraints: String,
  hints: String,
  python3_snippet: String,
}

impl ProblemRow {
  fn into_problem(self, topics: Vec<String>) -> Problem {
    let examples = decode_list::<serde_json::Value>(self.id, "examples", &self.examples)
      .into_iter()
      .map(Example::from)
      .collect();
    Problem {
      id: self.id,
      source: self.source,
      source_id: self.source_id,
      slug: self.slug,
      title: self.title,
      difficulty: self.difficulty,
      description: self.description,
      examples,
      constraints: decode_list(self.id, "constraints", &self.constraints),
      hints: decode_list(self.id, "hints", &self.hints),
      python3_snippet: Some(self.python3_snippet).filter(|s| !s.is_empty()),
      topics,
    }
  }
}

fn decode_list<T: DeserializeOwned>(id: i64, column: &str, raw: &str) -> Vec<T> {
  serde_json::from_str(raw).unwrap_or_else(|e| {
    warn!(target: "store", id, column, error = %e, "Stored JSON list is malformed; treating as empty");
    Vec::new()
  })
}

/// Topic lists keyed by problem id; every requested id is present.
pub type TopicMap = HashMap<i64, Vec<String>>;

#[cfg(test)]
pub(crate) mod fixtures {
  use serde_json::json;
  use sqlx::sqlite::SqlitePoolOptions;

  use super::{parse_dump, ProblemStore};

  /// Single-connection in-memory store with the schema applied.
  pub async fn memory_store() -> ProblemStore {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect("sqlite::memory:")
      .await
      .expect("in-memory sqlite");
    let store = ProblemStore::from_pool(pool);
    store.migrate().await.expect("schema");
    store
  }

  /// A small catalog: source ids deliberately inserted out of numeric order.
  pub async fn seeded_store() -> ProblemStore {
    let store = memory_store().await;
    let dump = json!({ "questions": [
      {
        "title": "Two Sum", "frontend_id": "1", "problem_slug": "two-sum", "difficulty": "Easy",
        "description": "Find two numbers that add up to target.",
        "examples": [{"example_num": 1, "example_text": "nums=[2,7,11,15], target=9 -> [0,1]"}, {"example_num": 2}],
        "constraints": ["2 <= nums.length"], "hints": ["Use a map."],
        "topics": ["arrays", "hash-table"],
        "code_snippets": {"python3": "class Solution:\n    def twoSum(self, nums, target):"}
      },
      {
        "title": "Two Sum II", "frontend_id": 167, "problem_slug": "two-sum-ii", "difficulty": "Medium",
        "description": "Sorted input.", "topics": ["arrays", "two-pointers"]
      },
      {
        "title": "Container With Most Water", "frontend_id": "11", "problem_slug": "container-with-most-water",
        "difficulty": "Medium", "description": "Maximize area.", "topics": ["arrays", "two-pointers", "greedy"]
      },
      {
        "title": "Reverse Integer", "frontend_id": "7", "problem_slug": "reverse-integer",
        "difficulty": "Medium", "description": "Reverse digits of an integer."
      },
      {
        "title": "Trapping Rain Water", "frontend_id": "42", "problem_slug": "trapping-rain-water",
        "difficulty": "Hard", "description": "Compute trapped water.", "topics": ["stack"]
      },
      {
        "title": "Bonus Puzzle", "frontend_id": "LCP-01", "problem_slug": "bonus-puzzle",
        "difficulty": "Easy", "description": "Not numbered."
      }
    ]})
    .to_string();
    let questions = parse_dump(&dump).expect("fixture dump");
    store.import_questions(&questions).await.expect("fixture import");
    store
  }
}
