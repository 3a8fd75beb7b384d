//! Catalog ingestion from a LeetCode-style JSON dump.
//!
//! This is the only write path into the store. It upserts problems by `(source, slug)`,
//! replaces their topic associations and rebuilds the full-text index, all in one
//! transaction.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::ProblemStore;
use crate::error::{Error, Result};

const SOURCE: &str = "leetcode";

/// One item of the dump. Unknown fields are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawQuestion {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub frontend_id: Option<Value>,
  #[serde(default)]
  pub problem_id: Option<Value>,
  #[serde(default)]
  pub problem_slug: String,
  #[serde(default)]
  pub difficulty: Option<String>,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub examples: Vec<Value>,
  #[serde(default)]
  pub constraints: Vec<String>,
  #[serde(default)]
  pub hints: Vec<String>,
  #[serde(default)]
  pub topics: Vec<String>,
  #[serde(default)]
  pub code_snippets: HashMap<String, String>,
}

impl RawQuestion {
  /// `frontend_id`, else `problem_id`, as text. Dumps carry either numbers or strings.
  fn source_id(&self) -> String {
    let id = self.frontend_id.as_ref().or(self.problem_id.as_ref());
    match id {
      Some(Value::String(s)) => s.clone(),
      Some(Value::Number(n)) => n.to_string(),
      _ => String::new(),
    }
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Dump {
  Wrapped { questions: Vec<RawQuestion> },
  Bare(Vec<RawQuestion>),
}

/// Parse either `{"questions": [...]}` or a bare array.
pub fn parse_dump(raw: &str) -> Result<Vec<RawQuestion>> {
  let dump: Dump = serde_json::from_str(raw)
    .map_err(|e| Error::Validation(format!("invalid problem dump: {e}")))?;
  Ok(match dump {
    Dump::Wrapped { questions } => questions,
    Dump::Bare(questions) => questions,
  })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
  pub imported: usize,
  pub skipped: usize,
}

impl ProblemStore {
  #[instrument(level = "info", skip(self, questions), fields(count = questions.len()))]
  pub async fn import_questions(&self, questions: &[RawQuestion]) -> Result<ImportReport> {
    let mut tx = self.pool.begin().await?;
    let mut topic_ids: HashMap<String, i64> = HashMap::new();
    let mut report = ImportReport::default();

    for q in questions {
      if q.title.is_empty() || q.problem_slug.is_empty() {
        debug!(target: "store", title = %q.title, slug = %q.problem_slug, "Skipping item without title or slug");
        report.skipped += 1;
        continue;
      }

      let examples = serde_json::to_string(&q.examples).unwrap_or_else(|_| "[]".into());
      let constraints = serde_json::to_string(&q.constraints).unwrap_or_else(|_| "[]".into());
      let hints = serde_json::to_string(&q.hints).unwrap_or_else(|_| "[]".into());
      let snippet = q.code_snippets.get("python3").cloned().unwrap_or_default();
      let difficulty = q.difficulty.clone().unwrap_or_else(|| "Medium".into());

      let problem_id: i64 = sqlx::query_scalar(
        "INSERT INTO problems (source, source_id, slug, title, difficulty, description, examples, constraints, hints, python3_snippet)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(source, slug) DO UPDATE SET
           source_id = excluded.source_id,
           title = excluded.title,
           difficulty = excluded.difficulty,
           description = excluded.description,
           examples = excluded.examples,
           constraints = excluded.constraints,
           hints = excluded.hints,
           python3_snippet = excluded.python3_snippet,
           updated_at = datetime('now')
         RETURNING id",
      )
      .bind(SOURCE)
      .bind(q.source_id())
      .bind(&q.problem_slug)
      .bind(&q.title)
      .bind(&difficulty)
      .bind(&q.description)
      .bind(&examples)
      .bind(&constraints)
      .bind(&hints)
      .bind(&snippet)
      .fetch_one(&mut *tx)
      .await?;

      sqlx::query("DELETE FROM problem_topics WHERE problem_id = ?")
        .bind(problem_id)
        .execute(&mut *tx)
        .await?;

      for name in &q.topics {
        let topic_id = match topic_ids.get(name) {
          Some(id) => *id,
          None => {
            sqlx::query("INSERT OR IGNORE INTO topics (name) VALUES (?)")
              .bind(name)
              .execute(&mut *tx)
              .await?;
            let id: i64 = sqlx::query_scalar("SELECT id FROM topics WHERE name = ?")
              .bind(name)
              .fetch_one(&mut *tx)
              .await?;
            topic_ids.insert(name.clone(), id);
            id
          }
        };
        sqlx::query("INSERT OR IGNORE INTO problem_topics (problem_id, topic_id) VALUES (?, ?)")
          .bind(problem_id)
          .bind(topic_id)
          .execute(&mut *tx)
          .await?;
      }

      report.imported += 1;
    }

    sqlx::query("INSERT INTO problems_fts(problems_fts) VALUES ('rebuild')")
      .execute(&mut *tx)
      .await?;
    tx.commit().await?;

    info!(target: "store", imported = report.imported, skipped = report.skipped, topics = topic_ids.len(), "Import finished");
    Ok(report)
  }
}
