//! Query Planner: turns a `ListFilter` into one predicate set, applied identically to the
//! total count and to the page fetch.
//!
//! Only the predicate *shape* is chosen here; every user-supplied value is bound as a
//! parameter.

use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, instrument};

use super::ProblemStore;
use crate::domain::{ListFilter, ProblemSummary};
use crate::error::Result;

/// Purely-digit ids first, in numeric order; anything else after them, lexicographically.
/// Digit strings are compared by significant length and then as text, which is exact at
/// any length (no integer cast to overflow).
const ORDER_BY: &str = " ORDER BY \
   CASE WHEN p.source_id <> '' AND p.source_id NOT GLOB '*[^0-9]*' THEN 0 ELSE 1 END, \
   CASE WHEN p.source_id <> '' AND p.source_id NOT GLOB '*[^0-9]*' THEN length(ltrim(p.source_id, '0')) END, \
   CASE WHEN p.source_id <> '' AND p.source_id NOT GLOB '*[^0-9]*' THEN ltrim(p.source_id, '0') END, \
   p.source_id, p.id";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Predicate {
  /// `#<id>` lookup; bypasses full-text search.
  SourceId(String),
  /// FTS5 match expression (already quoted, trailing prefix wildcard).
  FullText(String),
  /// The query had text but nothing searchable in it.
  MatchNothing,
  Difficulty(String),
  Topic(String),
}

/// Derive the AND-combined predicate set for a filter.
pub(crate) fn plan(filter: &ListFilter) -> Vec<Predicate> {
  let mut preds = Vec::new();

  if let Some(id) = filter.query.strip_prefix('#') {
    preds.push(Predicate::SourceId(id.trim().to_string()));
  } else if !filter.query.trim().is_empty() {
    match prefix_match_expr(&filter.query) {
      Some(expr) => preds.push(Predicate::FullText(expr)),
      None => preds.push(Predicate::MatchNothing),
    }
  }

  if let Some(d) = filter.difficulty() {
    preds.push(Predicate::Difficulty(d.to_string()));
  }
  if let Some(t) = filter.topic() {
    preds.push(Predicate::Topic(t.to_string()));
  }
  preds
}

/// Quote every whitespace-separated token as an FTS5 string and put the prefix
/// wildcard on the last one: `two sum` becomes `"two" "sum"*`.
fn prefix_match_expr(query: &str) -> Option<String> {
  let tokens: Vec<String> = query
    .split_whitespace()
    .filter(|t| t.chars().any(char::is_alphanumeric))
    .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
    .collect();
  if tokens.is_empty() {
    return None;
  }
  Some(format!("{}*", tokens.join(" ")))
}

fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, preds: &[Predicate]) {
  for (i, pred) in preds.iter().enumerate() {
    qb.push(if i == 0 { " WHERE " } else { " AND " });
    match pred {
      Predicate::SourceId(id) => {
        qb.push("p.source_id = ").push_bind(id.clone());
      }
      Predicate::FullText(expr) => {
        qb.push("p.id IN (SELECT rowid FROM problems_fts WHERE problems_fts MATCH ")
          .push_bind(expr.clone())
          .push(")");
      }
      Predicate::MatchNothing => {
        qb.push("0");
      }
      Predicate::Difficulty(d) => {
        qb.push("p.difficulty = ").push_bind(d.clone());
      }
      Predicate::Topic(name) => {
        qb.push(
          "p.id IN (SELECT pt.problem_id FROM problem_topics pt \
           JOIN topics t ON t.id = pt.topic_id WHERE t.name = ",
        )
        .push_bind(name.clone())
        .push(")");
      }
    }
  }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
  id: i64,
  source_id: String,
  slug: String,
  title: String,
  difficulty: String,
}

impl ProblemStore {
  /// One page of problem summaries plus the total number of matches for the same filter.
  #[instrument(
    level = "info",
    skip(self, filter),
    fields(query_len = filter.query.len(), difficulty = ?filter.difficulty(), topic = ?filter.topic())
  )]
  pub async fn list_problems(&self, filter: &ListFilter) -> Result<(Vec<ProblemSummary>, i64)> {
    let preds = plan(filter);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM problems p");
    push_where(&mut count, &preds);
    let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

    let mut page = QueryBuilder::<Sqlite>::new(
      "SELECT p.id, p.source_id, p.slug, p.title, p.difficulty FROM problems p",
    );
    push_where(&mut page, &preds);
    page.push(ORDER_BY);
    page.push(" LIMIT ").push_bind(filter.limit());
    page.push(" OFFSET ").push_bind(filter.offset());
    let rows: Vec<SummaryRow> = page.build_query_as().fetch_all(&self.pool).await?;

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut topics = self.topics_for(&ids).await?;

    let problems: Vec<ProblemSummary> = rows
      .into_iter()
      .map(|r| ProblemSummary {
        topics: topics.remove(&r.id).unwrap_or_default(),
        id: r.id,
        source_id: r.source_id,
        slug: r.slug,
        title: r.title,
        difficulty: r.difficulty,
      })
      .collect();

    debug!(target: "store", predicates = preds.len(), total, returned = problems.len(), "Listed problems");
    Ok((problems, total))
  }
}
