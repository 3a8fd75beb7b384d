//! Domain models: problems and their listing projection, list filters, and grading results.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Page size used when a filter carries no usable limit.
pub const DEFAULT_LIMIT: i64 = 50;

/// A catalog problem with everything needed to render a grading prompt.
#[derive(Clone, Debug, Serialize)]
pub struct Problem {
  pub id: i64,
  pub source: String,
  pub source_id: String, // text, but ordered numerically in listings
  pub slug: String,
  pub title: String,
  pub difficulty: String,
  pub description: String,
  pub examples: Vec<Example>,
  pub constraints: Vec<String>,
  pub hints: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub python3_snippet: Option<String>,
  pub topics: Vec<String>,
}

/// One worked example attached to a problem.
///
/// Stored examples are arbitrary JSON values. They are resolved once, when the row is
/// decoded: objects with a string `example_text` become `Text`, everything else is kept
/// as `Opaque` and never reaches a prompt. Both variants serialize back to the stored
/// value unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum Example {
  Text { text: String, raw: Value },
  Opaque(Value),
}

impl Example {
  pub fn text(&self) -> Option<&str> {
    match self {
      Example::Text { text, .. } => Some(text),
      Example::Opaque(_) => None,
    }
  }

  pub fn raw(&self) -> &Value {
    match self {
      Example::Text { raw, .. } | Example::Opaque(raw) => raw,
    }
  }
}

impl From<Value> for Example {
  fn from(v: Value) -> Self {
    match v.get("example_text").and_then(Value::as_str) {
      Some(text) => Example::Text { text: text.to_string(), raw: v },
      None => Example::Opaque(v),
    }
  }
}

impl Serialize for Example {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.raw().serialize(serializer)
  }
}

/// Listing projection. `topics` is always present, empty when a problem has none.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProblemSummary {
  pub id: i64,
  pub source_id: String,
  pub slug: String,
  pub title: String,
  pub difficulty: String,
  pub topics: Vec<String>,
}

/// Search/filter/pagination criteria for `ProblemStore::list_problems`.
///
/// `query` is either `#<source_id>` for an exact id lookup or free text for a prefix
/// search. Empty strings and `None` mean "no constraint".
#[derive(Clone, Debug, Default)]
pub struct ListFilter {
  pub query: String,
  pub difficulty: Option<String>,
  pub topic: Option<String>,
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

impl ListFilter {
  pub fn limit(&self) -> i64 {
    match self.limit {
      Some(n) if n > 0 => n,
      _ => DEFAULT_LIMIT,
    }
  }

  pub fn offset(&self) -> i64 {
    self.offset.unwrap_or(0).max(0)
  }

  pub fn difficulty(&self) -> Option<&str> {
    self.difficulty.as_deref().filter(|s| !s.is_empty())
  }

  pub fn topic(&self) -> Option<&str> {
    self.topic.as_deref().filter(|s| !s.is_empty())
  }
}

/// One rubric dimension: pass/fail plus the grader's reasoning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionResult {
  pub score: bool,
  pub comment: String,
}

/// The full rubric verdict for one answer. Built once per grading call and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingResult {
  pub pattern_identified: CriterionResult,
  pub solution_works: CriterionResult,
  pub complexity_analysis: CriterionResult,
  pub optimal_solution: CriterionResult,
  pub overall_feedback: String,
}

impl GradingResult {
  /// Criteria with their display labels, in report order.
  pub fn criteria(&self) -> [(&'static str, &CriterionResult); 4] {
    [
      ("Pattern Identified", &self.pattern_identified),
      ("Solution Works", &self.solution_works),
      ("Complexity Analysis", &self.complexity_analysis),
      ("Optimal Solution", &self.optimal_solution),
    ]
  }

  /// Number of passed criteria, 0..=4.
  pub fn score(&self) -> usize {
    self.criteria().iter().filter(|(_, c)| c.score).count()
  }
}
