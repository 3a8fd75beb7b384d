//! Public HTTP request/response structs (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{GradingResult, ListFilter, ProblemSummary};
use crate::error::{Error, Result};

/// Largest page the HTTP surface will serve.
pub const MAX_LIMIT: i64 = 200;

/// Query string of `GET /api/problems`. Numbers arrive as text so that junk values fall
/// back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ProblemsQuery {
  #[serde(default)]
  pub q: Option<String>,
  #[serde(default)]
  pub difficulty: Option<String>,
  #[serde(default)]
  pub topic: Option<String>,
  #[serde(default)]
  pub limit: Option<String>,
  #[serde(default)]
  pub offset: Option<String>,
}

impl ProblemsQuery {
  pub fn into_filter(self) -> ListFilter {
    let limit = self
      .limit
      .and_then(|v| v.trim().parse::<i64>().ok())
      .filter(|n| (1..=MAX_LIMIT).contains(n));
    let offset = self
      .offset
      .and_then(|v| v.trim().parse::<i64>().ok())
      .filter(|n| *n >= 0);
    ListFilter {
      query: self.q.unwrap_or_default(),
      difficulty: self.difficulty,
      topic: self.topic,
      limit,
      offset,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ListOut {
  pub problems: Vec<ProblemSummary>,
  pub total: i64,
  pub limit: i64,
  pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct GradeIn {
  #[serde(default)]
  pub problem_id: Option<i64>,
  #[serde(default)]
  pub answer: Option<String>,
}

impl GradeIn {
  /// Both fields are mandatory; a zero id or empty answer counts as missing.
  pub fn validate(self) -> Result<(i64, String)> {
    match (self.problem_id, self.answer) {
      (Some(id), Some(answer)) if id != 0 && !answer.is_empty() => Ok((id, answer)),
      _ => Err(Error::Validation("problem_id and answer are required".into())),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct GradeOut {
  pub problem_id: i64,
  pub result: GradingResult,
}

#[derive(Debug, Serialize)]
pub struct SmokeOut {
  pub ok: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model_reply: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}
