//! HTTP endpoint handlers. These are thin wrappers that forward to the store and the grader.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{rejection::JsonRejection, Path, Query, State},
  Json,
};
use tracing::{info, instrument, warn};

use crate::domain::Problem;
use crate::error::{Error, Result};
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state, q))]
pub async fn http_list_problems(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ProblemsQuery>,
) -> Result<Json<ListOut>> {
  let filter = q.into_filter();
  let (problems, total) = state.store.list_problems(&filter).await?;
  info!(target: "quiz_grader", total, returned = problems.len(), "HTTP problems listed");
  Ok(Json(ListOut { problems, total, limit: filter.limit(), offset: filter.offset() }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_problem(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<Problem>> {
  let id: i64 = id.parse().map_err(|_| Error::Validation("invalid id".into()))?;
  let problem = state
    .store
    .get_problem(id)
    .await?
    .ok_or_else(|| Error::NotFound(format!("problem {id}")))?;
  Ok(Json(problem))
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_topics(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>> {
  Ok(Json(state.store.list_topics().await?))
}

#[instrument(level = "info", skip(state, payload))]
pub async fn http_post_grade(
  State(state): State<Arc<AppState>>,
  payload: std::result::Result<Json<GradeIn>, JsonRejection>,
) -> Result<Json<GradeOut>> {
  let Json(body) = payload.map_err(|e| Error::Validation(format!("invalid request body: {}", e.body_text())))?;
  let (problem_id, answer) = body.validate()?;

  let problem = state
    .store
    .get_problem(problem_id)
    .await?
    .ok_or_else(|| Error::NotFound(format!("problem {problem_id}")))?;

  let result = state.grader.grade(&problem, &answer).await?;
  info!(target: "grading", problem_id, score = result.score(), answer_len = answer.len(), "HTTP grade served");
  Ok(Json(GradeOut { problem_id, result }))
}

/// Always 200; reachability problems are reported in the body.
#[instrument(level = "info", skip(state))]
pub async fn http_smoke(State(state): State<Arc<AppState>>) -> Json<SmokeOut> {
  match state.grader.ping().await {
    Ok(reply) => Json(SmokeOut { ok: true, model_reply: Some(reply), error: None }),
    Err(e) => {
      warn!(target: "grading", error = %e, "Smoke check failed");
      Json(SmokeOut { ok: false, model_reply: None, error: Some(e.to_string()) })
    }
  }
}

pub async fn http_api_not_found() -> Error {
  Error::NotFound("no such API route".into())
}
