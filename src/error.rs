//! Error taxonomy shared by the store, the grading client, the HTTP layer and the CLI.
//!
//! Every failure is one of a closed set of kinds. Transport and protocol failures keep
//! their structured fields (status code, raw body, underlying cause) so callers can
//! branch on them instead of parsing messages.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("{0}")]
  Validation(String),

  #[error("storage error: {0}")]
  Storage(#[from] sqlx::Error),

  #[error(transparent)]
  Transport(#[from] TransportError),

  #[error(transparent)]
  Protocol(#[from] ProtocolError),

  #[error("config error: {0}")]
  Config(String),

  /// The HTTP listener could not be bound, or the server loop failed.
  #[error("server error: {context}: {source}")]
  Server {
    context: String,
    #[source]
    source: std::io::Error,
  },
}

/// The LLM backend could not be reached, or answered with a non-success status.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("LLM request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("LLM API error {status}: {body}")]
  Status { status: u16, body: String },
}

/// The LLM backend answered, but not with a usable grading result.
#[derive(Debug, Error)]
pub enum ProtocolError {
  #[error("unparsable chat completion response: {0}")]
  MalformedResponse(#[source] serde_json::Error),

  #[error("no choices in response")]
  NoChoices,

  #[error("no tool calls in response (content: {})", content.as_deref().unwrap_or(""))]
  NoToolCalls { content: Option<String> },

  #[error("tool call arguments do not match the grading schema: {0}")]
  MalformedArguments(#[source] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Validation,
  Storage,
  Transport,
  Protocol,
  Config,
  Server,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::NotFound(_) => ErrorKind::NotFound,
      Error::Validation(_) => ErrorKind::Validation,
      Error::Storage(_) => ErrorKind::Storage,
      Error::Transport(_) => ErrorKind::Transport,
      Error::Protocol(_) => ErrorKind::Protocol,
      Error::Config(_) => ErrorKind::Config,
      Error::Server { .. } => ErrorKind::Server,
    }
  }

  pub fn status_code(&self) -> StatusCode {
    match self.kind() {
      ErrorKind::Validation => StatusCode::BAD_REQUEST,
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(target: "quiz_grader", kind = ?self.kind(), error = %self, "Request failed");
    }
    (status, self.to_string()).into_response()
  }
}
