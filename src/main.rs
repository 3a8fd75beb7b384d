//! Quiz Grader · interview problem catalog with LLM rubric grading
//!
//! - Axum JSON API behind shared-password Basic-Auth, plus the static web UI
//! - SQLite catalog with FTS5 prefix search
//! - OpenAI-compatible chat backend used with a forced `submit_grading` tool call
//! - CLI: `server`, `grade`, `import`
//!
//! Important env variables:
//!   PORT            : u16 (default 8080)
//!   AUTH_PASSWORD   : required by `server`
//!   DB_PATH         : SQLite catalog (default "./problems.db")
//!   STATIC_DIR      : web UI build (default "./frontend/dist")
//!   LLM_BASE_URL    : default "http://svc-litellm:4000/v1"
//!   LLM_API_KEY     : sent as a bearer token when set
//!   LLM_MODEL       : default "claude-sonnet-4-5"
//!   QUIZ_CONFIG_PATH: optional TOML file with the same settings
//!   LOG_LEVEL       : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod cli;
mod config;
mod domain;
mod error;
mod grading;
mod openai;
mod prompt;
mod protocol;
mod routes;
mod state;
mod store;
mod telemetry;
mod util;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::Cli;
use crate::error::ErrorKind;

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  telemetry::init_tracing(if cli.is_server() { telemetry::SERVER_DIRECTIVE } else { telemetry::CLI_DIRECTIVE });

  match cli::dispatch(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("Error: {e}");
      match e.kind() {
        ErrorKind::Validation => ExitCode::from(2),
        _ => ExitCode::FAILURE,
      }
    }
  }
}
