//! Command-line surface: run the server, grade one answer from a terminal, or import a dump.
//!
//! Human-facing progress goes to stderr; only the grading report is written to stdout.

use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgGroup, Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::Config;
use crate::domain::{GradingResult, Problem};
use crate::error::{Error, Result};
use crate::grading::Grader;
use crate::openai::OpenAI;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{parse_dump, ProblemStore};

#[derive(Parser, Debug)]
#[command(name = "quiz-grader", version, about = "Interview problem catalog with LLM rubric grading")]
pub struct Cli {
  #[command(subcommand)]
  pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Serve the JSON API and the web UI
  Server,
  /// Grade one answer against a catalog problem
  Grade(GradeArgs),
  /// Load a problem dump into the catalog database
  Import(ImportArgs),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["problem", "problem_id"])))]
pub struct GradeArgs {
  /// Problem slug, e.g. `two-sum`
  #[arg(long, value_name = "SLUG")]
  pub problem: Option<String>,

  /// Internal catalog id
  #[arg(long, value_name = "ID")]
  pub problem_id: Option<i64>,

  /// File holding the answer; stdin is read when omitted
  #[arg(long, value_name = "FILE")]
  pub answer: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
  /// LeetCode-style JSON dump
  #[arg(long, value_name = "FILE")]
  pub json: PathBuf,

  /// Catalog database; defaults to DB_PATH
  #[arg(long, value_name = "PATH")]
  pub db: Option<String>,
}

impl Cli {
  /// Whether this invocation runs the long-lived server (it gets chattier default logging).
  pub fn is_server(&self) -> bool {
    matches!(self.cmd, Command::Server)
  }
}

pub async fn dispatch(cli: Cli) -> Result<()> {
  match cli.cmd {
    Command::Server => run_server().await,
    Command::Grade(args) => run_grade(args).await,
    Command::Import(args) => run_import(args).await,
  }
}

#[instrument(level = "info", skip_all)]
async fn run_server() -> Result<()> {
  let cfg = Config::load_for_server()?;
  let password = cfg.auth_password.clone().unwrap_or_default();

  let state = Arc::new(AppState::from_config(&cfg).await?);
  let app = build_router(state, &cfg.static_dir, &password);

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
  let listener = bind_listener(addr).await?;
  info!(target: "quiz_grader", %addr, static_dir = %cfg.static_dir, db = %cfg.db_path, "HTTP server listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|source| Error::Server { context: "serve loop failed".into(), source })?;
  info!(target: "quiz_grader", "HTTP server stopped");
  Ok(())
}

async fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
  TcpListener::bind(addr)
    .await
    .map_err(|source| Error::Server { context: format!("cannot bind {addr}"), source })
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_err() {
    // No signal handler available; run until killed.
    std::future::pending::<()>().await;
  }
}

async fn run_grade(args: GradeArgs) -> Result<()> {
  let cfg = Config::load_for_cli()?;
  let store = ProblemStore::open(&cfg.db_path).await?;
  let grader = Grader::new(Arc::new(OpenAI::from_config(&cfg)?), cfg.llm_model.clone());

  let report = grade_from_terminal(&store, &grader, &cfg.llm_base_url, &args, std::io::stdin()).await?;
  print!("{report}");
  Ok(())
}

/// Resolve the problem, read the answer, grade it, and return the rendered report.
async fn grade_from_terminal(
  store: &ProblemStore,
  grader: &Grader,
  base_url: &str,
  args: &GradeArgs,
  stdin: impl Read,
) -> Result<String> {
  let problem = find_problem(store, args).await?;
  eprintln!("Problem: {} (#{}) [{}]", problem.title, problem.source_id, problem.difficulty);
  eprintln!("Topics: {}\n", problem.topics.join(", "));

  let answer = read_answer(args.answer.as_deref(), stdin)?;
  eprintln!("Grading with {} via {}...\n", grader.model(), base_url);

  let result = grader.grade(&problem, &answer).await?;
  Ok(render_report(&result))
}

async fn find_problem(store: &ProblemStore, args: &GradeArgs) -> Result<Problem> {
  let found = match (args.problem_id, args.problem.as_deref()) {
    (Some(id), _) => store.get_problem(id).await?,
    (None, Some(slug)) => store.get_problem_by_slug(slug).await?,
    (None, None) => return Err(Error::Validation("either --problem or --problem-id is required".into())),
  };
  found.ok_or_else(|| match (args.problem_id, &args.problem) {
    (Some(id), _) => Error::NotFound(format!("problem {id}")),
    (None, slug) => Error::NotFound(format!("problem {}", slug.as_deref().unwrap_or(""))),
  })
}

fn read_answer(path: Option<&Path>, mut stdin: impl Read) -> Result<String> {
  let answer = match path {
    Some(path) => std::fs::read_to_string(path)
      .map_err(|e| Error::Validation(format!("cannot read answer file {}: {e}", path.display())))?,
    None => {
      eprintln!("Reading answer from stdin (Ctrl+D to finish)...");
      let mut buf = String::new();
      stdin
        .read_to_string(&mut buf)
        .map_err(|e| Error::Validation(format!("cannot read stdin: {e}")))?;
      buf
    }
  };
  if answer.trim().is_empty() {
    return Err(Error::Validation("empty answer".into()));
  }
  Ok(answer)
}

/// Plain-text report: one block per criterion, then the score and the overall feedback.
pub fn render_report(result: &GradingResult) -> String {
  let mut out = String::new();
  for (name, criterion) in result.criteria() {
    let icon = if criterion.score { '✓' } else { '✗' };
    out.push_str(&format!("[{icon}] {name}\n    {}\n\n", criterion.comment));
  }
  out.push_str(&format!("Score: {}/4\n\n", result.score()));
  out.push_str(&format!("Overall Feedback:\n{}\n", result.overall_feedback));
  out
}

#[instrument(level = "info", skip_all, fields(json = %args.json.display()))]
async fn run_import(args: ImportArgs) -> Result<()> {
  let db_path = match args.db {
    Some(db) => db,
    None => Config::load_for_cli()?.db_path,
  };
  let raw = std::fs::read_to_string(&args.json)
    .map_err(|e| Error::Validation(format!("cannot read {}: {e}", args.json.display())))?;
  let questions = parse_dump(&raw)?;

  let store = ProblemStore::open_or_create(&db_path).await?;
  let report = store.import_questions(&questions).await?;
  eprintln!("Imported {} problems into {db_path} ({} skipped)", report.imported, report.skipped);
  Ok(())
}
