//! Application state shared by every request: the problem store and the grading client.
//!
//! Built once at startup from an explicit `Config`; nothing in here is mutated afterwards.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::grading::Grader;
use crate::openai::OpenAI;
use crate::store::ProblemStore;

#[derive(Clone)]
pub struct AppState {
    pub store: ProblemStore,
    pub grader: Grader,
}

impl AppState {
    pub fn new(store: ProblemStore, grader: Grader) -> Self {
        Self { store, grader }
    }

    /// Open the catalog and build the LLM client described by `cfg`.
    #[instrument(level = "info", skip_all)]
    pub async fn from_config(cfg: &Config) -> Result<Self> {
        let store = ProblemStore::open(&cfg.db_path).await?;
        let openai = OpenAI::from_config(cfg)?;
        info!(
            target: "quiz_grader",
            base_url = %openai.base_url,
            model = %cfg.llm_model,
            api_key = cfg.llm_api_key.is_some(),
            "LLM backend configured"
        );
        let grader = Grader::new(Arc::new(openai), cfg.llm_model.clone());
        Ok(Self::new(store, grader))
    }
}
