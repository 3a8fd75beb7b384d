//! Process configuration: defaults, an optional TOML file, then environment variables.
//!
//! Resolution order (later wins):
//!   1. built-in defaults
//!   2. TOML file named by QUIZ_CONFIG_PATH (same field names as `Config`)
//!   3. env: PORT, AUTH_PASSWORD, DB_PATH, STATIC_DIR, LLM_BASE_URL, LLM_API_KEY, LLM_MODEL
//!
//! A `.env` file in the working directory is loaded into the environment first, if present.

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
  pub port: u16,
  pub auth_password: Option<String>,
  pub db_path: String,
  pub static_dir: String,
  pub llm_base_url: String,
  pub llm_api_key: Option<String>,
  pub llm_model: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      port: 8080,
      auth_password: None,
      db_path: "./problems.db".into(),
      static_dir: "./frontend/dist".into(),
      llm_base_url: "http://svc-litellm:4000/v1".into(),
      llm_api_key: None,
      llm_model: "claude-sonnet-4-5".into(),
    }
  }
}

impl Config {
  /// Server configuration. A shared password is mandatory because every route sits behind Basic-Auth.
  pub fn load_for_server() -> Result<Self> {
    let cfg = Self::load()?;
    if cfg.auth_password.as_deref().unwrap_or("").is_empty() {
      return Err(Error::Config("AUTH_PASSWORD is required".into()));
    }
    Ok(cfg)
  }

  /// CLI configuration; no password needed.
  pub fn load_for_cli() -> Result<Self> {
    Self::load()
  }

  fn load() -> Result<Self> {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();

    let mut cfg = match std::env::var("QUIZ_CONFIG_PATH").ok().filter(|p| !p.is_empty()) {
      Some(path) => Self::from_toml_file(&path)?,
      None => Self::default(),
    };
    cfg.apply_env(|key| std::env::var(key).ok())?;
    Ok(cfg)
  }

  fn from_toml_file(path: &str) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .map_err(|e| Error::Config(format!("cannot read {path}: {e}")))?;
    let cfg = toml::from_str::<Config>(&raw)
      .map_err(|e| Error::Config(format!("cannot parse {path}: {e}")))?;
    info!(target: "quiz_grader", %path, "Loaded config file (TOML)");
    Ok(cfg)
  }

  /// Overlay non-empty variables from `lookup` onto this config.
  fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(port) = get("PORT") {
      self.port = port
        .parse()
        .map_err(|_| Error::Config(format!("PORT must be a port number, got {port:?}")))?;
    }
    if let Some(v) = get("AUTH_PASSWORD") { self.auth_password = Some(v); }
    if let Some(v) = get("DB_PATH") { self.db_path = v; }
    if let Some(v) = get("STATIC_DIR") { self.static_dir = v; }
    if let Some(v) = get("LLM_BASE_URL") { self.llm_base_url = v; }
    if let Some(v) = get("LLM_API_KEY") { self.llm_api_key = Some(v); }
    if let Some(v) = get("LLM_MODEL") { self.llm_model = v; }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::io::Write;

  fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k| map.get(k).cloned()
  }

  #[test]
  fn env_overrides_defaults_and_ignores_empty_values() {
    let mut cfg = Config::default();
    cfg.apply_env(env(&[("PORT", "9090"), ("LLM_MODEL", "gpt-4o"), ("DB_PATH", "")])).unwrap();
    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.llm_model, "gpt-4o");
    assert_eq!(cfg.db_path, "./problems.db");
    assert_eq!(cfg.auth_password, None);
  }

  #[test]
  fn bad_port_is_config_error() {
    let mut cfg = Config::default();
    let err = cfg.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Config);
  }

  #[test]
  fn toml_file_fills_missing_fields_with_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = 3000\nllm_base_url = \"http://localhost:4000/v1\"\nauth_password = \"s3cret\"").unwrap();
    let cfg = Config::from_toml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.llm_base_url, "http://localhost:4000/v1");
    assert_eq!(cfg.auth_password.as_deref(), Some("s3cret"));
    assert_eq!(cfg.llm_model, "claude-sonnet-4-5");
  }

  #[test]
  fn unreadable_toml_is_config_error() {
    let err = Config::from_toml_file("/definitely/not/here.toml").unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Config);
  }

  #[test]
  fn unparsable_toml_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = \"x\"").unwrap();
    let err = Config::from_toml_file(file.path().to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    assert!(err.to_string().contains("cannot parse"));
  }
}
