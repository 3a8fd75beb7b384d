//! Minimal OpenAI-compatible chat-completions transport.
//!
//! One POST per call, no retries, no timeout override. Calls are instrumented and log the
//! model, latency and token usage (never message contents or the API key).

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{ProtocolError, Result, TransportError};
use crate::util::trunc_for_log;

/// Anything that can carry one chat-completion round trip.
#[async_trait]
pub trait ChatTransport: Send + Sync {
  async fn chat_completion(&self, req: &ChatRequest) -> Result<ChatResponse>;
}

#[derive(Clone)]
pub struct OpenAI {
  client: reqwest::Client,
  api_key: Option<String>,
  pub base_url: String,
}

impl OpenAI {
  pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(TransportError::Request)?;
    let base_url = base_url.into().trim_end_matches('/').to_string();
    Ok(Self { client, api_key: api_key.filter(|k| !k.is_empty()), base_url })
  }

  pub fn from_config(cfg: &Config) -> Result<Self> {
    Self::new(cfg.llm_base_url.clone(), cfg.llm_api_key.clone())
  }
}

#[async_trait]
impl ChatTransport for OpenAI {
  #[instrument(level = "info", skip(self, req), fields(model = %req.model, messages = req.messages.len(), tools = req.tools.len()))]
  async fn chat_completion(&self, req: &ChatRequest) -> Result<ChatResponse> {
    let url = format!("{}/chat/completions", self.base_url);
    let start = Instant::now();

    let mut builder = self.client.post(&url)
      .header(USER_AGENT, concat!("quiz-grader/", env!("CARGO_PKG_VERSION")))
      .header(CONTENT_TYPE, "application/json")
      .json(req);
    if let Some(key) = &self.api_key {
      builder = builder.bearer_auth(key);
    }

    let res = builder.send().await.map_err(TransportError::Request)?;
    let status = res.status();
    let body = res.text().await.map_err(TransportError::Request)?;
    let elapsed = start.elapsed();

    if !status.is_success() {
      warn!(?elapsed, status = status.as_u16(), body = %trunc_for_log(&body, 300), "LLM backend returned an error status");
      return Err(TransportError::Status { status: status.as_u16(), body }.into());
    }

    let parsed: ChatResponse = serde_json::from_str(&body).map_err(ProtocolError::MalformedResponse)?;
    match &parsed.usage {
      Some(usage) => info!(?elapsed, prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "LLM usage"),
      None => info!(?elapsed, response_bytes = body.len(), "LLM response received"),
    }
    Ok(parsed)
  }
}

// --- Chat DTOs ---

#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
  pub model: String,
  pub messages: Vec<ChatMessage>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tools: Vec<Tool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tool_choice: Option<ToolChoice>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
  pub tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: "system".into(), content: Some(content.into()), tool_calls: Vec::new() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: "user".into(), content: Some(content.into()), tool_calls: Vec::new() }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
  #[serde(default)]
  pub id: String,
  #[serde(default, rename = "type")]
  pub kind: String,
  pub function: FunctionCall,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
  #[serde(default)]
  pub name: String,
  /// JSON text produced by the model; parsed by the caller.
  pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tool {
  #[serde(rename = "type")]
  pub kind: &'static str,
  pub function: ToolFunction,
}

impl Tool {
  pub fn function(name: &'static str, description: &'static str, parameters: Schema) -> Self {
    Self { kind: "function", function: ToolFunction { name, description, parameters } }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolFunction {
  pub name: &'static str,
  pub description: &'static str,
  pub parameters: Schema,
}

/// Forces the backend to call the named function instead of answering in text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolChoice {
  #[serde(rename = "type")]
  pub kind: &'static str,
  pub function: ToolChoiceFunction,
}

impl ToolChoice {
  pub fn function(name: &'static str) -> Self {
    Self { kind: "function", function: ToolChoiceFunction { name } }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolChoiceFunction {
  pub name: &'static str,
}

/// Statically shaped JSON Schema for tool parameters.
///
/// Object schemas list every declared property as required, so a schema built here
/// cannot drift out of sync with its own `required` list.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schema {
  Object {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'static str>,
    properties: BTreeMap<&'static str, Schema>,
    required: Vec<&'static str>,
  },
  Boolean { description: &'static str },
  #[serde(rename = "string")]
  Text { description: &'static str },
}

impl Schema {
  pub fn object<I>(description: Option<&'static str>, properties: I) -> Self
  where
    I: IntoIterator<Item = (&'static str, Schema)>,
  {
    let properties: BTreeMap<_, _> = properties.into_iter().collect();
    let required = properties.keys().copied().collect();
    Schema::Object { description, properties, required }
  }

  pub fn boolean(description: &'static str) -> Self {
    Schema::Boolean { description }
  }

  pub fn string(description: &'static str) -> Self {
    Schema::Text { description }
  }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatResponse {
  #[serde(default, deserialize_with = "null_as_empty")]
  pub choices: Vec<ChatChoice>,
  #[serde(default)]
  pub usage: Option<Usage>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatChoice {
  pub message: ChatMessage,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Usage {
  #[serde(default)] pub prompt_tokens: Option<u32>,
  #[serde(default)] pub completion_tokens: Option<u32>,
  #[serde(default)] pub total_tokens: Option<u32>,
}

// Some backends send `null` instead of omitting empty arrays.
fn null_as_empty<'de, D, T>(d: D) -> std::result::Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::{Error, ErrorKind};
  use serde_json::json;
  use wiremock::matchers::{body_partial_json, header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn request() -> ChatRequest {
    ChatRequest {
      model: "test-model".into(),
      messages: vec![ChatMessage::user("hi")],
      tools: Vec::new(),
      tool_choice: None,
    }
  }

  #[tokio::test]
  async fn posts_to_chat_completions_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/v1/chat/completions"))
      .and(header("authorization", "Bearer sk-test"))
      .and(body_partial_json(json!({"model": "test-model", "messages": [{"role": "user", "content": "hi"}]})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": "hello", "tool_calls": null}}],
        "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
      })))
      .expect(1)
      .mount(&server)
      .await;

    let oa = OpenAI::new(format!("{}/v1/", server.uri()), Some("sk-test".into())).unwrap();
    let res = oa.chat_completion(&request()).await.unwrap();
    assert_eq!(res.choices[0].message.content.as_deref(), Some("hello"));
    assert!(res.choices[0].message.tool_calls.is_empty());
  }

  #[tokio::test]
  async fn omits_authorization_without_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
      .mount(&server)
      .await;

    let oa = OpenAI::new(server.uri(), Some(String::new())).unwrap();
    oa.chat_completion(&request()).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
  }

  #[tokio::test]
  async fn non_success_status_is_transport_error_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(429).set_body_string(r#"{"error":{"message":"rate limited"}}"#))
      .mount(&server)
      .await;

    let oa = OpenAI::new(server.uri(), None).unwrap();
    let err = oa.chat_completion(&request()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    match err {
      Error::Transport(TransportError::Status { status, body }) => {
        assert_eq!(status, 429);
        assert!(body.contains("rate limited"));
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn unparsable_body_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
      .mount(&server)
      .await;

    let oa = OpenAI::new(server.uri(), None).unwrap();
    let err = oa.chat_completion(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::MalformedResponse(_))));
  }

  #[tokio::test]
  async fn unreachable_backend_is_transport_error() {
    // Port 9 (discard) on localhost is expected to refuse connections.
    let oa = OpenAI::new("http://127.0.0.1:9", None).unwrap();
    let err = oa.chat_completion(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Request(_))));
  }

  #[test]
  fn request_serializes_forced_tool_choice() {
    let mut req = request();
    req.tools.push(Tool::function("f", "does f", Schema::object(None, [("a", Schema::boolean("a flag"))])));
    req.tool_choice = Some(ToolChoice::function("f"));
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["tool_choice"], json!({"type": "function", "function": {"name": "f"}}));
    assert_eq!(
      v["tools"][0]["function"]["parameters"],
      json!({"type": "object", "properties": {"a": {"type": "boolean", "description": "a flag"}}, "required": ["a"]})
    );
  }

  #[test]
  fn plain_request_omits_tool_fields() {
    let v = serde_json::to_value(request()).unwrap();
    assert!(v.get("tools").is_none());
    assert!(v.get("tool_choice").is_none());
  }
}
