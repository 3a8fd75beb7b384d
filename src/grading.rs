//! Grading Protocol Client.
//!
//! Sends the rubric prompt with a single declared tool and a forced `tool_choice`, then
//! extracts the rubric result from the first tool call. A plain-text reply is never
//! accepted in place of the tool call.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::domain::{GradingResult, Problem};
use crate::error::{ProtocolError, Result};
use crate::openai::{ChatMessage, ChatRequest, ChatResponse, ChatTransport, Schema, Tool, ToolChoice};
use crate::prompt::build_prompt;

pub const GRADING_TOOL_NAME: &str = "submit_grading";

const PING_MESSAGE: &str = "Say hello in exactly one sentence.";

fn criterion(description: &'static str, score: &'static str, comment: &'static str) -> Schema {
  Schema::object(
    Some(description),
    [("score", Schema::boolean(score)), ("comment", Schema::string(comment))],
  )
}

/// The `submit_grading` tool: four criterion objects plus overall feedback, all required.
pub fn grading_tool() -> Tool {
  let parameters = Schema::object(
    None,
    [
      (
        "pattern_identified",
        criterion(
          "Did the candidate identify the correct algorithmic pattern (e.g., hash map, two-pointer, BFS, DP, sliding window)?",
          "true if the candidate identified the correct pattern",
          "Brief explanation of what pattern was expected and what the candidate identified",
        ),
      ),
      (
        "solution_works",
        criterion(
          "Would the candidate's described approach produce correct results for all valid inputs?",
          "true if the approach would produce correct results",
          "Brief explanation of correctness, noting any edge cases missed",
        ),
      ),
      (
        "complexity_analysis",
        criterion(
          "Did the candidate state correct time AND space complexity for their approach?",
          "true if both time and space complexity are correctly stated",
          "Brief explanation of expected vs stated complexity",
        ),
      ),
      (
        "optimal_solution",
        criterion(
          "Is the candidate's solution optimal (best known time complexity for this problem)?",
          "true if the solution achieves optimal time complexity",
          "Brief explanation of what optimal looks like and how the candidate's approach compares",
        ),
      ),
      (
        "overall_feedback",
        Schema::string(
          "2-3 sentence constructive summary of the candidate's answer, highlighting strengths and areas for improvement.",
        ),
      ),
    ],
  );

  Tool::function(
    GRADING_TOOL_NAME,
    "Submit the structured grading result for a candidate's coding interview answer.",
    parameters,
  )
}

/// Pull the rubric out of a completion: first choice, first tool call, strict parse.
pub fn extract_result(resp: ChatResponse) -> Result<GradingResult, ProtocolError> {
  let choice = resp.choices.into_iter().next().ok_or(ProtocolError::NoChoices)?;
  let message = choice.message;

  let call_count = message.tool_calls.len();
  let call = match message.tool_calls.into_iter().next() {
    Some(call) => call,
    None => return Err(ProtocolError::NoToolCalls { content: message.content }),
  };
  if call_count > 1 {
    debug!(target: "grading", ignored = call_count - 1, "Backend returned extra tool calls; using the first");
  }

  serde_json::from_str(&call.function.arguments).map_err(ProtocolError::MalformedArguments)
}

#[derive(Clone)]
pub struct Grader {
  transport: Arc<dyn ChatTransport>,
  model: String,
}

impl Grader {
  pub fn new(transport: Arc<dyn ChatTransport>, model: impl Into<String>) -> Self {
    Self { transport, model: model.into() }
  }

  pub fn model(&self) -> &str {
    &self.model
  }

  pub fn grading_request(&self, problem: &Problem, answer: &str) -> ChatRequest {
    let prompt = build_prompt(problem, answer);
    ChatRequest {
      model: self.model.clone(),
      messages: vec![ChatMessage::system(prompt.system), ChatMessage::user(prompt.user)],
      tools: vec![grading_tool()],
      tool_choice: Some(ToolChoice::function(GRADING_TOOL_NAME)),
    }
  }

  /// Grade one answer. Exactly one outbound call; nothing is cached or retried.
  #[instrument(level = "info", skip(self, problem, answer), fields(problem_id = problem.id, model = %self.model, answer_len = answer.len()))]
  pub async fn grade(&self, problem: &Problem, answer: &str) -> Result<GradingResult> {
    let req = self.grading_request(problem, answer);
    let start = Instant::now();
    let resp = self.transport.chat_completion(&req).await?;
    let result = extract_result(resp)?;
    info!(target: "grading", problem_id = problem.id, score = result.score(), elapsed = ?start.elapsed(), "Answer graded");
    Ok(result)
  }

  /// Connectivity check: one unstructured message, text reply returned verbatim.
  #[instrument(level = "info", skip(self), fields(model = %self.model))]
  pub async fn ping(&self) -> Result<String> {
    let req = ChatRequest {
      model: self.model.clone(),
      messages: vec![ChatMessage::user(PING_MESSAGE)],
      tools: Vec::new(),
      tool_choice: None,
    };
    let resp = self.transport.chat_completion(&req).await?;
    let choice = resp.choices.into_iter().next().ok_or(ProtocolError::NoChoices)?;
    Ok(choice.message.content.unwrap_or_default())
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  use async_trait::async_trait;
  use serde_json::{json, Value};

  use crate::error::{Result, TransportError};
  use crate::openai::{ChatRequest, ChatResponse, ChatTransport};

  pub enum Reply {
    Body(Value),
    Status(u16, String),
  }

  /// Canned backend that records every request it receives.
  pub struct FakeTransport {
    reply: Reply,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<Value>>,
  }

  impl FakeTransport {
    pub fn new(reply: Reply) -> Self {
      Self { reply, calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl ChatTransport for FakeTransport {
    async fn chat_completion(&self, req: &ChatRequest) -> Result<ChatResponse> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.requests.lock().unwrap().push(serde_json::to_value(req).unwrap());
      match &self.reply {
        Reply::Body(v) => Ok(serde_json::from_value(v.clone()).unwrap()),
        Reply::Status(status, body) => Err(TransportError::Status { status: *status, body: body.clone() }.into()),
      }
    }
  }

  pub fn rubric_args() -> Value {
    json!({
      "pattern_identified": {"score": true, "comment": "Hash map spotted."},
      "solution_works": {"score": true, "comment": "Handles duplicates."},
      "complexity_analysis": {"score": false, "comment": "Space not stated."},
      "optimal_solution": {"score": true, "comment": "O(n)."},
      "overall_feedback": "Solid answer; state space complexity."
    })
  }

  pub fn tool_call_body(arguments: &str) -> Value {
    json!({"choices": [{"message": {
      "role": "assistant",
      "content": null,
      "tool_calls": [{"id": "call_1", "type": "function", "function": {"name": "submit_grading", "arguments": arguments}}]
    }}]})
  }
}

#[cfg(test)]
mod tests {
  use super::testing::*;
  use super::*;
  use crate::domain::Example;
  use crate::error::{Error, TransportError};
  use serde_json::json;

  fn problem() -> Problem {
    Problem {
      id: 1,
      source: "leetcode".into(),
      source_id: "1".into(),
      slug: "two-sum".into(),
      title: "Two Sum".into(),
      difficulty: "Easy".into(),
      description: "desc".into(),
      examples: vec![Example::from(json!({"example_num": 1, "example_text": "ex"}))],
      constraints: vec![],
      hints: vec![],
      python3_snippet: None,
      topics: vec![],
    }
  }

  fn grader_with(reply: Reply) -> (Arc<FakeTransport>, Grader) {
    let fake = Arc::new(FakeTransport::new(reply));
    (fake.clone(), Grader::new(fake, "test-model"))
  }

  #[test]
  fn tool_schema_requires_all_fields() {
    let v = serde_json::to_value(grading_tool()).unwrap();
    assert_eq!(v["type"], "function");
    assert_eq!(v["function"]["name"], GRADING_TOOL_NAME);
    let params = &v["function"]["parameters"];
    assert_eq!(params["type"], "object");
    let mut required: Vec<&str> = params["required"].as_array().unwrap().iter().map(|s| s.as_str().unwrap()).collect();
    required.sort();
    assert_eq!(
      required,
      vec!["complexity_analysis", "optimal_solution", "overall_feedback", "pattern_identified", "solution_works"]
    );
    for key in ["pattern_identified", "solution_works", "complexity_analysis", "optimal_solution"] {
      let c = &params["properties"][key];
      assert_eq!(c["type"], "object");
      assert_eq!(c["properties"]["score"]["type"], "boolean");
      assert_eq!(c["properties"]["comment"]["type"], "string");
      assert_eq!(c["required"], json!(["comment", "score"]));
    }
    assert_eq!(params["properties"]["overall_feedback"]["type"], "string");
  }

  #[tokio::test]
  async fn grade_sends_two_messages_and_forces_the_tool() {
    let (fake, grader) = grader_with(Reply::Body(tool_call_body(&rubric_args().to_string())));
    let result = grader.grade(&problem(), "use a hash map").await.unwrap();

    assert_eq!(fake.calls(), 1);
    let sent = fake.requests.lock().unwrap()[0].clone();
    assert_eq!(sent["model"], "test-model");
    assert_eq!(sent["messages"].as_array().unwrap().len(), 2);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(sent["messages"][1]["role"], "user");
    assert!(sent["messages"][1]["content"].as_str().unwrap().ends_with("use a hash map"));
    assert_eq!(sent["tools"].as_array().unwrap().len(), 1);
    assert_eq!(sent["tool_choice"], json!({"type": "function", "function": {"name": "submit_grading"}}));

    assert!(result.pattern_identified.score);
    assert!(!result.complexity_analysis.score);
    assert_eq!(result.score(), 3);
    assert_eq!(result.overall_feedback, "Solid answer; state space complexity.");
  }

  #[tokio::test]
  async fn text_only_reply_is_protocol_error() {
    let body = json!({"choices": [{"message": {"role": "assistant", "content": "Looks great, 4/4!"}}]});
    let (_, grader) = grader_with(Reply::Body(body));
    let err = grader.grade(&problem(), "x").await.unwrap_err();
    match err {
      Error::Protocol(ProtocolError::NoToolCalls { content }) => assert_eq!(content.as_deref(), Some("Looks great, 4/4!")),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn zero_choices_is_protocol_error() {
    let (_, grader) = grader_with(Reply::Body(json!({"choices": []})));
    let err = grader.grade(&problem(), "x").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::NoChoices)));
  }

  #[tokio::test]
  async fn malformed_arguments_are_protocol_error() {
    let (_, grader) = grader_with(Reply::Body(tool_call_body("{\"pattern_identified\": {\"score\": true}}")));
    let err = grader.grade(&problem(), "x").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::MalformedArguments(_))));

    let (_, grader) = grader_with(Reply::Body(tool_call_body("not json at all")));
    let err = grader.grade(&problem(), "x").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::MalformedArguments(_))));
  }

  #[tokio::test]
  async fn status_error_propagates_as_transport() {
    let (_, grader) = grader_with(Reply::Status(500, "boom".into()));
    let err = grader.grade(&problem(), "x").await.unwrap_err();
    match err {
      Error::Transport(TransportError::Status { status, body }) => {
        assert_eq!(status, 500);
        assert_eq!(body, "boom");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn only_the_first_tool_call_counts() {
    let mut second = rubric_args();
    second["overall_feedback"] = json!("from the second call");
    let body = json!({"choices": [{"message": {"role": "assistant", "tool_calls": [
      {"id": "a", "type": "function", "function": {"name": "submit_grading", "arguments": rubric_args().to_string()}},
      {"id": "b", "type": "function", "function": {"name": "submit_grading", "arguments": second.to_string()}}
    ]}}]});
    let resp: ChatResponse = serde_json::from_value(body).unwrap();
    let result = extract_result(resp).unwrap();
    assert_eq!(result.overall_feedback, "Solid answer; state space complexity.");
  }

  #[tokio::test]
  async fn ping_returns_text_verbatim() {
    let body = json!({"choices": [{"message": {"role": "assistant", "content": "Hello there, friend."}}]});
    let (fake, grader) = grader_with(Reply::Body(body));
    assert_eq!(grader.ping().await.unwrap(), "Hello there, friend.");

    let sent = fake.requests.lock().unwrap()[0].clone();
    assert_eq!(sent["messages"], json!([{"role": "user", "content": PING_MESSAGE}]));
    assert!(sent.get("tool_choice").is_none());
  }

  #[tokio::test]
  async fn ping_without_choices_fails() {
    let (_, grader) = grader_with(Reply::Body(json!({"choices": []})));
    assert!(matches!(grader.ping().await.unwrap_err(), Error::Protocol(ProtocolError::NoChoices)));
  }
}
