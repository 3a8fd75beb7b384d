//! Shared-password Basic-Auth gate. The username is ignored; only the password is checked.

use std::sync::Arc;

use axum::{
  extract::{Request, State},
  http::{
    header::{AUTHORIZATION, WWW_AUTHENTICATE},
    HeaderMap, StatusCode,
  },
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::util::constant_time_eq;

const REALM: &str = r#"Basic realm="leettomato-quiz""#;

pub async fn require_basic_auth(
  State(password): State<Arc<str>>,
  req: Request,
  next: Next,
) -> Response {
  let authorized = basic_password(req.headers())
    .map(|given| constant_time_eq(given.as_bytes(), password.as_bytes()))
    .unwrap_or(false);

  if !authorized {
    debug!(target: "quiz_grader", path = %req.uri().path(), "Rejected unauthenticated request");
    return (StatusCode::UNAUTHORIZED, [(WWW_AUTHENTICATE, REALM)], "Unauthorized").into_response();
  }
  next.run(req).await
}

/// Password half of an `Authorization: Basic` credential, if well-formed.
fn basic_password(headers: &HeaderMap) -> Option<String> {
  let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
  let (scheme, encoded) = value.split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("basic") {
    return None;
  }
  let decoded = STANDARD.decode(encoded.trim()).ok()?;
  let credentials = String::from_utf8(decoded).ok()?;
  let (_, password) = credentials.split_once(':')?;
  Some(password.to_string())
}
