use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::ErrorBody;

/// Faults raised at the relay boundary. Every variant renders as a JSON `{error}` body.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
  #[error("Claude API key not configured")]
  NotConfigured,

  #[error("Method not allowed")]
  MethodNotAllowed,

  #[error("Claude API request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("Claude API error: {status} {status_text} - {message}")]
  Upstream {
    status: u16,
    status_text: String,
    message: String,
  },

  #[error("{0}")]
  Internal(String),
}

impl RelayError {
  pub fn status(&self) -> StatusCode {
    match self {
      RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for RelayError {
  fn into_response(self) -> Response {
    let body = Json(ErrorBody {
      error: self.to_string(),
    });
    (self.status(), body).into_response()
  }
}

/// Faults seen by callers of [`crate::client::ChatService`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
  #[error("could not reach the chat relay: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("chat relay returned {status}: {}", .message.as_deref().unwrap_or("no error message"))]
  Relay { status: u16, message: Option<String> },

  #[error("chat relay response had no text field")]
  MalformedResponse,
}
