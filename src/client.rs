use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;
use crate::models::{ChatExchangeRequest, ChatTurn};

/// Caller-side handle for the relay endpoint. Holds no conversation state.
#[derive(Clone)]
pub struct ChatService {
  http: reqwest::Client,
  endpoint: String,
}

impl ChatService {
  pub fn new(endpoint: impl Into<String>) -> Self {
    Self::with_client(reqwest::Client::new(), endpoint)
  }

  pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
    Self {
      http,
      endpoint: endpoint.into(),
    }
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }

  /// One exchange: send `message` after `history` and return the flattened reply.
  pub async fn chat(
    &self,
    message: &str,
    history: &[ChatTurn],
    system: Option<&str>,
  ) -> Result<String, ClientError> {
    let req = ChatExchangeRequest {
      user_message: message.to_string(),
      conversation_history: Some(history.to_vec()),
      system_prompt: system.map(str::to_string),
    };
    debug!(endpoint = %self.endpoint, turns = history.len(), "sending chat exchange");

    let resp = self.http.post(&self.endpoint).json(&req).send().await?;
    let status = resp.status();
    let body = resp.bytes().await?;
    let value = serde_json::from_slice::<Value>(&body).ok();

    if !status.is_success() {
      let message = value
        .as_ref()
        .and_then(|v| v["error"].as_str())
        .map(str::to_string);
      return Err(ClientError::Relay {
        status: status.as_u16(),
        message,
      });
    }

    value
      .as_ref()
      .and_then(|v| v["text"].as_str())
      .map(str::to_string)
      .ok_or(ClientError::MalformedResponse)
  }
}
