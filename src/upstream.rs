use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::RelayError;
use crate::models::{ChatExchangeRequest, ChatExchangeResponse, ChatTurn};

const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const BLOCK_SEPARATOR: &str = "\n\n";

#[derive(Serialize, Debug)]
pub struct MessagesRequest<'a> {
  pub model: &'a str,
  pub max_tokens: u32,
  pub messages: Vec<ChatTurn>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub system: Option<&'a str>,
}

pub fn compose_messages(history: &[ChatTurn], user_message: &str) -> Vec<ChatTurn> {
  let mut messages = Vec::with_capacity(history.len() + 1);
  messages.extend_from_slice(history);
  messages.push(ChatTurn::user(user_message));
  messages
}

pub fn build_request<'a>(config: &'a UpstreamConfig, req: &'a ChatExchangeRequest) -> MessagesRequest<'a> {
  let history = req.conversation_history.as_deref().unwrap_or(&[]);
  MessagesRequest {
    model: &config.model,
    max_tokens: config.max_tokens,
    messages: compose_messages(history, &req.user_message),
    system: req.system_prompt.as_deref().filter(|s| !s.trim().is_empty()),
  }
}

/// Join the text of every `{"type":"text","text":...}` block. Anything that is not an
/// array of blocks flattens to an empty string.
pub fn flatten_content(content: &Value) -> String {
  let Some(blocks) = content.as_array() else {
    return String::new();
  };

  blocks
    .iter()
    .filter(|block| block["type"].as_str() == Some("text"))
    .filter_map(|block| block["text"].as_str())
    .filter(|text| !text.is_empty())
    .collect::<Vec<_>>()
    .join(BLOCK_SEPARATOR)
}

/// Pull `error.message` out of an upstream error body.
pub fn decode_error_message(body: &[u8]) -> Option<String> {
  let value = match serde_json::from_slice::<Value>(body) {
    Ok(value) => value,
    // Error pages from proxies are often HTML or empty; treat them as carrying no message.
    Err(_) => Value::Null,
  };

  value["error"]["message"]
    .as_str()
    .filter(|m| !m.is_empty())
    .map(str::to_string)
}

fn messages_url(base_url: &str) -> String {
  format!("{}{MESSAGES_PATH}", base_url.trim_end_matches('/'))
}

pub async fn send(
  client: &reqwest::Client,
  config: &UpstreamConfig,
  req: &ChatExchangeRequest,
) -> Result<ChatExchangeResponse, RelayError> {
  let key = config.api_key.as_deref().ok_or(RelayError::NotConfigured)?;
  let payload = build_request(config, req);
  debug!(
    model = payload.model,
    turns = payload.messages.len(),
    "forwarding chat exchange upstream"
  );

  let resp = client
    .post(messages_url(&config.base_url))
    .header("x-api-key", key)
    .header("anthropic-version", ANTHROPIC_VERSION)
    .json(&payload)
    .send()
    .await?;

  let status = resp.status();
  if !status.is_success() {
    let body = resp.bytes().await.unwrap_or_default();
    return Err(RelayError::Upstream {
      status: status.as_u16(),
      status_text: status.canonical_reason().unwrap_or("").to_string(),
      message: decode_error_message(&body).unwrap_or_else(|| "Unknown error".to_string()),
    });
  }

  let body = resp.bytes().await?;
  let value = match serde_json::from_slice::<Value>(&body) {
    Ok(value) => value,
    Err(err) => {
      warn!("upstream returned {status} with a non-JSON body: {err}");
      Value::Null
    }
  };

  Ok(ChatExchangeResponse {
    text: flatten_content(&value["content"]),
    usage: value.get("usage").filter(|u| !u.is_null()).cloned(),
  })
}
