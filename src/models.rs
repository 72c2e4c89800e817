use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

/// One message in a conversation, tagged with its speaker.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
  pub role: Role,
  pub content: String,
}

impl ChatTurn {
  pub fn user(content: impl Into<String>) -> Self {
    Self {
      role: Role::User,
      content: content.into(),
    }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self {
      role: Role::Assistant,
      content: content.into(),
    }
  }
}

/// Body accepted by `POST /api/claude`.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatExchangeRequest {
  pub user_message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub conversation_history: Option<Vec<ChatTurn>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub system_prompt: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatExchangeResponse {
  pub text: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub usage: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
  pub error: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Subscription {
  pub email: String,
  pub form_source: String,
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub last_name: Option<String>,
  #[serde(default)]
  pub phone_number: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SubscribeResponse {
  pub success: bool,
  pub message: String,
}
