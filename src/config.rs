use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const EMAIL_KEY_ENV: &str = "RESEND_API_KEY";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RelayConfig {
  pub bind_addr: String,
  pub db_path: String,
  pub upstream: UpstreamConfig,
  pub email: EmailConfig,
}

/// Everything needed to call the Messages API. `api_key` is never written to disk.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UpstreamConfig {
  pub base_url: String,
  pub model: String,
  pub max_tokens: u32,
  #[serde(skip)]
  pub api_key: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EmailConfig {
  pub api_base: String,
  pub from: String,
  pub subject: String,
  #[serde(skip)]
  pub api_key: Option<String>,
}

impl Default for RelayConfig {
  fn default() -> Self {
    Self {
      bind_addr: "127.0.0.1:3001".to_string(),
      db_path: "chatrelay.sqlite3".to_string(),
      upstream: UpstreamConfig::default(),
      email: EmailConfig::default(),
    }
  }
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.anthropic.com".to_string(),
      model: "claude-3-haiku-20240307".to_string(),
      max_tokens: 1000,
      api_key: None,
    }
  }
}

impl Default for EmailConfig {
  fn default() -> Self {
    Self {
      api_base: "https://api.resend.com".to_string(),
      from: "hello@example.com".to_string(),
      subject: "Welcome aboard".to_string(),
      api_key: None,
    }
  }
}

impl RelayConfig {
  /// Pull credentials from the process environment. Blank values count as unset.
  pub fn apply_env(mut self) -> Self {
    self.upstream.api_key = non_blank_env(API_KEY_ENV);
    self.email.api_key = non_blank_env(EMAIL_KEY_ENV);
    self
  }
}

fn non_blank_env(name: &str) -> Option<String> {
  std::env::var(name)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

pub fn load_or_init(path: &Path) -> anyhow::Result<RelayConfig> {
  if path.exists() {
    let data = std::fs::read_to_string(path)
      .with_context(|| format!("reading config {}", path.display()))?;
    let config: RelayConfig = serde_json::from_str(&data)
      .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
  } else {
    let config = RelayConfig::default();
    save_config(path, &config)?;
    Ok(config)
  }
}

pub fn save_config(path: &Path, config: &RelayConfig) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(config)?;
  std::fs::write(path, json)?;
  Ok(())
}
