use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use tracing::info;

use crate::config::EmailConfig;
use crate::models::Subscription;

/// Sends the welcome email that follows a fresh lead capture.
#[async_trait]
pub trait WelcomeMailer: Send + Sync {
  async fn send_welcome(&self, lead: &Subscription) -> anyhow::Result<()>;
}

/// Used when no email credential is configured: the send is only logged.
pub struct LogOnlyMailer;

#[async_trait]
impl WelcomeMailer for LogOnlyMailer {
  async fn send_welcome(&self, lead: &Subscription) -> anyhow::Result<()> {
    info!(email = %lead.email, "email not configured, skipping welcome email");
    Ok(())
  }
}

pub struct ResendMailer {
  client: reqwest::Client,
  config: EmailConfig,
  api_key: String,
}

impl ResendMailer {
  pub fn new(client: reqwest::Client, config: EmailConfig, api_key: String) -> Self {
    Self {
      client,
      config,
      api_key,
    }
  }
}

#[derive(serde::Serialize)]
struct ResendEmail<'a> {
  from: &'a str,
  to: [&'a str; 1],
  subject: &'a str,
  html: String,
}

fn welcome_html(lead: &Subscription) -> String {
  let name = [lead.first_name.as_deref(), lead.last_name.as_deref()]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ");
  let greeting = if name.is_empty() {
    "Hi there".to_string()
  } else {
    format!("Hi {}", escape_html(&name))
  };
  format!("<p>{greeting},</p><p>Thanks for getting in touch. We'll be in contact shortly.</p>")
}

/// Form input ends up in mail sent from our own address; never let it carry markup.
fn escape_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for c in raw.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

#[async_trait]
impl WelcomeMailer for ResendMailer {
  async fn send_welcome(&self, lead: &Subscription) -> anyhow::Result<()> {
    let payload = ResendEmail {
      from: &self.config.from,
      to: [lead.email.trim()],
      subject: &self.config.subject,
      html: welcome_html(lead),
    };

    let resp = self
      .client
      .post(format!("{}/emails", self.config.api_base.trim_end_matches('/')))
      .header(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", self.api_key))?)
      .json(&payload)
      .send()
      .await?;

    if !resp.status().is_success() {
      let status = resp.status();
      let text = resp.text().await.unwrap_or_default();
      return Err(anyhow::anyhow!("Resend error ({status}): {text}"));
    }
    Ok(())
  }
}

pub fn mailer_from_config(client: reqwest::Client, config: &EmailConfig) -> Arc<dyn WelcomeMailer> {
  match config.api_key.clone() {
    Some(key) => Arc::new(ResendMailer::new(client, config.clone(), key)),
    None => Arc::new(LogOnlyMailer),
  }
}
