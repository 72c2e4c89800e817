use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use crate::email::WelcomeMailer;
use crate::models::Subscription;

pub async fn serve(app: Router) -> SocketAddr {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  addr
}

/// A stand-in for the Messages API that replays one canned response.
pub struct StubUpstream {
  pub status: StatusCode,
  pub body: String,
  pub hits: AtomicUsize,
  pub last_body: Mutex<Option<serde_json::Value>>,
  pub last_api_key: Mutex<Option<String>>,
}

impl StubUpstream {
  pub fn new(status: StatusCode, body: &str) -> Arc<Self> {
    Arc::new(Self {
      status,
      body: body.to_string(),
      hits: AtomicUsize::new(0),
      last_body: Mutex::new(None),
      last_api_key: Mutex::new(None),
    })
  }

  pub fn hits(&self) -> usize {
    self.hits.load(Ordering::SeqCst)
  }

  pub async fn start(self: &Arc<Self>) -> String {
    let app = Router::new()
      .route("/v1/messages", post(stub_messages))
      .with_state(self.clone());
    format!("http://{}", serve(app).await)
  }
}

async fn stub_messages(
  State(stub): State<Arc<StubUpstream>>,
  headers: HeaderMap,
  body: axum::body::Bytes,
) -> Response {
  stub.hits.fetch_add(1, Ordering::SeqCst);
  *stub.last_body.lock().unwrap() = serde_json::from_slice(&body).ok();
  *stub.last_api_key.lock().unwrap() = headers
    .get("x-api-key")
    .and_then(|v| v.to_str().ok())
    .map(str::to_string);
  (stub.status, stub.body.clone()).into_response()
}

pub struct RecordingMailer {
  pub sent: AtomicUsize,
  pub fail: bool,
}

impl RecordingMailer {
  pub fn new(fail: bool) -> Arc<Self> {
    Arc::new(Self {
      sent: AtomicUsize::new(0),
      fail,
    })
  }

  pub fn sent(&self) -> usize {
    self.sent.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl WelcomeMailer for RecordingMailer {
  async fn send_welcome(&self, _lead: &Subscription) -> anyhow::Result<()> {
    self.sent.fetch_add(1, Ordering::SeqCst);
    if self.fail {
      return Err(anyhow::anyhow!("network unreachable"));
    }
    Ok(())
  }
}

/// A stand-in for the Resend `/emails` endpoint.
pub struct StubMailbox {
  pub status: StatusCode,
  pub last_body: Mutex<Option<serde_json::Value>>,
  pub last_authorization: Mutex<Option<String>>,
}

impl StubMailbox {
  pub fn new(status: StatusCode) -> Arc<Self> {
    Arc::new(Self {
      status,
      last_body: Mutex::new(None),
      last_authorization: Mutex::new(None),
    })
  }

  pub async fn start(self: &Arc<Self>) -> String {
    let app = Router::new()
      .route("/emails", post(stub_emails))
      .with_state(self.clone());
    format!("http://{}", serve(app).await)
  }
}

async fn stub_emails(
  State(mailbox): State<Arc<StubMailbox>>,
  headers: HeaderMap,
  body: axum::body::Bytes,
) -> Response {
  *mailbox.last_body.lock().unwrap() = serde_json::from_slice(&body).ok();
  *mailbox.last_authorization.lock().unwrap() = headers
    .get("authorization")
    .and_then(|v| v.to_str().ok())
    .map(str::to_string);
  (mailbox.status, r#"{"id":"email-1"}"#).into_response()
}
