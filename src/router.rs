use std::net::TcpListener;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::config::RelayConfig;
use crate::email::WelcomeMailer;
use crate::error::RelayError;
use crate::leads::{self, LeadError, LeadOutcome};
use crate::models::{ChatExchangeRequest, ChatExchangeResponse, ErrorBody, SubscribeResponse, Subscription};
use crate::upstream;

pub struct RelayState {
  pub started_at: Instant,
  pub config: Arc<RelayConfig>,
  pub http: reqwest::Client,
  pub db: Arc<Mutex<rusqlite::Connection>>,
  pub mailer: Arc<dyn WelcomeMailer>,
}

pub fn build_router(state: RelayState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/api/claude", post(claude).fallback(method_not_allowed))
    .route("/api/subscribe", post(subscribe).fallback(method_not_allowed))
    .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    .with_state(Arc::new(state))
}

pub async fn run_router(listener: TcpListener, state: RelayState) -> anyhow::Result<()> {
  listener.set_nonblocking(true)?;
  let listener = tokio::net::TcpListener::from_std(listener)?;
  info!("chat relay listening on {}", listener.local_addr()?);
  axum::serve(listener, build_router(state)).await?;
  Ok(())
}

async fn health(State(state): State<Arc<RelayState>>) -> Json<serde_json::Value> {
  let uptime = state.started_at.elapsed().as_millis();
  Json(serde_json::json!({
    "status": "ok",
    "version": env!("CARGO_PKG_VERSION"),
    "uptime_ms": uptime
  }))
}

async fn method_not_allowed() -> RelayError {
  RelayError::MethodNotAllowed
}

async fn claude(State(state): State<Arc<RelayState>>, body: Bytes) -> Response {
  match relay_exchange(&state, &body).await {
    Ok(res) => {
      info!(chars = res.text.len(), "chat exchange relayed");
      (StatusCode::OK, Json(res)).into_response()
    }
    Err(err) => {
      error!("Error calling Claude API: {err}");
      err.into_response()
    }
  }
}

/// Credential first, then the body: an unconfigured relay rejects without reading input.
async fn relay_exchange(state: &RelayState, body: &[u8]) -> Result<ChatExchangeResponse, RelayError> {
  if state.config.upstream.api_key.is_none() {
    return Err(RelayError::NotConfigured);
  }

  let req: ChatExchangeRequest = serde_json::from_slice(body)
    .map_err(|err| RelayError::Internal(format!("Invalid request body: {err}")))?;

  upstream::send(&state.http, &state.config.upstream, &req).await
}

async fn subscribe(State(state): State<Arc<RelayState>>, body: Bytes) -> Response {
  let lead: Subscription = match serde_json::from_slice(&body) {
    Ok(lead) => lead,
    Err(err) => {
      warn!("rejected lead capture body: {err}");
      return error_response(StatusCode::BAD_REQUEST, &format!("Invalid request body: {err}"));
    }
  };

  match leads::insert_lead(&state.db, &lead).await {
    Ok(LeadOutcome::AlreadySubscribed) => {
      info!(email = %lead.email, "lead already captured");
      subscribe_response("Email already subscribed")
    }
    Ok(LeadOutcome::Inserted { id }) => {
      info!(%id, source = %lead.form_source, "lead captured");
      if let Err(err) = state.mailer.send_welcome(&lead).await {
        warn!(email = %lead.email, "welcome email failed, lead kept: {err}");
      }
      subscribe_response("Successfully subscribed")
    }
    Err(err @ LeadError::MissingEmail) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    Err(err @ LeadError::Storage(_)) => {
      error!("lead capture failed: {err}");
      error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
    }
  }
}

fn subscribe_response(message: &str) -> Response {
  let body = SubscribeResponse {
    success: true,
    message: message.to_string(),
  };
  (StatusCode::OK, Json(body)).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
  let body = Json(ErrorBody {
    error: message.to_string(),
  });
  (status, body).into_response()
}
