pub mod client;
pub mod config;
pub mod conversation;
pub mod email;
pub mod error;
pub mod leads;
pub mod logger;
pub mod models;
pub mod router;
pub mod upstream;

#[cfg(test)]
mod test_support;

pub use client::ChatService;
pub use config::{RelayConfig, UpstreamConfig};
pub use conversation::Conversation;
pub use error::{ClientError, RelayError};
pub use models::{ChatExchangeRequest, ChatExchangeResponse, ChatTurn, Role};
pub use router::{run_router, RelayState};
