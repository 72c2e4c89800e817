use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{info, warn};

use chatrelay::config::{load_or_init, API_KEY_ENV};
use chatrelay::email::mailer_from_config;
use chatrelay::leads::init_db;
use chatrelay::{logger, run_router, ChatService, Conversation, RelayState};

const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI business consultant specializing in custom AI & SaaS tools. \
When a user describes their business, give exactly 3 specific, actionable ways they can use AI to cut costs, \
save time, and open new revenue. Keep each suggestion concise and format the answer as a numbered list.";

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[arg(long, global = true, default_value = "info")]
  log_level: String,

  #[arg(long, global = true)]
  log_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Serve the chat relay and lead capture endpoints.
  Serve {
    #[arg(short, long, default_value = "chatrelay.json")]
    config: PathBuf,

    #[arg(long)]
    bind: Option<String>,
  },

  /// Chat with a running relay from the terminal.
  Chat {
    #[arg(long, env = "CHATRELAY_URL", default_value = "http://127.0.0.1:3001/api/claude")]
    relay_url: String,

    #[arg(long)]
    system: Option<String>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  logger::init(&cli.log_level, cli.log_file.as_deref())?;

  match cli.command {
    Commands::Serve { config, bind } => serve(&config, bind).await,
    Commands::Chat { relay_url, system } => chat(relay_url, system).await,
  }
}

async fn serve(config_path: &Path, bind: Option<String>) -> anyhow::Result<()> {
  let mut config = load_or_init(config_path)?.apply_env();
  if let Some(bind) = bind {
    config.bind_addr = bind;
  }
  if config.upstream.api_key.is_none() {
    warn!("{API_KEY_ENV} is not set; /api/claude will answer every request with a configuration error");
  }

  let db = init_db(Path::new(&config.db_path))
    .with_context(|| format!("opening lead store {}", config.db_path))?;
  let http = reqwest::Client::new();
  let mailer = mailer_from_config(http.clone(), &config.email);

  let listener = std::net::TcpListener::bind(&config.bind_addr)
    .with_context(|| format!("binding {}", config.bind_addr))?;
  info!(model = %config.upstream.model, "chat relay starting up");

  let state = RelayState {
    started_at: Instant::now(),
    config: Arc::new(config),
    http,
    db: Arc::new(Mutex::new(db)),
    mailer,
  };
  run_router(listener, state).await
}

async fn chat(relay_url: String, system: Option<String>) -> anyhow::Result<()> {
  let service = ChatService::new(relay_url);
  let system = system.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
  let mut convo = Conversation::new();
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  println!("Chatting via {} (/quit to leave)", service.endpoint());
  loop {
    print!("> ");
    std::io::stdout().flush()?;

    let Some(line) = lines.next_line().await? else {
      break;
    };
    let message = line.trim();
    if message.is_empty() {
      continue;
    }
    if message == "/quit" {
      break;
    }

    let history = convo.history();
    let result = service.chat(message, &history, Some(&system)).await;
    if let Err(err) = &result {
      warn!("chat exchange failed: {err}");
    }
    convo.push_user(message);
    println!("{}\n", convo.record_exchange_result(result));
  }
  Ok(())
}
