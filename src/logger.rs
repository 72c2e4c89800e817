use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
pub fn init(level: &str, log_path: Option<&Path>) -> anyhow::Result<()> {
  let filter = match EnvFilter::try_from_default_env() {
    Ok(filter) => filter,
    Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level {level:?}"))?,
  };
  let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

  let installed = match log_path {
    Some(path) => builder
      .with_ansi(false)
      .with_writer(append_writer(path)?)
      .try_init(),
    None => builder.with_writer(std::io::stderr).try_init(),
  };
  installed.map_err(|err| anyhow::anyhow!("installing log subscriber: {err}"))
}

pub fn append_writer(path: &Path) -> anyhow::Result<Mutex<File>> {
  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("opening log file {}", path.display()))?;
  Ok(Mutex::new(file))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_writer_appends_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.log");
    std::fs::write(&path, "earlier line\n").unwrap();

    let subscriber = tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::new("info"))
      .with_ansi(false)
      .with_writer(append_writer(&path).unwrap())
      .finish();
    tracing::subscriber::with_default(subscriber, || {
      tracing::info!("relay starting up");
    });

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("earlier line\n"));
    assert!(contents.contains("relay starting up"));
  }
}
