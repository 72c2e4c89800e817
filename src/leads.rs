use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode};
use tokio::sync::Mutex;

use crate::models::Subscription;

#[derive(Debug, thiserror::Error)]
pub enum LeadError {
  #[error("Email is required.")]
  MissingEmail,

  #[error("lead store failure: {0}")]
  Storage(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadOutcome {
  Inserted { id: String },
  AlreadySubscribed,
}

pub fn init_db(path: &Path) -> anyhow::Result<Connection> {
  let conn = Connection::open(path)?;
  create_schema(&conn)?;
  Ok(conn)
}

pub fn create_schema(conn: &Connection) -> anyhow::Result<()> {
  conn.execute_batch(
    "
    CREATE TABLE IF NOT EXISTS contacts (
      id TEXT PRIMARY KEY,
      created_at TEXT NOT NULL,
      email TEXT NOT NULL UNIQUE COLLATE NOCASE,
      form_source TEXT NOT NULL,
      first_name TEXT,
      last_name TEXT,
      phone_number TEXT
    );
    ",
  )?;
  Ok(())
}

/// Insert-only. A second capture of the same email is reported, not treated as a failure.
pub async fn insert_lead(db: &Mutex<Connection>, lead: &Subscription) -> Result<LeadOutcome, LeadError> {
  let email = lead.email.trim();
  if email.is_empty() {
    return Err(LeadError::MissingEmail);
  }

  let id = uuid::Uuid::new_v4().to_string();
  let created_at = Utc::now().to_rfc3339();
  let conn = db.lock().await;
  let res = conn.execute(
    "INSERT INTO contacts (id, created_at, email, form_source, first_name, last_name, phone_number) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      id,
      created_at,
      email,
      lead.form_source,
      lead.first_name,
      lead.last_name,
      lead.phone_number
    ],
  );

  match res {
    Ok(_) => Ok(LeadOutcome::Inserted { id }),
    Err(rusqlite::Error::SqliteFailure(err, _)) if is_unique_violation(&err) => {
      Ok(LeadOutcome::AlreadySubscribed)
    }
    Err(err) => Err(err.into()),
  }
}

fn is_unique_violation(err: &rusqlite::ffi::Error) -> bool {
  err.code == ErrorCode::ConstraintViolation
    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
}

#[cfg(test)]
mod tests {
  use super::*;

  fn memory_db() -> Mutex<Connection> {
    let conn = Connection::open_in_memory().unwrap();
    create_schema(&conn).unwrap();
    Mutex::new(conn)
  }

  fn lead(email: &str) -> Subscription {
    Subscription {
      email: email.to_string(),
      form_source: "hero".to_string(),
      first_name: Some("Ada".to_string()),
      last_name: None,
      phone_number: None,
    }
  }

  #[tokio::test]
  async fn insert_then_duplicate() {
    let db = memory_db();

    let first = insert_lead(&db, &lead("ada@example.com")).await.unwrap();
    assert!(matches!(first, LeadOutcome::Inserted { .. }));

    let second = insert_lead(&db, &lead("ADA@example.com ")).await.unwrap();
    assert_eq!(second, LeadOutcome::AlreadySubscribed);

    let count: i64 = db
      .lock()
      .await
      .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))
      .unwrap();
    assert_eq!(count, 1);
  }

  #[tokio::test]
  async fn optional_fields_are_stored() {
    let db = memory_db();
    insert_lead(&db, &lead("grace@example.com")).await.unwrap();

    let (first, last): (Option<String>, Option<String>) = db
      .lock()
      .await
      .query_row(
        "SELECT first_name, last_name FROM contacts WHERE email = ?1",
        params!["grace@example.com"],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .unwrap();
    assert_eq!(first.as_deref(), Some("Ada"));
    assert_eq!(last, None);
  }

  #[tokio::test]
  async fn blank_email_is_rejected() {
    let db = memory_db();
    let err = insert_lead(&db, &lead("   ")).await.unwrap_err();
    assert!(matches!(err, LeadError::MissingEmail));
  }

  #[tokio::test]
  async fn missing_table_is_a_storage_error() {
    let db = Mutex::new(Connection::open_in_memory().unwrap());
    let err = insert_lead(&db, &lead("ada@example.com")).await.unwrap_err();
    assert!(matches!(err, LeadError::Storage(_)));
  }

  #[test]
  fn init_db_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leads.sqlite3");
    init_db(&path).unwrap();
    assert!(path.exists());
  }
}
