use crate::error::ClientError;
use crate::models::ChatTurn;

pub const FALLBACK_APOLOGY: &str = "I'm sorry, I encountered an error. Please try again.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
  pub turn: ChatTurn,
  /// Set on assistant entries that stand in for a failed exchange.
  pub is_error_placeholder: bool,
}

/// In-memory transcript for one chat session. Nothing here outlives the process.
#[derive(Default, Debug)]
pub struct Conversation {
  entries: Vec<TranscriptEntry>,
}

impl Conversation {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn entries(&self) -> &[TranscriptEntry] {
    &self.entries
  }

  pub fn push_user(&mut self, content: impl Into<String>) {
    self.entries.push(TranscriptEntry {
      turn: ChatTurn::user(content),
      is_error_placeholder: false,
    });
  }

  /// Turns to send with the next exchange. Error placeholders are never fed back.
  pub fn history(&self) -> Vec<ChatTurn> {
    self
      .entries
      .iter()
      .filter(|e| !e.is_error_placeholder)
      .map(|e| e.turn.clone())
      .collect()
  }

  /// Append the outcome of an exchange and return the text to show for it.
  pub fn record_exchange_result(&mut self, result: Result<String, ClientError>) -> &str {
    let entry = match result {
      Ok(text) => TranscriptEntry {
        turn: ChatTurn::assistant(text),
        is_error_placeholder: false,
      },
      Err(err) => TranscriptEntry {
        turn: ChatTurn::assistant(error_text(&err)),
        is_error_placeholder: true,
      },
    };
    self.entries.push(entry);
    let last = self.entries.len() - 1;
    &self.entries[last].turn.content
  }
}

fn error_text(err: &ClientError) -> String {
  match err {
    ClientError::Relay {
      message: Some(message),
      ..
    } if !message.trim().is_empty() => message.clone(),
    ClientError::Relay { .. } | ClientError::MalformedResponse | ClientError::Transport(_) => {
      FALLBACK_APOLOGY.to_string()
    }
  }
}
