//! Error type for `skindex-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] skindex_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A catalog row to import had no id.
  #[error("skin row {0} has no id")]
  MissingId(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
