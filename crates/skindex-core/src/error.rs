//! Error types for `skindex-core`.

use thiserror::Error;

use crate::{auth::AuthError, publish::PublishStep};

#[derive(Debug, Error)]
pub enum Error {
  /// A required local input was missing; raised before any remote call.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// A remote read or write failed. The backend's message is kept verbatim.
  #[error("{0}")]
  Query(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Auth(#[from] AuthError),

  /// A response arrived after a newer request was issued and was dropped.
  #[error("stale response discarded")]
  Stale,

  #[error("profile not found: {0}")]
  ProfileNotFound(String),

  #[error("profile {0} is not public")]
  ProfileNotPublic(String),

  #[error("publish failed while {step}: {source}")]
  Publish {
    step:   PublishStep,
    #[source]
    source: Box<Error>,
  },
}

impl Error {
  pub fn invalid(msg: impl Into<String>) -> Self {
    Self::InvalidArgument(msg.into())
  }

  /// Wrap a backend error as [`Error::Query`].
  pub fn query<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Query(Box::new(err))
  }

  /// `true` for superseded responses, which front-ends drop silently.
  pub fn is_stale(&self) -> bool { matches!(self, Self::Stale) }

  /// `true` when a publish failed after the public snapshot was already
  /// cleared, leaving it empty.
  pub fn snapshot_cleared(&self) -> bool {
    matches!(
      self,
      Self::Publish { step: PublishStep::InsertSnapshot, .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
