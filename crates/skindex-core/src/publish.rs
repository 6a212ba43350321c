//! Publishing a user's ownership set as a public snapshot.
//!
//! The snapshot is replaced in two steps (delete everything, then insert the
//! current set). This is not atomic: if the insert fails the snapshot stays
//! empty, and the returned error says so.

use std::{fmt, sync::Arc};

use serde::Serialize;

use crate::{
  ownership::OwnershipSet,
  profile::PublicProfile,
  store::Backend,
  Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStep {
  SaveProfile,
  ClearSnapshot,
  InsertSnapshot,
}

impl fmt::Display for PublishStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::SaveProfile => "saving the profile",
      Self::ClearSnapshot => "clearing the public list",
      Self::InsertSnapshot => "writing the public list (it is now empty)",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishReport {
  /// Number of ids written; 0 means the public list was emptied.
  pub published: usize,
}

pub struct Publisher<B> {
  backend: Arc<B>,
}

impl<B: Backend> Publisher<B> {
  pub fn new(backend: Arc<B>) -> Self { Self { backend } }

  pub async fn publish(
    &self,
    user_id: &str,
    profile: &PublicProfile,
    owned: &OwnershipSet,
  ) -> Result<PublishReport> {
    if user_id.trim().is_empty() {
      return Err(Error::invalid("not signed in"));
    }

    let fail = |step: PublishStep| {
      move |e: B::Error| Error::Publish { step, source: Box::new(Error::query(e)) }
    };

    self
      .backend
      .upsert_profile(profile)
      .await
      .map_err(fail(PublishStep::SaveProfile))?;

    self
      .backend
      .clear_public_skins(user_id)
      .await
      .map_err(fail(PublishStep::ClearSnapshot))?;

    if owned.is_empty() {
      tracing::info!(user_id, "public list cleared");
      return Ok(PublishReport { published: 0 });
    }

    let ids = owned.to_vec();
    if let Err(e) = self.backend.upsert_public_skins(user_id, &ids).await {
      tracing::warn!(user_id, error = %e, "snapshot insert failed after clear");
      return Err(fail(PublishStep::InsertSnapshot)(e));
    }

    tracing::info!(user_id, count = ids.len(), "public list published");
    Ok(PublishReport { published: ids.len() })
  }
}
