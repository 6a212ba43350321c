//! Per-user ownership: the owned-id set, the remote store for it, and the
//! statistics aggregator.

use std::{collections::BTreeSet, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
  catalog::CatalogItem,
  rarity::RarityOrder,
  store::Backend,
  Error, Result,
};

// ─── OwnershipSet ────────────────────────────────────────────────────────────

/// Ids of the catalog items one user has marked as owned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipSet(BTreeSet<String>);

impl OwnershipSet {
  pub fn new() -> Self { Self::default() }

  pub fn contains(&self, id: &str) -> bool { self.0.contains(id) }

  /// Mirror a committed `set_owned` call.
  pub fn apply(&mut self, id: &str, owned: bool) {
    if owned {
      self.0.insert(id.to_owned());
    } else {
      self.0.remove(id);
    }
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &str> { self.0.iter().map(String::as_str) }

  pub fn to_vec(&self) -> Vec<String> { self.0.iter().cloned().collect() }
}

impl<S: Into<String>> FromIterator<S> for OwnershipSet {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self(iter.into_iter().map(Into::into).collect())
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Stateless access to the `user_skins` table. Every call goes to the
/// backend; keeping a local mirror is the caller's job.
#[derive(Clone)]
pub struct OwnershipStore<B> {
  backend: Arc<B>,
}

impl<B: Backend> OwnershipStore<B> {
  pub fn new(backend: Arc<B>) -> Self { Self { backend } }

  /// Load every owned id for `user_id`. No user means an empty set, not an
  /// error.
  pub async fn load_owned(&self, user_id: Option<&str>) -> Result<OwnershipSet> {
    let Some(user_id) = user_id.filter(|u| !u.trim().is_empty()) else {
      return Ok(OwnershipSet::new());
    };

    let ids = self
      .backend
      .owned_skin_ids(user_id)
      .await
      .map_err(Error::query)?;

    Ok(ids.into_iter().filter(|id| !id.is_empty()).collect())
  }

  /// Persist `owned` for `(user_id, item_id)` and return the committed value.
  pub async fn set_owned(&self, user_id: &str, item_id: &str, owned: bool) -> Result<bool> {
    if user_id.trim().is_empty() {
      return Err(Error::invalid("not signed in"));
    }
    if item_id.trim().is_empty() {
      return Err(Error::invalid("missing item id"));
    }

    let committed = if owned {
      self.backend.upsert_owned(user_id, item_id).await
    } else {
      self.backend.delete_owned(user_id, item_id).await
    };
    committed.map_err(Error::query)?;

    tracing::debug!(user_id, item_id, owned, "ownership updated");
    Ok(owned)
  }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipStats {
  pub total:           usize,
  pub owned:           usize,
  /// `round(owned / total * 100)`, 0 for an empty catalog.
  pub percent_owned:   u32,
  /// One entry per rarity of the ordering, in order.
  pub owned_by_rarity: Vec<(String, usize)>,
}

impl OwnershipStats {
  pub fn owned_of(&self, rarity: &str) -> Option<usize> {
    self
      .owned_by_rarity
      .iter()
      .find(|(r, _)| r == rarity)
      .map(|(_, n)| *n)
  }
}

/// Integer `round(part / whole * 100)`, half away from zero.
pub fn percent(part: usize, whole: usize) -> u32 {
  if whole == 0 {
    return 0;
  }
  ((part * 200 + whole) / (whole * 2)) as u32
}

pub fn compute_stats(
  owned: &OwnershipSet,
  catalog: &[CatalogItem],
  order: &RarityOrder,
) -> OwnershipStats {
  let total = catalog.len();
  let owned_count = owned.len();

  let mut owned_by_rarity: Vec<(String, usize)> =
    order.iter().map(|r| (r.to_owned(), 0)).collect();

  for item in catalog.iter().filter(|i| owned.contains(&i.id)) {
    if let Some(slot) = order.position(&item.rarity) {
      owned_by_rarity[slot].1 += 1;
    }
  }

  OwnershipStats {
    total,
    owned: owned_count,
    percent_owned: percent(owned_count, total),
    owned_by_rarity,
  }
}
