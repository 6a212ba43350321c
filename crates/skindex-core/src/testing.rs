//! In-memory [`Backend`] used by the unit tests of this crate.
//!
//! Supports one-shot fault injection per method, call counting, and scripted
//! replies for `owned_skin_ids` so tests can control when (and in which
//! order) concurrent reads resolve.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{
  catalog::SkinRow,
  profile::PublicProfile,
  store::{Backend, ProfileQuery},
};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MemoryError(pub String);

#[derive(Default)]
struct State {
  skins:    Vec<SkinRow>,
  owned:    BTreeSet<(String, String)>,
  public:   BTreeSet<(String, String)>,
  profiles: HashMap<String, PublicProfile>,
  failing:  HashSet<&'static str>,
  calls:    HashMap<&'static str, usize>,
  scripted: VecDeque<oneshot::Receiver<Vec<String>>>,
  held:     HashMap<&'static str, VecDeque<oneshot::Receiver<()>>>,
}

pub struct MemoryBackend {
  pub images_resolvable: bool,
  state:                 Mutex<State>,
}

impl Default for MemoryBackend {
  fn default() -> Self {
    Self { images_resolvable: true, state: Mutex::new(State::default()) }
  }
}

impl MemoryBackend {
  pub fn with_skins(skins: Vec<SkinRow>) -> Self {
    let backend = Self::default();
    backend.state.lock().skins = skins;
    backend
  }

  /// A backend whose storage resolves no image paths.
  pub fn with_unresolvable_images() -> Self {
    Self { images_resolvable: false, ..Self::default() }
  }

  pub fn push_skin(&self, row: SkinRow) { self.state.lock().skins.push(row); }

  /// Make the next call to `method` fail.
  pub fn fail_next(&self, method: &'static str) {
    self.state.lock().failing.insert(method);
  }

  pub fn calls(&self, method: &'static str) -> usize {
    self.state.lock().calls.get(method).copied().unwrap_or(0)
  }

  /// Queue a reply for the next `owned_skin_ids` call; the call resolves
  /// only once the returned sender is used.
  pub fn script_owned_reply(&self) -> oneshot::Sender<Vec<String>> {
    let (tx, rx) = oneshot::channel();
    self.state.lock().scripted.push_back(rx);
    tx
  }

  /// Hold the next call to `method` until the returned sender fires (or is
  /// dropped). The call is counted before it waits.
  pub fn hold(&self, method: &'static str) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel();
    self.state.lock().held.entry(method).or_default().push_back(rx);
    tx
  }

  pub fn public_rows(&self, user_id: &str) -> Vec<String> {
    self
      .state
      .lock()
      .public
      .iter()
      .filter(|(u, _)| u == user_id)
      .map(|(_, s)| s.clone())
      .collect()
  }

  pub fn insert_public(&self, user_id: &str, skin_id: &str) {
    self
      .state
      .lock()
      .public
      .insert((user_id.to_owned(), skin_id.to_owned()));
  }

  pub fn insert_profile(&self, profile: PublicProfile) {
    self
      .state
      .lock()
      .profiles
      .insert(profile.user_id.clone(), profile);
  }

  async fn enter(&self, method: &'static str) -> Result<(), MemoryError> {
    let held = {
      let mut state = self.state.lock();
      *state.calls.entry(method).or_default() += 1;
      state.held.get_mut(method).and_then(VecDeque::pop_front)
    };
    if let Some(rx) = held {
      let _ = rx.await;
    }
    if self.state.lock().failing.remove(method) {
      return Err(MemoryError(format!("{method} failed")));
    }
    Ok(())
  }
}

fn ids_for(rows: &BTreeSet<(String, String)>, user_id: &str) -> Vec<String> {
  rows
    .iter()
    .filter(|(u, _)| u == user_id)
    .map(|(_, s)| s.clone())
    .collect()
}

impl Backend for MemoryBackend {
  type Error = MemoryError;

  async fn list_skins(&self) -> Result<Vec<SkinRow>, MemoryError> {
    self.enter("list_skins").await?;
    Ok(self.state.lock().skins.clone())
  }

  fn public_image_url(&self, path: &str) -> Option<String> {
    self.images_resolvable.then(|| format!("mem://skins/{path}"))
  }

  async fn owned_skin_ids(&self, user_id: &str) -> Result<Vec<String>, MemoryError> {
    self.enter("owned_skin_ids").await?;
    let scripted = { self.state.lock().scripted.pop_front() };
    if let Some(rx) = scripted {
      return rx.await.map_err(|_| MemoryError("reply dropped".into()));
    }
    Ok(ids_for(&self.state.lock().owned, user_id))
  }

  async fn upsert_owned(&self, user_id: &str, skin_id: &str) -> Result<(), MemoryError> {
    self.enter("upsert_owned").await?;
    self
      .state
      .lock()
      .owned
      .insert((user_id.to_owned(), skin_id.to_owned()));
    Ok(())
  }

  async fn delete_owned(&self, user_id: &str, skin_id: &str) -> Result<(), MemoryError> {
    self.enter("delete_owned").await?;
    self
      .state
      .lock()
      .owned
      .remove(&(user_id.to_owned(), skin_id.to_owned()));
    Ok(())
  }

  async fn get_profile(&self, user_id: &str) -> Result<Option<PublicProfile>, MemoryError> {
    self.enter("get_profile").await?;
    Ok(self.state.lock().profiles.get(user_id).cloned())
  }

  async fn upsert_profile(&self, profile: &PublicProfile) -> Result<(), MemoryError> {
    self.enter("upsert_profile").await?;
    self.insert_profile(profile.clone());
    Ok(())
  }

  async fn search_profiles(
    &self,
    query: &ProfileQuery,
  ) -> Result<Vec<PublicProfile>, MemoryError> {
    self.enter("search_profiles").await?;
    let needle = query.name.to_lowercase();
    let mut hits: Vec<PublicProfile> = self
      .state
      .lock()
      .profiles
      .values()
      .filter(|p| p.is_public)
      .filter(|p| {
        p.display_name
          .as_deref()
          .is_some_and(|n| n.to_lowercase().contains(&needle))
      })
      .cloned()
      .collect();
    hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    hits.truncate(query.limit);
    Ok(hits)
  }

  async fn public_skin_ids(&self, user_id: &str) -> Result<Vec<String>, MemoryError> {
    self.enter("public_skin_ids").await?;
    Ok(ids_for(&self.state.lock().public, user_id))
  }

  async fn clear_public_skins(&self, user_id: &str) -> Result<(), MemoryError> {
    self.enter("clear_public_skins").await?;
    self.state.lock().public.retain(|(u, _)| u != user_id);
    Ok(())
  }

  async fn upsert_public_skins(
    &self,
    user_id: &str,
    skin_ids: &[String],
  ) -> Result<(), MemoryError> {
    self.enter("upsert_public_skins").await?;
    let mut state = self.state.lock();
    for id in skin_ids {
      state.public.insert((user_id.to_owned(), id.clone()));
    }
    Ok(())
  }
}
