//! Public profiles: the stored record, the editable draft, and read-only
//! viewing/search of other users' published collections.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
  auth::User,
  catalog::Catalog,
  guard::RequestGuard,
  ownership::percent,
  store::{Backend, ProfileQuery},
  Error, Result,
};

/// Query parameter carrying the user id of the profile to show.
pub const USER_PARAM: &str = "u";

// ─── Record ──────────────────────────────────────────────────────────────────

/// A row of `public_profiles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
  pub user_id:      String,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub bio:          Option<String>,
  #[serde(default)]
  pub is_public:    bool,
  #[serde(default)]
  pub show_owned:   bool,
  #[serde(default)]
  pub updated_at:   Option<DateTime<Utc>>,
}

impl PublicProfile {
  pub fn display_name_or_default(&self) -> &str {
    self
      .display_name
      .as_deref()
      .filter(|n| !n.trim().is_empty())
      .unwrap_or(ProfileDraft::FALLBACK_NAME)
  }

  pub fn visibility(&self) -> Visibility {
    match (self.is_public, self.show_owned) {
      (false, _) => Visibility::Private,
      (true, false) => Visibility::PublicHidden,
      (true, true) => Visibility::PublicVisible,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
  Private,
  /// Public profile, owned list hidden.
  PublicHidden,
  PublicVisible,
}

impl Visibility {
  pub fn describe(self) -> &'static str {
    match self {
      Self::Private => "Profile is not public.",
      Self::PublicHidden => "Public profile, owned list hidden.",
      Self::PublicVisible => "Public profile with visible owned list.",
    }
  }
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// The user-editable part of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
  pub display_name: String,
  pub bio:          String,
  pub is_public:    bool,
  pub show_owned:   bool,
}

impl ProfileDraft {
  pub const FALLBACK_NAME: &'static str = "Profile";

  /// Draft pre-filled from the stored profile, or the defaults for a user
  /// who has none yet.
  pub fn for_user(user: &User, existing: Option<&PublicProfile>) -> Self {
    match existing {
      Some(p) => Self {
        display_name: p.display_name.clone().unwrap_or_default(),
        bio:          p.bio.clone().unwrap_or_default(),
        is_public:    p.is_public,
        show_owned:   p.show_owned,
      },
      None => Self {
        display_name: user.default_display_name(),
        bio:          String::new(),
        is_public:    true,
        show_owned:   true,
      },
    }
  }

  /// Build the record to upsert: trimmed text, a fallback display name, and
  /// a fresh `updated_at`.
  pub fn into_profile(self, user_id: &str, now: DateTime<Utc>) -> PublicProfile {
    let name = self.display_name.trim();
    PublicProfile {
      user_id:      user_id.to_owned(),
      display_name: Some(if name.is_empty() { Self::FALLBACK_NAME } else { name }.to_owned()),
      bio:          Some(self.bio.trim().to_owned()),
      is_public:    self.is_public,
      show_owned:   self.show_owned,
      updated_at:   Some(now),
    }
  }
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// `page` with the `u` parameter set to `user_id` (other parameters kept).
pub fn share_url(page: &str, user_id: &str) -> Result<String> {
  let mut url = Url::parse(page).map_err(|e| Error::invalid(format!("bad page url: {e}")))?;
  let kept: Vec<(String, String)> = url
    .query_pairs()
    .filter(|(k, _)| k != USER_PARAM)
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect();
  url
    .query_pairs_mut()
    .clear()
    .extend_pairs(kept)
    .append_pair(USER_PARAM, user_id);
  Ok(url.into())
}

/// Pick whose profile to show: the explicit parameter, else the signed-in
/// viewer, else ask for one.
pub fn resolve_target(param: Option<&str>, viewer: Option<&User>) -> Result<String> {
  if let Some(id) = param.map(str::trim).filter(|p| !p.is_empty()) {
    return Ok(id.to_owned());
  }
  viewer
    .map(|u| u.id.clone())
    .ok_or_else(|| Error::invalid("no user id given; pass one or sign in"))
}

// ─── Viewer ──────────────────────────────────────────────────────────────────

/// A loaded public profile with its snapshot summary.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfileView {
  pub profile:       PublicProfile,
  /// Snapshot ids; empty when the owner hides the list.
  pub owned_ids:     Vec<String>,
  pub total:         usize,
  pub percent_owned: u32,
}

impl PublicProfileView {
  pub fn owned(&self) -> usize { self.owned_ids.len() }
}

/// Read-only access to other users' published profiles.
pub struct ProfileViewer<B> {
  backend: Arc<B>,
  catalog: Arc<Catalog>,
  guard:   RequestGuard,
}

impl<B: Backend> ProfileViewer<B> {
  pub fn new(backend: Arc<B>, catalog: Arc<Catalog>) -> Self {
    Self { backend, catalog, guard: RequestGuard::default() }
  }

  /// Load the public profile of `user_id`. A newer `open` supersedes this
  /// one, in which case [`Error::Stale`] is returned whether the load
  /// succeeded or failed.
  pub async fn open(&self, user_id: &str) -> Result<PublicProfileView> {
    let ticket = self.guard.issue();
    match self.load(user_id).await {
      Ok(view) => self.guard.accept(&ticket, view),
      Err(e) => Err(self.guard.accept(&ticket, e)?),
    }
  }

  async fn load(&self, user_id: &str) -> Result<PublicProfileView> {
    let profile = self
      .backend
      .get_profile(user_id)
      .await
      .map_err(Error::query)?
      .ok_or_else(|| Error::ProfileNotFound(user_id.to_owned()))?;

    if !profile.is_public {
      return Err(Error::ProfileNotPublic(user_id.to_owned()));
    }

    let owned_ids = if profile.show_owned {
      self
        .backend
        .public_skin_ids(user_id)
        .await
        .map_err(Error::query)?
        .into_iter()
        .filter(|id| !id.is_empty())
        .collect()
    } else {
      Vec::new()
    };

    let total = self.catalog.len();
    Ok(PublicProfileView {
      percent_owned: percent(owned_ids.len(), total),
      total,
      owned_ids,
      profile,
    })
  }

  /// Public profiles whose display name contains `name`. A blank query
  /// returns nothing without asking the backend.
  pub async fn search(&self, name: &str) -> Result<Vec<PublicProfile>> {
    let name = name.trim();
    if name.is_empty() {
      return Ok(Vec::new());
    }
    self
      .backend
      .search_profiles(&ProfileQuery::new(name))
      .await
      .map_err(Error::query)
  }

  pub fn catalog(&self) -> &Catalog { &self.catalog }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use chrono::TimeZone;

  use super::*;
  use crate::{catalog::CatalogItem, testing::MemoryBackend};

  fn profile(user_id: &str, name: &str, is_public: bool, show_owned: bool) -> PublicProfile {
    PublicProfile {
      user_id: user_id.into(),
      display_name: Some(name.into()),
      bio: None,
      is_public,
      show_owned,
      updated_at: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
    }
  }

  fn viewer(backend: Arc<MemoryBackend>) -> ProfileViewer<MemoryBackend> {
    let catalog = Catalog::new(
      ["a", "b", "c", "d"].into_iter().map(CatalogItem::placeholder).collect(),
    );
    ProfileViewer::new(backend, Arc::new(catalog))
  }

  #[tokio::test]
  async fn open_public_profile_with_snapshot() {
    let backend = Arc::new(MemoryBackend::default());
    backend.insert_profile(profile("u1", "Colt fan", true, true));
    backend.insert_public("u1", "a");
    backend.insert_public("u1", "b");

    let view = viewer(backend).open("u1").await.unwrap();
    assert_eq!(view.owned(), 2);
    assert_eq!(view.total, 4);
    assert_eq!(view.percent_owned, 50);
    assert_eq!(view.profile.visibility(), Visibility::PublicVisible);
  }

  #[tokio::test]
  async fn hidden_list_is_not_fetched() {
    let backend = Arc::new(MemoryBackend::default());
    backend.insert_profile(profile("u1", "Quiet", true, false));
    backend.insert_public("u1", "a");

    let view = viewer(backend.clone()).open("u1").await.unwrap();
    assert!(view.owned_ids.is_empty());
    assert_eq!(backend.calls("public_skin_ids"), 0);
  }

  #[tokio::test]
  async fn missing_and_private_profiles() {
    let backend = Arc::new(MemoryBackend::default());
    backend.insert_profile(profile("u2", "Hidden", false, true));
    let v = viewer(backend);

    assert!(matches!(v.open("nobody").await, Err(Error::ProfileNotFound(_))));
    assert!(matches!(v.open("u2").await, Err(Error::ProfileNotPublic(_))));
  }

  async fn wait_for_calls(backend: &MemoryBackend, method: &'static str, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
      while backend.calls(method) < n {
        tokio::task::yield_now().await;
      }
    })
    .await
    .unwrap();
  }

  #[tokio::test]
  async fn superseded_missing_profile_is_stale() {
    let backend = Arc::new(MemoryBackend::default());
    backend.insert_profile(profile("u1", "Colt fan", true, true));
    let v = Arc::new(viewer(backend.clone()));

    let release = backend.hold("get_profile");
    let first = tokio::spawn({
      let v = v.clone();
      async move { v.open("ghost").await }
    });
    wait_for_calls(&backend, "get_profile", 1).await;

    let second = v.open("u1").await.unwrap();
    assert_eq!(second.profile.user_id, "u1");

    release.send(()).unwrap();
    assert!(first.await.unwrap().unwrap_err().is_stale());
  }

  #[tokio::test]
  async fn superseded_query_failure_is_stale() {
    let backend = Arc::new(MemoryBackend::default());
    backend.insert_profile(profile("u1", "Colt fan", true, true));
    backend.insert_profile(profile("u2", "Hidden", false, true));
    let v = Arc::new(viewer(backend.clone()));

    backend.fail_next("public_skin_ids");
    let release = backend.hold("public_skin_ids");
    let first = tokio::spawn({
      let v = v.clone();
      async move { v.open("u1").await }
    });
    wait_for_calls(&backend, "public_skin_ids", 1).await;

    assert!(matches!(v.open("u2").await, Err(Error::ProfileNotPublic(_))));

    release.send(()).unwrap();
    assert!(first.await.unwrap().unwrap_err().is_stale());
  }

  #[tokio::test]
  async fn search_skips_blank_queries_and_private_profiles() {
    let backend = Arc::new(MemoryBackend::default());
    backend.insert_profile(profile("u1", "Shelly Main", true, true));
    backend.insert_profile(profile("u2", "shelly secret", false, true));
    let v = viewer(backend.clone());

    assert!(v.search("   ").await.unwrap().is_empty());
    assert_eq!(backend.calls("search_profiles"), 0);

    let hits = v.search("SHELLY").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].user_id, "u1");
  }

  #[test]
  fn draft_defaults_and_conversion() {
    let user = User::new("u1", Some("piper@example.com".into()));
    let draft = ProfileDraft::for_user(&user, None);
    assert_eq!(draft.display_name, "piper");
    assert!(draft.is_public && draft.show_owned);

    let blank = ProfileDraft { display_name: "   ".into(), bio: " hi ".into(), ..draft };
    let now = Utc::now();
    let p = blank.into_profile("u1", now);
    assert_eq!(p.display_name.as_deref(), Some(ProfileDraft::FALLBACK_NAME));
    assert_eq!(p.bio.as_deref(), Some("hi"));
    assert_eq!(p.updated_at, Some(now));
  }

  #[test]
  fn share_url_replaces_user_param() {
    let url = share_url("https://example.com/pages/profile.html?u=old&tab=x", "abc").unwrap();
    assert_eq!(url, "https://example.com/pages/profile.html?tab=x&u=abc");
    assert!(share_url("not a url", "abc").is_err());
  }

  #[test]
  fn target_resolution() {
    let me = User::new("me", None);
    assert_eq!(resolve_target(Some(" other "), Some(&me)).unwrap(), "other");
    assert_eq!(resolve_target(None, Some(&me)).unwrap(), "me");
    assert_eq!(resolve_target(Some(""), Some(&me)).unwrap(), "me");
    assert!(matches!(resolve_target(None, None), Err(Error::InvalidArgument(_))));
  }
}
