//! Session-scoped controller.
//!
//! One [`Collection`] per front-end instance holds the signed-in user, their
//! ownership set and profile draft, and a status line. Every reload is
//! guarded by a [`RequestGuard`] so only the latest one is applied, and every
//! write is tied to the session it started in: once the user signs out (or
//! another user signs in) its result is dropped.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;

use crate::{
  auth::User,
  catalog::Catalog,
  collapse::CollapseState,
  facet::FacetSelection,
  guard::{RequestGuard, Ticket},
  ownership::{compute_stats, OwnershipSet, OwnershipStats, OwnershipStore},
  profile::{ProfileDraft, PublicProfile},
  publish::{PublishReport, Publisher},
  rarity::RarityOrder,
  store::Backend,
  view::{self, CatalogView},
  Error, Result,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
  pub user:    Option<User>,
  pub owned:   OwnershipSet,
  pub profile: Option<PublicProfile>,
  pub draft:   Option<ProfileDraft>,
  /// Last user-visible message (error or confirmation).
  pub status:  Option<String>,
}

pub struct Collection<B> {
  backend:   Arc<B>,
  catalog:   Arc<Catalog>,
  order:     RarityOrder,
  /// Reload tickets; the latest reload wins.
  guard:     RequestGuard,
  /// Bumped on every sign-in and sign-out.
  sessions:  RequestGuard,
  ownership: OwnershipStore<B>,
  publisher: Publisher<B>,
  state:     Mutex<SessionState>,
}

impl<B: Backend> Collection<B> {
  pub fn new(backend: Arc<B>, catalog: Arc<Catalog>, order: RarityOrder) -> Self {
    Self {
      ownership: OwnershipStore::new(backend.clone()),
      publisher: Publisher::new(backend.clone()),
      backend,
      catalog,
      order,
      guard: RequestGuard::default(),
      sessions: RequestGuard::default(),
      state: Mutex::new(SessionState::default()),
    }
  }

  pub fn catalog(&self) -> &Catalog { &self.catalog }

  pub fn order(&self) -> &RarityOrder { &self.order }

  /// A copy of the current state.
  pub fn snapshot(&self) -> SessionState { self.state.lock().clone() }

  pub fn user(&self) -> Option<User> { self.state.lock().user.clone() }

  pub fn owned(&self) -> OwnershipSet { self.state.lock().owned.clone() }

  pub fn status(&self) -> Option<String> { self.state.lock().status.clone() }

  pub fn set_status(&self, status: impl Into<String>) {
    self.state.lock().status = Some(status.into());
  }

  // ── Auth transitions ──────────────────────────────────────────────────

  /// Replace the session with `user` and load their data.
  pub async fn sign_in(&self, user: User) -> Result<()> {
    tracing::info!(user_id = %user.id, "session signed in");
    self.reset(Some(user));
    self.refresh().await
  }

  /// Drop all user data at once. Reloads and writes still in flight are
  /// discarded when they resolve.
  pub fn sign_out(&self) {
    self.reset(None);
    tracing::info!("session signed out");
  }

  /// Start a new session. Both guards move under the state lock, so no
  /// check-then-apply can straddle the reset.
  fn reset(&self, user: Option<User>) {
    let mut state = self.state.lock();
    self.guard.invalidate();
    self.sessions.invalidate();
    *state = SessionState { user, ..SessionState::default() };
  }

  /// The signed-in user and the session they belong to.
  fn begin(&self) -> Result<(User, Ticket)> {
    let state = self.state.lock();
    let user = state.user.clone().ok_or_else(|| Error::invalid("not signed in"))?;
    Ok((user, self.sessions.current()))
  }

  /// Apply `f` to the state if `session` is still the current one.
  fn apply<T>(&self, session: &Ticket, f: impl FnOnce(&mut SessionState) -> T) -> Result<T> {
    let mut state = self.state.lock();
    if !self.sessions.is_current(session) {
      tracing::debug!("dropping result of an ended session");
      return Err(Error::Stale);
    }
    Ok(f(&mut *state))
  }

  /// Put `err` on the status line, unless the session has ended, in which
  /// case the caller gets [`Error::Stale`].
  fn fail(&self, session: &Ticket, err: Error) -> Error {
    match self.apply(session, |s| s.status = Some(err.to_string())) {
      Ok(()) => err,
      Err(stale) => stale,
    }
  }

  // ── Reload ────────────────────────────────────────────────────────────

  /// Reload the ownership set and the profile of the current user.
  ///
  /// Returns [`Error::Stale`] without touching state when a newer reload (or
  /// a sign-out) happened meanwhile. On failure the previous state is kept
  /// and the status line carries the error.
  pub async fn refresh(&self) -> Result<()> {
    let (ticket, user) = {
      let state = self.state.lock();
      (self.guard.issue(), state.user.clone())
    };
    let user_id = user.as_ref().map(|u| u.id.as_str());

    let owned = match self.ownership.load_owned(user_id).await {
      Ok(owned) => owned,
      Err(e) => return Err(self.report(&ticket, e)),
    };
    self.accept(&ticket, |s| s.owned = owned)?;

    let Some(user) = user else {
      return Ok(());
    };

    let profile = match self.backend.get_profile(&user.id).await {
      Ok(profile) => profile,
      Err(e) => return Err(self.report(&ticket, Error::query(e))),
    };
    self.accept(&ticket, |s| {
      s.draft = Some(ProfileDraft::for_user(&user, profile.as_ref()));
      s.profile = profile;
    })
  }

  /// Apply a reload result if `ticket` is still the latest, checked and
  /// written under one lock.
  fn accept<T>(&self, ticket: &Ticket, f: impl FnOnce(&mut SessionState) -> T) -> Result<T> {
    let mut state = self.state.lock();
    let f = self.guard.accept(ticket, f)?;
    Ok(f(&mut *state))
  }

  /// Record a reload failure on the status line, unless the reload has been
  /// superseded.
  fn report(&self, ticket: &Ticket, err: Error) -> Error {
    let mut state = self.state.lock();
    if !self.guard.is_current(ticket) {
      return Error::Stale;
    }
    tracing::warn!(error = %err, "reload failed");
    state.status = Some(err.to_string());
    err
  }

  // ── Ownership ─────────────────────────────────────────────────────────

  /// Persist the flag remotely, then mirror it locally. On failure the local
  /// set is unchanged.
  pub async fn set_owned(&self, item_id: &str, owned: bool) -> Result<bool> {
    let (user, session) = self.begin()?;
    match self.ownership.set_owned(&user.id, item_id, owned).await {
      Ok(committed) => {
        self.apply(&session, |s| s.owned.apply(item_id, committed))?;
        Ok(committed)
      }
      Err(e) => Err(self.fail(&session, e)),
    }
  }

  pub fn stats(&self) -> OwnershipStats {
    let state = self.state.lock();
    compute_stats(&state.owned, self.catalog.items(), &self.order)
  }

  pub fn view(&self, selection: &FacetSelection, collapse: &dyn CollapseState) -> CatalogView {
    let state = self.state.lock();
    view::render(
      self.catalog.items(),
      &state.owned,
      selection,
      &self.order,
      state.user.is_some(),
      collapse,
    )
  }

  // ── Profile ───────────────────────────────────────────────────────────

  /// The draft to edit: the loaded one, else defaults for the user.
  pub fn draft(&self) -> Result<ProfileDraft> {
    let state = self.state.lock();
    let user = state.user.as_ref().ok_or_else(|| Error::invalid("not signed in"))?;
    Ok(
      state
        .draft
        .clone()
        .unwrap_or_else(|| ProfileDraft::for_user(user, state.profile.as_ref())),
    )
  }

  pub async fn save_profile(&self, draft: ProfileDraft) -> Result<PublicProfile> {
    let (user, session) = self.begin()?;
    let profile = draft.clone().into_profile(&user.id, Utc::now());

    if let Err(e) = self.backend.upsert_profile(&profile).await {
      return Err(self.fail(&session, Error::query(e)));
    }

    self.apply(&session, |s| {
      s.draft = Some(draft);
      s.profile = Some(profile.clone());
      s.status = Some("Profile saved.".to_owned());
    })?;
    Ok(profile)
  }

  /// Save the profile and publish a fresh snapshot of the ownership set.
  /// The set is reloaded first so the snapshot matches what is stored; that
  /// reload supersedes any reload still in flight.
  pub async fn publish(&self, draft: ProfileDraft) -> Result<PublishReport> {
    let (user, session) = self.begin()?;
    let ticket = self.guard.issue();
    let profile = draft.clone().into_profile(&user.id, Utc::now());

    let owned = match self.ownership.load_owned(Some(&user.id)).await {
      Ok(owned) => owned,
      Err(e) => return Err(self.fail(&session, e)),
    };
    self.apply(&session, |s| {
      if self.guard.is_current(&ticket) {
        s.owned = owned.clone();
      }
    })?;

    match self.publisher.publish(&user.id, &profile, &owned).await {
      Ok(report) => {
        self.apply(&session, |s| {
          s.draft = Some(draft);
          s.profile = Some(profile);
          s.status = Some(format!("Published {} item(s).", report.published));
        })?;
        Ok(report)
      }
      Err(e) => Err(self.fail(&session, e)),
    }
  }
}
