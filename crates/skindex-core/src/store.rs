//! The `Backend` trait and supporting query types.
//!
//! The trait is implemented by data sources (e.g. `skindex-store-sqlite`, or
//! the REST client in `skindex-cli`). Everything above it (catalog loading,
//! ownership, publishing, the session controller) depends on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use crate::{catalog::SkinRow, profile::PublicProfile};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`Backend::search_profiles`].
#[derive(Debug, Clone)]
pub struct ProfileQuery {
  /// Case-insensitive substring of the display name.
  pub name:  String,
  pub limit: usize,
}

impl ProfileQuery {
  pub const DEFAULT_LIMIT: usize = 20;

  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), limit: Self::DEFAULT_LIMIT }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the hosted tables and storage bucket.
///
/// Tables: `skins` (read-only), `user_skins` and `public_user_skins` (unique
/// on `(user_id, skin_id)`), `public_profiles` (unique on `user_id`).
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// Every catalog row, ordered by brawler then name.
  fn list_skins(
    &self,
  ) -> impl Future<Output = Result<Vec<SkinRow>, Self::Error>> + Send + '_;

  /// Public URL for an object in the image bucket, or `None` if it cannot be
  /// resolved.
  fn public_image_url(&self, path: &str) -> Option<String>;

  // ── Private ownership ─────────────────────────────────────────────────

  /// `skin_id`s of every `user_skins` row for `user_id`.
  fn owned_skin_ids<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Insert `(user_id, skin_id)`; a no-op if the row already exists.
  fn upsert_owned<'a>(
    &'a self,
    user_id: &'a str,
    skin_id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete `(user_id, skin_id)`; a no-op if the row does not exist.
  fn delete_owned<'a>(
    &'a self,
    user_id: &'a str,
    skin_id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// The profile row for `user_id`, if any.
  fn get_profile<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Option<PublicProfile>, Self::Error>> + Send + 'a;

  /// Insert or replace the profile keyed by `profile.user_id`.
  fn upsert_profile<'a>(
    &'a self,
    profile: &'a PublicProfile,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Public profiles whose display name matches `query`, newest first.
  fn search_profiles<'a>(
    &'a self,
    query: &'a ProfileQuery,
  ) -> impl Future<Output = Result<Vec<PublicProfile>, Self::Error>> + Send + 'a;

  // ── Public snapshot ───────────────────────────────────────────────────

  /// `skin_id`s of every `public_user_skins` row for `user_id`.
  fn public_skin_ids<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Delete every `public_user_skins` row for `user_id`.
  fn clear_public_skins<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Upsert one `public_user_skins` row per id.
  fn upsert_public_skins<'a>(
    &'a self,
    user_id: &'a str,
    skin_ids: &'a [String],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
