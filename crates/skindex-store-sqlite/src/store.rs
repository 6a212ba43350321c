//! [`SqliteStore`]: the SQLite implementation of [`Backend`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use skindex_core::{
  catalog::SkinRow,
  profile::PublicProfile,
  store::{Backend, ProfileQuery},
};

use crate::{
  encode::{encode_dt, like_pattern, RawProfile, RawSkin},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A skindex backend stored in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:           tokio_rusqlite::Connection,
  image_base_url: Option<String>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, image_base_url: None };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, image_base_url: None };
    store.init_schema().await?;
    Ok(store)
  }

  /// Resolve image paths against `base` (`<base>/<path>`). Without a base,
  /// images have no URL.
  pub fn with_image_base_url(mut self, base: impl Into<String>) -> Self {
    let base = base.into();
    self.image_base_url = Some(base.trim_end_matches('/').to_owned()).filter(|b| !b.is_empty());
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert or replace catalog rows, keyed by id. Returns the number of rows
  /// written. Every row must carry an id.
  pub async fn import_skins(&self, rows: Vec<SkinRow>) -> Result<usize> {
    if let Some(pos) = rows
      .iter()
      .position(|r| r.id.as_deref().is_none_or(|id| id.trim().is_empty()))
    {
      return Err(Error::MissingId(pos));
    }

    let rows: Vec<_> = rows
      .into_iter()
      .map(|r| {
        (
          r.id.unwrap_or_default().trim().to_owned(),
          r.name,
          r.brawler,
          r.category,
          r.rarity,
          r.img_path,
          r.updated_at.map(encode_dt),
        )
      })
      .collect();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO skins (id, name, brawler, category, rarity, img_path, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (id) DO UPDATE SET
               name       = excluded.name,
               brawler    = excluded.brawler,
               category   = excluded.category,
               rarity     = excluded.rarity,
               img_path   = excluded.img_path,
               updated_at = excluded.updated_at",
          )?;
          for row in &rows {
            stmt.execute(rusqlite::params![row.0, row.1, row.2, row.3, row.4, row.5, row.6])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;

    tracing::info!(count = written, "catalog rows imported");
    Ok(written)
  }

  /// [`SqliteStore::import_skins`] from a JSON array of `skins` rows, as
  /// exported from the hosted table.
  pub async fn import_skins_json(&self, json: &str) -> Result<usize> {
    let rows: Vec<SkinRow> = serde_json::from_str(json)?;
    self.import_skins(rows).await
  }

  async fn ids_from(&self, table: &'static str, user_id: &str) -> Result<Vec<String>> {
    let user_id = user_id.to_owned();
    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT skin_id FROM {table} WHERE user_id = ?1 ORDER BY skin_id"
        ))?;
        let ids = stmt
          .query_map(rusqlite::params![user_id], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
      })
      .await?;
    Ok(ids)
  }
}

// ─── Backend impl ────────────────────────────────────────────────────────────

impl Backend for SqliteStore {
  type Error = Error;

  // ── Catalog ───────────────────────────────────────────────────────────

  async fn list_skins(&self) -> Result<Vec<SkinRow>> {
    let raws: Vec<RawSkin> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, name, brawler, category, rarity, img_path, updated_at
           FROM skins
           ORDER BY brawler, name",
        )?;
        let rows = stmt
          .query_map([], RawSkin::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSkin::into_row).collect()
  }

  fn public_image_url(&self, path: &str) -> Option<String> {
    let base = self.image_base_url.as_deref()?;
    Some(format!("{base}/{}", path.trim_start_matches('/')))
  }

  // ── Private ownership ─────────────────────────────────────────────────

  async fn owned_skin_ids(&self, user_id: &str) -> Result<Vec<String>> {
    self.ids_from("user_skins", user_id).await
  }

  async fn upsert_owned(&self, user_id: &str, skin_id: &str) -> Result<()> {
    let user_id = user_id.to_owned();
    let skin_id = skin_id.to_owned();
    let at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_skins (user_id, skin_id, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (user_id, skin_id) DO NOTHING",
          rusqlite::params![user_id, skin_id, at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_owned(&self, user_id: &str, skin_id: &str) -> Result<()> {
    let user_id = user_id.to_owned();
    let skin_id = skin_id.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM user_skins WHERE user_id = ?1 AND skin_id = ?2",
          rusqlite::params![user_id, skin_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Profiles ──────────────────────────────────────────────────────────

  async fn get_profile(&self, user_id: &str) -> Result<Option<PublicProfile>> {
    let user_id = user_id.to_owned();

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM public_profiles WHERE user_id = ?1", RawProfile::COLUMNS),
              rusqlite::params![user_id],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn upsert_profile(&self, profile: &PublicProfile) -> Result<()> {
    let p = profile.clone();
    let updated_at = p.updated_at.map(encode_dt);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO public_profiles
             (user_id, display_name, bio, is_public, show_owned, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (user_id) DO UPDATE SET
             display_name = excluded.display_name,
             bio          = excluded.bio,
             is_public    = excluded.is_public,
             show_owned   = excluded.show_owned,
             updated_at   = excluded.updated_at",
          rusqlite::params![
            p.user_id,
            p.display_name,
            p.bio,
            p.is_public,
            p.show_owned,
            updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn search_profiles(&self, query: &ProfileQuery) -> Result<Vec<PublicProfile>> {
    let pattern = like_pattern(query.name.trim());
    let limit = query.limit as i64;

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {}
           FROM public_profiles
           WHERE is_public = 1
             AND display_name LIKE ?1 ESCAPE '\\'
           ORDER BY updated_at DESC
           LIMIT ?2",
          RawProfile::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, limit], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  // ── Public snapshot ───────────────────────────────────────────────────

  async fn public_skin_ids(&self, user_id: &str) -> Result<Vec<String>> {
    self.ids_from("public_user_skins", user_id).await
  }

  async fn clear_public_skins(&self, user_id: &str) -> Result<()> {
    let user_id = user_id.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM public_user_skins WHERE user_id = ?1",
          rusqlite::params![user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn upsert_public_skins(&self, user_id: &str, skin_ids: &[String]) -> Result<()> {
    let user_id = user_id.to_owned();
    let skin_ids = skin_ids.to_vec();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO public_user_skins (user_id, skin_id) VALUES (?1, ?2)
             ON CONFLICT (user_id, skin_id) DO NOTHING",
          )?;
          for id in &skin_ids {
            stmt.execute(rusqlite::params![user_id, id])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
