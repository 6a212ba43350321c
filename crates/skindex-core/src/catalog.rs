//! Catalog loading and normalisation.
//!
//! The catalog is fetched once per [`CatalogSource`] and shared as an
//! `Arc<Catalog>`. A failed fetch degrades to an empty catalog; the error is
//! kept for diagnostics instead of being propagated.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::store::Backend;

/// Label used for a blank brawler or rarity.
pub const PLACEHOLDER: &str = "—";

/// Theme shown for items with no category.
pub const THEME_FALLBACK: &str = "Sans thème";

/// Extension assumed for images stored under the item id.
pub const DEFAULT_IMAGE_EXT: &str = "webp";

// ─── Raw row ─────────────────────────────────────────────────────────────────

/// A row of the `skins` table as returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkinRow {
  pub id:         Option<String>,
  #[serde(default)]
  pub name:       Option<String>,
  #[serde(default)]
  pub brawler:    Option<String>,
  #[serde(default)]
  pub category:   Option<String>,
  #[serde(default)]
  pub rarity:     Option<String>,
  #[serde(default)]
  pub img_path:   Option<String>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

// ─── Item ────────────────────────────────────────────────────────────────────

/// A normalised catalog entry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
  pub id:         String,
  pub name:       String,
  /// Owning group.
  pub brawler:    String,
  /// Theme label.
  pub category:   String,
  pub rarity:     String,
  /// Resolved public URL; empty when it could not be resolved.
  pub image_url:  String,
  pub updated_at: Option<DateTime<Utc>>,
}

impl CatalogItem {
  /// Stand-in for an id that is not in the catalog.
  pub fn placeholder(id: &str) -> Self {
    Self {
      id:         id.to_owned(),
      name:       id.to_owned(),
      brawler:    PLACEHOLDER.to_owned(),
      category:   PLACEHOLDER.to_owned(),
      rarity:     PLACEHOLDER.to_owned(),
      image_url:  String::new(),
      updated_at: None,
    }
  }
}

fn non_blank(s: Option<String>) -> Option<String> {
  s.filter(|v| !v.trim().is_empty())
}

/// Object path of an item's image: the stored path, or `<id>.webp`.
pub fn image_path(id: &str, img_path: Option<&str>) -> String {
  match img_path.map(str::trim).filter(|p| !p.is_empty()) {
    Some(p) => p.to_owned(),
    None => format!("{}.{DEFAULT_IMAGE_EXT}", id.trim()),
  }
}

/// Normalise raw rows: drop rows without an id, fill label defaults, resolve
/// image URLs through `backend`.
pub fn normalize<B: Backend + ?Sized>(rows: Vec<SkinRow>, backend: &B) -> Vec<CatalogItem> {
  rows
    .into_iter()
    .filter_map(|row| {
      let id = non_blank(row.id)?;
      let path = image_path(&id, row.img_path.as_deref());
      let image_url = backend.public_image_url(&path).unwrap_or_default();
      Some(CatalogItem {
        name: non_blank(row.name).unwrap_or_else(|| id.clone()),
        brawler: non_blank(row.brawler).unwrap_or_else(|| PLACEHOLDER.to_owned()),
        category: non_blank(row.category).unwrap_or_else(|| THEME_FALLBACK.to_owned()),
        rarity: non_blank(row.rarity).unwrap_or_else(|| PLACEHOLDER.to_owned()),
        image_url,
        updated_at: row.updated_at,
        id,
      })
    })
    .collect()
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// The loaded item list with an id index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
  items: Vec<CatalogItem>,
  by_id: HashMap<String, usize>,
}

impl Catalog {
  pub fn new(items: Vec<CatalogItem>) -> Self {
    let by_id = items
      .iter()
      .enumerate()
      .map(|(i, item)| (item.id.clone(), i))
      .collect();
    Self { items, by_id }
  }

  pub fn items(&self) -> &[CatalogItem] { &self.items }

  pub fn get(&self, id: &str) -> Option<&CatalogItem> {
    self.by_id.get(id).map(|&i| &self.items[i])
  }

  /// The item for `id`, or a placeholder when it is unknown.
  pub fn get_or_placeholder(&self, id: &str) -> CatalogItem {
    self
      .get(id)
      .cloned()
      .unwrap_or_else(|| CatalogItem::placeholder(id))
  }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// One-shot, lazily-fetched catalog.
pub struct CatalogSource<B> {
  backend:    Arc<B>,
  cell:       OnceCell<Arc<Catalog>>,
  last_error: Mutex<Option<String>>,
}

impl<B: Backend> CatalogSource<B> {
  pub fn new(backend: Arc<B>) -> Self {
    Self { backend, cell: OnceCell::new(), last_error: Mutex::new(None) }
  }

  /// Resolve the catalog, fetching it on first use.
  ///
  /// Never fails: a fetch error yields an empty catalog and is recorded in
  /// [`CatalogSource::last_error`].
  pub async fn ready(&self) -> Arc<Catalog> {
    self
      .cell
      .get_or_init(|| async {
        match self.backend.list_skins().await {
          Ok(rows) => {
            let items = normalize(rows, self.backend.as_ref());
            tracing::debug!(count = items.len(), "catalog loaded");
            Arc::new(Catalog::new(items))
          }
          Err(e) => {
            tracing::error!(error = %e, "catalog load failed");
            *self.last_error.lock() = Some(e.to_string());
            Arc::new(Catalog::default())
          }
        }
      })
      .await
      .clone()
  }

  /// The error of the fetch, if it failed.
  pub fn last_error(&self) -> Option<String> { self.last_error.lock().clone() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::MemoryBackend;

  fn row(id: &str) -> SkinRow {
    SkinRow { id: Some(id.into()), ..Default::default() }
  }

  #[test]
  fn normalize_fills_defaults_and_drops_idless_rows() {
    let backend = MemoryBackend::default();
    let rows = vec![
      row("shelly_star"),
      SkinRow { id: Some("  ".into()), ..Default::default() },
      SkinRow::default(),
    ];
    let items = normalize(rows, &backend);
    assert_eq!(items.len(), 1);

    let item = &items[0];
    assert_eq!(item.name, "shelly_star");
    assert_eq!(item.brawler, PLACEHOLDER);
    assert_eq!(item.category, THEME_FALLBACK);
    assert_eq!(item.rarity, PLACEHOLDER);
    assert_eq!(item.image_url, "mem://skins/shelly_star.webp");
  }

  #[test]
  fn explicit_image_path_wins() {
    assert_eq!(image_path("colt", Some(" colt/v2.png ")), "colt/v2.png");
    assert_eq!(image_path("colt", Some("")), "colt.webp");
    assert_eq!(image_path("colt", None), "colt.webp");
  }

  #[test]
  fn unresolvable_image_is_empty() {
    let backend = MemoryBackend::with_unresolvable_images();
    let items = normalize(vec![row("colt")], &backend);
    assert_eq!(items[0].image_url, "");
  }

  #[tokio::test]
  async fn ready_is_one_shot() {
    let backend = Arc::new(MemoryBackend::with_skins(vec![row("a"), row("b")]));
    let source = CatalogSource::new(backend.clone());

    assert_eq!(source.ready().await.len(), 2);
    backend.push_skin(row("c"));
    assert_eq!(source.ready().await.len(), 2);
    assert_eq!(backend.calls("list_skins"), 1);

    // A fresh source re-runs the fetch.
    assert_eq!(CatalogSource::new(backend).ready().await.len(), 3);
  }

  #[tokio::test]
  async fn failed_fetch_degrades_to_empty() {
    let backend = Arc::new(MemoryBackend::default());
    backend.fail_next("list_skins");
    let source = CatalogSource::new(backend);

    let catalog = source.ready().await;
    assert!(catalog.is_empty());
    assert!(source.last_error().is_some());
  }

  #[test]
  fn unknown_ids_get_a_placeholder() {
    let catalog = Catalog::new(vec![CatalogItem::placeholder("known")]);
    assert!(catalog.get("known").is_some());
    let missing = catalog.get_or_placeholder("gone");
    assert_eq!(missing.name, "gone");
    assert_eq!(missing.rarity, PLACEHOLDER);
  }
}
