//! Persisted collapsed/expanded state of theme sections.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use skindex_core::collapse::CollapseState;

/// A [`CollapseState`] saved to a JSON object (`theme -> collapsed`) on every
/// change.
pub struct JsonCollapseState {
  path:  PathBuf,
  flags: BTreeMap<String, bool>,
}

impl JsonCollapseState {
  /// Load from `path`. A missing or unreadable file starts empty.
  pub fn load(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let flags = match std::fs::read_to_string(&path) {
      Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "resetting unreadable preferences");
        BTreeMap::new()
      }),
      Err(_) => BTreeMap::new(),
    };
    Self { path, flags }
  }

  pub fn path(&self) -> &Path { &self.path }

  fn save(&self) -> Result<()> {
    if let Some(dir) = self.path.parent() {
      std::fs::create_dir_all(dir)
        .with_context(|| format!("creating {}", dir.display()))?;
    }
    let json = serde_json::to_vec_pretty(&self.flags)?;
    std::fs::write(&self.path, json)
      .with_context(|| format!("writing {}", self.path.display()))
  }
}

impl CollapseState for JsonCollapseState {
  fn get(&self, theme: &str) -> Option<bool> { self.flags.get(theme).copied() }

  fn set(&mut self, theme: &str, collapsed: bool) {
    self.flags.insert(theme.to_owned(), collapsed);
    if let Err(e) = self.save() {
      tracing::warn!(error = %e, "could not save collapsed themes");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn state_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs").join("collapsed.json");

    let mut prefs = JsonCollapseState::load(&path);
    assert!(prefs.is_collapsed("Bandits"));
    assert!(!prefs.toggle("Bandits"));

    let reloaded = JsonCollapseState::load(&path);
    assert!(!reloaded.is_collapsed("Bandits"));
    assert!(reloaded.is_collapsed("Halloween"));
  }

  #[test]
  fn corrupt_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("collapsed.json");
    std::fs::write(&path, "[not an object").unwrap();

    let prefs = JsonCollapseState::load(&path);
    assert_eq!(prefs.get("Bandits"), None);
    assert_eq!(prefs.path(), path);
  }
}
