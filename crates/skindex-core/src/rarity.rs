//! Rarity ordering.
//!
//! Catalog rows carry rarity as a free-text label. [`RarityOrder`] fixes the
//! display and sort precedence of the labels the front-end knows about;
//! anything else is treated as unknown and sorts last.

/// Canonical ordering. The older six-value ordering is a prefix of this one.
pub const DEFAULT_RARITIES: [&str; 8] = [
  "Rare",
  "Super Rare",
  "Epic",
  "Mythique",
  "Légendaire",
  "Hypercharge",
  "Argent",
  "Or",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarityOrder(Vec<String>);

impl RarityOrder {
  pub fn new<I, S>(labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(labels.into_iter().map(Into::into).collect())
  }

  pub fn position(&self, rarity: &str) -> Option<usize> {
    self.0.iter().position(|r| r == rarity)
  }

  pub fn contains(&self, rarity: &str) -> bool { self.position(rarity).is_some() }

  /// Sort key: the position in the ordering, unknown rarities after all
  /// known ones.
  pub fn rank(&self, rarity: &str) -> usize {
    self.position(rarity).unwrap_or(usize::MAX)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> { self.0.iter().map(String::as_str) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Default for RarityOrder {
  fn default() -> Self { Self::new(DEFAULT_RARITIES) }
}

/// Stable style slug for a rarity label, used by front-ends to pick colours.
pub fn rarity_class(rarity: &str) -> Option<&'static str> {
  Some(match rarity {
    "Rare" => "rarity-rare",
    "Super Rare" => "rarity-super-rare",
    "Epic" => "rarity-epic",
    "Mythique" => "rarity-mythic",
    "Légendaire" => "rarity-legendary",
    "Hypercharge" => "rarity-hypercharge",
    "Argent" => "rarity-silver",
    "Or" => "rarity-gold",
    _ => return None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_rarity_ranks_last() {
    let order = RarityOrder::default();
    assert_eq!(order.rank("Rare"), 0);
    assert_eq!(order.rank("Or"), 7);
    assert!(order.rank("Chromatique") > order.rank("Or"));
  }

  #[test]
  fn every_default_rarity_has_a_class() {
    assert!(DEFAULT_RARITIES.iter().all(|r| rarity_class(r).is_some()));
    assert_eq!(rarity_class("—"), None);
  }
}
