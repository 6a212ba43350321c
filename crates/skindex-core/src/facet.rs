//! Faceted filtering and ordering of the catalog.
//!
//! Everything here is a pure function of the catalog, the ownership set and a
//! [`FacetSelection`]; no state survives between calls.

use std::{cmp::Ordering, collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  catalog::{CatalogItem, THEME_FALLBACK},
  collate,
  ownership::OwnershipSet,
  rarity::RarityOrder,
};

// ─── Selection ───────────────────────────────────────────────────────────────

/// Which label items are grouped and selected by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
  #[default]
  Brawler,
  Theme,
}

impl GroupMode {
  pub fn toggled(self) -> Self {
    match self {
      Self::Brawler => Self::Theme,
      Self::Theme => Self::Brawler,
    }
  }
}

impl fmt::Display for GroupMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Brawler => "brawler",
      Self::Theme => "theme",
    })
  }
}

impl FromStr for GroupMode {
  type Err = crate::Error;

  fn from_str(s: &str) -> crate::Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "brawler" => Ok(Self::Brawler),
      "theme" | "category" => Ok(Self::Theme),
      other => Err(crate::Error::invalid(format!("unknown group mode {other:?}"))),
    }
  }
}

/// A selector value: everything, or one exact label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Facet {
  #[default]
  All,
  Only(String),
}

impl Facet {
  /// Parse a selector value; blank or `"all"` selects everything.
  pub fn parse(value: Option<&str>) -> Self {
    match value.map(str::trim) {
      None | Some("") | Some("all") => Self::All,
      Some(v) => Self::Only(v.to_owned()),
    }
  }

  pub fn matches(&self, value: &str) -> bool {
    match self {
      Self::All => true,
      Self::Only(v) => v == value,
    }
  }

  pub fn as_option(&self) -> Option<&str> {
    match self {
      Self::All => None,
      Self::Only(v) => Some(v),
    }
  }
}

/// The user's current filter choices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSelection {
  pub mode:       GroupMode,
  pub group:      Facet,
  pub rarity:     Facet,
  pub query:      String,
  pub only_owned: bool,
}

impl FacetSelection {
  /// Selection for a theme deep link: by-theme mode with `theme` selected.
  pub fn for_theme(theme: &str) -> Self {
    Self {
      mode: GroupMode::Theme,
      group: Facet::parse(Some(theme)),
      ..Self::default()
    }
  }

  /// Switch grouping mode; the group selector resets to "all".
  pub fn set_mode(&mut self, mode: GroupMode) {
    self.mode = mode;
    self.group = Facet::All;
  }
}

// ─── Labels ──────────────────────────────────────────────────────────────────

/// Theme label of an item, with a fallback for blank categories.
pub fn theme_of(item: &CatalogItem) -> &str {
  let theme = item.category.trim();
  if theme.is_empty() { THEME_FALLBACK } else { theme }
}

pub fn group_value(item: &CatalogItem, mode: GroupMode) -> &str {
  match mode {
    GroupMode::Brawler => item.brawler.trim(),
    GroupMode::Theme => theme_of(item),
  }
}

// ─── Predicate ───────────────────────────────────────────────────────────────

/// Case-insensitive substring match over name, brawler, theme and rarity.
/// `needle` must already be trimmed and lower-cased.
fn text_matches(item: &CatalogItem, needle: &str) -> bool {
  needle.is_empty()
    || [
      item.name.as_str(),
      item.brawler.as_str(),
      theme_of(item),
      item.rarity.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

fn normalized_query(query: &str) -> String { query.trim().to_lowercase() }

pub fn matches(item: &CatalogItem, selection: &FacetSelection, owned: &OwnershipSet) -> bool {
  matches_normalized(item, selection, &normalized_query(&selection.query), owned)
}

fn matches_normalized(
  item: &CatalogItem,
  selection: &FacetSelection,
  needle: &str,
  owned: &OwnershipSet,
) -> bool {
  (!selection.only_owned || owned.contains(&item.id))
    && selection.group.matches(group_value(item, selection.mode))
    && selection.rarity.matches(&item.rarity)
    && text_matches(item, needle)
}

/// Items matching `selection`, in catalog order.
pub fn filter<'a>(
  items: &'a [CatalogItem],
  selection: &FacetSelection,
  owned: &OwnershipSet,
) -> Vec<&'a CatalogItem> {
  let needle = normalized_query(&selection.query);
  items
    .iter()
    .filter(|item| matches_normalized(item, selection, &needle, owned))
    .collect()
}

/// Rarity facet + text filter only; used for public snapshot lists, which
/// have no grouping or ownership toggle.
pub fn filter_rarity_text<'a, I>(items: I, rarity: &Facet, query: &str) -> Vec<I::Item>
where
  I: IntoIterator<Item = &'a CatalogItem>,
{
  let needle = normalized_query(query);
  items
    .into_iter()
    .filter(|item| rarity.matches(&item.rarity) && text_matches(item, &needle))
    .collect()
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Rarity position (unknown last), then locale-aware name.
pub fn compare_rarity_then_name(a: &CatalogItem, b: &CatalogItem, order: &RarityOrder) -> Ordering {
  order
    .rank(&a.rarity)
    .cmp(&order.rank(&b.rarity))
    .then_with(|| collate::compare(&a.name, &b.name))
}

/// One theme and its items, as shown in by-theme mode.
#[derive(Debug, Clone)]
pub struct ThemeGroup<'a> {
  pub theme: String,
  pub items: Vec<&'a CatalogItem>,
}

/// Group `items` by theme. Themes are locale-sorted; items within a theme are
/// sorted by rarity then name.
pub fn group_by_theme<'a>(items: Vec<&'a CatalogItem>, order: &RarityOrder) -> Vec<ThemeGroup<'a>> {
  let mut groups: Vec<ThemeGroup<'a>> = Vec::new();

  for item in items {
    let theme = theme_of(item);
    match groups.iter_mut().find(|g| g.theme == theme) {
      Some(group) => group.items.push(item),
      None => groups.push(ThemeGroup { theme: theme.to_owned(), items: vec![item] }),
    }
  }

  groups.sort_by(|a, b| collate::compare(&a.theme, &b.theme));
  for group in &mut groups {
    group
      .items
      .sort_by(|a, b| compare_rarity_then_name(a, b, order));
  }
  groups
}

// ─── Selector options ────────────────────────────────────────────────────────

/// Rarities present in at least one item, in `order`'s sequence.
pub fn rarity_options(items: &[CatalogItem], order: &RarityOrder) -> Vec<String> {
  let present: BTreeSet<&str> = items.iter().map(|i| i.rarity.as_str()).collect();
  order
    .iter()
    .filter(|r| present.contains(r))
    .map(str::to_owned)
    .collect()
}

/// Distinct non-blank group values under `mode`, locale-sorted.
pub fn group_options(items: &[CatalogItem], mode: GroupMode) -> Vec<String> {
  let distinct: BTreeSet<&str> = items
    .iter()
    .map(|i| group_value(i, mode))
    .filter(|v| !v.is_empty())
    .collect();
  let mut values: Vec<String> = distinct.into_iter().map(str::to_owned).collect();
  values.sort_by(|a, b| collate::compare(a, b));
  values
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(name: &str, brawler: &str, theme: &str, rarity: &str) -> CatalogItem {
    CatalogItem {
      id:         name.to_lowercase().replace(' ', "_"),
      name:       name.into(),
      brawler:    brawler.into(),
      category:   theme.into(),
      rarity:     rarity.into(),
      image_url:  String::new(),
      updated_at: None,
    }
  }

  fn sample() -> Vec<CatalogItem> {
    vec![
      item("Star Shelly", "Shelly", "Anniversaire", "Rare"),
      item("Outlaw Colt", "Colt", "Bandits", "Epic"),
    ]
  }

  fn names(items: &[&CatalogItem]) -> Vec<String> {
    items.iter().map(|i| i.name.clone()).collect()
  }

  #[test]
  fn filter_by_brawler() {
    let items = sample();
    let sel = FacetSelection {
      group: Facet::Only("Shelly".into()),
      ..Default::default()
    };
    assert_eq!(names(&filter(&items, &sel, &OwnershipSet::new())), ["Star Shelly"]);
  }

  #[test]
  fn text_search_spans_fields_case_insensitively() {
    let items = sample();
    let sel = FacetSelection { query: "  BAND ".into(), ..Default::default() };
    assert_eq!(names(&filter(&items, &sel, &OwnershipSet::new())), ["Outlaw Colt"]);

    let sel = FacetSelection { query: "rare".into(), ..Default::default() };
    assert_eq!(names(&filter(&items, &sel, &OwnershipSet::new())), ["Star Shelly"]);
  }

  #[test]
  fn predicates_are_conjunctive() {
    let items = sample();
    let owned: OwnershipSet = ["outlaw_colt"].into_iter().collect();

    let sel = FacetSelection {
      mode: GroupMode::Theme,
      group: Facet::Only("Bandits".into()),
      rarity: Facet::Only("Rare".into()),
      ..Default::default()
    };
    assert!(filter(&items, &sel, &owned).is_empty());

    let sel = FacetSelection { only_owned: true, ..Default::default() };
    assert_eq!(names(&filter(&items, &sel, &owned)), ["Outlaw Colt"]);
  }

  #[test]
  fn blank_theme_uses_fallback() {
    let it = item("Plain", "Nita", "   ", "Rare");
    assert_eq!(theme_of(&it), THEME_FALLBACK);
    let sel = FacetSelection::for_theme(THEME_FALLBACK);
    assert!(matches(&it, &sel, &OwnershipSet::new()));
  }

  #[test]
  fn theme_grouping_order() {
    let items = vec![
      item("Zombie Bibi", "Bibi", "Halloween", "Epic"),
      item("Witch Shelly", "Shelly", "Halloween", "Rare"),
      item("Mystery", "Mortis", "Halloween", "Chromatique"),
      item("Bandit Shelly", "Shelly", "Bandits", "Super Rare"),
      item("Angel Colt", "Colt", "Halloween", "Epic"),
      item("Étoile Max", "Max", "étoiles", "Rare"),
    ];
    let groups = group_by_theme(items.iter().collect(), &RarityOrder::default());

    let themes: Vec<&str> = groups.iter().map(|g| g.theme.as_str()).collect();
    assert_eq!(themes, ["Bandits", "étoiles", "Halloween"]);

    let halloween = names(&groups[2].items);
    assert_eq!(halloween, ["Witch Shelly", "Angel Colt", "Zombie Bibi", "Mystery"]);
  }

  #[test]
  fn rarity_options_only_list_present_rarities_in_order() {
    let items = vec![
      item("a", "X", "T", "Epic"),
      item("b", "X", "T", "Rare"),
      item("c", "X", "T", "Chromatique"),
    ];
    assert_eq!(rarity_options(&items, &RarityOrder::default()), ["Rare", "Epic"]);
  }

  #[test]
  fn group_options_are_distinct_non_blank_and_sorted() {
    let items = vec![
      item("a", "Shelly", "Bandits", "Rare"),
      item("b", "colt", "Anniversaire", "Rare"),
      item("c", "Shelly", "", "Rare"),
      item("d", " ", "Bandits", "Rare"),
    ];
    assert_eq!(group_options(&items, GroupMode::Brawler), ["colt", "Shelly"]);
    assert_eq!(
      group_options(&items, GroupMode::Theme),
      ["Anniversaire", "Bandits", THEME_FALLBACK]
    );
  }

  #[test]
  fn facet_parsing() {
    assert_eq!(Facet::parse(None), Facet::All);
    assert_eq!(Facet::parse(Some("all")), Facet::All);
    assert_eq!(Facet::parse(Some(" Epic ")), Facet::Only("Epic".into()));
    assert_eq!("category".parse::<GroupMode>().unwrap(), GroupMode::Theme);
    assert!("nope".parse::<GroupMode>().is_err());
  }

  #[test]
  fn switching_mode_resets_group() {
    let mut sel = FacetSelection::for_theme("Bandits");
    sel.set_mode(GroupMode::Brawler);
    assert_eq!(sel.group, Facet::All);
  }
}
