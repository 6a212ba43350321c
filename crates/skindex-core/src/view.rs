//! Declarative view-model: turns (catalog, ownership, selection) into rows a
//! front-end can paint without any further logic.

use serde::Serialize;

use crate::{
  catalog::{Catalog, CatalogItem},
  collapse::CollapseState,
  facet::{self, Facet, FacetSelection, GroupMode},
  ownership::OwnershipSet,
  rarity::{rarity_class, RarityOrder},
};

// ─── Rows ────────────────────────────────────────────────────────────────────

/// One item card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
  pub id:           String,
  pub name:         String,
  pub brawler:      String,
  pub theme:        String,
  pub rarity:       String,
  pub rarity_class: Option<&'static str>,
  pub image_url:    String,
  pub owned:        bool,
  /// Whether the ownership toggle is enabled (a user is signed in).
  pub editable:     bool,
}

impl CardView {
  pub fn new(item: &CatalogItem, owned: bool, editable: bool) -> Self {
    Self {
      id: item.id.clone(),
      name: item.name.clone(),
      brawler: item.brawler.clone(),
      theme: facet::theme_of(item).to_owned(),
      rarity: item.rarity.clone(),
      rarity_class: rarity_class(&item.rarity),
      image_url: item.image_url.clone(),
      owned,
      editable,
    }
  }
}

/// A theme header with its cards. `cards` is `None` while collapsed; cards
/// are only built for expanded sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeSection {
  pub theme:     String,
  pub total:     usize,
  pub owned:     usize,
  pub collapsed: bool,
  pub cards:     Option<Vec<CardView>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", content = "rows", rename_all = "snake_case")]
pub enum CatalogView {
  /// By-brawler mode: cards in catalog order.
  Flat(Vec<CardView>),
  /// By-theme mode: locale-sorted sections.
  Grouped(Vec<ThemeSection>),
}

impl CatalogView {
  /// Number of items matching the selection, collapsed sections included.
  pub fn result_count(&self) -> usize {
    match self {
      Self::Flat(cards) => cards.len(),
      Self::Grouped(sections) => sections.iter().map(|s| s.total).sum(),
    }
  }
}

// ─── Render ──────────────────────────────────────────────────────────────────

pub fn render(
  items: &[CatalogItem],
  owned: &OwnershipSet,
  selection: &FacetSelection,
  order: &RarityOrder,
  editable: bool,
  collapse: &dyn CollapseState,
) -> CatalogView {
  let matching = facet::filter(items, selection, owned);

  match selection.mode {
    GroupMode::Brawler => CatalogView::Flat(
      matching
        .into_iter()
        .map(|item| CardView::new(item, owned.contains(&item.id), editable))
        .collect(),
    ),
    GroupMode::Theme => CatalogView::Grouped(
      facet::group_by_theme(matching, order)
        .into_iter()
        .map(|group| {
          let collapsed = collapse.is_collapsed(&group.theme);
          let owned_count = group.items.iter().filter(|i| owned.contains(&i.id)).count();
          let cards = (!collapsed).then(|| {
            group
              .items
              .iter()
              .map(|item| CardView::new(item, owned.contains(&item.id), editable))
              .collect()
          });
          ThemeSection {
            total: group.items.len(),
            owned: owned_count,
            collapsed,
            cards,
            theme: group.theme,
          }
        })
        .collect(),
    ),
  }
}

/// Cards for a published snapshot: unknown ids get placeholders, then the
/// rarity facet and text query apply, sorted by rarity then name.
pub fn profile_cards(
  catalog: &Catalog,
  ids: &[String],
  rarity: &Facet,
  query: &str,
  order: &RarityOrder,
) -> Vec<CardView> {
  let items: Vec<CatalogItem> = ids.iter().map(|id| catalog.get_or_placeholder(id)).collect();
  let mut shown = facet::filter_rarity_text(&items, rarity, query);
  shown.sort_by(|a, b| facet::compare_rarity_then_name(a, b, order));
  shown
    .into_iter()
    .map(|item| CardView::new(item, true, false))
    .collect()
}

// ─── Progressive ─────────────────────────────────────────────────────────────

/// Hands out a prepared list in fixed-size batches so large views can be
/// painted a slice per frame.
#[derive(Debug, Clone)]
pub struct Progressive<T> {
  items:  Vec<T>,
  cursor: usize,
  batch:  usize,
}

impl<T> Progressive<T> {
  pub const DEFAULT_BATCH: usize = 120;

  pub fn new(items: Vec<T>, batch: usize) -> Self {
    Self { items, cursor: 0, batch: batch.max(1) }
  }

  /// The next batch, or `None` once everything has been handed out.
  pub fn next_batch(&mut self) -> Option<&[T]> {
    if self.cursor >= self.items.len() {
      return None;
    }
    let start = self.cursor;
    self.cursor = (start + self.batch).min(self.items.len());
    Some(&self.items[start..self.cursor])
  }

  /// Everything handed out so far.
  pub fn ready(&self) -> &[T] { &self.items[..self.cursor] }

  pub fn is_done(&self) -> bool { self.cursor >= self.items.len() }

  pub fn total(&self) -> usize { self.items.len() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::collapse::MemoryCollapseState;

  fn item(id: &str, brawler: &str, theme: &str, rarity: &str) -> CatalogItem {
    CatalogItem {
      id:         id.into(),
      name:       id.into(),
      brawler:    brawler.into(),
      category:   theme.into(),
      rarity:     rarity.into(),
      image_url:  String::new(),
      updated_at: None,
    }
  }

  fn catalog() -> Vec<CatalogItem> {
    vec![
      item("colt_outlaw", "Colt", "Bandits", "Epic"),
      item("shelly_bandit", "Shelly", "Bandits", "Rare"),
      item("shelly_star", "Shelly", "Anniversaire", "Rare"),
    ]
  }

  #[test]
  fn flat_view_keeps_catalog_order_and_marks_owned() {
    let owned: OwnershipSet = ["shelly_star"].into_iter().collect();
    let view = render(
      &catalog(),
      &owned,
      &FacetSelection::default(),
      &RarityOrder::default(),
      true,
      &MemoryCollapseState::default(),
    );
    let CatalogView::Flat(cards) = view else { panic!("expected flat view") };
    let ids: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["colt_outlaw", "shelly_bandit", "shelly_star"]);
    assert!(cards[2].owned && cards[2].editable);
    assert_eq!(cards[0].rarity_class, Some("rarity-epic"));
  }

  #[test]
  fn collapsed_sections_build_no_cards() {
    let owned: OwnershipSet = ["colt_outlaw"].into_iter().collect();
    let mut collapse = MemoryCollapseState::default();
    collapse.set("Bandits", false);

    let sel = FacetSelection { mode: GroupMode::Theme, ..Default::default() };
    let view = render(&catalog(), &owned, &sel, &RarityOrder::default(), false, &collapse);
    assert_eq!(view.result_count(), 3);

    let CatalogView::Grouped(sections) = view else { panic!("expected sections") };
    assert_eq!(sections[0].theme, "Anniversaire");
    assert!(sections[0].collapsed);
    assert!(sections[0].cards.is_none());

    let bandits = &sections[1];
    assert_eq!((bandits.total, bandits.owned), (2, 1));
    let cards = bandits.cards.as_ref().unwrap();
    // Rare before Epic inside a theme.
    assert_eq!(cards[0].id, "shelly_bandit");
    assert!(!cards[0].editable);
  }

  #[test]
  fn profile_cards_use_placeholders_and_rarity_order() {
    let catalog = Catalog::new(catalog());
    let ids = vec!["colt_outlaw".to_owned(), "gone".to_owned(), "shelly_star".to_owned()];

    let cards = profile_cards(&catalog, &ids, &Facet::All, "", &RarityOrder::default());
    let names: Vec<&str> = cards.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["shelly_star", "colt_outlaw", "gone"]);

    let epic = profile_cards(
      &catalog,
      &ids,
      &Facet::Only("Epic".into()),
      "",
      &RarityOrder::default(),
    );
    assert_eq!(epic.len(), 1);
  }

  #[test]
  fn progressive_batches() {
    let mut p = Progressive::new((0..5).collect::<Vec<_>>(), 2);
    assert_eq!(p.next_batch(), Some(&[0, 1][..]));
    assert_eq!(p.next_batch(), Some(&[2, 3][..]));
    assert!(!p.is_done());
    assert_eq!(p.next_batch(), Some(&[4][..]));
    assert!(p.is_done());
    assert_eq!(p.next_batch(), None);
    assert_eq!(p.ready().len(), 5);
  }
}
