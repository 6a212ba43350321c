//! Application state machine and event dispatcher.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use skindex_core::{
  collapse::CollapseState,
  facet::{self, Facet, FacetSelection},
  session::Collection,
  store::Backend,
  view::{CardView, CatalogView, Progressive},
};

use crate::prefs::JsonCollapseState;

/// Rows revealed per idle tick.
const BATCH: usize = 60;

// ─── Rows ─────────────────────────────────────────────────────────────────────

/// One line of the catalog pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
  /// Theme heading in by-theme mode.
  Header { theme: String, owned: usize, total: usize, collapsed: bool },
  Card(CardView),
}

/// Flatten a view into pane rows.
pub fn rows_of(view: CatalogView) -> Vec<Row> {
  match view {
    CatalogView::Flat(cards) => cards.into_iter().map(Row::Card).collect(),
    CatalogView::Grouped(sections) => {
      let mut rows = Vec::new();
      for s in sections {
        rows.push(Row::Header {
          theme:     s.theme,
          owned:     s.owned,
          total:     s.total,
          collapsed: s.collapsed,
        });
        rows.extend(s.cards.into_iter().flatten().map(Row::Card));
      }
      rows
    }
  }
}

/// Step through `All` followed by `options`, wrapping at both ends.
pub fn cycle(current: &Facet, options: &[String], forward: bool) -> Facet {
  let slots = options.len() + 1;
  let pos = match current {
    Facet::All => 0,
    Facet::Only(v) => options.iter().position(|o| o == v).map_or(0, |i| i + 1),
  };
  let next = if forward { (pos + 1) % slots } else { (pos + slots - 1) % slots };
  match next {
    0 => Facet::All,
    i => Facet::Only(options[i - 1].clone()),
  }
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<B> {
  pub collection: Collection<B>,

  pub selection: FacetSelection,

  /// Collapsed themes, saved across runs.
  pub prefs: JsonCollapseState,

  /// Rows of the current view, revealed a batch per tick.
  pub rows: Progressive<Row>,

  /// Index into `rows.ready()`.
  pub cursor: usize,

  /// Whether the user is typing a search query.
  pub search_active: bool,

  /// Set when the catalog could not be loaded.
  pub degraded: Option<String>,

  /// Public page of the signed-in user, if any.
  pub share_url: Option<String>,
}

impl<B: Backend> App<B> {
  pub fn new(
    collection: Collection<B>,
    prefs: JsonCollapseState,
    degraded: Option<String>,
    share_url: Option<String>,
  ) -> Self {
    let mut app = Self {
      collection,
      selection: FacetSelection::default(),
      prefs,
      rows: Progressive::new(Vec::new(), BATCH),
      cursor: 0,
      search_active: false,
      degraded,
      share_url,
    };
    app.rebuild();
    app
  }

  // ── View ──────────────────────────────────────────────────────────────────

  /// Recompute rows after the selection, ownership or collapse state
  /// changed. The first batch is ready immediately.
  pub fn rebuild(&mut self) {
    let view = self.collection.view(&self.selection, &self.prefs);
    self.rows = Progressive::new(rows_of(view), BATCH);
    self.rows.next_batch();
    self.clamp_cursor();
  }

  /// Reveal one more batch. Returns whether anything changed.
  pub fn tick(&mut self) -> bool { self.rows.next_batch().is_some() }

  fn clamp_cursor(&mut self) {
    let len = self.rows.total();
    self.cursor = if len == 0 { 0 } else { self.cursor.min(len - 1) };
  }

  pub fn cursor_row(&self) -> Option<&Row> { self.rows.ready().get(self.cursor) }

  pub fn cursor_card(&self) -> Option<&CardView> {
    match self.cursor_row()? {
      Row::Card(card) => Some(card),
      Row::Header { .. } => None,
    }
  }

  /// Move down, pulling in the next batch when the cursor reaches the edge.
  fn move_down(&mut self) {
    if self.cursor + 1 >= self.rows.ready().len() {
      self.rows.next_batch();
    }
    if self.cursor + 1 < self.rows.ready().len() {
      self.cursor += 1;
    }
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    if self.search_active {
      self.handle_search_key(key);
      return Ok(true);
    }

    match key.code {
      KeyCode::Char('q') => return Ok(false),

      KeyCode::Down | KeyCode::Char('j') => self.move_down(),
      KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
      KeyCode::Home => self.cursor = 0,

      KeyCode::Char('g') => {
        self.selection.set_mode(self.selection.mode.toggled());
        self.cursor = 0;
        self.rebuild();
      }
      KeyCode::Char(']') | KeyCode::Char('[') => {
        let options = facet::group_options(self.collection.catalog().items(), self.selection.mode);
        self.selection.group = cycle(&self.selection.group, &options, key.code == KeyCode::Char(']'));
        self.cursor = 0;
        self.rebuild();
      }
      KeyCode::Char('r') => {
        let options =
          facet::rarity_options(self.collection.catalog().items(), self.collection.order());
        self.selection.rarity = cycle(&self.selection.rarity, &options, true);
        self.cursor = 0;
        self.rebuild();
      }
      KeyCode::Char('o') => {
        self.selection.only_owned = !self.selection.only_owned;
        self.cursor = 0;
        self.rebuild();
      }
      KeyCode::Char('/') => {
        self.search_active = true;
      }
      KeyCode::Esc => {
        if !self.selection.query.is_empty() {
          self.selection.query.clear();
          self.rebuild();
        }
      }

      KeyCode::Enter => self.toggle_theme(),
      KeyCode::Char(' ') => self.toggle_owned().await,
      KeyCode::Char('R') => self.refresh().await,
      KeyCode::Char('P') => self.publish().await,
      KeyCode::Char('L') => match &self.share_url {
        Some(url) => self.collection.set_status(url.clone()),
        None => self.collection.set_status("Sign in to get a public link."),
      },

      _ => {}
    }
    Ok(true)
  }

  fn handle_search_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.search_active = false;
        self.selection.query.clear();
      }
      KeyCode::Enter => {
        self.search_active = false;
        return;
      }
      KeyCode::Backspace => {
        self.selection.query.pop();
      }
      KeyCode::Char(c) => self.selection.query.push(c),
      _ => return,
    }
    self.cursor = 0;
    self.rebuild();
  }

  // ── Actions ───────────────────────────────────────────────────────────────

  /// Collapse or expand the theme under the cursor.
  fn toggle_theme(&mut self) {
    let theme = match self.cursor_row() {
      Some(Row::Header { theme, .. }) => theme.clone(),
      Some(Row::Card(card)) if self.selection.mode == facet::GroupMode::Theme => card.theme.clone(),
      _ => return,
    };
    self.prefs.toggle(&theme);
    self.rebuild();
    // Keep the cursor on the heading that was toggled.
    if let Some(pos) = self
      .rows
      .ready()
      .iter()
      .position(|r| matches!(r, Row::Header { theme: t, .. } if *t == theme))
    {
      self.cursor = pos;
    }
  }

  async fn toggle_owned(&mut self) {
    let Some(card) = self.cursor_card().cloned() else {
      return;
    };
    if !card.editable {
      self.collection.set_status("Sign in to track your collection.");
      return;
    }
    // Failures are already on the status line.
    if let Ok(owned) = self.collection.set_owned(&card.id, !card.owned).await {
      let verb = if owned { "Owned" } else { "Not owned" };
      self.collection.set_status(format!("{verb}: {}", card.name));
      self.rebuild();
    }
  }

  async fn refresh(&mut self) {
    match self.collection.refresh().await {
      Ok(()) => self.collection.set_status("Collection reloaded."),
      Err(e) if e.is_stale() => return,
      Err(_) => {}
    }
    self.rebuild();
  }

  async fn publish(&mut self) {
    let draft = match self.collection.draft() {
      Ok(draft) => draft,
      Err(e) => {
        self.collection.set_status(e.to_string());
        return;
      }
    };
    if let Err(e) = self.collection.publish(draft).await {
      tracing::warn!(error = %e, "publish failed");
    }
    self.rebuild();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use skindex_core::{
    auth::User,
    catalog::{CatalogSource, SkinRow},
    facet::GroupMode,
    rarity::RarityOrder,
  };
  use skindex_store_sqlite::SqliteStore;

  use super::*;

  fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  fn row(id: &str, brawler: &str, theme: &str, rarity: &str) -> SkinRow {
    SkinRow {
      id: Some(id.into()),
      name: Some(format!("{id} skin")),
      brawler: Some(brawler.into()),
      category: Some(theme.into()),
      rarity: Some(rarity.into()),
      ..Default::default()
    }
  }

  async fn app(dir: &tempfile::TempDir, user: Option<&str>) -> App<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .import_skins(vec![
        row("a", "Colt", "Bandits", "Rare"),
        row("b", "Colt", "Bandits", "Epic"),
        row("c", "Shelly", "Halloween", "Rare"),
      ])
      .await
      .unwrap();
    let backend = Arc::new(store);
    let catalog = CatalogSource::new(backend.clone()).ready().await;
    let collection = Collection::new(backend, catalog, RarityOrder::default());
    if let Some(id) = user {
      collection.sign_in(User::new(id, None)).await.unwrap();
    }
    let prefs = JsonCollapseState::load(dir.path().join("collapsed.json"));
    App::new(collection, prefs, None, None)
  }

  #[test]
  fn cycle_wraps_through_all() {
    let opts = vec!["Colt".to_owned(), "Shelly".to_owned()];
    let next = cycle(&Facet::All, &opts, true);
    assert_eq!(next, Facet::Only("Colt".into()));
    assert_eq!(cycle(&Facet::Only("Shelly".into()), &opts, true), Facet::All);
    assert_eq!(cycle(&Facet::All, &opts, false), Facet::Only("Shelly".into()));
    assert_eq!(cycle(&Facet::Only("gone".into()), &opts, true), Facet::Only("Colt".into()));
  }

  #[test]
  fn progressive_reveal_is_batched() {
    let rows: Vec<Row> = (0..BATCH + 5)
      .map(|i| Row::Header { theme: i.to_string(), owned: 0, total: 0, collapsed: true })
      .collect();
    let mut p = Progressive::new(rows, BATCH);
    assert_eq!(p.next_batch().map(<[Row]>::len), Some(BATCH));
    assert_eq!(p.next_batch().map(<[Row]>::len), Some(5));
    assert!(p.is_done());
  }

  #[tokio::test]
  async fn space_toggles_ownership_of_the_card_under_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir, Some("local")).await;
    assert!(app.cursor_card().is_some());

    let id = app.cursor_card().map(|c| c.id.clone()).unwrap();
    app.handle_key(key(KeyCode::Char(' '))).await.unwrap();
    assert!(app.collection.owned().contains(&id));
    assert!(app.cursor_card().unwrap().owned);
    assert_eq!(app.collection.stats().owned, 1);
  }

  #[tokio::test]
  async fn signed_out_cards_are_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir, None).await;
    app.handle_key(key(KeyCode::Char(' '))).await.unwrap();
    assert!(app.collection.owned().is_empty());
    assert_eq!(app.collection.status().as_deref(), Some("Sign in to track your collection."));
  }

  #[tokio::test]
  async fn theme_mode_starts_collapsed_and_enter_expands() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir, Some("local")).await;
    app.handle_key(key(KeyCode::Char('g'))).await.unwrap();
    assert_eq!(app.selection.mode, GroupMode::Theme);
    assert_eq!(app.rows.total(), 2);

    app.handle_key(key(KeyCode::Enter)).await.unwrap();
    assert_eq!(app.rows.total(), 4);
    assert!(matches!(app.cursor_row(), Some(Row::Header { theme, collapsed: false, .. }) if theme == "Bandits"));

    // Collapse state is persisted.
    let reloaded = JsonCollapseState::load(dir.path().join("collapsed.json"));
    assert!(!reloaded.is_collapsed("Bandits"));
  }

  #[tokio::test]
  async fn search_typing_filters_live() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir, None).await;
    for code in [KeyCode::Char('/'), KeyCode::Char('h'), KeyCode::Char('a'), KeyCode::Char('l')] {
      app.handle_key(key(code)).await.unwrap();
    }
    assert!(app.search_active);
    assert_eq!(app.rows.total(), 1);

    app.handle_key(key(KeyCode::Esc)).await.unwrap();
    assert!(!app.search_active);
    assert_eq!(app.rows.total(), 3);
  }

  #[tokio::test]
  async fn facet_keys_narrow_the_list() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir, Some("local")).await;

    app.handle_key(key(KeyCode::Char(']'))).await.unwrap();
    assert_eq!(app.selection.group, Facet::Only("Colt".into()));
    assert_eq!(app.rows.total(), 2);

    app.handle_key(key(KeyCode::Char('r'))).await.unwrap();
    assert_eq!(app.selection.rarity, Facet::Only("Rare".into()));
    assert_eq!(app.rows.total(), 1);

    app.handle_key(key(KeyCode::Char('o'))).await.unwrap();
    assert_eq!(app.rows.total(), 0);
    assert!(app.cursor_row().is_none());
  }

  #[tokio::test]
  async fn publish_key_reports_on_status_line() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir, Some("local")).await;
    app.handle_key(key(KeyCode::Char(' '))).await.unwrap();
    app.handle_key(key(KeyCode::Char('P'))).await.unwrap();
    assert_eq!(app.collection.status().as_deref(), Some("Published 1 item(s)."));
  }
}
