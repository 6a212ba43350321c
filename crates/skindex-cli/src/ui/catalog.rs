//! Catalog pane; left panel.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use skindex_core::{rarity::rarity_class, store::Backend, view::CardView};

use crate::app::{App, Row};

/// Display color for a rarity label.
pub fn rarity_color(rarity: &str) -> Color {
  match rarity_class(rarity) {
    Some("rarity-rare") => Color::Green,
    Some("rarity-super-rare") => Color::Blue,
    Some("rarity-epic") => Color::Magenta,
    Some("rarity-mythic") => Color::Red,
    Some("rarity-legendary") => Color::Yellow,
    Some("rarity-hypercharge") => Color::LightMagenta,
    Some("rarity-silver") => Color::Gray,
    Some("rarity-gold") => Color::LightYellow,
    _ => Color::DarkGray,
  }
}

fn card_item(card: &CardView) -> ListItem<'static> {
  let mark = match (card.editable, card.owned) {
    (_, true) => Span::styled("[x] ", Style::default().fg(Color::Green)),
    (true, false) => Span::raw("[ ] "),
    (false, false) => Span::raw("    "),
  };
  ListItem::new(Line::from(vec![
    mark,
    Span::raw(card.name.clone()),
    Span::styled(format!("  {}", card.brawler), Style::default().fg(Color::DarkGray)),
    Span::styled(format!("  {}", card.rarity), Style::default().fg(rarity_color(&card.rarity))),
  ]))
}

fn header_item(theme: &str, owned: usize, total: usize, collapsed: bool) -> ListItem<'static> {
  let arrow = if collapsed { "▸ " } else { "▾ " };
  ListItem::new(Line::from(vec![
    Span::styled(
      format!("{arrow}{theme}"),
      Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ),
    Span::styled(format!("  {owned}/{total}"), Style::default().fg(Color::DarkGray)),
  ]))
}

/// Render the catalog list into `area`.
pub fn draw<B: Backend>(f: &mut Frame, area: Rect, app: &App<B>) {
  let shown = app.rows.ready();
  let loading = if app.rows.is_done() { "" } else { " …" };
  let title = format!(" Catalog ({}{loading}) ", app.rows.total());

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let mut inner = block.inner(area);
  f.render_widget(block, area);

  // Search bar along the bottom edge while a query is typed or set.
  let query = &app.selection.query;
  if (app.search_active || !query.is_empty()) && inner.height > 2 {
    let bar = Rect { y: inner.y + inner.height - 1, height: 1, ..inner };
    inner.height -= 1;
    let text = if app.search_active { format!("/{query}_") } else { format!("/{query}") };
    f.render_widget(Paragraph::new(text).style(Style::default().fg(Color::Yellow)), bar);
  }

  if app.rows.total() == 0 {
    f.render_widget(
      Paragraph::new("No results.").style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  let items: Vec<ListItem> = shown
    .iter()
    .map(|row| match row {
      Row::Header { theme, owned, total, collapsed } => {
        header_item(theme, *owned, *total, *collapsed)
      }
      Row::Card(card) => card_item(card),
    })
    .collect();

  let mut state = ListState::default();
  state.select(Some(app.cursor));

  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner,
    &mut state,
  );
}
