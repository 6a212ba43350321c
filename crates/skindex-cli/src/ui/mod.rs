//! TUI rendering; lays out the panes.

pub mod catalog;
pub mod summary;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};
use skindex_core::{facet::GroupMode, store::Backend};

use crate::app::App;

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw<B: Backend>(f: &mut Frame, app: &App<B>) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);
  draw_body(f, rows[1], app);
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header<B: Backend>(f: &mut Frame, area: Rect, app: &App<B>) {
  let (text, bg) = match &app.degraded {
    Some(err) => (format!(" skindex  catalog unavailable: {err}"), Color::Red),
    None => {
      let who = app
        .collection
        .user()
        .map(|u| u.label().to_owned())
        .unwrap_or_else(|| "not signed in".to_owned());
      let stats = app.collection.stats();
      (
        format!(
          " skindex  {who}  {}/{} owned ({}%)",
          stats.owned, stats.total, stats.percent_owned
        ),
        Color::DarkGray,
      )
    }
  };

  let left = Span::styled(
    text,
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{} ", Local::now().format("%Y-%m-%d")),
    Style::default().fg(Color::Gray),
  );

  let pad = area
    .width
    .saturating_sub(left.width() as u16)
    .saturating_sub(right.width() as u16);

  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);

  let block = Block::default().style(Style::default().bg(bg));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_body<B: Backend>(f: &mut Frame, area: Rect, app: &App<B>) {
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
    .split(area);

  catalog::draw(f, cols[0], app);
  summary::draw(f, cols[1], app);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status<B: Backend>(f: &mut Frame, area: Rect, app: &App<B>) {
  let (mode_label, hints) = if app.search_active {
    ("SEARCH", "Type to filter  Esc clear  Enter done")
  } else {
    let label = match app.selection.mode {
      GroupMode::Brawler => "BRAWLER",
      GroupMode::Theme => "THEME",
    };
    (
      label,
      "jk move  space own  g group  [ ] filter  r rarity  o owned  / search  Enter fold  R reload  P publish  q quit",
    )
  };

  let status = app.collection.status().unwrap_or_else(|| hints.to_owned());

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(format!("  {status}"), Style::default().fg(Color::DarkGray));

  f.render_widget(
    Paragraph::new(Line::from(vec![mode_span, hint_span])).style(Style::default().bg(Color::Black)),
    area,
  );
}
