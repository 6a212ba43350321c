//! Summary pane; right panel. Active filters, the card under the cursor and
//! per-rarity counts.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};
use skindex_core::{facet::Facet, store::Backend};

use super::catalog::rarity_color;
use crate::app::App;

fn label(key: &str, value: String) -> Line<'static> {
  Line::from(vec![
    Span::styled(format!("{key:<10}"), Style::default().fg(Color::DarkGray)),
    Span::raw(value),
  ])
}

fn facet_text(facet: &Facet) -> String {
  facet.as_option().unwrap_or("all").to_owned()
}

pub fn draw<B: Backend>(f: &mut Frame, area: Rect, app: &App<B>) {
  let block = Block::default()
    .title(" Summary ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let sel = &app.selection;
  let bold = Style::default().add_modifier(Modifier::BOLD);
  let mut lines = vec![
    Line::from(Span::styled("Filters", bold)),
    label("group by", sel.mode.to_string()),
    label(&sel.mode.to_string(), facet_text(&sel.group)),
    label("rarity", facet_text(&sel.rarity)),
    label("owned", if sel.only_owned { "only".into() } else { "any".into() }),
    Line::from(""),
  ];

  if let Some(card) = app.cursor_card() {
    lines.push(Line::from(Span::styled(card.name.clone(), bold)));
    lines.push(label("brawler", card.brawler.clone()));
    lines.push(label("theme", card.theme.clone()));
    lines.push(Line::from(vec![
      Span::styled(format!("{:<10}", "rarity"), Style::default().fg(Color::DarkGray)),
      Span::styled(card.rarity.clone(), Style::default().fg(rarity_color(&card.rarity))),
    ]));
    lines.push(label("owned", if card.owned { "yes".into() } else { "no".into() }));
    lines.push(label("image", card.image_url.clone()));
    lines.push(Line::from(""));
  }

  let stats = app.collection.stats();
  lines.push(Line::from(Span::styled("Owned by rarity", bold)));
  for (rarity, count) in stats.owned_by_rarity.iter().filter(|(_, n)| *n > 0) {
    lines.push(Line::from(vec![
      Span::styled(format!("{rarity:<12}"), Style::default().fg(rarity_color(rarity))),
      Span::raw(count.to_string()),
    ]));
  }

  if let Some(url) = &app.share_url {
    lines.push(Line::from(""));
    lines.push(label("public", url.clone()));
  }

  f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}
