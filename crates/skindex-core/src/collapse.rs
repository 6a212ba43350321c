//! Collapsed/expanded state of theme sections, keyed by theme label.
//!
//! Front-ends inject an implementation; the CLI persists it to a JSON file so
//! the state survives restarts.

use std::collections::HashMap;

/// Theme label → collapsed flag.
pub trait CollapseState {
  /// Stored flag for `theme`, if any.
  fn get(&self, theme: &str) -> Option<bool>;

  fn set(&mut self, theme: &str, collapsed: bool);

  /// Whether `theme` is collapsed. Themes never toggled start collapsed so
  /// their cards are only built on demand.
  fn is_collapsed(&self, theme: &str) -> bool { self.get(theme).unwrap_or(true) }

  /// Flip `theme` and return the new flag.
  fn toggle(&mut self, theme: &str) -> bool {
    let next = !self.is_collapsed(theme);
    self.set(theme, next);
    next
  }
}

/// Non-persistent state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollapseState {
  flags: HashMap<String, bool>,
}

impl MemoryCollapseState {
  /// State where every theme is expanded unless set otherwise.
  pub fn expanded() -> ExpandAll { ExpandAll }
}

impl CollapseState for MemoryCollapseState {
  fn get(&self, theme: &str) -> Option<bool> { self.flags.get(theme).copied() }

  fn set(&mut self, theme: &str, collapsed: bool) {
    self.flags.insert(theme.to_owned(), collapsed);
  }
}

/// Every theme expanded; writes are ignored. Used for one-shot listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandAll;

impl CollapseState for ExpandAll {
  fn get(&self, _theme: &str) -> Option<bool> { Some(false) }

  fn set(&mut self, _theme: &str, _collapsed: bool) {}
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_themes_start_collapsed_and_toggle() {
    let mut state = MemoryCollapseState::default();
    assert!(state.is_collapsed("Bandits"));
    assert!(!state.toggle("Bandits"));
    assert!(!state.is_collapsed("Bandits"));
    assert!(state.toggle("Bandits"));
    assert!(state.is_collapsed("Halloween"));
  }

  #[test]
  fn expand_all_ignores_writes() {
    let mut state = MemoryCollapseState::expanded();
    state.set("Bandits", true);
    assert!(!state.is_collapsed("Bandits"));
  }
}
