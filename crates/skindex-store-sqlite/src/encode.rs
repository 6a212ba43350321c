//! Conversions between core types and the plain values stored in SQLite
//! columns.
//!
//! Timestamps are RFC 3339 strings with a fixed microsecond precision so that
//! ordering by the text column matches chronological order. Booleans are
//! stored as 0/1 integers.

use chrono::{DateTime, SecondsFormat, Utc};
use skindex_core::{catalog::SkinRow, profile::PublicProfile};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── LIKE ────────────────────────────────────────────────────────────────────

/// `%needle%` with LIKE wildcards in `needle` escaped by `\`.
pub fn like_pattern(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len() + 2);
  out.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// Raw values read directly from a `skins` row.
pub struct RawSkin {
  pub id:         String,
  pub name:       Option<String>,
  pub brawler:    Option<String>,
  pub category:   Option<String>,
  pub rarity:     Option<String>,
  pub img_path:   Option<String>,
  pub updated_at: Option<String>,
}

impl RawSkin {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      brawler:    row.get(2)?,
      category:   row.get(3)?,
      rarity:     row.get(4)?,
      img_path:   row.get(5)?,
      updated_at: row.get(6)?,
    })
  }

  pub fn into_row(self) -> Result<SkinRow> {
    Ok(SkinRow {
      id:         Some(self.id),
      name:       self.name,
      brawler:    self.brawler,
      category:   self.category,
      rarity:     self.rarity,
      img_path:   self.img_path,
      updated_at: decode_opt_dt(self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `public_profiles` row.
pub struct RawProfile {
  pub user_id:      String,
  pub display_name: Option<String>,
  pub bio:          Option<String>,
  pub is_public:    i64,
  pub show_owned:   i64,
  pub updated_at:   Option<String>,
}

impl RawProfile {
  pub const COLUMNS: &'static str =
    "user_id, display_name, bio, is_public, show_owned, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      display_name: row.get(1)?,
      bio:          row.get(2)?,
      is_public:    row.get(3)?,
      show_owned:   row.get(4)?,
      updated_at:   row.get(5)?,
    })
  }

  pub fn into_profile(self) -> Result<PublicProfile> {
    Ok(PublicProfile {
      user_id:      self.user_id,
      display_name: self.display_name,
      bio:          self.bio,
      is_public:    self.is_public != 0,
      show_owned:   self.show_owned != 0,
      updated_at:   decode_opt_dt(self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("colt"), "%colt%");
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
  }

  #[test]
  fn timestamps_have_fixed_width() {
    let a = decode_dt("2025-01-01T00:00:00Z").unwrap();
    let b = decode_dt("2025-01-01T00:00:00.5Z").unwrap();
    assert_eq!(encode_dt(a).len(), encode_dt(b).len());
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }
}
