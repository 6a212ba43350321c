//! Locale-aware string ordering for catalog labels.
//!
//! Labels are mostly French. Comparison is done in three passes: first on a
//! folded key (lower case, accents removed), then accents, then case. This
//! puts "Épique" next to "Epic" instead of after "Zeta".

use std::cmp::Ordering;

/// Map a character to its unaccented lower-case base letter(s).
fn fold_char(c: char, out: &mut String) {
  let base = match c {
    'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
    'ç' | 'Ç' => 'c',
    'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
    'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
    'ñ' | 'Ñ' => 'n',
    'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'o',
    'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
    'ý' | 'ÿ' | 'Ý' | 'Ÿ' => 'y',
    'æ' | 'Æ' => {
      out.push_str("ae");
      return;
    }
    'œ' | 'Œ' => {
      out.push_str("oe");
      return;
    }
    _ => {
      out.extend(c.to_lowercase());
      return;
    }
  };
  out.push(base);
}

/// Primary collation key.
pub fn fold(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    fold_char(c, &mut out);
  }
  out
}

/// Compare two labels the way a French-locale `localeCompare` would order
/// them for display.
pub fn compare(a: &str, b: &str) -> Ordering {
  fold(a)
    .cmp(&fold(b))
    .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
    // Lower case first on an exact tie, as locale collators do.
    .then_with(|| b.cmp(a))
}
