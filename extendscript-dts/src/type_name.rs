//! Source-vocabulary type-name normalization.
//!
//! The upstream XML spells types in a prose vocabulary (`Number`, `Array of
//! Reals`, `Unit (0 - 8640 points)`, ...). This module maps that vocabulary
//! onto target-language type names through a fixed rewrite table, applied
//! recursively for `Array of X` forms. Normalization is idempotent: every
//! output is a fixed point of the table.

use crate::defs::TypeRef;
use once_cell::sync::Lazy;
use regex::Regex;

static ENUMERATOR_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*enumerators?$").unwrap());
static UNIT_OR_REAL: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(Unit|Real)(\s*\([\d.]+ - [\d.]+( points)?\))?$").unwrap());
static TWO_REALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Arrays? of 2 Reals$").unwrap());
static THREE_REALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Arrays? of 3 Reals$").unwrap());
static SIX_REALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Arrays? of 6 Reals$").unwrap());
static TWO_UNITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Arrays? of 2 Units$").unwrap());
static TWO_STRINGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Arrays? of 2 Strings$").unwrap());
static SHORT_OR_LONG_INT: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(Short|Long) Integers?$").unwrap());
static ARRAY_OF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Array of (.+?)s?$").unwrap());

/// Whether the rewrite forces the array flag on, off, or leaves it alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArrayEffect {
  Keep,
  Set,
  Clear,
}

/// Normalize a type reference in place, rewriting its name and adjusting the
/// array flag where the table demands it.
pub fn normalize_type(t: &mut TypeRef) {
  let (name, effect) = normalize_name(&t.name);
  t.name = name;
  match effect {
    ArrayEffect::Keep => {}
    ArrayEffect::Set => t.is_array = true,
    ArrayEffect::Clear => t.is_array = false,
  }
}

fn normalize_name(raw: &str) -> (String, ArrayEffect) {
  let mut name = raw.trim();
  name = name.strip_suffix('.').unwrap_or(name);
  let stripped = ENUMERATOR_SUFFIX.replace(name, "");
  let name = stripped.trim();

  match name {
    "varies=any" | "Any" => return ("any".into(), ArrayEffect::Keep),
    "Undefined" => return ("undefined".into(), ArrayEffect::Keep),
    "Object" => return ("object".into(), ArrayEffect::Keep),
    "String" => return ("string".into(), ArrayEffect::Keep),
    "Boolean" | "bool" => return ("boolean".into(), ArrayEffect::Keep),
    "Number" | "int" | "Int32" | "uint" => return ("number".into(), ArrayEffect::Keep),
    "Array of 4 Units (0 - 8640 points)" => {
      return ("[number, number, number, number]".into(), ArrayEffect::Clear)
    }
    "Array of Reals" => return ("number".into(), ArrayEffect::Set),
    "Swatche" => return ("Swatch".into(), ArrayEffect::Keep),
    "JavaScript Function" => return ("Function".into(), ArrayEffect::Keep),
    _ => {}
  }

  if UNIT_OR_REAL.is_match(name) || SHORT_OR_LONG_INT.is_match(name) {
    return ("number".into(), ArrayEffect::Keep);
  }
  if TWO_REALS.is_match(name) {
    return ("[number, number]".into(), ArrayEffect::Keep);
  }
  if THREE_REALS.is_match(name) {
    return ("[number, number, number]".into(), ArrayEffect::Keep);
  }
  if SIX_REALS.is_match(name) {
    return (
      "[number, number, number, number, number, number]".into(),
      ArrayEffect::Keep,
    );
  }
  if TWO_UNITS.is_match(name) {
    return (
      "[number | string, number | string]".into(),
      ArrayEffect::Keep,
    );
  }
  if TWO_STRINGS.is_match(name) {
    return ("[string, string]".into(), ArrayEffect::Keep);
  }
  if let Some(caps) = ARRAY_OF.captures(name) {
    let (inner, _) = normalize_name(&caps[1]);
    return (inner, ArrayEffect::Set);
  }

  (name.to_string(), ArrayEffect::Keep)
}
