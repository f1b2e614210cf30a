//! Binary-blob string indexing.
//!
//! Native library files carry the ground-truth strings for parameter names
//! and descriptions as null-terminated text scattered through the byte
//! stream. Each blob is scanned exactly once; every plausible string is
//! recorded with its byte offset and scan ordinal, and indexed by exact text.
//! Entries borrow directly out of the blob bytes, so the index never copies
//! string data.

use ahash::AHashMap;

/// Candidate strings longer than this are discarded outright.
pub(crate) const MAX_STRING_LEN: usize = 500;

/// Identifiers longer than this never participate in `name: description`
/// matching.
pub(crate) const MAX_IDENT_LEN: usize = 50;

/// A named binary blob, as handed to [`crate::convert`].
#[derive(Clone, Debug)]
pub struct Blob {
  pub name: String,
  pub bytes: Vec<u8>,
}

impl Blob {
  pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
    Blob {
      name: name.into(),
      bytes,
    }
  }
}

/// A candidate text string recovered from a blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringEntry<'a> {
  pub text: &'a str,
  /// Byte offset of the first byte of the string in the blob.
  pub offset: usize,
  /// Position in the indexed sequence (scan order).
  pub ordinal: usize,
}

/// The per-blob string index: ordinal sequence plus exact-text lookup.
pub struct BlobIndex<'a> {
  pub name: &'a str,
  entries: Vec<StringEntry<'a>>,
  by_text: AHashMap<&'a str, Vec<usize>>,
}

impl<'a> BlobIndex<'a> {
  /// Scan a blob in a single linear pass.
  ///
  /// Every maximal run of non-zero bytes with length in `[1, 500)` is a
  /// candidate; candidates that fail UTF-8 decoding or the plausible-text
  /// filter are skipped without aborting the scan.
  pub fn scan(blob: &'a Blob) -> Self {
    let bytes = &blob.bytes;
    let mut entries = Vec::new();
    let mut by_text: AHashMap<&'a str, Vec<usize>> = AHashMap::new();

    let mut pos = 0;
    while pos < bytes.len() {
      if bytes[pos] == 0 {
        pos += 1;
        continue;
      }
      let start = pos;
      while pos < bytes.len() && bytes[pos] != 0 {
        pos += 1;
      }
      let run = &bytes[start..pos];
      if run.len() >= MAX_STRING_LEN {
        continue;
      }
      let Ok(text) = std::str::from_utf8(run) else {
        continue;
      };
      if !looks_like_text(text) {
        continue;
      }
      let ordinal = entries.len();
      entries.push(StringEntry {
        text,
        offset: start,
        ordinal,
      });
      by_text.entry(text).or_default().push(ordinal);
    }

    BlobIndex {
      name: &blob.name,
      entries,
      by_text,
    }
  }

  pub fn entries(&self) -> &[StringEntry<'a>] {
    &self.entries
  }

  pub fn entry(&self, ordinal: usize) -> Option<&StringEntry<'a>> {
    self.entries.get(ordinal)
  }

  /// First entry whose text is exactly `text`, in scan order.
  pub fn find_first(&self, text: &str) -> Option<&StringEntry<'a>> {
    let ordinals = self.by_text.get(text)?;
    self.entries.get(*ordinals.first()?)
  }
}

/// At least 80% of the characters must be ASCII printable, tab, newline,
/// carriage return, or beyond codepoint 160.
fn looks_like_text(text: &str) -> bool {
  let mut total = 0usize;
  let mut good = 0usize;
  for c in text.chars() {
    total += 1;
    let code = c as u32;
    if (32..127).contains(&code) || matches!(c, '\t' | '\n' | '\r') || code > 160 {
      good += 1;
    }
  }
  total == 0 || good * 100 >= total * 80
}

/// Split `name: description` text observed in a blob.
///
/// The identifier portion must be non-empty, contain no whitespace, and fit
/// within [`MAX_IDENT_LEN`]. The description is returned trimmed.
pub(crate) fn split_name_desc(text: &str) -> Option<(&str, &str)> {
  let colon = text.find(':')?;
  let ident = &text[..colon];
  if ident.is_empty() || ident.len() > MAX_IDENT_LEN {
    return None;
  }
  if ident.chars().any(char::is_whitespace) {
    return None;
  }
  Some((ident, text[colon + 1..].trim()))
}

/// `name → description` dictionary built from `name: description`
/// observations.
#[derive(Default)]
pub struct ParamCache<'a> {
  map: AHashMap<&'a str, &'a str>,
}

impl<'a> ParamCache<'a> {
  /// Collect every `name: description` entry of one blob. A duplicate
  /// identifier keeps the longer description.
  pub fn from_index(index: &BlobIndex<'a>) -> Self {
    let mut map: AHashMap<&'a str, &'a str> = AHashMap::new();
    for entry in index.entries() {
      let Some((name, desc)) = split_name_desc(entry.text) else {
        continue;
      };
      map
        .entry(name)
        .and_modify(|existing| {
          if desc.len() > existing.len() {
            *existing = desc;
          }
        })
        .or_insert(desc);
    }
    ParamCache { map }
  }

  /// Merge `other` into `self`, keeping already-present entries
  /// (first-seen-wins across blobs).
  pub fn absorb(&mut self, other: ParamCache<'a>) {
    for (name, desc) in other.map {
      self.map.entry(name).or_insert(desc);
    }
  }

  pub fn get(&self, name: &str) -> Option<&'a str> {
    self.map.get(name).copied()
  }

  /// Both the cached key and its description, borrowed from the blob.
  pub fn entry(&self, name: &str) -> Option<(&'a str, &'a str)> {
    self.map.get_key_value(name).map(|(k, v)| (*k, *v))
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }
}
