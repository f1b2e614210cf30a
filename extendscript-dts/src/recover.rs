//! The two-stage recovery engine.
//!
//! The XML tells us which methods and parameters exist; the binary blobs
//! hold the strings the generator destroyed. For every method we locate its
//! name in a blob's string index, read the bounded window of strings just
//! before it (parameter descriptions precede their method in the binary,
//! last parameter nearest), and cross-reference the `name: description`
//! observations against the XML parameter list: adopting descriptions,
//! renaming placeholders, and deleting the spurious parameters a comma-split
//! bug introduced.
//!
//! Running the engine twice is a no-op: every repair either leaves a field
//! alone or writes the value it would write again.

use crate::binary::{split_name_desc, Blob, BlobIndex, ParamCache, StringEntry};
use crate::defs::PropertyKind;
use crate::xml::{ParsedDefinition, ParsedProperty};
use once_cell::sync::Lazy;
use regex::Regex;

/// Entries further than this many bytes before the method name are outside
/// the local window.
const LOCAL_WINDOW_BYTES: usize = 500;

/// Minimum length for a string to qualify as a method description.
const MIN_METHOD_DESC_LEN: usize = 15;

static PLACEHOLDER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(arg|uArg)\d+$").unwrap());

/// Where a `name: description` observation came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchSource {
  /// Position in the local window; 0 is the entry immediately left of the
  /// method name (the *last* parameter).
  Local(usize),
  ClassCache,
  GlobalCache,
}

/// One `name: description` observation usable for repairing a parameter.
#[derive(Clone, Copy, Debug)]
pub struct ParamMatch<'a> {
  pub name: &'a str,
  pub desc: &'a str,
  pub source: MatchSource,
}

/// Everything stage 1 recovered for one method.
#[derive(Debug, Default)]
pub struct BinaryMethodInfo<'a> {
  pub params: Vec<ParamMatch<'a>>,
  pub method_desc: Option<&'a str>,
}

/// Counters for the informational conversion summary. Logging only; the
/// counters never influence output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecoveryStats {
  pub methods_located: usize,
  pub names_repaired: usize,
  pub descriptions_adopted: usize,
  pub params_removed: usize,
  pub method_descs_recovered: usize,
}

/// Indexes every blob once and repairs definitions in place.
pub struct RecoveryEngine<'a> {
  indexes: Vec<BlobIndex<'a>>,
  master: ParamCache<'a>,
}

impl<'a> RecoveryEngine<'a> {
  pub fn new(blobs: &'a [Blob]) -> Self {
    let indexes: Vec<BlobIndex<'a>> = blobs.iter().map(BlobIndex::scan).collect();
    let mut master = ParamCache::default();
    for index in &indexes {
      master.absorb(ParamCache::from_index(index));
    }
    tracing::debug!(
      target: "extendscript_dts::recover",
      blobs = indexes.len(),
      cache_entries = master.len(),
      "built binary string indexes"
    );
    RecoveryEngine { indexes, master }
  }

  pub fn repair(&self, defs: &mut [ParsedDefinition]) -> RecoveryStats {
    let mut stats = RecoveryStats::default();
    for def in defs.iter_mut() {
      for member in def.members.iter_mut() {
        if member.kind != PropertyKind::Method {
          continue;
        }
        self.repair_method(member, &mut stats);
      }
    }
    stats
  }

  fn repair_method(&self, method: &mut ParsedProperty, stats: &mut RecoveryStats) {
    let Some((index, entry)) = self.locate(&method.name) else {
      return;
    };
    stats.methods_located += 1;

    let window = collect_window(index, entry, method.params.len() + 2);
    let mut info = extract_matches(&window);
    if method.has_params_to_enrich {
      self.enrich_from_caches(method, &mut info);
    }
    apply(method, &info, stats);

    tracing::debug!(
      target: "extendscript_dts::recover",
      method = %method.name,
      blob = %index.name,
      window = window.len(),
      matches = info.params.len(),
      "recovered method from binary"
    );
  }

  /// First blob (in input order) whose index contains the method name; the
  /// first occurrence within that blob wins.
  fn locate(&self, name: &str) -> Option<(&BlobIndex<'a>, StringEntry<'a>)> {
    if name.is_empty() {
      return None;
    }
    for index in &self.indexes {
      if let Some(entry) = index.find_first(name) {
        return Some((index, *entry));
      }
    }
    None
  }

  /// Two cache phases over parameters the local window did not cover. The
  /// phases observe the same merged first-seen-wins master cache today, but
  /// are kept distinct so a future class-local cache can slot in.
  fn enrich_from_caches(&self, method: &ParsedProperty, info: &mut BinaryMethodInfo<'a>) {
    for source in [MatchSource::ClassCache, MatchSource::GlobalCache] {
      for p in &method.params {
        let name = p.param.name.as_str();
        if !is_real_identifier(name) {
          continue;
        }
        if info.params.iter().any(|m| m.name == name) {
          continue;
        }
        if let Some((key, desc)) = self.master.entry(name) {
          info.params.push(ParamMatch {
            name: key,
            desc,
            source,
          });
        }
      }
    }
  }
}

/// A usable XML parameter name: not a synthesized placeholder, no spaces,
/// not digit-led.
fn is_real_identifier(name: &str) -> bool {
  !name.is_empty()
    && !PLACEHOLDER_NAME.is_match(name)
    && !name.contains(' ')
    && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// Walk backward from the matched entry, taking up to `max` preceding
/// entries within the 500-byte cutoff, then discard upstream `$$$` markers.
fn collect_window<'a>(
  index: &BlobIndex<'a>,
  entry: StringEntry<'a>,
  max: usize,
) -> Vec<StringEntry<'a>> {
  let mut window = Vec::new();
  let mut ordinal = entry.ordinal;
  while window.len() < max && ordinal > 0 {
    ordinal -= 1;
    let Some(prev) = index.entry(ordinal) else {
      break;
    };
    if entry.offset.saturating_sub(prev.offset) > LOCAL_WINDOW_BYTES {
      break;
    }
    window.push(*prev);
  }
  window.retain(|e| !e.text.starts_with("$$$"));
  window
}

/// Stage 1: pull `name: description` observations out of the local window
/// and nominate the entry just beyond the furthest observation as the
/// method description.
fn extract_matches<'a>(window: &[StringEntry<'a>]) -> BinaryMethodInfo<'a> {
  let mut info = BinaryMethodInfo::default();
  let mut furthest = None;
  for (i, entry) in window.iter().enumerate() {
    if let Some((name, desc)) = split_name_desc(entry.text) {
      info.params.push(ParamMatch {
        name,
        desc,
        source: MatchSource::Local(i),
      });
      furthest = Some(i);
    }
  }
  if let Some(i) = furthest {
    if let Some(candidate) = window.get(i + 1) {
      let text = candidate.text;
      if text.len() > MIN_METHOD_DESC_LEN && text.contains(' ') && !text.ends_with(" class") {
        info.method_desc = Some(text);
      }
    }
  }
  info
}

/// Stage 2: remove comma-split artifacts, then repair names and
/// descriptions, then adopt the method description.
fn apply(method: &mut ParsedProperty, info: &BinaryMethodInfo<'_>, stats: &mut RecoveryStats) {
  remove_comma_split_params(method, info, stats);

  let mut adopted = vec![false; method.params.len()];
  let full_recovery = method.needs_full_binary_recovery;

  for m in &info.params {
    let target = method
      .params
      .iter()
      .enumerate()
      .find(|(i, p)| !adopted[*i] && p.param.name == m.name)
      .map(|(i, _)| i);

    let target = target.or_else(|| {
      // In full-recovery mode a positional window match may rename an
      // unmatched placeholder. Window index 0 is the last parameter.
      let MatchSource::Local(i) = m.source else {
        return None;
      };
      if i >= method.params.len() {
        return None;
      }
      let pos = method.params.len() - 1 - i;
      if full_recovery && !adopted[pos] && PLACEHOLDER_NAME.is_match(&method.params[pos].param.name)
      {
        Some(pos)
      } else {
        None
      }
    });

    let Some(idx) = target else {
      continue;
    };
    let p = &mut method.params[idx];
    if p.param.name != m.name {
      tracing::trace!(
        target: "extendscript_dts::recover",
        from = %p.param.name,
        to = %m.name,
        "renamed placeholder parameter"
      );
      p.param.name = m.name.to_string();
      stats.names_repaired += 1;
    }
    if !m.desc.is_empty() && (p.param.desc.is_empty() || full_recovery) {
      let line = m.desc.to_string();
      if p.param.desc != [line.clone()] {
        stats.descriptions_adopted += 1;
      }
      p.param.desc = vec![line];
    }
    if m.desc.to_lowercase().contains("optional") {
      p.param.optional = true;
    }
    adopted[idx] = true;
  }

  if method.desc.is_empty() {
    if let Some(desc) = info.method_desc {
      method.desc = vec![desc.to_string()];
      stats.method_descs_recovered += 1;
    }
  }
}

/// A comma in a recovered description means the upstream generator exploded
/// one parameter into several. Remove as many spurious XML parameters as
/// there were commas, worst suspects first.
fn remove_comma_split_params(
  method: &mut ParsedProperty,
  info: &BinaryMethodInfo<'_>,
  stats: &mut RecoveryStats,
) {
  let commas: usize = info.params.iter().map(|m| m.desc.matches(',').count()).sum();
  if commas == 0 {
    return;
  }
  let local_matches = info
    .params
    .iter()
    .filter(|m| matches!(m.source, MatchSource::Local(_)))
    .count();
  if method.params.len() <= local_matches {
    return;
  }

  let mut candidates: Vec<(u8, usize)> = Vec::new();
  for (i, p) in method.params.iter().enumerate() {
    if info.params.iter().any(|m| m.name == p.param.name) {
      continue;
    }
    let name = p.param.name.as_str();
    let xml_name = p.xml_name.as_str();
    let priority = if (xml_name.contains(' ') && xml_name.split_whitespace().count() >= 3)
      || matches!(name.chars().last(), Some('.' | '!' | '?' | ','))
      || p.was_space_name
    {
      Some(1)
    } else if xml_name.starts_with(|c: char| c.is_ascii_digit()) {
      Some(2)
    } else if PLACEHOLDER_NAME.is_match(name) {
      Some(3)
    } else {
      None
    };
    if let Some(priority) = priority {
      candidates.push((priority, i));
    }
  }

  candidates.sort_by_key(|&(priority, i)| (priority, i));
  let mut doomed: Vec<usize> = candidates
    .into_iter()
    .take(commas)
    .map(|(_, i)| i)
    .collect();
  doomed.sort_unstable();
  for i in doomed.into_iter().rev() {
    tracing::trace!(
      target: "extendscript_dts::recover",
      method = %method.name,
      param = %method.params[i].param.name,
      "removed comma-split artifact"
    );
    method.params.remove(i);
    stats.params_removed += 1;
  }
}
