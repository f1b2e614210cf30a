//! Post-recovery passes: inherited-member pruning and deterministic
//! ordering. Both operate on the stripped emit-time model.

use crate::defs::{Definition, PropertyKind};
use ahash::{AHashMap, AHashSet};

/// Remove members whose name is declared anywhere up the `extends` chain.
///
/// Parents that do not resolve are external types and are skipped silently.
/// The inheritance graph is assumed acyclic, but a cycle terminates the walk
/// instead of looping.
pub fn prune_inherited_members(defs: &mut [Definition]) {
  let member_names: AHashMap<String, AHashSet<String>> = defs
    .iter()
    .map(|def| {
      (
        def.name.clone(),
        def.members.iter().map(|m| m.name.clone()).collect(),
      )
    })
    .collect();
  let parents: AHashMap<String, String> = defs
    .iter()
    .filter_map(|def| def.extends.clone().map(|parent| (def.name.clone(), parent)))
    .collect();

  for def in defs.iter_mut() {
    let mut inherited: AHashSet<&str> = AHashSet::new();
    let mut visited: AHashSet<&str> = AHashSet::new();
    visited.insert(def.name.as_str());

    let mut current = def.extends.as_deref();
    while let Some(parent) = current {
      if !visited.insert(parent) {
        break;
      }
      if let Some(names) = member_names.get(parent) {
        inherited.extend(names.iter().map(String::as_str));
      }
      current = parents.get(parent).map(String::as_str);
    }

    if !inherited.is_empty() {
      def.members.retain(|m| !inherited.contains(m.name.as_str()));
    }
  }
}

/// Total order: definitions by name; within a definition, non-methods before
/// methods, each group by name.
pub fn sort_definitions(defs: &mut [Definition]) {
  defs.sort_by(|a, b| a.name.cmp(&b.name));
  for def in defs.iter_mut() {
    def
      .members
      .sort_by_key(|m| ((m.kind == PropertyKind::Method) as u8, m.name.clone()));
  }
}
