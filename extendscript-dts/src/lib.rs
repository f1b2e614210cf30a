//! ExtendScript API declaration recovery.
//!
//! The API definition XML shipped with ExtendScript hosts is structurally
//! sound but textually mangled: a lossy generator corrupted parameter names,
//! glued descriptions onto type payloads, and exploded comma-bearing
//! descriptions into spurious parameters. The host's native libraries still
//! carry the original strings. This crate parses the XML into a definition
//! tree (flagging each observed corruption), cross-references the tree
//! against a string index built from the native library bytes to repair it,
//! and emits a TypeScript declaration file.
//!
//! The whole pipeline is exposed as [`convert`]; the stages are public for
//! callers that need the intermediate tree (e.g. [`convert_definitions`] for
//! structured output).

mod binary;
mod defs;
mod emit;
mod error;
mod passes;
mod recover;
mod type_name;
mod xml;

pub use binary::{Blob, BlobIndex, ParamCache, StringEntry};
pub use defs::{Definition, DefinitionKind, Parameter, Property, PropertyKind, TypeRef};
pub use emit::emit_definitions;
pub use error::{ConvertError, ConvertResult};
pub use passes::{prune_inherited_members, sort_definitions};
pub use recover::{BinaryMethodInfo, MatchSource, ParamMatch, RecoveryEngine, RecoveryStats};
pub use type_name::normalize_type;
pub use xml::{parse_document, ParsedDefinition, ParsedParam, ParsedProperty};

/// Convert a parsed API definition document into declaration-file text.
///
/// `blobs` is the ordered list of native library files to recover strings
/// from; with no blobs the output is produced from the XML alone and the
/// recovery engine never runs.
pub fn convert(doc: &roxmltree::Document, blobs: &[Blob]) -> ConvertResult<String> {
  let defs = convert_definitions(doc, blobs)?;
  Ok(emit::emit_definitions(&defs))
}

/// Like [`convert`], but stops before emission and returns the repaired,
/// pruned, sorted definition tree.
pub fn convert_definitions(
  doc: &roxmltree::Document,
  blobs: &[Blob],
) -> ConvertResult<Vec<Definition>> {
  let mut parsed = xml::parse_document(doc)?;

  if !blobs.is_empty() {
    let engine = RecoveryEngine::new(blobs);
    let stats = engine.repair(&mut parsed);
    tracing::info!(
      target: "extendscript_dts",
      methods_located = stats.methods_located,
      names_repaired = stats.names_repaired,
      descriptions_adopted = stats.descriptions_adopted,
      params_removed = stats.params_removed,
      method_descs_recovered = stats.method_descs_recovered,
      "binary recovery complete"
    );
  }

  let mut defs: Vec<Definition> = parsed
    .into_iter()
    .map(ParsedDefinition::into_definition)
    .collect();
  passes::prune_inherited_members(&mut defs);
  passes::sort_definitions(&mut defs);
  Ok(defs)
}
