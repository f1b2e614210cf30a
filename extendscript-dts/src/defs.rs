//! The emit-time definition model.
//!
//! Everything in this module is plain data with no corruption bookkeeping:
//! the XML parser produces parse-view records (see [`crate::xml`]) that carry
//! the transient repair flags, and those are stripped into these types once
//! the recovery engine has consumed them. From that point on the tree is
//! read-only through the sort and emit passes.

use serde::Serialize;

/// A normalized type reference.
///
/// `name` is either one of the target-language primitives (`any`, `string`,
/// `number`, `boolean`, `object`, `undefined`, `void`), an arbitrary user
/// type name, or a literal form such as `[number, number]` or
/// `number | string` produced by the normalizer. Literal forms are emitted
/// verbatim (parenthesized when the array flag requires it).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeRef {
  pub name: String,
  pub is_array: bool,
  /// Literal value, present on enum members only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<String>,
}

impl TypeRef {
  pub fn new(name: impl Into<String>) -> Self {
    TypeRef {
      name: name.into(),
      is_array: false,
      value: None,
    }
  }

  pub fn array(name: impl Into<String>) -> Self {
    TypeRef {
      name: name.into(),
      is_array: true,
      value: None,
    }
  }
}

/// A method (or indexer) parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Parameter {
  pub name: String,
  /// Ordered description lines. Empty when nothing was recovered.
  pub desc: Vec<String>,
  pub optional: bool,
  /// Non-empty; interpreted as a union.
  pub types: Vec<TypeRef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
  Property,
  Method,
  Indexer,
  EnumMember,
}

/// A member of a class, interface, or enum.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Property {
  pub kind: PropertyKind,
  pub is_static: bool,
  pub readonly: bool,
  pub name: String,
  pub desc: Vec<String>,
  /// Empty unless `kind` is `Method` or `Indexer`.
  pub params: Vec<Parameter>,
  /// Return type for methods, declared type for properties, value type for
  /// enum members.
  pub types: Vec<TypeRef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
  Class,
  Interface,
  Enum,
}

/// A top-level class, interface, or enum definition.
///
/// `name` may contain dots; the emitter splits the first segment off into a
/// namespace. The in-memory name keeps the dots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Definition {
  pub kind: DefinitionKind,
  pub name: String,
  pub desc: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub extends: Option<String>,
  pub members: Vec<Property>,
}
