use std::error::Error;
use std::fmt;

/// Fatal errors raised while converting an API definition document.
///
/// Only structural problems are fatal: an XML element that cannot be
/// classified as a definition or member kind means the document dialect is
/// not the one this crate understands. Content corruption (mangled names,
/// split descriptions, spurious parameters) is never an error; it is routed
/// through the recovery engine instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
  /// A `classdef` element is neither an enumeration nor dynamic.
  UnknownDefinitionKind { name: String },
  /// A member element under `elements` has an unrecognized tag.
  UnknownMemberKind { definition: String, tag: String },
}

impl fmt::Display for ConvertError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConvertError::UnknownDefinitionKind { name } => {
        write!(f, "definition `{name}` is neither an enumeration nor dynamic")
      }
      ConvertError::UnknownMemberKind { definition, tag } => {
        write!(f, "definition `{definition}` contains unknown member element `<{tag}>`")
      }
    }
  }
}

impl Error for ConvertError {}

pub type ConvertResult<T> = Result<T, ConvertError>;
