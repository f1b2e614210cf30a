//! XML definition parsing.
//!
//! The XML document is authoritative for *structure* only: which definitions,
//! members, and parameters exist. Its text content was mangled by a lossy
//! upstream generator, so this parser does two jobs at once: it builds the
//! definition tree, and it records every corruption signal the recovery
//! engine needs (colon-split types, digit-prefixed and space-embedded
//! parameter names, descriptions dumped onto trailing parameters).
//!
//! The output is a *parse view* ([`ParsedDefinition`] / [`ParsedProperty`] /
//! [`ParsedParam`]) carrying transient repair flags alongside the plain
//! definition data. [`ParsedDefinition::into_definition`] strips the view
//! down to the emit-time model once recovery has run.

use crate::defs::{Definition, DefinitionKind, Parameter, Property, PropertyKind, TypeRef};
use crate::error::{ConvertError, ConvertResult};
use crate::type_name::normalize_type;
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};
use std::collections::HashSet;

static COLON_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*):(\S+)$").unwrap());
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^uArg(\d+)$").unwrap());
static CAN_ACCEPT: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(.*?)Can(?: also)? (?:accept|return):(.*)$").unwrap());
static NESTED_ARRAYS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Arrays? of Arrays? of").unwrap());

/// Parse-view record for one parameter.
#[derive(Clone, Debug)]
pub struct ParsedParam {
  pub param: Parameter,
  /// The parameter's original XML `name` attribute, before any repair.
  pub xml_name: String,
  /// The `<type>` element carried a colon: the generator split a
  /// description-plus-type string at the wrong boundary.
  pub malformed: bool,
  /// The description originated from a genuine XML description node.
  pub desc_from_xml: bool,
  /// The parameter was synthesized because the XML name contained spaces.
  pub was_space_name: bool,
  /// Description line count before type-derived lines were appended.
  pub xml_desc_count: usize,
}

/// Parse-view record for one member.
#[derive(Clone, Debug)]
pub struct ParsedProperty {
  pub kind: PropertyKind,
  pub is_static: bool,
  pub readonly: bool,
  pub name: String,
  pub desc: Vec<String>,
  pub params: Vec<ParsedParam>,
  pub types: Vec<TypeRef>,
  /// Some parameter had a colon-split type; positional renaming from the
  /// binary is allowed for this member.
  pub needs_full_binary_recovery: bool,
  pub has_params_to_enrich: bool,
}

impl ParsedProperty {
  pub fn into_property(self) -> Property {
    Property {
      kind: self.kind,
      is_static: self.is_static,
      readonly: self.readonly,
      name: self.name,
      desc: self.desc,
      params: self.params.into_iter().map(|p| p.param).collect(),
      types: self.types,
    }
  }
}

/// Parse-view record for one definition.
#[derive(Clone, Debug)]
pub struct ParsedDefinition {
  pub kind: DefinitionKind,
  pub name: String,
  pub desc: Vec<String>,
  pub extends: Option<String>,
  pub members: Vec<ParsedProperty>,
}

impl ParsedDefinition {
  pub fn into_definition(self) -> Definition {
    Definition {
      kind: self.kind,
      name: self.name,
      desc: self.desc,
      extends: self.extends,
      members: self.members.into_iter().map(|m| m.into_property()).collect(),
    }
  }
}

/// Parse every `classdef` under the document's `package` element.
pub fn parse_document(doc: &Document) -> ConvertResult<Vec<ParsedDefinition>> {
  let root = doc.root_element();
  let package = if root.has_tag_name("package") {
    root
  } else {
    child_elements(root, "package").next().unwrap_or(root)
  };

  let mut defs = Vec::new();
  for classdef in child_elements(package, "classdef") {
    defs.push(parse_classdef(classdef)?);
  }
  Ok(defs)
}

fn parse_classdef(node: Node) -> ConvertResult<ParsedDefinition> {
  let name = node.attribute("name").unwrap_or_default().to_string();

  let has_constructor = child_elements(node, "elements")
    .any(|group| child_elements_any(group).any(|m| m.has_tag_name("constructor")));

  let kind = if node.attribute("enumeration").is_some() {
    DefinitionKind::Enum
  } else if node.attribute("dynamic").is_some() {
    if has_constructor {
      DefinitionKind::Class
    } else {
      DefinitionKind::Interface
    }
  } else {
    return Err(ConvertError::UnknownDefinitionKind { name });
  };

  let extends = first_child(node, "superclass")
    .map(|n| element_text(n).trim().to_string())
    .filter(|s| !s.is_empty());

  let desc = description_lines(node);

  let mut members = Vec::new();
  for group in child_elements(node, "elements") {
    let is_static = group.attribute("type") == Some("class");
    for member in child_elements_any(group) {
      members.push(parse_member(member, is_static, kind, &name)?);
    }
  }

  tracing::trace!(
    target: "extendscript_dts::xml",
    definition = %name,
    ?kind,
    members = members.len(),
    "parsed definition"
  );

  Ok(ParsedDefinition {
    kind,
    name,
    desc,
    extends,
    members,
  })
}

fn parse_member(
  node: Node,
  is_static: bool,
  def_kind: DefinitionKind,
  def_name: &str,
) -> ConvertResult<ParsedProperty> {
  let tag = node.tag_name().name();
  let raw_name = node.attribute("name").unwrap_or_default();

  let (kind, name) = if tag == "constructor" {
    (PropertyKind::Method, "constructor".to_string())
  } else if raw_name == ".index" {
    (PropertyKind::Indexer, "__indexer".to_string())
  } else if tag == "property" {
    let kind = if def_kind == DefinitionKind::Enum {
      PropertyKind::EnumMember
    } else {
      PropertyKind::Property
    };
    (kind, sanitize_member_name(raw_name))
  } else if tag == "method" {
    (PropertyKind::Method, sanitize_member_name(raw_name))
  } else {
    return Err(ConvertError::UnknownMemberKind {
      definition: def_name.to_string(),
      tag: tag.to_string(),
    });
  };

  let readonly = node.attribute("rwaccess") == Some("readonly");

  let mut desc = description_lines(node);

  let is_callable = matches!(kind, PropertyKind::Method | PropertyKind::Indexer);
  let default_type = if is_callable { "void" } else { "any" };
  let parsed_type = parse_datatype(first_child(node, "datatype"), default_type);
  let mut types = parsed_type.types;
  if let Some(salvaged) = parsed_type.salvaged_desc {
    desc.push(salvaged);
  }

  apply_can_accept(&mut desc, &mut types);

  let mut params = if is_callable {
    parse_parameters(node)
  } else {
    Vec::new()
  };

  // A description-less method whose final parameter carries the only
  // description in the list received the method description by mistake;
  // give it back.
  rescue_method_description(&mut desc, &mut params);

  let needs_full_binary_recovery = params.iter().any(|p| p.malformed);
  let has_params_to_enrich = !params.is_empty();

  Ok(ParsedProperty {
    kind,
    is_static,
    readonly,
    name,
    desc,
    params,
    types,
    needs_full_binary_recovery,
    has_params_to_enrich,
  })
}

/// Replace every character outside `[]0-9a-zA-Z_$.` with `_`.
fn sanitize_member_name(raw: &str) -> String {
  raw
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '[' | ']' | '_' | '$' | '.') {
        c
      } else {
        '_'
      }
    })
    .collect()
}

struct ParsedType {
  types: Vec<TypeRef>,
  salvaged_desc: Option<String>,
  malformed: bool,
}

/// Parse a `datatype` element into normalized type references.
///
/// The `<type>` text is where the generator's worst corruption shows up: a
/// colon means a description was glued onto the type name, and embedded
/// spaces mean the whole payload is a description.
fn parse_datatype(node: Option<Node>, default_name: &str) -> ParsedType {
  let Some(node) = node else {
    return ParsedType {
      types: vec![TypeRef::new(default_name)],
      salvaged_desc: None,
      malformed: false,
    };
  };

  let is_array = first_child(node, "array").is_some();
  let value = first_child(node, "value").map(|n| element_text(n).trim().to_string());
  let raw = first_child(node, "type")
    .map(|n| element_text(n).trim().to_string())
    .unwrap_or_default();

  if raw == "Measurement Unit (Number or String)=any" {
    let mut t = TypeRef::new("number | string");
    t.is_array = is_array;
    t.value = value;
    return ParsedType {
      types: vec![t],
      salvaged_desc: None,
      malformed: false,
    };
  }

  let mut salvaged_desc = None;
  let mut malformed = false;
  let name = if let Some(caps) = COLON_SPLIT.captures(&raw) {
    malformed = true;
    let left = caps[1].trim();
    let left = left.strip_suffix('.').unwrap_or(left);
    if !left.is_empty() {
      salvaged_desc = Some(left.to_string());
    }
    tracing::trace!(
      target: "extendscript_dts::xml",
      desc = %caps[1].trim(),
      ty = %&caps[2],
      "colon-split type"
    );
    caps[2].to_string()
  } else if raw.contains(' ') {
    salvaged_desc = Some(raw.clone());
    "any".to_string()
  } else if raw.is_empty() {
    default_name.to_string()
  } else {
    raw
  };

  let mut t = TypeRef::new(name);
  t.is_array = is_array;
  t.value = value;
  normalize_type(&mut t);

  ParsedType {
    types: vec![t],
    salvaged_desc,
    malformed,
  }
}

fn parse_parameters(member: Node) -> Vec<ParsedParam> {
  let Some(list) = first_child(member, "parameters") else {
    return Vec::new();
  };
  let nodes: Vec<Node> = child_elements(list, "parameter").collect();

  // Synthesized placeholder names must not collide with placeholders the
  // document already contains.
  let mut used: HashSet<u32> = nodes
    .iter()
    .filter_map(|n| n.attribute("name"))
    .filter_map(|name| PLACEHOLDER.captures(name))
    .filter_map(|caps| caps[1].parse().ok())
    .collect();

  let mut params = Vec::new();
  let mut sticky_optional = false;

  for node in nodes {
    let xml_name = node.attribute("name").unwrap_or_default().to_string();
    let mut desc = description_lines(node);
    let desc_from_xml = !desc.is_empty();
    let mut was_space_name = false;

    let mut name = if xml_name.starts_with(|c: char| c.is_ascii_digit()) {
      // Garbage from a comma split; the text is not worth keeping.
      next_placeholder(&mut used)
    } else if xml_name.contains(' ') {
      // A description leaked into the name attribute.
      desc.insert(0, xml_name.trim().to_string());
      was_space_name = true;
      next_placeholder(&mut used)
    } else if xml_name.is_empty() {
      next_placeholder(&mut used)
    } else {
      xml_name.clone()
    };

    let parsed_type = parse_datatype(first_child(node, "datatype"), "any");
    let mut types = parsed_type.types;
    let xml_desc_count = desc.len();
    if let Some(salvaged) = parsed_type.salvaged_desc {
      desc.push(salvaged);
    }

    let mut optional = sticky_optional || node.attribute("optional") == Some("true");
    if desc.iter().any(|line| line.to_lowercase().contains("optional")) {
      optional = true;
    }
    strip_optional_token(&mut desc);
    sticky_optional |= optional;

    if name.contains("...") {
      name = "...rest".to_string();
      if let Some(first) = types.first_mut() {
        first.is_array = true;
      }
    }

    params.push(ParsedParam {
      param: Parameter {
        name,
        desc,
        optional,
        types,
      },
      xml_name,
      malformed: parsed_type.malformed,
      desc_from_xml,
      was_space_name,
      xml_desc_count,
    });
  }

  params
}

fn next_placeholder(used: &mut HashSet<u32>) -> String {
  let mut k = 1;
  while used.contains(&k) {
    k += 1;
  }
  used.insert(k);
  format!("uArg{k}")
}

fn strip_optional_token(desc: &mut Vec<String>) {
  for line in desc.iter_mut() {
    if line.contains("(Optional)") {
      *line = collapse_spaces(&line.replace("(Optional)", "")).trim().to_string();
    }
  }
  desc.retain(|line| !line.is_empty());
}

/// The generator sometimes dumps the *method* description onto the last
/// parameter. Detect the pattern and move the XML-sourced lines back up.
fn rescue_method_description(desc: &mut Vec<String>, params: &mut [ParsedParam]) {
  if !desc.is_empty() {
    // A populated method description proves the parameter text is genuine.
    return;
  }
  let Some((last, rest)) = params.split_last_mut() else {
    return;
  };
  if last.param.desc.is_empty() || !last.desc_from_xml {
    return;
  }
  if rest.iter().any(|p| !p.param.desc.is_empty()) {
    return;
  }
  let count = last.xml_desc_count.min(last.param.desc.len());
  if count == 0 {
    return;
  }
  let remaining = last.param.desc.split_off(count);
  let rescued = std::mem::replace(&mut last.param.desc, remaining);
  tracing::trace!(
    target: "extendscript_dts::xml",
    lines = rescued.len(),
    "rescued method description from trailing parameter"
  );
  *desc = rescued;
}

/// Parse "Can return:"/"Can accept:"/"Can also accept:" tails on the first
/// description line into additional member types.
fn apply_can_accept(desc: &mut Vec<String>, types: &mut Vec<TypeRef>) {
  let Some(first) = desc.first() else {
    return;
  };
  let Some(caps) = CAN_ACCEPT.captures(first) else {
    return;
  };
  let tail = caps[2].to_string();
  if tail.contains("containing") || NESTED_ARRAYS.is_match(&tail) {
    return;
  }
  let left = caps[1].trim().to_string();

  for piece in tail.split(',').flat_map(|p| p.split(" or ")) {
    let piece = piece.trim();
    let piece = piece.strip_suffix('.').unwrap_or(piece);
    if piece.is_empty() {
      continue;
    }
    let mut t = TypeRef::new(piece);
    normalize_type(&mut t);
    if !types.iter().any(|u| u.name == t.name && u.is_array == t.is_array) {
      types.push(t);
    }
  }

  if types.iter().any(|t| t.name != "any") {
    types.retain(|t| t.name != "any");
  }

  if left.is_empty() {
    desc.remove(0);
  } else {
    desc[0] = left;
  }
}

/// Concatenated `shortdesc` and `description` text, split into trimmed,
/// non-empty lines with internal runs of spaces collapsed.
fn description_lines(node: Node) -> Vec<String> {
  let short = first_child(node, "shortdesc").map(element_text).unwrap_or_default();
  let long = first_child(node, "description").map(element_text).unwrap_or_default();
  let combined = format!("{short}\n{long}");
  combined
    .lines()
    .map(|line| collapse_spaces(line).trim().to_string())
    .filter(|line| !line.is_empty())
    .collect()
}

fn collapse_spaces(text: &str) -> String {
  let mut out = text.to_string();
  while out.contains("  ") {
    out = out.replace("  ", " ");
  }
  out
}

fn element_text(node: Node) -> String {
  node
    .descendants()
    .filter(|n| n.is_text())
    .filter_map(|n| n.text())
    .collect()
}

fn first_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
  node.children().find(|n| n.is_element() && n.has_tag_name(name))
}

fn child_elements<'a, 'input>(
  node: Node<'a, 'input>,
  name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a
where
  'input: 'a,
{
  node
    .children()
    .filter(move |n| n.is_element() && n.has_tag_name(name))
}

fn child_elements_any<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>>
where
  'input: 'a,
{
  node.children().filter(|n| n.is_element())
}
