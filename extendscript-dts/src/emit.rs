//! Declaration-file text emission.
//!
//! The tree handed to this module is fully repaired, pruned, and sorted;
//! emission is a mechanical walk. Dotted definition names split at the
//! first dot into a namespace wrapper, JSDoc blocks appear only where
//! descriptions exist, and parameter names that collide with keywords get a
//! trailing underscore.

use crate::defs::{Definition, DefinitionKind, Parameter, Property, PropertyKind, TypeRef};

/// Parameter names that would collide with keywords in the output language.
const PARAM_KEYWORDS: &[&str] = &["for", "with", "in", "default", "return", "export", "function"];

pub fn emit_definitions(defs: &[Definition]) -> String {
  let mut em = DtsEmitter::new();
  for (i, def) in defs.iter().enumerate() {
    if i > 0 {
      em.blank();
    }
    em.emit_definition(def);
  }
  em.into_string()
}

struct DtsEmitter {
  out: String,
  indent: usize,
}

impl DtsEmitter {
  fn new() -> Self {
    DtsEmitter {
      out: String::new(),
      indent: 0,
    }
  }

  fn into_string(self) -> String {
    self.out
  }

  fn line(&mut self, text: &str) {
    for _ in 0..self.indent {
      self.out.push_str("  ");
    }
    self.out.push_str(text);
    self.out.push('\n');
  }

  fn blank(&mut self) {
    self.out.push('\n');
  }

  fn open(&mut self, text: &str) {
    self.line(text);
    self.indent += 1;
  }

  fn close(&mut self) {
    self.indent -= 1;
    self.line("}");
  }

  fn emit_definition(&mut self, def: &Definition) {
    match def.name.split_once('.') {
      Some((namespace, rest)) => {
        self.open(&format!("declare namespace {namespace} {{"));
        self.emit_definition_body(def, rest, false);
        self.close();
      }
      None => self.emit_definition_body(def, &def.name, true),
    }
  }

  fn emit_definition_body(&mut self, def: &Definition, name: &str, top_level: bool) {
    self.emit_jsdoc(&def.desc, &[]);
    let declare = if top_level { "declare " } else { "" };
    let keyword = match def.kind {
      DefinitionKind::Class => "class",
      DefinitionKind::Interface => "interface",
      DefinitionKind::Enum => "enum",
    };
    let extends = match &def.extends {
      Some(parent) => format!(" extends {parent}"),
      None => String::new(),
    };
    self.open(&format!("{declare}{keyword} {name}{extends} {{"));
    for member in &def.members {
      self.emit_member(member);
    }
    self.close();
  }

  fn emit_member(&mut self, member: &Property) {
    match member.kind {
      PropertyKind::EnumMember => {
        self.emit_jsdoc(&member.desc, &[]);
        match member.types.first().and_then(|t| t.value.as_deref()) {
          Some(value) => self.line(&format!("{} = {},", member.name, enum_literal(value))),
          None => self.line(&format!("{},", member.name)),
        }
      }
      PropertyKind::Property => {
        self.emit_jsdoc(&member.desc, &[]);
        let mut head = String::new();
        if member.is_static {
          head.push_str("static ");
        }
        if member.readonly {
          head.push_str("readonly ");
        }
        self.line(&format!("{head}{}: {};", member.name, format_union(&member.types)));
      }
      PropertyKind::Indexer => {
        self.emit_jsdoc(&member.desc, &[]);
        let (name, key) = match member.params.first() {
          Some(p) => (escape_param_name(&p.name), format_union(&p.types)),
          None => ("index".to_string(), "number".to_string()),
        };
        self.line(&format!("[{name}: {key}]: {};", format_union(&member.types)));
      }
      PropertyKind::Method => {
        let tags: Vec<(String, String)> = member
          .params
          .iter()
          .filter_map(|p| {
            p.desc
              .first()
              .map(|d| (escape_param_name(&p.name), d.clone()))
          })
          .collect();
        self.emit_jsdoc(&member.desc, &tags);

        let params = member
          .params
          .iter()
          .map(format_param)
          .collect::<Vec<_>>()
          .join(", ");
        if member.name == "constructor" {
          self.line(&format!("constructor({params});"));
        } else {
          let head = if member.is_static { "static " } else { "" };
          self.line(&format!(
            "{head}{}({params}): {};",
            member.name,
            format_union(&member.types)
          ));
        }
      }
    }
  }

  fn emit_jsdoc(&mut self, desc: &[String], param_tags: &[(String, String)]) {
    if desc.is_empty() && param_tags.is_empty() {
      return;
    }
    self.line("/**");
    for line in desc {
      self.line(&format!(" * {line}"));
    }
    for (name, text) in param_tags {
      self.line(&format!(" * @param {name} - {text}"));
    }
    self.line(" */");
  }
}

fn format_param(p: &Parameter) -> String {
  let name = escape_param_name(&p.name);
  let rest = name.starts_with("...");
  let optional = if p.optional && !rest { "?" } else { "" };
  format!("{name}{optional}: {}", format_union(&p.types))
}

fn format_union(types: &[TypeRef]) -> String {
  if types.is_empty() {
    return "void".to_string();
  }
  types.iter().map(format_type).collect::<Vec<_>>().join(" | ")
}

fn format_type(t: &TypeRef) -> String {
  if t.is_array {
    if t.name.contains('|') {
      format!("({})[]", t.name)
    } else {
      format!("{}[]", t.name)
    }
  } else {
    t.name.clone()
  }
}

fn escape_param_name(name: &str) -> String {
  if PARAM_KEYWORDS.contains(&name) {
    format!("{name}_")
  } else {
    name.to_string()
  }
}

fn enum_literal(value: &str) -> String {
  if value.parse::<f64>().is_ok() {
    value.to_string()
  } else {
    format!("\"{value}\"")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn prop(name: &str, ty: &str) -> Property {
    Property {
      kind: PropertyKind::Property,
      is_static: false,
      readonly: false,
      name: name.to_string(),
      desc: Vec::new(),
      params: Vec::new(),
      types: vec![TypeRef::new(ty)],
    }
  }

  fn method(name: &str, params: Vec<Parameter>, ret: &str) -> Property {
    Property {
      kind: PropertyKind::Method,
      is_static: false,
      readonly: false,
      name: name.to_string(),
      desc: Vec::new(),
      params,
      types: vec![TypeRef::new(ret)],
    }
  }

  fn param(name: &str, ty: &str) -> Parameter {
    Parameter {
      name: name.to_string(),
      desc: Vec::new(),
      optional: false,
      types: vec![TypeRef::new(ty)],
    }
  }

  fn class(name: &str, members: Vec<Property>) -> Definition {
    Definition {
      kind: DefinitionKind::Class,
      name: name.to_string(),
      desc: Vec::new(),
      extends: None,
      members,
    }
  }

  #[test]
  fn emits_class_with_members() {
    let mut doc = prop("version", "string");
    doc.readonly = true;
    doc.desc = vec!["The version string.".to_string()];
    let mut st = prop("count", "number");
    st.is_static = true;
    let def = class("Widget", vec![doc, st, method("close", Vec::new(), "void")]);
    let out = emit_definitions(&[def]);
    assert_eq!(
      out,
      "declare class Widget {\n\
       \x20 /**\n\
       \x20  * The version string.\n\
       \x20  */\n\
       \x20 readonly version: string;\n\
       \x20 static count: number;\n\
       \x20 close(): void;\n\
       }\n"
    );
  }

  #[test]
  fn emits_method_jsdoc_with_param_tags() {
    let mut p = param("name", "string");
    p.desc = vec!["The file name.".to_string()];
    let mut m = method("open", vec![p], "boolean");
    m.desc = vec!["Opens a file.".to_string()];
    let out = emit_definitions(&[class("Widget", vec![m])]);
    assert!(out.contains(" * Opens a file.\n"));
    assert!(out.contains(" * @param name - The file name.\n"));
    assert!(out.contains("open(name: string): boolean;\n"));
  }

  #[test]
  fn optional_and_rest_parameters() {
    let mut opt = param("mode", "number");
    opt.optional = true;
    let mut rest = param("...rest", "any");
    rest.types[0].is_array = true;
    rest.optional = true;
    let out = emit_definitions(&[class("Widget", vec![method("go", vec![opt, rest], "void")])]);
    assert!(out.contains("go(mode?: number, ...rest: any[]): void;\n"));
  }

  #[test]
  fn keyword_parameter_names_are_escaped() {
    let out = emit_definitions(&[class(
      "Widget",
      vec![method("apply", vec![param("with", "object")], "void")],
    )]);
    assert!(out.contains("apply(with_: object): void;\n"));
  }

  #[test]
  fn union_array_types_are_parenthesized() {
    let mut p = param("size", "number | string");
    p.types[0].is_array = true;
    let out = emit_definitions(&[class("Widget", vec![method("resize", vec![p], "void")])]);
    assert!(out.contains("resize(size: (number | string)[]): void;\n"));
  }

  #[test]
  fn dotted_names_split_into_namespaces() {
    let out = emit_definitions(&[class("Adobe.Widget", Vec::new())]);
    assert_eq!(
      out,
      "declare namespace Adobe {\n\
       \x20 class Widget {\n\
       \x20 }\n\
       }\n"
    );
  }

  #[test]
  fn enums_emit_literal_members() {
    let mut member = prop("LEFT", "number");
    member.kind = PropertyKind::EnumMember;
    member.types[0].value = Some("1".to_string());
    let mut named = prop("MODE", "string");
    named.kind = PropertyKind::EnumMember;
    named.types[0].value = Some("left".to_string());
    let def = Definition {
      kind: DefinitionKind::Enum,
      name: "Align".to_string(),
      desc: Vec::new(),
      extends: None,
      members: vec![member, named],
    };
    let out = emit_definitions(&[def]);
    assert!(out.contains("declare enum Align {\n"));
    assert!(out.contains("  LEFT = 1,\n"));
    assert!(out.contains("  MODE = \"left\",\n"));
  }

  #[test]
  fn indexer_members() {
    let idx = Property {
      kind: PropertyKind::Indexer,
      is_static: false,
      readonly: false,
      name: "__indexer".to_string(),
      desc: Vec::new(),
      params: vec![param("index", "number")],
      types: vec![TypeRef::new("Widget")],
    };
    let out = emit_definitions(&[class("Widgets", vec![idx])]);
    assert!(out.contains("[index: number]: Widget;\n"));
  }

  #[test]
  fn constructors_have_no_return_type() {
    let out = emit_definitions(&[class(
      "Widget",
      vec![method("constructor", vec![param("kind", "string")], "void")],
    )]);
    assert!(out.contains("constructor(kind: string);\n"));
  }

  #[test]
  fn definitions_are_separated_by_blank_lines() {
    let out = emit_definitions(&[class("A", Vec::new()), class("B", Vec::new())]);
    assert_eq!(out, "declare class A {\n}\n\ndeclare class B {\n}\n");
  }
}
