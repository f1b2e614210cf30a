use extendscript_dts::{convert, convert_definitions, Blob};
use roxmltree::Document;

fn blob_of(strings: &[&str]) -> Blob {
  let mut bytes = Vec::new();
  for s in strings {
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0);
  }
  Blob::new("host.dll", bytes)
}

#[test]
fn clean_method_passes_through() {
  let doc = Document::parse(
    r#"<package>
      <classdef name="Setting" dynamic="true">
        <elements type="instance">
          <method name="set">
            <shortdesc>Sets the value.</shortdesc>
            <parameters>
              <parameter name="value">
                <shortdesc>The value to set.</shortdesc>
                <datatype><type>String</type></datatype>
              </parameter>
            </parameters>
          </method>
        </elements>
      </classdef>
    </package>"#,
  )
  .unwrap();
  let out = convert(&doc, &[]).unwrap();
  assert!(out.contains("set(value: string): void;"));
  assert!(out.contains(" * @param value - The value to set."));
  assert!(out.contains(" * Sets the value."));
}

#[test]
fn colon_split_type_repairs_end_to_end() {
  let doc = Document::parse(
    r#"<package>
      <classdef name="Finder" dynamic="true">
        <elements type="instance">
          <method name="find">
            <parameters>
              <parameter name="matchSource">
                <datatype><type>Optional. Default is false.:boolean</type></datatype>
              </parameter>
            </parameters>
          </method>
        </elements>
      </classdef>
    </package>"#,
  )
  .unwrap();
  let out = convert(&doc, &[]).unwrap();
  assert!(out.contains("find(matchSource?: boolean): void;"));
  assert!(out.contains(" * @param matchSource - Optional. Default is false"));
}

#[test]
fn binary_recovery_flows_into_the_output() {
  let doc = Document::parse(
    r#"<package>
      <classdef name="Exporter" dynamic="true">
        <elements type="instance">
          <method name="exportFile">
            <parameters>
              <parameter name="interpolationType"><datatype><type>Number</type></datatype></parameter>
            </parameters>
          </method>
        </elements>
      </classdef>
    </package>"#,
  )
  .unwrap();
  let blobs = vec![
    blob_of(&["exportFile"]),
    blob_of(&["interpolationType: The interpolation method to use."]),
  ];
  let out = convert(&doc, &blobs).unwrap();
  assert!(out.contains(" * @param interpolationType - The interpolation method to use."));
}

#[test]
fn definitions_and_members_are_ordered() {
  let doc = Document::parse(
    r#"<package>
      <classdef name="Zebra" dynamic="true">
        <elements type="instance">
          <method name="trot"><parameters/></method>
          <property name="stripes"><datatype><type>Number</type></datatype></property>
        </elements>
      </classdef>
      <classdef name="Ant" dynamic="true">
        <elements type="instance"/>
      </classdef>
    </package>"#,
  )
  .unwrap();
  let out = convert(&doc, &[]).unwrap();
  let ant = out.find("declare interface Ant").unwrap();
  let zebra = out.find("declare interface Zebra").unwrap();
  assert!(ant < zebra);
  let stripes = out.find("stripes").unwrap();
  let trot = out.find("trot").unwrap();
  assert!(stripes < trot, "non-methods precede methods");
}

#[test]
fn inherited_members_are_pruned() {
  let doc = Document::parse(
    r#"<package>
      <classdef name="Base" dynamic="true">
        <elements type="instance">
          <property name="shared"><datatype><type>Number</type></datatype></property>
        </elements>
      </classdef>
      <classdef name="Child" dynamic="true">
        <superclass>Base</superclass>
        <elements type="instance">
          <property name="shared"><datatype><type>Number</type></datatype></property>
          <property name="own"><datatype><type>Number</type></datatype></property>
        </elements>
      </classdef>
    </package>"#,
  )
  .unwrap();
  let defs = convert_definitions(&doc, &[]).unwrap();
  let child = defs.iter().find(|d| d.name == "Child").unwrap();
  let names: Vec<_> = child.members.iter().map(|m| m.name.as_str()).collect();
  assert_eq!(names, ["own"]);
  let out = convert(&doc, &[]).unwrap();
  assert!(out.contains("declare interface Child extends Base"));
}

#[test]
fn pipeline_is_deterministic() {
  let doc = Document::parse(
    r#"<package>
      <classdef name="Widget" dynamic="true">
        <elements type="instance">
          <method name="applyPreset">
            <parameters>
              <parameter name=""><datatype><type>desc.:boolean</type></datatype></parameter>
            </parameters>
          </method>
        </elements>
      </classdef>
    </package>"#,
  )
  .unwrap();
  let blobs = vec![blob_of(&[
    "Applies a preset to the current widget",
    "preset: The preset name to apply",
    "applyPreset",
  ])];
  let first = convert(&doc, &blobs).unwrap();
  let second = convert(&doc, &blobs).unwrap();
  assert_eq!(first, second);
}

#[test]
fn empty_blobs_match_patternless_blobs() {
  let doc = Document::parse(
    r#"<package>
      <classdef name="Widget" dynamic="true">
        <elements type="instance">
          <method name="run">
            <parameters>
              <parameter name="mode"><datatype><type>Number</type></datatype></parameter>
            </parameters>
          </method>
        </elements>
      </classdef>
    </package>"#,
  )
  .unwrap();
  let without = convert(&doc, &[]).unwrap();
  // Blobs with no `name: description` patterns anywhere near the method.
  let with = convert(&doc, &[blob_of(&["just some words", "more words"])]).unwrap();
  assert_eq!(without, with);
}

#[test]
fn empty_blob_list_skips_recovery_but_emits() {
  let doc = Document::parse(
    r#"<package>
      <classdef name="Align" enumeration="true">
        <elements type="class">
          <property name="LEFT" rwaccess="readonly">
            <datatype><type>int</type><value>1</value></datatype>
          </property>
        </elements>
      </classdef>
    </package>"#,
  )
  .unwrap();
  let out = convert(&doc, &[]).unwrap();
  assert!(out.contains("declare enum Align {"));
  assert!(out.contains("LEFT = 1,"));
}

#[test]
fn dotted_definition_names_produce_namespaces() {
  let doc = Document::parse(
    r#"<package>
      <classdef name="Adobe.Widget" dynamic="true">
        <elements type="instance">
          <property name="size"><datatype><type>Number</type></datatype></property>
        </elements>
      </classdef>
    </package>"#,
  )
  .unwrap();
  let out = convert(&doc, &[]).unwrap();
  assert!(out.contains("declare namespace Adobe {"));
  assert!(out.contains("interface Widget {"));
}

#[test]
fn definitions_serialize_to_json() {
  let doc = Document::parse(
    r#"<package>
      <classdef name="Widget" dynamic="true">
        <elements type="instance">
          <property name="size"><datatype><type>Number</type></datatype></property>
        </elements>
      </classdef>
    </package>"#,
  )
  .unwrap();
  let defs = convert_definitions(&doc, &[]).unwrap();
  let value = serde_json::to_value(&defs).unwrap();
  assert_eq!(value[0]["kind"], "interface");
  assert_eq!(value[0]["members"][0]["types"][0]["name"], "number");
}

#[test]
fn unknown_definition_kind_is_a_fatal_error() {
  let doc = Document::parse(r#"<package><classdef name="Odd"/></package>"#).unwrap();
  assert!(convert(&doc, &[]).is_err());
}
