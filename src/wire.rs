// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outbound protocol element builders.
//!
//! Each function renders one complete top-level XML element as a `String`
//! ready for [`crate::io::ProtocolWriter`]. One element per message, no
//! prologue. Numeric bodies go through [`crate::numeric::format_number`],
//! which keeps them C-locale clean; BLOB bodies are base64 with an
//! `enclen` attribute carrying the exact encoded byte count.

use crate::numeric::format_number;
use crate::property::{
    BlobPolicy, BlobVector, LightVector, NumberVector, SwitchVector, TextVector,
};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;

/// Uid prefix for BLOB pacing pings.
pub const BLOB_PING_PREFIX: &str = "SetBLOB/";

/// Escape a value for use inside a double-quoted attribute.
fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

/// Escape element text content.
fn escape_text(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_attr(out, value);
    out.push('"');
}

fn push_opt_attr(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(v) = value {
        push_attr(out, name, v);
    }
}

fn push_child_text(out: &mut String, tag: &str, name_attr: &str, body: &str) {
    out.push_str("  <");
    out.push_str(tag);
    push_attr(out, "name", name_attr);
    out.push('>');
    escape_text(out, body);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

pub fn def_number_vector(nvp: &NumberVector, message: Option<&str>) -> String {
    let mut out = String::with_capacity(256 + nvp.numbers.len() * 128);
    out.push_str("<defNumberVector");
    push_attr(&mut out, "device", &nvp.device);
    push_attr(&mut out, "name", &nvp.name);
    push_attr(&mut out, "label", &nvp.label);
    push_attr(&mut out, "state", nvp.state.as_wire());
    push_attr(&mut out, "perm", nvp.perm.as_wire());
    push_opt_attr(&mut out, "message", message);
    out.push_str(">\n");
    for n in &nvp.numbers {
        out.push_str("  <defNumber");
        push_attr(&mut out, "name", &n.name);
        push_attr(&mut out, "label", &n.label);
        push_attr(&mut out, "format", &n.format);
        push_attr(&mut out, "min", &format!("{}", n.min));
        push_attr(&mut out, "max", &format!("{}", n.max));
        push_attr(&mut out, "step", &format!("{}", n.step));
        out.push('>');
        escape_text(&mut out, format_number(&n.format, n.value).trim());
        out.push_str("</defNumber>\n");
    }
    out.push_str("</defNumberVector>\n");
    out
}

pub fn def_switch_vector(svp: &SwitchVector, message: Option<&str>) -> String {
    let mut out = String::with_capacity(256 + svp.switches.len() * 96);
    out.push_str("<defSwitchVector");
    push_attr(&mut out, "device", &svp.device);
    push_attr(&mut out, "name", &svp.name);
    push_attr(&mut out, "label", &svp.label);
    push_attr(&mut out, "state", svp.state.as_wire());
    push_attr(&mut out, "perm", svp.perm.as_wire());
    push_attr(&mut out, "rule", svp.rule.as_wire());
    push_opt_attr(&mut out, "message", message);
    out.push_str(">\n");
    for s in &svp.switches {
        out.push_str("  <defSwitch");
        push_attr(&mut out, "name", &s.name);
        push_attr(&mut out, "label", &s.label);
        out.push('>');
        out.push_str(s.state.as_wire());
        out.push_str("</defSwitch>\n");
    }
    out.push_str("</defSwitchVector>\n");
    out
}

pub fn def_text_vector(tvp: &TextVector, message: Option<&str>) -> String {
    let mut out = String::with_capacity(256 + tvp.texts.len() * 96);
    out.push_str("<defTextVector");
    push_attr(&mut out, "device", &tvp.device);
    push_attr(&mut out, "name", &tvp.name);
    push_attr(&mut out, "label", &tvp.label);
    push_attr(&mut out, "state", tvp.state.as_wire());
    push_attr(&mut out, "perm", tvp.perm.as_wire());
    push_opt_attr(&mut out, "message", message);
    out.push_str(">\n");
    for t in &tvp.texts {
        out.push_str("  <defText");
        push_attr(&mut out, "name", &t.name);
        push_attr(&mut out, "label", &t.label);
        out.push('>');
        escape_text(&mut out, &t.value);
        out.push_str("</defText>\n");
    }
    out.push_str("</defTextVector>\n");
    out
}

pub fn def_light_vector(lvp: &LightVector, message: Option<&str>) -> String {
    let mut out = String::with_capacity(256 + lvp.lights.len() * 80);
    out.push_str("<defLightVector");
    push_attr(&mut out, "device", &lvp.device);
    push_attr(&mut out, "name", &lvp.name);
    push_attr(&mut out, "label", &lvp.label);
    push_attr(&mut out, "state", lvp.state.as_wire());
    push_opt_attr(&mut out, "message", message);
    out.push_str(">\n");
    for l in &lvp.lights {
        out.push_str("  <defLight");
        push_attr(&mut out, "name", &l.name);
        push_attr(&mut out, "label", &l.label);
        out.push('>');
        out.push_str(l.state.as_wire());
        out.push_str("</defLight>\n");
    }
    out.push_str("</defLightVector>\n");
    out
}

pub fn def_blob_vector(bvp: &BlobVector, message: Option<&str>) -> String {
    let mut out = String::with_capacity(256 + bvp.blobs.len() * 64);
    out.push_str("<defBLOBVector");
    push_attr(&mut out, "device", &bvp.device);
    push_attr(&mut out, "name", &bvp.name);
    push_attr(&mut out, "label", &bvp.label);
    push_attr(&mut out, "state", bvp.state.as_wire());
    push_attr(&mut out, "perm", bvp.perm.as_wire());
    push_opt_attr(&mut out, "message", message);
    out.push_str(">\n");
    for b in &bvp.blobs {
        out.push_str("  <defBLOB");
        push_attr(&mut out, "name", &b.name);
        push_attr(&mut out, "label", &b.label);
        out.push_str("/>\n");
    }
    out.push_str("</defBLOBVector>\n");
    out
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

pub fn set_number_vector(nvp: &NumberVector, message: Option<&str>) -> String {
    let mut out = String::with_capacity(192 + nvp.numbers.len() * 64);
    out.push_str("<setNumberVector");
    push_attr(&mut out, "device", &nvp.device);
    push_attr(&mut out, "name", &nvp.name);
    push_attr(&mut out, "state", nvp.state.as_wire());
    push_opt_attr(&mut out, "message", message);
    out.push_str(">\n");
    for n in &nvp.numbers {
        push_child_text(
            &mut out,
            "oneNumber",
            &n.name,
            format_number(&n.format, n.value).trim(),
        );
    }
    out.push_str("</setNumberVector>\n");
    out
}

/// `setNumberVector` echoing min/max/step so a connected peer can refresh
/// the bounds it learned from the original definition.
pub fn set_number_min_max(nvp: &NumberVector) -> String {
    let mut out = String::with_capacity(192 + nvp.numbers.len() * 96);
    out.push_str("<setNumberVector");
    push_attr(&mut out, "device", &nvp.device);
    push_attr(&mut out, "name", &nvp.name);
    push_attr(&mut out, "state", nvp.state.as_wire());
    out.push_str(">\n");
    for n in &nvp.numbers {
        out.push_str("  <oneNumber");
        push_attr(&mut out, "name", &n.name);
        push_attr(&mut out, "min", &format!("{}", n.min));
        push_attr(&mut out, "max", &format!("{}", n.max));
        push_attr(&mut out, "step", &format!("{}", n.step));
        out.push('>');
        escape_text(&mut out, format_number(&n.format, n.value).trim());
        out.push_str("</oneNumber>\n");
    }
    out.push_str("</setNumberVector>\n");
    out
}

pub fn set_switch_vector(svp: &SwitchVector, message: Option<&str>) -> String {
    let mut out = String::with_capacity(192 + svp.switches.len() * 48);
    out.push_str("<setSwitchVector");
    push_attr(&mut out, "device", &svp.device);
    push_attr(&mut out, "name", &svp.name);
    push_attr(&mut out, "state", svp.state.as_wire());
    push_opt_attr(&mut out, "message", message);
    out.push_str(">\n");
    for s in &svp.switches {
        push_child_text(&mut out, "oneSwitch", &s.name, s.state.as_wire());
    }
    out.push_str("</setSwitchVector>\n");
    out
}

pub fn set_text_vector(tvp: &TextVector, message: Option<&str>) -> String {
    let mut out = String::with_capacity(192 + tvp.texts.len() * 64);
    out.push_str("<setTextVector");
    push_attr(&mut out, "device", &tvp.device);
    push_attr(&mut out, "name", &tvp.name);
    push_attr(&mut out, "state", tvp.state.as_wire());
    push_opt_attr(&mut out, "message", message);
    out.push_str(">\n");
    for t in &tvp.texts {
        push_child_text(&mut out, "oneText", &t.name, &t.value);
    }
    out.push_str("</setTextVector>\n");
    out
}

pub fn set_light_vector(lvp: &LightVector, message: Option<&str>) -> String {
    let mut out = String::with_capacity(192 + lvp.lights.len() * 48);
    out.push_str("<setLightVector");
    push_attr(&mut out, "device", &lvp.device);
    push_attr(&mut out, "name", &lvp.name);
    push_attr(&mut out, "state", lvp.state.as_wire());
    push_opt_attr(&mut out, "message", message);
    out.push_str(">\n");
    for l in &lvp.lights {
        push_child_text(&mut out, "oneLight", &l.name, l.state.as_wire());
    }
    out.push_str("</setLightVector>\n");
    out
}

pub fn set_blob_vector(bvp: &BlobVector, message: Option<&str>) -> String {
    let encoded: Vec<String> = bvp
        .blobs
        .iter()
        .map(|b| BASE64_STANDARD.encode(&b.data))
        .collect();
    let payload: usize = encoded.iter().map(String::len).sum();

    let mut out = String::with_capacity(256 + payload + bvp.blobs.len() * 96);
    out.push_str("<setBLOBVector");
    push_attr(&mut out, "device", &bvp.device);
    push_attr(&mut out, "name", &bvp.name);
    push_attr(&mut out, "state", bvp.state.as_wire());
    push_opt_attr(&mut out, "message", message);
    out.push_str(">\n");
    for (b, enc) in bvp.blobs.iter().zip(&encoded) {
        out.push_str("  <oneBLOB");
        push_attr(&mut out, "name", &b.name);
        push_attr(&mut out, "size", &b.size.to_string());
        push_attr(&mut out, "format", &b.format);
        push_attr(&mut out, "enclen", &enc.len().to_string());
        out.push('>');
        out.push_str(enc);
        out.push_str("</oneBLOB>\n");
    }
    out.push_str("</setBLOBVector>\n");
    out
}

// ---------------------------------------------------------------------------
// Config snapshots
//
// Saved state is replayed through the dispatcher, so snapshots are
// value-carrying new* elements. Numbers are written in full-precision
// decimal rather than the member display format, which may round.
// ---------------------------------------------------------------------------

pub fn new_number_vector(nvp: &NumberVector) -> String {
    let mut out = String::with_capacity(192 + nvp.numbers.len() * 64);
    out.push_str("<newNumberVector");
    push_attr(&mut out, "device", &nvp.device);
    push_attr(&mut out, "name", &nvp.name);
    out.push_str(">\n");
    for n in &nvp.numbers {
        push_child_text(&mut out, "oneNumber", &n.name, &format!("{}", n.value));
    }
    out.push_str("</newNumberVector>\n");
    out
}

pub fn new_switch_vector(svp: &SwitchVector) -> String {
    let mut out = String::with_capacity(192 + svp.switches.len() * 48);
    out.push_str("<newSwitchVector");
    push_attr(&mut out, "device", &svp.device);
    push_attr(&mut out, "name", &svp.name);
    out.push_str(">\n");
    for s in &svp.switches {
        push_child_text(&mut out, "oneSwitch", &s.name, s.state.as_wire());
    }
    out.push_str("</newSwitchVector>\n");
    out
}

pub fn new_text_vector(tvp: &TextVector) -> String {
    let mut out = String::with_capacity(192 + tvp.texts.len() * 64);
    out.push_str("<newTextVector");
    push_attr(&mut out, "device", &tvp.device);
    push_attr(&mut out, "name", &tvp.name);
    out.push_str(">\n");
    for t in &tvp.texts {
        push_child_text(&mut out, "oneText", &t.name, &t.value);
    }
    out.push_str("</newTextVector>\n");
    out
}

pub fn new_blob_vector(bvp: &BlobVector) -> String {
    let mut out = String::with_capacity(256 + bvp.blobs.len() * 96);
    out.push_str("<newBLOBVector");
    push_attr(&mut out, "device", &bvp.device);
    push_attr(&mut out, "name", &bvp.name);
    out.push_str(">\n");
    for b in &bvp.blobs {
        let enc = BASE64_STANDARD.encode(&b.data);
        out.push_str("  <oneBLOB");
        push_attr(&mut out, "name", &b.name);
        push_attr(&mut out, "size", &b.size.to_string());
        push_attr(&mut out, "format", &b.format);
        push_attr(&mut out, "enclen", &enc.len().to_string());
        out.push('>');
        out.push_str(&enc);
        out.push_str("</oneBLOB>\n");
    }
    out.push_str("</newBLOBVector>\n");
    out
}

// ---------------------------------------------------------------------------
// Control elements
// ---------------------------------------------------------------------------

pub fn message_element(device: Option<&str>, text: &str) -> String {
    let mut out = String::with_capacity(64 + text.len());
    out.push_str("<message");
    push_opt_attr(&mut out, "device", device);
    push_attr(&mut out, "message", text);
    out.push_str("/>\n");
    out
}

pub fn del_property(device: &str, name: Option<&str>, message: Option<&str>) -> String {
    let mut out = String::with_capacity(96);
    out.push_str("<delProperty");
    push_attr(&mut out, "device", device);
    push_opt_attr(&mut out, "name", name);
    push_opt_attr(&mut out, "message", message);
    out.push_str("/>\n");
    out
}

pub fn get_properties(version: &str, device: Option<&str>, name: Option<&str>) -> String {
    let mut out = String::with_capacity(96);
    out.push_str("<getProperties");
    push_attr(&mut out, "version", version);
    push_opt_attr(&mut out, "device", device);
    push_opt_attr(&mut out, "name", name);
    out.push_str("/>\n");
    out
}

pub fn enable_blob(device: &str, name: Option<&str>, policy: BlobPolicy) -> String {
    let mut out = String::with_capacity(96);
    out.push_str("<enableBLOB");
    push_attr(&mut out, "device", device);
    push_opt_attr(&mut out, "name", name);
    out.push('>');
    out.push_str(policy.as_wire());
    out.push_str("</enableBLOB>\n");
    out
}

pub fn ping_request(uid: &str) -> String {
    let mut out = String::with_capacity(48);
    out.push_str("<pingRequest");
    push_attr(&mut out, "uid", uid);
    out.push_str("/>\n");
    out
}

pub fn ping_reply(uid: &str) -> String {
    let mut out = String::with_capacity(48);
    out.push_str("<pingReply");
    push_attr(&mut out, "uid", uid);
    out.push_str("/>\n");
    out
}

/// Tag carried by BLOB pacing pings, `SetBLOB/<uid>`.
pub fn blob_ping_tag(uid: u64) -> String {
    format!("{BLOB_PING_PREFIX}{uid}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{Blob, Number, Permission, Switch, SwitchRule, SwitchState, Text};

    fn parse(xml: &str) -> roxmltree::Document<'_> {
        roxmltree::Document::parse(xml).expect("builders emit well-formed XML")
    }

    #[test]
    fn test_def_number_vector_shape() {
        let nvp = NumberVector::new("Cam", "CCD_EXPOSURE", "Expose", Permission::ReadWrite)
            .with_numbers(vec![Number::new(
                "CCD_EXPOSURE_VALUE",
                "Duration (s)",
                "%5.2f",
                0.0,
                3600.0,
                1.0,
                1.0,
            )]);

        let xml = def_number_vector(&nvp, Some("ready"));
        let doc = parse(&xml);
        let root = doc.root_element();

        assert_eq!(root.tag_name().name(), "defNumberVector");
        assert_eq!(root.attribute("device"), Some("Cam"));
        assert_eq!(root.attribute("perm"), Some("rw"));
        assert_eq!(root.attribute("message"), Some("ready"));

        let member = root
            .children()
            .find(|n| n.has_tag_name("defNumber"))
            .unwrap();
        assert_eq!(member.attribute("name"), Some("CCD_EXPOSURE_VALUE"));
        assert_eq!(member.attribute("min"), Some("0"));
        assert_eq!(member.attribute("max"), Some("3600"));
        assert_eq!(member.text().unwrap().trim(), "1.00");
    }

    #[test]
    fn test_def_switch_vector_carries_rule() {
        let svp = SwitchVector::new(
            "Mount",
            "CONNECTION",
            "Connection",
            Permission::ReadWrite,
            SwitchRule::OneOfMany,
        )
        .with_switches(vec![
            Switch::new("CONNECT", "Connect", SwitchState::Off),
            Switch::new("DISCONNECT", "Disconnect", SwitchState::On),
        ]);

        let xml = def_switch_vector(&svp, None);
        let doc = parse(&xml);
        let root = doc.root_element();
        assert_eq!(root.attribute("rule"), Some("OneOfMany"));
        assert!(root.attribute("message").is_none());

        let bodies: Vec<_> = root
            .children()
            .filter(|n| n.has_tag_name("defSwitch"))
            .map(|n| n.text().unwrap().to_string())
            .collect();
        assert_eq!(bodies, ["Off", "On"]);
    }

    #[test]
    fn test_set_blob_vector_encodes_base64() {
        let mut blob = Blob::new("CCD1", "Image");
        blob.format = ".fits".into();
        blob.size = 4;
        blob.data = vec![0xde, 0xad, 0xbe, 0xef];
        let bvp = BlobVector::new("Cam", "CCD1", "Image", Permission::ReadOnly)
            .with_blobs(vec![blob]);

        let xml = set_blob_vector(&bvp, None);
        let doc = parse(&xml);
        let one = doc
            .root_element()
            .children()
            .find(|n| n.has_tag_name("oneBLOB"))
            .unwrap();

        let body = one.text().unwrap();
        assert_eq!(one.attribute("enclen"), Some("8"));
        assert_eq!(one.attribute("size"), Some("4"));
        assert_eq!(BASE64_STANDARD.decode(body).unwrap(), [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_set_number_min_max_echoes_bounds() {
        let nvp = NumberVector::new("Cam", "CCD_EXPOSURE", "Expose", Permission::ReadWrite)
            .with_numbers(vec![Number::new("EXP", "Duration", "%g", 0.5, 120.0, 0.5, 1.0)]);

        let xml = set_number_min_max(&nvp);
        let doc = parse(&xml);
        let one = doc
            .root_element()
            .children()
            .find(|n| n.has_tag_name("oneNumber"))
            .unwrap();
        assert_eq!(one.attribute("min"), Some("0.5"));
        assert_eq!(one.attribute("max"), Some("120"));
        assert_eq!(one.attribute("step"), Some("0.5"));
        assert_eq!(one.text().unwrap(), "1");
    }

    #[test]
    fn test_attribute_and_text_escaping() {
        let tvp = TextVector::new("Cam", "NOTES", "Notes", Permission::ReadWrite)
            .with_texts(vec![Text::new("NOTE", "Note", "a<b & \"c\"")]);

        let xml = set_text_vector(&tvp, Some("it's <done>"));
        let doc = parse(&xml);
        let root = doc.root_element();
        assert_eq!(root.attribute("message"), Some("it's <done>"));
        let one = root.children().find(|n| n.has_tag_name("oneText")).unwrap();
        assert_eq!(one.text(), Some("a<b & \"c\""));
    }

    #[test]
    fn test_control_elements() {
        let doc_text = del_property("Cam", None, Some("bye"));
        let doc = parse(&doc_text);
        assert_eq!(doc.root_element().attribute("device"), Some("Cam"));
        assert!(doc.root_element().attribute("name").is_none());

        let doc_text = get_properties("1.7", Some("Mount"), None);
        let doc = parse(&doc_text);
        assert_eq!(doc.root_element().attribute("version"), Some("1.7"));

        let doc_text = enable_blob("Cam", Some("CCD1"), BlobPolicy::Only);
        let doc = parse(&doc_text);
        assert_eq!(doc.root_element().text(), Some("Only"));

        let doc_text = ping_request(&blob_ping_tag(3));
        let doc = parse(&doc_text);
        assert_eq!(doc.root_element().attribute("uid"), Some("SetBLOB/3"));
    }
}
