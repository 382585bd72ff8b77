// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Inbound element dispatch.
//!
//! One parsed top-level element goes in; the matching driver callback
//! comes out, after classification and sanity checks:
//!
//! 1. `getProperties` with a version gate (an incompatible client is
//!    fatal) and the late-joiner definition echo
//! 2. `pingReply` / `pingRequest` for BLOB pacing
//! 3. the snoop feed, forwarded wholesale because the runtime does not
//!    know which devices the driver snoops
//! 4. `new*Vector` authoritative writes, checked against the registry
//!    (defined, not read-only) and decoded member by member
//! 5. anything else is an unknown command, a soft error
//!
//! Member decode failures never abort a batch; valid members proceed and
//! the failure is reported with a per-device `message` element. A batch
//! with zero valid members is reported the same way and the callback is
//! skipped.

use crate::error::{DriverError, Result};
use crate::property::{Permission, SwitchState};
use crate::registry::PropertyHandle;
use crate::wire;
use crate::{numeric, Driver, PROTOCOL_VERSION};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use tracing::{debug, warn};

/// Root tags forwarded to `on_snoop` unchanged.
const SNOOP_TAGS: [&str; 12] = [
    "setNumberVector",
    "setTextVector",
    "setLightVector",
    "setSwitchVector",
    "setBLOBVector",
    "defNumberVector",
    "defTextVector",
    "defLightVector",
    "defSwitchVector",
    "defBLOBVector",
    "message",
    "delProperty",
];

/// One decoded `oneNumber` child.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberUpdate {
    pub name: String,
    pub value: f64,
}

/// One decoded `oneSwitch` child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchUpdate {
    pub name: String,
    pub state: SwitchState,
}

/// One decoded `oneText` child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUpdate {
    pub name: String,
    pub value: String,
}

/// One decoded `oneBLOB` child. `data` is the decoded payload; its
/// length is the `bloblen` of the wire element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobUpdate {
    pub name: String,
    pub format: String,
    pub size: i64,
    pub data: Vec<u8>,
}

/// Host-provided driver callbacks.
///
/// Every callback receives the runtime so driver code can emit replies
/// from inside the handler. Callbacks run synchronously on the thread
/// feeding [`Driver::dispatch`].
#[allow(unused_variables)]
pub trait DeviceHandler {
    /// Peer asked for property definitions, for one device or all.
    fn on_get_properties(&mut self, driver: &Driver, device: Option<&str>) {}

    /// Authoritative number write for a defined, writable property.
    fn on_new_number(
        &mut self,
        driver: &Driver,
        device: &str,
        name: &str,
        updates: &[NumberUpdate],
    ) {
    }

    /// Authoritative switch write for a defined, writable property.
    fn on_new_switch(
        &mut self,
        driver: &Driver,
        device: &str,
        name: &str,
        updates: &[SwitchUpdate],
    ) {
    }

    /// Authoritative text write for a defined, writable property.
    fn on_new_text(&mut self, driver: &Driver, device: &str, name: &str, updates: &[TextUpdate]) {}

    /// Authoritative BLOB write. The decoded buffers are handed over by
    /// value and dropped when the handler is done with them.
    fn on_new_blob(&mut self, driver: &Driver, device: &str, name: &str, updates: Vec<BlobUpdate>) {
    }

    /// Traffic from some possibly-snooped device. Filtering is the
    /// driver's job; the runtime forwards everything.
    fn on_snoop(&mut self, driver: &Driver, element: roxmltree::Node<'_, '_>) {}
}

impl Driver {
    /// Parse and dispatch one top-level element.
    ///
    /// Returns the reject reason for undefined or read-only targets and
    /// [`DriverError::UnknownCommand`] for unrecognised root tags; the
    /// latter is soft and the read loop may carry on.
    pub fn dispatch(&self, handler: &mut dyn DeviceHandler, element: &str) -> Result<()> {
        if self.verbose {
            eprintln!("{}: {}", self.name, element.trim_end());
        }
        let doc = roxmltree::Document::parse(element)?;
        self.dispatch_node(handler, doc.root_element())
    }

    /// Dispatch an already-parsed element. Config replay enters here.
    pub(crate) fn dispatch_node(
        &self,
        handler: &mut dyn DeviceHandler,
        root: roxmltree::Node<'_, '_>,
    ) -> Result<()> {
        let tag = root.tag_name().name();
        debug!(tag = %tag, "dispatching inbound element");

        if tag == "getProperties" {
            return self.handle_get_properties(handler, root);
        }

        if tag == "pingReply" {
            if let Some(uid) = root.attribute("uid") {
                self.ping.fulfil(uid);
            }
            return Ok(());
        }

        // Answer the peer's own pacing probes right away so the reader
        // loop never owes latency to driver code.
        if tag == "pingRequest" {
            if let Some(uid) = root.attribute("uid") {
                self.writer.emit(&wire::ping_reply(uid))?;
            }
            return Ok(());
        }

        if SNOOP_TAGS.contains(&tag) {
            handler.on_snoop(self, root);
            return Ok(());
        }

        match tag {
            "newNumberVector" => self.handle_new_number(handler, root),
            "newSwitchVector" => self.handle_new_switch(handler, root),
            "newTextVector" => self.handle_new_text(handler, root),
            "newBLOBVector" => self.handle_new_blob(handler, root),
            other => {
                warn!(tag = %other, "unknown command");
                Err(DriverError::UnknownCommand(other.to_string()))
            }
        }
    }

    fn handle_get_properties(
        &self,
        handler: &mut dyn DeviceHandler,
        root: roxmltree::Node<'_, '_>,
    ) -> Result<()> {
        let Some(version) = root.attribute("version") else {
            eprintln!("{}: getProperties missing version", self.name);
            std::process::exit(1);
        };
        // Lenient parse: a malformed version reads as 0 and is accepted,
        // only a proclaimed newer protocol is fatal.
        let v: f64 = version.trim().parse().unwrap_or(0.0);
        if v > PROTOCOL_VERSION {
            eprintln!("{}: client version {} > {}", self.name, v, PROTOCOL_VERSION);
            std::process::exit(1);
        }

        let device = root.attribute("device");
        let name = root.attribute("name");

        // A fully-addressed request from a late joiner gets the stored
        // definition back; an unknown address gets nothing.
        if let (Some(device), Some(name)) = (device, name) {
            let Some(entry) = self.registry.lookup(device, name) else {
                return Ok(());
            };
            return match &entry.handle {
                PropertyHandle::Number(h) => self.def_number(h, None),
                PropertyHandle::Switch(h) => self.def_switch(h, None),
                PropertyHandle::Text(h) => self.def_text(h, None),
                PropertyHandle::Blob(h) => self.def_blob(h, None),
            };
        }

        handler.on_get_properties(self, device);
        Ok(())
    }

    /// Pull `device` and `name` off an authoritative write and run the
    /// defined/read-only sanity checks.
    fn checked_address<'a>(
        &self,
        root: &roxmltree::Node<'a, '_>,
    ) -> Result<(&'a str, &'a str)> {
        let tag = root.tag_name().name();
        let (Some(device), Some(name)) = (root.attribute("device"), root.attribute("name"))
        else {
            return Err(DriverError::MissingAddress {
                tag: tag.to_string(),
            });
        };

        let Some(entry) = self.registry.lookup(device, name) else {
            warn!(device = %device, property = %name, "write to undefined property");
            return Err(DriverError::NotDefined {
                device: device.to_string(),
                name: name.to_string(),
            });
        };
        if entry.perm == Permission::ReadOnly {
            warn!(device = %device, property = %name, "write to read-only property");
            return Err(DriverError::ReadOnly(name.to_string()));
        }
        Ok((device, name))
    }

    fn handle_new_number(
        &self,
        handler: &mut dyn DeviceHandler,
        root: roxmltree::Node<'_, '_>,
    ) -> Result<()> {
        let (device, name) = self.checked_address(&root)?;

        let mut updates = Vec::new();
        for child in root.children().filter(|c| c.has_tag_name("oneNumber")) {
            let Some(member) = child.attribute("name") else {
                continue;
            };
            let body = child.text().unwrap_or("");
            match numeric::parse_number(body) {
                Some(value) => updates.push(NumberUpdate {
                    name: member.to_string(),
                    value,
                }),
                None => {
                    self.message(
                        Some(device),
                        &format!("[ERROR] {}: Bad format {}", name, body.trim()),
                    )?;
                }
            }
        }

        if updates.is_empty() {
            self.message(
                Some(device),
                &format!("[ERROR] {name}: newNumberVector with no valid members"),
            )?;
            return Ok(());
        }
        handler.on_new_number(self, device, name, &updates);
        Ok(())
    }

    fn handle_new_switch(
        &self,
        handler: &mut dyn DeviceHandler,
        root: roxmltree::Node<'_, '_>,
    ) -> Result<()> {
        let (device, name) = self.checked_address(&root)?;

        let mut updates = Vec::new();
        for child in root.children().filter(|c| c.has_tag_name("oneSwitch")) {
            let Some(member) = child.attribute("name") else {
                continue;
            };
            let body = child.text().unwrap_or("").trim();
            match SwitchState::from_wire(body) {
                Some(state) => updates.push(SwitchUpdate {
                    name: member.to_string(),
                    state,
                }),
                None => {
                    self.message(
                        Some(device),
                        &format!("[ERROR] {name}: must be On or Off: {body}"),
                    )?;
                }
            }
        }

        if updates.is_empty() {
            self.message(
                Some(device),
                &format!("[ERROR] {name}: newSwitchVector with no valid members"),
            )?;
            return Ok(());
        }
        handler.on_new_switch(self, device, name, &updates);
        Ok(())
    }

    fn handle_new_text(
        &self,
        handler: &mut dyn DeviceHandler,
        root: roxmltree::Node<'_, '_>,
    ) -> Result<()> {
        let (device, name) = self.checked_address(&root)?;

        let mut updates = Vec::new();
        for child in root.children().filter(|c| c.has_tag_name("oneText")) {
            let Some(member) = child.attribute("name") else {
                continue;
            };
            updates.push(TextUpdate {
                name: member.to_string(),
                value: child.text().unwrap_or("").to_string(),
            });
        }

        if updates.is_empty() {
            self.message(
                Some(device),
                &format!("[ERROR] {name}: set with no valid members"),
            )?;
            return Ok(());
        }
        handler.on_new_text(self, device, name, &updates);
        Ok(())
    }

    fn handle_new_blob(
        &self,
        handler: &mut dyn DeviceHandler,
        root: roxmltree::Node<'_, '_>,
    ) -> Result<()> {
        let (device, name) = self.checked_address(&root)?;

        let mut updates = Vec::new();
        for child in root.children().filter(|c| c.has_tag_name("oneBLOB")) {
            let (Some(member), Some(format), Some(size)) = (
                child.attribute("name"),
                child.attribute("format"),
                child.attribute("size"),
            ) else {
                continue;
            };

            let body = child.text().unwrap_or("");
            // enclen, when present, bounds the encoded region exactly.
            let encoded = match child.attribute("enclen").and_then(|e| e.parse::<usize>().ok()) {
                Some(len) => body.get(..len).unwrap_or(body),
                None => body,
            };
            let cleaned: String = encoded
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();

            match BASE64_STANDARD.decode(cleaned.as_bytes()) {
                Ok(data) => updates.push(BlobUpdate {
                    name: member.to_string(),
                    format: format.to_string(),
                    size: size.trim().parse().unwrap_or(0),
                    data,
                }),
                Err(_) => {
                    self.message(
                        Some(device),
                        &format!("[ERROR] {name}: Bad BLOB encoding in {member}"),
                    )?;
                }
            }
        }

        if updates.is_empty() {
            self.message(
                Some(device),
                &format!("[ERROR] {name}: newBLOBVector with no valid members"),
            )?;
            return Ok(());
        }
        handler.on_new_blob(self, device, name, updates);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{
        Number, NumberVector, Switch, SwitchRule, SwitchVector, Text, TextVector,
    };
    use crate::test_support::CaptureSink;

    #[derive(Default)]
    struct Recorder {
        get_properties: Vec<Option<String>>,
        numbers: Vec<(String, String, Vec<NumberUpdate>)>,
        switches: Vec<(String, String, Vec<SwitchUpdate>)>,
        texts: Vec<(String, String, Vec<TextUpdate>)>,
        blobs: Vec<(String, String, Vec<BlobUpdate>)>,
        snooped: Vec<String>,
    }

    impl DeviceHandler for Recorder {
        fn on_get_properties(&mut self, _: &Driver, device: Option<&str>) {
            self.get_properties.push(device.map(str::to_string));
        }

        fn on_new_number(&mut self, _: &Driver, d: &str, n: &str, u: &[NumberUpdate]) {
            self.numbers.push((d.into(), n.into(), u.to_vec()));
        }

        fn on_new_switch(&mut self, _: &Driver, d: &str, n: &str, u: &[SwitchUpdate]) {
            self.switches.push((d.into(), n.into(), u.to_vec()));
        }

        fn on_new_text(&mut self, _: &Driver, d: &str, n: &str, u: &[TextUpdate]) {
            self.texts.push((d.into(), n.into(), u.to_vec()));
        }

        fn on_new_blob(&mut self, _: &Driver, d: &str, n: &str, u: Vec<BlobUpdate>) {
            self.blobs.push((d.into(), n.into(), u));
        }

        fn on_snoop(&mut self, _: &Driver, element: roxmltree::Node<'_, '_>) {
            self.snooped.push(element.tag_name().name().to_string());
        }
    }

    fn driver_with_sink() -> (Driver, CaptureSink) {
        let sink = CaptureSink::default();
        let driver = Driver::builder("test_driver")
            .sink(Box::new(sink.clone()))
            .build();
        (driver, sink)
    }

    #[test]
    fn test_undefined_property_is_rejected() {
        let (driver, _sink) = driver_with_sink();
        let mut handler = Recorder::default();

        let err = driver
            .dispatch(
                &mut handler,
                "<newNumberVector device=\"Cam\" name=\"EXPOSURE\">\
                 <oneNumber name=\"EXP\">1</oneNumber></newNumberVector>",
            )
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Property EXPOSURE is not defined in Cam."
        );
        assert!(handler.numbers.is_empty());
    }

    #[test]
    fn test_read_only_property_is_rejected() {
        let (driver, _sink) = driver_with_sink();
        let mut handler = Recorder::default();

        let tvp = TextVector::new("Cam", "DRIVER_INFO", "Info", Permission::ReadOnly)
            .with_texts(vec![Text::new("VERSION", "Version", "1.0")])
            .into_shared();
        driver.def_text(&tvp, None).unwrap();

        let err = driver
            .dispatch(
                &mut handler,
                "<newTextVector device=\"Cam\" name=\"DRIVER_INFO\">\
                 <oneText name=\"VERSION\">evil</oneText></newTextVector>",
            )
            .unwrap_err();

        assert_eq!(err.to_string(), "Cannot set read-only property DRIVER_INFO");
        assert!(handler.texts.is_empty());
        assert_eq!(tvp.read().find("VERSION").unwrap().value, "1.0");
    }

    #[test]
    fn test_new_number_decodes_sexagesimal() {
        let (driver, _sink) = driver_with_sink();
        let mut handler = Recorder::default();

        let nvp = NumberVector::new("Mount", "EQ_COORD", "Coords", Permission::ReadWrite)
            .with_numbers(vec![Number::new("RA", "RA", "%10.6m", 0.0, 24.0, 0.0, 0.0)])
            .into_shared();
        driver.def_number(&nvp, None).unwrap();

        driver
            .dispatch(
                &mut handler,
                "<newNumberVector device=\"Mount\" name=\"EQ_COORD\">\
                 <oneNumber name=\"RA\">12:30:36</oneNumber></newNumberVector>",
            )
            .unwrap();

        let (_, _, updates) = &handler.numbers[0];
        assert_eq!(updates.len(), 1);
        assert!((updates[0].value - 12.51).abs() < 1e-9);
    }

    #[test]
    fn test_bad_number_is_skipped_not_fatal() {
        let (driver, sink) = driver_with_sink();
        let mut handler = Recorder::default();

        let nvp = NumberVector::new("Cam", "SETTINGS", "Settings", Permission::ReadWrite)
            .with_numbers(vec![
                Number::new("GAIN", "Gain", "%g", 0.0, 100.0, 1.0, 0.0),
                Number::new("OFFSET", "Offset", "%g", 0.0, 100.0, 1.0, 0.0),
            ])
            .into_shared();
        driver.def_number(&nvp, None).unwrap();

        driver
            .dispatch(
                &mut handler,
                "<newNumberVector device=\"Cam\" name=\"SETTINGS\">\
                 <oneNumber name=\"GAIN\">evil</oneNumber>\
                 <oneNumber name=\"OFFSET\">7</oneNumber></newNumberVector>",
            )
            .unwrap();

        let (_, _, updates) = &handler.numbers[0];
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name, "OFFSET");
        assert!(sink.contents().contains("Bad format evil"));
    }

    #[test]
    fn test_empty_batch_skips_callback() {
        let (driver, sink) = driver_with_sink();
        let mut handler = Recorder::default();

        let nvp = NumberVector::new("Cam", "SETTINGS", "Settings", Permission::ReadWrite)
            .with_numbers(vec![Number::new("GAIN", "Gain", "%g", 0.0, 100.0, 1.0, 0.0)])
            .into_shared();
        driver.def_number(&nvp, None).unwrap();

        driver
            .dispatch(
                &mut handler,
                "<newNumberVector device=\"Cam\" name=\"SETTINGS\">\
                 <oneNumber name=\"GAIN\">evil</oneNumber></newNumberVector>",
            )
            .unwrap();

        assert!(handler.numbers.is_empty());
        assert!(sink
            .contents()
            .contains("SETTINGS: newNumberVector with no valid members"));
    }

    #[test]
    fn test_switch_bodies_on_prefix_off_exact() {
        let (driver, sink) = driver_with_sink();
        let mut handler = Recorder::default();

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
        ])
        .into_shared();
        driver.def_switch(&svp, None).unwrap();

        driver
            .dispatch(
                &mut handler,
                "<newSwitchVector device=\"Mount\" name=\"CONNECTION\">\
                 <oneSwitch name=\"CONNECT\">On</oneSwitch>\
                 <oneSwitch name=\"DISCONNECT\">Offline</oneSwitch></newSwitchVector>",
            )
            .unwrap();

        let (_, _, updates) = &handler.switches[0];
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name, "CONNECT");
        assert!(sink.contents().contains("must be On or Off: Offline"));
    }

    #[test]
    fn test_blob_decode_with_enclen() {
        let (driver, _sink) = driver_with_sink();
        let mut handler = Recorder::default();

        let bvp = crate::property::BlobVector::new("Cam", "CCD1", "Image", Permission::ReadWrite)
            .with_blobs(vec![crate::property::Blob::new("CCD1", "Image")])
            .into_shared();
        driver.def_blob(&bvp, None).unwrap();

        // "3q2+7w==" is deadbeef; trailing junk is cut off by enclen.
        driver
            .dispatch(
                &mut handler,
                "<newBLOBVector device=\"Cam\" name=\"CCD1\">\
                 <oneBLOB name=\"CCD1\" format=\".bin\" size=\"4\" enclen=\"8\">3q2+7w==JUNK</oneBLOB>\
                 </newBLOBVector>",
            )
            .unwrap();

        let (_, _, updates) = &handler.blobs[0];
        assert_eq!(updates[0].data, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(updates[0].size, 4);
        assert_eq!(updates[0].format, ".bin");
    }

    #[test]
    fn test_snoop_feed_forwards_wholesale() {
        let (driver, _sink) = driver_with_sink();
        let mut handler = Recorder::default();

        driver
            .dispatch(
                &mut handler,
                "<setNumberVector device=\"Other\" name=\"FOO\">\
                 <oneNumber name=\"X\">1</oneNumber></setNumberVector>",
            )
            .unwrap();
        driver
            .dispatch(&mut handler, "<message device=\"Other\" message=\"hi\"/>")
            .unwrap();

        assert_eq!(handler.snooped, ["setNumberVector", "message"]);
    }

    #[test]
    fn test_unknown_command_is_soft() {
        let (driver, _sink) = driver_with_sink();
        let mut handler = Recorder::default();

        let err = driver.dispatch(&mut handler, "<bogusTag/>").unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: bogusTag");
        assert!(err.is_soft());
    }

    #[test]
    fn test_get_properties_invokes_callback() {
        let (driver, _sink) = driver_with_sink();
        let mut handler = Recorder::default();

        driver
            .dispatch(&mut handler, "<getProperties version=\"1.7\"/>")
            .unwrap();
        driver
            .dispatch(
                &mut handler,
                "<getProperties version=\"1.7\" device=\"Mount\"/>",
            )
            .unwrap();

        assert_eq!(handler.get_properties, [None, Some("Mount".to_string())]);
    }

    #[test]
    fn test_get_properties_late_joiner_echo() {
        let (driver, sink) = driver_with_sink();
        let mut handler = Recorder::default();

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
        ])
        .into_shared();
        driver.def_switch(&svp, None).unwrap();

        driver
            .dispatch(
                &mut handler,
                "<getProperties version=\"1.7\" device=\"Mount\" name=\"CONNECTION\"/>",
            )
            .unwrap();

        // One def from the explicit call, one from the echo, no callback.
        assert_eq!(sink.contents().matches("<defSwitchVector").count(), 2);
        assert!(handler.get_properties.is_empty());

        // Fully-addressed but unknown: nothing happens.
        driver
            .dispatch(
                &mut handler,
                "<getProperties version=\"1.7\" device=\"Mount\" name=\"NOPE\"/>",
            )
            .unwrap();
        assert!(handler.get_properties.is_empty());
    }

    #[test]
    fn test_ping_request_is_answered() {
        let (driver, sink) = driver_with_sink();
        let mut handler = Recorder::default();

        driver
            .dispatch(&mut handler, "<pingRequest uid=\"abc/7\"/>")
            .unwrap();
        assert!(sink.contents().contains("<pingReply uid=\"abc/7\"/>"));
    }

    #[test]
    fn test_ping_reply_fulfils_gate() {
        let (driver, _sink) = driver_with_sink();
        let mut handler = Recorder::default();

        let bvp = crate::property::BlobVector::new("Cam", "CCD1", "Image", Permission::ReadOnly)
            .into_shared();
        driver.set_blob(&bvp, None).unwrap();
        assert_eq!(driver.ping.pending(), Some(1));

        driver
            .dispatch(&mut handler, "<pingReply uid=\"SetBLOB/1\"/>")
            .unwrap();
        assert_eq!(driver.ping.pending(), None);
    }

    #[test]
    fn test_missing_address_is_rejected() {
        let (driver, _sink) = driver_with_sink();
        let mut handler = Recorder::default();

        let err = driver
            .dispatch(&mut handler, "<newNumberVector device=\"Cam\"/>")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "newNumberVector requires 'device' and 'name' attributes"
        );
    }
}
