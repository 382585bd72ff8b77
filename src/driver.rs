// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Driver runtime entry point.
//!
//! A [`Driver`] owns the outbound writer, the defined-property registry
//! and the BLOB pacing gate. Driver binaries build one at startup, define
//! their properties through it, and feed it inbound elements from the
//! reader loop. Every method is callable from any thread.
//!
//! # Example
//!
//! ```no_run
//! use indi_driver::{Driver, NumberVector, Number, Permission};
//!
//! let driver = Driver::builder("rust_ccd").build();
//! let exposure = NumberVector::new("Cam", "CCD_EXPOSURE", "Expose", Permission::ReadWrite)
//!     .with_numbers(vec![Number::new(
//!         "CCD_EXPOSURE_VALUE", "Duration (s)", "%5.2f", 0.0, 3600.0, 1.0, 1.0,
//!     )])
//!     .into_shared();
//! driver.def_number(&exposure, None)?;
//! # Ok::<(), indi_driver::DriverError>(())
//! ```

use crate::error::Result;
use crate::io::{PingGate, ProtocolWriter};
use crate::property::{
    BlobPolicy, SharedBlobVector, SharedLightVector, SharedNumberVector, SharedSwitchVector,
    SharedTextVector,
};
use crate::registry::{PropertyHandle, PropertyRegistry};
use crate::wire;
use std::io::Write;
use std::time::Duration;
use tracing::debug;

/// Driver-side protocol runtime.
pub struct Driver {
    /// Executable name, used in diagnostics.
    pub(crate) name: String,
    /// Echo every inbound element to stderr before dispatch.
    pub(crate) verbose: bool,
    pub(crate) writer: ProtocolWriter,
    pub(crate) registry: PropertyRegistry,
    pub(crate) ping: PingGate,
}

/// Builder for [`Driver`].
pub struct DriverBuilder {
    name: String,
    verbose: bool,
    ping_timeout: Option<Duration>,
    sink: Option<Box<dyn Write + Send>>,
}

impl DriverBuilder {
    /// Echo inbound elements to stderr before dispatching them.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Bound the wait for a BLOB ping reply. Unset, a silent peer stalls
    /// BLOB emission forever, which is the historical protocol behaviour.
    pub fn ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = Some(timeout);
        self
    }

    /// Replace the output sink. Defaults to stdout.
    pub fn sink(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Driver {
        let writer = match self.sink {
            Some(sink) => ProtocolWriter::new(sink),
            None => ProtocolWriter::stdout(),
        };
        Driver {
            name: self.name,
            verbose: self.verbose,
            writer,
            registry: PropertyRegistry::new(),
            ping: PingGate::new(self.ping_timeout),
        }
    }
}

impl Driver {
    pub fn builder(name: impl Into<String>) -> DriverBuilder {
        DriverBuilder {
            name: name.into(),
            verbose: false,
            ping_timeout: None,
            sink: None,
        }
    }

    /// Executable name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    // -----------------------------------------------------------------
    // Definitions. Each emits one def element and records the property
    // for the peer update sanity check.
    // -----------------------------------------------------------------

    /// Tell the peer to create a number vector property.
    pub fn def_number(&self, nvp: &SharedNumberVector, message: Option<&str>) -> Result<()> {
        let (xml, device, name, perm) = {
            let vp = nvp.read();
            (
                wire::def_number_vector(&vp, message),
                vp.device.clone(),
                vp.name.clone(),
                vp.perm,
            )
        };
        self.writer.emit(&xml)?;
        debug!(device = %device, property = %name, "defined number vector");
        self.registry
            .register_once(&device, &name, perm, PropertyHandle::Number(nvp.clone()));
        Ok(())
    }

    /// Tell the peer to create a switch vector property.
    pub fn def_switch(&self, svp: &SharedSwitchVector, message: Option<&str>) -> Result<()> {
        let (xml, device, name, perm) = {
            let vp = svp.read();
            (
                wire::def_switch_vector(&vp, message),
                vp.device.clone(),
                vp.name.clone(),
                vp.perm,
            )
        };
        self.writer.emit(&xml)?;
        debug!(device = %device, property = %name, "defined switch vector");
        self.registry
            .register_once(&device, &name, perm, PropertyHandle::Switch(svp.clone()));
        Ok(())
    }

    /// Tell the peer to create a text vector property.
    pub fn def_text(&self, tvp: &SharedTextVector, message: Option<&str>) -> Result<()> {
        let (xml, device, name, perm) = {
            let vp = tvp.read();
            (
                wire::def_text_vector(&vp, message),
                vp.device.clone(),
                vp.name.clone(),
                vp.perm,
            )
        };
        self.writer.emit(&xml)?;
        debug!(device = %device, property = %name, "defined text vector");
        self.registry
            .register_once(&device, &name, perm, PropertyHandle::Text(tvp.clone()));
        Ok(())
    }

    /// Tell the peer to create a BLOB vector property.
    pub fn def_blob(&self, bvp: &SharedBlobVector, message: Option<&str>) -> Result<()> {
        let (xml, device, name, perm) = {
            let vp = bvp.read();
            (
                wire::def_blob_vector(&vp, message),
                vp.device.clone(),
                vp.name.clone(),
                vp.perm,
            )
        };
        self.writer.emit(&xml)?;
        debug!(device = %device, property = %name, "defined BLOB vector");
        self.registry
            .register_once(&device, &name, perm, PropertyHandle::Blob(bvp.clone()));
        Ok(())
    }

    /// Tell the peer to create a light vector property.
    ///
    /// Lights are output-only and deliberately skip the registry: a peer
    /// write targeting one keeps failing as "not defined".
    pub fn def_light(&self, lvp: &SharedLightVector, message: Option<&str>) -> Result<()> {
        let xml = {
            let vp = lvp.read();
            wire::def_light_vector(&vp, message)
        };
        self.writer.emit(&xml)?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------

    /// Send the current values of a number vector.
    pub fn set_number(&self, nvp: &SharedNumberVector, message: Option<&str>) -> Result<()> {
        let xml = {
            let vp = nvp.read();
            wire::set_number_vector(&vp, message)
        };
        self.writer.emit(&xml)?;
        Ok(())
    }

    /// Send the current states of a switch vector.
    pub fn set_switch(&self, svp: &SharedSwitchVector, message: Option<&str>) -> Result<()> {
        let xml = {
            let vp = svp.read();
            wire::set_switch_vector(&vp, message)
        };
        self.writer.emit(&xml)?;
        Ok(())
    }

    /// Send the current values of a text vector.
    pub fn set_text(&self, tvp: &SharedTextVector, message: Option<&str>) -> Result<()> {
        let xml = {
            let vp = tvp.read();
            wire::set_text_vector(&vp, message)
        };
        self.writer.emit(&xml)?;
        Ok(())
    }

    /// Send the current states of a light vector.
    pub fn set_light(&self, lvp: &SharedLightVector, message: Option<&str>) -> Result<()> {
        let xml = {
            let vp = lvp.read();
            wire::set_light_vector(&vp, message)
        };
        self.writer.emit(&xml)?;
        Ok(())
    }

    /// Send the current payloads of a BLOB vector, paced by the ping
    /// gate: blocks while a previous BLOB is still unacknowledged, then
    /// emits the vector and its `pingRequest` back to back.
    pub fn set_blob(&self, bvp: &SharedBlobVector, message: Option<&str>) -> Result<()> {
        let uid = self.ping.acquire()?;
        let xml = {
            let vp = bvp.read();
            wire::set_blob_vector(&vp, message)
        };
        let ping = wire::ping_request(&wire::blob_ping_tag(uid));
        self.writer.emit_all(&[&xml, &ping])?;
        Ok(())
    }

    /// Echo min/max/step of every member so the peer can refresh the
    /// bounds it learned from the definition.
    pub fn update_min_max(&self, nvp: &SharedNumberVector) -> Result<()> {
        let xml = {
            let vp = nvp.read();
            wire::set_number_min_max(&vp)
        };
        self.writer.emit(&xml)?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Control traffic
    // -----------------------------------------------------------------

    /// Send a human-readable message, for a device or at large.
    pub fn message(&self, device: Option<&str>, text: &str) -> Result<()> {
        self.writer.emit(&wire::message_element(device, text))?;
        Ok(())
    }

    /// Tell the peer to delete one property, or the whole device when
    /// `name` is `None`. The registry keeps its entry either way.
    pub fn delete_property(
        &self,
        device: &str,
        name: Option<&str>,
        message: Option<&str>,
    ) -> Result<()> {
        debug!(device = %device, property = ?name, "deleting property");
        self.writer.emit(&wire::del_property(device, name, message))?;
        Ok(())
    }

    /// Ask the server to forward another device's property traffic to
    /// us. Silently ignored for an empty device name.
    pub fn snoop_request(&self, device: &str, property: Option<&str>) -> Result<()> {
        if device.is_empty() {
            return Ok(());
        }
        self.writer.emit(&wire::get_properties(
            crate::PROTOCOL_VERSION_STR,
            Some(device),
            property,
        ))?;
        Ok(())
    }

    /// Tell the server how to treat BLOBs from a snooped device.
    /// Silently ignored for an empty device name.
    pub fn snoop_blob_policy(
        &self,
        device: &str,
        property: Option<&str>,
        policy: BlobPolicy,
    ) -> Result<()> {
        if device.is_empty() {
            return Ok(());
        }
        self.writer.emit(&wire::enable_blob(device, property, policy))?;
        Ok(())
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("name", &self.name)
            .field("verbose", &self.verbose)
            .field("registered", &self.registry.len())
            .finish_non_exhaustive()
    }
}
