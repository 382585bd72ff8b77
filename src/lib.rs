// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # indi-driver - INDI driver-side protocol runtime
//!
//! The library linked into an INDI driver process. A driver owns one or
//! more logical devices, each exposing typed vector properties to a
//! controlling server/client over a byte stream (normally stdin/stdout).
//! This runtime serialises outbound definitions, updates, deletions and
//! messages as an XML element stream, parses and dispatches inbound
//! commands to driver callbacks, enforces the protocol invariants a
//! driver must not violate, and paces large BLOB payloads with a
//! ping/reply handshake.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use indi_driver::{
//!     DeviceHandler, Driver, Number, NumberUpdate, NumberVector, Permission,
//! };
//!
//! struct Camera {
//!     exposure: indi_driver::SharedNumberVector,
//! }
//!
//! impl DeviceHandler for Camera {
//!     fn on_get_properties(&mut self, driver: &Driver, _device: Option<&str>) {
//!         driver.def_number(&self.exposure, None).ok();
//!     }
//!
//!     fn on_new_number(
//!         &mut self,
//!         driver: &Driver,
//!         _device: &str,
//!         _name: &str,
//!         updates: &[NumberUpdate],
//!     ) {
//!         if driver.update_numbers(&self.exposure, updates).is_ok() {
//!             driver.set_number(&self.exposure, Some("exposure started")).ok();
//!         }
//!     }
//! }
//!
//! fn main() -> indi_driver::Result<()> {
//!     let driver = Driver::builder("rust_ccd").build();
//!     let mut camera = Camera {
//!         exposure: NumberVector::new("Cam", "CCD_EXPOSURE", "Expose", Permission::ReadWrite)
//!             .with_numbers(vec![Number::new(
//!                 "CCD_EXPOSURE_VALUE", "Duration (s)", "%5.2f", 0.0, 3600.0, 1.0, 1.0,
//!             )])
//!             .into_shared(),
//!     };
//!
//!     // Reader loop: feed each inbound top-level element to dispatch.
//!     let element = "<getProperties version=\"1.7\"/>";
//!     driver.dispatch(&mut camera, element)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules Overview
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`property`] | Vector property data model (Number, Switch, Text, Light, Blob) |
//! | [`registry`] | Defined-property table backing the peer update sanity checks |
//! | [`wire`] | Outbound XML element builders |
//! | [`io`] | Writer sink and BLOB pacing gate |
//! | [`dispatch`] | Inbound classification, decoding and callback dispatch |
//! | `update` | Atomic validate-then-commit value applicators on [`Driver`] |
//! | [`config`] | Property state persistence in the wire grammar |
//!
//! ## Protocol Shape
//!
//! One top-level XML element per message, no prologue, in both
//! directions. Definitions must precede updates for a property; the
//! runtime registers every definition and rejects peer writes to
//! undefined or read-only properties on the driver's behalf.

/// Property state persistence (load, save, purge, point queries).
pub mod config;
/// Inbound element dispatch and the driver callback trait.
pub mod dispatch;
mod driver;
mod error;
/// Protocol stream plumbing.
pub mod io;
/// Numeric member parsing and printf style formatting.
pub mod numeric;
/// Vector property data model.
pub mod property;
/// Defined-property registry.
pub mod registry;
mod update;
/// Outbound element builders.
pub mod wire;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{
    config_path, create_config_file, default_config_path, get_config_number,
    get_config_on_switch_index, get_config_on_switch_name, get_config_switch, get_config_text,
    purge_config, save_config_blob, save_config_number, save_config_switch, save_config_text,
    save_default_config,
};
pub use dispatch::{BlobUpdate, DeviceHandler, NumberUpdate, SwitchUpdate, TextUpdate};
pub use driver::{Driver, DriverBuilder};
pub use error::{DriverError, Result};
pub use property::{
    Blob, BlobPolicy, BlobVector, Light, LightVector, Number, NumberVector, Permission,
    PropertyKind, PropertyState, SharedBlobVector, SharedLightVector, SharedNumberVector,
    SharedSwitchVector, SharedTextVector, Switch, SwitchRule, SwitchState, SwitchVector, Text,
    TextVector,
};
pub use registry::{PropertyHandle, PropertyRegistry, RegistryEntry};

/// Highest protocol version this runtime speaks. A `getProperties`
/// proclaiming a newer version is fatal.
pub const PROTOCOL_VERSION: f64 = 1.7;

/// Wire form of [`PROTOCOL_VERSION`].
pub const PROTOCOL_VERSION_STR: &str = "1.7";
