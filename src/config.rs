// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Property state persistence.
//!
//! Snapshots reuse the wire grammar: a `<INDIDriver>` wrapper whose
//! children are value-carrying `new*Vector` elements, so restoring a file
//! is nothing more than replaying each child through the dispatcher.
//!
//! File locations:
//!
//! - `$INDICONFIG` overrides everything when set
//! - otherwise `$HOME/.indi/<device>_config.xml`, with the `.indi`
//!   directory created mode 0755 on first use
//! - `$HOME/.indi/<device>_config.xml.default` holds a pristine copy
//!   written once by [`save_default_config`]
//!
//! A config file or directory owned by root while the driver runs
//! unprivileged is refused with a fixed remediation message; that setup
//! breaks every later save.
//!
//! Persistence failures are returned as [`DriverError::Config`] with a
//! textual reason and never emitted on the wire.

use crate::dispatch::DeviceHandler;
use crate::error::{DriverError, Result};
use crate::numeric;
use crate::property::{
    SharedBlobVector, SharedNumberVector, SharedSwitchVector, SharedTextVector, SwitchState,
};
use crate::wire;
use crate::Driver;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Root wrapper tag of a config file.
pub const CONFIG_ROOT_TAG: &str = "INDIDriver";

const ROOT_OWNED: &str = "Config file is owned by root! This will lead to serious errors. \
     To fix this, run: sudo chown -R $USER:$USER ~/.indi";

/// `$HOME/.indi`.
fn config_dir() -> Result<PathBuf> {
    let home = env::var("HOME").map_err(|_| DriverError::Config("HOME is not set".into()))?;
    Ok(PathBuf::from(home).join(".indi"))
}

/// Resolve the config file for a device: explicit path, `$INDICONFIG`,
/// or the per-device default.
pub fn config_path(file: Option<&Path>, device: &str) -> Result<PathBuf> {
    if let Some(file) = file {
        return Ok(file.to_path_buf());
    }
    if let Ok(file) = env::var("INDICONFIG") {
        return Ok(PathBuf::from(file));
    }
    Ok(config_dir()?.join(format!("{device}_config.xml")))
}

/// Resolve the pristine-copy destination for a device.
pub fn default_config_path(file: Option<&Path>, device: &str) -> Result<PathBuf> {
    if let Some(file) = file {
        return Ok(file.to_path_buf());
    }
    if let Ok(file) = env::var("INDICONFIG") {
        return Ok(PathBuf::from(format!("{file}.default")));
    }
    Ok(config_dir()?.join(format!("{device}_config.xml.default")))
}

/// Refuse paths owned by root when this process is not root.
fn check_ownership(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Ok(meta) = fs::metadata(path) {
            let foreign_uid = meta.uid() == 0 && !nix::unistd::getuid().is_root();
            let foreign_gid = meta.gid() == 0 && nix::unistd::getgid().as_raw() != 0;
            if foreign_uid || foreign_gid {
                return Err(DriverError::Config(ROOT_OWNED.into()));
            }
        }
    }
    let _ = path;
    Ok(())
}

/// Resolve a config path and make it usable: bootstrap `$HOME/.indi`
/// (0755) when the default location is in play, then run the ownership
/// check on the directory and the file.
fn prepare_config_path(file: Option<&Path>, device: &str) -> Result<PathBuf> {
    if file.is_none() && env::var("INDICONFIG").is_err() {
        let dir = config_dir()?;
        if !dir.exists() {
            let mut builder = fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o755);
            }
            builder.create(&dir).map_err(|e| {
                DriverError::Config(format!(
                    "Unable to create config directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        check_ownership(&dir)?;
    }

    let path = config_path(file, device)?;
    check_ownership(&path)?;
    Ok(path)
}

/// Open the config file for writing, creating it (and the config
/// directory) as needed. Pair with [`Driver::save_config_tag`] and the
/// `save_config_*` writers.
pub fn create_config_file(file: Option<&Path>, device: &str) -> Result<fs::File> {
    let path = prepare_config_path(file, device)?;
    fs::File::create(&path).map_err(|e| {
        DriverError::Config(format!(
            "Unable to open config file. Error loading file {}: {}",
            path.display(),
            e
        ))
    })
}

/// Copy the current config to the pristine-copy location once.
///
/// Returns `Ok(true)` when the copy was written and `Ok(false)` when the
/// destination already existed and was left alone.
pub fn save_default_config(
    source: Option<&Path>,
    dest: Option<&Path>,
    device: &str,
) -> Result<bool> {
    let dst = default_config_path(dest, device)?;
    if dst.exists() {
        return Ok(false);
    }
    let src = config_path(source, device)?;
    fs::copy(&src, &dst).map_err(|e| {
        DriverError::Config(format!(
            "Unable to copy {} to {}: {}",
            src.display(),
            dst.display(),
            e
        ))
    })?;
    Ok(true)
}

/// Delete the device's config file.
pub fn purge_config(file: Option<&Path>, device: &str) -> Result<()> {
    let path = config_path(file, device)?;
    fs::remove_file(&path).map_err(|e| {
        DriverError::Config(format!(
            "Unable to purge configuration file {}. Error {}",
            path.display(),
            e
        ))
    })
}

/// Parse a config file and visit the first element matching the device
/// and, when given, the property name.
fn walk_config<T>(
    file: Option<&Path>,
    device: &str,
    property: Option<&str>,
    visit: impl FnOnce(roxmltree::Node<'_, '_>) -> Option<T>,
) -> Option<T> {
    let path = config_path(file, device).ok()?;
    let text = fs::read_to_string(path).ok()?;
    let doc = roxmltree::Document::parse(&text).ok()?;

    for child in doc.root_element().children().filter(|c| c.is_element()) {
        let (Some(cdev), Some(cname)) = (child.attribute("device"), child.attribute("name"))
        else {
            return None;
        };
        if cdev != device {
            continue;
        }
        if property.is_none_or(|p| p == cname) {
            return visit(child);
        }
    }
    None
}

/// Saved state of one switch member.
pub fn get_config_switch(device: &str, property: &str, member: &str) -> Option<SwitchState> {
    walk_config(None, device, Some(property), |node| {
        node.children()
            .filter(|c| c.is_element())
            .find(|c| c.attribute("name") == Some(member))
            .and_then(|c| SwitchState::from_wire(c.text().unwrap_or("").trim()))
    })
}

/// Index of the saved On member of a switch property.
pub fn get_config_on_switch_index(device: &str, property: &str) -> Option<usize> {
    walk_config(None, device, Some(property), |node| {
        node.children()
            .filter(|c| c.is_element())
            .position(|c| SwitchState::from_wire(c.text().unwrap_or("").trim()) == Some(SwitchState::On))
    })
}

/// Name of the saved On member of a switch property.
pub fn get_config_on_switch_name(device: &str, property: &str) -> Option<String> {
    walk_config(None, device, Some(property), |node| {
        node.children()
            .filter(|c| c.is_element())
            .find(|c| SwitchState::from_wire(c.text().unwrap_or("").trim()) == Some(SwitchState::On))
            .and_then(|c| c.attribute("name").map(str::to_string))
    })
}

/// Saved value of one number member.
pub fn get_config_number(device: &str, property: &str, member: &str) -> Option<f64> {
    walk_config(None, device, Some(property), |node| {
        node.children()
            .filter(|c| c.is_element())
            .find(|c| c.attribute("name") == Some(member))
            .and_then(|c| numeric::parse_number(c.text().unwrap_or("")))
    })
}

/// Saved value of one text member.
pub fn get_config_text(device: &str, property: &str, member: &str) -> Option<String> {
    walk_config(None, device, Some(property), |node| {
        node.children()
            .filter(|c| c.is_element())
            .find(|c| c.attribute("name") == Some(member))
            .map(|c| c.text().unwrap_or("").to_string())
    })
}

// ---------------------------------------------------------------------------
// Snapshot writers
// ---------------------------------------------------------------------------

/// Write one number property snapshot into an open config stream.
pub fn save_config_number(out: &mut dyn Write, nvp: &SharedNumberVector) -> Result<()> {
    out.write_all(wire::new_number_vector(&nvp.read()).as_bytes())?;
    Ok(())
}

/// Write one switch property snapshot into an open config stream.
pub fn save_config_switch(out: &mut dyn Write, svp: &SharedSwitchVector) -> Result<()> {
    out.write_all(wire::new_switch_vector(&svp.read()).as_bytes())?;
    Ok(())
}

/// Write one text property snapshot into an open config stream.
pub fn save_config_text(out: &mut dyn Write, tvp: &SharedTextVector) -> Result<()> {
    out.write_all(wire::new_text_vector(&tvp.read()).as_bytes())?;
    Ok(())
}

/// Write one BLOB property snapshot into an open config stream.
pub fn save_config_blob(out: &mut dyn Write, bvp: &SharedBlobVector) -> Result<()> {
    out.write_all(wire::new_blob_vector(&bvp.read()).as_bytes())?;
    Ok(())
}

impl Driver {
    /// Restore saved property state by replaying the file through the
    /// dispatcher.
    ///
    /// Children of foreign devices are skipped. With a `property` the
    /// replay stops after that one element; without, every element of
    /// the device is replayed. Replay errors of individual elements are
    /// logged and do not abort the rest of the file.
    pub fn load_config(
        &self,
        handler: &mut dyn DeviceHandler,
        file: Option<&Path>,
        device: &str,
        property: Option<&str>,
        silent: bool,
    ) -> Result<()> {
        let path = prepare_config_path(file, device)?;
        let text = fs::read_to_string(&path).map_err(|e| {
            DriverError::Config(format!(
                "Unable to open config file. Error loading file {}: {}",
                path.display(),
                e
            ))
        })?;
        let doc = roxmltree::Document::parse(&text)
            .map_err(|e| DriverError::Config(format!("Unable to parse config XML: {e}")))?;

        let root = doc.root_element();
        let has_entries = root.children().any(|c| c.is_element());
        if has_entries && !silent {
            self.message(Some(device), "[INFO] Loading device configuration...")?;
        }

        for child in root.children().filter(|c| c.is_element()) {
            let (Some(cdev), Some(cname)) = (child.attribute("device"), child.attribute("name"))
            else {
                return Err(DriverError::Config(format!(
                    "{} requires 'device' and 'name' attributes",
                    child.tag_name().name()
                )));
            };
            if cdev != device {
                continue;
            }
            if property.is_none_or(|p| p == cname) {
                if let Err(e) = self.dispatch_node(handler, child) {
                    warn!(property = %cname, error = %e, "config replay entry failed");
                }
                if property.is_some() {
                    break;
                }
            }
        }

        if has_entries && !silent {
            self.message(Some(device), "[INFO] Device configuration applied.")?;
        }
        Ok(())
    }

    /// Write the `<INDIDriver>` wrapper into an open config stream and
    /// tell the peer about the save unless silenced.
    pub fn save_config_tag(
        &self,
        out: &mut dyn Write,
        closing: bool,
        device: &str,
        silent: bool,
    ) -> Result<()> {
        if closing {
            writeln!(out, "</{CONFIG_ROOT_TAG}>")?;
        } else {
            writeln!(out, "<{CONFIG_ROOT_TAG}>")?;
        }
        if !silent {
            let note = if closing {
                "[INFO] Device configuration saved."
            } else {
                "[INFO] Saving device configuration..."
            };
            self.message(Some(device), note)?;
        }
        Ok(())
    }
}
