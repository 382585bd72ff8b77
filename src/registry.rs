// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Defined-property registry for peer update sanity checks.
//!
//! Tracks every property this driver has defined, enabling the dispatcher
//! to reject writes to undefined or read-only properties and to re-emit a
//! definition when a late joiner asks for it.
//!
//! # Design
//!
//! - Keyed by `(device, name)` for O(1) lookup
//! - Insertion-only for the driver's lifetime: telling the peer to delete
//!   a property does not revoke the sanity guarantee against the driver's
//!   own code
//! - Entries live behind `Arc`, so a lookup result stays valid after the
//!   table mutex is released and no entry ever moves

use crate::property::{
    Permission, PropertyKind, SharedBlobVector, SharedNumberVector, SharedSwitchVector,
    SharedTextVector,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Back-reference to the driver-owned vector, typed by kind.
///
/// Lights are absent on purpose: they are output-only and peer updates to
/// them must keep failing the defined-property check.
#[derive(Clone)]
pub enum PropertyHandle {
    Number(SharedNumberVector),
    Switch(SharedSwitchVector),
    Text(SharedTextVector),
    Blob(SharedBlobVector),
}

impl PropertyHandle {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyHandle::Number(_) => PropertyKind::Number,
            PropertyHandle::Switch(_) => PropertyKind::Switch,
            PropertyHandle::Text(_) => PropertyKind::Text,
            PropertyHandle::Blob(_) => PropertyKind::Blob,
        }
    }
}

impl std::fmt::Debug for PropertyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PropertyHandle").field(&self.kind()).finish()
    }
}

/// One registered property.
#[derive(Debug)]
pub struct RegistryEntry {
    pub device: String,
    pub name: String,
    pub perm: Permission,
    pub handle: PropertyHandle,
}

/// Thread-safe table of defined properties.
pub struct PropertyRegistry {
    entries: Mutex<HashMap<(String, String), Arc<RegistryEntry>>>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record a property on first definition.
    ///
    /// Idempotent: re-registering an existing `(device, name)` leaves the
    /// original entry untouched, including its permission and handle.
    pub fn register_once(
        &self,
        device: &str,
        name: &str,
        perm: Permission,
        handle: PropertyHandle,
    ) {
        let mut entries = self.entries.lock();
        entries
            .entry((device.to_string(), name.to_string()))
            .or_insert_with(|| {
                Arc::new(RegistryEntry {
                    device: device.to_string(),
                    name: name.to_string(),
                    perm,
                    handle,
                })
            });
    }

    /// Look up a defined property.
    ///
    /// The returned `Arc` is safe to read after the table lock is gone.
    pub fn lookup(&self, device: &str, name: &str) -> Option<Arc<RegistryEntry>> {
        let entries = self.entries.lock();
        entries
            .get(&(device.to_string(), name.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::NumberVector;

    fn handle() -> PropertyHandle {
        PropertyHandle::Number(
            NumberVector::new("Cam", "EXPOSURE", "Expose", Permission::ReadWrite).into_shared(),
        )
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = PropertyRegistry::new();
        registry.register_once("Cam", "EXPOSURE", Permission::ReadWrite, handle());

        let entry = registry.lookup("Cam", "EXPOSURE").expect("registered");
        assert_eq!(entry.perm, Permission::ReadWrite);
        assert_eq!(entry.handle.kind(), PropertyKind::Number);
        assert!(registry.lookup("Cam", "MISSING").is_none());
        assert!(registry.lookup("Mount", "EXPOSURE").is_none());
    }

    #[test]
    fn test_register_once_is_idempotent() {
        let registry = PropertyRegistry::new();
        registry.register_once("Cam", "EXPOSURE", Permission::ReadOnly, handle());
        // Second registration with a different permission must not win.
        registry.register_once("Cam", "EXPOSURE", Permission::ReadWrite, handle());

        let entry = registry.lookup("Cam", "EXPOSURE").unwrap();
        assert_eq!(entry.perm, Permission::ReadOnly);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_entry_survives_lock_release() {
        let registry = PropertyRegistry::new();
        registry.register_once("Cam", "EXPOSURE", Permission::ReadWrite, handle());

        let entry = registry.lookup("Cam", "EXPOSURE").unwrap();
        // Grow the table; the held entry must stay addressable.
        for i in 0..64 {
            let name = format!("PROP_{i}");
            registry.register_once("Cam", &name, Permission::ReadWrite, handle());
        }
        assert_eq!(entry.name, "EXPOSURE");
    }
}
