// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Vector property data model.
//!
//! A *vector property* is a named, ordered collection of typed members
//! belonging to a device. Five kinds exist: Number, Switch, Text, Light
//! and Blob. Light is output-only and never accepted from the peer.
//!
//! Vector storage is owned by the driver binary. The runtime only holds
//! `Arc<RwLock<...>>` handles (the `Shared*Vector` aliases), so a driver
//! can keep mutating its vectors between protocol exchanges while the
//! runtime re-emits definitions for late joiners.

mod blob;
mod light;
mod number;
mod switch;
mod text;

pub use blob::{Blob, BlobVector, SharedBlobVector};
pub use light::{Light, LightVector, SharedLightVector};
pub use number::{Number, NumberVector, SharedNumberVector};
pub use switch::{Switch, SwitchVector, SharedSwitchVector};
pub use text::{SharedTextVector, Text, TextVector};

/// Property kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Number,
    Switch,
    Text,
    Light,
    Blob,
}

/// Vector state as shown to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyState {
    #[default]
    Idle,
    Ok,
    Busy,
    Alert,
}

impl PropertyState {
    /// Wire form used in `state` attributes and light bodies.
    pub fn as_wire(self) -> &'static str {
        match self {
            PropertyState::Idle => "Idle",
            PropertyState::Ok => "Ok",
            PropertyState::Busy => "Busy",
            PropertyState::Alert => "Alert",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Idle" => Some(PropertyState::Idle),
            "Ok" => Some(PropertyState::Ok),
            "Busy" => Some(PropertyState::Busy),
            "Alert" => Some(PropertyState::Alert),
            _ => None,
        }
    }
}

/// Client access permission for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Permission {
    pub fn as_wire(self) -> &'static str {
        match self {
            Permission::ReadOnly => "ro",
            Permission::WriteOnly => "wo",
            Permission::ReadWrite => "rw",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "ro" => Some(Permission::ReadOnly),
            "wo" => Some(Permission::WriteOnly),
            "rw" => Some(Permission::ReadWrite),
            _ => None,
        }
    }
}

/// Constraint on how many switches of a vector may be On at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRule {
    /// Exactly one member is On after every successful update.
    OneOfMany,
    /// Zero or one member is On.
    AtMostOne,
    /// Members are independent.
    AnyOfMany,
}

impl SwitchRule {
    pub fn as_wire(self) -> &'static str {
        match self {
            SwitchRule::OneOfMany => "OneOfMany",
            SwitchRule::AtMostOne => "AtMostOne",
            SwitchRule::AnyOfMany => "AnyOfMany",
        }
    }
}

/// On/Off state of a single switch member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchState {
    On,
    #[default]
    Off,
}

impl SwitchState {
    pub fn as_wire(self) -> &'static str {
        match self {
            SwitchState::On => "On",
            SwitchState::Off => "Off",
        }
    }

    /// Parse a switch body. The peer may append trailing text after `On`,
    /// so only the prefix is significant there; `Off` must match exactly.
    pub fn from_wire(s: &str) -> Option<Self> {
        if s.starts_with("On") {
            Some(SwitchState::On)
        } else if s == "Off" {
            Some(SwitchState::Off)
        } else {
            None
        }
    }
}

/// BLOB forwarding policy requested from the server for a snooped device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobPolicy {
    /// No BLOBs at all.
    Never,
    /// BLOBs interleaved with other traffic.
    Also,
    /// Only BLOBs, nothing else.
    Only,
}

impl BlobPolicy {
    pub fn as_wire(self) -> &'static str {
        match self {
            BlobPolicy::Never => "Never",
            BlobPolicy::Also => "Also",
            BlobPolicy::Only => "Only",
        }
    }
}
