// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Light vector properties.
//!
//! Lights are status indicators the driver pushes to the peer. They are
//! output-only: the runtime never registers them for peer updates, so an
//! inbound write targeting a light is rejected as undefined.

use super::PropertyState;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a driver-owned light vector.
pub type SharedLightVector = Arc<RwLock<LightVector>>;

/// One light member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Light {
    pub name: String,
    pub label: String,
    pub state: PropertyState,
}

impl Light {
    pub fn new(name: impl Into<String>, label: impl Into<String>, state: PropertyState) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            state,
        }
    }
}

/// Named ordered collection of [`Light`] members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightVector {
    pub device: String,
    pub name: String,
    pub label: String,
    pub state: PropertyState,
    pub lights: Vec<Light>,
}

impl LightVector {
    pub fn new(
        device: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            name: name.into(),
            label: label.into(),
            state: PropertyState::Idle,
            lights: Vec::new(),
        }
    }

    pub fn with_lights(mut self, lights: Vec<Light>) -> Self {
        self.lights = lights;
        self
    }

    pub fn find(&self, member: &str) -> Option<&Light> {
        self.lights.iter().find(|l| l.name == member)
    }

    pub fn into_shared(self) -> SharedLightVector {
        Arc::new(RwLock::new(self))
    }
}
