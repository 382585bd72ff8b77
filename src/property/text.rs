// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Text vector properties.

use super::{Permission, PropertyState};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a driver-owned text vector.
pub type SharedTextVector = Arc<RwLock<TextVector>>;

/// One text member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub name: String,
    pub label: String,
    pub value: String,
}

impl Text {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Named ordered collection of [`Text`] members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextVector {
    pub device: String,
    pub name: String,
    pub label: String,
    pub state: PropertyState,
    pub perm: Permission,
    pub texts: Vec<Text>,
}

impl TextVector {
    pub fn new(
        device: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        perm: Permission,
    ) -> Self {
        Self {
            device: device.into(),
            name: name.into(),
            label: label.into(),
            state: PropertyState::Idle,
            perm,
            texts: Vec::new(),
        }
    }

    pub fn with_texts(mut self, texts: Vec<Text>) -> Self {
        self.texts = texts;
        self
    }

    pub fn find(&self, member: &str) -> Option<&Text> {
        self.texts.iter().find(|t| t.name == member)
    }

    pub fn find_mut(&mut self, member: &str) -> Option<&mut Text> {
        self.texts.iter_mut().find(|t| t.name == member)
    }

    pub fn into_shared(self) -> SharedTextVector {
        Arc::new(RwLock::new(self))
    }
}
