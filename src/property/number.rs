// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Number vector properties.

use super::{Permission, PropertyState};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a driver-owned number vector.
pub type SharedNumberVector = Arc<RwLock<NumberVector>>;

/// One numeric member.
///
/// `format` is a printf style directive applied when the value crosses the
/// wire, either a float directive such as `%6.2f` or the sexagesimal
/// extension `%10.6m`.
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    pub name: String,
    pub label: String,
    pub format: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value: f64,
}

impl Number {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        format: impl Into<String>,
        min: f64,
        max: f64,
        step: f64,
        value: f64,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            format: format.into(),
            min,
            max,
            step,
            value,
        }
    }
}

/// Named ordered collection of [`Number`] members belonging to a device.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberVector {
    pub device: String,
    pub name: String,
    pub label: String,
    pub state: PropertyState,
    pub perm: Permission,
    pub numbers: Vec<Number>,
}

impl NumberVector {
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
            numbers: Vec::new(),
        }
    }

    pub fn with_numbers(mut self, numbers: Vec<Number>) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn find(&self, member: &str) -> Option<&Number> {
        self.numbers.iter().find(|n| n.name == member)
    }

    pub fn find_mut(&mut self, member: &str) -> Option<&mut Number> {
        self.numbers.iter_mut().find(|n| n.name == member)
    }

    /// Move the vector behind a shared handle for use with the runtime.
    pub fn into_shared(self) -> SharedNumberVector {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_member_by_name() {
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

        assert!(nvp.find("CCD_EXPOSURE_VALUE").is_some());
        assert!(nvp.find("MISSING").is_none());
    }
}
