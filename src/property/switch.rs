// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Switch vector properties.

use super::{Permission, PropertyState, SwitchRule, SwitchState};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a driver-owned switch vector.
pub type SharedSwitchVector = Arc<RwLock<SwitchVector>>;

/// One switch member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub name: String,
    pub label: String,
    pub state: SwitchState,
}

impl Switch {
    pub fn new(name: impl Into<String>, label: impl Into<String>, state: SwitchState) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            state,
        }
    }
}

/// Named ordered collection of [`Switch`] members.
///
/// Carries both a permission (what the registry records for the read-only
/// sanity check) and a rule (what the applicator enforces on updates).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchVector {
    pub device: String,
    pub name: String,
    pub label: String,
    pub state: PropertyState,
    pub perm: Permission,
    pub rule: SwitchRule,
    pub switches: Vec<Switch>,
}

impl SwitchVector {
    pub fn new(
        device: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        perm: Permission,
        rule: SwitchRule,
    ) -> Self {
        Self {
            device: device.into(),
            name: name.into(),
            label: label.into(),
            state: PropertyState::Idle,
            perm,
            rule,
            switches: Vec::new(),
        }
    }

    pub fn with_switches(mut self, switches: Vec<Switch>) -> Self {
        self.switches = switches;
        self
    }

    pub fn find(&self, member: &str) -> Option<&Switch> {
        self.switches.iter().find(|s| s.name == member)
    }

    pub fn find_mut(&mut self, member: &str) -> Option<&mut Switch> {
        self.switches.iter_mut().find(|s| s.name == member)
    }

    /// Index of the first member that is On.
    pub fn find_on(&self) -> Option<usize> {
        self.switches.iter().position(|s| s.state == SwitchState::On)
    }

    pub fn count_on(&self) -> usize {
        self.switches
            .iter()
            .filter(|s| s.state == SwitchState::On)
            .count()
    }

    /// Turn every member Off.
    pub fn reset(&mut self) {
        for s in &mut self.switches {
            s.state = SwitchState::Off;
        }
    }

    pub fn into_shared(self) -> SharedSwitchVector {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> SwitchVector {
        SwitchVector::new(
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
    }

    #[test]
    fn test_find_on_and_reset() {
        let mut svp = connection();
        assert_eq!(svp.find_on(), Some(1));
        assert_eq!(svp.count_on(), 1);

        svp.reset();
        assert_eq!(svp.find_on(), None);
        assert_eq!(svp.count_on(), 0);
    }
}
