// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value applicators.
//!
//! Copy peer-supplied values into a driver-owned vector atomically. Every
//! applicator is two-pass: a validation pass over the whole batch, then a
//! mutation pass that only runs when validation passed for every entry.
//! A failing batch leaves the vector values untouched, flips the vector
//! state (`Alert` for a range violation, `Idle` otherwise) and reports
//! the reason to the peer on the vector itself.

use crate::dispatch::{BlobUpdate, NumberUpdate, SwitchUpdate, TextUpdate};
use crate::error::{DriverError, Result};
use crate::property::{
    PropertyState, SharedBlobVector, SharedNumberVector, SharedSwitchVector, SharedTextVector,
    SwitchRule, SwitchState,
};
use crate::wire;
use crate::Driver;

impl Driver {
    /// Apply a number batch. Every named member must exist and every
    /// value must lie within the member's `[min, max]`.
    pub fn update_numbers(
        &self,
        nvp: &SharedNumberVector,
        updates: &[NumberUpdate],
    ) -> Result<()> {
        let mut vp = nvp.write();

        for u in updates {
            let Some(member) = vp.find(&u.name) else {
                let msg = format!(
                    "Error: {} is not a member of {} ({}) property.",
                    u.name, vp.label, vp.name
                );
                vp.state = PropertyState::Idle;
                let xml = wire::set_number_vector(&vp, Some(&msg));
                drop(vp);
                self.writer.emit(&xml)?;
                return Err(DriverError::Property(msg));
            };

            if u.value < member.min || u.value > member.max {
                let msg = format!(
                    "Error: Invalid range for {} ({}). Valid range is from {} to {}. \
                     Requested value is {}",
                    member.label, member.name, member.min, member.max, u.value
                );
                vp.state = PropertyState::Alert;
                let xml = wire::set_number_vector(&vp, Some(&msg));
                drop(vp);
                self.writer.emit(&xml)?;
                return Err(DriverError::Property(msg));
            }
        }

        for u in updates {
            if let Some(member) = vp.find_mut(&u.name) {
                member.value = u.value;
            }
        }
        Ok(())
    }

    /// Apply a switch batch under the vector's rule.
    ///
    /// For `OneOfMany` the previous On member is snapshotted, the vector
    /// reset and the batch applied; if anything other than exactly one
    /// member ends up On, the previous state is restored and the batch
    /// fails.
    pub fn update_switches(
        &self,
        svp: &SharedSwitchVector,
        updates: &[SwitchUpdate],
    ) -> Result<()> {
        let mut vp = svp.write();

        for u in updates {
            if vp.find(&u.name).is_none() {
                let msg = format!(
                    "Error: {} is not a member of {} ({}) property.",
                    u.name, vp.label, vp.name
                );
                vp.state = PropertyState::Idle;
                let xml = wire::set_switch_vector(&vp, Some(&msg));
                drop(vp);
                self.writer.emit(&xml)?;
                return Err(DriverError::Property(msg));
            }
        }

        let previous_on = vp.find_on();
        if vp.rule == SwitchRule::OneOfMany {
            vp.reset();
        }
        for u in updates {
            if let Some(member) = vp.find_mut(&u.name) {
                member.state = u.state;
            }
        }

        if vp.rule == SwitchRule::OneOfMany {
            let on = vp.count_on();
            if on != 1 {
                vp.reset();
                if let Some(i) = previous_on {
                    vp.switches[i].state = SwitchState::On;
                }
                let msg = format!(
                    "Error: invalid state switch for property {} ({}). {}.",
                    vp.label,
                    vp.name,
                    if on == 0 {
                        "No switch is on"
                    } else {
                        "Too many switches are on"
                    }
                );
                vp.state = PropertyState::Idle;
                let xml = wire::set_switch_vector(&vp, Some(&msg));
                drop(vp);
                self.writer.emit(&xml)?;
                return Err(DriverError::Property(msg));
            }
        }
        Ok(())
    }

    /// Apply a text batch.
    pub fn update_texts(&self, tvp: &SharedTextVector, updates: &[TextUpdate]) -> Result<()> {
        let mut vp = tvp.write();

        for u in updates {
            if vp.find(&u.name).is_none() {
                let msg = format!(
                    "Error: {} is not a member of {} ({}) property.",
                    u.name, vp.label, vp.name
                );
                vp.state = PropertyState::Idle;
                let xml = wire::set_text_vector(&vp, Some(&msg));
                drop(vp);
                self.writer.emit(&xml)?;
                return Err(DriverError::Property(msg));
            }
        }

        for u in updates {
            if let Some(member) = vp.find_mut(&u.name) {
                member.value.clone_from(&u.value);
            }
        }
        Ok(())
    }

    /// Apply a BLOB batch, taking ownership of the decoded buffers.
    ///
    /// The failure report goes straight to the writer rather than through
    /// [`Driver::set_blob`]: no new payload crossed, so it owes no pacing
    /// ping, and the reader thread calling this must not block on one.
    pub fn update_blobs(&self, bvp: &SharedBlobVector, updates: Vec<BlobUpdate>) -> Result<()> {
        let mut vp = bvp.write();

        for u in &updates {
            if vp.find(&u.name).is_none() {
                let msg = format!(
                    "Error: {} is not a member of {} ({}) property.",
                    u.name, vp.label, vp.name
                );
                vp.state = PropertyState::Idle;
                let xml = wire::set_blob_vector(&vp, Some(&msg));
                drop(vp);
                self.writer.emit(&xml)?;
                return Err(DriverError::Property(msg));
            }
        }

        for u in updates {
            if let Some(member) = vp.find_mut(&u.name) {
                member.format = u.format;
                member.size = u.size;
                member.data = u.data;
            }
        }
        Ok(())
    }
}
