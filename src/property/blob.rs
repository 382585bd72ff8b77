// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! BLOB vector properties.

use super::{Permission, PropertyState};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a driver-owned BLOB vector.
pub type SharedBlobVector = Arc<RwLock<BlobVector>>;

/// One binary member.
///
/// `size` is the logical payload size announced on the wire (for
/// compressed formats it is the uncompressed size); the encoded length is
/// derived from `data` at emission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub name: String,
    pub label: String,
    /// Format suffix describing the payload, e.g. `.fits` or `.fits.z`.
    pub format: String,
    pub size: i64,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            format: String::new(),
            size: 0,
            data: Vec::new(),
        }
    }

    /// Decoded byte count currently held.
    pub fn bloblen(&self) -> usize {
        self.data.len()
    }
}

/// Named ordered collection of [`Blob`] members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobVector {
    pub device: String,
    pub name: String,
    pub label: String,
    pub state: PropertyState,
    pub perm: Permission,
    pub blobs: Vec<Blob>,
}

impl BlobVector {
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
            blobs: Vec::new(),
        }
    }

    pub fn with_blobs(mut self, blobs: Vec<Blob>) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn find(&self, member: &str) -> Option<&Blob> {
        self.blobs.iter().find(|b| b.name == member)
    }

    pub fn find_mut(&mut self, member: &str) -> Option<&mut Blob> {
        self.blobs.iter_mut().find(|b| b.name == member)
    }

    pub fn into_shared(self) -> SharedBlobVector {
        Arc::new(RwLock::new(self))
    }
}
