// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors returned by the driver runtime.
//!
//! The `Display` strings of the reject variants are wire-visible: the
//! dispatcher hands them back to its caller verbatim, so clients see the
//! exact sentences below.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors surfaced by dispatch, emission and persistence.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Output sink failure. Fatal to the driver: the peer cannot be
    /// recovered from this side once the stream is broken.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Inbound element or config file failed to parse.
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// A `new*Vector` arrived without the mandatory addressing attributes.
    #[error("{tag} requires 'device' and 'name' attributes")]
    MissingAddress { tag: String },

    /// Peer addressed a property this driver never defined.
    #[error("Property {name} is not defined in {device}.")]
    NotDefined { device: String, name: String },

    /// Peer tried to write a read-only property.
    #[error("Cannot set read-only property {0}")]
    ReadOnly(String),

    /// Root tag not part of the protocol. Soft: the caller decides
    /// whether to carry on reading the stream.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A value applicator rejected a batch. The same text has already
    /// been emitted to the peer on the property's own vector.
    #[error("{0}")]
    Property(String),

    /// Config persistence failure. Never emitted on the wire.
    #[error("{0}")]
    Config(String),

    /// The previous BLOB ping went unanswered within the configured
    /// window. Only possible when a ping timeout was set explicitly.
    #[error("timed out waiting for ping reply {0}")]
    PingTimeout(String),
}

impl DriverError {
    /// True for errors the read loop may log and skip.
    pub fn is_soft(&self) -> bool {
        matches!(self, DriverError::UnknownCommand(_))
    }
}
