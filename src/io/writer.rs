// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outbound protocol sink.
//!
//! One message is one top-level XML element; `emit` writes and flushes it
//! under a writer mutex so concurrent emitters interleave only at element
//! boundaries. A sink error is fatal to the driver: once the stream to
//! the peer is broken there is nothing this side can do to recover it.

use parking_lot::Mutex;
use std::io::{self, Write};

/// Mutex-guarded writer over the protocol byte stream.
pub struct ProtocolWriter {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl ProtocolWriter {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Writer over the process stdout, the normal driver arrangement.
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Write one complete element and flush.
    pub fn emit(&self, element: &str) -> io::Result<()> {
        let mut sink = self.sink.lock();
        sink.write_all(element.as_bytes())?;
        sink.flush()
    }

    /// Write several elements under a single lock acquisition and flush
    /// once. Used where adjacency on the stream is part of the protocol,
    /// as with a BLOB update and its pacing ping.
    pub fn emit_all(&self, elements: &[&str]) -> io::Result<()> {
        let mut sink = self.sink.lock();
        for element in elements {
            sink.write_all(element.as_bytes())?;
        }
        sink.flush()
    }
}

impl std::fmt::Debug for ProtocolWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolWriter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CaptureSink;

    #[test]
    fn test_emit_writes_verbatim() {
        let sink = CaptureSink::default();
        let writer = ProtocolWriter::new(Box::new(sink.clone()));

        writer.emit("<message device=\"Cam\"/>\n").unwrap();
        assert_eq!(sink.contents(), "<message device=\"Cam\"/>\n");
    }

    #[test]
    fn test_emit_all_keeps_elements_adjacent() {
        let sink = CaptureSink::default();
        let writer = ProtocolWriter::new(Box::new(sink.clone()));

        writer.emit_all(&["<a/>\n", "<b/>\n"]).unwrap();
        writer.emit("<c/>\n").unwrap();
        assert_eq!(sink.contents(), "<a/>\n<b/>\n<c/>\n");
    }
}
