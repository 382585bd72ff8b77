// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared unit-test helpers.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Test sink capturing everything the driver writes to the stream.
#[derive(Clone, Default)]
pub(crate) struct CaptureSink(Arc<Mutex<Vec<u8>>>);

impl CaptureSink {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
