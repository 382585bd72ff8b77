// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! BLOB pacing gate.
//!
//! BLOB payloads can be multi-megabyte, so every `setBLOBVector` is
//! followed by a `pingRequest` and the next BLOB emission blocks until
//! the peer has acknowledged the previous one with a matching
//! `pingReply`. At most one ping is in flight per driver.
//!
//! The emitting thread waits on a condvar; the dispatcher fulfils the
//! gate from the reader thread when the reply element arrives. Without a
//! configured timeout a silent peer stalls every future BLOB emission,
//! matching the historical behaviour of the protocol.

use crate::error::{DriverError, Result};
use crate::wire::BLOB_PING_PREFIX;
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct PingState {
    /// Last allocated uid. Monotone for the driver's lifetime.
    next_uid: u64,
    /// Uid of the emitted ping not yet acknowledged, if any.
    pending: Option<u64>,
}

/// At-most-one-in-flight ping gate.
#[derive(Debug)]
pub struct PingGate {
    state: Mutex<PingState>,
    replied: Condvar,
    timeout: Option<Duration>,
}

impl PingGate {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(PingState::default()),
            replied: Condvar::new(),
            timeout,
        }
    }

    /// Wait until no ping is outstanding, then allocate and record the
    /// uid for the next one.
    ///
    /// Fails with [`DriverError::PingTimeout`] only when the gate was
    /// built with a timeout and the previous reply never came.
    pub fn acquire(&self) -> Result<u64> {
        let mut state = self.state.lock();

        while let Some(prev) = state.pending {
            match self.timeout {
                Some(window) => {
                    let result = self.replied.wait_for(&mut state, window);
                    if result.timed_out() && state.pending == Some(prev) {
                        return Err(DriverError::PingTimeout(format!(
                            "{BLOB_PING_PREFIX}{prev}"
                        )));
                    }
                }
                None => self.replied.wait(&mut state),
            }
        }

        state.next_uid += 1;
        state.pending = Some(state.next_uid);
        Ok(state.next_uid)
    }

    /// Release the gate for a `pingReply` tag.
    ///
    /// Returns true when the tag matched the pending BLOB ping. Tags with
    /// a foreign prefix or a stale uid are ignored.
    pub fn fulfil(&self, tag: &str) -> bool {
        let uid = match tag.strip_prefix(BLOB_PING_PREFIX) {
            Some(rest) => match rest.parse::<u64>() {
                Ok(uid) => uid,
                Err(_) => return false,
            },
            None => return false,
        };

        let mut state = self.state.lock();
        if state.pending == Some(uid) {
            state.pending = None;
            self.replied.notify_all();
            true
        } else {
            false
        }
    }

    /// Uid of the unacknowledged ping, if any.
    pub fn pending(&self) -> Option<u64> {
        self.state.lock().pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_first_acquire_is_immediate() {
        let gate = PingGate::new(None);
        assert_eq!(gate.acquire().unwrap(), 1);
        assert_eq!(gate.pending(), Some(1));
    }

    #[test]
    fn test_second_acquire_blocks_until_reply() {
        let gate = Arc::new(PingGate::new(None));
        assert_eq!(gate.acquire().unwrap(), 1);

        let g = Arc::clone(&gate);
        let waiter = thread::spawn(move || g.acquire().unwrap());

        // Give the waiter time to park; the reply must be what wakes it.
        thread::sleep(Duration::from_millis(20));
        assert_eq!(gate.pending(), Some(1));
        assert!(gate.fulfil("SetBLOB/1"));

        assert_eq!(waiter.join().unwrap(), 2);
        assert_eq!(gate.pending(), Some(2));
    }

    #[test]
    fn test_fulfil_ignores_foreign_and_stale_tags() {
        let gate = PingGate::new(None);
        gate.acquire().unwrap();

        assert!(!gate.fulfil("OtherPing/1"));
        assert!(!gate.fulfil("SetBLOB/99"));
        assert!(!gate.fulfil("SetBLOB/abc"));
        assert_eq!(gate.pending(), Some(1));

        assert!(gate.fulfil("SetBLOB/1"));
        assert_eq!(gate.pending(), None);
        // A second reply for the same uid is stale by then.
        assert!(!gate.fulfil("SetBLOB/1"));
    }

    #[test]
    fn test_timeout_fails_the_waiter() {
        let gate = PingGate::new(Some(Duration::from_millis(10)));
        gate.acquire().unwrap();

        match gate.acquire() {
            Err(DriverError::PingTimeout(tag)) => assert_eq!(tag, "SetBLOB/1"),
            other => panic!("expected ping timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_uids_are_monotone() {
        let gate = PingGate::new(None);
        for expect in 1..=5u64 {
            let uid = gate.acquire().unwrap();
            assert_eq!(uid, expect);
            assert!(gate.fulfil(&format!("SetBLOB/{uid}")));
        }
    }
}
