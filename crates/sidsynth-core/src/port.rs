//! Cross-thread register write queue
//!
//! A [`RegisterPort`] is a cloneable handle that a host thread (a UI, a
//! sequencer) uses to queue register writes for an engine running elsewhere.
//! The engine drains the queue at the start of each tick, in arrival order, so
//! writes land on a tick boundary and never mid-tick.

use crate::registers::RegisterTarget;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A queued register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Voice or filter block
    pub target: RegisterTarget,
    /// Register address within the target
    pub address: u8,
    /// Byte to write
    pub value: u8,
}

/// Thread-safe handle for queueing register writes
#[derive(Debug, Clone, Default)]
pub struct RegisterPort {
    queue: Arc<Mutex<VecDeque<RegisterWrite>>>,
}

impl RegisterPort {
    /// Create an empty port
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a write for the next tick boundary
    pub fn write(&self, target: RegisterTarget, address: u8, value: u8) {
        self.queue.lock().push_back(RegisterWrite {
            target,
            address,
            value,
        });
    }

    /// Number of writes waiting
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Discard every queued write
    pub fn clear(&self) {
        self.queue.lock().clear();
    }

    /// Append all queued writes to `out`, oldest first
    ///
    /// The lock is held only to swap the queue for an empty one; the copy into
    /// `out` happens after it is released.
    pub fn drain_into(&self, out: &mut Vec<RegisterWrite>) {
        let queued = std::mem::take(&mut *self.queue.lock());
        out.extend(queued);
    }
}
