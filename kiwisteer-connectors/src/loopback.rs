//! In-Process Loopback Bus
//!
//! A bounded in-memory bus implementing both halves of the bus seam. Used
//! by tests and by batch replay tooling to drive a [`SteeringLoop`]
//! (crate::SteeringLoop) without vehicle hardware.
//!
//! Overflow drops the *oldest* queued envelope: on a live vehicle the most
//! recent sensor reading is always the one worth acting on.

use std::collections::VecDeque;

use crate::{BusError, BusPublisher, BusSubscriber, Envelope};

/// Default queue capacity
pub const DEFAULT_CAPACITY: usize = 256;

/// Bounded FIFO bus for in-process use
#[derive(Debug)]
pub struct LoopbackBus {
    queue: VecDeque<Envelope>,
    capacity: usize,
    dropped: u64,
}

impl LoopbackBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Envelopes discarded to make room for newer ones
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BusPublisher for LoopbackBus {
    fn publish(&mut self, envelope: Envelope) -> Result<(), BusError> {
        if self.queue.len() == self.capacity {
            self.queue.pop_front();
            self.dropped += 1;
            log::warn!("loopback bus full, dropped oldest envelope");
        }
        self.queue.push_back(envelope);
        Ok(())
    }
}

impl BusSubscriber for LoopbackBus {
    fn poll_next(&mut self) -> nb::Result<Envelope, BusError> {
        self.queue.pop_front().ok_or(nb::Error::WouldBlock)
    }
}
