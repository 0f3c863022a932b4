//! Vehicle Bus Connectors for KiwiSteer
//!
//! ## Overview
//!
//! The predictor meets the vehicle through two narrow traits:
//! [`BusSubscriber`] delivers envelopes, [`BusPublisher`] accepts them.
//! Everything between the two — decoding, accumulation, prediction,
//! command construction — lives in [`SteeringLoop`] and is bus-agnostic.
//!
//! ```text
//! bus ──poll──► decode ──► OnlineSession ──predict──► steering command ──publish──► bus
//!                 │                                         ▲
//!                 └── foreign / malformed: count and skip ──┘
//! ```
//!
//! The crate ships one concrete bus, the in-process
//! [`LoopbackBus`](loopback::LoopbackBus), which is enough for tests and
//! batch replay. A UDP-multicast implementation of the same two traits
//! plugs in without touching the loop.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod loopback;

pub use envelope::{decode, Envelope, Payload};
pub use loopback::LoopbackBus;

use kiwisteer_core::{OnlineSession, PipelineError, TimeSource};

/// Errors raised at the bus boundary
#[derive(thiserror::Error, Debug)]
pub enum BusError {
    /// A known message id arrived with the wrong payload variant
    #[error("message id {message_id} carried an unexpected payload")]
    PayloadMismatch {
        /// The offending message id
        message_id: u32,
    },
    /// The envelope's sample time does not normalize
    #[error("envelope timestamp outside representable range")]
    BadTimestamp,
    /// The payload does not form a valid stream record
    #[error("invalid record in envelope: {0}")]
    BadRecord(#[source] PipelineError),
    /// The underlying transport failed
    #[error("bus transport error: {0}")]
    Transport(String),
}

/// Accepts outgoing envelopes
pub trait BusPublisher {
    /// Publish one envelope
    fn publish(&mut self, envelope: Envelope) -> Result<(), BusError>;
}

/// Delivers incoming envelopes without blocking
pub trait BusSubscriber {
    /// Take the next envelope, or [`nb::Error::WouldBlock`] when none is
    /// queued
    fn poll_next(&mut self) -> nb::Result<Envelope, BusError>;
}

/// Counters from one run of the steering loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Envelopes taken off the bus
    pub envelopes: u64,
    /// Envelopes skipped: foreign traffic or decode failures
    pub skipped: u64,
    /// Steering commands published
    pub commands: u64,
}

/// Wires a bus to an online prediction session.
///
/// Owns neither the bus nor the serving context; the caller decides the
/// lifetimes and the polling cadence.
pub struct SteeringLoop<'s, 'ctx> {
    session: &'s mut OnlineSession<'ctx>,
    stats: LoopStats,
}

impl<'s, 'ctx> SteeringLoop<'s, 'ctx> {
    pub fn new(session: &'s mut OnlineSession<'ctx>) -> Self {
        Self {
            session,
            stats: LoopStats::default(),
        }
    }

    /// Handle one envelope: decode, accumulate, and publish a steering
    /// command if a prediction cycle completed.
    ///
    /// Decode failures are contained the same way prediction failures are:
    /// counted, logged, and skipped.
    pub fn handle<P: BusPublisher>(
        &mut self,
        envelope: &Envelope,
        publisher: &mut P,
        clock: &impl TimeSource,
    ) -> Result<(), BusError> {
        self.stats.envelopes += 1;

        let record = match decode(envelope) {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.stats.skipped += 1;
                return Ok(());
            }
            Err(e) => {
                self.stats.skipped += 1;
                log::warn!("skipping undecodable envelope: {e}");
                return Ok(());
            }
        };

        if let Some(steering) = self.session.handle_record(&record) {
            let now = clock.now();
            let command = Envelope::steering_command(
                now / kiwisteer_core::time::MICROS_PER_SEC,
                (now % kiwisteer_core::time::MICROS_PER_SEC) as u32,
                steering,
            );
            publisher.publish(command)?;
            self.stats.commands += 1;
        }
        Ok(())
    }

    /// Drain a subscriber until it would block.
    ///
    /// Returns the number of envelopes handled. Transport and publish
    /// errors abort the drain; per-envelope decode errors do not.
    pub fn drain<S, P>(
        &mut self,
        subscriber: &mut S,
        publisher: &mut P,
        clock: &impl TimeSource,
    ) -> Result<u64, BusError>
    where
        S: BusSubscriber,
        P: BusPublisher,
    {
        let mut handled = 0;
        loop {
            match subscriber.poll_next() {
                Ok(envelope) => {
                    self.handle(&envelope, publisher, clock)?;
                    handled += 1;
                }
                Err(nb::Error::WouldBlock) => return Ok(handled),
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }
}
