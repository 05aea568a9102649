//! Single-shot timer abstractions
//!
//! The link engine arms two timers: the handshake timer and the
//! retransmission timer. It only ever asks for a one-shot expiry after a delay
//! and later cancels it. The implementor reports expiry by calling back into
//! the engine with the [`TimerHandle`] it returned from
//! [`TimerService::schedule_once`].

/// Opaque identifier of one scheduled expiry
///
/// Handles are never reused by a well-behaved service, so an expiry that
/// races with a cancel can be recognised as stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerHandle(u32);

impl TimerHandle {
    /// Create a handle from a raw identifier
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw identifier
    pub const fn id(self) -> u32 {
        self.0
    }
}

/// Timer service
///
/// Schedules single-shot expiries measured in milliseconds.
pub trait TimerService {
    /// Schedule an expiry `delay_ms` milliseconds from now
    fn schedule_once(&mut self, delay_ms: u32) -> TimerHandle;

    /// Cancel a scheduled expiry
    ///
    /// Must be a no-op when the handle already fired or is unknown.
    fn cancel(&mut self, handle: TimerHandle);
}
