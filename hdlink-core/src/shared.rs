//! Lock-guarded link for multi-context use
//!
//! Bytes arrive on a receive task, packets are submitted from application
//! code and timers fire from yet another context. [`SharedLink`] serializes
//! all three behind one `embassy-sync` blocking mutex so every input runs to
//! completion before the next starts.
//!
//! Pick the raw mutex to match the contexts involved:
//! `CriticalSectionRawMutex` across interrupts or threads,
//! `NoopRawMutex` when everything runs on one executor.
//!
//! Listeners run with the lock held. They must reply through their
//! [`Outbox`](crate::Outbox) and never call back into the `SharedLink`.

use alloc::vec::Vec;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use hdlink_hal::{TimerHandle, TimerService, UartTx};

use crate::link::{Link, LinkError, LinkState, LinkStats, PacketListener};

/// A [`Link`] behind a blocking mutex
pub struct SharedLink<M: RawMutex, T, S, L = ()> {
    inner: Mutex<M, RefCell<Link<T, S, L>>>,
}

impl<M, T, S, L> SharedLink<M, T, S, L>
where
    M: RawMutex,
    T: UartTx,
    S: TimerService,
    L: PacketListener,
{
    /// Wrap a link
    pub fn new(link: Link<T, S, L>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(link)),
        }
    }

    /// Run `f` with exclusive access to the link
    pub fn with<R>(&self, f: impl FnOnce(&mut Link<T, S, L>) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// See [`Link::start_link`]
    pub fn start_link(&self) {
        self.with(|link| link.start_link());
    }

    /// Feed received bytes through the link
    pub fn on_bytes_received(&self, bytes: &[u8]) {
        self.with(|link| link.on_bytes_received(bytes));
    }

    /// Queue a command and payload for delivery
    pub fn submit_packet(&self, command: u8, payload: &[u8]) -> Result<(), LinkError> {
        self.with(|link| link.submit_packet(command, payload))
    }

    /// Queue an already built packet for delivery
    pub fn submit(&self, packet: Vec<u8>) -> Result<(), LinkError> {
        self.with(|link| link.submit(packet))
    }

    /// Report that a timer scheduled by the link fired
    pub fn on_timer_expired(&self, handle: TimerHandle) {
        self.with(|link| link.on_timer_expired(handle));
    }

    /// Swap the transport and restart the session, returning the old one
    pub fn replace_transport(&self, transport: T) -> T {
        self.with(|link| link.replace_transport(transport))
    }

    /// Current connection state
    pub fn state(&self) -> LinkState {
        self.with(|link| link.state())
    }

    /// Snapshot of the link counters
    pub fn stats(&self) -> LinkStats {
        self.with(|link| link.stats())
    }

    /// Unwrap the link
    pub fn into_inner(self) -> Link<T, S, L> {
        self.inner.into_inner().into_inner()
    }
}
