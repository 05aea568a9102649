//! Link engine
//!
//! [`Link`] owns every piece of mutable protocol state: the receive
//! assembler, both sequence counters, the transmit and acknowledgment queues
//! and the two timer handles. It is driven by three inputs:
//!
//! - [`Link::on_bytes_received`] with raw bytes from the transport
//! - [`Link::submit_packet`] with application packets
//! - [`Link::on_timer_expired`] when the timer service fires
//!
//! Every input runs to completion without blocking on anything but the
//! transport's own write. Wrap the link in a [`crate::SharedLink`] when the
//! inputs arrive from different execution contexts.

mod machine;
mod retransmit;

use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;

use hdlink_hal::{TimerHandle, TimerService, UartTx};
use hdlink_protocol::{
    encode, max_encoded_len, Control, Deframer, Frame, FrameError, FrameKind, SeqNum,
    MAX_PAYLOAD_SIZE,
};

use crate::config::{LinkConfig, Role};

pub use machine::LinkState;
pub use retransmit::ACK_WINDOW;

use retransmit::Outstanding;

/// Errors returned to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Packet has no command byte
    EmptyPacket,
    /// Command byte plus payload does not fit in one frame
    PacketTooLarge,
    /// A transport write failed; replace the transport to resume
    TransportFailed,
}

/// Running counters, never reset by link state changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Frames written to the transport
    pub frames_sent: u32,
    /// Valid frames received
    pub frames_received: u32,
    /// Information frames sent again after a timeout or REJ
    pub retransmissions: u32,
    /// Frames dropped on checksum mismatch
    pub checksum_errors: u32,
    /// Frames dropped for being shorter than the minimum
    pub short_frames: u32,
    /// Frames that forced a disconnect
    pub protocol_violations: u32,
    /// Acknowledgments matching no outstanding frame
    pub stale_acks: u32,
    /// Information frames received twice in a row
    pub duplicates: u32,
}

/// Consumer of application packets
///
/// Called once per accepted information frame that carries at least a
/// command byte. Replies go through the [`Outbox`]; they are queued and sent
/// once delivery has returned.
pub trait PacketListener {
    /// Handle one packet
    fn on_packet(&mut self, command: u8, payload: &[u8], outbox: &mut Outbox<'_>);
}

impl PacketListener for () {
    fn on_packet(&mut self, _command: u8, _payload: &[u8], _outbox: &mut Outbox<'_>) {}
}

/// Queue handle given to a [`PacketListener`] during delivery
pub struct Outbox<'a> {
    queue: &'a mut VecDeque<Vec<u8>>,
    transport_failed: bool,
}

impl<'a> Outbox<'a> {
    fn new(queue: &'a mut VecDeque<Vec<u8>>, transport_failed: bool) -> Self {
        Self {
            queue,
            transport_failed,
        }
    }

    /// Queue a packet made of a command byte and payload
    pub fn submit(&mut self, command: u8, payload: &[u8]) -> Result<(), LinkError> {
        self.submit_packet(build_packet(command, payload)?)
    }

    /// Queue a complete packet whose first byte is the command
    pub fn submit_packet(&mut self, packet: Vec<u8>) -> Result<(), LinkError> {
        check_packet(&packet, self.transport_failed)?;
        self.queue.push_back(packet);
        Ok(())
    }
}

fn build_packet(command: u8, payload: &[u8]) -> Result<Vec<u8>, LinkError> {
    if payload.len() >= MAX_PAYLOAD_SIZE {
        return Err(LinkError::PacketTooLarge);
    }
    let mut packet = Vec::with_capacity(payload.len() + 1);
    packet.push(command);
    packet.extend_from_slice(payload);
    Ok(packet)
}

fn check_packet(packet: &[u8], transport_failed: bool) -> Result<(), LinkError> {
    if packet.is_empty() {
        return Err(LinkError::EmptyPacket);
    }
    if packet.len() > MAX_PAYLOAD_SIZE {
        return Err(LinkError::PacketTooLarge);
    }
    if transport_failed {
        return Err(LinkError::TransportFailed);
    }
    Ok(())
}

/// One endpoint of an hdlink connection
pub struct Link<T, S, L = ()> {
    config: LinkConfig,
    transport: T,
    timers: S,
    listener: L,
    deframer: Deframer,
    state: LinkState,
    /// Sequence number for the next outbound information frame
    tx_seq: SeqNum,
    /// N(S) of the last accepted information frame since the link came up
    last_received: Option<SeqNum>,
    link_timer: Option<TimerHandle>,
    retransmit_timer: Option<TimerHandle>,
    tx_queue: VecDeque<Vec<u8>>,
    ack_queue: VecDeque<Outstanding>,
    /// Set while the listener runs; suppresses the deferred-transmit check
    delivering: bool,
    /// An accepted information frame still needs an acknowledgment
    ack_pending: bool,
    transport_failed: bool,
    stats: LinkStats,
}

impl<T, S, L> Link<T, S, L>
where
    T: UartTx,
    S: TimerService,
    L: PacketListener,
{
    /// Create a link in the [`LinkState::Down`] state
    ///
    /// Nothing is sent until [`Link::start_link`] is called (primary) or the
    /// peer's handshake arrives (secondary).
    pub fn new(config: LinkConfig, transport: T, timers: S, listener: L) -> Self {
        Self {
            config,
            transport,
            timers,
            listener,
            deframer: Deframer::new(),
            state: LinkState::Down,
            tx_seq: SeqNum::ZERO,
            last_received: None,
            link_timer: None,
            retransmit_timer: None,
            tx_queue: VecDeque::new(),
            ack_queue: VecDeque::with_capacity(ACK_WINDOW),
            delivering: false,
            ack_pending: false,
            transport_failed: false,
            stats: LinkStats::default(),
        }
    }

    /// Register the packet consumer, returning the previous one
    pub fn set_listener(&mut self, listener: L) -> L {
        core::mem::replace(&mut self.listener, listener)
    }

    /// Feed bytes received from the transport
    pub fn on_bytes_received(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.on_byte(byte);
        }
    }

    /// Queue an application packet: command byte followed by payload
    pub fn submit_packet(&mut self, command: u8, payload: &[u8]) -> Result<(), LinkError> {
        self.submit(build_packet(command, payload)?)
    }

    /// Queue a complete packet whose first byte is the command
    pub fn submit(&mut self, packet: Vec<u8>) -> Result<(), LinkError> {
        check_packet(&packet, self.transport_failed)?;
        self.enqueue(packet);
        Ok(())
    }

    /// Report the expiry of a timer scheduled by this link
    ///
    /// Handles that were cancelled or replaced are ignored.
    pub fn on_timer_expired(&mut self, handle: TimerHandle) {
        if self.link_timer == Some(handle) {
            self.link_timer = None;
            self.on_link_timeout();
        } else if self.retransmit_timer == Some(handle) {
            self.retransmit_timer = None;
            self.on_retransmit_timeout();
        } else {
            trace!("Ignoring stale timer {}", handle.id());
        }
    }

    /// Swap in a new transport after a failure or reconnect
    ///
    /// Cancels both timers, drops any partial inbound frame and goes down.
    /// A primary restarts the handshake immediately. Returns the old
    /// transport.
    pub fn replace_transport(&mut self, transport: T) -> T {
        let old = core::mem::replace(&mut self.transport, transport);
        self.cancel_link_timer();
        self.set_link_down();
        self.deframer.reset();
        self.transport_failed = false;
        if self.config.role == Role::Primary {
            self.start_link();
        }
        old
    }

    /// Current connection state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Whether the link is up
    pub fn is_up(&self) -> bool {
        self.state == LinkState::Up
    }

    /// Sequence number the next new information frame will carry
    pub fn tx_seq(&self) -> SeqNum {
        self.tx_seq
    }

    /// Sequence number expected in the peer's next information frame
    pub fn rx_seq(&self) -> SeqNum {
        self.last_received.map_or(SeqNum::ZERO, |seq| seq + 1)
    }

    /// Packets waiting for the window to open
    pub fn pending_len(&self) -> usize {
        self.tx_queue.len()
    }

    /// Packets sent and not yet acknowledged
    pub fn unacked_len(&self) -> usize {
        self.ack_queue.len()
    }

    /// Sequence number of the outstanding packet, if any
    pub fn unacked_seq(&self) -> Option<SeqNum> {
        self.ack_queue.front().map(|outstanding| outstanding.seq)
    }

    /// Whether writes are suspended after a transport failure
    pub fn transport_failed(&self) -> bool {
        self.transport_failed
    }

    /// Running counters
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Active configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Mutably borrow the timer service
    pub fn timers_mut(&mut self) -> &mut S {
        &mut self.timers
    }

    /// Borrow the packet listener
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Mutably borrow the packet listener
    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    fn on_byte(&mut self, byte: u8) {
        match self.deframer.feed(byte) {
            Ok(Some(frame)) => self.handle_frame(frame),
            Ok(None) => {}
            Err(FrameError::TooSmall(len)) => {
                self.stats.short_frames += 1;
                debug!("Erroneous frame - too small: {} bytes", len);
            }
            Err(FrameError::ChecksumMismatch { expected, received }) => {
                self.stats.checksum_errors += 1;
                debug!("Checksum error, got {} expected {}", received, expected);
            }
            Err(e) => debug!("Frame dropped: {:?}", e),
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        self.stats.frames_received += 1;
        trace!(
            "RX control={} payload={} bytes",
            frame.control.byte(),
            frame.payload.len()
        );

        match frame.control.kind() {
            FrameKind::Information {
                send_seq, recv_seq, ..
            } => self.handle_information(send_seq, recv_seq, &frame.payload),
            FrameKind::Supervisory { code, recv_seq, .. } => {
                self.handle_supervisory(code, recv_seq)
            }
            FrameKind::Unnumbered(command) => self.handle_unnumbered(command),
        }

        self.check_xmit();
        self.flush_ack();
    }

    fn deliver(&mut self, command: u8, payload: &[u8]) {
        self.delivering = true;
        let mut outbox = Outbox::new(&mut self.tx_queue, self.transport_failed);
        self.listener.on_packet(command, payload, &mut outbox);
        self.delivering = false;
    }

    /// Encode and write one frame; the only path to the transport
    fn send_frame(&mut self, control: Control, payload: &[u8]) {
        if self.transport_failed {
            return;
        }

        let mut buffer = vec![0u8; max_encoded_len(payload.len())];
        let len = match encode(control, payload, &mut buffer) {
            Ok(len) => len,
            Err(e) => {
                error!("Failed to encode frame: {:?}", e);
                return;
            }
        };

        trace!("TX control={} {} bytes", control.byte(), len);
        if self.write_all(&buffer[..len]).is_err() {
            error!("Transport write failed, suspending transmission");
            self.transport_failed = true;
            return;
        }
        self.stats.frames_sent += 1;
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), T::Error> {
        self.transport.write_blocking(bytes)?;
        self.transport.flush()
    }

    fn cancel_link_timer(&mut self) {
        if let Some(handle) = self.link_timer.take() {
            self.timers.cancel(handle);
        }
    }

    fn cancel_retransmit_timer(&mut self) {
        if let Some(handle) = self.retransmit_timer.take() {
            self.timers.cancel(handle);
        }
    }
}
