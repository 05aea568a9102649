//! Two links wired back to back through in-memory transports

use core::convert::Infallible;

use hdlink_core::{Link, LinkConfig, LinkState, Outbox, PacketListener, Role};
use hdlink_hal::{TimerHandle, TimerService, UartTx};

/// Byte buffer that can swallow whole frames
#[derive(Debug, Default)]
struct Wire {
    bytes: Vec<u8>,
    /// Number of upcoming frames to lose
    drop_frames: usize,
}

impl UartTx for Wire {
    type Error = Infallible;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        // The link writes each frame in one call
        if self.drop_frames > 0 {
            self.drop_frames -= 1;
        } else {
            self.bytes.extend_from_slice(data);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Timers {
    next_id: u32,
    armed: Vec<TimerHandle>,
}

impl TimerService for Timers {
    fn schedule_once(&mut self, _delay_ms: u32) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle::new(self.next_id);
        self.armed.push(handle);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.armed.retain(|armed| *armed != handle);
    }
}

#[derive(Debug, Default)]
struct Inbox {
    packets: Vec<(u8, Vec<u8>)>,
    echo: bool,
}

impl PacketListener for Inbox {
    fn on_packet(&mut self, command: u8, payload: &[u8], outbox: &mut Outbox<'_>) {
        self.packets.push((command, payload.to_vec()));
        if self.echo {
            outbox.submit(command, payload).unwrap();
        }
    }
}

type TestLink = Link<Wire, Timers, Inbox>;

struct Pair {
    primary: TestLink,
    secondary: TestLink,
}

impl Pair {
    fn new() -> Self {
        Self {
            primary: Link::new(
                LinkConfig::with_role(Role::Primary),
                Wire::default(),
                Timers::default(),
                Inbox::default(),
            ),
            secondary: Link::new(
                LinkConfig::with_role(Role::Secondary),
                Wire::default(),
                Timers::default(),
                Inbox::default(),
            ),
        }
    }

    fn connected() -> Self {
        let mut pair = Self::new();
        pair.primary.start_link();
        pair.pump();
        assert_eq!(pair.primary.state(), LinkState::Up);
        assert_eq!(pair.secondary.state(), LinkState::Up);
        pair
    }

    /// Shuttle bytes both ways until neither side has anything to say
    fn pump(&mut self) {
        for _ in 0..1000 {
            let to_secondary = std::mem::take(&mut self.primary.transport_mut().bytes);
            let to_primary = std::mem::take(&mut self.secondary.transport_mut().bytes);
            if to_secondary.is_empty() && to_primary.is_empty() {
                return;
            }
            self.secondary.on_bytes_received(&to_secondary);
            self.primary.on_bytes_received(&to_primary);
        }
        panic!("links never went quiet");
    }

    /// Fire every armed timer on both sides, then pump
    fn tick(&mut self) {
        for link in [&mut self.primary, &mut self.secondary] {
            let armed = std::mem::take(&mut link.timers_mut().armed);
            for handle in armed {
                link.on_timer_expired(handle);
            }
        }
        self.pump();
    }

    fn received_by_secondary(&self) -> &[(u8, Vec<u8>)] {
        &self.secondary.listener().packets
    }

    fn received_by_primary(&self) -> &[(u8, Vec<u8>)] {
        &self.primary.listener().packets
    }
}

#[test]
fn handshake() {
    let mut pair = Pair::connected();
    // Handshake timer cancelled, nothing outstanding
    assert!(pair.primary.timers_mut().armed.is_empty());
    assert_eq!(pair.primary.stats().frames_sent, 1);
    assert_eq!(pair.secondary.stats().frames_sent, 1);
}

#[test]
fn handshake_survives_lost_request() {
    let mut pair = Pair::new();
    pair.primary.transport_mut().drop_frames = 1;
    pair.primary.start_link();
    pair.pump();
    assert_eq!(pair.primary.state(), LinkState::AwaitingAccept);
    assert_eq!(pair.secondary.state(), LinkState::Down);

    pair.tick();
    assert_eq!(pair.primary.state(), LinkState::Up);
    assert_eq!(pair.secondary.state(), LinkState::Up);
}

#[test]
fn packets_arrive_in_order() {
    let mut pair = Pair::connected();
    for n in 0..20u8 {
        pair.primary.submit_packet(0x10, &[n]).unwrap();
    }
    pair.pump();

    let expected: Vec<_> = (0..20u8).map(|n| (0x10, vec![n])).collect();
    assert_eq!(pair.received_by_secondary(), expected.as_slice());
    assert_eq!(pair.primary.unacked_len(), 0);
    assert_eq!(pair.primary.pending_len(), 0);
    assert_eq!(pair.primary.stats().retransmissions, 0);
}

#[test]
fn queued_before_handshake() {
    let mut pair = Pair::new();
    pair.primary.submit_packet(0x01, b"early").unwrap();
    pair.primary.start_link();
    pair.pump();

    assert_eq!(pair.received_by_secondary(), &[(0x01, b"early".to_vec())]);
}

#[test]
fn echo_reply() {
    let mut pair = Pair::connected();
    pair.secondary.listener_mut().echo = true;

    pair.primary.submit_packet(0x01, b"hello").unwrap();
    pair.pump();

    assert_eq!(pair.received_by_primary(), &[(0x01, b"hello".to_vec())]);
    assert_eq!(pair.primary.unacked_len(), 0);
    assert_eq!(pair.secondary.unacked_len(), 0);
}

#[test]
fn both_directions() {
    let mut pair = Pair::connected();
    for n in 0..10u8 {
        pair.primary.submit_packet(0xA0, &[n]).unwrap();
        pair.secondary.submit_packet(0xB0, &[n]).unwrap();
    }
    pair.pump();

    let from_primary: Vec<_> = (0..10u8).map(|n| (0xA0, vec![n])).collect();
    let from_secondary: Vec<_> = (0..10u8).map(|n| (0xB0, vec![n])).collect();
    assert_eq!(pair.received_by_secondary(), from_primary.as_slice());
    assert_eq!(pair.received_by_primary(), from_secondary.as_slice());
}

#[test]
fn lost_information_frame_is_retransmitted() {
    let mut pair = Pair::connected();
    pair.primary.transport_mut().drop_frames = 1;
    pair.primary.submit_packet(0x02, &[1, 2, 3]).unwrap();
    pair.pump();
    assert!(pair.received_by_secondary().is_empty());
    assert_eq!(pair.primary.unacked_len(), 1);

    pair.tick();
    assert_eq!(pair.received_by_secondary(), &[(0x02, vec![1, 2, 3])]);
    assert_eq!(pair.primary.unacked_len(), 0);
    assert_eq!(pair.primary.stats().retransmissions, 1);
}

#[test]
fn lost_acknowledgment_does_not_duplicate() {
    let mut pair = Pair::connected();
    pair.secondary.transport_mut().drop_frames = 1;
    pair.primary.submit_packet(0x03, &[9]).unwrap();
    pair.pump();
    assert_eq!(pair.received_by_secondary().len(), 1);
    assert_eq!(pair.primary.unacked_len(), 1);

    pair.tick();
    assert_eq!(pair.received_by_secondary().len(), 1);
    assert_eq!(pair.secondary.stats().duplicates, 1);
    assert_eq!(pair.primary.unacked_len(), 0);
}

#[test]
fn corrupted_bytes_recovered_by_retransmission() {
    let mut pair = Pair::connected();
    pair.primary.submit_packet(0x04, b"payload").unwrap();

    let mut bytes = std::mem::take(&mut pair.primary.transport_mut().bytes);
    // Flag, address, control, command, then the payload
    bytes[4] ^= 0x01;
    pair.secondary.on_bytes_received(&bytes);
    assert!(pair.received_by_secondary().is_empty());
    assert_eq!(pair.secondary.stats().checksum_errors, 1);

    pair.tick();
    assert_eq!(pair.received_by_secondary(), &[(0x04, b"payload".to_vec())]);
}

#[test]
fn peer_restart_with_frame_outstanding() {
    let mut pair = Pair::connected();
    pair.secondary.transport_mut().drop_frames = 1;
    pair.secondary.submit_packet(0x0A, b"A").unwrap();
    pair.pump();
    assert_eq!(pair.secondary.unacked_len(), 1);

    pair.primary.replace_transport(Wire::default());
    pair.pump();
    pair.tick();
    assert!(pair.primary.is_up());
    assert!(pair.secondary.is_up());

    pair.secondary.submit_packet(0x0B, b"B").unwrap();
    pair.pump();

    assert_eq!(
        pair.received_by_primary(),
        &[(0x0A, b"A".to_vec()), (0x0B, b"B".to_vec())]
    );
    assert_eq!(pair.primary.stats().duplicates, 0);
    assert_eq!(pair.secondary.unacked_len(), 0);
}

#[test]
fn primary_restart_while_up_keeps_sequence_fresh() {
    let mut pair = Pair::connected();
    pair.primary.submit_packet(0x01, b"one").unwrap();
    pair.pump();
    pair.secondary.transport_mut().drop_frames = 1;
    pair.primary.submit_packet(0x02, b"two").unwrap();
    pair.pump();
    assert_eq!(pair.primary.unacked_len(), 1);

    pair.primary.start_link();
    pair.pump();
    pair.primary.submit_packet(0x03, b"three").unwrap();
    pair.pump();

    assert_eq!(
        pair.received_by_secondary(),
        &[
            (0x01, b"one".to_vec()),
            (0x02, b"two".to_vec()),
            (0x02, b"two".to_vec()),
            (0x03, b"three".to_vec()),
        ]
    );
    assert_eq!(pair.primary.unacked_len(), 0);
}
