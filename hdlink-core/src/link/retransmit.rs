//! Transmit queue, acknowledgment queue and retransmission
//!
//! Packets wait in the transmit queue until the acknowledgment queue has
//! room. With a window of one, the next information frame leaves only after
//! the previous one is acknowledged.

use alloc::vec::Vec;

use hdlink_hal::{TimerService, UartTx};
use hdlink_protocol::{Control, SeqNum, SupervisoryCode};

use super::{Link, LinkState, PacketListener};

/// Maximum number of unacknowledged information frames
pub const ACK_WINDOW: usize = 1;

/// Number of sequence numbers searched backwards from N(R)
const ACK_SEARCH_DEPTH: u8 = 4;

/// A sent packet awaiting acknowledgment
#[derive(Debug, Clone)]
pub(super) struct Outstanding {
    pub(super) seq: SeqNum,
    pub(super) packet: Vec<u8>,
}

impl<T, S, L> Link<T, S, L>
where
    T: UartTx,
    S: TimerService,
    L: PacketListener,
{
    pub(super) fn enqueue(&mut self, packet: Vec<u8>) {
        self.tx_queue.push_back(packet);
        self.check_xmit();
    }

    /// Deferred-transmit check: send the next queued packet if the window is open
    pub(super) fn check_xmit(&mut self) {
        if self.state != LinkState::Up || self.delivering || self.ack_queue.len() >= ACK_WINDOW {
            return;
        }

        if let Some(packet) = self.tx_queue.pop_front() {
            let seq = self.tx_seq.post_increment();
            self.send_information(seq, &packet);
            self.ack_queue.push_back(Outstanding { seq, packet });
            self.start_retransmit_timer();
        }
    }

    /// Accepted information frame from the peer
    pub(super) fn handle_information(&mut self, send_seq: SeqNum, recv_seq: SeqNum, payload: &[u8]) {
        self.ack_up_to(recv_seq);

        if self.last_received == Some(send_seq) {
            debug!("Duplicate information frame {}", send_seq);
            self.stats.duplicates += 1;
        } else {
            self.last_received = Some(send_seq);
            if let Some((&command, data)) = payload.split_first() {
                self.deliver(command, data);
            }
        }
        self.ack_pending = true;
    }

    /// Cumulative acknowledgment of every frame before `seq`
    pub(super) fn ack_up_to(&mut self, seq: SeqNum) {
        trace!("Acking up to {}", seq);

        for back in 1..=ACK_SEARCH_DEPTH {
            let candidate = seq - back;
            if let Some(index) = self.ack_queue.iter().position(|p| p.seq == candidate) {
                trace!("Frame {} acknowledged", candidate);
                self.ack_queue.remove(index);
                self.cancel_retransmit_timer();
                return;
            }
        }

        self.stats.stale_acks += 1;
        if self.ack_queue.is_empty() {
            trace!("Acknowledgment up to {} with nothing outstanding", seq);
        } else {
            warn!("Acknowledgment up to {} matches no outstanding frame", seq);
        }
    }

    /// Answer a received information frame that no outbound frame acknowledged
    pub(super) fn flush_ack(&mut self) {
        if !self.ack_pending {
            return;
        }
        self.ack_pending = false;
        if self.state == LinkState::Up {
            let control = Control::supervisory(SupervisoryCode::ReceiveReady, self.rx_seq(), false);
            self.send_frame(control, &[]);
        }
    }

    /// Timer-driven resend: same packet, same sequence number
    pub(super) fn on_retransmit_timeout(&mut self) {
        if self.state != LinkState::Up {
            return;
        }

        if let Some(outstanding) = self.ack_queue.pop_front() {
            info!("Timeout waiting for acknowledge, resending frame {}", outstanding.seq);
            self.stats.retransmissions += 1;
            self.send_information(outstanding.seq, &outstanding.packet);
            self.start_retransmit_timer();
            self.ack_queue.push_back(outstanding);
        }
    }

    /// REJ-driven resend: same packet under the next sequence number
    pub(super) fn retransmit_renumbered(&mut self) {
        if let Some(mut outstanding) = self.ack_queue.pop_front() {
            let seq = self.tx_seq.post_increment();
            debug!("Resending frame {} as {}", outstanding.seq, seq);
            outstanding.seq = seq;
            self.stats.retransmissions += 1;
            self.send_information(seq, &outstanding.packet);
            self.start_retransmit_timer();
            self.ack_queue.push_back(outstanding);
        }
    }

    /// Move unacknowledged packets back to the head of the transmit queue
    pub(super) fn requeue_unacknowledged(&mut self) {
        self.cancel_retransmit_timer();
        while let Some(outstanding) = self.ack_queue.pop_back() {
            self.tx_queue.push_front(outstanding.packet);
        }
    }

    fn send_information(&mut self, seq: SeqNum, packet: &[u8]) {
        let control = Control::information(seq, self.rx_seq(), true);
        self.send_frame(control, packet);
        // N(R) rides along, no separate RR needed
        self.ack_pending = false;
    }

    fn start_retransmit_timer(&mut self) {
        self.cancel_retransmit_timer();
        self.retransmit_timer = Some(
            self.timers
                .schedule_once(self.config.retransmit_timeout_ms),
        );
    }
}
