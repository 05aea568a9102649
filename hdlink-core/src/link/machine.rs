//! Connection state machine
//!
//! ```text
//!            start_link()              UA
//!   Down ───────────────► AwaitingAccept ────► Up
//!    ▲                        │  ▲                │
//!    │                        └──┘ link timeout   │
//!    └──────── DM sent (protocol violation) ──────┘
//! ```

use hdlink_hal::{TimerService, UartTx};
use hdlink_protocol::{Control, SeqNum, SupervisoryCode, UnnumberedCommand};

use super::{Link, PacketListener};
use crate::config::Role;

/// Connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// No connection; information frames are held back
    #[default]
    Down,
    /// SNRM sent, waiting for UA
    AwaitingAccept,
    /// Handshake complete
    Up,
}

impl<T, S, L> Link<T, S, L>
where
    T: UartTx,
    S: TimerService,
    L: PacketListener,
{
    /// Send a handshake request and arm the link timer
    ///
    /// The request repeats on every link timeout until UA arrives.
    pub fn start_link(&mut self) {
        info!("Requesting link");
        self.send_frame(Control::SNRM, &[]);
        self.cancel_link_timer();
        self.link_timer = Some(self.timers.schedule_once(self.config.link_timeout_ms));
        self.state = LinkState::AwaitingAccept;
    }

    pub(super) fn on_link_timeout(&mut self) {
        info!("No response, retrying link request");
        self.start_link();
    }

    pub(super) fn handle_unnumbered(&mut self, command: UnnumberedCommand) {
        use UnnumberedCommand::*;

        match (self.config.role, command) {
            (_, UnnumberedAck) if self.state != LinkState::Up => self.set_link_up(),
            (_, UnnumberedAck) => debug!("Link already up, ignoring UA"),
            (Role::Secondary, SetNormalResponseMode) => {
                self.send_frame(Control::UA, &[]);
                self.set_link_up();
            }
            (Role::Secondary, DisconnectedMode) => {
                info!("Peer disconnected");
                self.set_link_down();
            }
            (_, other) => {
                warn!("Unexpected unnumbered frame {:?}, disconnecting", other);
                self.stats.protocol_violations += 1;
                self.disconnect();
            }
        }
    }

    pub(super) fn handle_supervisory(&mut self, code: SupervisoryCode, recv_seq: SeqNum) {
        match code {
            SupervisoryCode::ReceiveReady => self.ack_up_to(recv_seq),
            SupervisoryCode::Reject => {
                debug!("Got REJ for sequence {}", recv_seq);
                self.retransmit_renumbered();
            }
            SupervisoryCode::ReceiveNotReady | SupervisoryCode::Undefined => {
                warn!("Unsupported supervisory frame {:?}, disconnecting", code);
                self.stats.protocol_violations += 1;
                self.disconnect();
            }
        }
    }

    /// Tell the peer we are disconnecting and go down
    pub fn disconnect(&mut self) {
        self.send_frame(Control::DM, &[]);
        self.set_link_down();
    }

    /// Start a new session; anything still unacknowledged is renumbered in it
    fn set_link_up(&mut self) {
        self.cancel_link_timer();
        self.requeue_unacknowledged();
        self.tx_seq = SeqNum::ZERO;
        self.last_received = None;
        self.state = LinkState::Up;
        info!("Link up");
        self.check_xmit();
    }

    /// Enter `Down`, keeping any unacknowledged packet for the next session
    ///
    /// A pending handshake timer keeps running, so a primary that was still
    /// awaiting accept retries on its own.
    pub(super) fn set_link_down(&mut self) {
        if self.state != LinkState::Down {
            info!("Link down");
        }
        self.state = LinkState::Down;
        self.ack_pending = false;
        self.requeue_unacknowledged();
    }
}
