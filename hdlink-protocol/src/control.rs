//! Control byte layout
//!
//! ```text
//!  bit:  7 6 5 │ 4 │ 3 2 1 │ 0
//!  I  :  N(R)  │ P │ N(S)  │ 0
//!  S  :  N(R)  │ P │ SS  0 │ 1      SS = supervisory code (bits 2-3)
//!  U  :  whole byte identifies the command, bits 0-1 = 11
//! ```

use crate::seq::SeqNum;

const POLL_BIT: u8 = 0x10;

/// Set Normal Response Mode (handshake request)
pub const SNRM: u8 = 0x83;
/// Unnumbered Acknowledge (handshake accept)
pub const UA: u8 = 0x63;
/// Disconnected Mode
pub const DM: u8 = 0x0F;

/// Supervisory frame code, bits 2-3 of the control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupervisoryCode {
    /// Receive Ready: acknowledges frames up to N(R)
    ReceiveReady,
    /// Receive Not Ready
    ReceiveNotReady,
    /// Reject: peer lost or dropped a frame
    Reject,
    /// Code 3, not defined by this protocol
    Undefined,
}

impl SupervisoryCode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => SupervisoryCode::ReceiveReady,
            1 => SupervisoryCode::ReceiveNotReady,
            2 => SupervisoryCode::Reject,
            _ => SupervisoryCode::Undefined,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            SupervisoryCode::ReceiveReady => 0,
            SupervisoryCode::ReceiveNotReady => 1,
            SupervisoryCode::Reject => 2,
            SupervisoryCode::Undefined => 3,
        }
    }
}

/// Unnumbered frame command, identified by the whole control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnnumberedCommand {
    /// Handshake request
    SetNormalResponseMode,
    /// Handshake accept
    UnnumberedAck,
    /// Disconnect
    DisconnectedMode,
    /// Any other unnumbered control byte
    Other(u8),
}

/// Decoded view of a control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameKind {
    /// Information frame carrying payload
    Information {
        send_seq: SeqNum,
        recv_seq: SeqNum,
        poll: bool,
    },
    /// Supervisory frame carrying acknowledgment signalling
    Supervisory {
        code: SupervisoryCode,
        recv_seq: SeqNum,
        poll: bool,
    },
    /// Unnumbered frame carrying connection control
    Unnumbered(UnnumberedCommand),
}

/// Raw control byte of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Control(pub u8);

impl Control {
    /// Handshake request
    pub const SNRM: Self = Self(SNRM);
    /// Handshake accept
    pub const UA: Self = Self(UA);
    /// Disconnect
    pub const DM: Self = Self(DM);

    /// Build an Information control byte
    pub fn information(send_seq: SeqNum, recv_seq: SeqNum, poll: bool) -> Self {
        let mut byte = (send_seq.get() << 1) | (recv_seq.get() << 5);
        if poll {
            byte |= POLL_BIT;
        }
        Self(byte)
    }

    /// Build a Supervisory control byte
    pub fn supervisory(code: SupervisoryCode, recv_seq: SeqNum, poll: bool) -> Self {
        let mut byte = 0x01 | (code.to_bits() << 2) | (recv_seq.get() << 5);
        if poll {
            byte |= POLL_BIT;
        }
        Self(byte)
    }

    /// Get the raw byte
    pub fn byte(self) -> u8 {
        self.0
    }

    /// Classify this control byte
    pub fn kind(self) -> FrameKind {
        let byte = self.0;
        let poll = byte & POLL_BIT != 0;
        let recv_seq = SeqNum::new(byte >> 5);

        if byte & 0x01 == 0 {
            FrameKind::Information {
                send_seq: SeqNum::new(byte >> 1),
                recv_seq,
                poll,
            }
        } else if byte & 0x03 == 0x01 {
            FrameKind::Supervisory {
                code: SupervisoryCode::from_bits(byte >> 2),
                recv_seq,
                poll,
            }
        } else {
            FrameKind::Unnumbered(match byte {
                SNRM => UnnumberedCommand::SetNormalResponseMode,
                UA => UnnumberedCommand::UnnumberedAck,
                DM => UnnumberedCommand::DisconnectedMode,
                other => UnnumberedCommand::Other(other),
            })
        }
    }
}
