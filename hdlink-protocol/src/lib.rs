//! hdlink wire protocol
//!
//! This crate defines the byte-level framing used between two hdlink peers
//! over a serial line: an HDLC-inspired frame with byte stuffing and a 16-bit
//! checksum. Link management (handshake, acknowledgment, retransmission) lives
//! in `hdlink-core`; this crate only knows how bytes become frames.
//!
//! # Frame Format
//!
//! ```text
//! ┌──────┬─────────┬─────────┬─────────────┬────────┬────────┬──────┐
//! │ FLAG │ ADDRESS │ CONTROL │ PAYLOAD     │ CRC LO │ CRC HI │ FLAG │
//! │ 0x7E │ 0xFF    │ 1B      │ 0–4092B     │ 1B     │ 1B     │ 0x7E │
//! └──────┴─────────┴─────────┴─────────────┴────────┴────────┴──────┘
//! ```
//!
//! Every byte between the two flags that equals `0x7E` or `0x7D` is sent as
//! `0x7D, byte ^ 0x20`. The checksum covers address, control and payload.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod checksum;
pub mod control;
pub mod deframer;
pub mod frame;
pub mod seq;

pub use checksum::{checksum, Crc16Ccitt};
pub use control::{Control, FrameKind, SupervisoryCode, UnnumberedCommand};
pub use deframer::Deframer;
pub use frame::{
    encode, max_encoded_len, Frame, FrameError, ADDRESS, ESCAPE, ESCAPE_XOR, FLAG,
    MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
pub use seq::SeqNum;
