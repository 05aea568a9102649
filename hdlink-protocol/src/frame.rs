//! Frame encoding for the hdlink protocol.
//!
//! Frame format (before stuffing):
//! - ADDRESS (1 byte): always 0xFF, there is a single peer
//! - CONTROL (1 byte): frame kind, sequence numbers, poll bit
//! - PAYLOAD (0-4092 bytes)
//! - CHECKSUM (2 bytes): CRC over ADDRESS, CONTROL and PAYLOAD, low byte first
//!
//! On the wire the frame is wrapped in FLAG bytes and every data byte equal
//! to FLAG or ESCAPE is replaced by `ESCAPE, byte ^ ESCAPE_XOR`.

use heapless::Vec;

use crate::checksum::Crc16Ccitt;
use crate::control::Control;

/// Frame delimiter
pub const FLAG: u8 = 0x7E;

/// Escape marker
pub const ESCAPE: u8 = 0x7D;

/// Mask applied to an escaped byte
pub const ESCAPE_XOR: u8 = 0x20;

/// Destination address sentinel
pub const ADDRESS: u8 = 0xFF;

/// Maximum unstuffed frame size (ADDRESS + CONTROL + PAYLOAD + CHECKSUM)
pub const MAX_FRAME_SIZE: usize = 4096;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - 4;

/// Errors that can occur during frame decoding or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Closed frame shorter than ADDRESS + CONTROL + CHECKSUM
    TooSmall(usize),
    /// Checksum mismatch
    ChecksumMismatch { expected: u16, received: u16 },
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Destination address, always [`ADDRESS`] from a conforming peer
    pub address: u8,
    /// Control byte
    pub control: Control,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given control byte and payload
    pub fn new(control: Control, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            address: ADDRESS,
            control,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(control: Control) -> Self {
        Self {
            address: ADDRESS,
            control,
            payload: Vec::new(),
        }
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        encode(self.control, &self.payload, buffer)
    }
}

/// Worst-case wire size of a frame carrying `payload_len` bytes
///
/// Every stuffed byte may double; the two flags never do.
pub const fn max_encoded_len(payload_len: usize) -> usize {
    2 + 2 * (4 + payload_len)
}

/// Writes stuffed bytes into a caller-provided buffer
struct Stuffer<'a> {
    buffer: &'a mut [u8],
    len: usize,
    crc: Crc16Ccitt,
}

impl<'a> Stuffer<'a> {
    fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            len: 0,
            crc: Crc16Ccitt::new(),
        }
    }

    fn raw(&mut self, byte: u8) -> Result<(), FrameError> {
        let slot = self
            .buffer
            .get_mut(self.len)
            .ok_or(FrameError::BufferTooSmall)?;
        *slot = byte;
        self.len += 1;
        Ok(())
    }

    fn escaped(&mut self, byte: u8) -> Result<(), FrameError> {
        if byte == FLAG || byte == ESCAPE {
            self.raw(ESCAPE)?;
            self.raw(byte ^ ESCAPE_XOR)
        } else {
            self.raw(byte)
        }
    }

    fn data(&mut self, byte: u8) -> Result<(), FrameError> {
        self.crc.update(byte);
        self.escaped(byte)
    }
}

/// Encode a frame with the given control byte and payload into `buffer`
///
/// Returns the number of bytes written. A buffer of
/// [`max_encoded_len`]`(payload.len())` bytes is always large enough.
pub fn encode(control: Control, payload: &[u8], buffer: &mut [u8]) -> Result<usize, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge);
    }

    let mut out = Stuffer::new(buffer);
    out.raw(FLAG)?;
    out.data(ADDRESS)?;
    out.data(control.byte())?;
    for &byte in payload {
        out.data(byte)?;
    }

    let [crc_lo, crc_hi] = out.crc.value().to_le_bytes();
    out.escaped(crc_lo)?;
    out.escaped(crc_hi)?;
    out.raw(FLAG)?;

    Ok(out.len)
}
