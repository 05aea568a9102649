//! Streaming receive side: flag synchronisation, unstuffing and validation

use heapless::Vec;

use crate::checksum::checksum;
use crate::control::Control;
use crate::frame::{Frame, FrameError, ESCAPE, ESCAPE_XOR, FLAG, MAX_FRAME_SIZE};

/// Smallest closed frame: ADDRESS + CONTROL + CHECKSUM
const MIN_FRAME_SIZE: usize = 4;

/// Byte-at-a-time frame assembler
///
/// Bytes between an opening and a closing flag are unstuffed into an
/// internal buffer. Bytes past [`MAX_FRAME_SIZE`] are dropped, which makes
/// the checksum fail when the frame closes.
#[derive(Debug, Clone)]
pub struct Deframer {
    buffer: Vec<u8, MAX_FRAME_SIZE>,
    in_frame: bool,
    unescaping: bool,
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deframer {
    /// Create a new deframer waiting for an opening flag
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            in_frame: false,
            unescaping: false,
        }
    }

    /// Drop any partial frame and wait for the next opening flag
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_frame = false;
        self.unescaping = false;
    }

    /// Whether an opening flag has been seen and the frame is not closed yet
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Number of unstuffed bytes accumulated for the current frame
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a single byte to the deframer
    ///
    /// Returns `Ok(Some(frame))` when a flag closes a valid frame,
    /// `Ok(None)` when more bytes are needed, or `Err` when a closed frame
    /// is discarded.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        if byte == ESCAPE {
            self.unescaping = true;
            return Ok(None);
        }

        if byte == FLAG && !self.unescaping {
            if !self.in_frame {
                self.buffer.clear();
                self.in_frame = true;
            } else if !self.buffer.is_empty() {
                self.in_frame = false;
                let result = self.validate();
                self.buffer.clear();
                return result.map(Some);
            }
            // Flag on an empty buffer is idle fill
            return Ok(None);
        }

        let byte = if self.unescaping {
            self.unescaping = false;
            byte ^ ESCAPE_XOR
        } else {
            byte
        };

        if self.in_frame {
            // Overrun: drop silently, the checksum will reject the frame
            let _ = self.buffer.push(byte);
        }
        Ok(None)
    }

    fn validate(&self) -> Result<Frame, FrameError> {
        let len = self.buffer.len();
        if len < MIN_FRAME_SIZE {
            return Err(FrameError::TooSmall(len));
        }

        let (body, trailer) = self.buffer.split_at(len - 2);
        let received = u16::from_le_bytes([trailer[0], trailer[1]]);
        let expected = checksum(body);
        if received != expected {
            return Err(FrameError::ChecksumMismatch { expected, received });
        }

        let mut payload = Vec::new();
        payload
            .extend_from_slice(&body[2..])
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Frame {
            address: body[0],
            control: Control(body[1]),
            payload,
        })
    }
}
