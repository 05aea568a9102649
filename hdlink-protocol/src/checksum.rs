//! 16-bit frame checksum
//!
//! Reflected CCITT polynomial folded one byte at a time, seeded with
//! `0xFFFF` and without a final XOR (the CRC-16/MCRF4XX parameter set).

/// Seed value loaded by [`Crc16Ccitt::reset`]
pub const CRC_INIT: u16 = 0xFFFF;

/// Rolling checksum accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Crc16Ccitt {
    crc: u16,
}

impl Default for Crc16Ccitt {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc16Ccitt {
    /// Create an accumulator holding the seed value
    pub const fn new() -> Self {
        Self { crc: CRC_INIT }
    }

    /// Reload the seed value
    pub fn reset(&mut self) {
        self.crc = CRC_INIT;
    }

    /// Fold one byte into the accumulator
    pub fn update(&mut self, byte: u8) {
        let mut data = byte ^ (self.crc & 0xFF) as u8;
        data ^= data << 4;
        let data = u16::from(data);
        self.crc = ((data << 8) | (self.crc >> 8)) ^ (data >> 4) ^ (data << 3);
    }

    /// Fold a slice of bytes into the accumulator
    pub fn update_slice(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.update(byte);
        }
    }

    /// Current accumulator value
    pub fn value(&self) -> u16 {
        self.crc
    }
}

/// Checksum of a complete byte sequence, starting from the seed
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut crc = Crc16Ccitt::new();
    crc.update_slice(bytes);
    crc.value()
}
