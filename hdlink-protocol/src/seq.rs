//! Three-bit frame sequence numbers

use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign};

/// Sequence number space is modulo 8
pub const SEQ_MODULUS: u8 = 8;

const SEQ_MASK: u8 = SEQ_MODULUS - 1;

/// A sequence number in `0..8` with wrapping arithmetic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SeqNum(u8);

impl SeqNum {
    /// Sequence number zero
    pub const ZERO: Self = Self(0);

    /// Create a sequence number, discarding all but the low three bits
    pub const fn new(value: u8) -> Self {
        Self(value & SEQ_MASK)
    }

    /// Get the raw value in `0..8`
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Return the current value and advance by one
    pub fn post_increment(&mut self) -> Self {
        let current = *self;
        *self += 1;
        current
    }
}

impl From<SeqNum> for u8 {
    fn from(seq: SeqNum) -> Self {
        seq.0
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add<u8> for SeqNum {
    type Output = Self;

    fn add(self, rhs: u8) -> Self::Output {
        Self::new(self.0.wrapping_add(rhs))
    }
}

impl AddAssign<u8> for SeqNum {
    fn add_assign(&mut self, rhs: u8) {
        *self = *self + rhs;
    }
}

impl Sub<u8> for SeqNum {
    type Output = Self;

    fn sub(self, rhs: u8) -> Self::Output {
        Self::new(self.0.wrapping_sub(rhs))
    }
}

impl SubAssign<u8> for SeqNum {
    fn sub_assign(&mut self, rhs: u8) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_masks_high_bits() {
        assert_eq!(SeqNum::new(9).get(), 1);
        assert_eq!(SeqNum::new(0xFF).get(), 7);
    }

    #[test]
    fn test_wraps_forward() {
        assert_eq!(SeqNum::new(7) + 1, SeqNum::ZERO);
        assert_eq!(SeqNum::new(6) + 3, SeqNum::new(1));
    }

    #[test]
    fn test_wraps_backward() {
        assert_eq!(SeqNum::ZERO - 1, SeqNum::new(7));
        assert_eq!(SeqNum::new(2) - 4, SeqNum::new(6));
    }

    #[test]
    fn test_post_increment() {
        let mut seq = SeqNum::new(7);
        assert_eq!(seq.post_increment(), SeqNum::new(7));
        assert_eq!(seq, SeqNum::ZERO);
    }
}
