#![doc = include_str!("../Readme.md")]

use std::mem::size_of;

use bytes::{Buf, BytesMut};

/// Non-panicking splitting and integer reads on a [`BytesMut`].
///
/// Every method returns `None` instead of panicking when the buffer is
/// shorter than requested, leaving the buffer untouched in that case.
pub trait ByteParsing {
    /// Split off everything up to the next `delimiter` byte.
    ///
    /// The delimiter itself is consumed but not returned. `None` if the
    /// delimiter does not occur in the buffer.
    fn delimited(&mut self, delimiter: u8) -> Option<BytesMut>;

    /// Split off the first `at` bytes, or `None` if fewer are buffered.
    fn safe_split_to(&mut self, at: usize) -> Option<BytesMut>;

    /// Consume a single byte from the front.
    fn safe_get_u8(&mut self) -> Option<u8>;

    /// Consume a big-endian `u16` from the front.
    fn safe_get_u16(&mut self) -> Option<u16>;

    /// Consume a big-endian `u32` from the front.
    fn safe_get_u32(&mut self) -> Option<u32>;
}

impl ByteParsing for BytesMut {
    fn delimited(&mut self, delimiter: u8) -> Option<BytesMut> {
        let index = self.iter().position(|&b| b == delimiter)?;

        let off = self.split_to(index);
        self.advance(1);

        Some(off)
    }

    fn safe_split_to(&mut self, at: usize) -> Option<Self> {
        if at > self.len() {
            return None;
        }
        Some(self.split_to(at))
    }

    fn safe_get_u8(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        Some(self.get_u8())
    }

    fn safe_get_u16(&mut self) -> Option<u16> {
        if self.len() < size_of::<u16>() {
            return None;
        }
        Some(self.get_u16())
    }

    fn safe_get_u32(&mut self) -> Option<u32> {
        if self.len() < size_of::<u32>() {
            return None;
        }
        Some(self.get_u32())
    }
}
