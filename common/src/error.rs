use std::io;

use bytes::BytesMut;
use thiserror::Error;

/// Encapsulating error for everything that can go wrong on the wire
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Data that could not be interpreted
    #[error(transparent)]
    InvalidData(#[from] InvalidData),
    /// Clearly not enough data was present
    #[error(transparent)]
    NotEnoughData(#[from] NotEnoughData),
    /// A frame too large to be plausible, or larger than negotiated
    #[error("received a packet too large to decode (len {0})")]
    TooMuchData(usize),
    /// An io error from the underlying stream
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Error when receiving bogus data from the other end
#[derive(Debug, Error)]
#[error("{msg}")]
pub struct InvalidData {
    /// A human readable message
    pub msg: &'static str,
    /// The data that was invalid
    pub offending_bytes: BytesMut,
}

impl InvalidData {
    /// Create a new `InvalidData` error
    #[must_use]
    pub fn new(msg: &'static str, offending_bytes: BytesMut) -> Self {
        Self {
            msg,
            offending_bytes,
        }
    }
}

/// Raised when a payload is shorter than its command requires
#[derive(Debug, Error)]
#[error("{item}: expected {expected} more byte(s) but got {got}: {msg}")]
pub struct NotEnoughData {
    /// The item that is missing data
    pub item: &'static str,
    /// Human readable message
    pub msg: &'static str,
    /// How many bytes were expected
    pub expected: usize,
    /// How many bytes were available
    pub got: usize,
    /// The problematic bytes
    pub buffer: BytesMut,
}

impl NotEnoughData {
    /// Create a new `NotEnoughData` error
    #[must_use]
    pub fn new(
        item: &'static str,
        msg: &'static str,
        expected: usize,
        got: usize,
        buffer: BytesMut,
    ) -> Self {
        Self {
            item,
            msg,
            expected,
            got,
            buffer,
        }
    }
}
