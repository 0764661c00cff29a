use bytes::BytesMut;

/// A single milter frame: one command or response code plus its payload.
///
/// On the wire a packet is a big-endian `u32` length, one code byte and
/// `length - 1` payload bytes. The framing codec produces and consumes
/// this type; everything above it works on typed commands and responses.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Packet {
    /// The command or response code byte.
    pub code: u8,
    /// The opaque payload, possibly empty.
    pub payload: BytesMut,
}

impl Packet {
    /// Assemble a packet from a code and payload bytes.
    #[must_use]
    pub fn new(code: u8, payload: &[u8]) -> Self {
        Self {
            code,
            payload: BytesMut::from(payload),
        }
    }
}
