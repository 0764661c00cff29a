use bytes::BytesMut;

use crate::Packet;

/// A command this implementation has no typed representation for.
///
/// Covers both `SMFIC_UNKNOWN` (an unknown *SMTP* command forwarded by
/// the MTA) and any milter command code this crate does not recognize.
/// The session decides whether receiving it is acceptable.
#[doc(alias = "SMFIC_UNKNOWN")]
#[derive(Clone, PartialEq, Debug)]
pub struct Unknown {
    /// The command code the packet arrived with
    pub code: u8,
    data: BytesMut,
}

impl Unknown {
    /// Access the raw payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<Packet> for Unknown {
    fn from(packet: Packet) -> Self {
        Self {
            code: packet.code,
            data: packet.payload,
        }
    }
}
