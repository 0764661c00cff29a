//! Option negotiation between the MTA and the milter
//!
//! The first packet on every connection is an `O` packet in which the
//! MTA offers its protocol version and bitmasks; the milter answers
//! with the version it speaks and the masks it wants.

mod capability;
mod protocol;

use bytes::BytesMut;

use crate::decoding::Parsable;
use crate::encoding::Writable;
use crate::{NotEnoughData, ProtocolError};
use milterd_utils::ByteParsing;

pub use capability::Capability;
pub use protocol::Protocol;

/// The option negotiation packet, identical in layout in both
/// directions: protocol version, action bitmask, protocol bitmask.
#[doc(alias = "SMFIC_OPTNEG")]
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OptNeg {
    /// The milter protocol version
    pub version: u32,
    /// Which modifications the milter may request
    pub actions: Capability,
    /// Which parts of the SMTP conversation to mask out or leave
    /// unanswered
    pub protocol: Protocol,
}

impl OptNeg {
    /// The milter protocol version this implementation speaks.
    ///
    /// Version 2 is the baseline every MTA milter client understands;
    /// sendmail and postfix both fall back to it.
    pub const VERSION: u32 = 2;

    const DATA_SIZE: usize = 4 + 4 + 4;
    const CODE: u8 = b'O';

    /// The answer a milter gives for its declared bitmasks.
    #[must_use]
    pub fn reply(actions: Capability, protocol: Protocol) -> Self {
        Self {
            version: Self::VERSION,
            actions,
            protocol,
        }
    }
}

impl Default for OptNeg {
    fn default() -> Self {
        Self {
            version: Self::VERSION,
            actions: Capability::default(),
            protocol: Protocol::default(),
        }
    }
}

impl Parsable for OptNeg {
    const CODE: u8 = Self::CODE;

    fn parse(mut buffer: BytesMut) -> Result<Self, ProtocolError> {
        if buffer.len() < Self::DATA_SIZE {
            return Err(NotEnoughData::new(
                "Option negotiation",
                "three u32 fields required",
                Self::DATA_SIZE,
                buffer.len(),
                buffer,
            )
            .into());
        }

        // Infallible after the length check above.
        let version = buffer.safe_get_u32().unwrap_or_default();
        let actions = Capability::from_bits_retain(buffer.safe_get_u32().unwrap_or_default());
        let protocol = Protocol::from_bits_retain(buffer.safe_get_u32().unwrap_or_default());

        Ok(Self {
            version,
            actions,
            protocol,
        })
    }
}

impl Writable for OptNeg {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(&self.version.to_be_bytes());
        buffer.extend_from_slice(&self.actions.bits().to_be_bytes());
        buffer.extend_from_slice(&self.protocol.bits().to_be_bytes());
    }

    fn len(&self) -> usize {
        Self::DATA_SIZE
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        false
    }
}
