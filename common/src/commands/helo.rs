use std::borrow::Cow;

use bytes::BytesMut;

use crate::decoding::Parsable;
use crate::{InvalidData, ProtocolError};

/// The HELO/EHLO greeting sent by the smtp client
#[doc(alias = "SMFIC_HELO")]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Helo {
    name: BytesMut,
}

impl Helo {
    pub(crate) const CODE: u8 = b'H';

    /// The name the smtp client greeted with
    #[must_use]
    pub fn name(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.name)
    }
}

impl Parsable for Helo {
    const CODE: u8 = Self::CODE;

    fn parse(mut buffer: BytesMut) -> Result<Self, ProtocolError> {
        match buffer.last() {
            None => {
                return Err(InvalidData::new(
                    "Received empty helo packet, not even null terminated",
                    buffer,
                )
                .into())
            }
            Some(&x) if x != 0 => {
                return Err(InvalidData::new(
                    "Received helo packet with missing null byte termination",
                    buffer,
                )
                .into())
            }
            Some(_) => buffer.split_off(buffer.len() - 1),
        };

        Ok(Self { name: buffer })
    }
}
