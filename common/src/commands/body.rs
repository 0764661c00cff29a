use bytes::BytesMut;

use crate::decoding::Parsable;
use crate::ProtocolError;

/// One chunk of the message body
///
/// Bodies larger than the negotiated maximum data size arrive split
/// into multiple chunks.
#[doc(alias = "SMFIC_BODY")]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Body {
    chunk: BytesMut,
}

impl Body {
    pub(crate) const CODE: u8 = b'B';

    /// Access the contained body bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.chunk
    }

    /// Convert this chunk into a `Vec<u8>`
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.chunk.to_vec()
    }
}

impl Parsable for Body {
    const CODE: u8 = Self::CODE;

    fn parse(buffer: BytesMut) -> Result<Self, ProtocolError> {
        Ok(Self { chunk: buffer })
    }
}

/// No more body chunks will be received after this
///
/// The only stage at which modifications may be sent back.
#[doc(alias = "SMFIC_BODYEOB")]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct EndOfBody;

impl EndOfBody {
    pub(crate) const CODE: u8 = b'E';
}

impl Parsable for EndOfBody {
    const CODE: u8 = Self::CODE;

    fn parse(_buffer: BytesMut) -> Result<Self, ProtocolError> {
        Ok(Self)
    }
}
