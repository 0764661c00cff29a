//! Replace the message body

use std::borrow::Cow;

use bytes::BytesMut;

use crate::encoding::Writable;

/// Replace the body of the incoming mail.
///
/// If this modification is used, the **whole** body has to be sent
/// back. It can be split across multiple `ReplaceBody` packets of at
/// most the negotiated maximum data size each; together they form the
/// complete replacement.
#[doc(alias = "SMFIR_REPLBODY")]
#[derive(Debug, Clone)]
pub struct ReplaceBody {
    chunk: BytesMut,
}

impl ReplaceBody {
    const CODE: u8 = b'b';

    /// One chunk of the replacement body
    #[must_use]
    pub fn new(chunk: &[u8]) -> Self {
        Self {
            chunk: BytesMut::from_iter(chunk),
        }
    }

    /// The chunk to send back
    #[must_use]
    pub fn chunk(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.chunk)
    }
}

impl Writable for ReplaceBody {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(&self.chunk);
    }

    fn len(&self) -> usize {
        self.chunk.len()
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        self.chunk.is_empty()
    }
}
