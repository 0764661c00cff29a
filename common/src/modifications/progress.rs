//! Keep-alive during long processing

use bytes::BytesMut;

use crate::encoding::Writable;

/// Tell the MTA processing is still ongoing.
///
/// Resets the MTA side read timeout while a filter needs more time than
/// usual before answering. Carries no payload and implies no change.
#[doc(alias = "SMFIR_PROGRESS")]
#[derive(Debug, Clone, Default)]
pub struct Progress;

impl Progress {
    const CODE: u8 = b'p';
}

impl Writable for Progress {
    fn write(&self, _buffer: &mut BytesMut) {}

    fn len(&self) -> usize {
        0
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        true
    }
}
