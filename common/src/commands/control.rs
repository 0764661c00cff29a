//! Protocol control commands that do not report SMTP events.

use bytes::BytesMut;

use crate::decoding::Parsable;
use crate::ProtocolError;

/// Abort the message in flight and return to the pre-MAIL state
///
/// The connection stays open; the MTA may start the next message right
/// away.
#[doc(alias = "SMFIC_ABORT")]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Abort;

impl Abort {
    pub(crate) const CODE: u8 = b'A';
}

impl Parsable for Abort {
    const CODE: u8 = Self::CODE;

    fn parse(_buffer: BytesMut) -> Result<Self, ProtocolError> {
        Ok(Self)
    }
}

/// Quit this milter connection gracefully
#[doc(alias = "SMFIC_QUIT")]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Quit;

impl Quit {
    pub(crate) const CODE: u8 = b'Q';
}

impl Parsable for Quit {
    const CODE: u8 = Self::CODE;

    fn parse(_buffer: BytesMut) -> Result<Self, ProtocolError> {
        Ok(Self)
    }
}

/// Quit this connection, but announce the intent to open a new one
#[doc(alias = "SMFIC_QUIT_NC")]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct QuitNc;

impl QuitNc {
    pub(crate) const CODE: u8 = b'K';
}

impl Parsable for QuitNc {
    const CODE: u8 = Self::CODE;

    fn parse(_buffer: BytesMut) -> Result<Self, ProtocolError> {
        Ok(Self)
    }
}
