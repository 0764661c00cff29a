use std::borrow::Cow;

use bytes::BytesMut;

use crate::decoding::Parsable;
use crate::{InvalidData, ProtocolError};
use milterd_utils::ByteParsing;

/// Strip surrounding angle brackets and lowercase an envelope address.
///
/// `MAIL FROM:<Alice@Example.ORG>` and `RCPT TO:` arguments arrive with
/// the brackets of the SMTP syntax still attached; filters want to
/// compare plain addresses.
pub(crate) fn normalize_address(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(|c| c == '<' || c == '>')
        .to_lowercase()
}

pub(crate) fn split_esmtp_args(args: Option<&BytesMut>) -> Vec<Cow<str>> {
    let Some(args) = args else {
        return Vec::new();
    };

    args[..]
        .split(|&b| b == 0)
        .map(String::from_utf8_lossy)
        .collect()
}

/// The envelope sender of a new message
#[doc(alias = "SMFIC_MAIL")]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Mail {
    sender: BytesMut,
    esmtp_args: Option<BytesMut>,
}

impl Mail {
    pub(crate) const CODE: u8 = b'M';

    /// The envelope sender, trimmed of `<>` and lowercased.
    #[must_use]
    pub fn sender(&self) -> String {
        normalize_address(&self.sender)
    }

    /// The envelope sender exactly as received.
    #[must_use]
    pub fn raw_sender(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.sender)
    }

    /// Additional ESMTP arguments to MAIL FROM, empty if none were sent.
    #[must_use]
    pub fn esmtp_args(&self) -> Vec<Cow<str>> {
        split_esmtp_args(self.esmtp_args.as_ref())
    }
}

impl Parsable for Mail {
    const CODE: u8 = Self::CODE;

    fn parse(mut buffer: BytesMut) -> Result<Self, ProtocolError> {
        let Some(sender) = buffer.delimited(0) else {
            return Err(InvalidData::new(
                "Null-byte missing in mail packet to delimit the sender",
                buffer,
            )
            .into());
        };

        let esmtp_args = if buffer.is_empty() { None } else { Some(buffer) };

        Ok(Self { sender, esmtp_args })
    }
}

/// The smtp DATA command has been issued
///
/// Carries no payload; it only marks the transition to the data phase.
#[doc(alias = "SMFIC_DATA")]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Data;

impl Data {
    pub(crate) const CODE: u8 = b'T';
}

impl Parsable for Data {
    const CODE: u8 = Self::CODE;

    fn parse(_buffer: BytesMut) -> Result<Self, ProtocolError> {
        Ok(Self)
    }
}
