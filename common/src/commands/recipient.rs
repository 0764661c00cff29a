use std::borrow::Cow;

use bytes::BytesMut;

use crate::commands::mail::{normalize_address, split_esmtp_args};
use crate::decoding::Parsable;
use crate::{InvalidData, ProtocolError};
use milterd_utils::ByteParsing;

/// One envelope recipient of the current message
#[doc(alias = "SMFIC_RCPT")]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Recipient {
    recipient: BytesMut,
    esmtp_args: Option<BytesMut>,
}

impl Recipient {
    pub(crate) const CODE: u8 = b'R';

    /// The envelope recipient, trimmed of `<>` and lowercased.
    #[must_use]
    pub fn recipient(&self) -> String {
        normalize_address(&self.recipient)
    }

    /// The envelope recipient exactly as received.
    #[must_use]
    pub fn raw_recipient(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.recipient)
    }

    /// Additional ESMTP arguments to RCPT TO, empty if none were sent.
    #[must_use]
    pub fn esmtp_args(&self) -> Vec<Cow<str>> {
        split_esmtp_args(self.esmtp_args.as_ref())
    }
}

impl Parsable for Recipient {
    const CODE: u8 = Self::CODE;

    fn parse(mut buffer: BytesMut) -> Result<Self, ProtocolError> {
        let Some(recipient) = buffer.delimited(0) else {
            return Err(InvalidData::new(
                "Null-byte missing in recipient packet to delimit the recipient",
                buffer,
            )
            .into());
        };

        let esmtp_args = if buffer.is_empty() { None } else { Some(buffer) };

        Ok(Self {
            recipient,
            esmtp_args,
        })
    }
}
