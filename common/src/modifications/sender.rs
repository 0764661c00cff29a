//! Change the envelope sender

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};

use crate::encoding::Writable;

/// Replace the envelope sender (MAIL FROM) of the message.
///
/// Optionally carries ESMTP arguments for the new sender.
#[doc(alias = "SMFIR_CHGFROM")]
#[derive(Debug, Clone)]
pub struct ChangeFrom {
    sender: BytesMut,
    args: Option<BytesMut>,
}

impl ChangeFrom {
    const CODE: u8 = b'e';

    /// Change the envelope sender to `sender`
    #[must_use]
    pub fn new(sender: &[u8]) -> Self {
        Self {
            sender: BytesMut::from_iter(sender),
            args: None,
        }
    }

    /// Change the envelope sender, attaching ESMTP arguments
    #[must_use]
    pub fn with_args(sender: &[u8], args: &[u8]) -> Self {
        Self {
            sender: BytesMut::from_iter(sender),
            args: Some(BytesMut::from_iter(args)),
        }
    }

    /// The new envelope sender
    #[must_use]
    pub fn sender(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.sender)
    }
}

impl Writable for ChangeFrom {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(&self.sender);
        buffer.put_u8(0);
        if let Some(args) = &self.args {
            buffer.extend_from_slice(args);
            buffer.put_u8(0);
        }
    }

    fn len(&self) -> usize {
        self.sender.len() + 1 + self.args.as_ref().map_or(0, |args| args.len() + 1)
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        false
    }
}
