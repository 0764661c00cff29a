//! Add or delete envelope recipients
//!
//! These change the envelope only; the To header is left untouched.

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};

use crate::encoding::Writable;

/// Add a recipient to the envelope
#[doc(alias = "SMFIR_ADDRCPT")]
#[derive(Debug, Clone)]
pub struct AddRecipient {
    recipient: BytesMut,
}

impl AddRecipient {
    const CODE: u8 = b'+';

    /// Add the specified recipient
    #[must_use]
    pub fn new(recipient: &[u8]) -> Self {
        Self {
            recipient: BytesMut::from_iter(recipient),
        }
    }

    /// The recipient to add
    #[must_use]
    pub fn recipient(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.recipient)
    }
}

impl Writable for AddRecipient {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(&self.recipient);
        buffer.put_u8(0);
    }

    fn len(&self) -> usize {
        self.recipient.len() + 1
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        false
    }
}

/// Add a recipient to the envelope, with ESMTP arguments
#[doc(alias = "SMFIR_ADDRCPT_PAR")]
#[derive(Debug, Clone)]
pub struct AddRecipientExt {
    recipient: BytesMut,
    args: BytesMut,
}

impl AddRecipientExt {
    const CODE: u8 = b'2';

    /// Add the specified recipient with ESMTP `args` such as
    /// `NOTIFY=SUCCESS`
    #[must_use]
    pub fn new(recipient: &[u8], args: &[u8]) -> Self {
        Self {
            recipient: BytesMut::from_iter(recipient),
            args: BytesMut::from_iter(args),
        }
    }

    /// The recipient to add
    #[must_use]
    pub fn recipient(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.recipient)
    }

    /// The ESMTP arguments to attach
    #[must_use]
    pub fn args(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.args)
    }
}

impl Writable for AddRecipientExt {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(&self.recipient);
        buffer.put_u8(0);
        buffer.extend_from_slice(&self.args);
        buffer.put_u8(0);
    }

    fn len(&self) -> usize {
        self.recipient.len() + 1 + self.args.len() + 1
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        false
    }
}

/// Delete a recipient from the envelope
#[doc(alias = "SMFIR_DELRCPT")]
#[derive(Debug, Clone)]
pub struct DeleteRecipient {
    recipient: BytesMut,
}

impl DeleteRecipient {
    const CODE: u8 = b'-';

    /// Delete the specified recipient
    #[must_use]
    pub fn new(recipient: &[u8]) -> Self {
        Self {
            recipient: BytesMut::from_iter(recipient),
        }
    }

    /// The (exact) recipient to be deleted
    #[must_use]
    pub fn recipient(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.recipient)
    }
}

impl Writable for DeleteRecipient {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(&self.recipient);
        buffer.put_u8(0);
    }

    fn len(&self) -> usize {
        self.recipient.len() + 1
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        false
    }
}
