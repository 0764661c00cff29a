//! Verdicts a filter returns for a command.
//!
//! Each verdict maps to exactly one response packet. `Continue` may be
//! suppressed entirely when the corresponding no-reply protocol bit was
//! negotiated; every other verdict is always written.

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};
use enum_dispatch::enum_dispatch;
use itertools::Itertools;

use crate::encoding::Writable;

/// The closed set of verdicts a filter can answer with.
///
/// See the contained variants for more.
#[allow(missing_docs)]
#[enum_dispatch]
#[derive(Debug, Clone)]
pub enum Action {
    Continue,
    Accept,
    Reject,
    Tempfail,
    Discard,
    Skip,
    Replycode,
}

macro_rules! empty_action {
    ($(#[$doc:meta])* $name:ident, $code:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default)]
        pub struct $name;

        impl $name {
            const CODE: u8 = $code;
        }

        impl Writable for $name {
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
    };
}

empty_action!(
    /// Proceed to the next event of the SMTP transaction
    #[doc(alias = "SMFIR_CONTINUE")]
    Continue,
    b'c'
);

empty_action!(
    /// Accept the whole message, short-circuiting all further events
    #[doc(alias = "SMFIR_ACCEPT")]
    Accept,
    b'a'
);

empty_action!(
    /// Reject the message or connection with a permanent (5xx) failure
    #[doc(alias = "SMFIR_REJECT")]
    Reject,
    b'r'
);

empty_action!(
    /// Fail the message or connection temporarily (4xx)
    #[doc(alias = "SMFIR_TEMPFAIL")]
    Tempfail,
    b't'
);

empty_action!(
    /// Accept the message towards the smtp client, then silently drop it
    #[doc(alias = "SMFIR_DISCARD")]
    Discard,
    b'd'
);

empty_action!(
    /// Stop sending further body chunks, the filter has seen enough
    #[doc(alias = "SMFIR_SKIP")]
    Skip,
    b's'
);

/// Answer with a custom SMTP reply line.
///
/// Carries the three-digit SMTP code, the enhanced status code and a
/// text, written as one space-separated, null terminated string.
#[doc(alias = "SMFIR_REPLYCODE")]
#[derive(Debug, Clone)]
pub struct Replycode {
    code: u16,
    enhanced: String,
    text: BytesMut,
}

impl Replycode {
    const CODE: u8 = b'y';

    /// Create a reply with an SMTP `code` (4xx or 5xx), an enhanced
    /// status code such as `5.7.1` and a free-form text.
    #[must_use]
    pub fn new<E: Into<String>>(code: u16, enhanced: E, text: &str) -> Self {
        Self {
            code,
            enhanced: enhanced.into(),
            text: BytesMut::from(text.as_bytes()),
        }
    }

    /// The three-digit SMTP code
    #[must_use]
    pub fn smtp_code(&self) -> u16 {
        self.code
    }

    /// The enhanced status code
    #[must_use]
    pub fn enhanced_code(&self) -> &str {
        &self.enhanced
    }

    /// The reply text
    #[must_use]
    pub fn text(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.text)
    }

    fn reply_line(&self) -> String {
        [
            self.code.to_string(),
            self.enhanced.clone(),
            String::from_utf8_lossy(&self.text).into_owned(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .join(" ")
    }
}

impl Writable for Replycode {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.put_slice(self.reply_line().as_bytes());
        buffer.put_u8(0);
    }

    fn len(&self) -> usize {
        self.reply_line().len() + 1
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        false
    }
}
