//! Carefully put this mail in a box and leave it

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};

use crate::encoding::Writable;

/// Quarantine the message into a holding pool defined by the MTA.
///
/// First implemented in Sendmail 8.13; offered to the milter by the
/// quarantine bit in the negotiated actions.
#[doc(alias = "SMFIR_QUARANTINE")]
#[derive(Debug, Clone)]
pub struct Quarantine {
    reason: BytesMut,
}

impl Quarantine {
    const CODE: u8 = b'q';

    /// Quarantine with the given reason
    #[must_use]
    pub fn new(reason: &[u8]) -> Self {
        Self {
            reason: BytesMut::from_iter(reason),
        }
    }

    /// The reason the message was put on hold
    #[must_use]
    pub fn reason(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.reason)
    }
}

impl Writable for Quarantine {
    fn write(&self, buffer: &mut BytesMut) {
        buffer.extend_from_slice(&self.reason);
        buffer.put_u8(0);
    }

    fn len(&self) -> usize {
        self.reason.len() + 1
    }

    fn code(&self) -> u8 {
        Self::CODE
    }

    fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn quarantine_payload() {
        let mut buffer = BytesMut::new();
        let quarantine = Quarantine::new(b"looks forged");

        quarantine.write(&mut buffer);

        assert_eq!(&buffer[..], b"looks forged\0");
        assert_eq!(b'q', quarantine.code());
    }
}
