use bytes::BytesMut;

use crate::decoding::Parsable;
use crate::{NotEnoughData, ProtocolError};
use milterd_utils::ByteParsing;

/// Macro definitions sent by the MTA for a particular SMTP stage.
///
/// The stage is the command code the macros belong to (`C` for connect
/// macros, `M` for mail macros and so on). An empty packet is legal and
/// defines nothing.
#[doc(alias = "SMFIC_MACRO")]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Macro {
    /// The command code of the stage these macros belong to, absent for
    /// an entirely empty packet.
    pub stage: Option<u8>,
    pairs: Vec<(BytesMut, BytesMut)>,
}

impl Macro {
    pub(crate) const CODE: u8 = b'D';

    /// An iterator over the defined macros in (name, value) format.
    pub fn pairs(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.pairs.iter().map(|(n, v)| (&n[..], &v[..]))
    }

    /// Whether this packet defines any macro at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Parsable for Macro {
    const CODE: u8 = Self::CODE;

    fn parse(mut buffer: BytesMut) -> Result<Self, ProtocolError> {
        let Some(stage) = buffer.safe_get_u8() else {
            // No stage selector, no data. Legal, defines nothing.
            return Ok(Self::default());
        };

        let field_count = bytecount::count(&buffer, 0);
        let mut pairs = Vec::with_capacity(field_count / 2);
        while !buffer.is_empty() {
            let Some(name) = buffer.delimited(0) else {
                return Err(NotEnoughData::new(
                    "Macro",
                    "missing null byte delimiter after name",
                    1,
                    0,
                    buffer,
                )
                .into());
            };

            let Some(value) = buffer.delimited(0) else {
                return Err(NotEnoughData::new(
                    "Macro",
                    "missing null byte delimiter after value",
                    1,
                    0,
                    buffer,
                )
                .into());
            };

            pairs.push((name, value));
        }

        Ok(Self {
            stage: Some(stage),
            pairs,
        })
    }
}
