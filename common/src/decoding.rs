//! Parsing of raw [`Packet`]s into typed client commands

use bytes::BytesMut;

use crate::commands::{Abort, Quit, QuitNc};
use crate::commands::{Body, Connect, EndOfBody, EndOfHeader, Header, Helo, Macro};
use crate::commands::{Data, Mail, Recipient, Unknown};
use crate::optneg::OptNeg;
use crate::{Packet, ProtocolError};

/// Parse something 'from the wire'.
pub(crate) trait Parsable: Sized {
    /// The unique command code for this item
    const CODE: u8;

    /// Parse a `Self` from the given payload buffer.
    ///
    /// # Errors
    /// This can fail to parse, returning a [`ProtocolError`].
    fn parse(buffer: BytesMut) -> Result<Self, ProtocolError>;
}

macro_rules! client_commands {
    ($($variant:ident),+$(,)?) => {
        /// Everything the MTA may send to a milter, one variant per
        /// command code. A packet with an unrecognized code parses to
        /// [`Unknown`] so the session can decide whether that is legal.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, strum::Display)]
        pub enum ClientCommand {
            $($variant($variant),)+
            Unknown(Unknown),
        }

        impl ClientCommand {
            /// Parse a raw packet into typed command data.
            ///
            /// # Errors
            /// Fails with a [`ProtocolError`] if the payload does not
            /// match the layout required by the packet's command code.
            pub fn parse(packet: Packet) -> Result<Self, ProtocolError> {
                match packet.code {
                    $($variant::CODE => Ok($variant::parse(packet.payload)?.into()),)+
                    _ => Ok(Unknown::from(packet).into()),
                }
            }
        }

        $(impl From<$variant> for ClientCommand {
            fn from(value: $variant) -> Self {
                Self::$variant(value)
            }
        })+

        impl From<Unknown> for ClientCommand {
            fn from(value: Unknown) -> Self {
                Self::Unknown(value)
            }
        }
    }
}

client_commands!(
    // Milter control
    OptNeg,
    Macro,
    Abort,
    Quit,
    QuitNc,
    // SMTP opening
    Connect,
    Helo,
    // Envelope and header
    Mail,
    Recipient,
    Header,
    EndOfHeader,
    // Body
    Data,
    Body,
    EndOfBody,
);
