use std::borrow::Cow;
use std::net::IpAddr;

use bytes::BytesMut;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::decoding::Parsable;
use crate::ProtocolError;
use crate::{InvalidData, NotEnoughData};
use milterd_utils::ByteParsing;

/// The transport family of the SMTP client connection
#[derive(Copy, Clone, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Family {
    /// Unknown or unavailable connection information
    Unknown = b'U',
    /// A local (unix domain) socket
    Unix = b'L',
    /// TCP over IPv4
    Inet = b'4',
    /// TCP over IPv6
    Inet6 = b'6',
}

impl Family {
    /// A short lowercase label, as handed to classic milter callbacks.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Family::Unknown => "unknown",
            Family::Unix => "unix",
            Family::Inet => "tcp4",
            Family::Inet6 => "tcp6",
        }
    }

    fn parse(byte: u8) -> Result<Self, ProtocolError> {
        Family::try_from(byte).map_err(|_| {
            InvalidData {
                msg: "Received unknown protocol family for connection info",
                offending_bytes: BytesMut::from_iter(&[byte]),
            }
            .into()
        })
    }
}

/// Connect information about the smtp client
#[doc(alias = "SMFIC_CONNECT")]
#[derive(Clone, PartialEq, Debug)]
pub struct Connect {
    hostname: BytesMut,
    /// The transport family of the reported connection
    pub family: Family,
    /// On an IP connection, the remote port
    pub port: Option<u16>,
    address: BytesMut,
}

impl Connect {
    pub(crate) const CODE: u8 = b'C';

    /// The resolved hostname of the smtp client.
    #[must_use]
    pub fn hostname(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.hostname)
    }

    /// The address of the smtp client, exactly as reported.
    ///
    /// Depending on the family this is an IP address (an IPv6 address
    /// may or may not carry an `IPv6:` prefix; it is kept verbatim) or
    /// a socket path.
    #[must_use]
    pub fn address(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.address)
    }

    /// Best-effort parse of [`Self::address`] as an IP address.
    ///
    /// Accepts both the plain form and the `IPv6:`-prefixed form some
    /// MTAs send. `None` for unix or unknown families, or when the
    /// address does not parse.
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        let address = self.address();
        if let Ok(ip) = address.parse() {
            return Some(ip);
        }
        address.strip_prefix("IPv6:")?.parse().ok()
    }
}

impl Parsable for Connect {
    const CODE: u8 = Self::CODE;

    fn parse(mut buffer: BytesMut) -> Result<Self, ProtocolError> {
        let Some(hostname) = buffer.delimited(0) else {
            return Err(InvalidData::new(
                "Null-byte missing in connect packet to delimit hostname",
                buffer,
            )
            .into());
        };

        let Some(family) = buffer.safe_get_u8() else {
            return Err(NotEnoughData::new("Connect", "family missing", 1, 0, buffer).into());
        };
        let family = Family::parse(family)?;

        let port = match family {
            Family::Inet | Family::Inet6 => {
                let Some(port) = buffer.safe_get_u16() else {
                    return Err(NotEnoughData::new(
                        "Connect",
                        "port missing",
                        2,
                        buffer.len(),
                        buffer,
                    )
                    .into());
                };
                Some(port)
            }
            _ => None,
        };

        // The address is nul terminated as well, but be lenient if the
        // terminator is missing.
        let address = match buffer.last() {
            Some(b'\0') => buffer.split_to(buffer.len() - 1),
            _ => buffer,
        };

        Ok(Connect {
            hostname,
            family,
            port,
            address,
        })
    }
}
