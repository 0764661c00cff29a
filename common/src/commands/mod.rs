//! The commands an MTA sends to report the SMTP conversation.
//!
//! Each struct owns the payload bytes of one command code and exposes
//! typed accessors. Parsing lives with the type; dispatch over the
//! command codes lives in [`crate::decoding`].

mod body;
mod connect;
mod control;
mod header;
mod helo;
mod macros;
mod mail;
mod recipient;
mod unknown;

pub use self::body::{Body, EndOfBody};
pub use self::connect::{Connect, Family};
pub use self::control::{Abort, Quit, QuitNc};
pub use self::header::{EndOfHeader, Header, HeaderMap};
pub use self::helo::Helo;
pub use self::macros::Macro;
pub use self::mail::{Data, Mail};
pub use self::recipient::Recipient;
pub use self::unknown::Unknown;
