use std::fmt;
use std::io;

use async_trait::async_trait;
use thiserror::Error;

use milterd_common::{
    actions::{Action, Continue},
    commands::{Body, Connect, Header, HeaderMap, Helo, Mail, Recipient, Unknown},
    ProtocolError,
};

use crate::modifier::Modifier;

/// The filter callback contract a host application implements.
///
/// One instance serves exactly one MTA connection; the factory handed
/// to [`Server`](crate::Server) produces a fresh instance per accept,
/// so implementations can keep per-connection state in plain fields.
/// All methods default to answering [`Continue`], implement only the
/// events the filter cares about.
///
/// Every event callback receives a [`Modifier`]. At all stages it gives
/// read access to the MTA macros; its mutation methods only work from
/// within [`Milter::end_of_body`].
#[async_trait]
pub trait Milter: Send {
    /// The error type of this implementation.
    ///
    /// Returning an error terminates the session; it is logged but not
    /// reported to the MTA beyond closing the connection.
    type Error: fmt::Debug + Send;

    /// A new connection has been accepted, nothing was received yet.
    async fn new_session(&mut self, _session_id: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// The connection ends, regardless of how.
    ///
    /// Called exactly once, also when the session failed.
    #[doc(alias = "xxfi_close")]
    async fn end_session(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// A new message starts, before [`Milter::mail_from`] is invoked.
    async fn new_message(&mut self, _message_id: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Per-message state should be dropped.
    ///
    /// Called when the MTA aborts the message in flight and after every
    /// completed message, before the next one starts.
    #[doc(alias = "xxfi_abort")]
    async fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Connection information about the smtp client.
    #[doc(alias = "SMFIC_CONNECT")]
    #[doc(alias = "xxfi_connect")]
    async fn connect(
        &mut self,
        _connect: Connect,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        Ok(Continue.into())
    }

    /// The HELO/EHLO name sent by the smtp client.
    #[doc(alias = "SMFIC_HELO")]
    #[doc(alias = "xxfi_helo")]
    async fn helo(
        &mut self,
        _helo: Helo,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        Ok(Continue.into())
    }

    /// The envelope sender of a new message.
    ///
    /// The address arrives trimmed of `<>` and lowercased via
    /// [`Mail::sender`].
    #[doc(alias = "SMFIC_MAIL")]
    #[doc(alias = "xxfi_envfrom")]
    async fn mail_from(
        &mut self,
        _mail: Mail,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        Ok(Continue.into())
    }

    /// One envelope recipient of the current message.
    #[doc(alias = "SMFIC_RCPT")]
    #[doc(alias = "xxfi_envrcpt")]
    async fn rcpt_to(
        &mut self,
        _recipient: Recipient,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        Ok(Continue.into())
    }

    /// A single header, in transmission order.
    ///
    /// Header names are not unique and may be received multiple times.
    #[doc(alias = "SMFIC_HEADER")]
    #[doc(alias = "xxfi_header")]
    async fn header(
        &mut self,
        _header: Header,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        Ok(Continue.into())
    }

    /// All headers have been sent; `headers` is the accumulated map.
    #[doc(alias = "SMFIC_EOH")]
    #[doc(alias = "xxfi_eoh")]
    async fn headers(
        &mut self,
        _headers: &HeaderMap,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        Ok(Continue.into())
    }

    /// One chunk of the message body.
    ///
    /// May be called multiple times until the whole body has been
    /// transmitted; answer [`Skip`](milterd_common::actions::Skip) to
    /// stop receiving further chunks.
    #[doc(alias = "SMFIC_BODY")]
    #[doc(alias = "xxfi_body")]
    async fn body_chunk(
        &mut self,
        _body: Body,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        Ok(Continue.into())
    }

    /// The whole message has been transmitted.
    ///
    /// This is the only stage at which the mutation methods of the
    /// [`Modifier`] may be used; the verdict returned here decides the
    /// fate of the message.
    #[doc(alias = "SMFIC_BODYEOB")]
    #[doc(alias = "xxfi_eom")]
    async fn end_of_body(
        &mut self,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        Ok(Continue.into())
    }

    /// A command without a typed representation was received.
    ///
    /// Only delivered when the declared protocol mask does not exclude
    /// unknown commands.
    #[doc(alias = "SMFIC_UNKNOWN")]
    #[doc(alias = "xxfi_unknown")]
    async fn unknown(
        &mut self,
        _command: Unknown,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        Ok(Continue.into())
    }
}

/// The main error for this crate encapsulating the different failure
/// cases of a session.
#[derive(Debug, Error)]
pub enum Error<ImplError> {
    /// The underlying transport broke. Check the stream.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The peer violated the wire protocol or sent data this crate
    /// could not interpret.
    #[error(transparent)]
    Codec(#[from] ProtocolError),

    /// The milter trait implementation returned an error.
    #[error("filter implementation failed: {0:?}")]
    Filter(ImplError),
}
