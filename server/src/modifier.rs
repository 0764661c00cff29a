use std::collections::HashMap;

use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite, SinkExt};
use thiserror::Error;

use asynchronous_codec::Framed;
use milterd_common::{
    commands::HeaderMap,
    encoding::ServerMessage,
    modifications::{
        body::ReplaceBody,
        headers::{AddHeader, ChangeHeader, InsertHeader},
        progress::Progress,
        quarantine::Quarantine,
        recipients::{AddRecipient, AddRecipientExt, DeleteRecipient},
        sender::ChangeFrom,
    },
    optneg::Capability,
    ProtocolError,
};

use crate::codec::MilterCodec;

/// Raised when a [`Modifier`] method cannot be honored.
#[derive(Debug, Error)]
pub enum ModifierError {
    /// The corresponding action bit was not declared at session start.
    /// Nothing was written to the MTA.
    #[error("modification requires the action bit {0:?} which was not negotiated")]
    NotNegotiated(Capability),

    /// A mutation was requested outside the end-of-body callback.
    #[error("modifications may only be requested at end-of-body")]
    WrongStage,

    /// Writing the modification packet to the MTA failed.
    #[error(transparent)]
    Transport(#[from] ProtocolError),
}

/// Where the session currently is, deciding what the modifier permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModifierScope {
    /// Any event callback before end-of-body
    Event,
    /// The end-of-body callback, modifications allowed
    EndOfBody,
}

#[async_trait]
pub(crate) trait PacketSink: Send {
    async fn send_message(&mut self, message: ServerMessage) -> Result<(), ProtocolError>;
}

#[async_trait]
impl<RW> PacketSink for Framed<RW, MilterCodec>
where
    RW: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_message(&mut self, message: ServerMessage) -> Result<(), ProtocolError> {
        self.send(&message).await
    }
}

/// The capability handed to every filter callback.
///
/// A `Modifier` is only valid while the callback that received it runs;
/// it borrows the session and cannot be stored. It always offers read
/// access to the macros the MTA defined for this connection; its
/// mutation methods write modification packets and only work from
/// within [`Milter::end_of_body`](crate::Milter::end_of_body), ahead of
/// the verdict the callback returns.
///
/// Every mutation is checked against the action bits declared by the
/// filter factory; requesting an undeclared modification fails with
/// [`ModifierError::NotNegotiated`] without touching the wire.
pub struct Modifier<'a> {
    sink: &'a mut dyn PacketSink,
    macros: &'a HashMap<String, String>,
    headers: &'a HeaderMap,
    actions: Capability,
    scope: ModifierScope,
    max_data_size: usize,
    session_id: &'a str,
    message_id: &'a str,
}

impl<'a> Modifier<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        sink: &'a mut dyn PacketSink,
        macros: &'a HashMap<String, String>,
        headers: &'a HeaderMap,
        actions: Capability,
        scope: ModifierScope,
        max_data_size: usize,
        session_id: &'a str,
        message_id: &'a str,
    ) -> Self {
        Self {
            sink,
            macros,
            headers,
            actions,
            scope,
            max_data_size,
            session_id,
            message_id,
        }
    }

    /// The value of an MTA macro such as `{auth_authen}` or `j`.
    #[must_use]
    pub fn macro_value(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(String::as_str)
    }

    /// All macros the MTA has defined on this connection so far.
    #[must_use]
    pub fn macros(&self) -> &HashMap<String, String> {
        self.macros
    }

    /// The headers received for the message in flight so far.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.headers
    }

    /// The identifier of this connection, stable across its messages.
    #[must_use]
    pub fn session_id(&self) -> &str {
        self.session_id
    }

    /// The identifier of the message in flight, empty outside one.
    #[must_use]
    pub fn message_id(&self) -> &str {
        self.message_id
    }

    /// Add a recipient to the envelope.
    pub async fn add_recipient(&mut self, recipient: &[u8]) -> Result<(), ModifierError> {
        self.permitted(Capability::ADD_RECIPIENT)?;
        self.send(AddRecipient::new(recipient).into()).await
    }

    /// Add a recipient to the envelope, with ESMTP arguments.
    pub async fn add_recipient_with_args(
        &mut self,
        recipient: &[u8],
        args: &[u8],
    ) -> Result<(), ModifierError> {
        self.permitted(Capability::ADD_RECIPIENT_EXT)?;
        self.send(AddRecipientExt::new(recipient, args).into()).await
    }

    /// Delete a recipient from the envelope.
    pub async fn delete_recipient(&mut self, recipient: &[u8]) -> Result<(), ModifierError> {
        self.permitted(Capability::DELETE_RECIPIENT)?;
        self.send(DeleteRecipient::new(recipient).into()).await
    }

    /// Replace the whole message body.
    ///
    /// Split into chunks of at most the negotiated maximum data size;
    /// repeated calls append further replacement data.
    pub async fn replace_body(&mut self, body: &[u8]) -> Result<(), ModifierError> {
        self.permitted(Capability::CHANGE_BODY)?;
        for chunk in body.chunks(self.max_data_size.max(1)) {
            self.send(ReplaceBody::new(chunk).into()).await?;
        }
        Ok(())
    }

    /// Append a header to the message.
    pub async fn add_header(&mut self, name: &[u8], value: &[u8]) -> Result<(), ModifierError> {
        self.permitted(Capability::ADD_HEADER)?;
        self.send(AddHeader::new(name, value).into()).await
    }

    /// Change the `index`th (1-based, per name) header called `name`.
    /// An empty value deletes that occurrence.
    pub async fn change_header(
        &mut self,
        index: u32,
        name: &[u8],
        value: &[u8],
    ) -> Result<(), ModifierError> {
        self.permitted(Capability::CHANGE_HEADER)?;
        self.send(ChangeHeader::new(index, name, value).into()).await
    }

    /// Insert a header before list position `index`.
    pub async fn insert_header(
        &mut self,
        index: u32,
        name: &[u8],
        value: &[u8],
    ) -> Result<(), ModifierError> {
        self.permitted(Capability::CHANGE_HEADER)?;
        self.send(InsertHeader::new(index, name, value).into()).await
    }

    /// Replace the envelope sender, optionally with ESMTP arguments.
    pub async fn change_from(
        &mut self,
        sender: &[u8],
        args: Option<&[u8]>,
    ) -> Result<(), ModifierError> {
        self.permitted(Capability::CHANGE_FROM)?;
        let change = match args {
            Some(args) => ChangeFrom::with_args(sender, args),
            None => ChangeFrom::new(sender),
        };
        self.send(change.into()).await
    }

    /// Quarantine the message into the MTA's holding pool.
    pub async fn quarantine(&mut self, reason: &[u8]) -> Result<(), ModifierError> {
        self.permitted(Capability::QUARANTINE)?;
        self.send(Quarantine::new(reason).into()).await
    }

    /// Tell the MTA processing is still ongoing.
    ///
    /// Resets the MTA read timeout while end-of-body work takes longer
    /// than usual. Needs no negotiated action bit, but like every other
    /// mutation it is only valid at end-of-body.
    pub async fn progress(&mut self) -> Result<(), ModifierError> {
        self.in_end_of_body()?;
        self.send(Progress.into()).await
    }

    fn permitted(&self, needed: Capability) -> Result<(), ModifierError> {
        self.in_end_of_body()?;
        if !self.actions.contains(needed) {
            return Err(ModifierError::NotNegotiated(needed));
        }
        Ok(())
    }

    fn in_end_of_body(&self) -> Result<(), ModifierError> {
        if self.scope != ModifierScope::EndOfBody {
            return Err(ModifierError::WrongStage);
        }
        Ok(())
    }

    async fn send(
        &mut self,
        modification: milterd_common::modifications::ModificationAction,
    ) -> Result<(), ModifierError> {
        self.sink
            .send_message(ServerMessage::Modification(modification))
            .await?;
        Ok(())
    }
}
