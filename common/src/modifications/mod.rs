//! Message modifications a filter may request.
//!
//! Only at end-of-body may a filter respond with change requests; each
//! request is one packet sent ahead of the terminal verdict. Every
//! request type is gated by a [`Capability`](crate::optneg::Capability)
//! bit agreed on during option negotiation.

pub mod body;
pub mod headers;
pub mod progress;
pub mod quarantine;
pub mod recipients;
pub mod sender;

use bytes::BytesMut;
use enum_dispatch::enum_dispatch;

use crate::encoding::Writable;

use body::ReplaceBody;
use headers::{AddHeader, ChangeHeader, InsertHeader};
use progress::Progress;
use quarantine::Quarantine;
use recipients::{AddRecipient, AddRecipientExt, DeleteRecipient};
use sender::ChangeFrom;

/// The container of possible milter modification requests
#[enum_dispatch]
#[derive(Debug, Clone, strum::Display)]
pub enum ModificationAction {
    /// Add a recipient to the envelope
    AddRecipient,
    /// Add a recipient including ESMTP arguments
    AddRecipientExt,
    /// Delete a recipient from the envelope
    DeleteRecipient,
    /// Replace the mail body
    ReplaceBody,
    /// Append an arbitrary header
    AddHeader,
    /// Change or delete an existing header
    ChangeHeader,
    /// Insert a header at a specific position
    InsertHeader,
    /// Change the envelope sender
    ChangeFrom,
    /// Quarantine this mail
    Quarantine,
    /// No modification, just a keep-alive during long processing
    Progress,
}
