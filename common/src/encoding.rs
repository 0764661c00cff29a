//! Writing of responses 'to the wire'

use bytes::BytesMut;
use enum_dispatch::enum_dispatch;

use super::actions::{Accept, Action, Continue, Discard, Reject, Replycode, Skip, Tempfail};
use super::modifications::body::ReplaceBody;
use super::modifications::headers::{AddHeader, ChangeHeader, InsertHeader};
use super::modifications::progress::Progress;
use super::modifications::quarantine::Quarantine;
use super::modifications::recipients::{AddRecipient, AddRecipientExt, DeleteRecipient};
use super::modifications::sender::ChangeFrom;
use super::modifications::ModificationAction;
use super::optneg::OptNeg;

/// Write something 'to the wire'.
///
/// Implementors serialize their payload into a buffer; the framing
/// codec prepends the length and the code byte.
#[enum_dispatch(ServerMessage)]
#[enum_dispatch(Action)]
#[enum_dispatch(ModificationAction)]
pub trait Writable {
    /// Write the payload of self to the buffer
    fn write(&self, buffer: &mut BytesMut);

    /// Byte-length that would be written if [`Self::write`] is called
    fn len(&self) -> usize;

    /// The (unique) response code of this item
    fn code(&self) -> u8;

    /// Whether a call to [`Self::write`] would write something
    fn is_empty(&self) -> bool;
}

/// Everything a milter server may send back to the MTA.
#[enum_dispatch]
#[derive(Debug)]
pub enum ServerMessage {
    /// The option negotiation reply
    OptNeg(OptNeg),
    /// A verdict to the current command
    Action(Action),
    /// A message modification requested at end-of-body
    Modification(ModificationAction),
}
