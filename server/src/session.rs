use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use asynchronous_codec::Framed;
use bytes::BytesMut;
use futures::{AsyncRead, AsyncWrite, SinkExt, StreamExt};
use rand::Rng;
use tracing::{debug, error, info, warn};

use milterd_common::{
    actions::{Action, Continue, Tempfail},
    commands::{HeaderMap, Macro},
    decoding::ClientCommand,
    encoding::ServerMessage,
    optneg::{Capability, OptNeg, Protocol},
    InvalidData, Packet, ProtocolError,
};

use crate::codec::MilterCodec;
use crate::milter::{Error, Milter};
use crate::modifier::{Modifier, ModifierScope};

// Consonants only, so a generated id never spells anything unfortunate.
const ID_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxyzBCDFGHJKLMNPQRSTVWXYZ";
const ID_LENGTH: usize = 12;

fn random_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Where in the milter conversation a session currently is.
///
/// Commands only advance the machine; protocol errors send it straight
/// to `Done` by terminating the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for option negotiation
    Handshake,
    /// Negotiated, at or before the SMTP opening
    Connected,
    /// Inside a message envelope or its headers
    Envelope,
    /// Receiving body chunks
    Body,
    /// The conversation ended
    Done,
}

/// What the command loop should do after a command was handled.
enum Flow {
    Continue,
    Close,
}

/// Per-connection state: the framed stream, the filter instance and
/// everything the milter conversation accumulates.
pub(crate) struct Session<M, RW> {
    framed: Framed<RW, MilterCodec>,
    frame_limit: Arc<AtomicUsize>,
    filter: M,
    actions: Capability,
    protocol: Protocol,
    state: State,
    session_id: String,
    message_id: String,
    headers: HeaderMap,
    macros: HashMap<String, String>,
    max_data_size: usize,
}

impl<M, RW> Session<M, RW>
where
    M: Milter,
    RW: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub(crate) fn new(stream: RW, filter: M, actions: Capability, protocol: Protocol) -> Self {
        let codec = MilterCodec::new(Protocol::DEFAULT_MAX_DATA_SIZE + 1);
        let frame_limit = codec.limit_handle();

        Self {
            framed: Framed::new(stream, codec),
            frame_limit,
            filter,
            actions,
            protocol,
            state: State::Handshake,
            session_id: random_id(),
            message_id: String::new(),
            headers: HeaderMap::new(),
            macros: HashMap::new(),
            max_data_size: Protocol::DEFAULT_MAX_DATA_SIZE,
        }
    }

    /// Drive the whole milter conversation on this connection.
    ///
    /// All errors are handled here; the connection is closed on return.
    pub(crate) async fn run(mut self) {
        debug!(session = %self.session_id, "milter session starting");

        let outcome = self.serve().await;

        // The filter learns about the end of the session no matter how
        // it came about.
        if let Err(err) = self.filter.end_session().await {
            error!(session = %self.session_id, ?err, "filter failed ending the session");
        }

        match outcome {
            Ok(()) => debug!(session = %self.session_id, "milter session closed"),
            Err(Error::Io(err)) | Err(Error::Codec(ProtocolError::Io(err))) => {
                if err.kind() == io::ErrorKind::UnexpectedEof {
                    info!(session = %self.session_id, "connection lost mid packet");
                } else {
                    error!(session = %self.session_id, %err, "stream error, closing session");
                }
            }
            Err(Error::Codec(err)) => {
                error!(session = %self.session_id, %err, "protocol error, closing session");
            }
            Err(Error::Filter(err)) => {
                error!(session = %self.session_id, ?err, "filter error, closing session");
            }
        }
    }

    async fn serve(&mut self) -> Result<(), Error<M::Error>> {
        self.filter
            .new_session(&self.session_id)
            .await
            .map_err(Error::Filter)?;

        while let Some(packet) = self.framed.next().await {
            match self.dispatch(packet?).await? {
                Flow::Continue => {}
                Flow::Close => return Ok(()),
            }
        }

        // EOF between packets. Postfix regularly hangs up without quit.
        debug!(session = %self.session_id, "stream ended without quit");
        Ok(())
    }

    async fn dispatch(&mut self, packet: Packet) -> Result<Flow, Error<M::Error>> {
        self.check_ordering(&packet).await?;
        self.advance_state(packet.code);

        let command = match ClientCommand::parse(packet) {
            Ok(command) => command,
            Err(err) => {
                // A malformed payload fails the command, not the
                // session: answer tempfail and keep reading.
                warn!(session = %self.session_id, %err, "malformed command payload");
                self.send_action(Tempfail.into()).await?;
                return Ok(Flow::Continue);
            }
        };
        debug!(session = %self.session_id, %command, "received command");

        match command {
            ClientCommand::OptNeg(offer) => self.on_optneg(offer).await?,
            ClientCommand::Macro(definitions) => self.on_macro(&definitions),
            ClientCommand::Abort(_) => self.on_abort().await?,
            ClientCommand::Quit(_) => {
                debug!(session = %self.session_id, "quit");
                return Ok(Flow::Close);
            }
            ClientCommand::QuitNc(_) => {
                debug!(session = %self.session_id, "quit, client reuses the listener");
                return Ok(Flow::Close);
            }

            ClientCommand::Connect(connect) => {
                let verdict = {
                    let (filter, mut modifier) = self.event_parts(ModifierScope::Event);
                    filter
                        .connect(connect, &mut modifier)
                        .await
                        .map_err(Error::Filter)?
                };
                self.respond(verdict, Protocol::NR_CONNECT).await?;
            }
            ClientCommand::Helo(helo) => {
                let verdict = {
                    let (filter, mut modifier) = self.event_parts(ModifierScope::Event);
                    filter
                        .helo(helo, &mut modifier)
                        .await
                        .map_err(Error::Filter)?
                };
                self.respond(verdict, Protocol::NR_HELO).await?;
            }
            ClientCommand::Mail(mail) => {
                // A new message begins: fresh id, fresh header map.
                self.message_id = random_id();
                self.headers.clear();
                self.filter
                    .new_message(&self.message_id)
                    .await
                    .map_err(Error::Filter)?;

                let verdict = {
                    let (filter, mut modifier) = self.event_parts(ModifierScope::Event);
                    filter
                        .mail_from(mail, &mut modifier)
                        .await
                        .map_err(Error::Filter)?
                };
                self.respond(verdict, Protocol::NR_MAIL).await?;
            }
            ClientCommand::Recipient(recipient) => {
                let verdict = {
                    let (filter, mut modifier) = self.event_parts(ModifierScope::Event);
                    filter
                        .rcpt_to(recipient, &mut modifier)
                        .await
                        .map_err(Error::Filter)?
                };
                self.respond(verdict, Protocol::NR_RECIPIENT).await?;
            }
            ClientCommand::Data(_) => {
                // No filter event for DATA, but the MTA may wait for an
                // answer.
                self.respond(Continue.into(), Protocol::NR_DATA).await?;
            }
            ClientCommand::Header(header) => {
                self.headers.add(&header.name(), &header.value());
                let verdict = {
                    let (filter, mut modifier) = self.event_parts(ModifierScope::Event);
                    filter
                        .header(header, &mut modifier)
                        .await
                        .map_err(Error::Filter)?
                };
                self.respond(verdict, Protocol::NR_HEADER).await?;
            }
            ClientCommand::EndOfHeader(_) => {
                let verdict = {
                    let Self {
                        framed,
                        filter,
                        macros,
                        headers,
                        actions,
                        max_data_size,
                        session_id,
                        message_id,
                        ..
                    } = self;
                    let headers: &HeaderMap = headers;
                    let mut modifier = Modifier::new(
                        framed,
                        macros,
                        headers,
                        *actions,
                        ModifierScope::Event,
                        *max_data_size,
                        session_id,
                        message_id,
                    );
                    filter
                        .headers(headers, &mut modifier)
                        .await
                        .map_err(Error::Filter)?
                };
                self.respond(verdict, Protocol::NR_END_OF_HEADER).await?;
            }
            ClientCommand::Body(body) => {
                let verdict = {
                    let (filter, mut modifier) = self.event_parts(ModifierScope::Event);
                    filter
                        .body_chunk(body, &mut modifier)
                        .await
                        .map_err(Error::Filter)?
                };
                self.respond(verdict, Protocol::NR_BODY).await?;
            }
            ClientCommand::EndOfBody(_) => {
                let verdict = {
                    let (filter, mut modifier) = self.event_parts(ModifierScope::EndOfBody);
                    filter
                        .end_of_body(&mut modifier)
                        .await
                        .map_err(Error::Filter)?
                };
                // The verdict terminates the modification phase and is
                // never suppressed.
                self.send_action(verdict).await?;

                // Back to the pre-MAIL state for the next message.
                self.headers.clear();
                self.message_id.clear();
                self.filter.reset().await.map_err(Error::Filter)?;
            }
            ClientCommand::Unknown(unknown) => {
                if self.protocol.contains(Protocol::NO_UNKNOWN) {
                    let code = unknown.code;
                    self.send_action(Tempfail.into()).await?;
                    return Err(Error::Codec(
                        InvalidData::new(
                            "Received an unknown command the protocol mask excludes",
                            BytesMut::from_iter(&[code]),
                        )
                        .into(),
                    ));
                }
                let verdict = {
                    let (filter, mut modifier) = self.event_parts(ModifierScope::Event);
                    filter
                        .unknown(unknown, &mut modifier)
                        .await
                        .map_err(Error::Filter)?
                };
                self.respond(verdict, Protocol::NR_UNKNOWN).await?;
            }
        }

        Ok(Flow::Continue)
    }

    /// Enforce the handshake ordering: exactly one option negotiation
    /// per connection, before any SMTP event.
    async fn check_ordering(&mut self, packet: &Packet) -> Result<(), Error<M::Error>> {
        let fault = match (self.state, packet.code) {
            (State::Handshake, b'O') => None,
            // Control commands are fine at any time.
            (State::Handshake, b'D' | b'A' | b'Q' | b'K') => None,
            (State::Handshake, _) => Some("Received an smtp event before option negotiation"),
            (_, b'O') => Some("Received a second option negotiation"),
            _ => None,
        };

        let Some(msg) = fault else {
            return Ok(());
        };

        // Best effort tempfail, the MTA is out of sync with us anyway.
        let _ = self.send_action(Tempfail.into()).await;
        Err(Error::Codec(
            InvalidData::new(msg, BytesMut::from_iter(&[packet.code])).into(),
        ))
    }

    fn advance_state(&mut self, code: u8) {
        self.state = match code {
            b'O' | b'C' | b'H' => State::Connected,
            b'M' | b'R' | b'T' | b'L' | b'N' => State::Envelope,
            b'B' => State::Body,
            // End-of-body and abort return to the pre-MAIL state.
            b'E' | b'A' => State::Connected,
            b'Q' | b'K' => State::Done,
            // Macros and unknown commands do not move the machine.
            _ => self.state,
        };
    }

    async fn on_optneg(&mut self, offer: OptNeg) -> Result<(), ProtocolError> {
        debug!(
            session = %self.session_id,
            version = offer.version,
            actions = offer.actions.bits(),
            protocol = offer.protocol.bits(),
            "negotiating options"
        );

        // Honor the per-packet data ceiling the MTA advertised.
        self.max_data_size = offer.protocol.max_data_size();
        self.frame_limit
            .store(self.max_data_size + 1, Ordering::Relaxed);

        let reply = OptNeg::reply(self.actions, self.protocol);
        self.framed.send(&ServerMessage::OptNeg(reply)).await
    }

    fn on_macro(&mut self, definitions: &Macro) {
        let Some(stage) = definitions.stage else {
            // An empty macro packet is legal and defines nothing.
            return;
        };

        if definitions.is_empty() {
            warn!(
                session = %self.session_id,
                stage = %(stage as char),
                "macro definition with no data"
            );
            return;
        }

        for (name, value) in definitions.pairs() {
            self.macros.insert(
                String::from_utf8_lossy(name).into_owned(),
                String::from_utf8_lossy(value).into_owned(),
            );
        }
    }

    async fn on_abort(&mut self) -> Result<(), Error<M::Error>> {
        self.headers.clear();
        self.macros.clear();
        self.message_id.clear();
        self.filter.reset().await.map_err(Error::Filter)
    }

    /// Write the verdict packet unless the negotiated protocol mask
    /// says a Continue for this command needs no reply.
    async fn respond(&mut self, verdict: Action, no_reply: Protocol) -> Result<(), ProtocolError> {
        if matches!(verdict, Action::Continue(_)) && self.protocol.contains(no_reply) {
            return Ok(());
        }
        self.send_action(verdict).await
    }

    async fn send_action(&mut self, action: Action) -> Result<(), ProtocolError> {
        self.framed.send(&ServerMessage::Action(action)).await
    }

    /// Split the session into the filter and a modifier borrowing the
    /// rest, for the duration of one callback.
    fn event_parts(&mut self, scope: ModifierScope) -> (&mut M, Modifier<'_>) {
        let Self {
            framed,
            filter,
            macros,
            headers,
            actions,
            max_data_size,
            session_id,
            message_id,
            ..
        } = self;

        let modifier = Modifier::new(
            framed,
            macros,
            headers,
            *actions,
            scope,
            *max_data_size,
            session_id,
            message_id,
        );

        (filter, modifier)
    }
}
