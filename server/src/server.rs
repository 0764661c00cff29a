use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite, FutureExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use milterd_common::optneg::{Capability, Protocol};

use crate::milter::Milter;
use crate::session::Session;

/// A normalized filter panic, as delivered to fault handlers.
#[derive(Debug, Clone, Error)]
#[error("milter session panicked: {message}")]
pub struct SessionFault {
    message: String,
}

impl SessionFault {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "opaque panic payload".to_string()
        };

        Self { message }
    }

    /// The panic message, as far as it could be recovered.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

type FaultHandler = Arc<dyn Fn(&SessionFault) + Send + Sync>;

/// A source of accepted connections.
///
/// Implemented for the tokio TCP and unix listeners; hosts with other
/// stream transports implement it themselves.
#[async_trait]
pub trait Listener: Send {
    /// The connection stream produced per accept.
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next inbound connection.
    async fn accept(&mut self) -> io::Result<Self::Conn>;
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = Compat<TcpStream>;

    async fn accept(&mut self) -> io::Result<Self::Conn> {
        let (stream, peer) = TcpListener::accept(self).await?;
        debug!(%peer, "accepted milter connection");
        Ok(stream.compat())
    }
}

#[cfg(unix)]
#[async_trait]
impl Listener for UnixListener {
    type Conn = Compat<UnixStream>;

    async fn accept(&mut self) -> io::Result<Self::Conn> {
        let (stream, _addr) = UnixListener::accept(self).await?;
        debug!("accepted milter connection on local socket");
        Ok(stream.compat())
    }
}

/// The accept loop hosting milter sessions.
///
/// Owns the listener and the set of in-flight sessions. Every accepted
/// connection gets a fresh filter from the factory and runs until the
/// MTA quits or fails; closing the server via its [`ServerHandle`]
/// stops accepting and drains what is still running.
pub struct Server<L, F> {
    listener: Option<L>,
    factory: F,
    fault_handlers: Vec<FaultHandler>,
    shutdown: CancellationToken,
    sessions: TaskTracker,
}

impl<L, F, M> Server<L, F>
where
    L: Listener,
    F: Fn() -> (M, Capability, Protocol),
    M: Milter + 'static,
{
    /// Create a server accepting on `listener`.
    ///
    /// The factory runs once per accepted connection and returns the
    /// filter for that connection plus the action and protocol bitmasks
    /// it wants negotiated: the actions are the superset of
    /// modifications it might request, the protocol mask the parts of
    /// the conversation it wants masked out or left unanswered.
    pub fn new(listener: L, factory: F) -> Self {
        Self {
            listener: Some(listener),
            factory,
            fault_handlers: Vec::new(),
            shutdown: CancellationToken::new(),
            sessions: TaskTracker::new(),
        }
    }

    /// Register a fault handler.
    ///
    /// With at least one handler registered, a panicking filter is
    /// caught, normalized into a [`SessionFault`] and delivered to
    /// every handler; the session closes and the server keeps running.
    /// With no handler, a panicking session takes the whole process
    /// down, so bugs cannot hide in a dead task during development.
    #[must_use]
    pub fn with_fault_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(&SessionFault) + Send + Sync + 'static,
    {
        self.fault_handlers.push(Arc::new(handler));
        self
    }

    /// A cloneable handle to shut this server down from elsewhere.
    #[must_use]
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
            sessions: self.sessions.clone(),
        }
    }

    /// Accept connections until the listener fails or the server is
    /// closed.
    ///
    /// Returns `Ok(())` after a graceful [`ServerHandle::close`]; the
    /// first accept error ends the loop and becomes the return value.
    ///
    /// # Errors
    /// Accept errors of the underlying listener, or calling `run` a
    /// second time.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut listener = self.listener.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no listener to accept on")
        })?;

        info!("milter server accepting connections");
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                accepted = listener.accept() => {
                    self.spawn_session(accepted?);
                }
            }
        }
        debug!("milter server stopped accepting");

        Ok(())
    }

    /// Hand one connection to a session task.
    ///
    /// The task joins the tracker before the loop accepts again, so a
    /// concurrent close always waits for this connection too.
    fn spawn_session(&self, conn: L::Conn) {
        let (filter, actions, protocol) = (self.factory)();
        let session = Session::new(conn, filter, actions, protocol);
        let handlers = self.fault_handlers.clone();

        let _session = self.sessions.spawn(async move {
            match AssertUnwindSafe(session.run()).catch_unwind().await {
                Ok(()) => {}
                Err(payload) => {
                    let fault = SessionFault::from_panic(payload);
                    if handlers.is_empty() {
                        // No handler registered: the runtime would
                        // swallow the panic with this task. Take the
                        // process down instead.
                        error!(%fault, "milter session panicked with no fault handler");
                        std::process::abort();
                    }
                    error!(%fault, "isolated a session fault");
                    for handler in &handlers {
                        handler(&fault);
                    }
                }
            }
        });
    }
}

/// Remote control for a running [`Server`].
#[derive(Clone)]
pub struct ServerHandle {
    shutdown: CancellationToken,
    sessions: TaskTracker,
}

impl ServerHandle {
    /// Stop accepting new connections and wait until every in-flight
    /// session has terminated.
    ///
    /// Idempotent, and safe to call concurrently with an active
    /// [`Server::run`] or with other `close` calls.
    pub async fn close(&self) {
        self.shutdown.cancel();
        self.sessions.close();
        self.sessions.wait().await;
    }
}
