//! End-to-end tests driving a real server over localhost TCP with raw
//! milter frames, the way an MTA would.

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use milterd_common::{
    actions::{Accept, Action, Continue},
    commands::{Body, Connect, Header, HeaderMap, Helo, Mail, Recipient, Unknown},
    optneg::{Capability, Protocol},
};
use milterd_server::{Milter, Modifier, ModifierError, Server, ServerHandle};

/// Build one raw milter frame.
fn frame(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + payload.len());
    out.extend((payload.len() as u32 + 1).to_be_bytes());
    out.push(code);
    out.extend(payload);
    out
}

fn optneg_payload(version: u32, actions: u32, protocol: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(12);
    out.extend(version.to_be_bytes());
    out.extend(actions.to_be_bytes());
    out.extend(protocol.to_be_bytes());
    out
}

fn connect_payload() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(b"localhost\0");
    out.push(b'4');
    out.extend(25u16.to_be_bytes());
    out.extend(b"127.0.0.1\0");
    out
}

/// Read one frame, `None` on a closed connection.
async fn read_frame(stream: &mut TcpStream) -> Option<(u8, Vec<u8>)> {
    let mut length = [0u8; 4];
    stream.read_exact(&mut length).await.ok()?;
    let length = u32::from_be_bytes(length) as usize;

    let mut data = vec![0u8; length];
    stream.read_exact(&mut data).await.ok()?;

    Some((data[0], data[1..].to_vec()))
}

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

/// Records every callback, always answers Continue.
struct RecordingMilter {
    recorder: Recorder,
}

#[async_trait]
impl Milter for RecordingMilter {
    type Error = Infallible;

    async fn new_session(&mut self, _session_id: &str) -> Result<(), Self::Error> {
        self.recorder.push("new_session");
        Ok(())
    }

    async fn end_session(&mut self) -> Result<(), Self::Error> {
        self.recorder.push("end_session");
        Ok(())
    }

    async fn new_message(&mut self, _message_id: &str) -> Result<(), Self::Error> {
        self.recorder.push("new_message");
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), Self::Error> {
        self.recorder.push("reset");
        Ok(())
    }

    async fn connect(
        &mut self,
        connect: Connect,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        self.recorder
            .push(format!("connect {}:{:?}", connect.hostname(), connect.port));
        Ok(Continue.into())
    }

    async fn helo(
        &mut self,
        helo: Helo,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        self.recorder.push(format!("helo {}", helo.name()));
        Ok(Continue.into())
    }

    async fn mail_from(
        &mut self,
        mail: Mail,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        self.recorder.push(format!("mail_from {}", mail.sender()));
        Ok(Continue.into())
    }

    async fn rcpt_to(
        &mut self,
        recipient: Recipient,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        self.recorder
            .push(format!("rcpt_to {}", recipient.recipient()));
        Ok(Continue.into())
    }

    async fn header(
        &mut self,
        header: Header,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        self.recorder.push(format!("header {}", header.name()));
        Ok(Continue.into())
    }

    async fn headers(
        &mut self,
        headers: &HeaderMap,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        self.recorder.push(format!("headers {}", headers.len()));
        Ok(Continue.into())
    }

    async fn body_chunk(
        &mut self,
        body: Body,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        self.recorder
            .push(format!("body_chunk {}", body.as_bytes().len()));
        Ok(Continue.into())
    }

    async fn end_of_body(&mut self, _modifier: &mut Modifier<'_>) -> Result<Action, Self::Error> {
        self.recorder.push("end_of_body");
        Ok(Continue.into())
    }

    async fn unknown(
        &mut self,
        command: Unknown,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        self.recorder.push(format!(
            "unknown {}",
            String::from_utf8_lossy(command.as_bytes())
        ));
        Ok(Continue.into())
    }
}

async fn start<M, F>(
    factory: F,
) -> (SocketAddr, ServerHandle, JoinHandle<io::Result<()>>)
where
    M: Milter + 'static,
    F: Fn() -> (M, Capability, Protocol) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut server = Server::new(listener, factory);
    let handle = server.handle();
    let join = tokio::spawn(async move { server.run().await });

    (addr, handle, join)
}

#[tokio::test]
async fn minimal_accept() {
    let recorder = Recorder::default();
    let factory_recorder = recorder.clone();
    let (addr, handle, join) = start(move || {
        (
            RecordingMilter {
                recorder: factory_recorder.clone(),
            },
            Capability::empty(),
            Protocol::empty(),
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();

    let (code, payload) = read_frame(&mut mta).await.expect("optneg reply expected");
    assert_eq!(b'O', code);
    assert_eq!(optneg_payload(2, 0, 0), payload);

    mta.write_all(&frame(b'C', &connect_payload())).await.unwrap();
    let (code, payload) = read_frame(&mut mta).await.expect("connect reply expected");
    assert_eq!(b'c', code);
    assert!(payload.is_empty());

    mta.write_all(&frame(b'Q', b"")).await.unwrap();
    assert_eq!(None, read_frame(&mut mta).await);

    handle.close().await;
    join.await.unwrap().unwrap();

    assert_eq!(
        vec!["new_session", "connect localhost:Some(25)", "end_session"],
        recorder.events()
    );
}

#[tokio::test]
async fn continue_is_suppressed_for_no_reply_commands() {
    let (addr, handle, _join) = start(|| {
        (
            RecordingMilter {
                recorder: Recorder::default(),
            },
            Capability::empty(),
            Protocol::NR_CONNECT,
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, Protocol::NR_CONNECT.bits())))
        .await
        .unwrap();
    let (code, payload) = read_frame(&mut mta).await.expect("optneg reply expected");
    assert_eq!(b'O', code);
    assert_eq!(
        optneg_payload(2, 0, Protocol::NR_CONNECT.bits()),
        payload
    );

    // Connect gets no reply; the next frame on the wire answers helo.
    mta.write_all(&frame(b'C', &connect_payload())).await.unwrap();
    mta.write_all(&frame(b'H', b"mail.example.org\0")).await.unwrap();

    let (code, _) = read_frame(&mut mta).await.expect("helo reply expected");
    assert_eq!(b'c', code);

    mta.write_all(&frame(b'Q', b"")).await.unwrap();
    assert_eq!(None, read_frame(&mut mta).await);

    handle.close().await;
}

/// Stamps a header, replaces the body and accepts.
struct ModifyingMilter;

#[async_trait]
impl Milter for ModifyingMilter {
    type Error = ModifierError;

    async fn end_of_body(&mut self, modifier: &mut Modifier<'_>) -> Result<Action, Self::Error> {
        modifier.add_header(b"X-Test", b"1").await?;
        modifier.replace_body(b"hello").await?;
        Ok(Accept.into())
    }
}

#[tokio::test]
async fn modifications_precede_the_verdict() {
    let (addr, handle, _join) = start(|| {
        (
            ModifyingMilter,
            Capability::ADD_HEADER | Capability::CHANGE_BODY,
            Protocol::empty(),
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0x03, 0)))
        .await
        .unwrap();
    read_frame(&mut mta).await.expect("optneg reply expected");

    mta.write_all(&frame(b'M', b"<sender@example.org>\0"))
        .await
        .unwrap();
    let (code, _) = read_frame(&mut mta).await.expect("mail reply expected");
    assert_eq!(b'c', code);

    mta.write_all(&frame(b'E', b"")).await.unwrap();

    let (code, payload) = read_frame(&mut mta).await.expect("add header expected");
    assert_eq!(b'h', code);
    assert_eq!(b"X-Test\x001\0".to_vec(), payload);

    let (code, payload) = read_frame(&mut mta).await.expect("replace body expected");
    assert_eq!(b'b', code);
    assert_eq!(b"hello".to_vec(), payload);

    let (code, payload) = read_frame(&mut mta).await.expect("verdict expected");
    assert_eq!(b'a', code);
    assert!(payload.is_empty());

    mta.write_all(&frame(b'Q', b"")).await.unwrap();
    assert_eq!(None, read_frame(&mut mta).await);

    handle.close().await;
}

#[tokio::test]
async fn abort_resets_the_message_and_processing_continues() {
    let recorder = Recorder::default();
    let factory_recorder = recorder.clone();
    let (addr, handle, _join) = start(move || {
        (
            RecordingMilter {
                recorder: factory_recorder.clone(),
            },
            Capability::empty(),
            Protocol::empty(),
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();
    read_frame(&mut mta).await.expect("optneg reply expected");

    // First message attempt, aborted after the recipient.
    for (code, payload) in [
        (b'C', connect_payload()),
        (b'M', b"<first@example.org>\0".to_vec()),
        (b'R', b"<rcpt@example.org>\0".to_vec()),
    ] {
        mta.write_all(&frame(code, &payload)).await.unwrap();
        read_frame(&mut mta).await.expect("continue expected");
    }
    mta.write_all(&frame(b'A', b"")).await.unwrap();

    // Second message on the same connection completes.
    for (code, payload) in [
        (b'M', b"<second@example.org>\0".to_vec()),
        (b'R', b"<rcpt@example.org>\0".to_vec()),
        (b'E', b"".to_vec()),
    ] {
        mta.write_all(&frame(code, &payload)).await.unwrap();
        read_frame(&mut mta).await.expect("reply expected");
    }

    mta.write_all(&frame(b'Q', b"")).await.unwrap();
    assert_eq!(None, read_frame(&mut mta).await);
    handle.close().await;

    assert_eq!(
        vec![
            "new_session",
            "connect localhost:Some(25)",
            "new_message",
            "mail_from first@example.org",
            "rcpt_to rcpt@example.org",
            "reset",
            "new_message",
            "mail_from second@example.org",
            "rcpt_to rcpt@example.org",
            "end_of_body",
            "reset",
            "end_session",
        ],
        recorder.events()
    );
}

#[tokio::test]
async fn zero_length_frame_closes_only_that_session() {
    let (addr, handle, _join) = start(|| {
        (
            RecordingMilter {
                recorder: Recorder::default(),
            },
            Capability::empty(),
            Protocol::empty(),
        )
    })
    .await;

    let mut broken = TcpStream::connect(addr).await.unwrap();
    broken.write_all(&[0, 0, 0, 0]).await.unwrap();
    assert_eq!(None, read_frame(&mut broken).await);

    // The server keeps accepting and serving.
    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();
    let (code, _) = read_frame(&mut mta).await.expect("optneg reply expected");
    assert_eq!(b'O', code);

    mta.write_all(&frame(b'Q', b"")).await.unwrap();
    handle.close().await;
}

/// Panics while handling helo.
struct PanickingMilter;

#[async_trait]
impl Milter for PanickingMilter {
    type Error = Infallible;

    async fn helo(
        &mut self,
        _helo: Helo,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        panic!("boom");
    }
}

#[tokio::test]
async fn a_panicking_filter_is_isolated() {
    let faults: Arc<Mutex<Vec<String>>> = Arc::default();
    let seen = Arc::clone(&faults);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut server = Server::new(listener, || {
        (PanickingMilter, Capability::empty(), Protocol::empty())
    })
    .with_fault_handler(move |fault| {
        seen.lock().unwrap().push(fault.message().to_string());
    });
    let handle = server.handle();
    let _join = tokio::spawn(async move { server.run().await });

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();
    read_frame(&mut mta).await.expect("optneg reply expected");

    mta.write_all(&frame(b'H', b"mail.example.org\0"))
        .await
        .unwrap();
    assert_eq!(None, read_frame(&mut mta).await);

    // A fresh connection is served as if nothing happened.
    let mut next = TcpStream::connect(addr).await.unwrap();
    next.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();
    let (code, _) = read_frame(&mut next).await.expect("optneg reply expected");
    assert_eq!(b'O', code);
    next.write_all(&frame(b'Q', b"")).await.unwrap();

    handle.close().await;

    assert_eq!(vec!["boom".to_string()], *faults.lock().unwrap());
}

/// With no fault handler registered, a filter panic must take the
/// whole process down instead of dying quietly inside its task.
///
/// An abort would kill the test harness, so the test re-runs itself as
/// a child process and checks the child's exit status.
#[tokio::test]
async fn a_panicking_filter_without_handlers_aborts_the_process() {
    if std::env::var_os("MILTERD_EXPECT_ABORT").is_some() {
        // Child mode: no fault handler, provoke the panic.
        let (addr, _handle, _join) = start(|| {
            (PanickingMilter, Capability::empty(), Protocol::empty())
        })
        .await;

        let mut mta = TcpStream::connect(addr).await.unwrap();
        mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
            .await
            .unwrap();
        read_frame(&mut mta).await.expect("optneg reply expected");

        mta.write_all(&frame(b'H', b"mail.example.org\0"))
            .await
            .unwrap();

        // The abort fires while we wait. Surviving the wait means it
        // did not, and the parent sees a clean exit below.
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        return;
    }

    let exe = std::env::current_exe().unwrap();
    let output = std::process::Command::new(exe)
        .args(["a_panicking_filter_without_handlers_aborts_the_process", "--exact"])
        .env("MILTERD_EXPECT_ABORT", "1")
        .output()
        .unwrap();

    assert!(
        !output.status.success(),
        "child exited cleanly, the panic did not abort the process"
    );
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        // 6 = SIGABRT
        assert_eq!(Some(6), output.status.signal());
    }
}

#[tokio::test]
async fn the_full_conversation_drives_callbacks_in_order() {
    let recorder = Recorder::default();
    let factory_recorder = recorder.clone();
    let (addr, handle, _join) = start(move || {
        (
            RecordingMilter {
                recorder: factory_recorder.clone(),
            },
            Capability::empty(),
            Protocol::empty(),
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();

    let conversation: Vec<(u8, Vec<u8>)> = vec![
        (b'O', optneg_payload(2, 0, 0)),
        (b'C', connect_payload()),
        (b'H', b"mail.example.org\0".to_vec()),
        (b'M', b"<sender@example.org>\0".to_vec()),
        (b'R', b"<rcpt@example.org>\0".to_vec()),
        (b'T', Vec::new()),
        (b'L', b"From\0sender@example.org\0".to_vec()),
        (b'L', b"Subject\0hello\0".to_vec()),
        (b'N', Vec::new()),
        (b'B', b"body bytes\r\n".to_vec()),
        (b'E', Vec::new()),
    ];

    for (code, payload) in conversation {
        mta.write_all(&frame(code, &payload)).await.unwrap();
        let (reply, _) = read_frame(&mut mta).await.expect("reply expected");
        let expected = if code == b'O' { b'O' } else { b'c' };
        assert_eq!(expected as char, reply as char);
    }

    mta.write_all(&frame(b'Q', b"")).await.unwrap();
    assert_eq!(None, read_frame(&mut mta).await);
    handle.close().await;

    assert_eq!(
        vec![
            "new_session",
            "connect localhost:Some(25)",
            "helo mail.example.org",
            "new_message",
            "mail_from sender@example.org",
            "rcpt_to rcpt@example.org",
            "header From",
            "header Subject",
            "headers 2",
            "body_chunk 12",
            "end_of_body",
            "reset",
            "end_session",
        ],
        recorder.events()
    );
}

/// Tries modifications it may not perform and records the outcome.
struct GatedMilter {
    recorder: Recorder,
}

#[async_trait]
impl Milter for GatedMilter {
    type Error = Infallible;

    async fn connect(
        &mut self,
        _connect: Connect,
        modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        // Mutations are out of scope before end-of-body, progress
        // included.
        match modifier.add_header(b"X-Early", b"1").await {
            Err(ModifierError::WrongStage) => self.recorder.push("connect: wrong stage"),
            other => self.recorder.push(format!("connect: {other:?}")),
        }
        match modifier.progress().await {
            Err(ModifierError::WrongStage) => self.recorder.push("connect: progress wrong stage"),
            other => self.recorder.push(format!("connect: progress {other:?}")),
        }
        Ok(Continue.into())
    }

    async fn end_of_body(&mut self, modifier: &mut Modifier<'_>) -> Result<Action, Self::Error> {
        match modifier.add_header(b"X-Late", b"1").await {
            Err(ModifierError::NotNegotiated(needed)) => self
                .recorder
                .push(format!("end_of_body: missing {needed:?}")),
            other => self.recorder.push(format!("end_of_body: {other:?}")),
        }
        // Progress needs no action bit, only the right stage.
        match modifier.progress().await {
            Ok(()) => self.recorder.push("end_of_body: progress sent"),
            other => self.recorder.push(format!("end_of_body: progress {other:?}")),
        }
        Ok(Continue.into())
    }
}

#[tokio::test]
async fn ungated_modifications_fail_without_writing() {
    let recorder = Recorder::default();
    let factory_recorder = recorder.clone();
    let (addr, handle, _join) = start(move || {
        (
            GatedMilter {
                recorder: factory_recorder.clone(),
            },
            // Deliberately not declaring ADD_HEADER.
            Capability::QUARANTINE,
            Protocol::empty(),
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();
    read_frame(&mut mta).await.expect("optneg reply expected");

    mta.write_all(&frame(b'C', &connect_payload())).await.unwrap();
    let (code, _) = read_frame(&mut mta).await.expect("connect reply expected");
    assert_eq!(b'c', code);

    mta.write_all(&frame(b'M', b"<a@b>\0")).await.unwrap();
    read_frame(&mut mta).await.expect("mail reply expected");

    mta.write_all(&frame(b'E', b"")).await.unwrap();
    // The refused header writes nothing; only the progress keep-alive
    // precedes the verdict.
    let (code, payload) = read_frame(&mut mta).await.expect("progress expected");
    assert_eq!(b'p', code);
    assert!(payload.is_empty());

    let (code, _) = read_frame(&mut mta).await.expect("verdict expected");
    assert_eq!(b'c', code);

    mta.write_all(&frame(b'Q', b"")).await.unwrap();
    assert_eq!(None, read_frame(&mut mta).await);
    handle.close().await;

    assert_eq!(
        vec![
            "connect: wrong stage".to_string(),
            "connect: progress wrong stage".to_string(),
            "end_of_body: missing Capability(ADD_HEADER)".to_string(),
            "end_of_body: progress sent".to_string(),
        ],
        recorder.events()
    );
}

#[tokio::test]
async fn macros_are_merged_and_readable() {
    let recorder = Recorder::default();
    let factory_recorder = recorder.clone();

    struct MacroMilter {
        recorder: Recorder,
    }

    #[async_trait]
    impl Milter for MacroMilter {
        type Error = Infallible;

        async fn mail_from(
            &mut self,
            _mail: Mail,
            modifier: &mut Modifier<'_>,
        ) -> Result<Action, Self::Error> {
            self.recorder.push(format!(
                "j={:?} daemon={:?}",
                modifier.macro_value("j"),
                modifier.macro_value("{daemon_name}")
            ));
            Ok(Continue.into())
        }
    }

    let (addr, handle, _join) = start(move || {
        (
            MacroMilter {
                recorder: factory_recorder.clone(),
            },
            Capability::empty(),
            Protocol::empty(),
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();
    read_frame(&mut mta).await.expect("optneg reply expected");

    // Two macro packets merge; an empty one changes nothing.
    mta.write_all(&frame(b'D', b"Cj\0mail.example.org\0"))
        .await
        .unwrap();
    mta.write_all(&frame(b'D', b"M{daemon_name}\0smtpd\0"))
        .await
        .unwrap();
    mta.write_all(&frame(b'D', b"")).await.unwrap();

    mta.write_all(&frame(b'M', b"<a@b>\0")).await.unwrap();
    read_frame(&mut mta).await.expect("mail reply expected");

    mta.write_all(&frame(b'Q', b"")).await.unwrap();
    assert_eq!(None, read_frame(&mut mta).await);
    handle.close().await;

    assert_eq!(
        vec![r#"j=Some("mail.example.org") daemon=Some("smtpd")"#.to_string()],
        recorder.events()
    );
}

#[tokio::test]
async fn unknown_commands_reach_the_filter_when_allowed() {
    let recorder = Recorder::default();
    let factory_recorder = recorder.clone();
    let (addr, handle, _join) = start(move || {
        (
            RecordingMilter {
                recorder: factory_recorder.clone(),
            },
            Capability::empty(),
            Protocol::empty(),
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();
    read_frame(&mut mta).await.expect("optneg reply expected");

    mta.write_all(&frame(b'X', b"STARTTLS")).await.unwrap();
    let (code, _) = read_frame(&mut mta).await.expect("unknown reply expected");
    assert_eq!(b'c', code);

    mta.write_all(&frame(b'Q', b"")).await.unwrap();
    assert_eq!(None, read_frame(&mut mta).await);
    handle.close().await;

    assert_eq!(
        vec!["new_session", "unknown STARTTLS", "end_session"],
        recorder.events()
    );
}

#[tokio::test]
async fn unknown_commands_close_the_session_when_masked_out() {
    let (addr, handle, _join) = start(|| {
        (
            RecordingMilter {
                recorder: Recorder::default(),
            },
            Capability::empty(),
            Protocol::NO_UNKNOWN,
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, Protocol::NO_UNKNOWN.bits())))
        .await
        .unwrap();
    read_frame(&mut mta).await.expect("optneg reply expected");

    mta.write_all(&frame(b'X', b"STARTTLS")).await.unwrap();
    let (code, _) = read_frame(&mut mta).await.expect("tempfail expected");
    assert_eq!(b't', code);
    assert_eq!(None, read_frame(&mut mta).await);

    handle.close().await;
}

#[tokio::test]
async fn a_second_option_negotiation_is_a_protocol_error() {
    let (addr, handle, _join) = start(|| {
        (
            RecordingMilter {
                recorder: Recorder::default(),
            },
            Capability::empty(),
            Protocol::empty(),
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();
    read_frame(&mut mta).await.expect("optneg reply expected");

    mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();
    let (code, _) = read_frame(&mut mta).await.expect("tempfail expected");
    assert_eq!(b't', code);
    assert_eq!(None, read_frame(&mut mta).await);

    handle.close().await;
}

#[tokio::test]
async fn smtp_events_require_a_handshake_first() {
    let (addr, handle, _join) = start(|| {
        (
            RecordingMilter {
                recorder: Recorder::default(),
            },
            Capability::empty(),
            Protocol::empty(),
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'C', &connect_payload())).await.unwrap();

    let (code, _) = read_frame(&mut mta).await.expect("tempfail expected");
    assert_eq!(b't', code);
    assert_eq!(None, read_frame(&mut mta).await);

    handle.close().await;
}

#[tokio::test]
async fn malformed_payloads_tempfail_but_keep_the_session() {
    let recorder = Recorder::default();
    let factory_recorder = recorder.clone();
    let (addr, handle, _join) = start(move || {
        (
            RecordingMilter {
                recorder: factory_recorder.clone(),
            },
            Capability::empty(),
            Protocol::empty(),
        )
    })
    .await;

    let mut mta = TcpStream::connect(addr).await.unwrap();
    mta.write_all(&frame(b'O', &optneg_payload(2, 0, 0)))
        .await
        .unwrap();
    read_frame(&mut mta).await.expect("optneg reply expected");

    // Connect without any null terminator.
    mta.write_all(&frame(b'C', b"garbage")).await.unwrap();
    let (code, _) = read_frame(&mut mta).await.expect("tempfail expected");
    assert_eq!(b't', code);

    // The session is still usable.
    mta.write_all(&frame(b'H', b"mail.example.org\0")).await.unwrap();
    let (code, _) = read_frame(&mut mta).await.expect("helo reply expected");
    assert_eq!(b'c', code);

    mta.write_all(&frame(b'Q', b"")).await.unwrap();
    assert_eq!(None, read_frame(&mut mta).await);
    handle.close().await;
}
