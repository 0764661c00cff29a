//! A milter that prints callback arguments for each stage.

use std::env;

use async_trait::async_trait;
use tokio::net::TcpListener;

use milterd_common::{
    actions::{Action, Continue},
    commands::{Body, Connect, Header, HeaderMap, Helo, Mail, Recipient, Unknown},
    optneg::{Capability, Protocol},
};
use milterd_server::{Milter, Modifier, Server};

struct PrintMilter;

#[async_trait]
impl Milter for PrintMilter {
    type Error = &'static str;

    async fn new_session(&mut self, session_id: &str) -> Result<(), Self::Error> {
        println!("\n======== SESSION {session_id} ========");
        Ok(())
    }

    async fn connect(
        &mut self,
        connect: Connect,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        println!("\n======== CONNECT ========");
        println!("  hostname: {}", connect.hostname());
        println!("  socket_info: {}:{:?}", connect.address(), connect.port);
        println!("  family: {}", connect.family.label());
        Ok(Continue.into())
    }

    async fn helo(
        &mut self,
        helo: Helo,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        println!("\n======== HELO ========");
        println!("  hostname: {}", helo.name());
        Ok(Continue.into())
    }

    async fn mail_from(
        &mut self,
        mail: Mail,
        modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        println!("\n======== MAIL ========");
        println!("  message id: {}", modifier.message_id());
        println!("  sender: {}", mail.sender());
        for arg in mail.esmtp_args() {
            println!("  esmtp_args: {arg}");
        }
        Ok(Continue.into())
    }

    async fn rcpt_to(
        &mut self,
        recipient: Recipient,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        println!("\n======== RCPT ========");
        println!("  recipient: {}", recipient.recipient());
        for arg in recipient.esmtp_args() {
            println!("  esmtp_args: {arg}");
        }
        Ok(Continue.into())
    }

    async fn header(
        &mut self,
        header: Header,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        println!("\n======== HEADER ========");
        println!("  {}: {}", header.name(), header.value());
        Ok(Continue.into())
    }

    async fn headers(
        &mut self,
        headers: &HeaderMap,
        modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        println!("\n======== EOH ========");
        println!("  {} headers in total", headers.len());
        for (name, value) in modifier.macros() {
            println!("  macro - {name}: {value}");
        }
        Ok(Continue.into())
    }

    async fn body_chunk(
        &mut self,
        body: Body,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        println!("\n======== BODY ========");
        println!("  chunk: {}", String::from_utf8_lossy(body.as_bytes()));
        Ok(Continue.into())
    }

    async fn end_of_body(&mut self, _modifier: &mut Modifier<'_>) -> Result<Action, Self::Error> {
        println!("\n======== END OF BODY ========");
        Ok(Continue.into())
    }

    async fn unknown(
        &mut self,
        command: Unknown,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        println!("\n======== UNKNOWN ========");
        println!("  raw: {command:?}");
        Ok(Continue.into())
    }

    async fn reset(&mut self) -> Result<(), Self::Error> {
        println!("\n======== RESET ========");
        Ok(())
    }

    async fn end_session(&mut self) -> Result<(), Self::Error> {
        println!("\n======== SESSION END ========");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let addr = env::var("LISTEN_ADDR").unwrap_or("0.0.0.0:8894".to_string());
    let listener = TcpListener::bind(&addr).await?;
    println!("Bound to {addr}");

    let mut server = Server::new(listener, || {
        (PrintMilter, Capability::empty(), Protocol::empty())
    });

    server.run().await
}
