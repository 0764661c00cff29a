//! A milter that stamps a header onto every mail and uppercases the
//! body, answering with a custom reply line.

use std::env;

use async_trait::async_trait;
use tokio::net::TcpListener;

use milterd_common::{
    actions::{Action, Continue, Replycode},
    commands::Body,
    optneg::{Capability, Protocol},
};
use milterd_server::{Milter, Modifier, ModifierError, Server};

#[derive(Debug, Default)]
struct ShoutingMilter {
    body: Vec<u8>,
}

#[async_trait]
impl Milter for ShoutingMilter {
    type Error = ModifierError;

    async fn body_chunk(
        &mut self,
        body: Body,
        _modifier: &mut Modifier<'_>,
    ) -> Result<Action, Self::Error> {
        self.body.extend_from_slice(body.as_bytes());
        Ok(Continue.into())
    }

    async fn end_of_body(&mut self, modifier: &mut Modifier<'_>) -> Result<Action, Self::Error> {
        modifier.add_header(b"X-Shouted", b"yes").await?;

        let upper = String::from_utf8_lossy(&self.body).to_uppercase();
        modifier.replace_body(upper.as_bytes()).await?;

        Ok(Replycode::new(250, "2.0.0", "What a message!").into())
    }

    async fn reset(&mut self) -> Result<(), Self::Error> {
        self.body.clear();
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
        (
            ShoutingMilter::default(),
            Capability::ADD_HEADER | Capability::CHANGE_BODY,
            Protocol::empty(),
        )
    });

    server.run().await
}
