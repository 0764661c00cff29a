#![doc = include_str!("../Readme.md")]

mod codec;
mod milter;
mod modifier;
mod server;
mod session;

pub use milter::{Error, Milter};
pub use modifier::{Modifier, ModifierError};
pub use server::{Listener, Server, ServerHandle, SessionFault};
