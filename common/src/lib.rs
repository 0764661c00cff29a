#![doc = include_str!("../Readme.md")]

pub mod actions;
pub mod commands;
pub mod decoding;
pub mod encoding;
pub mod modifications;
pub mod optneg;

mod error;
mod packet;

pub use error::{InvalidData, NotEnoughData, ProtocolError};
pub use packet::Packet;
