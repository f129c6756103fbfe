//! TCP listener that streams a fixed message to every client, one code point per
//! interval, each code point sent as a little-endian `u32`, then closes the connection.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod listener;
pub mod server;
pub mod streamer;

pub use config::{Message, ServerConfig, StreamerConfig, WriteErrorPolicy};
pub use listener::{Connection, Listener};
pub use server::Server;
pub use streamer::{StreamReport, Streamer};
