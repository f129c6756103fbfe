use std::{io, net::SocketAddr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to write code point {index} ({code_point:?}): {source}")]
    Write {
        index: usize,
        code_point: char,
        source: io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("connection limit must allow at least one client")]
    ZeroConnectionLimit,
    #[error("connection limit {requested} exceeds the maximum of {max}")]
    ConnectionLimitTooLarge { requested: usize, max: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{0} trailing bytes do not form a complete code point")]
    Truncated(usize),
    #[error("{0:#x} is not a unicode scalar value")]
    InvalidScalar(u32),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
