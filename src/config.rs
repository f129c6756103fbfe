use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

pub const DEFAULT_HOST: Ipv4Addr = Ipv4Addr::UNSPECIFIED;
pub const DEFAULT_PORT: u16 = 20408;
pub const DEFAULT_MESSAGE: &str = "おめでとうございます！";
pub const EMISSION_INTERVAL: Duration = Duration::from_secs(1);
pub const LISTEN_BACKLOG: i32 = 1024;

/// Immutable sequence of code points streamed to every client.
/// Cloning only bumps the reference count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(Arc<[char]>);

impl Message {
    pub fn new(text: &str) -> Self {
        Message(text.chars().collect())
    }

    pub fn code_points(&self) -> &[char] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::new(value)
    }
}

impl Default for Message {
    fn default() -> Self {
        Message::new(DEFAULT_MESSAGE)
    }
}

/// What a streamer does when writing a code point to its connection fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteErrorPolicy {
    /// Stop streaming at the first failed write and close the connection.
    #[default]
    Abort,
    /// Fire-and-forget: count the failure and keep going until the message is exhausted.
    Ignore,
}

#[derive(Debug, Clone)]
pub struct StreamerConfig {
    pub message: Message,
    pub interval: Duration,
    pub on_write_error: WriteErrorPolicy,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            message: Message::default(),
            interval: EMISSION_INTERVAL,
            on_write_error: WriteErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub streamer: StreamerConfig,
    /// Upper bound on concurrently running streamer tasks. `None` spawns one task per
    /// accepted connection without limit.
    pub max_connections: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((DEFAULT_HOST, DEFAULT_PORT)),
            streamer: StreamerConfig::default(),
            max_connections: None,
        }
    }
}
