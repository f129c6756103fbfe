use std::{fmt::Display, net::SocketAddr};

use futures::Stream;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};

use crate::{config::LISTEN_BACKLOG, error::ListenerError};

/// An accepted client, owned by exactly one streamer task.
#[derive(Debug)]
pub struct Connection {
    pub stream: TcpStream,
    pub peer: SocketAddr,
}

impl Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.peer.fmt(f)
    }
}

#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Binds and starts listening. Must be called inside a tokio runtime.
    pub fn bind(addr: SocketAddr) -> Result<Listener, ListenerError> {
        Self::open(addr).map_err(|source| ListenerError::Bind { addr, source })
    }

    fn open(addr: SocketAddr) -> std::io::Result<Listener> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(LISTEN_BACKLOG)?;

        let inner = TcpListener::from_std(socket.into())?;
        Ok(Listener { inner })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub async fn accept(&self) -> Result<Connection, ListenerError> {
        let (stream, peer) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        Ok(Connection { stream, peer })
    }

    /// Endless stream of accepted connections. Consumes the listener, so it cannot be restarted.
    pub fn incoming(self) -> impl Stream<Item = Result<Connection, ListenerError>> {
        futures::stream::unfold(self, |listener| async move {
            let result = listener.accept().await;
            Some((result, listener))
        })
    }
}
