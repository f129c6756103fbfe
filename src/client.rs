use std::{io::ErrorKind, net::SocketAddr};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    net::TcpStream,
};

use crate::{
    codec::{self, CODE_POINT_SIZE},
    error::{ClientError, DecodeError},
};

/// Reads a code point stream from a server until it closes the connection.
pub struct Receiver<R = TcpStream> {
    conn: R,
}

impl Receiver<TcpStream> {
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let conn = TcpStream::connect(addr).await?;
        Ok(Self { conn })
    }
}

impl<R> Receiver<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(conn: R) -> Self {
        Self { conn }
    }

    /// Next code point, or `None` once the server has closed the stream on a value boundary.
    pub async fn next_code_point(&mut self) -> Result<Option<char>, ClientError> {
        let mut buf = [0u8; CODE_POINT_SIZE];
        let mut filled = 0;
        while filled < CODE_POINT_SIZE {
            match self.conn.read(&mut buf[filled..]).await {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(DecodeError::Truncated(filled).into()),
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(Some(codec::decode_one(buf)?))
    }

    /// Drains the rest of the stream until EOF.
    pub async fn collect(mut self) -> Result<Vec<char>, ClientError> {
        let mut bytes = Vec::new();
        self.conn.read_to_end(&mut bytes).await?;
        Ok(codec::decode(&bytes)?)
    }
}
