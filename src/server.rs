use std::sync::Arc;

use futures::{Stream, StreamExt as _};
use tokio::sync::Semaphore;
use tracing::Instrument as _;

use crate::{
    config::ServerConfig,
    error::{ConfigError, ListenerError},
    listener::Connection,
    streamer::Streamer,
};

pub struct Server {
    streamer: Streamer,
    limit: Option<Arc<Semaphore>>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        let limit = match config.max_connections {
            None => None,
            Some(0) => return Err(ConfigError::ZeroConnectionLimit),
            Some(requested) if requested > Semaphore::MAX_PERMITS => {
                return Err(ConfigError::ConnectionLimitTooLarge {
                    requested,
                    max: Semaphore::MAX_PERMITS,
                })
            }
            Some(permits) => Some(Arc::new(Semaphore::new(permits))),
        };
        Ok(Self {
            streamer: Streamer::new(config.streamer),
            limit,
        })
    }

    /// Pulls connections from `incoming` forever, handing each one to its own streamer task.
    /// Returns the first accept error, leaving it to the caller to decide whether that is
    /// fatal, or `Ok` if `incoming` runs dry.
    pub async fn run<S>(&self, incoming: S) -> Result<(), ListenerError>
    where
        S: Stream<Item = Result<Connection, ListenerError>>,
    {
        let mut incoming = std::pin::pin!(incoming);
        let mut next_id: u64 = 0;
        loop {
            // Wait for a free slot before taking the next client off the backlog.
            let permit = match &self.limit {
                // never closed, so acquiring cannot fail
                Some(limit) => Arc::clone(limit).acquire_owned().await.ok(),
                None => None,
            };

            let Some(accepted) = incoming.next().await else {
                return Ok(());
            };
            let connection = accepted.inspect_err(|err| {
                tracing::error!(message = "Accept failed", error = %err);
            })?;

            let c_id = next_id;
            next_id += 1;
            let span = tracing::info_span!("connection", c_id, peer = %connection);
            let streamer = self.streamer.clone();
            tokio::spawn(
                async move {
                    serve(streamer, connection).await;
                    drop(permit);
                }
                .instrument(span),
            );
        }
    }
}

async fn serve(streamer: Streamer, connection: Connection) {
    tracing::info!(message = "Accepted connection");
    if let Err(err) = connection.stream.set_nodelay(true) {
        tracing::debug!(message = "Could not disable Nagle", error = %err);
    }
    match streamer.stream(connection.stream).await {
        Ok(report) => {
            tracing::info!(
                message = "Finished streaming",
                written = report.written,
                failed = report.failed
            );
        }
        Err(err) => {
            tracing::warn!(message = "Streaming stopped", error = %err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::Receiver,
        config::{Message, StreamerConfig, WriteErrorPolicy},
        listener::Listener,
    };
    use std::{
        net::{Ipv4Addr, SocketAddr},
        time::Duration,
    };

    fn config(text: &str, interval: Duration, max_connections: Option<usize>) -> ServerConfig {
        ServerConfig {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            streamer: StreamerConfig {
                message: Message::new(text),
                interval,
                on_write_error: WriteErrorPolicy::Abort,
            },
            max_connections,
        }
    }

    fn start(config: ServerConfig) -> anyhow::Result<SocketAddr> {
        let listener = Listener::bind(config.addr)?;
        let addr = listener.local_addr()?;
        let server = Server::new(config)?;
        tokio::spawn(async move { server.run(listener.incoming()).await });
        Ok(addr)
    }

    #[tokio::test]
    async fn client_receives_whole_message() -> anyhow::Result<()> {
        let text = "おめでとうございます！";
        let addr = start(config(text, Duration::from_millis(10), None))?;

        let received = Receiver::connect(addr).await?.collect().await?;
        assert_eq!(received, text.chars().collect::<Vec<_>>());
        Ok(())
    }

    #[tokio::test]
    async fn code_points_arrive_one_second_apart() -> anyhow::Result<()> {
        let addr = start(config("AB€", Duration::from_secs(1), None))?;
        let mut receiver = Receiver::connect(addr).await?;

        let mut arrivals = Vec::new();
        let mut received = Vec::new();
        while let Some(code_point) = receiver.next_code_point().await? {
            arrivals.push(tokio::time::Instant::now());
            received.push(code_point);
        }
        let closed = tokio::time::Instant::now();

        assert_eq!(received, vec!['A', 'B', '€']);
        for pair in arrivals.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(900), "{gap:?}");
            assert!(gap <= Duration::from_millis(1200), "{gap:?}");
        }
        let linger = closed - arrivals[2];
        assert!(linger < Duration::from_millis(200), "{linger:?}");
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_clients_get_identical_streams() -> anyhow::Result<()> {
        let text = "AB€🎉";
        let addr = start(config(text, Duration::from_millis(50), None))?;

        let first = tokio::spawn(async move { Receiver::connect(addr).await?.collect().await });
        let second = tokio::spawn(async move { Receiver::connect(addr).await?.collect().await });

        let expected: Vec<char> = text.chars().collect();
        assert_eq!(first.await??, expected);
        assert_eq!(second.await??, expected);
        Ok(())
    }

    #[tokio::test]
    async fn connection_limit_queues_later_clients() -> anyhow::Result<()> {
        let addr = start(config("xyz", Duration::from_millis(100), Some(1)))?;

        let start = tokio::time::Instant::now();
        let mut first = Receiver::connect(addr).await?;
        first.next_code_point().await?;
        let mut second = Receiver::connect(addr).await?;

        // the second client sits in the backlog until the first stream is done
        assert_eq!(second.next_code_point().await?, Some('x'));
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(first.collect().await?, vec!['y', 'z']);
        assert_eq!(second.collect().await?, vec!['y', 'z']);
        Ok(())
    }

    #[test]
    fn rejects_zero_connection_limit() {
        let result = Server::new(config("x", Duration::from_millis(10), Some(0)));
        assert_eq!(result.err(), Some(ConfigError::ZeroConnectionLimit));
    }

    #[test]
    fn rejects_connection_limit_above_semaphore_capacity() {
        let result = Server::new(config("x", Duration::from_millis(10), Some(usize::MAX)));
        assert_eq!(
            result.err(),
            Some(ConfigError::ConnectionLimitTooLarge {
                requested: usize::MAX,
                max: Semaphore::MAX_PERMITS,
            })
        );
        let largest = config("x", Duration::from_millis(10), Some(Semaphore::MAX_PERMITS));
        assert!(Server::new(largest).is_ok());
    }

    #[tokio::test]
    async fn accept_error_ends_run_after_serving_earlier_clients() -> anyhow::Result<()> {
        let listener = Listener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))?;
        let client = Receiver::connect(listener.local_addr()?).await?;
        let accepted = listener.accept().await?;

        let incoming = futures::stream::iter(vec![
            Ok(accepted),
            Err(ListenerError::Accept(std::io::Error::from(
                std::io::ErrorKind::ConnectionAborted,
            ))),
        ]);
        let server = Server::new(config("AB", Duration::from_millis(10), None))?;

        let result = server.run(incoming).await;
        let Err(ListenerError::Accept(err)) = result else {
            anyhow::bail!("expected an accept error, got {result:?}");
        };
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionAborted);

        // the connection accepted before the failure is still streamed to completion
        assert_eq!(client.collect().await?, vec!['A', 'B']);
        Ok(())
    }

    #[tokio::test]
    async fn exhausted_incoming_returns_ok() -> anyhow::Result<()> {
        let server = Server::new(config("x", Duration::from_millis(10), Some(1)))?;
        server
            .run(futures::stream::empty::<Result<Connection, ListenerError>>())
            .await?;
        Ok(())
    }
}
