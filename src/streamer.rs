use std::{fmt::Display, sync::Arc};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    codec,
    config::{StreamerConfig, WriteErrorPolicy},
    error::StreamError,
};

/// Per connection state. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Open,
    Writing(usize),
    Closed,
}

impl Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamState::Open => f.write_str("Open"),
            StreamState::Writing(index) => write!(f, "Writing({index})"),
            StreamState::Closed => f.write_str("Closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamReport {
    pub written: usize,
    /// Writes that failed and were skipped under [`WriteErrorPolicy::Ignore`].
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct Streamer {
    config: Arc<StreamerConfig>,
}

impl Streamer {
    pub fn new(config: StreamerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Writes the message one code point at a time, `interval` apart, then closes `conn`.
    /// The connection is consumed so it is closed on every path out of here.
    pub async fn stream<W>(&self, mut conn: W) -> Result<StreamReport, StreamError>
    where
        W: AsyncWrite + Unpin,
    {
        let code_points = self.config.message.code_points();
        let mut report = StreamReport::default();
        let mut state = StreamState::Open;

        for (index, &code_point) in code_points.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.interval).await;
            }
            state = advance(state, StreamState::Writing(index));

            match write_code_point(&mut conn, code_point).await {
                Ok(()) => {
                    report.written += 1;
                    tracing::debug!(message = "Sent code point", %state, ?code_point);
                }
                Err(source) => match self.config.on_write_error {
                    WriteErrorPolicy::Abort => {
                        let _ = conn.shutdown().await;
                        state = advance(state, StreamState::Closed);
                        tracing::debug!(message = "Connection closed early", %state);
                        return Err(StreamError::Write {
                            index,
                            code_point,
                            source,
                        });
                    }
                    WriteErrorPolicy::Ignore => {
                        report.failed += 1;
                        tracing::debug!(message = "Ignoring failed write", %state, error = %source);
                    }
                },
            }
        }

        // every code point is already out; a failed shutdown only means the peer left first
        if let Err(err) = conn.shutdown().await {
            tracing::debug!(message = "Shutdown after last code point failed", error = %err);
        }
        state = advance(state, StreamState::Closed);
        tracing::debug!(message = "Connection closed", %state, written = report.written);
        Ok(report)
    }
}

async fn write_code_point<W>(conn: &mut W, code_point: char) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    conn.write_all(&codec::encode(code_point)).await?;
    conn.flush().await
}

fn advance(from: StreamState, to: StreamState) -> StreamState {
    debug_assert!(
        matches!(
            (from, to),
            (StreamState::Open, StreamState::Writing(0))
                | (StreamState::Open, StreamState::Closed)
                | (StreamState::Writing(_), StreamState::Closed)
        ) || matches!((from, to), (StreamState::Writing(i), StreamState::Writing(j)) if j == i + 1),
        "invalid transition {from} -> {to}"
    );
    to
}
