//! TCP transport to the chassis command port.
//!
//! The chassis runs a telnet service, but nothing here speaks telnet: the
//! transport moves raw bytes and the session above it filters option
//! negotiation. Each command opens its own connection, so a transport
//! lives for exactly one exchange.

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};
use zappy_core::error::{Error, Result};
use zappy_core::transport::Transport;

/// Connect timeout used by [`TcpTransport::connect`].
///
/// The chassis sits on a local test network; a slower answer means it is
/// off or the address is wrong.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A single TCP connection to a chassis.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    peer: String,
    sent: usize,
    received: usize,
}

impl TcpTransport {
    /// Connect to `addr` (`host:port`) with [`DEFAULT_CONNECT_TIMEOUT`].
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with_timeout(addr, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect to `addr`, giving up after `timeout`.
    ///
    /// A timeout and a refusal both surface as [`Error::Transport`]; in
    /// either case the chassis is unreachable.
    pub async fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Self> {
        debug!(addr = %addr, timeout_ms = timeout.as_millis() as u64, "connecting to chassis");

        let attempt = tokio::time::timeout(timeout, TcpStream::connect(addr)).await;
        let stream = match attempt {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                error!(addr = %addr, error = %e, "chassis connect failed");
                return Err(match e.kind() {
                    ErrorKind::ConnectionRefused => {
                        Error::Transport(format!("connection refused: {}", addr))
                    }
                    _ => Error::Transport(format!("cannot reach {}: {}", addr, e)),
                });
            }
            Err(_) => {
                error!(addr = %addr, "chassis connect timed out");
                return Err(Error::Transport(format!(
                    "no answer from {} within {} ms",
                    addr,
                    timeout.as_millis()
                )));
            }
        };

        info!(addr = %addr, "connected to chassis");
        Ok(Self::from_stream(stream, addr.to_string()))
    }

    /// Adopt an already connected stream. `peer` labels log output.
    pub fn from_stream(stream: TcpStream, peer: String) -> Self {
        // Command lines are a few dozen bytes; send them immediately.
        if let Err(e) = stream.set_nodelay(true) {
            warn!(addr = %peer, error = %e, "could not disable Nagle");
        }
        TcpTransport {
            stream: Some(stream),
            peer,
            sent: 0,
            received: 0,
        }
    }

    /// The `host:port` this transport talks to.
    pub fn addr(&self) -> &str {
        &self.peer
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(Error::NotConnected)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        trace!(addr = %self.peer, bytes = data.len(), data = ?data, "tx");
        let stream = self.stream()?;
        let written = async {
            stream.write_all(data).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = written {
            error!(addr = %self.peer, error = %e, "write to chassis failed");
            return Err(data_path_error(e));
        }
        self.sent += data.len();
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream()?;
        let n = tokio::time::timeout(timeout, stream.read(buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| {
                error!(addr = %self.peer, error = %e, "read from chassis failed");
                data_path_error(e)
            })?;

        if n == 0 {
            warn!(addr = %self.peer, "chassis closed the connection");
            return Err(Error::ConnectionLost);
        }
        trace!(addr = %self.peer, bytes = n, data = ?&buf[..n], "rx");
        self.received += n;
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        if let Err(e) = stream.shutdown().await {
            debug!(addr = %self.peer, error = %e, "shutdown failed, dropping socket");
        }
        info!(
            addr = %self.peer,
            sent = self.sent,
            received = self.received,
            "chassis connection closed"
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Errors after connect: a dead peer is [`Error::ConnectionLost`].
fn data_path_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::NotConnected
        | ErrorKind::UnexpectedEof => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
