//! Mock chassis server for end-to-end protocol testing.
//!
//! [`MockChassis`] is a TCP listener on localhost pre-loaded with a script
//! of expected command lines and canned replies, enabling deterministic
//! tests of the full client path (connect, send, await terminator, close)
//! without a chassis on the network.
//!
//! # Example
//!
//! ```
//! use zappy_test_harness::MockChassis;
//!
//! # async fn example() -> zappy_core::Result<()> {
//! let mut chassis = MockChassis::bind().await?;
//! chassis.expect(b"plate lock\n\r", b"plate locked\r\nzpass\r\n");
//!
//! let addr = chassis.addr().to_string();
//! chassis.start();
//! // ... connect a client to `addr` and run the command ...
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use zappy_core::error::{Error, Result};

/// How long the mock waits for the client to hang up after the script ends.
const CLOSE_WAIT: Duration = Duration::from_secs(15);

/// A scripted exchange: the line the client must send and what to answer.
#[derive(Debug, Clone)]
struct LineExpectation {
    /// The exact bytes the client must send, terminator included.
    line: Vec<u8>,
    /// Bytes to write back, or `None` to stay silent.
    reply: Option<Vec<u8>>,
}

/// A mock chassis for testing the client over a real TCP socket.
///
/// The listener is bound by [`bind`](MockChassis::bind). Once
/// [`start`](MockChassis::start) is called it accepts a single connection,
/// optionally writes a greeting, then works through the script in order.
/// After the script it waits for the client to close the connection;
/// [`wait`](MockChassis::wait) reports an error if any line mismatched or
/// the client never hung up.
pub struct MockChassis {
    /// The address the listener is bound to (e.g. "127.0.0.1:54321").
    addr: String,
    /// The bound listener, moved into the server task by `start()`.
    listener: Option<TcpListener>,
    /// Bytes sent right after accepting, before any command is read.
    greeting: Vec<u8>,
    /// Ordered script of expected lines.
    script: VecDeque<LineExpectation>,
    /// Handle to the server task once started.
    server_handle: Option<JoinHandle<std::result::Result<(), String>>>,
}

impl MockChassis {
    /// Bind a mock chassis to a random port on localhost.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock chassis: {}", e)))?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();

        Ok(Self {
            addr,
            listener: Some(listener),
            greeting: Vec::new(),
            script: VecDeque::new(),
            server_handle: None,
        })
    }

    /// Bytes to send as soon as the client connects (banner, telnet
    /// option negotiation, ...).
    pub fn greeting(&mut self, bytes: &[u8]) {
        self.greeting = bytes.to_vec();
    }

    /// Expect `line` from the client and answer with `reply`.
    pub fn expect(&mut self, line: &[u8], reply: &[u8]) {
        self.script.push_back(LineExpectation {
            line: line.to_vec(),
            reply: Some(reply.to_vec()),
        });
    }

    /// Expect `line` from the client and never answer it.
    pub fn expect_silence(&mut self, line: &[u8]) {
        self.script.push_back(LineExpectation {
            line: line.to_vec(),
            reply: None,
        });
    }

    /// Get the address the mock is listening on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Start serving the script in a background task.
    ///
    /// Calling `start()` twice has no effect.
    pub fn start(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let greeting = std::mem::take(&mut self.greeting);
        let script: Vec<LineExpectation> = self.script.drain(..).collect();

        let handle = tokio::spawn(async move {
            let (mut stream, peer) = listener
                .accept()
                .await
                .map_err(|e| format!("failed to accept connection: {}", e))?;
            tracing::debug!(peer = %peer, "mock chassis accepted connection");

            if !greeting.is_empty() {
                stream
                    .write_all(&greeting)
                    .await
                    .map_err(|e| format!("greeting write error: {}", e))?;
            }

            for (i, expectation) in script.iter().enumerate() {
                let line = read_exact_len(&mut stream, expectation.line.len())
                    .await
                    .map_err(|e| format!("expectation {}: {}", i, e))?;

                if line != expectation.line {
                    return Err(format!(
                        "expectation {}: line mismatch: expected {:?}, got {:?}",
                        i,
                        String::from_utf8_lossy(&expectation.line),
                        String::from_utf8_lossy(&line)
                    ));
                }

                if let Some(reply) = &expectation.reply {
                    stream
                        .write_all(reply)
                        .await
                        .map_err(|e| format!("expectation {}: write error: {}", i, e))?;
                    stream
                        .flush()
                        .await
                        .map_err(|e| format!("expectation {}: flush error: {}", i, e))?;
                }
            }

            wait_for_hangup(&mut stream).await
        });

        self.server_handle = Some(handle);
    }

    /// Wait for the server task to finish and return any script errors.
    pub async fn wait(self) -> std::result::Result<(), String> {
        match self.server_handle {
            Some(handle) => handle
                .await
                .map_err(|e| format!("mock chassis task panicked: {}", e))?,
            None => Ok(()),
        }
    }
}

/// Read exactly `len` bytes, skipping telnet negotiation replies the client
/// may interleave before its command line.
async fn read_exact_len(stream: &mut TcpStream, len: usize) -> std::result::Result<Vec<u8>, String> {
    let mut line = Vec::with_capacity(len);
    let mut byte = [0u8; 1];
    let mut skip = 0usize;

    while line.len() < len {
        let n = stream
            .read(&mut byte)
            .await
            .map_err(|e| format!("read error: {}", e))?;
        if n == 0 {
            return Err(format!(
                "client disconnected after {} bytes (expected {})",
                line.len(),
                len
            ));
        }
        if skip > 0 {
            skip -= 1;
        } else if byte[0] == 0xFF {
            // IAC <verb> <option>
            skip = 2;
        } else {
            line.push(byte[0]);
        }
    }

    Ok(line)
}

/// Drain the connection until the client closes it.
async fn wait_for_hangup(stream: &mut TcpStream) -> std::result::Result<(), String> {
    let mut buf = [0u8; 256];
    let drained = tokio::time::timeout(CLOSE_WAIT, async {
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => continue,
            }
        }
    })
    .await;

    drained.map_err(|_| "client never closed the connection".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_script_and_sees_hangup() {
        let mut chassis = MockChassis::bind().await.unwrap();
        chassis.expect(b"plate lock\n\r", b"zpass\r\n");
        let addr = chassis.addr().to_string();
        chassis.start();

        let mut client = TcpStream::connect(&addr).await.unwrap();
        client.write_all(b"plate lock\n\r").await.unwrap();
        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"zpass\r\n");
        drop(client);

        chassis.wait().await.unwrap();
    }

    #[tokio::test]
    async fn reports_mismatch() {
        let mut chassis = MockChassis::bind().await.unwrap();
        chassis.expect(b"plate lock\n\r", b"zpass");
        let addr = chassis.addr().to_string();
        chassis.start();

        let mut client = TcpStream::connect(&addr).await.unwrap();
        client.write_all(b"plate open\n\r").await.unwrap();

        let err = chassis.wait().await.unwrap_err();
        assert!(err.contains("line mismatch"), "got: {}", err);
    }

    #[tokio::test]
    async fn greeting_is_sent_first() {
        let mut chassis = MockChassis::bind().await.unwrap();
        chassis.greeting(b"zappy ready\r\n");
        let addr = chassis.addr().to_string();
        chassis.start();

        let mut client = TcpStream::connect(&addr).await.unwrap();
        let mut buf = [0u8; 32];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"zappy ready\r\n");
        drop(client);

        chassis.wait().await.unwrap();
    }
}
