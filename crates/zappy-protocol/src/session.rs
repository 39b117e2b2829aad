//! TelnetSession -- one half-duplex exchange at a time over a [`Transport`].
//!
//! The session owns the connection to the chassis. It writes a command
//! line, then reads until one of the expected status tokens shows up or the
//! reply deadline passes. Telnet option negotiation from the chassis is
//! refused and stripped before the reply text is scanned.
//!
//! ```text
//!  Idle --send_line--> AwaitingReply --await_reply--> Idle
//!    \                                                  |
//!     `------------------------ close ------------------'--> Closed
//! ```
//!
//! A second `send_line` while a reply is outstanding is rejected: the
//! chassis protocol has no pipelining.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};
use zappy_core::error::{Error, Result};
use zappy_core::transport::Transport;

use crate::protocol::{find_terminator, ReplyMatch, Terminator};
use crate::telnet::TelnetFilter;

/// Size of the receive buffer handed to the transport.
const READ_CHUNK: usize = 1024;

/// Where a [`TelnetSession`] is in its exchange cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to send a command line.
    Idle,
    /// A line has been sent; its reply has not been collected.
    AwaitingReply,
    /// The connection has been closed.
    Closed,
}

/// A command/reply session with the chassis.
pub struct TelnetSession {
    transport: Box<dyn Transport>,
    filter: TelnetFilter,
    state: SessionState,
    reply_timeout: Duration,
}

impl TelnetSession {
    /// Wrap an open transport. `reply_timeout` bounds [`exchange`](Self::exchange).
    pub fn new(transport: Box<dyn Transport>, reply_timeout: Duration) -> Self {
        TelnetSession {
            transport,
            filter: TelnetFilter::new(),
            state: SessionState::Idle,
            reply_timeout,
        }
    }

    /// Current state of the exchange cycle.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Write one encoded command line.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if a reply is still outstanding.
    /// - [`Error::NotConnected`] after [`close`](Self::close).
    /// - Any transport error from the write.
    pub async fn send_line(&mut self, line: &[u8]) -> Result<()> {
        match self.state {
            SessionState::Idle => {}
            SessionState::AwaitingReply => {
                return Err(Error::Protocol(
                    "previous command is still awaiting its reply".into(),
                ))
            }
            SessionState::Closed => return Err(Error::NotConnected),
        }

        debug!("telnet> {}", String::from_utf8_lossy(line).trim_end());
        self.transport.send(line).await?;
        self.state = SessionState::AwaitingReply;
        Ok(())
    }

    /// Read until one of `terminators` appears or `timeout` elapses.
    ///
    /// On a match the returned text runs up to and including the earliest
    /// terminator in the reply. A deadline expiry is not an error: it is
    /// reported as [`ReplyMatch::TimedOut`] with the partial text. Bytes
    /// that arrive after the match or the deadline are never read.
    pub async fn await_reply(
        &mut self,
        terminators: &[Terminator],
        timeout: Duration,
    ) -> Result<ReplyMatch> {
        match self.state {
            SessionState::AwaitingReply => {}
            SessionState::Idle => {
                return Err(Error::Protocol("no command is awaiting a reply".into()))
            }
            SessionState::Closed => return Err(Error::NotConnected),
        }

        let result = self.collect_reply(terminators, timeout).await;
        self.state = SessionState::Idle;
        result
    }

    async fn collect_reply(
        &mut self,
        terminators: &[Terminator],
        timeout: Duration,
    ) -> Result<ReplyMatch> {
        let deadline = Instant::now() + timeout;
        let mut received: Vec<u8> = Vec::new();
        let mut buf = [0u8; READ_CHUNK];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(timed_out(&received, timeout));
            }

            let n = match self.transport.receive(&mut buf, remaining).await {
                Ok(n) => n,
                Err(Error::Timeout) => return Ok(timed_out(&received, timeout)),
                Err(e) => return Err(e),
            };

            let filtered = self.filter.feed(&buf[..n]);
            if !filtered.replies.is_empty() {
                trace!(bytes = filtered.replies.len(), "refusing telnet options");
                self.transport.send(&filtered.replies).await?;
            }
            received.extend_from_slice(&filtered.data);

            let text = String::from_utf8_lossy(&received);
            if let Some((terminator, end)) = find_terminator(&text, terminators) {
                let text = text[..end].to_string();
                debug!(terminator = terminator.token(), "{}", text);
                return Ok(ReplyMatch::Matched { terminator, text });
            }
        }
    }

    /// Send a line and wait for the reply using the session's reply timeout.
    pub async fn exchange(&mut self, line: &[u8], terminators: &[Terminator]) -> Result<ReplyMatch> {
        self.send_line(line).await?;
        self.await_reply(terminators, self.reply_timeout).await
    }

    /// Close the connection. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.filter.reset();
        self.transport.close().await
    }
}

impl Drop for TelnetSession {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            warn!("TelnetSession dropped without close()");
        }
    }
}

fn timed_out(received: &[u8], timeout: Duration) -> ReplyMatch {
    let text = String::from_utf8_lossy(received).into_owned();
    debug!(
        timeout_ms = timeout.as_millis() as u64,
        partial = %text,
        "no status token before deadline"
    );
    ReplyMatch::TimedOut { text }
}
