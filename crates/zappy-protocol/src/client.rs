//! ChassisClient -- validated commands in, classified replies out.
//!
//! Every command runs on its own connection: connect, send one line, wait
//! for the status token, close. The session is closed on every path,
//! including transport failures, before the reply is classified.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};
use zappy_core::error::Result;
use zappy_core::transport::Transport;
use zappy_core::{Command, Validated, ZapLimits};
use zappy_transport::TcpTransport;

use crate::protocol::{decode_reply, encode, ChassisReply, Outcome, Terminator};
use crate::session::TelnetSession;
use crate::validate;

/// A configured chassis endpoint.
///
/// Construct with [`ChassisBuilder`](crate::builder::ChassisBuilder).
#[derive(Debug, Clone)]
pub struct ChassisClient {
    addr: String,
    connect_timeout: Duration,
    reply_timeout: Duration,
    limits: ZapLimits,
}

impl ChassisClient {
    pub(crate) fn new(
        addr: String,
        connect_timeout: Duration,
        reply_timeout: Duration,
        limits: ZapLimits,
    ) -> Self {
        ChassisClient {
            addr,
            connect_timeout,
            reply_timeout,
            limits,
        }
    }

    /// The `host:port` this client connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    /// The limits raw commands are validated against.
    pub fn limits(&self) -> &ZapLimits {
        &self.limits
    }

    /// Validate a raw command record with this client's limits.
    pub fn validate(&self, raw: &Value) -> Result<Validated<Command>> {
        Ok(validate::validate_with(raw, &self.limits)?)
    }

    /// Connect to the chassis, run `command`, and close the connection.
    ///
    /// A `Fail` or `Timeout` reply is returned as a value; use
    /// [`ChassisReply::into_result`] to treat it as an error.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`](zappy_core::Error::Transport) if the chassis is
    /// unreachable, or any transport error raised mid-exchange.
    pub async fn execute(&self, command: &Command) -> Result<ChassisReply> {
        let transport = TcpTransport::connect_with_timeout(&self.addr, self.connect_timeout).await?;
        self.execute_on(Box::new(transport), command).await
    }

    /// Run `command` over a caller-provided transport, closing it afterwards.
    ///
    /// This is the entry point for testing with a `MockTransport`.
    pub async fn execute_on(
        &self,
        transport: Box<dyn Transport>,
        command: &Command,
    ) -> Result<ChassisReply> {
        let mut session = TelnetSession::new(transport, self.reply_timeout);
        let observed = session.exchange(&encode(command), &Terminator::ALL).await;

        if let Err(e) = session.close().await {
            warn!(addr = %self.addr, error = %e, "failed to close chassis session");
        }

        let reply = decode_reply(observed?);
        match reply.outcome {
            Outcome::Pass => info!(command = command.name(), "chassis reported pass"),
            Outcome::Fail => warn!(
                command = command.name(),
                reply = %reply.raw_text,
                "chassis returned error"
            ),
            Outcome::Timeout => warn!(
                command = command.name(),
                timeout_ms = self.reply_timeout.as_millis() as u64,
                "{}",
                reply.diagnostic()
            ),
        }
        debug!(reply = %reply.raw_text, "chassis reply");

        Ok(reply)
    }
}
