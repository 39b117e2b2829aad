//! ChassisBuilder -- fluent builder for [`ChassisClient`] instances.
//!
//! Separates connection settings and validation policy from the client so
//! callers can set ports, timeouts, and limits before talking to the
//! chassis.
//!
//! # Example
//!
//! ```
//! use zappy_protocol::builder::{ChassisBuilder, LEGACY_REPLY_TIMEOUT};
//! use std::time::Duration;
//!
//! # fn example() -> zappy_core::Result<()> {
//! let client = ChassisBuilder::new("10.0.11.2")
//!     .connect_timeout(Duration::from_secs(2))
//!     .reply_timeout(LEGACY_REPLY_TIMEOUT)
//!     .build()?;
//! assert_eq!(client.addr(), "10.0.11.2:23");
//! # Ok(())
//! # }
//! ```

use std::net::Ipv6Addr;
use std::time::Duration;

use zappy_core::error::{Error, Result};
use zappy_core::ZapLimits;
use zappy_transport::DEFAULT_CONNECT_TIMEOUT;

use crate::client::ChassisClient;

/// Telnet port the chassis command interpreter listens on.
pub const DEFAULT_PORT: u16 = 23;

/// How long to wait for `zpass`/`zerr` after a command.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Reply timeout used by the earliest protocol revision.
pub const LEGACY_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Fluent builder for [`ChassisClient`].
#[derive(Debug, Clone)]
pub struct ChassisBuilder {
    host: String,
    port: u16,
    connect_timeout: Duration,
    reply_timeout: Duration,
    limits: ZapLimits,
}

impl ChassisBuilder {
    /// Start a builder for the chassis at `host` (IP address or hostname).
    pub fn new(host: &str) -> Self {
        ChassisBuilder {
            host: host.trim().to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            limits: ZapLimits::default(),
        }
    }

    /// Override the TCP port (default: 23).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect timeout (default: 5s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how long to wait for a status token (default: 10s).
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Set the validation limits commands are checked against.
    pub fn limits(mut self, limits: ZapLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Build the client. No connection is made until a command is executed.
    pub fn build(self) -> Result<ChassisClient> {
        if self.host.is_empty() {
            return Err(Error::Transport("chassis host is required".into()));
        }
        if self.reply_timeout.is_zero() {
            return Err(Error::Transport("reply timeout must be non-zero".into()));
        }

        let addr = if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };

        Ok(ChassisClient::new(
            addr,
            self.connect_timeout,
            self.reply_timeout,
            self.limits,
        ))
    }
}
