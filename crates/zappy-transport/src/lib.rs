//! Transport implementations for zappy.
//!
//! This crate provides the concrete implementation of the
//! [`Transport`](zappy_core::Transport) trait used to reach a chassis:
//!
//! - [`TcpTransport`]: a TCP connection to the chassis's telnet port
//!
//! # Example
//!
//! ```no_run
//! use zappy_transport::TcpTransport;
//! use zappy_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> zappy_core::Result<()> {
//! let mut transport = TcpTransport::connect("10.0.11.2:23").await?;
//!
//! transport.send(b"plate lock\n\r").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(10)).await?;
//! # Ok(())
//! # }
//! ```

pub mod tcp;

pub use tcp::{TcpTransport, DEFAULT_CONNECT_TIMEOUT};
