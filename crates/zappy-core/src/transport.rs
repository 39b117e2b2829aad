//! Transport trait for chassis communication.
//!
//! The [`Transport`] trait abstracts over the physical link to the chassis.
//! The production implementation is the TCP transport in `zappy-transport`;
//! `zappy-test-harness` provides a scripted in-memory mock.
//!
//! The telnet session in `zappy-protocol` operates on a `Transport` rather
//! than directly on a socket, so the whole exchange can be tested
//! deterministically without a live chassis.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to the chassis.
///
/// Implementations handle buffering and error mapping at the physical
/// layer. Line framing and terminator matching live in the session that
/// consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the chassis.
    ///
    /// Implementations should not return until all bytes have been handed
    /// to the underlying socket.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the chassis into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing arrives within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    /// Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
