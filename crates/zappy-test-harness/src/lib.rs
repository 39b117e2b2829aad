//! zappy-test-harness: Test utilities and mock transports for zappy.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the telnet session and chassis client without a live chassis, and
//! [`MockChassis`] for end-to-end tests that go through a real TCP socket.

pub mod mock_chassis;
pub mod mock_transport;

pub use mock_chassis::MockChassis;
pub use mock_transport::{MockActivity, MockTransport};
