//! Mock transport for deterministic testing of the chassis session.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test command encoding, terminator
//! matching, and reply classification without a chassis on the network.
//!
//! # Example
//!
//! ```
//! use zappy_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the session sends this line, the chassis answers with zpass.
//! mock.expect(b"plate lock\n\r", b"locking...\r\nzpass\r\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use zappy_core::error::{Error, Result};
use zappy_core::transport::Transport;

/// What happens once the scripted response bytes are used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterResponse {
    /// Further reads wait out their timeout.
    Silence,
    /// Further reads report the peer closed the connection.
    Disconnect,
}

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes to return when the matching request is received.
    response: Vec<u8>,
    after: AfterResponse,
}

/// Traffic recorded by a [`MockTransport`].
#[derive(Debug, Default)]
struct Activity {
    sent: Vec<Vec<u8>>,
    close_calls: usize,
}

/// Shared view of a [`MockTransport`]'s recorded traffic.
///
/// Stays usable after the transport itself has been boxed and handed to a
/// session, so tests can check what was sent and that the connection was
/// closed.
#[derive(Debug, Clone, Default)]
pub struct MockActivity(Arc<Mutex<Activity>>);

impl MockActivity {
    fn lock(&self) -> MutexGuard<'_, Activity> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All data sent so far, one element per `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// Number of times `close()` has been called.
    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }
}

/// A mock [`Transport`] for testing without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation. The
/// corresponding response is then handed out by subsequent `receive()`
/// calls. Once it is exhausted, `receive()` sleeps for the requested
/// timeout and returns [`Error::Timeout`], like a quiet socket would.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// The response data pending for the next `receive()` call.
    pending_response: Option<Vec<u8>>,
    /// Cursor into the pending response.
    response_cursor: usize,
    /// Behaviour once the pending response has been read.
    after: AfterResponse,
    /// Whether the transport is "connected".
    connected: bool,
    /// Sent data and close calls, shared with [`MockActivity`] handles.
    activity: MockActivity,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending_response: None,
            response_cursor: 0,
            after: AfterResponse::Silence,
            connected: true,
            activity: MockActivity::default(),
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, subsequent
    /// `receive()` calls return `response`.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
            after: AfterResponse::Silence,
        });
    }

    /// Add an expected request whose response is followed by the peer
    /// dropping the connection.
    pub fn expect_then_disconnect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
            after: AfterResponse::Disconnect,
        });
    }

    /// Return all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.activity.sent_data()
    }

    /// A handle on the recorded traffic that outlives boxing the transport.
    pub fn activity(&self) -> MockActivity {
        self.activity.clone()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Number of times `close()` has been called.
    pub fn close_calls(&self) -> usize {
        self.activity.close_calls()
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.activity.lock().sent.push(data.to_vec());

        let expectation = self
            .expectations
            .pop_front()
            .ok_or_else(|| Error::Protocol("no more expectations in mock transport".into()))?;

        if data != expectation.request.as_slice() {
            return Err(Error::Protocol(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            )));
        }

        self.pending_response = Some(expectation.response);
        self.response_cursor = 0;
        self.after = expectation.after;
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if let Some(ref response) = self.pending_response {
            let remaining = &response[self.response_cursor..];
            if !remaining.is_empty() {
                let n = remaining.len().min(buf.len());
                buf[..n].copy_from_slice(&remaining[..n]);
                self.response_cursor += n;
                return Ok(n);
            }
        }

        match self.after {
            AfterResponse::Disconnect if self.pending_response.is_some() => {
                Err(Error::ConnectionLost)
            }
            _ => {
                tokio::time::sleep(timeout).await;
                Err(Error::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.activity.lock().close_calls += 1;
        self.connected = false;
        self.pending_response = None;
        self.response_cursor = 0;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
