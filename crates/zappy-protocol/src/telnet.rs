//! Telnet option filtering for the chassis command port.
//!
//! The chassis command port is a telnet service. It may open the connection
//! with option negotiation (`IAC DO ECHO`, `IAC WILL SUPPRESS-GO-AHEAD`, ...)
//! and its reply text may in principle contain escaped `0xFF` bytes. The
//! client wants none of the options: it refuses every `DO` with `WONT` and
//! every `WILL` with `DONT`, and only the plain data bytes reach the reply
//! scanner.
//!
//! # Byte sequences
//!
//! ```text
//! IAC IAC               -> literal 0xFF data byte
//! IAC DO/DONT/WILL/WONT <option>
//! IAC SB <option> ... IAC SE   (payload discarded)
//! IAC <command>         -> two-byte command, ignored
//! ```

/// Interpret As Command.
pub const IAC: u8 = 255;
/// Refuse to let the peer perform an option.
pub const DONT: u8 = 254;
/// Ask the peer to perform an option.
pub const DO: u8 = 253;
/// Refuse to perform an option.
pub const WONT: u8 = 252;
/// Offer to perform an option.
pub const WILL: u8 = 251;
/// Begin sub-negotiation.
pub const SB: u8 = 250;
/// End sub-negotiation.
pub const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Plain data.
    Data,
    /// Saw IAC, waiting for the command byte.
    Iac,
    /// Saw IAC + DO/DONT/WILL/WONT, waiting for the option byte.
    Option(u8),
    /// Inside IAC SB, before IAC SE.
    Sub,
    /// Saw IAC inside a sub-negotiation.
    SubIac,
}

/// Output of one [`TelnetFilter::feed`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filtered {
    /// Data bytes with all telnet sequences removed.
    pub data: Vec<u8>,
    /// Refusals to send back to the peer, in order.
    pub replies: Vec<u8>,
}

/// Stateful filter separating data bytes from telnet negotiation.
///
/// Sequences may be split across reads; the filter keeps its parse state
/// between calls to [`feed`](TelnetFilter::feed).
#[derive(Debug, Clone)]
pub struct TelnetFilter {
    state: State,
}

impl TelnetFilter {
    pub fn new() -> Self {
        TelnetFilter { state: State::Data }
    }

    /// Filter a chunk of bytes received from the peer.
    ///
    /// # Example
    ///
    /// ```
    /// use zappy_protocol::telnet::{TelnetFilter, DO, IAC, WONT};
    ///
    /// let mut filter = TelnetFilter::new();
    /// let out = filter.feed(&[IAC, DO, 1, b'o', b'k']);
    /// assert_eq!(out.data, b"ok");
    /// assert_eq!(out.replies, vec![IAC, WONT, 1]);
    /// ```
    pub fn feed(&mut self, input: &[u8]) -> Filtered {
        let mut out = Filtered {
            data: Vec::with_capacity(input.len()),
            replies: Vec::new(),
        };

        for &byte in input {
            self.state = match self.state {
                State::Data if byte == IAC => State::Iac,
                State::Data => {
                    out.data.push(byte);
                    State::Data
                }
                State::Iac => match byte {
                    IAC => {
                        out.data.push(IAC);
                        State::Data
                    }
                    DO | DONT | WILL | WONT => State::Option(byte),
                    SB => State::Sub,
                    _ => State::Data,
                },
                State::Option(verb) => {
                    match verb {
                        DO => out.replies.extend_from_slice(&[IAC, WONT, byte]),
                        WILL => out.replies.extend_from_slice(&[IAC, DONT, byte]),
                        // DONT/WONT acknowledge what we already refused.
                        _ => {}
                    }
                    tracing::trace!(verb, option = byte, "telnet negotiation");
                    State::Data
                }
                State::Sub if byte == IAC => State::SubIac,
                State::Sub => State::Sub,
                State::SubIac => match byte {
                    SE => State::Data,
                    _ => State::Sub,
                },
            };
        }

        out
    }

    /// Forget any partial sequence.
    pub fn reset(&mut self) {
        self.state = State::Data;
    }
}

impl Default for TelnetFilter {
    fn default() -> Self {
        Self::new()
    }
}
