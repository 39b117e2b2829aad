//! Chassis line-protocol encoder and reply decoder.
//!
//! The chassis accepts one ASCII command line at a time and answers with
//! free text that ends in a status token. There is no framing beyond that.
//!
//! # Command format
//!
//! ```text
//! zap <row> <col> <volts> <duration_us> <max_current_ma> <energy_counts>\n\r
//! plate lock\n\r
//! plate unlock\n\r
//! ```
//!
//! - `row`, `col`: zero-based plate indices (4 / 12 address every row / column).
//! - `duration_us`: pulse duration including the preamble, in microseconds.
//! - `max_current_ma`: anti-arc limit in milliamps; negative disables it.
//! - `energy_counts`: energy-counter cutoff, 0 when disabled.
//! - Terminator: `\n\r` (LF then CR, in that order).
//!
//! # Reply format
//!
//! Arbitrary progress text, ending in `zpass` on success or `zerr` on
//! failure. The reply is classified by a substring test for `zpass`, so a
//! reply that mentions both tokens counts as a pass.

use bytes::{BufMut, BytesMut};
use zappy_core::error::{Error, Result};
use zappy_core::{format_wire_float, Command, ZapRequest};

/// Line terminator the chassis command interpreter expects.
pub const LINE_TERMINATOR: &[u8] = b"\n\r";

/// Diagnostic reported when no status token arrives in time.
pub const TIMEOUT_DIAGNOSTIC: &str = "status return timeout";

/// A status token that ends a chassis reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminator {
    /// `zerr` -- the command failed.
    Zerr,
    /// `zpass` -- the command succeeded.
    Zpass,
}

impl Terminator {
    /// Every terminator, in the order they are listed to the session.
    pub const ALL: [Terminator; 2] = [Terminator::Zerr, Terminator::Zpass];

    /// The token as it appears in reply text.
    pub fn token(self) -> &'static str {
        match self {
            Terminator::Zerr => "zerr",
            Terminator::Zpass => "zpass",
        }
    }
}

/// Encode a validated command into the bytes to write to the chassis.
///
/// # Example
///
/// ```
/// use zappy_core::{Command, ZapLimits, ZapRequestBuilder};
/// use zappy_protocol::protocol::encode;
///
/// let zap = ZapRequestBuilder::new(500.0, 10.0)
///     .build(&ZapLimits::default())
///     .unwrap()
///     .value;
/// assert_eq!(encode(&Command::Zap(zap)), b"zap 4 12 500.0 11000.0 16000.0 0\n\r");
/// assert_eq!(encode(&Command::Lock), b"plate lock\n\r");
/// ```
pub fn encode(command: &Command) -> Vec<u8> {
    match command {
        Command::Zap(zap) => encode_line(&zap_line(zap)),
        Command::Lock => encode_line("plate lock"),
        Command::Unlock => encode_line("plate unlock"),
    }
}

/// Render the zap command line without its terminator.
pub fn zap_line(zap: &ZapRequest) -> String {
    format!(
        "zap {} {} {} {} {} {}",
        zap.row(),
        zap.col(),
        format_wire_float(zap.voltage_volts()),
        format_wire_float(zap.duration_ms() * 1000.0),
        format_wire_float(zap.max_current_amps() * 1000.0),
        zap.energy_cutoff_counts()
    )
}

/// Append the line terminator to a command line.
pub fn encode_line(line: &str) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(line.len() + LINE_TERMINATOR.len());
    buf.put_slice(line.as_bytes());
    buf.put_slice(LINE_TERMINATOR);
    buf.to_vec()
}

/// Find the earliest status token in accumulated reply text.
///
/// Returns the terminator and the byte offset just past it, so the reply
/// is `text[..end]`. `None` means the reply is still incomplete.
pub fn find_terminator(text: &str, terminators: &[Terminator]) -> Option<(Terminator, usize)> {
    terminators
        .iter()
        .filter_map(|&t| text.find(t.token()).map(|pos| (t, pos, pos + t.token().len())))
        .min_by_key(|&(_, pos, _)| pos)
        .map(|(t, _, end)| (t, end))
}

/// What a session observed while waiting for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMatch {
    /// A terminator arrived; `text` runs up to and including it.
    Matched { terminator: Terminator, text: String },
    /// The deadline passed first; `text` is whatever had arrived.
    TimedOut { text: String },
}

/// Classification of a chassis reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
    Timeout,
}

/// A classified chassis reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChassisReply {
    pub outcome: Outcome,
    /// Text received from the chassis, telnet sequences removed.
    pub raw_text: String,
}

impl ChassisReply {
    /// Human-readable diagnostic for this reply.
    ///
    /// The full reply text for `Pass`/`Fail`, and `"status return timeout"`
    /// when no terminator arrived.
    pub fn diagnostic(&self) -> &str {
        match self.outcome {
            Outcome::Pass | Outcome::Fail => &self.raw_text,
            Outcome::Timeout => TIMEOUT_DIAGNOSTIC,
        }
    }

    /// Whether the chassis reported success.
    pub fn is_pass(&self) -> bool {
        self.outcome == Outcome::Pass
    }

    /// Turn a non-pass reply into the matching error.
    ///
    /// `Fail` becomes [`Error::ChassisRejected`] carrying the reply text;
    /// `Timeout` becomes [`Error::ReplyTimeout`].
    pub fn into_result(self) -> Result<ChassisReply> {
        match self.outcome {
            Outcome::Pass => Ok(self),
            Outcome::Fail => Err(Error::ChassisRejected(self.raw_text)),
            Outcome::Timeout => Err(Error::ReplyTimeout),
        }
    }
}

/// Classify what the session observed.
///
/// Any reply text containing `zpass` is a pass, whichever terminator ended
/// it. The same rule applies to zap, lock and unlock.
pub fn decode_reply(observed: ReplyMatch) -> ChassisReply {
    match observed {
        ReplyMatch::Matched { text, .. } => {
            let outcome = if text.contains(Terminator::Zpass.token()) {
                Outcome::Pass
            } else {
                Outcome::Fail
            };
            ChassisReply {
                outcome,
                raw_text: text,
            }
        }
        ReplyMatch::TimedOut { text } => ChassisReply {
            outcome: Outcome::Timeout,
            raw_text: text,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zappy_core::{ZapLimits, ZapRequestBuilder};

    fn zap(builder: ZapRequestBuilder) -> Command {
        Command::Zap(builder.build(&ZapLimits::default()).unwrap().value)
    }

    // ---------------------------------------------------------------
    // Command encoding
    // ---------------------------------------------------------------

    #[test]
    fn encode_default_zap() {
        let cmd = zap(ZapRequestBuilder::new(500.0, 10.0));
        assert_eq!(encode(&cmd), b"zap 4 12 500.0 11000.0 16000.0 0\n\r");
    }

    #[test]
    fn encode_zap_preamble_in_microseconds() {
        let cmd = zap(ZapRequestBuilder::new(120.0, 5.0).row(1).col(1));
        assert_eq!(encode(&cmd), b"zap 0 0 120.0 6000.0 16000.0 0\n\r");
    }

    #[test]
    fn encode_zap_all_options() {
        let cmd = zap(
            ZapRequestBuilder::new(250.5, 2.5)
                .row(3)
                .col(13)
                .max_current_amps(4.5)
                .energy_cutoff_joules(1.0),
        );
        assert_eq!(
            encode(&cmd),
            b"zap 2 12 250.5 3500.0 4500.0 591241583\n\r"
        );
    }

    #[test]
    fn encode_zap_negative_current() {
        let cmd = zap(ZapRequestBuilder::new(100.0, 0.0).row(5).col(2).max_current_amps(-1.0));
        assert_eq!(encode(&cmd), b"zap 4 1 100.0 1000.0 -1000.0 0\n\r");
    }

    #[test]
    fn encode_zap_row_col_are_zero_based() {
        for row in 1..=5 {
            for col in 1..=13 {
                let cmd = zap(ZapRequestBuilder::new(100.0, 1.0).row(row).col(col));
                let line = String::from_utf8(encode(&cmd)).unwrap();
                let fields: Vec<&str> = line.split(' ').collect();
                assert_eq!(fields[1], (row - 1).to_string());
                assert_eq!(fields[2], (col - 1).to_string());
            }
        }
    }

    #[test]
    fn encode_plate_commands() {
        assert_eq!(encode(&Command::Lock), b"plate lock\n\r");
        assert_eq!(encode(&Command::Unlock), b"plate unlock\n\r");
    }

    #[test]
    fn terminator_is_lf_cr() {
        let bytes = encode(&Command::Lock);
        assert_eq!(&bytes[bytes.len() - 2..], b"\n\r");
    }

    // ---------------------------------------------------------------
    // Terminator scanning
    // ---------------------------------------------------------------

    #[test]
    fn find_terminator_incomplete() {
        assert_eq!(find_terminator("zapping r1c1 ... zpa", &Terminator::ALL), None);
        assert_eq!(find_terminator("", &Terminator::ALL), None);
    }

    #[test]
    fn find_terminator_returns_end_offset() {
        let text = "done\r\nzpass\r\n";
        assert_eq!(
            find_terminator(text, &Terminator::ALL),
            Some((Terminator::Zpass, 11))
        );
        assert_eq!(&text[..11], "done\r\nzpass");
    }

    #[test]
    fn find_terminator_earliest_wins() {
        assert_eq!(
            find_terminator("zerr then zpass", &Terminator::ALL),
            Some((Terminator::Zerr, 4))
        );
        assert_eq!(
            find_terminator("zpass then zerr", &Terminator::ALL),
            Some((Terminator::Zpass, 5))
        );
    }

    #[test]
    fn find_terminator_respects_subset() {
        assert_eq!(
            find_terminator("zerr zpass", &[Terminator::Zpass]),
            Some((Terminator::Zpass, 10))
        );
    }

    // ---------------------------------------------------------------
    // Reply classification
    // ---------------------------------------------------------------

    #[test]
    fn decode_zerr_is_fail() {
        let reply = decode_reply(ReplyMatch::Matched {
            terminator: Terminator::Zerr,
            text: "overcurrent r2c3 zerr".into(),
        });
        assert_eq!(reply.outcome, Outcome::Fail);
        assert_eq!(reply.diagnostic(), "overcurrent r2c3 zerr");
    }

    #[test]
    fn decode_garbage_with_zpass_is_pass() {
        let reply = decode_reply(ReplyMatch::Matched {
            terminator: Terminator::Zpass,
            text: "garbage zpass".into(),
        });
        assert!(reply.is_pass());
        assert_eq!(reply.diagnostic(), "garbage zpass");
    }

    #[test]
    fn decode_both_tokens_is_pass() {
        // Reply ended on zerr but mentioned zpass earlier: still a pass.
        let reply = decode_reply(ReplyMatch::Matched {
            terminator: Terminator::Zerr,
            text: "zpass? no: zerr".into(),
        });
        assert_eq!(reply.outcome, Outcome::Pass);
    }

    #[test]
    fn decode_timeout() {
        let reply = decode_reply(ReplyMatch::TimedOut {
            text: "zapping...".into(),
        });
        assert_eq!(reply.outcome, Outcome::Timeout);
        assert_eq!(reply.diagnostic(), "status return timeout");
        assert_eq!(reply.raw_text, "zapping...");
    }

    #[test]
    fn into_result_maps_outcomes() {
        let pass = ChassisReply {
            outcome: Outcome::Pass,
            raw_text: "zpass".into(),
        };
        assert!(pass.into_result().is_ok());

        let fail = ChassisReply {
            outcome: Outcome::Fail,
            raw_text: "jammed zerr".into(),
        };
        match fail.into_result() {
            Err(Error::ChassisRejected(text)) => assert_eq!(text, "jammed zerr"),
            other => panic!("expected ChassisRejected, got {:?}", other),
        }

        let timeout = ChassisReply {
            outcome: Outcome::Timeout,
            raw_text: String::new(),
        };
        assert!(matches!(timeout.into_result(), Err(Error::ReplyTimeout)));
    }
}
