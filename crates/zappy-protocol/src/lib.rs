//! Chassis line-protocol driver for zappy.
//!
//! This crate turns raw command records into chassis command lines and
//! chassis replies into outcomes. It provides:
//!
//! - **Validator** ([`validate`]) -- check a raw JSON command record against
//!   the [`ZapLimits`](zappy_core::ZapLimits), apply defaults, and produce a
//!   [`Command`](zappy_core::Command).
//! - **Protocol codec** ([`protocol`]) -- encode `\n\r`-terminated command
//!   lines, scan replies for `zpass`/`zerr`, and classify them.
//! - **Telnet filter** ([`telnet`]) -- strip and refuse telnet option
//!   negotiation on the command port.
//! - **Session** ([`session`]) -- the half-duplex send/await state machine
//!   over a [`Transport`](zappy_core::Transport).
//! - **Client** ([`client`]) and **builder** ([`builder`]) -- connect, run
//!   one command, close.
//! - **Batch adapter** ([`batch`]) -- CSV rows to raw zap records.
//!
//! # Example
//!
//! ```
//! use zappy_core::{Command, ZapLimits};
//! use zappy_protocol::protocol::{decode_reply, encode, Outcome, ReplyMatch, Terminator};
//! use zappy_protocol::validate::validate_str;
//!
//! let cmd = validate_str(
//!     r#"{"name": "Zappy.zap", "voltage": "500:volts", "duration": "10:milliseconds"}"#,
//!     &ZapLimits::default(),
//! )
//! .unwrap()
//! .value;
//! assert_eq!(encode(&cmd), b"zap 4 12 500.0 11000.0 16000.0 0\n\r");
//!
//! let reply = decode_reply(ReplyMatch::Matched {
//!     terminator: Terminator::Zpass,
//!     text: "garbage zpass".into(),
//! });
//! assert_eq!(reply.outcome, Outcome::Pass);
//! ```

pub mod batch;
pub mod builder;
pub mod client;
pub mod protocol;
pub mod session;
pub mod telnet;
pub mod validate;

pub use builder::ChassisBuilder;
pub use client::ChassisClient;
pub use protocol::{ChassisReply, Outcome};
pub use session::TelnetSession;
