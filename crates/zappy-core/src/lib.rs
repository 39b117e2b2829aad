//! zappy-core: Core types, traits, and error definitions for zappy.
//!
//! This crate defines the pieces shared by every other zappy crate: the
//! request types that describe what the chassis should do, the unit-suffixed
//! value parser, the byte-level [`Transport`] abstraction, and the error
//! taxonomy. It performs no I/O of its own.
//!
//! # Key types
//!
//! - [`Command`] -- a validated chassis command (`Zap`, `Lock`, `Unlock`)
//! - [`ZapRequest`] -- a normalized, bounds-checked pulse request
//! - [`UnitValue`] -- a parsed `"<number>:<unit>"` magnitude
//! - [`Transport`] -- byte-level communication channel
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod helpers;
pub mod request;
pub mod transport;
pub mod units;

// Re-export key types at crate root for ergonomic `use zappy_core::*`.
pub use error::{Error, Result, ValidationError};
pub use helpers::format_wire_float;
pub use request::{
    Advisory, Cell, Command, NegativeCurrentPolicy, PlateAction, PlateRequest, Validated,
    ZapLimits, ZapRequest, ZapRequestBuilder, ALL_COLS, ALL_ROWS, ENERGY_COEFF, ONEJOULE,
};
pub use transport::Transport;
pub use units::{UnitKind, UnitValue};
