//! Error types for zappy.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Request validation failures are grouped
//! under [`ValidationError`] so callers can report the offending field
//! without string matching.

/// A request failed validation before anything was sent to the chassis.
///
/// Validation errors are always fatal to the single command they belong to
/// and are never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The command text was not valid JSON.
    #[error("JSON grammar error decoding input: {0}")]
    MalformedJson(String),

    /// A batch row could not be read from the tabular source.
    #[error("malformed batch record: {0}")]
    MalformedCsv(String),

    /// The record has no `name` field.
    #[error("no 'name' field in command record")]
    MissingName,

    /// The `name` field holds a command the chassis does not understand.
    #[error("command {0:?} not recognized")]
    UnknownCommand(String),

    /// A mandatory field is absent.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A unit-suffixed field has no `:` separator (or is not a string).
    #[error("{field}: expected '<number>:<unit>', got {input:?}")]
    MalformedUnitValue { field: &'static str, input: String },

    /// The unit suffix is not one of the units accepted for the field.
    #[error("{field}: unit {unit:?} is not recognized")]
    UnrecognizedUnit { field: &'static str, unit: String },

    /// The magnitude is not a number.
    #[error("{field}: {input:?} is not a number")]
    MalformedNumber { field: &'static str, input: String },

    /// The value lies outside the field's accepted bounds.
    #[error("{field} {value} out of range")]
    OutOfRange { field: &'static str, value: String },
}

/// The error type for all zappy operations.
///
/// Variants cover request validation, transport failures, the chassis
/// failing to answer or rejecting a command, and waveform reduction
/// failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request was rejected before being sent.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A transport-level error (unreachable endpoint, refused connection).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (session misuse, unexpected mock traffic).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting on the transport itself.
    #[error("timeout waiting for transport")]
    Timeout,

    /// The chassis did not send a status terminator before the reply deadline.
    #[error("status return timeout")]
    ReplyTimeout,

    /// The chassis answered with an error status.
    #[error("chassis returned error: {0}")]
    ChassisRejected(String),

    /// A capture or energy source was missing, short, or undecodable.
    #[error("data reduction error: {0}")]
    DataReduction(String),

    /// No connection to the chassis has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the chassis was lost mid-exchange.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
