//! Normalized chassis requests.
//!
//! A raw command record is validated into a [`Command`]. The zap variant
//! carries a [`ZapRequest`], which can only be produced through
//! [`ZapRequestBuilder::build`] and is therefore always within the bounds
//! of the [`ZapLimits`] it was built against.
//!
//! Row and column are 1-based everywhere a human or a file sees them and
//! zero-based inside [`ZapRequest`] and on the wire. Internal row index
//! [`ALL_ROWS`] and column index [`ALL_COLS`] address the whole plate.

use std::fmt;
use std::ops::RangeInclusive;

use serde_json::{json, Map, Value};

use crate::error::ValidationError;
use crate::units::{UnitKind, UnitValue};

/// Energy-counter counts per joule used to derive the cutoff threshold.
pub const ONEJOULE: f64 = 591_241_583.67;

/// Joules per count of the energy counter read back after a pulse.
pub const ENERGY_COEFF: f64 = 1.691356e-9;

/// Zero-based row index meaning "every row".
pub const ALL_ROWS: u8 = 4;

/// Zero-based column index meaning "every column".
pub const ALL_COLS: u8 = 12;

/// Rows addressable on the plate (1-based).
const ROW_RANGE: RangeInclusive<i64> = 1..=5;

/// Columns addressable on the plate (1-based).
const COL_RANGE: RangeInclusive<i64> = 1..=13;

/// How a negative `max_current` is interpreted.
///
/// The first chassis revision rejected negative limits; later firmware
/// treats them as a request to disable anti-arc protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegativeCurrentPolicy {
    /// A negative limit is accepted and disables anti-arc protection.
    #[default]
    DisablesAntiArc,
    /// A negative limit is out of range.
    Reject,
}

/// Validation bounds and defaults for zap requests.
///
/// `ZapLimits::default()` matches current chassis firmware.
#[derive(Debug, Clone, PartialEq)]
pub struct ZapLimits {
    /// Accepted pulse voltage in volts (inclusive).
    pub voltage_volts: RangeInclusive<f64>,
    /// Accepted requested duration in milliseconds, before the preamble.
    pub duration_ms: RangeInclusive<f64>,
    /// Fixed interval added to every requested duration.
    pub preamble_ms: f64,
    /// Current limit used when the request does not name one.
    pub default_max_current_amps: f64,
    /// Interpretation of a negative current limit.
    pub negative_current: NegativeCurrentPolicy,
}

impl Default for ZapLimits {
    fn default() -> Self {
        ZapLimits {
            voltage_volts: 12.0..=1000.0,
            duration_ms: 0.0..=15.3,
            preamble_ms: 1.0,
            // Transistor safety limit.
            default_max_current_amps: 16.0,
            negative_current: NegativeCurrentPolicy::DisablesAntiArc,
        }
    }
}

impl ZapLimits {
    /// Limits of the first chassis revision, where a negative current
    /// limit was an error rather than an anti-arc override.
    pub fn first_revision() -> Self {
        ZapLimits {
            negative_current: NegativeCurrentPolicy::Reject,
            ..ZapLimits::default()
        }
    }
}

/// A non-fatal notice produced while validating a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// No row was given; the request addresses every row.
    DefaultRow,
    /// No column was given; the request addresses every column.
    DefaultCol,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::DefaultRow => write!(f, "no row specified, using all rows"),
            Advisory::DefaultCol => write!(f, "no col specified, using all columns"),
        }
    }
}

/// A validated value together with the advisories raised while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub value: T,
    pub advisories: Vec<Advisory>,
}

/// One physical test site on the plate, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: u8,
    pub col: u8,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}c{}", self.row, self.col)
    }
}

/// Builder with named optional fields for a [`ZapRequest`].
///
/// Each optional field is validated and defaulted independently by
/// [`build`](ZapRequestBuilder::build).
///
/// # Example
///
/// ```
/// use zappy_core::{ZapLimits, ZapRequestBuilder};
///
/// let zap = ZapRequestBuilder::new(500.0, 10.0)
///     .row(2)
///     .col(3)
///     .build(&ZapLimits::default())
///     .unwrap()
///     .value;
/// assert_eq!((zap.row(), zap.col()), (1, 2));
/// assert_eq!(zap.duration_ms(), 11.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ZapRequestBuilder {
    voltage_volts: f64,
    duration_ms: f64,
    row: Option<i64>,
    col: Option<i64>,
    max_current_amps: Option<f64>,
    energy_cutoff_joules: Option<f64>,
}

impl ZapRequestBuilder {
    /// Start a request for the given target voltage and requested duration
    /// (milliseconds, excluding the preamble).
    pub fn new(voltage_volts: f64, duration_ms: f64) -> Self {
        ZapRequestBuilder {
            voltage_volts,
            duration_ms,
            row: None,
            col: None,
            max_current_amps: None,
            energy_cutoff_joules: None,
        }
    }

    /// Select a single row (1-based).
    pub fn row(mut self, row: i64) -> Self {
        self.row = Some(row);
        self
    }

    /// Select a single column (1-based).
    pub fn col(mut self, col: i64) -> Self {
        self.col = Some(col);
        self
    }

    /// Set the anti-arc current limit in amps.
    pub fn max_current_amps(mut self, amps: f64) -> Self {
        self.max_current_amps = Some(amps);
        self
    }

    /// Set the early-termination energy threshold in joules.
    pub fn energy_cutoff_joules(mut self, joules: f64) -> Self {
        self.energy_cutoff_joules = Some(joules);
        self
    }

    /// Validate every field against `limits` and produce the normalized request.
    pub fn build(self, limits: &ZapLimits) -> Result<Validated<ZapRequest>, ValidationError> {
        let mut advisories = Vec::new();

        if !limits.voltage_volts.contains(&self.voltage_volts) {
            return Err(out_of_range("voltage", self.voltage_volts));
        }
        if !limits.duration_ms.contains(&self.duration_ms) {
            return Err(out_of_range("duration", self.duration_ms));
        }

        let row = match self.row {
            Some(row) => plate_index("row", row, ROW_RANGE)?,
            None => {
                advisories.push(Advisory::DefaultRow);
                ALL_ROWS
            }
        };
        let col = match self.col {
            Some(col) => plate_index("col", col, COL_RANGE)?,
            None => {
                advisories.push(Advisory::DefaultCol);
                ALL_COLS
            }
        };

        let max_current_amps = match self.max_current_amps {
            Some(amps) if !amps.is_finite() => return Err(out_of_range("max_current", amps)),
            Some(amps)
                if amps < 0.0 && limits.negative_current == NegativeCurrentPolicy::Reject =>
            {
                return Err(out_of_range("max_current", amps));
            }
            Some(amps) => amps,
            None => limits.default_max_current_amps,
        };

        let energy_cutoff_counts = match self.energy_cutoff_joules {
            Some(joules) => energy_counts(joules)?,
            None => 0,
        };

        Ok(Validated {
            value: ZapRequest {
                voltage_volts: self.voltage_volts,
                requested_duration_ms: self.duration_ms,
                preamble_ms: limits.preamble_ms,
                row,
                col,
                max_current_amps,
                energy_cutoff_counts,
            },
            advisories,
        })
    }
}

fn out_of_range(field: &'static str, value: impl fmt::Display) -> ValidationError {
    ValidationError::OutOfRange {
        field,
        value: value.to_string(),
    }
}

/// Check a 1-based plate coordinate and convert it to a zero-based index.
fn plate_index(
    field: &'static str,
    value: i64,
    range: RangeInclusive<i64>,
) -> Result<u8, ValidationError> {
    if !range.contains(&value) {
        return Err(out_of_range(field, value));
    }
    u8::try_from(value - 1).map_err(|_| out_of_range(field, value))
}

/// Convert a joule threshold to energy-counter counts.
///
/// The unfloored product must fit the 32-bit counter.
fn energy_counts(joules: f64) -> Result<u32, ValidationError> {
    let product = joules * ONEJOULE;
    if !product.is_finite() || joules < 0.0 || product > u32::MAX as f64 {
        return Err(out_of_range("energy_cutoff", joules));
    }
    Ok(product.floor() as u32)
}

/// A joule threshold that converts back to exactly `counts`.
fn joules_for_counts(counts: u32) -> f64 {
    let target = counts as f64;
    if counts < u32::MAX {
        // Half a count above the target so flooring lands back on it.
        return (target + 0.5) / ONEJOULE;
    }

    // No headroom above the top count: walk the joule value one ulp at a
    // time until the product lands on it exactly.
    let mut joules = target / ONEJOULE;
    for _ in 0..16 {
        let product = joules * ONEJOULE;
        if product > target {
            joules = f64::from_bits(joules.to_bits() - 1);
        } else if product < target {
            joules = f64::from_bits(joules.to_bits() + 1);
        } else {
            break;
        }
    }
    joules
}

/// A normalized pulse request.
///
/// Row and column are zero-based. Construct through [`ZapRequestBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct ZapRequest {
    voltage_volts: f64,
    requested_duration_ms: f64,
    preamble_ms: f64,
    row: u8,
    col: u8,
    max_current_amps: f64,
    energy_cutoff_counts: u32,
}

impl ZapRequest {
    /// Target pulse voltage in volts.
    pub fn voltage_volts(&self) -> f64 {
        self.voltage_volts
    }

    /// Pulse duration in milliseconds, including the preamble.
    pub fn duration_ms(&self) -> f64 {
        self.requested_duration_ms + self.preamble_ms
    }

    /// The duration the caller asked for, without the preamble.
    pub fn requested_duration_ms(&self) -> f64 {
        self.requested_duration_ms
    }

    /// Zero-based row index ([`ALL_ROWS`] for every row).
    pub fn row(&self) -> u8 {
        self.row
    }

    /// Zero-based column index ([`ALL_COLS`] for every column).
    pub fn col(&self) -> u8 {
        self.col
    }

    /// Anti-arc current limit in amps. Negative disables the protection.
    pub fn max_current_amps(&self) -> f64 {
        self.max_current_amps
    }

    /// Energy cutoff in counter counts (0 = disabled).
    pub fn energy_cutoff_counts(&self) -> u32 {
        self.energy_cutoff_counts
    }

    /// Whether anti-arc protection is disabled by a negative limit.
    pub fn anti_arc_disabled(&self) -> bool {
        self.max_current_amps < 0.0
    }

    /// The concrete cells this request touches, in row-major order.
    ///
    /// An all-rows or all-columns index expands to the full sweep.
    pub fn cells(&self) -> Vec<Cell> {
        let rows: Vec<u8> = if self.row == ALL_ROWS {
            (1..=5).collect()
        } else {
            vec![self.row + 1]
        };
        let cols: Vec<u8> = if self.col == ALL_COLS {
            (1..=13).collect()
        } else {
            vec![self.col + 1]
        };

        rows.iter()
            .flat_map(|&row| cols.iter().map(move |&col| Cell { row, col }))
            .collect()
    }

    /// Rebuild a raw command record that validates back to this request.
    pub fn to_raw(&self) -> Value {
        let mut option = Map::new();
        option.insert("row".into(), json!(self.row + 1));
        option.insert("col".into(), json!(self.col + 1));
        option.insert(
            "max_current".into(),
            json!(UnitValue::format(self.max_current_amps, UnitKind::Current)),
        );
        if self.energy_cutoff_counts > 0 {
            let joules = joules_for_counts(self.energy_cutoff_counts);
            option.insert(
                "energy_cutoff".into(),
                json!(UnitValue::format(joules, UnitKind::Energy)),
            );
        }

        json!({
            "name": "Zappy.zap",
            "voltage": UnitValue::format(self.voltage_volts, UnitKind::Voltage),
            "duration": UnitValue::format(self.requested_duration_ms(), UnitKind::Duration),
            "option": Value::Object(option),
        })
    }
}

impl fmt::Display for ZapRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "voltage {} duration {} row {} col {} max_current {} energy_cutoff {}",
            self.voltage_volts,
            self.requested_duration_ms(),
            self.row + 1,
            self.col + 1,
            self.max_current_amps,
            self.energy_cutoff_counts
        )
    }
}

/// Plate clamp action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateAction {
    Lock,
    Unlock,
}

/// A plate lock/unlock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateRequest {
    pub action: PlateAction,
}

/// A validated chassis command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Zap(ZapRequest),
    Lock,
    Unlock,
}

impl Command {
    /// The command name used in raw records (`Zappy.zap`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Command::Zap(_) => "Zappy.zap",
            Command::Lock => "Zappy.lock",
            Command::Unlock => "Zappy.unlock",
        }
    }

    /// The plate request for lock/unlock commands.
    pub fn plate(&self) -> Option<PlateRequest> {
        match self {
            Command::Zap(_) => None,
            Command::Lock => Some(PlateRequest {
                action: PlateAction::Lock,
            }),
            Command::Unlock => Some(PlateRequest {
                action: PlateAction::Unlock,
            }),
        }
    }
}

impl From<PlateRequest> for Command {
    fn from(req: PlateRequest) -> Self {
        match req.action {
            PlateAction::Lock => Command::Lock,
            PlateAction::Unlock => Command::Unlock,
        }
    }
}
