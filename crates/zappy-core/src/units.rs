//! Unit-suffixed value parsing.
//!
//! Every physical quantity in a chassis command is written as
//! `"<number>:<unit>"`, e.g. `"120:volts"` or `"10.5:milliseconds"`. The
//! unit is checked case-insensitively against the set accepted for the
//! field it appears in, so a voltage written in amps is rejected rather
//! than silently misread.

use std::fmt;

use crate::error::ValidationError;

/// The physical quantity a unit-suffixed field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Pulse voltage, in volts.
    Voltage,
    /// Pulse duration, in milliseconds.
    Duration,
    /// Anti-arc current limit, in amps.
    Current,
    /// Energy cutoff, in joules.
    Energy,
}

impl UnitKind {
    /// Field name used in error reports and raw command records.
    pub fn field(self) -> &'static str {
        match self {
            UnitKind::Voltage => "voltage",
            UnitKind::Duration => "duration",
            UnitKind::Current => "max_current",
            UnitKind::Energy => "energy_cutoff",
        }
    }

    /// Unit spellings accepted for this quantity (compared case-insensitively).
    pub fn accepted_units(self) -> &'static [&'static str] {
        match self {
            UnitKind::Voltage => &["volts"],
            UnitKind::Duration => &["milliseconds"],
            UnitKind::Current => &["amp", "amps"],
            UnitKind::Energy => &["joule", "joules"],
        }
    }

    /// The spelling used when writing a value of this kind back out.
    pub fn canonical_unit(self) -> &'static str {
        match self {
            UnitKind::Voltage => "volts",
            UnitKind::Duration => "milliseconds",
            UnitKind::Current => "amps",
            UnitKind::Energy => "joules",
        }
    }

    fn accepts(self, unit: &str) -> bool {
        self.accepted_units()
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(unit))
    }
}

/// A magnitude parsed from a `"<number>:<unit>"` token.
///
/// Immutable once parsed. The unit is kept as written so diagnostics can
/// echo the caller's spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitValue {
    magnitude: f64,
    unit: String,
}

impl UnitValue {
    /// Parse a `"<number>:<unit>"` token for the given field kind.
    ///
    /// Splits on the first `:`. Whitespace around either half is ignored.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MalformedUnitValue`] if there is no `:`.
    /// - [`ValidationError::UnrecognizedUnit`] if the unit is not accepted
    ///   for `kind`.
    /// - [`ValidationError::MalformedNumber`] if the magnitude is not a number.
    ///
    /// # Example
    ///
    /// ```
    /// use zappy_core::{UnitKind, UnitValue};
    ///
    /// let v = UnitValue::parse("120:Volts", UnitKind::Voltage).unwrap();
    /// assert_eq!(v.magnitude(), 120.0);
    /// assert!(UnitValue::parse("120:v", UnitKind::Voltage).is_err());
    /// ```
    pub fn parse(input: &str, kind: UnitKind) -> Result<Self, ValidationError> {
        let (number, unit) =
            input
                .split_once(':')
                .ok_or_else(|| ValidationError::MalformedUnitValue {
                    field: kind.field(),
                    input: input.to_string(),
                })?;

        let unit = unit.trim();
        if !kind.accepts(unit) {
            return Err(ValidationError::UnrecognizedUnit {
                field: kind.field(),
                unit: unit.to_string(),
            });
        }

        let magnitude =
            number
                .trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::MalformedNumber {
                    field: kind.field(),
                    input: number.to_string(),
                })?;

        Ok(UnitValue {
            magnitude,
            unit: unit.to_string(),
        })
    }

    /// Build the canonical token for a magnitude, e.g. `"500:volts"`.
    pub fn format(magnitude: f64, kind: UnitKind) -> String {
        format!("{magnitude}:{}", kind.canonical_unit())
    }

    /// The numeric magnitude.
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// The unit as written by the caller.
    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl fmt::Display for UnitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.magnitude, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_voltage_case_insensitive() {
        let a = UnitValue::parse("120:Volts", UnitKind::Voltage).unwrap();
        let b = UnitValue::parse("120:volts", UnitKind::Voltage).unwrap();
        assert_eq!(a.magnitude(), 120.0);
        assert_eq!(b.magnitude(), 120.0);
        assert_eq!(a.unit(), "Volts");
    }

    #[test]
    fn parse_rejects_abbreviated_unit() {
        let err = UnitValue::parse("120:v", UnitKind::Voltage).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnrecognizedUnit {
                field: "voltage",
                unit: "v".into()
            }
        );
    }

    #[test]
    fn parse_rejects_unit_of_other_field() {
        let err = UnitValue::parse("10:volts", UnitKind::Duration).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnrecognizedUnit {
                field: "duration",
                ..
            }
        ));
    }

    #[test]
    fn parse_current_singular_and_plural() {
        assert_eq!(
            UnitValue::parse("4:amp", UnitKind::Current)
                .unwrap()
                .magnitude(),
            4.0
        );
        assert_eq!(
            UnitValue::parse("4.5:AMPS", UnitKind::Current)
                .unwrap()
                .magnitude(),
            4.5
        );
    }

    #[test]
    fn parse_energy_singular_and_plural() {
        assert!(UnitValue::parse("1:joule", UnitKind::Energy).is_ok());
        assert!(UnitValue::parse("0.25:Joules", UnitKind::Energy).is_ok());
        assert!(UnitValue::parse("0.25:J", UnitKind::Energy).is_err());
    }

    #[test]
    fn parse_missing_separator() {
        let err = UnitValue::parse("120volts", UnitKind::Voltage).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedUnitValue { .. }));
    }

    #[test]
    fn parse_malformed_number() {
        let err = UnitValue::parse("twelve:volts", UnitKind::Voltage).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MalformedNumber {
                field: "voltage",
                input: "twelve".into()
            }
        );
    }

    #[test]
    fn parse_splits_on_first_colon_only() {
        // The unit half becomes "volts:extra", which is not a voltage unit.
        let err = UnitValue::parse("12:volts:extra", UnitKind::Voltage).unwrap_err();
        assert!(matches!(err, ValidationError::UnrecognizedUnit { .. }));
    }

    #[test]
    fn parse_tolerates_whitespace() {
        let v = UnitValue::parse(" 10.5 : milliseconds ", UnitKind::Duration).unwrap();
        assert_eq!(v.magnitude(), 10.5);
    }

    #[test]
    fn format_round_trips() {
        let token = UnitValue::format(500.0, UnitKind::Voltage);
        assert_eq!(token, "500:volts");
        let v = UnitValue::parse(&token, UnitKind::Voltage).unwrap();
        assert_eq!(v.magnitude(), 500.0);
    }
}
