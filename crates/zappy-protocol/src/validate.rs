//! Command validation: raw command records to [`Command`]s.
//!
//! A raw record is a JSON object with a `name` field and, for zaps, the
//! unit-suffixed pulse parameters:
//!
//! ```json
//! {
//!   "name": "Zappy.zap",
//!   "voltage": "500:volts",
//!   "duration": "10:milliseconds",
//!   "option": { "row": 2, "col": 7, "max_current": "4:amps", "energy_cutoff": "0.5:joules" }
//! }
//! ```
//!
//! Validation is pure: no I/O, no chassis. Every `option` field is
//! independently optional and defaulted by [`ZapRequestBuilder`]; a
//! defaulted row or column raises an [`Advisory`](zappy_core::Advisory),
//! which is logged and returned alongside the command.

use serde_json::Value;
use tracing::warn;
use zappy_core::error::ValidationError;
use zappy_core::{Command, UnitKind, UnitValue, Validated, ZapLimits, ZapRequestBuilder};

/// Validate a raw command record against the current [`ZapLimits`].
pub fn validate(raw: &Value) -> Result<Validated<Command>, ValidationError> {
    validate_with(raw, &ZapLimits::default())
}

/// Parse JSON command text and validate it.
///
/// # Example
///
/// ```
/// use zappy_core::{Command, ZapLimits};
/// use zappy_protocol::validate::validate_str;
///
/// let cmd = validate_str(r#"{"name": "Zappy.lock"}"#, &ZapLimits::default()).unwrap();
/// assert_eq!(cmd.value, Command::Lock);
/// ```
pub fn validate_str(text: &str, limits: &ZapLimits) -> Result<Validated<Command>, ValidationError> {
    let raw: Value =
        serde_json::from_str(text).map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
    validate_with(&raw, limits)
}

/// Validate a raw command record against explicit limits.
pub fn validate_with(
    raw: &Value,
    limits: &ZapLimits,
) -> Result<Validated<Command>, ValidationError> {
    let name = match raw.get("name") {
        None | Some(Value::Null) => return Err(ValidationError::MissingName),
        Some(Value::String(name)) => name.as_str(),
        Some(other) => return Err(ValidationError::UnknownCommand(other.to_string())),
    };

    let validated = match name {
        "Zappy.zap" => {
            let zap = zap_builder(raw)?.build(limits)?;
            Validated {
                value: Command::Zap(zap.value),
                advisories: zap.advisories,
            }
        }
        "Zappy.lock" => Validated {
            value: Command::Lock,
            advisories: Vec::new(),
        },
        "Zappy.unlock" => Validated {
            value: Command::Unlock,
            advisories: Vec::new(),
        },
        other => return Err(ValidationError::UnknownCommand(other.to_string())),
    };

    for advisory in &validated.advisories {
        warn!(command = name, "{}", advisory);
    }

    Ok(validated)
}

/// Collect the zap fields of a raw record into a builder.
fn zap_builder(raw: &Value) -> Result<ZapRequestBuilder, ValidationError> {
    let voltage = required_unit(raw, UnitKind::Voltage)?;
    let duration = required_unit(raw, UnitKind::Duration)?;
    let mut builder = ZapRequestBuilder::new(voltage.magnitude(), duration.magnitude());

    let option = match raw.get("option") {
        None | Some(Value::Null) => return Ok(builder),
        Some(Value::Object(option)) => option,
        Some(other) => {
            return Err(ValidationError::MalformedJson(format!(
                "'option' must be an object, got {}",
                other
            )))
        }
    };

    if let Some(row) = plate_coordinate(option.get("row"), "row")? {
        builder = builder.row(row);
    }
    if let Some(col) = plate_coordinate(option.get("col"), "col")? {
        builder = builder.col(col);
    }
    if let Some(current) = optional_unit(option.get("max_current"), UnitKind::Current)? {
        builder = builder.max_current_amps(current.magnitude());
    }
    if let Some(energy) = optional_unit(option.get("energy_cutoff"), UnitKind::Energy)? {
        builder = builder.energy_cutoff_joules(energy.magnitude());
    }

    Ok(builder)
}

fn required_unit(raw: &Value, kind: UnitKind) -> Result<UnitValue, ValidationError> {
    optional_unit(raw.get(kind.field()), kind)?.ok_or(ValidationError::MissingField(kind.field()))
}

fn optional_unit(value: Option<&Value>, kind: UnitKind) -> Result<Option<UnitValue>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => UnitValue::parse(text, kind).map(Some),
        Some(other) => Err(ValidationError::MalformedUnitValue {
            field: kind.field(),
            input: other.to_string(),
        }),
    }
}

/// Read a row or column given as a JSON integer, an integral float such
/// as `2.0`, or an integer string.
fn plate_coordinate(
    value: Option<&Value>,
    field: &'static str,
) -> Result<Option<i64>, ValidationError> {
    let malformed = |input: String| ValidationError::MalformedNumber { field, input };
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
            .map(Some)
            .ok_or_else(|| malformed(n.to_string())),
        Some(Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| malformed(text.clone())),
        Some(other) => Err(malformed(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zappy_core::{Advisory, ALL_COLS, ALL_ROWS};

    fn zap(raw: Value) -> zappy_core::ZapRequest {
        match validate(&raw).unwrap().value {
            Command::Zap(zap) => zap,
            other => panic!("expected zap, got {:?}", other),
        }
    }

    #[test]
    fn minimal_zap_gets_defaults() {
        let validated = validate(&json!({
            "name": "Zappy.zap",
            "voltage": "500:volts",
            "duration": "10:milliseconds"
        }))
        .unwrap();

        assert_eq!(
            validated.advisories,
            vec![Advisory::DefaultRow, Advisory::DefaultCol]
        );
        let Command::Zap(zap) = validated.value else {
            panic!("expected zap");
        };
        assert_eq!(zap.row(), ALL_ROWS);
        assert_eq!(zap.col(), ALL_COLS);
        assert_eq!(zap.max_current_amps(), 16.0);
        assert_eq!(zap.energy_cutoff_counts(), 0);
        assert_eq!(zap.duration_ms(), 11.0);
    }

    #[test]
    fn full_option_record() {
        let zap = zap(json!({
            "name": "Zappy.zap",
            "voltage": "120:Volts",
            "duration": "5:MILLISECONDS",
            "option": {
                "row": 2,
                "col": "7",
                "max_current": "4:amp",
                "energy_cutoff": "1:joule"
            }
        }));
        assert_eq!(zap.voltage_volts(), 120.0);
        assert_eq!(zap.duration_ms(), 6.0);
        assert_eq!((zap.row(), zap.col()), (1, 6));
        assert_eq!(zap.max_current_amps(), 4.0);
        assert_eq!(zap.energy_cutoff_counts(), 591_241_583);
    }

    #[test]
    fn every_cell_maps_zero_based() {
        for row in 1..=5 {
            for col in 1..=13 {
                let zap = zap(json!({
                    "name": "Zappy.zap",
                    "voltage": "100:volts",
                    "duration": "1:milliseconds",
                    "option": {"row": row, "col": col}
                }));
                assert_eq!(zap.row() as i64, row - 1);
                assert_eq!(zap.col() as i64, col - 1);
            }
        }
    }

    #[test]
    fn plate_commands() {
        assert_eq!(
            validate(&json!({"name": "Zappy.lock"})).unwrap().value,
            Command::Lock
        );
        assert_eq!(
            validate(&json!({"name": "Zappy.unlock"})).unwrap().value,
            Command::Unlock
        );
    }

    #[test]
    fn missing_name() {
        assert_eq!(
            validate(&json!({"voltage": "100:volts"})).unwrap_err(),
            ValidationError::MissingName
        );
        assert_eq!(
            validate(&json!(["Zappy.zap"])).unwrap_err(),
            ValidationError::MissingName
        );
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            validate(&json!({"name": "Zappy.fire"})).unwrap_err(),
            ValidationError::UnknownCommand("Zappy.fire".into())
        );
        assert!(matches!(
            validate(&json!({"name": 3})),
            Err(ValidationError::UnknownCommand(_))
        ));
    }

    #[test]
    fn missing_mandatory_fields() {
        assert_eq!(
            validate(&json!({"name": "Zappy.zap", "duration": "1:milliseconds"})).unwrap_err(),
            ValidationError::MissingField("voltage")
        );
        assert_eq!(
            validate(&json!({"name": "Zappy.zap", "voltage": "100:volts"})).unwrap_err(),
            ValidationError::MissingField("duration")
        );
    }

    #[test]
    fn unit_errors_propagate() {
        let err = validate(&json!({
            "name": "Zappy.zap",
            "voltage": "120:v",
            "duration": "1:milliseconds"
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnrecognizedUnit {
                field: "voltage",
                ..
            }
        ));

        let err = validate(&json!({
            "name": "Zappy.zap",
            "voltage": 120,
            "duration": "1:milliseconds"
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MalformedUnitValue {
                field: "voltage",
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_names_field_and_value() {
        let err = validate(&json!({
            "name": "Zappy.zap",
            "voltage": "11.999:volts",
            "duration": "1:milliseconds"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "voltage 11.999 out of range");

        let err = validate(&json!({
            "name": "Zappy.zap",
            "voltage": "100:volts",
            "duration": "1:milliseconds",
            "option": {"row": 6}
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "row 6 out of range");
    }

    #[test]
    fn bad_coordinates() {
        let err = validate(&json!({
            "name": "Zappy.zap",
            "voltage": "100:volts",
            "duration": "1:milliseconds",
            "option": {"col": "seven"}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MalformedNumber { field: "col", .. }
        ));

        let err = validate(&json!({
            "name": "Zappy.zap",
            "voltage": "100:volts",
            "duration": "1:milliseconds",
            "option": {"row": 1.5}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MalformedNumber { field: "row", .. }
        ));
    }

    #[test]
    fn option_must_be_object() {
        let err = validate(&json!({
            "name": "Zappy.zap",
            "voltage": "100:volts",
            "duration": "1:milliseconds",
            "option": "row=1"
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedJson(_)));
    }

    #[test]
    fn null_option_fields_are_absent() {
        let validated = validate(&json!({
            "name": "Zappy.zap",
            "voltage": "100:volts",
            "duration": "1:milliseconds",
            "option": {"row": null, "col": 3, "max_current": null}
        }))
        .unwrap();
        assert_eq!(validated.advisories, vec![Advisory::DefaultRow]);
    }

    #[test]
    fn energy_cutoff_overflow_is_out_of_range() {
        let err = validate(&json!({
            "name": "Zappy.zap",
            "voltage": "100:volts",
            "duration": "1:milliseconds",
            "option": {"energy_cutoff": "8:joules"}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange {
                field: "energy_cutoff",
                ..
            }
        ));
    }

    #[test]
    fn negative_current_follows_limits() {
        let raw = json!({
            "name": "Zappy.zap",
            "voltage": "100:volts",
            "duration": "1:milliseconds",
            "option": {"max_current": "-1:amps"}
        });
        assert!(zap(raw.clone()).anti_arc_disabled());
        assert!(validate_with(&raw, &ZapLimits::first_revision()).is_err());
    }

    #[test]
    fn integral_float_coordinates() {
        let z = zap(json!({
            "name": "Zappy.zap",
            "voltage": "100:volts",
            "duration": "1:milliseconds",
            "option": {"row": 2.0, "col": 13.0}
        }));
        assert_eq!((z.row(), z.col()), (1, 12));

        let err = validate(&json!({
            "name": "Zappy.zap",
            "voltage": "100:volts",
            "duration": "1:milliseconds",
            "option": {"row": 2.5}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MalformedNumber { field: "row", .. }
        ));
    }

    #[test]
    fn malformed_json_text() {
        let err = validate_str("{\"name\": ", &ZapLimits::default()).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedJson(_)));
    }

    #[test]
    fn validation_is_idempotent_through_raw_form() {
        let cases = [
            json!({"name": "Zappy.zap", "voltage": "500:volts", "duration": "10:milliseconds"}),
            json!({
                "name": "Zappy.zap",
                "voltage": "250.5:volts",
                "duration": "2.3:milliseconds",
                "option": {"row": 5, "col": 1, "max_current": "-2.5:amps", "energy_cutoff": "0.123:joules"}
            }),
            json!({
                "name": "Zappy.zap",
                "voltage": "12:volts",
                "duration": "15.3:milliseconds",
                "option": {"row": 3, "col": 13, "energy_cutoff": "7.2:joules"}
            }),
        ];

        for raw in cases {
            let first = zap(raw);
            let second = zap(first.to_raw());
            assert_eq!(first, second);
        }
    }
}
