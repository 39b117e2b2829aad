//! Batch adapter: one zap record per row of a CSV file.
//!
//! The header names the columns; `voltage` and `duration` are required,
//! `row`, `col`, `max_current` and `energy_cutoff` may be absent or blank.
//! Cells hold bare numbers and the adapter appends the unit, so a sheet of
//!
//! ```text
//! voltage,duration,row,col,max_current,energy_cutoff
//! 500,10,2,3,,
//! ```
//!
//! becomes the same raw record a hand-written JSON command would be, and
//! goes through the same validator.

use std::io;
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use zappy_core::error::{Error, Result, ValidationError};
use zappy_core::UnitKind;

/// One row of a batch file, as written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchRow {
    pub voltage: String,
    pub duration: String,
    #[serde(default)]
    pub row: Option<String>,
    #[serde(default)]
    pub col: Option<String>,
    #[serde(default)]
    pub max_current: Option<String>,
    #[serde(default)]
    pub energy_cutoff: Option<String>,
}

impl BatchRow {
    /// Build the raw `Zappy.zap` record for this row.
    pub fn to_raw(&self) -> Value {
        let mut option = Map::new();
        if let Some(row) = present(&self.row) {
            option.insert("row".into(), json!(row));
        }
        if let Some(col) = present(&self.col) {
            option.insert("col".into(), json!(col));
        }
        if let Some(current) = present(&self.max_current) {
            option.insert("max_current".into(), json!(with_unit(current, UnitKind::Current)));
        }
        if let Some(energy) = present(&self.energy_cutoff) {
            option.insert("energy_cutoff".into(), json!(with_unit(energy, UnitKind::Energy)));
        }

        let mut raw = json!({
            "name": "Zappy.zap",
            "voltage": with_unit(&self.voltage, UnitKind::Voltage),
            "duration": with_unit(&self.duration, UnitKind::Duration),
        });
        if !option.is_empty() {
            raw["option"] = Value::Object(option);
        }
        raw
    }
}

/// A raw command record with the line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
    /// 1-based line number in the source, header included.
    pub line: u64,
    pub raw: Value,
}

/// Read every row of a batch file into raw command records.
pub fn read_batch<R: io::Read>(reader: R) -> std::result::Result<Vec<BatchRecord>, ValidationError> {
    let malformed = |e: csv::Error| ValidationError::MalformedCsv(e.to_string());
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().map_err(malformed)?.clone();

    let mut records = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(malformed)?;
        let row: BatchRow = record.deserialize(Some(&headers)).map_err(malformed)?;
        records.push(BatchRecord {
            line: record.position().map_or(0, |pos| pos.line()),
            raw: row.to_raw(),
        });
    }

    tracing::debug!(rows = records.len(), "read batch file");
    Ok(records)
}

/// Open and read a batch file.
pub fn read_batch_file(path: &Path) -> Result<Vec<BatchRecord>> {
    let file = std::fs::File::open(path)?;
    read_batch(io::BufReader::new(file)).map_err(Error::from)
}

fn present(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Append the canonical unit unless the cell already carries one.
fn with_unit(cell: &str, kind: UnitKind) -> String {
    let cell = cell.trim();
    if cell.contains(':') {
        cell.to_string()
    } else {
        format!("{}:{}", cell, kind.canonical_unit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate;
    use zappy_core::{Command, ALL_COLS};

    #[test]
    fn rows_become_zap_records() {
        let data = "voltage,duration,row,col,max_current,energy_cutoff\n\
                    500,10,2,3,,\n\
                    120.5,2.5,1,13,4,0.5\n";
        let records = read_batch(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(
            records[0].raw,
            json!({
                "name": "Zappy.zap",
                "voltage": "500:volts",
                "duration": "10:milliseconds",
                "option": {"row": "2", "col": "3"}
            })
        );
        assert_eq!(
            records[1].raw["option"]["max_current"],
            json!("4:amps")
        );
        assert_eq!(
            records[1].raw["option"]["energy_cutoff"],
            json!("0.5:joules")
        );
    }

    #[test]
    fn records_validate() {
        let data = "voltage,duration,row\n250,5,4\n";
        let records = read_batch(data.as_bytes()).unwrap();
        let Command::Zap(zap) = validate(&records[0].raw).unwrap().value else {
            panic!("expected zap");
        };
        assert_eq!(zap.row(), 3);
        assert_eq!(zap.col(), ALL_COLS);
        assert_eq!(zap.duration_ms(), 6.0);
    }

    #[test]
    fn missing_optional_columns_are_absent() {
        let data = "voltage,duration\n100,1\n";
        let records = read_batch(data.as_bytes()).unwrap();
        assert!(records[0].raw.get("option").is_none());
    }

    #[test]
    fn line_numbers_include_header() {
        let data = "voltage,duration\n100,1\n200,2\n";
        let records = read_batch(data.as_bytes()).unwrap();
        assert_eq!(records[0].line, 2);
        assert_eq!(records[1].line, 3);
    }

    #[test]
    fn missing_required_column() {
        let data = "voltage,row\n100,1\n";
        let err = read_batch(data.as_bytes()).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedCsv(_)));
    }

    #[test]
    fn ragged_row_is_malformed() {
        let data = "voltage,duration\n100,1,7\n";
        assert!(matches!(
            read_batch(data.as_bytes()),
            Err(ValidationError::MalformedCsv(_))
        ));
    }

    #[test]
    fn explicit_units_are_kept() {
        assert_eq!(with_unit("12:Volts", UnitKind::Voltage), "12:Volts");
        assert_eq!(with_unit(" 12 ", UnitKind::Voltage), "12:volts");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_batch_file(Path::new("/nonexistent/zappy/batch.csv")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
