//! ADC calibration parameter sets.
//!
//! Each capture channel converts a 12-bit ADC code to volts as
//!
//! ```text
//! v = (code * (FS / 4096) - FS / 8192) * gain + offset
//! ```
//!
//! where `FS` is the ADC full-scale voltage. The gains and offsets have
//! changed between hardware revisions, so they live in a versioned
//! [`CalibrationParams`] set chosen by the caller; the conversion itself
//! never changes.
//!
//! A calibration file is a JSON array of sets:
//!
//! ```json
//! [
//!   {"id": "rev-b", "adc_full_scale_volts": 3.3,
//!    "slow_gain": 412.0, "slow_offset": -1.5,
//!    "fast_gain": 405.5, "fast_offset": 0.8}
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use zappy_core::error::{Error, Result};

/// ADC codes per full scale.
const ADC_COUNTS: f64 = 4096.0;

/// Which capture channel a code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Voltage at the storage capacitor.
    Slow,
    /// Voltage on the cell.
    Fast,
}

/// One calibration revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Identity written into every reduced output.
    pub id: String,
    pub adc_full_scale_volts: f64,
    pub slow_gain: f64,
    pub slow_offset: f64,
    pub fast_gain: f64,
    pub fast_offset: f64,
}

impl CalibrationParams {
    /// Unity gain, zero offset: raw ADC volts.
    pub fn uncalibrated(adc_full_scale_volts: f64) -> Self {
        CalibrationParams {
            id: "uncalibrated".to_string(),
            adc_full_scale_volts,
            slow_gain: 1.0,
            slow_offset: 0.0,
            fast_gain: 1.0,
            fast_offset: 0.0,
        }
    }

    /// Convert one ADC code to calibrated volts.
    ///
    /// # Example
    ///
    /// ```
    /// use zappy_waveform::calibration::{CalibrationParams, Channel};
    ///
    /// let cal = CalibrationParams::uncalibrated(4.096);
    /// // Half a code of offset at 1 mV per code.
    /// assert!((cal.volts(1000, Channel::Slow) - 0.9995).abs() < 1e-12);
    /// ```
    pub fn volts(&self, code: u16, channel: Channel) -> f64 {
        let fs = self.adc_full_scale_volts;
        let (gain, offset) = match channel {
            Channel::Slow => (self.slow_gain, self.slow_offset),
            Channel::Fast => (self.fast_gain, self.fast_offset),
        };
        (code as f64 * (fs / ADC_COUNTS) - fs / (2.0 * ADC_COUNTS)) * gain + offset
    }

    fn check(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::DataReduction("calibration set has an empty id".into()));
        }
        let finite = [
            self.slow_gain,
            self.slow_offset,
            self.fast_gain,
            self.fast_offset,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite || !(self.adc_full_scale_volts.is_finite() && self.adc_full_scale_volts > 0.0) {
            return Err(Error::DataReduction(format!(
                "calibration set {:?} has non-finite or non-positive parameters",
                self.id
            )));
        }
        Ok(())
    }
}

/// The calibration revisions known to a deployment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    sets: Vec<CalibrationParams>,
}

impl CalibrationTable {
    /// Build a table, rejecting duplicate ids and unusable parameters.
    pub fn new(sets: Vec<CalibrationParams>) -> Result<Self> {
        for (i, set) in sets.iter().enumerate() {
            set.check()?;
            if sets[..i].iter().any(|other| other.id == set.id) {
                return Err(Error::DataReduction(format!(
                    "duplicate calibration id {:?}",
                    set.id
                )));
            }
        }
        Ok(CalibrationTable { sets })
    }

    /// Parse a table from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let sets: Vec<CalibrationParams> = serde_json::from_str(text)
            .map_err(|e| Error::DataReduction(format!("bad calibration file: {}", e)))?;
        Self::new(sets)
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), sets = table.sets.len(), "loaded calibration table");
        Ok(table)
    }

    /// Look up a set by id.
    pub fn get(&self, id: &str) -> Result<&CalibrationParams> {
        self.sets
            .iter()
            .find(|set| set.id == id)
            .ok_or_else(|| Error::DataReduction(format!("unknown calibration id {:?}", id)))
    }

    /// The last set in the file, conventionally the newest revision.
    pub fn latest(&self) -> Option<&CalibrationParams> {
        self.sets.last()
    }

    /// All ids, in file order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sets.iter().map(|set| set.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"[
        {"id": "rev-a", "adc_full_scale_volts": 2.5,
         "slow_gain": 400.0, "slow_offset": 0.0, "fast_gain": 400.0, "fast_offset": 0.0},
        {"id": "rev-b", "adc_full_scale_volts": 3.3,
         "slow_gain": 412.0, "slow_offset": -1.5, "fast_gain": 405.5, "fast_offset": 0.8}
    ]"#;

    #[test]
    fn formula_matches_definition() {
        let cal = CalibrationParams {
            id: "t".into(),
            adc_full_scale_volts: 3.3,
            slow_gain: 412.0,
            slow_offset: -1.5,
            fast_gain: 405.5,
            fast_offset: 0.8,
        };
        let code = 2048u16;
        let slow = (2048.0 * (3.3 / 4096.0) - 3.3 / 8192.0) * 412.0 - 1.5;
        let fast = (2048.0 * (3.3 / 4096.0) - 3.3 / 8192.0) * 405.5 + 0.8;
        assert!((cal.volts(code, Channel::Slow) - slow).abs() < 1e-9);
        assert!((cal.volts(code, Channel::Fast) - fast).abs() < 1e-9);
    }

    #[test]
    fn code_zero_is_minus_half_lsb() {
        let cal = CalibrationParams::uncalibrated(4.096);
        assert!((cal.volts(0, Channel::Fast) + 0.0005).abs() < 1e-12);
    }

    #[test]
    fn table_lookup() {
        let table = CalibrationTable::from_json(TABLE).unwrap();
        assert_eq!(table.ids().collect::<Vec<_>>(), vec!["rev-a", "rev-b"]);
        assert_eq!(table.get("rev-b").unwrap().fast_offset, 0.8);
        assert_eq!(table.latest().unwrap().id, "rev-b");
        assert!(matches!(table.get("rev-z"), Err(Error::DataReduction(_))));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let dup = CalibrationParams::uncalibrated(3.3);
        let err = CalibrationTable::new(vec![dup.clone(), dup]).unwrap_err();
        assert!(err.to_string().contains("duplicate calibration id"));
    }

    #[test]
    fn non_positive_full_scale_rejected() {
        assert!(CalibrationTable::new(vec![CalibrationParams::uncalibrated(0.0)]).is_err());
        assert!(CalibrationTable::new(vec![CalibrationParams::uncalibrated(f64::NAN)]).is_err());
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            CalibrationTable::from_json("[{\"id\": \"x\"}]"),
            Err(Error::DataReduction(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        std::fs::write(&path, TABLE).unwrap();
        let table = CalibrationTable::load(&path).unwrap();
        assert_eq!(table.get("rev-a").unwrap().adc_full_scale_volts, 2.5);
    }

    #[test]
    fn load_missing_file_is_io() {
        let err = CalibrationTable::load(Path::new("/nonexistent/cal.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
