//! Per-cell waveform reduction.
//!
//! After the chassis reports a pass for a zap, every cell the request
//! touched has a capture and an energy counter waiting. The reducer
//! decodes both and applies the active calibration. Cells are independent
//! and are reduced in parallel; any cell failing fails the whole pass.

use rayon::prelude::*;
use tracing::{debug, info};
use zappy_core::error::Result;
use zappy_core::{Cell, ZapRequest};

use crate::calibration::{CalibrationParams, Channel};
use crate::capture::{decode_samples, CaptureSource, EnergyReading};

/// One calibrated time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibratedSample {
    pub slow_volts: f64,
    pub fast_volts: f64,
    pub slow_code: u16,
    pub fast_code: u16,
}

/// The reduced result for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellReduction {
    pub cell: Cell,
    /// Identity of the calibration set applied.
    pub calibration_id: String,
    pub energy: EnergyReading,
    /// Target voltage of the zap.
    pub target_volts: f64,
    /// Requested pulse duration, without the preamble.
    pub duration_ms: f64,
    pub samples: Vec<CalibratedSample>,
}

impl CellReduction {
    /// Delivered energy in joules.
    pub fn energy_joules(&self) -> f64 {
        self.energy.joules()
    }

    /// Calibrated slow-channel series.
    pub fn slow_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.slow_volts).collect()
    }

    /// Calibrated fast-channel series.
    pub fn fast_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.fast_volts).collect()
    }

    /// Plot title naming the cell, the pulse, the energy and the calibration.
    pub fn title(&self) -> String {
        format!(
            "Row {} Col {} | {} V {} ms | {:.6} J | cal {}",
            self.cell.row,
            self.cell.col,
            self.target_volts,
            self.duration_ms,
            self.energy_joules(),
            self.calibration_id
        )
    }
}

/// Applies one calibration set to capture artifacts.
#[derive(Debug, Clone)]
pub struct WaveformReducer {
    calibration: CalibrationParams,
}

impl WaveformReducer {
    pub fn new(calibration: CalibrationParams) -> Self {
        WaveformReducer { calibration }
    }

    /// The calibration set in use.
    pub fn calibration(&self) -> &CalibrationParams {
        &self.calibration
    }

    /// Reduce a single cell.
    pub fn reduce_cell(
        &self,
        source: &dyn CaptureSource,
        zap: &ZapRequest,
        cell: Cell,
    ) -> Result<CellReduction> {
        let raw = source.capture(cell)?;
        let samples = decode_samples(&raw)?;
        let energy = EnergyReading::parse(&source.energy(cell)?)?;

        let samples: Vec<CalibratedSample> = samples
            .iter()
            .map(|s| CalibratedSample {
                slow_volts: self.calibration.volts(s.slow_code, Channel::Slow),
                fast_volts: self.calibration.volts(s.fast_code, Channel::Fast),
                slow_code: s.slow_code,
                fast_code: s.fast_code,
            })
            .collect();

        debug!(
            cell = %cell,
            samples = samples.len(),
            energy_counts = energy.counts,
            "reduced cell"
        );

        Ok(CellReduction {
            cell,
            calibration_id: self.calibration.id.clone(),
            energy,
            target_volts: zap.voltage_volts(),
            duration_ms: zap.requested_duration_ms(),
            samples,
        })
    }

    /// Reduce every cell `zap` touched, in row-major order.
    ///
    /// # Errors
    ///
    /// The first missing or undecodable artifact fails the whole pass;
    /// no partial result is returned.
    pub fn reduce(&self, source: &dyn CaptureSource, zap: &ZapRequest) -> Result<Vec<CellReduction>> {
        let cells = zap.cells();
        let reductions = cells
            .par_iter()
            .map(|&cell| self.reduce_cell(source, zap, cell))
            .collect::<Result<Vec<_>>>()?;

        info!(
            cells = reductions.len(),
            calibration = %self.calibration.id,
            "waveform reduction complete"
        );
        Ok(reductions)
    }
}
