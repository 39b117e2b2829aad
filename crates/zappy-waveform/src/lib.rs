//! Waveform reduction for zappy.
//!
//! Turns the raw artifacts a pulse leaves behind into calibrated series:
//!
//! - **Capture decoding** ([`capture`]) -- interleaved little-endian `u16`
//!   `(slow, fast)` pairs and the ASCII-hex signed energy counter, read
//!   through a [`CaptureSource`].
//! - **Calibration** ([`calibration`]) -- versioned gain/offset sets,
//!   loadable from JSON and selected by id.
//! - **Reduction** ([`reduce`]) -- [`WaveformReducer`] sweeps every cell a
//!   zap touched, in parallel, and fails the pass on the first bad cell.
//! - **Sinks** ([`csv_sink`], [`plot`]) -- one CSV per cell, and a PNG per
//!   cell with the `plot` feature.

pub mod calibration;
pub mod capture;
pub mod csv_sink;
pub mod plot;
pub mod reduce;

pub use calibration::{CalibrationParams, CalibrationTable, Channel};
pub use capture::{CaptureDir, CaptureSource, EnergyReading, WaveformSample};
pub use csv_sink::CsvSink;
pub use plot::PlotSink;
#[cfg(feature = "plot")]
pub use plot::PngPlotSink;
pub use reduce::{CalibratedSample, CellReduction, WaveformReducer};
