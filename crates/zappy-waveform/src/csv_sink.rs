//! CSV output for reduced cells.
//!
//! One file per cell. A short header block identifies the calibration,
//! the energy reading and the pulse, then one row per time step:
//!
//! ```text
//! calibration,rev-b
//! energy_joules,0.0123
//! energy_counts,7272271
//! row,2
//! col,3
//! target_volts,500
//! duration_ms,10
//! slow_volts,fast_volts,slow_code,fast_code
//! 411.2,398.7,2040,1986
//! ...
//! ```

use std::io;
use std::path::{Path, PathBuf};

use zappy_core::error::Result;
use zappy_core::Cell;

use crate::reduce::CellReduction;

/// Write one reduction as CSV.
pub fn write_reduction<W: io::Write>(writer: W, reduction: &CellReduction) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    let header: [(&str, String); 7] = [
        ("calibration", reduction.calibration_id.clone()),
        ("energy_joules", reduction.energy_joules().to_string()),
        ("energy_counts", reduction.energy.counts.to_string()),
        ("row", reduction.cell.row.to_string()),
        ("col", reduction.cell.col.to_string()),
        ("target_volts", reduction.target_volts.to_string()),
        ("duration_ms", reduction.duration_ms.to_string()),
    ];
    for (key, value) in &header {
        wtr.write_record([*key, value.as_str()]).map_err(io::Error::from)?;
    }

    wtr.write_record(["slow_volts", "fast_volts", "slow_code", "fast_code"])
        .map_err(io::Error::from)?;
    for s in &reduction.samples {
        wtr.write_record([
            s.slow_volts.to_string(),
            s.fast_volts.to_string(),
            s.slow_code.to_string(),
            s.fast_code.to_string(),
        ])
        .map_err(io::Error::from)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes each reduction to `<dir>/r<row>c<col>.csv`.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvSink { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Output path for `cell`.
    pub fn path_for(&self, cell: Cell) -> PathBuf {
        self.dir.join(format!("{}.csv", cell))
    }

    /// Write one reduction, creating the output directory if needed.
    pub fn write(&self, reduction: &CellReduction) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(reduction.cell);
        let file = std::fs::File::create(&path)?;
        write_reduction(io::BufWriter::new(file), reduction)?;
        tracing::info!(path = %path.display(), samples = reduction.samples.len(), "wrote CSV");
        Ok(path)
    }
}
