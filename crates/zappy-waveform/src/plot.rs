//! Plot output for reduced cells.
//!
//! [`PlotSink`] takes a title and the two calibrated series of one cell
//! and produces an image. The PNG renderer [`PngPlotSink`] is only built
//! with the `plot` feature, since its font stack needs system libraries.

use std::path::PathBuf;

use zappy_core::error::Result;
use zappy_core::Cell;

use crate::reduce::CellReduction;

/// Renders calibrated series into an image artifact.
pub trait PlotSink {
    /// Render one cell's slow and fast series under `title`.
    ///
    /// Returns the path of the produced image.
    fn render(&self, cell: Cell, title: &str, slow: &[f64], fast: &[f64]) -> Result<PathBuf>;
}

/// Render a reduction with its standard title.
pub fn render_reduction(sink: &dyn PlotSink, reduction: &CellReduction) -> Result<PathBuf> {
    sink.render(
        reduction.cell,
        &reduction.title(),
        &reduction.slow_series(),
        &reduction.fast_series(),
    )
}

/// Y-axis range covering every finite value, padded when flat.
pub fn value_bounds(series: &[f64]) -> (f64, f64) {
    let (lo, hi) = series
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if lo > hi {
        (0.0, 1.0)
    } else if lo == hi {
        (lo - 1.0, hi + 1.0)
    } else {
        let margin = (hi - lo) * 0.05;
        (lo - margin, hi + margin)
    }
}

#[cfg(feature = "plot")]
pub use png::PngPlotSink;

#[cfg(feature = "plot")]
mod png {
    use std::path::PathBuf;

    use plotters::coord::Shift;
    use plotters::prelude::*;
    use zappy_core::error::{Error, Result};
    use zappy_core::Cell;

    use super::{value_bounds, PlotSink};

    /// Writes `<dir>/r<row>c<col>.png`, slow channel above fast.
    #[derive(Debug, Clone)]
    pub struct PngPlotSink {
        dir: PathBuf,
        width: u32,
        height: u32,
    }

    impl PngPlotSink {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            PngPlotSink {
                dir: dir.into(),
                width: 1200,
                height: 800,
            }
        }

        /// Image size in pixels (default 1200x800).
        pub fn size(mut self, width: u32, height: u32) -> Self {
            self.width = width;
            self.height = height;
            self
        }

        pub fn path_for(&self, cell: Cell) -> PathBuf {
            self.dir.join(format!("{}.png", cell))
        }
    }

    impl PlotSink for PngPlotSink {
        fn render(&self, cell: Cell, title: &str, slow: &[f64], fast: &[f64]) -> Result<PathBuf> {
            std::fs::create_dir_all(&self.dir)?;
            let path = self.path_for(cell);

            let root = BitMapBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(plot_error)?;
            let root = root
                .titled(title, ("sans-serif", 22))
                .map_err(plot_error)?;

            let areas = root.split_evenly((2, 1));
            draw_channel(&areas[0], "Slow channel (capacitor)", slow, &RED)?;
            draw_channel(&areas[1], "Fast channel (cell)", fast, &BLUE)?;
            root.present().map_err(plot_error)?;

            tracing::info!(path = %path.display(), "wrote plot");
            Ok(path)
        }
    }

    fn draw_channel(
        area: &DrawingArea<BitMapBackend, Shift>,
        caption: &str,
        series: &[f64],
        color: &RGBColor,
    ) -> Result<()> {
        let (lo, hi) = value_bounds(series);
        let x_max = series.len().max(1) as f64;

        let mut chart = ChartBuilder::on(area)
            .caption(caption, ("sans-serif", 16))
            .margin(5)
            .x_label_area_size(30)
            .y_label_area_size(55)
            .build_cartesian_2d(0f64..x_max, lo..hi)
            .map_err(plot_error)?;

        chart
            .configure_mesh()
            .x_desc("Sample")
            .y_desc("Volts")
            .y_label_formatter(&|y| format!("{y:.1}"))
            .draw()
            .map_err(plot_error)?;

        chart
            .draw_series(LineSeries::new(
                series.iter().enumerate().map(|(i, &v)| (i as f64, v)),
                color,
            ))
            .map_err(plot_error)?;

        Ok(())
    }

    fn plot_error<E: std::fmt::Display>(e: E) -> Error {
        Error::DataReduction(format!("plot rendering failed: {}", e))
    }
}
