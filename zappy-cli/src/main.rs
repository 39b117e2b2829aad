// zappy -- command-line driver for the pulse chassis.
//
// Reads one JSON command record (or a CSV batch of zaps), validates it,
// sends it to the chassis, and optionally reduces the captured waveforms
// of every cell a passing zap touched.
//
// Usage:
//   zappy --file zap.json
//   zappy --target 10.0.11.2 --file lock.json --verbose
//   zappy --file zap.json --dry-run
//   zappy --batch sweep.csv --keep-going
//   zappy --file zap.json --capture-dir /mnt/capture --output-dir out \
//       --calibration cal.json --calibration-id rev-b --plot

use std::future::Future;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use zappy::protocol::batch::{read_batch_file, BatchRecord};
use zappy::protocol::builder::{DEFAULT_PORT, DEFAULT_REPLY_TIMEOUT};
use zappy::protocol::protocol::encode;
use zappy::protocol::validate::validate_str;
use zappy::waveform::plot::{render_reduction, PlotSink};
use zappy::waveform::{CaptureDir, CsvSink};
use zappy::{
    CalibrationParams, CalibrationTable, ChassisBuilder, ChassisClient, Command, WaveformReducer,
    ZapRequest,
};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// zappy -- send JSON commands to the pulse chassis.
#[derive(Parser, Debug)]
#[command(name = "zappy", version, about)]
struct Cli {
    /// IP address of the chassis logic board.
    #[arg(short, long, default_value = "10.0.11.2")]
    target: IpAddr,

    /// Chassis command port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// JSON command file.
    #[arg(short, long, default_value = "zap.json")]
    file: PathBuf,

    /// CSV file of zaps to run in order, instead of --file.
    #[arg(long)]
    batch: Option<PathBuf>,

    /// Validate and print the command line without connecting.
    #[arg(short, long)]
    dry_run: bool,

    /// Log the wire traffic (debug level unless RUST_LOG is set).
    #[arg(short, long)]
    verbose: bool,

    /// Seconds to wait for the chassis status reply.
    #[arg(long, default_value_t = DEFAULT_REPLY_TIMEOUT.as_secs_f64())]
    timeout: f64,

    /// Directory holding r<row>c<col>.bin / .hex capture artifacts.
    /// When given, every cell of a passing zap is reduced.
    #[arg(long)]
    capture_dir: Option<PathBuf>,

    /// Where reduced CSV files (and plots) are written.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// JSON file of calibration parameter sets.
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Calibration set to apply (default: the last set in the file).
    #[arg(long)]
    calibration_id: Option<String>,

    /// ADC full-scale voltage used when no calibration file is given.
    #[arg(long, default_value_t = 3.3)]
    full_scale: f64,

    /// Render a PNG per reduced cell.
    #[arg(long)]
    plot: bool,

    /// In batch mode, continue past failed rows.
    #[arg(long)]
    keep_going: bool,
}

/// Reject flag combinations clap cannot express.
fn validate_options(cli: &Cli) -> Result<()> {
    if !cli.timeout.is_finite() || cli.timeout <= 0.0 {
        bail!("--timeout must be a positive number of seconds");
    }
    if cli.keep_going && cli.batch.is_none() {
        bail!("--keep-going is only valid with --batch");
    }
    if cli.calibration_id.is_some() && cli.calibration.is_none() {
        bail!("--calibration-id requires --calibration");
    }
    if cli.capture_dir.is_none() {
        if cli.plot {
            bail!("--plot requires --capture-dir");
        }
        if cli.calibration.is_some() {
            bail!("--calibration requires --capture-dir");
        }
    }
    if !cli.full_scale.is_finite() || cli.full_scale <= 0.0 {
        bail!("--full-scale must be a positive voltage");
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ---------------------------------------------------------------------------
// Waveform reduction
// ---------------------------------------------------------------------------

/// Everything needed to reduce a passing zap.
struct Reduction {
    source: CaptureDir,
    reducer: WaveformReducer,
    csv: CsvSink,
    plot: Option<Box<dyn PlotSink>>,
}

impl Reduction {
    fn from_cli(cli: &Cli) -> Result<Option<Self>> {
        let Some(capture_dir) = &cli.capture_dir else {
            return Ok(None);
        };

        let calibration = match &cli.calibration {
            Some(path) => select_calibration(path, cli.calibration_id.as_deref())?,
            None => CalibrationParams::uncalibrated(cli.full_scale),
        };
        info!(calibration = %calibration.id, "using calibration");

        let plot = if cli.plot {
            Some(plot_sink(&cli.output_dir)?)
        } else {
            None
        };

        Ok(Some(Reduction {
            source: CaptureDir::new(capture_dir),
            reducer: WaveformReducer::new(calibration),
            csv: CsvSink::new(&cli.output_dir),
            plot,
        }))
    }

    fn run(&self, zap: &ZapRequest) -> Result<()> {
        let reductions = self
            .reducer
            .reduce(&self.source, zap)
            .context("waveform reduction failed")?;

        for reduction in &reductions {
            let path = self.csv.write(reduction)?;
            println!("{}: {:.6} J -> {}", reduction.cell, reduction.energy_joules(), path.display());
            if let Some(sink) = &self.plot {
                let image = render_reduction(sink.as_ref(), reduction)?;
                println!("{}: plot -> {}", reduction.cell, image.display());
            }
        }
        Ok(())
    }
}

fn select_calibration(path: &Path, id: Option<&str>) -> Result<CalibrationParams> {
    let table = CalibrationTable::load(path)
        .with_context(|| format!("loading calibration {}", path.display()))?;
    match id {
        Some(id) => Ok(table.get(id)?.clone()),
        None => table
            .latest()
            .cloned()
            .with_context(|| format!("{} holds no calibration sets", path.display())),
    }
}

#[cfg(feature = "plot")]
fn plot_sink(dir: &Path) -> Result<Box<dyn PlotSink>> {
    Ok(Box::new(zappy::waveform::PngPlotSink::new(dir)))
}

#[cfg(not(feature = "plot"))]
fn plot_sink(_dir: &Path) -> Result<Box<dyn PlotSink>> {
    bail!("--plot needs a build with the `plot` feature enabled")
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run_command(
    cli: &Cli,
    client: &ChassisClient,
    reduction: Option<&Reduction>,
    command: &Command,
) -> Result<()> {
    match command {
        Command::Zap(zap) => println!("Parsing successful: {}", zap),
        other => println!("Parsing successful: {}", other.name()),
    }

    if cli.dry_run {
        let wire = encode(command);
        println!("telnet> {}", String::from_utf8_lossy(&wire).trim_end());
        return Ok(());
    }

    let reply = client
        .execute(command)
        .await
        .with_context(|| format!("error sending {} to {}", command.name(), client.addr()))?
        .into_result()
        .with_context(|| format!("{} failed", command.name()))?;
    println!("{}: {}", command.name(), reply.raw_text);

    // The connection is closed by now; reduction never holds it open.
    if let (Command::Zap(zap), Some(reduction)) = (command, reduction) {
        tokio::task::block_in_place(|| reduction.run(zap))?;
    }
    Ok(())
}

async fn cmd_file(cli: &Cli, client: &ChassisClient, reduction: Option<&Reduction>) -> Result<()> {
    let text = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("error opening file {}", cli.file.display()))?;
    let command = validate_str(&text, client.limits())?.value;
    run_command(cli, client, reduction, &command).await
}

/// Rows attempted and rows that failed in a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BatchSummary {
    total: usize,
    failed: usize,
}

/// Run every record in order through `run`.
///
/// Without `keep_going` the first failure ends the batch and is returned
/// with its line number. With it, failures are logged and counted.
async fn run_batch<F, Fut>(records: &[BatchRecord], keep_going: bool, mut run: F) -> Result<BatchSummary>
where
    F: FnMut(&BatchRecord) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut failed = 0usize;
    for record in records {
        if let Err(e) = run(record).await {
            let e = e.context(format!("batch line {}", record.line));
            if !keep_going {
                return Err(e);
            }
            error!(line = record.line, "{:#}", e);
            failed += 1;
        }
    }
    Ok(BatchSummary {
        total: records.len(),
        failed,
    })
}

async fn cmd_batch(
    cli: &Cli,
    client: &ChassisClient,
    reduction: Option<&Reduction>,
    path: &Path,
) -> Result<()> {
    let records = read_batch_file(path)
        .with_context(|| format!("error reading batch {}", path.display()))?;

    let summary = run_batch(&records, cli.keep_going, |record| {
        let raw = record.raw.clone();
        async move {
            let command = client.validate(&raw)?.value;
            run_command(cli, client, reduction, &command).await
        }
    })
    .await?;

    println!(
        "batch complete: {} of {} rows succeeded",
        summary.total - summary.failed,
        summary.total
    );
    if summary.failed > 0 {
        bail!("{} batch rows failed", summary.failed);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    validate_options(&cli)?;

    let reply_timeout =
        Duration::try_from_secs_f64(cli.timeout).context("--timeout is out of range")?;
    let client = ChassisBuilder::new(&cli.target.to_string())
        .port(cli.port)
        .reply_timeout(reply_timeout)
        .build()?;
    let reduction = Reduction::from_cli(&cli)?;

    match &cli.batch {
        Some(path) => cmd_batch(&cli, &client, reduction.as_ref(), path).await,
        None => cmd_file(&cli, &client, reduction.as_ref()).await,
    }
}
