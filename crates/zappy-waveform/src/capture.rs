//! Capture and energy-counter decoding.
//!
//! After a pulse the chassis leaves two artifacts per cell:
//!
//! - a capture: little-endian `u16` values interleaved as `(slow, fast)`
//!   pairs, one pair per time step;
//! - an energy counter: a signed integer written as ASCII hex, where the
//!   sign bit is the top bit of the digits as written (`"F"` is -1,
//!   `"0F"` is 15).
//!
//! [`CaptureSource`] abstracts where those artifacts come from;
//! [`CaptureDir`] reads them from a directory laid out as
//! `r<row>c<col>.bin` / `r<row>c<col>.hex`.

use std::path::{Path, PathBuf};

use zappy_core::error::{Error, Result};
use zappy_core::{Cell, ENERGY_COEFF};

/// Maximum hex digits in an energy counter.
const MAX_HEX_DIGITS: usize = 16;

/// One time step of a capture: raw ADC codes for both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformSample {
    pub slow_code: u16,
    pub fast_code: u16,
}

/// Decode a capture into `(slow, fast)` pairs.
///
/// An odd number of 16-bit values leaves a trailing half pair, which is
/// dropped, so a capture of zero or one value yields no samples.
///
/// # Errors
///
/// [`Error::DataReduction`] if the capture ends in the middle of a 16-bit
/// value.
///
/// # Example
///
/// ```
/// use zappy_waveform::capture::decode_samples;
///
/// // Three u16 values: one full pair plus a dropped half pair.
/// let samples = decode_samples(&[0x01, 0x00, 0x02, 0x00, 0xFF, 0x0F]).unwrap();
/// assert_eq!(samples.len(), 1);
/// assert_eq!((samples[0].slow_code, samples[0].fast_code), (1, 2));
/// ```
pub fn decode_samples(bytes: &[u8]) -> Result<Vec<WaveformSample>> {
    if bytes.len() % 2 != 0 {
        return Err(Error::DataReduction(format!(
            "capture is truncated: {} bytes is not a whole number of 16-bit values",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|pair| WaveformSample {
            slow_code: u16::from_le_bytes([pair[0], pair[1]]),
            fast_code: u16::from_le_bytes([pair[2], pair[3]]),
        })
        .collect())
}

/// Parse an ASCII-hex counter as a signed integer.
///
/// Whitespace around the digits and a `0x` prefix are ignored. The sign
/// bit is the most significant bit of `4 * digits` bits.
///
/// # Example
///
/// ```
/// use zappy_waveform::capture::parse_signed_hex;
///
/// assert_eq!(parse_signed_hex("F").unwrap(), -1);
/// assert_eq!(parse_signed_hex("0F").unwrap(), 15);
/// assert!(parse_signed_hex("").is_err());
/// ```
pub fn parse_signed_hex(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(Error::DataReduction("energy counter is empty".into()));
    }
    if digits.len() > MAX_HEX_DIGITS || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::DataReduction(format!(
            "energy counter {:?} is not a hex value of at most {} digits",
            trimmed, MAX_HEX_DIGITS
        )));
    }

    let raw = u64::from_str_radix(digits, 16)
        .map_err(|e| Error::DataReduction(format!("energy counter {:?}: {}", trimmed, e)))?;
    let bits = 4 * digits.len() as u32;
    if bits == 64 {
        return Ok(raw as i64);
    }
    let sign = 1u64 << (bits - 1);
    if raw & sign != 0 {
        Ok(raw as i64 - (1i64 << bits))
    } else {
        Ok(raw as i64)
    }
}

/// An energy-counter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyReading {
    pub counts: i64,
}

impl EnergyReading {
    /// Decode the ASCII-hex counter text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(EnergyReading {
            counts: parse_signed_hex(text)?,
        })
    }

    /// Delivered energy in joules.
    pub fn joules(&self) -> f64 {
        self.counts as f64 * ENERGY_COEFF
    }
}

/// Where per-cell capture artifacts come from.
pub trait CaptureSource: Send + Sync {
    /// Raw capture bytes for `cell`.
    fn capture(&self, cell: Cell) -> Result<Vec<u8>>;

    /// Energy-counter text for `cell`.
    fn energy(&self, cell: Cell) -> Result<String>;
}

/// Capture artifacts stored as files in one directory.
#[derive(Debug, Clone)]
pub struct CaptureDir {
    dir: PathBuf,
}

impl CaptureDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CaptureDir { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the capture file for `cell`.
    pub fn capture_path(&self, cell: Cell) -> PathBuf {
        self.dir.join(format!("{}.bin", cell))
    }

    /// Path of the energy-counter file for `cell`.
    pub fn energy_path(&self, cell: Cell) -> PathBuf {
        self.dir.join(format!("{}.hex", cell))
    }
}

impl CaptureSource for CaptureDir {
    fn capture(&self, cell: Cell) -> Result<Vec<u8>> {
        let path = self.capture_path(cell);
        std::fs::read(&path).map_err(|e| unreadable(&path, e))
    }

    fn energy(&self, cell: Cell) -> Result<String> {
        let path = self.energy_path(cell);
        std::fs::read_to_string(&path).map_err(|e| unreadable(&path, e))
    }
}

fn unreadable(path: &Path, e: std::io::Error) -> Error {
    Error::DataReduction(format!("cannot read {}: {}", path.display(), e))
}
