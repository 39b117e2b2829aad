//! # zappy -- Pulse chassis control
//!
//! `zappy` drives a high-voltage pulse chassis over its telnet command port
//! and reduces the waveforms each pulse leaves behind. A command starts as a
//! JSON record, is validated against the active [`ZapLimits`], sent as one
//! `\n\r`-terminated line on a fresh connection, and resolves to a pass, a
//! fail, or a reply timeout.
//!
//! ## Quick Start
//!
//! ```no_run
//! use zappy::ChassisBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ChassisBuilder::new("10.0.11.2").build()?;
//!
//!     let raw = serde_json::json!({
//!         "name": "Zappy.zap",
//!         "voltage": "500:volts",
//!         "duration": "10:milliseconds",
//!         "option": {"row": 2, "col": 3},
//!     });
//!     let command = client.validate(&raw)?.value;
//!     let reply = client.execute(&command).await?.into_result()?;
//!     println!("{}", reply.raw_text);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                | Purpose                                             |
//! |----------------------|-----------------------------------------------------|
//! | `zappy-core`         | Request types, unit values, [`Transport`], errors   |
//! | `zappy-transport`    | TCP transport                                       |
//! | `zappy-protocol`     | Validation, line codec, telnet session, client      |
//! | `zappy-waveform`     | Calibration, capture decoding, reduction, sinks     |
//! | **`zappy`**          | This facade crate -- re-exports everything          |
//!
//! ## Feature Flags
//!
//! | Feature | Enables                                  | Default |
//! |---------|------------------------------------------|---------|
//! | `plot`  | [`waveform::PngPlotSink`] via `plotters` | no      |

pub use zappy_core::*;

/// Chassis protocol: validation, encoding, telnet session, and client.
pub mod protocol {
    pub use zappy_protocol::*;
}

/// TCP transport to the chassis command port.
pub mod transport {
    pub use zappy_transport::*;
}

/// Capture decoding, calibration, and per-cell waveform reduction.
pub mod waveform {
    pub use zappy_waveform::*;
}

pub use zappy_protocol::{ChassisBuilder, ChassisClient, ChassisReply, Outcome};
pub use zappy_waveform::{CalibrationParams, CalibrationTable, WaveformReducer};
