//! JSON interchange for decoded traces
//!
//! The JSON shape is the one external viewers consume:
//!
//! ```json
//! { "numFrames": 2, "recordingInterval": 16.0, "x": [..], "z": [..], "rotY": [..],
//!   "rpm": [..], "steering": [..], "throttle": [..], "brake": [..], "gear": [..] }
//! ```
//!
//! Absent optional channels are left out rather than written as `null`.

use std::path::Path;
use tracing::debug;

use crate::{ReplayError, Result, TelemetryTrace};

const REPLAY_EXTENSION: &str = ".acreplay";

pub fn to_json(trace: &TelemetryTrace) -> Result<String> {
    Ok(serde_json::to_string(trace)?)
}

pub fn to_json_pretty(trace: &TelemetryTrace) -> Result<String> {
    Ok(serde_json::to_string_pretty(trace)?)
}

/// Parse and validate a trace.
pub fn from_json(json: &str) -> Result<TelemetryTrace> {
    Ok(serde_json::from_str(json)?)
}

pub fn write_json<P: AsRef<Path>>(path: P, trace: &TelemetryTrace) -> Result<()> {
    let path = path.as_ref();
    let json = to_json(trace)?;
    std::fs::write(path, json).map_err(|e| ReplayError::file_error(path.to_path_buf(), e))?;
    debug!("Wrote {} frames to {}", trace.num_frames(), path.display());
    Ok(())
}

pub fn read_json<P: AsRef<Path>>(path: P) -> Result<TelemetryTrace> {
    let path = path.as_ref();
    let json =
        std::fs::read_to_string(path).map_err(|e| ReplayError::file_error(path.to_path_buf(), e))?;
    from_json(&json)
}

/// File name for an exported trace: `{replay}_{driver}_telemetry.json`.
///
/// The driver name is lower-cased with every character other than an ASCII letter or digit
/// replaced by `_`. A trailing `.acreplay` is removed from the replay name, and an empty
/// replay name becomes `replay`.
pub fn export_file_name(replay_name: &str, driver: &str) -> String {
    let replay = if replay_name.is_empty() { "replay" } else { replay_name };
    let replay = replay.strip_suffix(REPLAY_EXTENSION).unwrap_or(replay);
    let driver: String = driver
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{}_{}_telemetry.json", replay, driver)
}
