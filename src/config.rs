//! Tunable parameters for driver listing, normalization and alignment
//!
//! Every field has a default reproducing the standard behaviour, so an empty document is a
//! valid configuration. Configuration is read from YAML:
//!
//! ```rust
//! use ghostline::config::{AnalysisConfig, ResampleStrategy};
//!
//! let config = AnalysisConfig::from_yaml_str(
//!     "normalize:\n  strategy: interpolate\nalign:\n  sample_count: 200\n",
//! )?;
//! assert_eq!(config.normalize.strategy, ResampleStrategy::Interpolate);
//! assert_eq!(config.align.sample_count, 200);
//! assert_eq!(config.align.window_fraction, 0.3);
//! # Ok::<(), ghostline::ReplayError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::{ReplayError, Result};

/// Combined configuration for a lap analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct AnalysisConfig {
    pub normalize: NormalizeConfig,
    pub align: AlignConfig,
    pub scan: ScanLimits,
}

impl AnalysisConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| ReplayError::config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ReplayError::file_error(path.to_path_buf(), e))?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        self.normalize.validate()?;
        self.align.validate()?;
        self.scan.validate()
    }
}

/// How a trace is resampled when its interval differs from the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum ResampleStrategy {
    /// Interpolate when upsampling, copy the nearest source frame when downsampling.
    #[default]
    Directional,
    /// Interpolate continuous channels in both directions.
    Interpolate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct NormalizeConfig {
    /// Interval ratios within this distance of 1 are treated as equal.
    pub tolerance: f64,
    pub strategy: ResampleStrategy,
    /// Resampling that would produce more frames than this is skipped.
    pub max_output_frames: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.05,
            strategy: ResampleStrategy::Directional,
            max_output_frames: 10_000_000,
        }
    }
}

impl NormalizeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.tolerance) {
            return Err(ReplayError::config(format!(
                "normalize.tolerance must be in [0, 1), got {}",
                self.tolerance
            )));
        }
        if self.max_output_frames == 0 {
            return Err(ReplayError::config("normalize.max_output_frames must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct AlignConfig {
    /// Coarse grid steps across the search window.
    pub sample_count: usize,
    /// Half-width of the search window as a fraction of the candidate trace.
    pub window_fraction: f64,
    /// Ternary refinement radius, in coarse steps.
    pub refine_radius_steps: usize,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self { sample_count: 100, window_fraction: 0.3, refine_radius_steps: 2 }
    }
}

impl AlignConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_count < 2 {
            return Err(ReplayError::config("align.sample_count must be at least 2"));
        }
        if !(self.window_fraction > 0.0 && self.window_fraction <= 0.5) {
            return Err(ReplayError::config(format!(
                "align.window_fraction must be in (0, 0.5], got {}",
                self.window_fraction
            )));
        }
        if self.refine_radius_steps == 0 {
            return Err(ReplayError::config("align.refine_radius_steps must be at least 1"));
        }
        Ok(())
    }
}

/// Plausibility limits applied while listing drivers by sequential scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct ScanLimits {
    pub max_cars: usize,
    pub max_frames: i32,
    pub max_track_objects: i32,
    pub max_buffer_increment: i32,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_cars: 100,
            max_frames: 100_000,
            max_track_objects: 10_000,
            max_buffer_increment: 1_000,
        }
    }
}

impl ScanLimits {
    pub fn validate(&self) -> Result<()> {
        if self.max_cars == 0
            || self.max_frames <= 0
            || self.max_track_objects <= 0
            || self.max_buffer_increment <= 0
        {
            return Err(ReplayError::config("scan limits must all be positive"));
        }
        Ok(())
    }
}
