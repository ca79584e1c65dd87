//! Two-lap comparison
//!
//! A [`LapComparison`] holds a reference lap and a candidate lap resampled onto the
//! reference's recording interval, so one frame index advances both laps by the same amount
//! of time. The candidate is shown at `reference_frame + shift`, where `shift` usually comes
//! from [`LapComparison::align_at`].
//!
//! ```rust
//! use ghostline::analysis::LapComparison;
//! use ghostline::TelemetryTrace;
//!
//! let reference = TelemetryTrace::new(20.0, vec![0.0, 1.0, 2.0], vec![0.0; 3], vec![0.0; 3])?;
//! let candidate = TelemetryTrace::new(10.0, vec![0.0; 6], vec![0.0; 6], vec![0.0; 6])?;
//! let comparison = LapComparison::new(reference, candidate);
//! assert_eq!(comparison.candidate().recording_interval_ms(), 20.0);
//! assert_eq!(comparison.candidate_frame(2, -1), Some(1));
//! assert_eq!(comparison.candidate_frame(0, -1), None);
//! # Ok::<(), ghostline::ReplayError>(())
//! ```

use tracing::debug;

use crate::align::{Aligner, Alignment};
use crate::config::AnalysisConfig;
use crate::normalize::Normalizer;
use crate::replay::ReplayFile;
use crate::{Result, TelemetryTrace};

/// A reference lap and a candidate lap on a common recording interval.
#[derive(Debug, Clone)]
pub struct LapComparison {
    reference: TelemetryTrace,
    candidate: TelemetryTrace,
    aligner: Aligner,
}

impl LapComparison {
    pub fn new(reference: TelemetryTrace, candidate: TelemetryTrace) -> Self {
        Self::with_config(reference, candidate, &AnalysisConfig::default())
    }

    /// Normalize `candidate` onto the reference interval using `config`.
    pub fn with_config(
        reference: TelemetryTrace,
        candidate: TelemetryTrace,
        config: &AnalysisConfig,
    ) -> Self {
        let candidate = Normalizer::new(config.normalize.clone())
            .normalize(&candidate, reference.recording_interval_ms());
        debug!(
            "Comparing {} reference frames with {} candidate frames at {}ms",
            reference.num_frames(),
            candidate.num_frames(),
            reference.recording_interval_ms()
        );
        Self { reference, candidate, aligner: Aligner::new(config.align.clone()) }
    }

    /// Decode both drivers and build the comparison.
    pub fn from_replays(
        reference: (&ReplayFile, &str),
        candidate: (&ReplayFile, &str),
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let reference_trace = reference.0.decode_driver(reference.1)?;
        let candidate_trace = candidate.0.decode_driver(candidate.1)?;
        Ok(Self::with_config(reference_trace, candidate_trace, config))
    }

    pub fn reference(&self) -> &TelemetryTrace {
        &self.reference
    }

    /// Candidate lap, already on the reference interval.
    pub fn candidate(&self) -> &TelemetryTrace {
        &self.candidate
    }

    /// Search for the candidate frame matching the reference at `reference_frame`.
    pub fn align_at(&self, reference_frame: usize) -> Option<Alignment> {
        self.aligner.align(&self.reference, &self.candidate, reference_frame)
    }

    /// Candidate frame shown at `reference_frame` with `shift` applied, if it exists.
    pub fn candidate_frame(&self, reference_frame: usize, shift: i64) -> Option<usize> {
        let frame = i64::try_from(reference_frame).ok()?.checked_add(shift)?;
        let frame = usize::try_from(frame).ok()?;
        (frame < self.candidate.num_frames()).then_some(frame)
    }

    /// Distance between the two cars at `reference_frame` with `shift` applied.
    pub fn separation(&self, reference_frame: usize, shift: i64) -> Option<f64> {
        let (rx, rz) = self.reference.position(reference_frame)?;
        let (cx, cz) = self.candidate.position(self.candidate_frame(reference_frame, shift)?)?;
        Some((f64::from(rx) - f64::from(cx)).hypot(f64::from(rz) - f64::from(cz)))
    }
}
