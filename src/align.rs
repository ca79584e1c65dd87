//! Lap alignment search
//!
//! Finds the candidate frame whose x/z position is closest to the reference car at a given
//! reference frame. The search is restricted to a window around the reference's progress
//! fraction, which keeps it away from the same spot on a later or earlier lap:
//!
//! 1. The window spans `progress ± window_fraction` of the candidate's frames. When it
//!    crosses either end it is shifted back inside, keeping its width.
//! 2. Up to `sample_count + 1` evenly spaced frames are sampled. Sample frames past the
//!    window are clamped to its upper frame and the repeats are dropped; keeping them would
//!    let the edge frame pass as a minimum by tying with its own copy. Interior samples
//!    whose distance is no larger than either neighbour's are local minima.
//! 3. Each minimum is refined by ternary search over `± refine_radius_steps` coarse steps.
//! 4. The refined frame with the smallest distance wins; the first one wins ties.
//!
//! No local minimum is a normal outcome and yields `None`.
//!
//! ## Sign convention
//!
//! [`Alignment::phase_shift`] is `reference_frame - matched_frame`. Showing the candidate at
//! `reference_frame + candidate_shift()` lines it up with the reference.

use tracing::{debug, trace};

use crate::TelemetryTrace;
use crate::config::AlignConfig;

/// Result of a successful alignment search.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct Alignment {
    /// Reference frame actually used, clamped to the reference trace.
    pub reference_frame: usize,
    /// Best-matching candidate frame.
    pub matched_frame: usize,
    /// `reference_frame - matched_frame`.
    pub phase_shift: i64,
    /// Squared x/z distance between the two positions.
    pub distance_sq: f64,
}

impl Alignment {
    /// Frame offset to apply to the candidate to align it with the reference.
    pub fn candidate_shift(&self) -> i64 {
        -self.phase_shift
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    frame: usize,
    distance: f64,
}

/// Two-stage position search configured by an [`AlignConfig`].
#[derive(Debug, Clone, Default)]
pub struct Aligner {
    config: AlignConfig,
}

impl Aligner {
    pub fn new(config: AlignConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    /// Align `candidate` to `reference` at `reference_frame`.
    pub fn align(
        &self,
        reference: &TelemetryTrace,
        candidate: &TelemetryTrace,
        reference_frame: usize,
    ) -> Option<Alignment> {
        let reference_frame = reference_frame.min(reference.num_frames() - 1);
        let (ref_x, ref_z) = reference.position(reference_frame)?;
        let distance_at = |frame: usize| match candidate.position(frame) {
            Some((x, z)) => {
                let dx = f64::from(x) - f64::from(ref_x);
                let dz = f64::from(z) - f64::from(ref_z);
                dx * dx + dz * dz
            }
            None => f64::INFINITY,
        };

        let progress = reference.progress(reference_frame);
        let (lower_frame, upper_frame) = self.window(progress, candidate.num_frames());
        let step = ((upper_frame - lower_frame) / self.config.sample_count.max(1)).max(1);
        debug!(
            "Aligning reference frame {} over candidate frames {}..={} (step {})",
            reference_frame, lower_frame, upper_frame, step
        );

        let mut samples: Vec<Sample> = Vec::with_capacity(self.config.sample_count + 1);
        for i in 0..=self.config.sample_count {
            let frame = (lower_frame + i * step).min(upper_frame);
            if samples.last().is_some_and(|s| s.frame == frame) {
                continue;
            }
            samples.push(Sample { frame, distance: distance_at(frame) });
        }

        let minima: Vec<Sample> = samples
            .windows(3)
            .filter(|w| w[1].distance <= w[0].distance && w[1].distance <= w[2].distance)
            .map(|w| w[1])
            .collect();
        if minima.is_empty() {
            debug!("No local minimum among {} samples", samples.len());
            return None;
        }
        trace!("{} candidate minima", minima.len());

        let radius = step * self.config.refine_radius_steps;
        let last_frame = candidate.num_frames() - 1;
        let mut best: Option<Sample> = None;
        for minimum in minima {
            let refined = refine(minimum.frame, radius, last_frame, &distance_at);
            trace!(
                "Minimum at {} refined to {} ({:.3})",
                minimum.frame, refined.frame, refined.distance
            );
            if best.is_none_or(|b| refined.distance < b.distance) {
                best = Some(refined);
            }
        }

        let best = best?;
        let alignment = Alignment {
            reference_frame,
            matched_frame: best.frame,
            phase_shift: reference_frame as i64 - best.frame as i64,
            distance_sq: best.distance,
        };
        debug!(
            "Best match at candidate frame {} (distance {:.2}), phase shift {}",
            alignment.matched_frame,
            alignment.distance_sq.sqrt(),
            alignment.phase_shift
        );
        Some(alignment)
    }

    /// Candidate frame bounds of the search window around `progress`.
    fn window(&self, progress: f64, candidate_frames: usize) -> (usize, usize) {
        let half_width = self.config.window_fraction;
        let mut lower = progress - half_width;
        let mut upper = progress + half_width;
        if lower < 0.0 {
            upper = (upper - lower).min(1.0);
            lower = 0.0;
        }
        if upper > 1.0 {
            lower = (lower - (upper - 1.0)).max(0.0);
            upper = 1.0;
        }

        let last = candidate_frames - 1;
        let upper_frame = ((upper * candidate_frames as f64).floor() as usize).min(last);
        let lower_frame = ((lower * candidate_frames as f64).floor() as usize).min(upper_frame);
        (lower_frame, upper_frame)
    }
}

/// Ternary search for the closest frame within `radius` of `center`.
fn refine(
    center: usize,
    radius: usize,
    last_frame: usize,
    distance_at: &impl Fn(usize) -> f64,
) -> Sample {
    let mut left = center.saturating_sub(radius);
    let mut right = (center + radius).min(last_frame);
    while right - left > 2 {
        let third = (right - left) / 3;
        let mid1 = left + third;
        let mid2 = right - third;
        if distance_at(mid1) < distance_at(mid2) {
            right = mid2;
        } else {
            left = mid1;
        }
    }
    let frame = (left + right) / 2;
    Sample { frame, distance: distance_at(frame) }
}

/// Phase shift aligning `candidate` to `reference` at `reference_frame`, using the default
/// search parameters. `None` when no match is found.
pub fn align_phase(
    reference: &TelemetryTrace,
    candidate: &TelemetryTrace,
    reference_frame: usize,
) -> Option<i64> {
    Aligner::default().align(reference, candidate, reference_frame).map(|a| a.phase_shift)
}
