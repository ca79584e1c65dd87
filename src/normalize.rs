//! Frame-rate normalization
//!
//! Brings a trace onto a target recording interval while keeping its duration. The ratio
//! `native / target` decides the direction:
//!
//! - **Upsampling** (ratio > 1): output frame `i` maps to source position `i / ratio`;
//!   continuous channels are linearly interpolated between the neighbouring source frames
//!   and `gear` takes the nearest source frame.
//! - **Downsampling** (ratio < 1): output frame `i` copies every channel from source frame
//!   `round(i / ratio)`, unless [`ResampleStrategy::Interpolate`] is selected, in which case
//!   both directions interpolate.
//!
//! Ratios within the configured tolerance of 1 leave the trace untouched, as do targets that
//! would need more than `max_output_frames` frames.
//!
//! ```rust
//! use ghostline::{TelemetryTrace, normalize};
//!
//! let trace = TelemetryTrace::new(20.0, vec![0.0, 2.0, 4.0], vec![0.0; 3], vec![0.0; 3])?;
//! let fine = normalize(&trace, 10.0);
//! assert_eq!(fine.num_frames(), 6);
//! assert_eq!(fine.x()[..4], [0.0, 1.0, 2.0, 3.0]);
//! # Ok::<(), ghostline::ReplayError>(())
//! ```

use tracing::{debug, warn};

use crate::TelemetryTrace;
use crate::config::{NormalizeConfig, ResampleStrategy};

/// Resamples traces according to a [`NormalizeConfig`].
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Resample `trace` to `target_interval_ms`.
    ///
    /// Never fails: a non-positive or non-finite target returns the trace unchanged.
    pub fn normalize(&self, trace: &TelemetryTrace, target_interval_ms: f64) -> TelemetryTrace {
        if !(target_interval_ms.is_finite() && target_interval_ms > 0.0) {
            warn!("Ignoring normalization to invalid interval {}ms", target_interval_ms);
            return trace.clone();
        }

        let native = trace.recording_interval_ms();
        let ratio = native / target_interval_ms;
        if native == target_interval_ms || (ratio - 1.0).abs() < self.config.tolerance {
            debug!(
                "Interval {}ms already matches {}ms, not resampling",
                native, target_interval_ms
            );
            return trace.clone();
        }

        let source_frames = trace.num_frames();
        let scaled = (source_frames as f64 * ratio).round();
        if !scaled.is_finite() || scaled > self.config.max_output_frames as f64 {
            warn!(
                "Resampling {} frames from {}ms to {}ms needs {} frames (limit {}), skipping",
                source_frames, native, target_interval_ms, scaled, self.config.max_output_frames
            );
            return trace.clone();
        }
        let output_frames = (scaled as usize).max(1);
        let interpolate = ratio > 1.0 || self.config.strategy == ResampleStrategy::Interpolate;
        debug!(
            "Resampling {} frames at {}ms to {} frames at {}ms (ratio {:.3}, {})",
            source_frames,
            native,
            output_frames,
            target_interval_ms,
            ratio,
            if interpolate { "interpolate" } else { "nearest" }
        );

        let position = |i: usize| i as f64 / ratio;
        if interpolate {
            trace.resample_with(
                target_interval_ms,
                output_frames,
                |values, i| lerp_at(values, position(i)),
                |values, i| values[nearest_index(position(i), values.len())],
            )
        } else {
            trace.resample_with(
                target_interval_ms,
                output_frames,
                |values, i| values[nearest_index(position(i), values.len())],
                |values, i| values[nearest_index(position(i), values.len())],
            )
        }
    }
}

/// Resample `trace` to `target_interval_ms` with the default configuration.
pub fn normalize(trace: &TelemetryTrace, target_interval_ms: f64) -> TelemetryTrace {
    Normalizer::default().normalize(trace, target_interval_ms)
}

fn nearest_index(position: f64, len: usize) -> usize {
    (position.round() as usize).min(len - 1)
}

fn lerp_at(values: &[f32], position: f64) -> f32 {
    let last = values.len() - 1;
    let lower = (position.floor() as usize).min(last);
    let upper = (position.ceil() as usize).min(last);
    let t = (position - lower as f64) as f32;
    values[lower] + (values[upper] - values[lower]) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::circuit_trace;
    use proptest::prelude::*;

    fn ramp(frames: usize, interval: f64) -> TelemetryTrace {
        let x: Vec<f32> = (0..frames).map(|i| i as f32 * 10.0).collect();
        let z = x.iter().map(|v| -v).collect();
        let rot_y = vec![0.5; frames];
        let gear = (0..frames).map(|i| (1 + i % 5) as u8).collect();
        TelemetryTrace::new(interval, x, z, rot_y).unwrap().with_gear(gear).unwrap()
    }

    #[test]
    fn same_interval_is_identity() {
        let trace = circuit_trace(250, 16.666);
        assert_eq!(normalize(&trace, 16.666), trace);
    }

    #[test]
    fn near_equal_interval_is_skipped() {
        let trace = ramp(40, 20.0);
        assert_eq!(normalize(&trace, 20.5), trace);
        assert_eq!(normalize(&trace, 19.2), trace);
        assert_ne!(normalize(&trace, 18.0).num_frames(), 40);
    }

    #[test]
    fn doubling_keeps_even_frames_exact() {
        let trace = circuit_trace(300, 20.0);
        let fine = normalize(&trace, 10.0);
        assert_eq!(fine.num_frames(), 600);
        assert_eq!(fine.recording_interval_ms(), 10.0);

        for i in (0..600).step_by(2) {
            assert_eq!(fine.x()[i], trace.x()[i / 2]);
            assert_eq!(fine.z()[i], trace.z()[i / 2]);
            assert_eq!(fine.rot_y()[i], trace.rot_y()[i / 2]);
            assert_eq!(fine.rpm().unwrap()[i], trace.rpm().unwrap()[i / 2]);
            assert_eq!(fine.gear().unwrap()[i], trace.gear().unwrap()[i / 2]);
        }
        // Odd frames sit halfway between their neighbours.
        assert!((fine.x()[3] - (trace.x()[1] + trace.x()[2]) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn upsampling_past_the_end_clamps_to_last_frame() {
        let fine = normalize(&ramp(4, 30.0), 10.0);
        assert_eq!(fine.num_frames(), 12);
        assert_eq!(fine.x()[11], 30.0);
        assert_eq!(fine.x()[10], 30.0);
    }

    #[test]
    fn downsampling_copies_nearest_frame() {
        let trace = ramp(9, 10.0);
        let coarse = normalize(&trace, 30.0);
        assert_eq!(coarse.num_frames(), 3);
        assert_eq!(coarse.x(), &[0.0, 30.0, 60.0]);
        assert_eq!(coarse.gear().unwrap(), &[1, 4, 2]);
    }

    #[test]
    fn interpolate_strategy_blends_on_downsampling() {
        let trace = ramp(10, 10.0);
        let directional = normalize(&trace, 25.0);
        let blended = Normalizer::new(NormalizeConfig {
            strategy: ResampleStrategy::Interpolate,
            ..NormalizeConfig::default()
        })
        .normalize(&trace, 25.0);

        assert_eq!(directional.num_frames(), 4);
        assert_eq!(blended.num_frames(), 4);
        // Output frame 1 maps to source position 2.5.
        assert_eq!(directional.x()[1], 30.0);
        assert_eq!(blended.x()[1], 25.0);
        assert_eq!(blended.gear().unwrap()[1], directional.gear().unwrap()[1]);
    }

    #[test]
    fn invalid_target_returns_input() {
        let trace = ramp(5, 20.0);
        assert_eq!(normalize(&trace, 0.0), trace);
        assert_eq!(normalize(&trace, -5.0), trace);
        assert_eq!(normalize(&trace, f64::NAN), trace);
    }

    #[test]
    fn oversized_output_returns_input() {
        let slow = ramp(3, 1e12);
        assert_eq!(normalize(&slow, 16.0), slow);
        assert_eq!(normalize(&slow, f64::MIN_POSITIVE), slow);

        let capped = Normalizer::new(NormalizeConfig {
            max_output_frames: 20,
            ..NormalizeConfig::default()
        });
        let trace = ramp(10, 20.0);
        assert_eq!(capped.normalize(&trace, 10.0).num_frames(), 20);
        assert_eq!(capped.normalize(&trace, 5.0), trace);
    }

    #[test]
    fn absent_channels_stay_absent() {
        let trace = ramp(10, 20.0);
        let fine = normalize(&trace, 10.0);
        assert!(fine.rpm().is_none());
        assert!(fine.throttle().is_none());
        assert_eq!(fine.gear().map(|g| g.len()), Some(20));
    }

    proptest! {
        #[test]
        fn prop_output_is_consistent(
            frames in 1usize..200,
            native in 5.0f64..50.0,
            target in 5.0f64..50.0,
        ) {
            let trace = circuit_trace(frames, native);
            let result = normalize(&trace, target);

            let n = result.num_frames();
            prop_assert!(n >= 1);
            prop_assert_eq!(result.x().len(), n);
            prop_assert_eq!(result.z().len(), n);
            prop_assert_eq!(result.rot_y().len(), n);
            prop_assert_eq!(result.rpm().map(|c| c.len()), Some(n));
            prop_assert_eq!(result.gear().map(|c| c.len()), Some(n));

            if result != trace {
                let drift = (result.duration_ms() - trace.duration_ms()).abs();
                // A single output frame cannot shrink below one target interval.
                prop_assert!(n == 1 || drift <= target / 2.0 + 1e-6, "duration drift {}", drift);
            }

            let source_gears = trace.gear().unwrap();
            for gear in result.gear().unwrap() {
                prop_assert!(source_gears.contains(gear));
            }
        }
    }
}
