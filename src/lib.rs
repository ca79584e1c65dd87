//! Replay telemetry extraction, frame-rate normalization and lap alignment.
//!
//! Ghostline reads racing-simulator replay files (version 16 `.acreplay` containers),
//! recovers one driver's frame-by-frame motion record, brings two records onto a common
//! recording interval and finds the frame offset that lines two laps up.
//!
//! # Features
//!
//! - **Bounds-checked decoding**: every read is validated; failures name the byte offset
//! - **Driver lookup**: trailer metadata when present, sequential car scan otherwise
//! - **Resampling**: interpolation when upsampling, nearest-frame copy when downsampling
//! - **Lap alignment**: coarse grid search refined by ternary search
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ghostline::{align_phase, decode_replay, normalize};
//!
//! fn main() -> ghostline::Result<()> {
//!     let data = std::fs::read("race.acreplay").expect("replay file");
//!     let reference = decode_replay(&data, "Eduardo")?;
//!     let candidate = decode_replay(&std::fs::read("mine.acreplay").expect("replay file"), "me")?;
//!
//!     let candidate = normalize(&candidate, reference.recording_interval_ms());
//!     match align_phase(&reference, &candidate, 1200) {
//!         Some(phase_shift) => println!("shift candidate by {} frames", -phase_shift),
//!         None => println!("no match"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod align;
pub mod analysis;
pub mod config;
mod error;
pub mod export;
pub mod normalize;
pub mod replay;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub use error::*;
pub use types::*;

pub use align::{Aligner, Alignment, align_phase};
pub use analysis::LapComparison;
pub use config::{AlignConfig, AnalysisConfig, NormalizeConfig, ResampleStrategy, ScanLimits};
pub use normalize::{Normalizer, normalize};
pub use replay::{ReplayFile, decode_replay, list_drivers};
