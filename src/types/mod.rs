//! Core types for telemetry data representation.
//!
//! [`TelemetryTrace`] is the unit every stage exchanges: the decoder produces one per
//! driver, the normalizer maps a trace to another trace and the aligner reads two of them.
//! [`Channel`] names the individual sequences for generic access and for the JSON keys.

mod trace;

pub use trace::{Channel, TelemetryTrace};
