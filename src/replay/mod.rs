//! Replay container decoding.
//!
//! The decoder works on a borrowed byte buffer and never copies frame data it does not keep.
//! [`ReplayFile`] adds file loading on top for callers that start from a path.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ghostline::replay::{decode_replay, list_drivers};
//!
//! fn main() -> ghostline::Result<()> {
//!     let data = std::fs::read("race.acreplay").expect("replay file");
//!     for name in list_drivers(&data)? {
//!         println!("{}", name);
//!     }
//!     let trace = decode_replay(&data, "Suraj")?;
//!     println!("{} frames at {}ms", trace.num_frames(), trace.recording_interval_ms());
//!     Ok(())
//! }
//! ```

pub mod decoder;
pub mod drivers;
pub mod file;
pub mod format;
pub mod metadata;
pub mod reader;

pub use decoder::{
    CarLocation, LocateStrategy, ReplayDecoder, decode_replay, list_drivers, list_drivers_with,
};
pub use drivers::{DriverIndex, names_match, normalize_driver_name};
pub use file::ReplayFile;
pub use format::{CarHeader, FrameRecord, ReplayHeader, SUPPORTED_VERSION};
pub use reader::ByteReader;
