//! Replay files loaded into memory
//!
//! ```rust,no_run
//! use ghostline::replay::ReplayFile;
//!
//! fn list() -> ghostline::Result<()> {
//!     let replay = ReplayFile::open("race.acreplay")?;
//!     println!("{} on {}", replay.header().num_cars, replay.header().track_id);
//!     for driver in replay.drivers()? {
//!         println!("{}", driver);
//!     }
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::decoder::{ReplayDecoder, list_drivers_with};
use super::format::ReplayHeader;
use crate::config::ScanLimits;
use crate::{ReplayError, Result, TelemetryTrace};

/// A replay buffer with its parsed header.
///
/// The buffer is shared, so clones are cheap and can be moved into blocking tasks.
#[derive(Debug, Clone)]
pub struct ReplayFile {
    data: Arc<[u8]>,
    path: PathBuf,
    header: ReplayHeader,
}

impl ReplayFile {
    /// Read a replay file and parse its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| ReplayError::file_error(path.to_path_buf(), e))?;
        Self::with_path(data, path.to_path_buf())
    }

    /// [`ReplayFile::open`] using tokio's file system API.
    pub async fn open_async<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ReplayError::file_error(path.to_path_buf(), e))?;
        Self::with_path(data, path.to_path_buf())
    }

    /// Wrap an in-memory buffer.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::with_path(data, PathBuf::from("<memory>"))
    }

    fn with_path(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        let header = ReplayDecoder::new(&data)?.header().clone();
        info!(
            "Opened replay {} ({} bytes, {} cars, {}ms interval)",
            path.display(),
            data.len(),
            header.num_cars,
            header.recording_interval_ms
        );
        Ok(Self { data: data.into(), path, header })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &ReplayHeader {
        &self.header
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// File name without the directory, used to name exports.
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }

    fn decoder(&self) -> Result<ReplayDecoder<'_>> {
        ReplayDecoder::new(&self.data)
    }

    /// Driver names, from the trailer or by sequential scan.
    pub fn drivers(&self) -> Result<Vec<String>> {
        self.drivers_with(&ScanLimits::default())
    }

    pub fn drivers_with(&self, limits: &ScanLimits) -> Result<Vec<String>> {
        list_drivers_with(&self.data, limits)
    }

    /// Decode the trace of the car driven by `driver`.
    pub fn decode_driver(&self, driver: &str) -> Result<TelemetryTrace> {
        self.decoder()?.decode_driver(driver)
    }

    /// Decode on tokio's blocking pool.
    pub async fn decode_driver_async(&self, driver: &str) -> Result<TelemetryTrace> {
        let replay = self.clone();
        let driver = driver.to_owned();
        tokio::task::spawn_blocking(move || replay.decode_driver(&driver))
            .await
            .map_err(|e| ReplayError::Task { details: format!("decode task failed: {}", e) })?
    }
}
