//! Replay container structures and layout arithmetic
//!
//! ## Replay File Structure
//!
//! A version 16 replay is a single little-endian stream:
//!
//! 1. **Header** - version, recording interval (ms, `f64`), weather id, track id and track
//!    config strings, car count and the current recording index
//! 2. **Track-object block** - frame count, object count, then
//!    `(2 + 2 + 12 × objects) × frames` bytes that are never interpreted
//! 3. **Car blocks** - one per car: car id, driver name, nation code, team and skin strings,
//!    frame count, buffer increment, 20 unknown bytes, then the frame records. Every frame
//!    record is [`FRAME_RECORD_LEN`] bytes followed by `21 + 4 × increment` bytes, except
//!    the last one which is followed by `5 + 4 × increment` bytes.
//! 4. **Trailer** (optional) - see [`super::metadata`]
//!
//! Strings are `u32` length-prefixed UTF-8. Counts are `i32`; negative counts are rejected
//! as corrupt data rather than fed into the skip arithmetic, and skip lengths that overflow
//! are reported as [`ReplayError::InvalidCount`] at the offending count.

use tracing::{debug, trace};

use super::reader::ByteReader;
use crate::{ReplayError, Result};

/// The only replay version this crate decodes.
pub const SUPPORTED_VERSION: i32 = 16;

/// Bytes of one frame record, excluding the per-car trailing bytes.
pub const FRAME_RECORD_LEN: usize = 255;

/// Unknown bytes between a car header and its first frame record.
pub const CAR_PREAMBLE_LEN: usize = 20;

const FRAME_TRAILER_BASE: i64 = 21;
const FINAL_FRAME_TRAILER_BASE: i64 = 5;
const INCREMENT_WORD_LEN: i64 = 4;

/// Replay header fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayHeader {
    pub version: i32,
    pub recording_interval_ms: f64,
    pub weather_id: String,
    pub track_id: String,
    pub track_config: String,
    pub num_cars: i32,
    pub current_recording_index: i32,
}

impl ReplayHeader {
    /// Parse the header from the start of the reader.
    ///
    /// The version is checked before any other field is read.
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let version = reader.read_i32()?;
        if version != SUPPORTED_VERSION {
            return Err(ReplayError::UnsupportedVersion {
                expected: SUPPORTED_VERSION,
                found: version,
            });
        }

        let recording_interval_ms = reader.read_f64()?;
        let weather_id = reader.read_string()?.to_owned();
        let track_id = reader.read_string()?.to_owned();
        let track_config = reader.read_string()?.to_owned();

        let cars_offset = reader.position();
        let num_cars = reader.read_i32()?;
        if num_cars < 0 {
            return Err(ReplayError::invalid_count("car count", num_cars.into(), cars_offset));
        }
        let current_recording_index = reader.read_i32()?;

        debug!(
            "Parsed replay header: version={}, interval={}ms, track={} ({}), cars={}",
            version, recording_interval_ms, track_id, track_config, num_cars
        );

        Ok(Self {
            version,
            recording_interval_ms,
            weather_id,
            track_id,
            track_config,
            num_cars,
            current_recording_index,
        })
    }
}

/// Counts of the track-level object block that precedes the car blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackObjectBlock {
    pub num_frames: i32,
    pub num_track_objects: i32,
    /// Byte offset of the frame count.
    pub offset: usize,
}

impl TrackObjectBlock {
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let offset = reader.position();
        let num_frames = reader.read_i32()?;
        let num_track_objects = reader.read_i32()?;

        if num_frames < 0 {
            return Err(ReplayError::invalid_count("track frame count", num_frames.into(), offset));
        }
        if num_track_objects < 0 {
            return Err(ReplayError::invalid_count(
                "track object count",
                num_track_objects.into(),
                offset + 4,
            ));
        }
        Ok(Self { num_frames, num_track_objects, offset })
    }

    /// Bytes of object data following the two counts.
    pub fn data_len(&self) -> Result<usize> {
        let overflow = || {
            ReplayError::invalid_count("track frame count", self.num_frames.into(), self.offset)
        };
        let objects = u64::try_from(self.num_track_objects).map_err(|_| overflow())?;
        let frames = u64::try_from(self.num_frames).map_err(|_| overflow())?;
        let len = objects
            .checked_mul(12)
            .and_then(|bytes| bytes.checked_add(2 + 2))
            .and_then(|per_frame| per_frame.checked_mul(frames))
            .ok_or_else(overflow)?;
        usize::try_from(len).map_err(|_| overflow())
    }

    /// Parse the counts and skip the object data.
    pub fn skip(reader: &mut ByteReader<'_>) -> Result<Self> {
        let block = Self::parse(reader)?;
        let len = block.data_len()?;
        trace!(
            "Skipping track-object block: {} frames x {} objects ({} bytes)",
            block.num_frames, block.num_track_objects, len
        );
        reader.skip(len)?;
        Ok(block)
    }
}

/// Metadata at the start of a car block. Strings borrow from the replay buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarHeader<'a> {
    pub car_id: &'a str,
    pub driver_name: &'a str,
    pub nation_code: &'a str,
    pub driver_team: &'a str,
    pub car_skin_id: &'a str,
    pub frames: i32,
    pub buffer_increment: i32,
    /// Byte offset of the frame count; the buffer increment follows it.
    pub counts_offset: usize,
}

impl<'a> CarHeader<'a> {
    pub fn parse(reader: &mut ByteReader<'a>) -> Result<Self> {
        let car_id = reader.read_string()?;
        let driver_name = reader.read_string()?;
        Self::parse_after_name(reader, car_id, driver_name)
    }

    /// Finish parsing a header whose id and driver name were already read.
    pub fn parse_after_name(
        reader: &mut ByteReader<'a>,
        car_id: &'a str,
        driver_name: &'a str,
    ) -> Result<Self> {
        let nation_code = reader.read_string()?;
        let driver_team = reader.read_string()?;
        let car_skin_id = reader.read_string()?;

        let counts_offset = reader.position();
        let frames = reader.read_i32()?;
        let buffer_increment = reader.read_i32()?;
        if frames < 0 {
            return Err(ReplayError::invalid_count("car frame count", frames.into(), counts_offset));
        }
        if buffer_increment < 0 {
            return Err(ReplayError::invalid_count(
                "buffer increment",
                buffer_increment.into(),
                counts_offset + 4,
            ));
        }

        Ok(Self {
            car_id,
            driver_name,
            nation_code,
            driver_team,
            car_skin_id,
            frames,
            buffer_increment,
            counts_offset,
        })
    }

    fn increment_error(&self) -> ReplayError {
        ReplayError::invalid_count(
            "buffer increment",
            self.buffer_increment.into(),
            self.counts_offset + 4,
        )
    }

    fn increment_len(&self) -> Result<i64> {
        INCREMENT_WORD_LEN
            .checked_mul(i64::from(self.buffer_increment))
            .ok_or_else(|| self.increment_error())
    }

    /// Bytes following each frame record except the last.
    pub fn frame_trailer_len(&self) -> Result<usize> {
        let len = FRAME_TRAILER_BASE
            .checked_add(self.increment_len()?)
            .ok_or_else(|| self.increment_error())?;
        usize::try_from(len).map_err(|_| self.increment_error())
    }

    /// Bytes of car data following the header: preamble, frames and trailing bytes.
    ///
    /// `20 + (255 + 21 + 4i) × (frames − 1) + (255 + 5 + 4i)`
    pub fn data_len(&self) -> Result<usize> {
        let overflow = || {
            ReplayError::invalid_count("car frame count", self.frames.into(), self.counts_offset)
        };
        let increment = self.increment_len()?;
        let record = FRAME_RECORD_LEN as i64;
        let stride = (record + FRAME_TRAILER_BASE).checked_add(increment).ok_or_else(overflow)?;
        let last = (record + FINAL_FRAME_TRAILER_BASE).checked_add(increment).ok_or_else(overflow)?;
        let len = stride
            .checked_mul(i64::from(self.frames) - 1)
            .and_then(|frames| frames.checked_add(CAR_PREAMBLE_LEN as i64))
            .and_then(|len| len.checked_add(last))
            .ok_or_else(overflow)?;
        usize::try_from(len.max(0)).map_err(|_| overflow())
    }
}

/// One decoded frame record.
///
/// Values are raw: no sign inversion has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub rpm: f32,
    pub steering: f32,
    pub fuel: u8,
    pub gear: u8,
    pub throttle: u8,
    pub brake: u8,
    pub status_bits: u8,
    pub boost: u8,
}

impl FrameRecord {
    /// Read one [`FRAME_RECORD_LEN`]-byte record.
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let x = reader.read_f32()?;
        let y = reader.read_f32()?;
        let z = reader.read_f32()?;
        let yaw = reader.read_f16()?;
        reader.skip(6)?; // rot_x, rot_z
        reader.skip(48)?; // brake disc positions
        reader.skip(24)?; // wheel rotations
        reader.skip(48)?; // wheel positions
        reader.skip(24)?; // wheel x rotations
        reader.skip(6)?; // speed components
        let rpm = reader.read_f16()?;
        reader.skip(40)?;
        let steering = reader.read_f16()?;
        reader.skip(18)?;
        let fuel = reader.read_u8()?;
        reader.skip(1)?;
        let gear = reader.read_u8()?;
        reader.skip(5)?;
        reader.skip(4)?; // damage
        let throttle = reader.read_u8()?;
        let brake = reader.read_u8()?;
        reader.skip(2)?;
        let status_bits = reader.read_u8()?;
        reader.skip(5)?;
        let boost = reader.read_u8()?;

        Ok(Self { x, y, z, yaw, rpm, steering, fuel, gear, throttle, brake, status_bits, boost })
    }
}
