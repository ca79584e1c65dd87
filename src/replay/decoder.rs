//! Replay decoding: driver location and frame extraction
//!
//! Decoding runs in three phases over the buffer:
//!
//! 1. **Header** - parsed once by [`ReplayDecoder::new`]; an unsupported version fails
//!    before anything else is read
//! 2. **Track-object skip** - the track-level block is stepped over by byte count
//! 3. **Per-car scan** - car blocks are skipped until the target car, whose frames are
//!    decoded into a [`TelemetryTrace`]
//!
//! The target car is found through the trailer metadata when it is present ([`DriverIndex`]
//! gives the car slot directly) and by reading each car's driver name otherwise. Both paths
//! step over car blocks with the same [`skip_car_block`] routine.

use std::fmt;
use tracing::{debug, trace, warn};

use super::drivers::{DriverIndex, names_match, normalize_driver_name};
use super::format::{
    CAR_PREAMBLE_LEN, CarHeader, FRAME_RECORD_LEN, FrameRecord, ReplayHeader, TrackObjectBlock,
};
use super::metadata;
use super::reader::ByteReader;
use crate::config::ScanLimits;
use crate::{ReplayError, Result, TelemetryTrace};

/// How the target car block was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateStrategy {
    /// Car slot taken from the trailer's driver list.
    TrailerMetadata,
    /// Driver names read from each car block in turn.
    SequentialScan,
}

impl fmt::Display for LocateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateStrategy::TrailerMetadata => f.write_str("trailer metadata"),
            LocateStrategy::SequentialScan => f.write_str("sequential scan"),
        }
    }
}

/// Position of a located car block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarLocation {
    /// Car slot within the replay.
    pub index: usize,
    /// Byte offset of the car block's first field.
    pub offset: usize,
    pub strategy: LocateStrategy,
}

/// Whether [`skip_car_block`] also tests the block's driver name.
#[derive(Debug, Clone, Copy)]
pub enum CarSkip<'t> {
    /// Skip unconditionally.
    Blind,
    /// Stop at the block if its driver matches this normalized name.
    MatchName(&'t str),
}

/// Outcome of [`skip_car_block`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CarScan<'a> {
    /// The block was stepped over; the reader sits on the next block.
    Skipped(CarHeader<'a>),
    /// The driver matched; the reader was rewound to the start of the block.
    Matched,
}

/// Step over one car block, optionally stopping at a matching driver.
pub fn skip_car_block<'a>(reader: &mut ByteReader<'a>, mode: CarSkip<'_>) -> Result<CarScan<'a>> {
    let block_start = reader.position();
    let car_id = reader.read_string()?;
    let driver_name = reader.read_string()?;

    if let CarSkip::MatchName(target) = mode {
        if names_match(&normalize_driver_name(driver_name), target) {
            reader.seek(block_start)?;
            return Ok(CarScan::Matched);
        }
    }

    let header = CarHeader::parse_after_name(reader, car_id, driver_name)?;
    let len = header.data_len()?;
    trace!(
        "Skipping car '{}' ({} frames, increment {}, {} bytes)",
        header.driver_name, header.frames, header.buffer_increment, len
    );
    reader.skip(len)?;
    Ok(CarScan::Skipped(header))
}

/// Decoder over a borrowed replay buffer.
#[derive(Debug, Clone)]
pub struct ReplayDecoder<'a> {
    data: &'a [u8],
    header: ReplayHeader,
    body_offset: usize,
}

impl<'a> ReplayDecoder<'a> {
    /// Parse the replay header.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let header = ReplayHeader::parse(&mut reader)?;
        Ok(Self { data, header, body_offset: reader.position() })
    }

    pub fn header(&self) -> &ReplayHeader {
        &self.header
    }

    fn body_reader(&self) -> Result<ByteReader<'a>> {
        ByteReader::at(self.data, self.body_offset)
    }

    /// Find the car block driven by `driver`.
    pub fn locate(&self, driver: &str) -> Result<CarLocation> {
        let index = DriverIndex::new(metadata::driver_names(self.data));
        let mut reader = self.body_reader()?;
        TrackObjectBlock::skip(&mut reader)?;

        let location = if index.is_empty() {
            self.locate_by_scan(&mut reader, driver)?
        } else {
            let slot = index.find(driver).ok_or_else(|| {
                ReplayError::driver_not_found(driver, LocateStrategy::TrailerMetadata.to_string())
            })?;
            for _ in 0..slot {
                skip_car_block(&mut reader, CarSkip::Blind)?;
            }
            CarLocation {
                index: slot,
                offset: reader.position(),
                strategy: LocateStrategy::TrailerMetadata,
            }
        };

        debug!(
            "Located driver '{}' at car slot {} (offset {}) via {}",
            driver, location.index, location.offset, location.strategy
        );
        Ok(location)
    }

    fn locate_by_scan(&self, reader: &mut ByteReader<'a>, driver: &str) -> Result<CarLocation> {
        let target = normalize_driver_name(driver);
        for slot in 0..self.header.num_cars as usize {
            if let CarScan::Matched = skip_car_block(reader, CarSkip::MatchName(&target))? {
                return Ok(CarLocation {
                    index: slot,
                    offset: reader.position(),
                    strategy: LocateStrategy::SequentialScan,
                });
            }
        }
        Err(ReplayError::driver_not_found(driver, LocateStrategy::SequentialScan.to_string()))
    }

    /// Decode the telemetry trace of the car driven by `driver`.
    pub fn decode_driver(&self, driver: &str) -> Result<TelemetryTrace> {
        let location = self.locate(driver)?;
        let mut reader = ByteReader::at(self.data, location.offset)?;
        self.decode_car(&mut reader, driver, location.index)
    }

    fn decode_car(
        &self,
        reader: &mut ByteReader<'a>,
        driver: &str,
        index: usize,
    ) -> Result<TelemetryTrace> {
        let block_start = reader.position();
        let car = CarHeader::parse(reader)?;

        if !names_match(&normalize_driver_name(car.driver_name), &normalize_driver_name(driver)) {
            return Err(ReplayError::DriverMismatch {
                expected: driver.to_owned(),
                found: car.driver_name.to_owned(),
                index,
            });
        }
        if car.frames < 1 {
            let frames = i64::from(car.frames);
            return Err(ReplayError::invalid_count("car frame count", frames, block_start));
        }

        reader.skip(CAR_PREAMBLE_LEN)?;

        let frames = car.frames as usize;
        let trailer_len = car.frame_trailer_len()?;
        let capacity = frames.min(reader.remaining() / FRAME_RECORD_LEN + 1);
        let mut x = Vec::with_capacity(capacity);
        let mut z = Vec::with_capacity(capacity);
        let mut rot_y = Vec::with_capacity(capacity);
        let mut rpm = Vec::with_capacity(capacity);
        let mut steering = Vec::with_capacity(capacity);
        let mut throttle = Vec::with_capacity(capacity);
        let mut brake = Vec::with_capacity(capacity);
        let mut gear = Vec::with_capacity(capacity);

        for frame in 0..frames {
            let record = FrameRecord::read(reader)?;
            x.push(record.x);
            z.push(-record.z);
            rot_y.push(-record.yaw);
            rpm.push(record.rpm);
            steering.push(-record.steering);
            throttle.push(f32::from(record.throttle));
            brake.push(f32::from(record.brake));
            gear.push(record.gear);

            if frame + 1 < frames {
                reader.skip(trailer_len)?;
            }
        }

        debug!(
            "Decoded {} frames for '{}' (car '{}', interval {}ms)",
            frames, car.driver_name, car.car_id, self.header.recording_interval_ms
        );

        TelemetryTrace::new(self.header.recording_interval_ms, x, z, rot_y)?
            .with_rpm(rpm)?
            .with_steering(steering)?
            .with_throttle(throttle)?
            .with_brake(brake)?
            .with_gear(gear)
    }

    /// Driver names read from each car block, in slot order.
    ///
    /// Header and track-block problems are errors. A car block that cannot be read or that
    /// exceeds `limits` ends the scan, and the names gathered so far are returned.
    pub fn scan_driver_names(&self, limits: &ScanLimits) -> Result<Vec<String>> {
        let mut reader = self.body_reader()?;
        let block = TrackObjectBlock::parse(&mut reader)?;
        if block.num_frames > limits.max_frames {
            return Err(ReplayError::invalid_count(
                "track frame count",
                block.num_frames.into(),
                block.offset,
            ));
        }
        if block.num_track_objects > limits.max_track_objects {
            return Err(ReplayError::invalid_count(
                "track object count",
                block.num_track_objects.into(),
                block.offset + 4,
            ));
        }
        reader.skip(block.data_len()?)?;

        let car_count = (self.header.num_cars as usize).min(limits.max_cars);
        let mut names = Vec::with_capacity(car_count);
        for slot in 0..car_count {
            if let Err(e) = scan_car(&mut reader, limits, &mut names) {
                warn!("Driver scan stopped at car slot {}: {}", slot, e);
                break;
            }
        }
        Ok(names)
    }
}

fn scan_car(
    reader: &mut ByteReader<'_>,
    limits: &ScanLimits,
    names: &mut Vec<String>,
) -> Result<()> {
    let car_id = reader.read_string()?;
    let driver_name = reader.read_string()?;
    names.push(driver_name.to_owned());

    let car = CarHeader::parse_after_name(reader, car_id, driver_name)?;
    if car.frames > limits.max_frames {
        let frames = i64::from(car.frames);
        return Err(ReplayError::invalid_count("car frame count", frames, car.counts_offset));
    }
    if car.buffer_increment > limits.max_buffer_increment {
        return Err(ReplayError::invalid_count(
            "buffer increment",
            car.buffer_increment.into(),
            car.counts_offset + 4,
        ));
    }
    reader.skip(car.data_len()?)
}

/// Decode the trace of the car driven by `driver`.
///
/// The driver is matched case-insensitively, first exactly and then by substring in either
/// direction.
pub fn decode_replay(data: &[u8], driver: &str) -> Result<TelemetryTrace> {
    ReplayDecoder::new(data)?.decode_driver(driver)
}

/// Driver names in the replay, from the trailer when present and by sequential scan
/// otherwise.
pub fn list_drivers(data: &[u8]) -> Result<Vec<String>> {
    list_drivers_with(data, &ScanLimits::default())
}

/// [`list_drivers`] with explicit scan limits.
pub fn list_drivers_with(data: &[u8], limits: &ScanLimits) -> Result<Vec<String>> {
    let names = metadata::driver_names(data);
    if !names.is_empty() {
        return Ok(names);
    }
    ReplayDecoder::new(data)?.scan_driver_names(limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CarSpec, ReplayBuilder, TrailerSpec, init_test_tracing};

    fn three_car_replay() -> ReplayBuilder {
        ReplayBuilder::new(16.666)
            .track_objects(5, 2)
            .car(CarSpec::new("Alice Smith").frames(3).buffer_increment(1))
            .car(CarSpec::new("Bob Jones").frames(4).buffer_increment(3))
            .car(CarSpec::new("Carol White").frames(2))
    }

    #[test]
    fn sequential_scan_finds_each_car() {
        init_test_tracing();
        let data = three_car_replay().build();
        let decoder = ReplayDecoder::new(&data).unwrap();

        for (slot, name) in ["alice smith", "BOB", "Carol White"].iter().enumerate() {
            let location = decoder.locate(name).unwrap();
            assert_eq!(location.index, slot);
            assert_eq!(location.strategy, LocateStrategy::SequentialScan);
        }
    }

    #[test]
    fn trailer_and_scan_agree_on_offsets() {
        let plain = three_car_replay().build();
        let with_trailer = three_car_replay()
            .trailer(TrailerSpec::with_drivers(&["Alice Smith", "Bob Jones", "Carol White"]))
            .build();

        let scan = ReplayDecoder::new(&plain).unwrap().locate("Carol").unwrap();
        let meta = ReplayDecoder::new(&with_trailer).unwrap().locate("Carol").unwrap();
        assert_eq!(meta.strategy, LocateStrategy::TrailerMetadata);
        assert_eq!(scan.offset, meta.offset);
        assert_eq!(scan.index, meta.index);
    }

    #[test]
    fn decodes_frame_count_and_interval() {
        let data = three_car_replay().build();
        let trace = decode_replay(&data, "Bob Jones").unwrap();
        assert_eq!(trace.num_frames(), 4);
        assert_eq!(trace.recording_interval_ms(), 16.666);
        assert_eq!(trace.gear().map(|g| g.len()), Some(4));
    }

    #[test]
    fn missing_driver_reports_strategy() {
        let data = three_car_replay().build();
        match decode_replay(&data, "Dave").unwrap_err() {
            ReplayError::DriverNotFound { driver, strategy } => {
                assert_eq!(driver, "Dave");
                assert_eq!(strategy, "sequential scan");
            }
            other => panic!("Expected DriverNotFound, got {:?}", other),
        }

        let data = three_car_replay()
            .trailer(TrailerSpec::with_drivers(&["Alice Smith", "Bob Jones", "Carol White"]))
            .build();
        let err = decode_replay(&data, "Dave").unwrap_err();
        assert!(err.to_string().contains("trailer metadata"));
    }

    #[test]
    fn trailer_disagreeing_with_blocks_is_a_mismatch() {
        let data = three_car_replay()
            .trailer(TrailerSpec::with_drivers(&["Alice Smith", "Zed Zero", "Carol White"]))
            .build();
        match decode_replay(&data, "Zed").unwrap_err() {
            ReplayError::DriverMismatch { found, index, .. } => {
                assert_eq!(found, "Bob Jones");
                assert_eq!(index, 1);
            }
            other => panic!("Expected DriverMismatch, got {:?}", other),
        }
    }

    #[test]
    fn zero_frame_target_is_rejected() {
        let data = ReplayBuilder::new(16.0).car(CarSpec::new("Empty").frames(0)).build();
        let err = decode_replay(&data, "Empty").unwrap_err();
        assert!(matches!(err, ReplayError::InvalidCount { value: 0, .. }));
    }

    #[test]
    fn raw_records_are_decoded_with_inverted_axes() {
        let record = FrameRecord {
            x: 12.5,
            z: 40.0,
            yaw: 1.25,
            rpm: 6400.0,
            steering: -0.5,
            gear: 3,
            throttle: 200,
            brake: 7,
            ..FrameRecord::default()
        };
        let data = ReplayBuilder::new(20.0)
            .car(CarSpec::new("Alice").records(vec![record, record]).buffer_increment(2))
            .build();

        let trace = decode_replay(&data, "alice").unwrap();
        assert_eq!(trace.x(), &[12.5, 12.5]);
        assert_eq!(trace.z(), &[-40.0, -40.0]);
        assert_eq!(trace.rot_y(), &[-1.25, -1.25]);
        assert_eq!(trace.steering(), Some(&[0.5, 0.5][..]));
        assert_eq!(trace.rpm(), Some(&[6400.0, 6400.0][..]));
        assert_eq!(trace.throttle(), Some(&[200.0, 200.0][..]));
        assert_eq!(trace.brake(), Some(&[7.0, 7.0][..]));
        assert_eq!(trace.gear(), Some(&[3, 3][..]));
    }

    #[test]
    fn negative_frame_count_stops_the_skip() {
        let data = ReplayBuilder::new(16.0)
            .car(CarSpec::new("Alice").frames(2).frame_count_override(-3))
            .car(CarSpec::new("Bob").frames(2))
            .build();
        let err = decode_replay(&data, "Bob").unwrap_err();
        assert!(matches!(err, ReplayError::InvalidCount { value: -3, .. }), "{:?}", err);
        assert!(err.is_corrupt_data());
    }

    #[test]
    fn car_count_beyond_the_blocks() {
        let data = three_car_replay().num_cars(4).build();
        let err = decode_replay(&data, "Dave").unwrap_err();
        assert!(matches!(err, ReplayError::OutOfBounds { .. }), "{:?}", err);

        // The listing keeps the three readable names.
        assert_eq!(list_drivers(&data).unwrap().len(), 3);
    }

    fn patch_i32(data: &mut [u8], offset: usize, value: i32) {
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Reader positioned on the first car block.
    fn first_car_reader<'a>(decoder: &ReplayDecoder<'a>) -> ByteReader<'a> {
        let mut reader = decoder.body_reader().unwrap();
        TrackObjectBlock::skip(&mut reader).unwrap();
        reader
    }

    #[test]
    fn extreme_track_counts_are_reported_not_wrapped() {
        let mut data = three_car_replay().build();
        let block_offset = ReplayDecoder::new(&data).unwrap().body_offset;
        patch_i32(&mut data, block_offset, i32::MAX);
        patch_i32(&mut data, block_offset + 4, i32::MAX);

        let err = decode_replay(&data, "Bob").unwrap_err();
        assert!(matches!(err, ReplayError::InvalidCount { .. }), "{:?}", err);
        assert_eq!(err.offset(), Some(block_offset));
        assert!(list_drivers(&data).is_err());

        // Representable but far past the end of the buffer.
        patch_i32(&mut data, block_offset, 1_000_000);
        patch_i32(&mut data, block_offset + 4, 1_000);
        let err = decode_replay(&data, "Bob").unwrap_err();
        assert!(matches!(err, ReplayError::OutOfBounds { .. }), "{:?}", err);
        assert_eq!(err.offset(), Some(block_offset + 8));
    }

    #[test]
    fn extreme_counts_in_a_skipped_car_are_reported_not_wrapped() {
        let mut data = three_car_replay().build();
        let counts_offset = {
            let decoder = ReplayDecoder::new(&data).unwrap();
            CarHeader::parse(&mut first_car_reader(&decoder)).unwrap().counts_offset
        };
        patch_i32(&mut data, counts_offset, i32::MAX);
        patch_i32(&mut data, counts_offset + 4, i32::MAX);

        let err = decode_replay(&data, "Bob").unwrap_err();
        assert!(matches!(err, ReplayError::InvalidCount { .. }), "{:?}", err);
        assert_eq!(err.offset(), Some(counts_offset));

        // Three frames with a huge increment fit in a usize but not in the buffer.
        patch_i32(&mut data, counts_offset, 3);
        let err = decode_replay(&data, "Bob").unwrap_err();
        assert!(matches!(err, ReplayError::OutOfBounds { .. }), "{:?}", err);
        assert_eq!(list_drivers(&data).unwrap(), vec!["Alice Smith"]);
    }

    #[test]
    fn scan_limit_errors_point_at_the_counts() {
        let car = CarSpec::new("Alice").frames(2);
        let strings = [&car.car_id, &car.driver_name, &car.nation_code, &car.driver_team];
        let strings_len = strings.iter().map(|s| 4 + s.len()).sum::<usize>()
            + 4
            + car.car_skin_id.len();

        let data = ReplayBuilder::new(16.0).car(car.clone().frame_count_override(200_000)).build();
        let decoder = ReplayDecoder::new(&data).unwrap();
        let mut reader = first_car_reader(&decoder);
        let counts_offset = reader.position() + strings_len;
        let mut names = Vec::new();
        let err = scan_car(&mut reader, &ScanLimits::default(), &mut names).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidCount { value: 200_000, .. }), "{:?}", err);
        assert_eq!(err.offset(), Some(counts_offset));
        assert_eq!(names, vec!["Alice"]);

        let data = ReplayBuilder::new(16.0).car(car.buffer_increment(5_000)).build();
        let decoder = ReplayDecoder::new(&data).unwrap();
        let mut reader = first_car_reader(&decoder);
        let err = scan_car(&mut reader, &ScanLimits::default(), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidCount { value: 5_000, .. }), "{:?}", err);
        assert_eq!(err.offset(), Some(counts_offset + 4));
    }

    #[test]
    fn scan_listing_respects_limits() {
        let data = three_car_replay().build();
        let limits = ScanLimits { max_cars: 2, ..ScanLimits::default() };
        assert_eq!(list_drivers_with(&data, &limits).unwrap(), vec!["Alice Smith", "Bob Jones"]);

        let limits = ScanLimits { max_buffer_increment: 2, ..ScanLimits::default() };
        // Bob's increment of 3 ends the scan after his name was recorded.
        assert_eq!(list_drivers_with(&data, &limits).unwrap(), vec!["Alice Smith", "Bob Jones"]);

        let limits = ScanLimits { max_track_objects: 1, ..ScanLimits::default() };
        assert!(matches!(
            list_drivers_with(&data, &limits).unwrap_err(),
            ReplayError::InvalidCount { .. }
        ));
    }

    #[test]
    fn scan_listing_keeps_names_before_truncation() {
        let mut data = three_car_replay().build();
        let carol = ReplayDecoder::new(&data).unwrap().locate("Carol").unwrap();
        data.truncate(carol.offset + 10);

        assert_eq!(list_drivers(&data).unwrap(), vec!["Alice Smith", "Bob Jones"]);
    }
}
