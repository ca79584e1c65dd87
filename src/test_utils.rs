//! Test utilities for building synthetic replays and traces
//!
//! Replay fixtures are generated rather than checked in: [`ReplayBuilder`] writes a complete
//! version 16 buffer (header, track-object block, car blocks with the exact per-frame trailing
//! bytes, optional trailer) so decoder tests can state precisely what the file contains.

#![cfg(any(test, feature = "benchmark"))]

use half::f16;
use std::f32::consts::TAU;

use crate::TelemetryTrace;
use crate::replay::format::{CAR_PREAMBLE_LEN, FrameRecord, SUPPORTED_VERSION};
use crate::replay::metadata::{TRAILER_SIGNATURE, TRAILER_VERSION};

/// Byte used for every skipped or unknown region, so misaligned reads show up as garbage.
const FILL: u8 = 0xA5;

/// Install a test-writer subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Append one raw frame record in replay layout.
pub fn write_frame_record(out: &mut Vec<u8>, record: &FrameRecord) {
    let start = out.len();
    let fill = |out: &mut Vec<u8>, n: usize| out.extend(std::iter::repeat_n(FILL, n));
    let write_f16 = |out: &mut Vec<u8>, v: f32| {
        out.extend_from_slice(&f16::from_f32(v).to_bits().to_le_bytes())
    };

    out.extend_from_slice(&record.x.to_le_bytes());
    out.extend_from_slice(&record.y.to_le_bytes());
    out.extend_from_slice(&record.z.to_le_bytes());
    write_f16(out, record.yaw);
    fill(out, 6 + 48 + 24 + 48 + 24 + 6);
    write_f16(out, record.rpm);
    fill(out, 40);
    write_f16(out, record.steering);
    fill(out, 18);
    out.push(record.fuel);
    fill(out, 1);
    out.push(record.gear);
    fill(out, 5 + 4);
    out.push(record.throttle);
    out.push(record.brake);
    fill(out, 2);
    out.push(record.status_bits);
    fill(out, 5);
    out.push(record.boost);

    debug_assert_eq!(out.len() - start, crate::replay::format::FRAME_RECORD_LEN);
}

/// Deterministic raw record for frame `i`; every value is exactly representable on disk.
pub fn sample_record(i: usize) -> FrameRecord {
    let t = i as f32;
    FrameRecord {
        x: 100.0 + t * 1.5,
        y: 2.0,
        z: -50.0 + t * 0.75,
        yaw: (i % 64) as f32 / 16.0,
        rpm: 4000.0 + (i % 32) as f32 * 64.0,
        steering: ((i % 17) as f32 - 8.0) / 8.0,
        fuel: 30,
        gear: (1 + i % 6) as u8,
        throttle: (i * 37 % 256) as u8,
        brake: (i * 11 % 256) as u8,
        status_bits: 0,
        boost: 0,
    }
}

fn write_string(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

/// One car block of a synthetic replay.
#[derive(Debug, Clone)]
pub struct CarSpec {
    pub car_id: String,
    pub driver_name: String,
    pub nation_code: String,
    pub driver_team: String,
    pub car_skin_id: String,
    pub buffer_increment: i32,
    pub records: Vec<FrameRecord>,
    /// Frame count written to the header instead of `records.len()`.
    pub frame_count_override: Option<i32>,
}

impl CarSpec {
    pub fn new(driver_name: &str) -> Self {
        Self {
            car_id: "ks_mazda_mx5_cup".to_owned(),
            driver_name: driver_name.to_owned(),
            nation_code: "ITA".to_owned(),
            driver_team: String::new(),
            car_skin_id: "00_official".to_owned(),
            buffer_increment: 0,
            records: Vec::new(),
            frame_count_override: None,
        }
    }

    /// Use `count` records from [`sample_record`].
    pub fn frames(mut self, count: usize) -> Self {
        self.records = (0..count).map(sample_record).collect();
        self
    }

    pub fn records(mut self, records: Vec<FrameRecord>) -> Self {
        self.records = records;
        self
    }

    pub fn buffer_increment(mut self, increment: i32) -> Self {
        self.buffer_increment = increment;
        self
    }

    pub fn frame_count_override(mut self, frames: i32) -> Self {
        self.frame_count_override = Some(frames);
        self
    }

    fn write(&self, out: &mut Vec<u8>) {
        write_string(out, &self.car_id);
        write_string(out, &self.driver_name);
        write_string(out, &self.nation_code);
        write_string(out, &self.driver_team);
        write_string(out, &self.car_skin_id);
        let frames = self.frame_count_override.unwrap_or(self.records.len() as i32);
        out.extend_from_slice(&frames.to_le_bytes());
        out.extend_from_slice(&self.buffer_increment.to_le_bytes());
        out.extend(std::iter::repeat_n(FILL, CAR_PREAMBLE_LEN));

        let increment = 4 * self.buffer_increment.max(0) as usize;
        for (i, record) in self.records.iter().enumerate() {
            write_frame_record(out, record);
            let trailing = if i + 1 < self.records.len() { 21 + increment } else { 5 + increment };
            out.extend(std::iter::repeat_n(FILL, trailing));
        }
    }
}

/// Trailer appended after the car blocks.
#[derive(Debug, Clone)]
pub struct TrailerSpec {
    /// Raw blocks written (with `i32` length prefixes) before the text block.
    pub leading_blocks: Vec<Vec<u8>>,
    pub text: String,
    pub version: i32,
    /// Extra-data offset written instead of the real one.
    pub offset_override: Option<i32>,
}

impl TrailerSpec {
    pub fn with_drivers(names: &[&str]) -> Self {
        Self {
            leading_blocks: Vec::new(),
            text: ini_for_drivers(names),
            version: TRAILER_VERSION,
            offset_override: None,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        let extra_offset = out.len() as i32;
        for block in &self.leading_blocks {
            out.extend_from_slice(&(block.len() as i32).to_le_bytes());
            out.extend_from_slice(block);
        }
        write_string(out, &self.text);
        out.extend_from_slice(TRAILER_SIGNATURE.as_bytes());
        out.extend_from_slice(&self.offset_override.unwrap_or(extra_offset).to_le_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
    }
}

/// INI text listing one `DRIVER_NAME=` entry per car, long enough to be taken as the text
/// block.
pub fn ini_for_drivers(names: &[&str]) -> String {
    let mut text = String::from("[HEADER]\nVERSION=3\nSOURCE=replay\n\n");
    for (slot, name) in names.iter().enumerate() {
        text.push_str(&format!(
            "[CAR_{}]\nDRIVER_NAME={}\nMODEL=ks_mazda_mx5_cup\nSKIN=00_official\nNATION=ITA\n\n",
            slot, name
        ));
    }
    while text.len() <= 300 {
        text.push_str("; reserved\n");
    }
    text
}

/// Builder for a complete synthetic replay buffer.
#[derive(Debug, Clone)]
pub struct ReplayBuilder {
    version: i32,
    recording_interval_ms: f64,
    weather_id: String,
    track_id: String,
    track_config: String,
    track_frames: i32,
    track_objects: i32,
    num_cars_override: Option<i32>,
    cars: Vec<CarSpec>,
    trailer: Option<TrailerSpec>,
}

impl ReplayBuilder {
    pub fn new(recording_interval_ms: f64) -> Self {
        Self {
            version: SUPPORTED_VERSION,
            recording_interval_ms,
            weather_id: "3_clear".to_owned(),
            track_id: "magione".to_owned(),
            track_config: String::new(),
            track_frames: 0,
            track_objects: 0,
            num_cars_override: None,
            cars: Vec::new(),
            trailer: None,
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn track(mut self, track_id: &str, track_config: &str) -> Self {
        self.track_id = track_id.to_owned();
        self.track_config = track_config.to_owned();
        self
    }

    pub fn track_objects(mut self, frames: i32, objects: i32) -> Self {
        self.track_frames = frames;
        self.track_objects = objects;
        self
    }

    /// Car count written to the header instead of the number of car blocks.
    pub fn num_cars(mut self, count: i32) -> Self {
        self.num_cars_override = Some(count);
        self
    }

    pub fn car(mut self, car: CarSpec) -> Self {
        self.cars.push(car);
        self
    }

    pub fn trailer(mut self, trailer: TrailerSpec) -> Self {
        self.trailer = Some(trailer);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.recording_interval_ms.to_le_bytes());
        write_string(&mut out, &self.weather_id);
        write_string(&mut out, &self.track_id);
        write_string(&mut out, &self.track_config);
        let num_cars = self.num_cars_override.unwrap_or(self.cars.len() as i32);
        out.extend_from_slice(&num_cars.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());

        out.extend_from_slice(&self.track_frames.to_le_bytes());
        out.extend_from_slice(&self.track_objects.to_le_bytes());
        let per_frame = 4 + 12 * self.track_objects.max(0) as usize;
        let object_bytes = per_frame * self.track_frames.max(0) as usize;
        out.extend(std::iter::repeat_n(FILL, object_bytes));

        for car in &self.cars {
            car.write(&mut out);
        }
        if let Some(trailer) = &self.trailer {
            trailer.write(&mut out);
        }
        out
    }
}

/// Closed circular lap of radius 500 with every optional channel populated.
pub fn circuit_trace(num_frames: usize, recording_interval_ms: f64) -> TelemetryTrace {
    let angle = |i: usize| TAU * i as f32 / num_frames as f32;
    let x = (0..num_frames).map(|i| 500.0 * angle(i).cos()).collect();
    let z = (0..num_frames).map(|i| 500.0 * angle(i).sin()).collect();
    let rot_y = (0..num_frames).map(angle).collect();
    let rpm = (0..num_frames).map(|i| 5000.0 + 2000.0 * angle(i).sin()).collect();
    let steering = (0..num_frames).map(|_| 0.12).collect();
    let throttle = (0..num_frames).map(|i| (i * 7 % 256) as f32).collect();
    let brake = (0..num_frames).map(|i| (i * 3 % 256) as f32).collect();
    let gear = (0..num_frames).map(|i| (2 + i * 4 / num_frames) as u8).collect();

    build_trace(recording_interval_ms, x, z, rot_y, rpm, steering, throttle, brake, gear)
}

/// Copy of `trace` in which frame `j` holds the reference's frame `j - shift`, wrapping.
///
/// `trace` must carry every optional channel, as [`circuit_trace`] output does.
pub fn shifted_trace(trace: &TelemetryTrace, shift: usize) -> TelemetryTrace {
    let n = trace.num_frames();
    let source = |j: usize| (j + n - shift % n) % n;
    let floats = |values: &[f32]| (0..n).map(|j| values[source(j)]).collect::<Vec<_>>();
    let empty: &[f32] = &[];

    build_trace(
        trace.recording_interval_ms(),
        floats(trace.x()),
        floats(trace.z()),
        floats(trace.rot_y()),
        floats(trace.rpm().unwrap_or(empty)),
        floats(trace.steering().unwrap_or(empty)),
        floats(trace.throttle().unwrap_or(empty)),
        floats(trace.brake().unwrap_or(empty)),
        trace.gear().map(|g| (0..n).map(|j| g[source(j)]).collect()).unwrap_or_default(),
    )
}

#[allow(clippy::too_many_arguments)]
fn build_trace(
    interval: f64,
    x: Vec<f32>,
    z: Vec<f32>,
    rot_y: Vec<f32>,
    rpm: Vec<f32>,
    steering: Vec<f32>,
    throttle: Vec<f32>,
    brake: Vec<f32>,
    gear: Vec<u8>,
) -> TelemetryTrace {
    TelemetryTrace::new(interval, x, z, rot_y)
        .and_then(|t| t.with_rpm(rpm))
        .and_then(|t| t.with_steering(steering))
        .and_then(|t| t.with_throttle(throttle))
        .and_then(|t| t.with_brake(brake))
        .and_then(|t| t.with_gear(gear))
        .expect("synthetic trace channels are consistent")
}
