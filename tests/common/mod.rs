//! Minimal replay writer shared by the integration tests.

#![allow(dead_code)]

use half::f16;

pub const SIGNATURE: &str = "__AC_SHADERS_PATCH_v1__";

/// Raw values stored in one frame record.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame {
    pub x: f32,
    pub z: f32,
    pub yaw: f32,
    pub rpm: f32,
    pub steering: f32,
    pub gear: u8,
    pub throttle: u8,
    pub brake: u8,
}

impl RawFrame {
    pub fn sample(i: usize) -> Self {
        Self {
            x: 10.0 + i as f32,
            z: 20.0 + 2.0 * i as f32,
            yaw: 0.5 + (i % 8) as f32 * 0.125,
            rpm: 3000.0 + (i % 10) as f32 * 100.0,
            steering: 0.25 - (i % 4) as f32 * 0.125,
            gear: (1 + i % 5) as u8,
            throttle: (i * 13 % 256) as u8,
            brake: (i * 5 % 256) as u8,
        }
    }
}

pub struct Car {
    pub driver: String,
    pub buffer_increment: i32,
    pub frames: Vec<RawFrame>,
}

impl Car {
    pub fn new(driver: &str, frames: usize, buffer_increment: i32) -> Self {
        Self {
            driver: driver.to_owned(),
            buffer_increment,
            frames: (0..frames).map(RawFrame::sample).collect(),
        }
    }

    /// Bytes from the start of the block to the first frame record.
    pub fn header_len(&self) -> usize {
        let strings = ["ks_bmw_m3_e30", self.driver.as_str(), "GER", "Team", "skin_01"];
        strings.iter().map(|s| 4 + s.len()).sum::<usize>() + 8 + 20
    }
}

fn string(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

fn half(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&f16::from_f32(value).to_bits().to_le_bytes());
}

fn pad(out: &mut Vec<u8>, n: usize) {
    out.resize(out.len() + n, 0x5A);
}

fn frame(out: &mut Vec<u8>, f: &RawFrame) {
    out.extend_from_slice(&f.x.to_le_bytes());
    out.extend_from_slice(&1.0f32.to_le_bytes());
    out.extend_from_slice(&f.z.to_le_bytes());
    half(out, f.yaw);
    pad(out, 156);
    half(out, f.rpm);
    pad(out, 40);
    half(out, f.steering);
    pad(out, 18);
    out.push(55);
    pad(out, 1);
    out.push(f.gear);
    pad(out, 9);
    out.push(f.throttle);
    out.push(f.brake);
    pad(out, 2);
    out.push(0);
    pad(out, 5);
    out.push(0);
}

/// Write a version 16 replay; `trailer` names are appended as trailer metadata.
pub fn replay(interval_ms: f64, cars: &[Car], trailer: Option<&[&str]>) -> Vec<u8> {
    replay_with_version(16, interval_ms, cars, trailer)
}

pub fn replay_with_version(
    version: i32,
    interval_ms: f64,
    cars: &[Car],
    trailer: Option<&[&str]>,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&version.to_le_bytes());
    out.extend_from_slice(&interval_ms.to_le_bytes());
    string(&mut out, "sun");
    string(&mut out, "spa");
    string(&mut out, "");
    out.extend_from_slice(&(cars.len() as i32).to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());

    // Track-object block: 3 frames of 2 objects.
    out.extend_from_slice(&3i32.to_le_bytes());
    out.extend_from_slice(&2i32.to_le_bytes());
    pad(&mut out, (4 + 12 * 2) * 3);

    for car in cars {
        for s in ["ks_bmw_m3_e30", car.driver.as_str(), "GER", "Team", "skin_01"] {
            string(&mut out, s);
        }
        out.extend_from_slice(&(car.frames.len() as i32).to_le_bytes());
        out.extend_from_slice(&car.buffer_increment.to_le_bytes());
        pad(&mut out, 20);
        for (i, f) in car.frames.iter().enumerate() {
            frame(&mut out, f);
            let base = if i + 1 < car.frames.len() { 21 } else { 5 };
            pad(&mut out, base + 4 * car.buffer_increment as usize);
        }
    }

    if let Some(names) = trailer {
        let extra_offset = out.len() as i32;
        let mut text = String::new();
        for (i, name) in names.iter().enumerate() {
            text.push_str(&format!("[CAR_{}]\nDRIVER_NAME={}\nSETUP=default\n\n", i, name));
        }
        while text.len() <= 255 {
            text.push_str("; padding\n");
        }
        // A short binary block precedes the text.
        out.extend_from_slice(&8i32.to_le_bytes());
        pad(&mut out, 8);
        string(&mut out, &text);
        out.extend_from_slice(SIGNATURE.as_bytes());
        out.extend_from_slice(&extra_offset.to_le_bytes());
        out.extend_from_slice(&1i32.to_le_bytes());
    }
    out
}

/// Offset of the first byte after the header and track-object block.
pub fn first_car_offset() -> usize {
    4 + 8 + (4 + 3) + (4 + 3) + 4 + 4 + 4 + 4 + 4 + (4 + 12 * 2) * 3
}
