//! Per-driver telemetry trace produced by the decoder and the normalizer

use serde::{Deserialize, Serialize};

use crate::{ReplayError, Result};

/// Named channel of a [`TelemetryTrace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Channel {
    X,
    Z,
    RotY,
    Rpm,
    Steering,
    Throttle,
    Brake,
    Gear,
}

impl Channel {
    /// Every channel, in interchange order.
    pub const ALL: [Channel; 8] = [
        Channel::X,
        Channel::Z,
        Channel::RotY,
        Channel::Rpm,
        Channel::Steering,
        Channel::Throttle,
        Channel::Brake,
        Channel::Gear,
    ];

    /// Key used for this channel in the JSON interchange format.
    pub fn key(self) -> &'static str {
        match self {
            Channel::X => "x",
            Channel::Z => "z",
            Channel::RotY => "rotY",
            Channel::Rpm => "rpm",
            Channel::Steering => "steering",
            Channel::Throttle => "throttle",
            Channel::Brake => "brake",
            Channel::Gear => "gear",
        }
    }

    /// Whether a trace may omit this channel entirely.
    pub fn is_optional(self) -> bool {
        !matches!(self, Channel::X | Channel::Z | Channel::RotY)
    }
}

/// Frame-by-frame motion record of one driver.
///
/// Position (`x`, `z`) and heading (`rot_y`) are always present. The input and engine
/// channels are optional, but a present channel always holds exactly `num_frames` samples:
/// a channel is either complete or absent. `z`, `rot_y` and `steering` are stored with the
/// sign inverted relative to the replay's raw values.
///
/// Traces are immutable once built. Deserialization runs the same validation as the
/// constructors, so a trace obtained from JSON upholds the length invariant too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(try_from = "TraceRecord", rename_all = "camelCase")]
pub struct TelemetryTrace {
    num_frames: usize,
    #[serde(rename = "recordingInterval")]
    recording_interval_ms: f64,
    x: Vec<f32>,
    z: Vec<f32>,
    rot_y: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rpm: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    steering: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    throttle: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brake: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gear: Option<Vec<u8>>,
}

/// Unvalidated wire shape of a trace.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TraceRecord {
    num_frames: usize,
    #[serde(rename = "recordingInterval")]
    recording_interval_ms: f64,
    x: Vec<f32>,
    z: Vec<f32>,
    rot_y: Vec<f32>,
    #[serde(default)]
    rpm: Option<Vec<f32>>,
    #[serde(default)]
    steering: Option<Vec<f32>>,
    #[serde(default)]
    throttle: Option<Vec<f32>>,
    #[serde(default)]
    brake: Option<Vec<f32>>,
    #[serde(default)]
    gear: Option<Vec<u8>>,
}

impl TryFrom<TraceRecord> for TelemetryTrace {
    type Error = ReplayError;

    fn try_from(record: TraceRecord) -> Result<Self> {
        let trace =
            TelemetryTrace::new(record.recording_interval_ms, record.x, record.z, record.rot_y)?;
        if trace.num_frames != record.num_frames {
            return Err(ReplayError::invalid_trace(format!(
                "numFrames is {} but position channels hold {} samples",
                record.num_frames, trace.num_frames
            )));
        }

        let mut trace = trace;
        if let Some(rpm) = record.rpm {
            trace = trace.with_rpm(rpm)?;
        }
        if let Some(steering) = record.steering {
            trace = trace.with_steering(steering)?;
        }
        if let Some(throttle) = record.throttle {
            trace = trace.with_throttle(throttle)?;
        }
        if let Some(brake) = record.brake {
            trace = trace.with_brake(brake)?;
        }
        if let Some(gear) = record.gear {
            trace = trace.with_gear(gear)?;
        }
        Ok(trace)
    }
}

impl TelemetryTrace {
    /// Build a trace from its mandatory position and heading channels.
    ///
    /// Fails when the channels are empty or of different lengths, or when the recording
    /// interval is not a positive finite number of milliseconds.
    pub fn new(
        recording_interval_ms: f64,
        x: Vec<f32>,
        z: Vec<f32>,
        rot_y: Vec<f32>,
    ) -> Result<Self> {
        if !(recording_interval_ms.is_finite() && recording_interval_ms > 0.0) {
            return Err(ReplayError::invalid_trace(format!(
                "recording interval must be positive, got {}",
                recording_interval_ms
            )));
        }

        let num_frames = x.len();
        if num_frames == 0 {
            return Err(ReplayError::invalid_trace("trace must contain at least one frame"));
        }

        let mut trace = Self {
            num_frames,
            recording_interval_ms,
            x,
            z: Vec::new(),
            rot_y: Vec::new(),
            rpm: None,
            steering: None,
            throttle: None,
            brake: None,
            gear: None,
        };
        trace.check_len(Channel::Z, z.len())?;
        trace.check_len(Channel::RotY, rot_y.len())?;
        trace.z = z;
        trace.rot_y = rot_y;
        Ok(trace)
    }

    pub fn with_rpm(mut self, rpm: Vec<f32>) -> Result<Self> {
        self.check_len(Channel::Rpm, rpm.len())?;
        self.rpm = Some(rpm);
        Ok(self)
    }

    pub fn with_steering(mut self, steering: Vec<f32>) -> Result<Self> {
        self.check_len(Channel::Steering, steering.len())?;
        self.steering = Some(steering);
        Ok(self)
    }

    pub fn with_throttle(mut self, throttle: Vec<f32>) -> Result<Self> {
        self.check_len(Channel::Throttle, throttle.len())?;
        self.throttle = Some(throttle);
        Ok(self)
    }

    pub fn with_brake(mut self, brake: Vec<f32>) -> Result<Self> {
        self.check_len(Channel::Brake, brake.len())?;
        self.brake = Some(brake);
        Ok(self)
    }

    pub fn with_gear(mut self, gear: Vec<u8>) -> Result<Self> {
        self.check_len(Channel::Gear, gear.len())?;
        self.gear = Some(gear);
        Ok(self)
    }

    fn check_len(&self, channel: Channel, len: usize) -> Result<()> {
        if len != self.num_frames {
            return Err(ReplayError::invalid_trace(format!(
                "channel '{}' holds {} samples, expected {}",
                channel.key(),
                len,
                self.num_frames
            )));
        }
        Ok(())
    }

    /// Build a `num_frames`-frame trace by sampling every present channel of this one.
    ///
    /// Channel presence carries over unchanged. Callers pass a positive frame count and
    /// a positive interval.
    pub(crate) fn resample_with<F, G>(
        &self,
        recording_interval_ms: f64,
        num_frames: usize,
        continuous: F,
        discrete: G,
    ) -> Self
    where
        F: Fn(&[f32], usize) -> f32,
        G: Fn(&[u8], usize) -> u8,
    {
        let floats =
            |values: &[f32]| (0..num_frames).map(|i| continuous(values, i)).collect::<Vec<_>>();
        Self {
            num_frames,
            recording_interval_ms,
            x: floats(&self.x),
            z: floats(&self.z),
            rot_y: floats(&self.rot_y),
            rpm: self.rpm.as_deref().map(floats),
            steering: self.steering.as_deref().map(floats),
            throttle: self.throttle.as_deref().map(floats),
            brake: self.brake.as_deref().map(floats),
            gear: self.gear.as_deref().map(|g| (0..num_frames).map(|i| discrete(g, i)).collect()),
        }
    }

    /// Number of sampled instants.
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Nominal milliseconds between frames.
    pub fn recording_interval_ms(&self) -> f64 {
        self.recording_interval_ms
    }

    /// Total recorded duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.num_frames as f64 * self.recording_interval_ms
    }

    pub fn x(&self) -> &[f32] {
        &self.x
    }

    pub fn z(&self) -> &[f32] {
        &self.z
    }

    pub fn rot_y(&self) -> &[f32] {
        &self.rot_y
    }

    pub fn rpm(&self) -> Option<&[f32]> {
        self.rpm.as_deref()
    }

    pub fn steering(&self) -> Option<&[f32]> {
        self.steering.as_deref()
    }

    pub fn throttle(&self) -> Option<&[f32]> {
        self.throttle.as_deref()
    }

    pub fn brake(&self) -> Option<&[f32]> {
        self.brake.as_deref()
    }

    pub fn gear(&self) -> Option<&[u8]> {
        self.gear.as_deref()
    }

    /// Whether the trace carries the given channel.
    pub fn has_channel(&self, channel: Channel) -> bool {
        match channel {
            Channel::X | Channel::Z | Channel::RotY => true,
            Channel::Rpm => self.rpm.is_some(),
            Channel::Steering => self.steering.is_some(),
            Channel::Throttle => self.throttle.is_some(),
            Channel::Brake => self.brake.is_some(),
            Channel::Gear => self.gear.is_some(),
        }
    }

    /// Value of a channel at a frame, widened to `f64`.
    ///
    /// Returns `None` if the channel is absent or the frame is out of range.
    pub fn value(&self, channel: Channel, frame: usize) -> Option<f64> {
        let float = |values: &[f32]| values.get(frame).map(|v| f64::from(*v));
        match channel {
            Channel::X => float(&self.x),
            Channel::Z => float(&self.z),
            Channel::RotY => float(&self.rot_y),
            Channel::Rpm => self.rpm.as_deref().and_then(float),
            Channel::Steering => self.steering.as_deref().and_then(float),
            Channel::Throttle => self.throttle.as_deref().and_then(float),
            Channel::Brake => self.brake.as_deref().and_then(float),
            Channel::Gear => self.gear.as_deref().and_then(|g| g.get(frame)).map(|g| f64::from(*g)),
        }
    }

    /// World position `(x, z)` at a frame.
    pub fn position(&self, frame: usize) -> Option<(f32, f32)> {
        Some((*self.x.get(frame)?, *self.z.get(frame)?))
    }

    /// Fraction of the trace covered at `frame`, in `[0, 1]`.
    pub fn progress(&self, frame: usize) -> f64 {
        if self.num_frames <= 1 {
            return 0.0;
        }
        frame.min(self.num_frames - 1) as f64 / (self.num_frames - 1) as f64
    }
}
