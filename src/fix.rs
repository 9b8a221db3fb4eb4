//! Location fixes and the speed samples derived from them

use std::time::{SystemTime, UNIX_EPOCH};
use serde::Serialize;

const MPS_TO_MPH: f64 = 2.23694;

/// A single positional observation from a location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
    /// Horizontal accuracy in meters
    pub accuracy: Option<f64>,
    /// Device-reported speed in m/s, may be negative when unavailable
    pub speed: Option<f64>,
    /// Milliseconds since epoch
    pub timestamp_ms: u64,
}

impl LocationFix {
    pub fn at(latitude: f64, longitude: f64, timestamp_ms: u64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            heading: None,
            accuracy: None,
            speed: None,
            timestamp_ms,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// The reported speed when it can be trusted: finite and above zero
    pub fn reliable_speed(&self) -> Option<f64> {
        self.speed.filter(|speed| speed.is_finite() && *speed > 0.0)
    }
}

/// Speed estimate for one fix, plus the fix fields passed through for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedSample {
    pub speed_mps: f64,
    /// Device-reported speed, only when it was usable
    pub raw_speed_mps: Option<f64>,
    pub timestamp_ms: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
}

impl SpeedSample {
    pub(crate) fn from_fix(fix: &LocationFix, speed_mps: f64) -> Self {
        Self {
            speed_mps,
            raw_speed_mps: fix.reliable_speed(),
            timestamp_ms: fix.timestamp_ms,
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.accuracy,
            altitude: fix.altitude,
            heading: fix.heading,
        }
    }

    pub fn accuracy_grade(&self) -> AccuracyGrade {
        AccuracyGrade::from_meters(self.accuracy)
    }
}

/// Coarse quality bucket for a fix's horizontal accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccuracyGrade {
    Unknown,
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl AccuracyGrade {
    pub fn from_meters(accuracy: Option<f64>) -> Self {
        match accuracy {
            None => AccuracyGrade::Unknown,
            Some(m) if m.is_nan() => AccuracyGrade::Unknown,
            Some(m) if m <= 5.0 => AccuracyGrade::Excellent,
            Some(m) if m <= 10.0 => AccuracyGrade::Good,
            Some(m) if m <= 20.0 => AccuracyGrade::Fair,
            Some(m) if m <= 50.0 => AccuracyGrade::Poor,
            Some(_) => AccuracyGrade::VeryPoor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccuracyGrade::Unknown => "Unknown",
            AccuracyGrade::Excellent => "Excellent",
            AccuracyGrade::Good => "Good",
            AccuracyGrade::Fair => "Fair",
            AccuracyGrade::Poor => "Poor",
            AccuracyGrade::VeryPoor => "Very Poor",
        }
    }
}

/// Wall-clock milliseconds since epoch, the timestamp base of fixes
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

pub fn mps_to_mph(mps: f64) -> f64 {
    mps * MPS_TO_MPH
}

pub fn mph_to_mps(mph: f64) -> f64 {
    mph / MPS_TO_MPH
}
