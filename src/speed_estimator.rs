//! Speed estimation from successive location fixes
//!
//! Device-reported speed is preferred. When it is missing or not positive the
//! estimator falls back to the great-circle distance from the last fix over
//! the elapsed time.

use crate::fix::{LocationFix, SpeedSample};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lon pairs (haversine)
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[derive(Debug, Default)]
pub struct SpeedEstimator {
    last_fix: Option<LocationFix>,
}

impl SpeedEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate the speed at `fix`. Never fails; degrades to 0 m/s.
    pub fn estimate(&mut self, fix: &LocationFix) -> SpeedSample {
        let previous = self.last_fix.replace(*fix);

        if let Some(reported) = fix.reliable_speed() {
            return SpeedSample::from_fix(fix, reported);
        }

        let speed_mps = match previous {
            Some(previous) => Self::differenced_speed(&previous, fix),
            None => 0.0,
        };

        SpeedSample::from_fix(fix, speed_mps)
    }

    pub fn reset(&mut self) {
        self.last_fix = None;
    }

    pub fn last_fix(&self) -> Option<&LocationFix> {
        self.last_fix.as_ref()
    }

    fn differenced_speed(previous: &LocationFix, current: &LocationFix) -> f64 {
        // Out-of-order timestamps count as zero elapsed time
        let elapsed_ms = current.timestamp_ms.saturating_sub(previous.timestamp_ms);
        if elapsed_ms == 0 {
            return 0.0;
        }

        let distance = haversine_distance_m(
            previous.latitude,
            previous.longitude,
            current.latitude,
            current.longitude,
        );
        let speed = distance / (elapsed_ms as f64 / 1000.0);

        if speed.is_finite() { speed } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_speed_is_used_directly() {
        let mut estimator = SpeedEstimator::new();
        estimator.estimate(&LocationFix::at(10.0, 10.0, 0));

        let sample = estimator.estimate(&LocationFix::at(50.0, 50.0, 1).with_speed(5.0));
        assert_eq!(sample.speed_mps, 5.0);
        assert_eq!(sample.raw_speed_mps, Some(5.0));
    }

    #[test]
    fn first_fix_without_speed_is_zero() {
        let mut estimator = SpeedEstimator::new();
        let sample = estimator.estimate(&LocationFix::at(0.0, 0.0, 0).with_speed(-1.0));
        assert_eq!(sample.speed_mps, 0.0);
        assert_eq!(sample.raw_speed_mps, None);
        assert!(estimator.last_fix().is_some());
    }

    #[test]
    fn falls_back_to_haversine_distance() {
        let mut estimator = SpeedEstimator::new();
        estimator.estimate(&LocationFix::at(0.0, 0.0, 0));
        let sample = estimator.estimate(&LocationFix::at(0.0, 0.0001, 1000));

        assert!((sample.speed_mps - 11.12).abs() < 0.01, "got {}", sample.speed_mps);
    }

    #[test]
    fn identical_timestamps_yield_zero() {
        let mut estimator = SpeedEstimator::new();
        estimator.estimate(&LocationFix::at(0.0, 0.0, 5000));
        let sample = estimator.estimate(&LocationFix::at(0.0, 0.01, 5000));

        assert_eq!(sample.speed_mps, 0.0);
        assert_eq!(sample.longitude, 0.01);
    }

    #[test]
    fn backwards_timestamps_yield_zero() {
        let mut estimator = SpeedEstimator::new();
        estimator.estimate(&LocationFix::at(0.0, 0.0, 5000));
        let sample = estimator.estimate(&LocationFix::at(0.0, 0.01, 4000));
        assert_eq!(sample.speed_mps, 0.0);
    }

    #[test]
    fn last_fix_tracks_every_accepted_fix() {
        let mut estimator = SpeedEstimator::new();
        estimator.estimate(&LocationFix::at(0.0, 0.0, 0));
        estimator.estimate(&LocationFix::at(0.0, 0.0001, 1000).with_speed(4.0));

        // Differencing runs against the fix that carried a speed
        let sample = estimator.estimate(&LocationFix::at(0.0, 0.0002, 2000));
        assert!((sample.speed_mps - 11.12).abs() < 0.01);
    }

    #[test]
    fn reset_forgets_the_last_fix() {
        let mut estimator = SpeedEstimator::new();
        estimator.estimate(&LocationFix::at(0.0, 0.0, 0));
        estimator.reset();

        let sample = estimator.estimate(&LocationFix::at(0.0, 0.0001, 1000));
        assert_eq!(sample.speed_mps, 0.0);
    }

    #[test]
    fn haversine_known_distance() {
        // One degree of longitude on the equator
        let d = haversine_distance_m(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_194.9).abs() < 1.0);
        assert_eq!(haversine_distance_m(48.1, 11.5, 48.1, 11.5), 0.0);
    }
}
