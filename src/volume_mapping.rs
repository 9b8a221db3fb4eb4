//! Speed to volume mapping
//!
//! The linear mapping interpolates between a min and max volume over a speed
//! range. The stepped curve picks a fixed volume per speed threshold.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VibingError};
use crate::fix::mph_to_mps;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeMapping {
    pub min_speed_mps: f64,
    pub max_speed_mps: f64,
    pub min_volume: f64,
    pub max_volume: f64,
}

impl VolumeMapping {
    /// Validated mapping. Speed range must be non-empty and the volume range
    /// must lie within [0, 1] with min <= max.
    pub fn new(min_speed_mps: f64, max_speed_mps: f64, min_volume: f64, max_volume: f64) -> Result<Self> {
        if !(min_speed_mps.is_finite() && max_speed_mps.is_finite() && max_speed_mps > min_speed_mps) {
            return Err(VibingError::DegenerateSpeedRange {
                min: min_speed_mps,
                max: max_speed_mps,
            });
        }
        check_volume(min_volume)?;
        check_volume(max_volume)?;
        if min_volume > max_volume {
            return Err(VibingError::InvertedVolumeRange {
                min: min_volume,
                max: max_volume,
            });
        }

        Ok(Self {
            min_speed_mps,
            max_speed_mps,
            min_volume,
            max_volume,
        })
    }
}

fn check_volume(volume: f64) -> Result<()> {
    if (0.0..=1.0).contains(&volume) {
        Ok(())
    } else {
        Err(VibingError::InvalidVolume(volume))
    }
}

/// Map a speed onto a volume in [0, 1].
///
/// A degenerate speed range (max <= min) maps everything to `min_volume`,
/// and a non-finite speed counts as the minimum speed. Inverted volume ranges
/// interpolate mechanically; only the final clamp applies.
pub fn map_speed_to_volume(speed_mps: f64, mapping: &VolumeMapping) -> f64 {
    let VolumeMapping {
        min_speed_mps,
        max_speed_mps,
        min_volume,
        max_volume,
    } = *mapping;

    let t = if max_speed_mps > min_speed_mps && speed_mps.is_finite() {
        let clamped = speed_mps.clamp(min_speed_mps, max_speed_mps);
        (clamped - min_speed_mps) / (max_speed_mps - min_speed_mps)
    } else {
        0.0
    };

    // Exact at both ends of the range
    let volume = (1.0 - t) * min_volume + t * max_volume;
    volume.clamp(0.0, 1.0)
}

/// One threshold of a stepped curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedStep {
    pub min_speed_mps: f64,
    pub volume: f64,
}

impl SpeedStep {
    pub fn from_mph(mph: f64, volume: f64) -> Self {
        Self {
            min_speed_mps: mph_to_mps(mph),
            volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "steps")]
pub enum VolumeCurve {
    #[default]
    Linear,
    /// Fixed volume per speed threshold, ascending
    Stepped(Vec<SpeedStep>),
}

impl VolumeCurve {
    /// Eight levels topping out at 12 mph
    pub fn default_steps() -> Self {
        VolumeCurve::Stepped(vec![
            SpeedStep::from_mph(0.0, 0.05),
            SpeedStep::from_mph(2.0, 0.20),
            SpeedStep::from_mph(4.0, 0.35),
            SpeedStep::from_mph(6.0, 0.50),
            SpeedStep::from_mph(8.0, 0.65),
            SpeedStep::from_mph(10.0, 0.80),
            SpeedStep::from_mph(12.0, 1.00),
            SpeedStep::from_mph(15.0, 1.00),
        ])
    }

    pub fn validate(&self) -> Result<()> {
        let VolumeCurve::Stepped(steps) = self else {
            return Ok(());
        };

        if steps.is_empty() {
            return Err(VibingError::InvalidSteps("no steps".into()));
        }
        for step in steps {
            check_volume(step.volume)?;
            if !step.min_speed_mps.is_finite() {
                return Err(VibingError::InvalidSteps(format!(
                    "threshold {} is not finite",
                    step.min_speed_mps
                )));
            }
        }
        if steps.windows(2).any(|pair| pair[1].min_speed_mps <= pair[0].min_speed_mps) {
            return Err(VibingError::InvalidSteps("thresholds must be strictly ascending".into()));
        }

        Ok(())
    }

    /// Volume for `speed_mps`; the linear curve uses `mapping`
    pub fn volume_for(&self, speed_mps: f64, mapping: &VolumeMapping) -> f64 {
        match self {
            VolumeCurve::Linear => map_speed_to_volume(speed_mps, mapping),
            VolumeCurve::Stepped(steps) => {
                let step = steps
                    .iter()
                    .rev()
                    .find(|step| speed_mps >= step.min_speed_mps)
                    .or(steps.first());

                step.map_or(0.0, |step| step.volume.clamp(0.0, 1.0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bike(min_volume: f64, max_volume: f64) -> VolumeMapping {
        VolumeMapping::new(0.0, 9.0, min_volume, max_volume).unwrap()
    }

    #[test]
    fn interpolates_linearly() {
        let volume = map_speed_to_volume(4.5, &bike(0.2, 0.9));
        assert!((volume - 0.55).abs() < 1e-12);
    }

    #[test]
    fn boundaries_are_exact() {
        let mapping = bike(0.2, 0.9);
        assert_eq!(map_speed_to_volume(0.0, &mapping), 0.2);
        assert_eq!(map_speed_to_volume(9.0, &mapping), 0.9);
    }

    #[test]
    fn clamps_out_of_range_speed() {
        let mapping = bike(0.1, 0.7);
        assert_eq!(map_speed_to_volume(-3.0, &mapping), 0.1);
        assert_eq!(map_speed_to_volume(400.0, &mapping), 0.7);
        assert_eq!(map_speed_to_volume(f64::NAN, &mapping), 0.1);
    }

    #[test]
    fn degenerate_range_maps_to_min_volume() {
        let mapping = VolumeMapping {
            min_speed_mps: 2.0,
            max_speed_mps: 2.0,
            min_volume: 0.3,
            max_volume: 0.8,
        };
        assert_eq!(map_speed_to_volume(5.0, &mapping), 0.3);
    }

    #[test]
    fn inverted_volumes_still_clamp() {
        let mapping = VolumeMapping {
            min_speed_mps: 0.0,
            max_speed_mps: 2.5,
            min_volume: 1.4,
            max_volume: -0.5,
        };
        assert_eq!(map_speed_to_volume(0.0, &mapping), 1.0);
        assert_eq!(map_speed_to_volume(2.5, &mapping), 0.0);
    }

    #[test]
    fn constructor_rejects_bad_configuration() {
        assert!(matches!(
            VolumeMapping::new(0.0, 0.0, 0.2, 0.9),
            Err(VibingError::DegenerateSpeedRange { .. })
        ));
        assert!(matches!(
            VolumeMapping::new(0.0, 9.0, 0.9, 0.2),
            Err(VibingError::InvertedVolumeRange { .. })
        ));
        assert!(matches!(
            VolumeMapping::new(0.0, 9.0, 0.2, 1.5),
            Err(VibingError::InvalidVolume(_))
        ));
    }

    #[test]
    fn stepped_curve_picks_highest_reached_step() {
        let curve = VolumeCurve::default_steps();
        let mapping = bike(0.2, 0.9);

        assert_eq!(curve.volume_for(0.0, &mapping), 0.05);
        assert_eq!(curve.volume_for(mph_to_mps(5.0), &mapping), 0.35);
        assert_eq!(curve.volume_for(mph_to_mps(12.0), &mapping), 1.0);
        assert_eq!(curve.volume_for(mph_to_mps(40.0), &mapping), 1.0);
        // Below the first threshold falls back to the first step
        assert_eq!(curve.volume_for(-1.0, &mapping), 0.05);
    }

    #[test]
    fn stepped_curve_validation() {
        assert!(VolumeCurve::default_steps().validate().is_ok());
        assert!(VolumeCurve::Stepped(vec![]).validate().is_err());
        assert!(
            VolumeCurve::Stepped(vec![SpeedStep::from_mph(4.0, 0.3), SpeedStep::from_mph(2.0, 0.5)])
                .validate()
                .is_err()
        );
        assert!(VolumeCurve::Stepped(vec![SpeedStep::from_mph(0.0, 1.2)]).validate().is_err());
    }
}
