//! Error types for ride tracking

use thiserror::Error;

/// Errors surfaced by the speed-to-volume core and its collaborators
#[derive(Debug, Error)]
pub enum VibingError {
    /// The fix source refused access to location updates
    #[error("Location permission denied: {0}")]
    PermissionDenied(String),

    #[error("Smoothing factor must be in (0, 1], got {0}")]
    InvalidSmoothingFactor(f64),

    /// Speed bounds that leave no room for interpolation
    #[error("Max speed ({max} m/s) must be greater than min speed ({min} m/s)")]
    DegenerateSpeedRange { min: f64, max: f64 },

    #[error("Min volume ({min}) must not exceed max volume ({max})")]
    InvertedVolumeRange { min: f64, max: f64 },

    #[error("Volume must be within [0, 1], got {0}")]
    InvalidVolume(f64),

    /// Developer override speed negative or not a number
    #[error("Override speed must be a non-negative number, got {0} mph")]
    InvalidOverrideSpeed(f64),

    #[error("Override cadence must be above zero")]
    ZeroOverrideCadence,

    #[error("Invalid volume steps: {0}")]
    InvalidSteps(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed
    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Collaborator failure (fix source could not attach, etc.)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VibingError {
    /// Whether this error is a misconfiguration that must stop startup
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            VibingError::InvalidSmoothingFactor(_)
                | VibingError::DegenerateSpeedRange { .. }
                | VibingError::InvertedVolumeRange { .. }
                | VibingError::InvalidVolume(_)
                | VibingError::InvalidOverrideSpeed(_)
                | VibingError::ZeroOverrideCadence
                | VibingError::InvalidSteps(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VibingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_classified() {
        assert!(VibingError::InvalidSmoothingFactor(0.0).is_configuration());
        assert!(VibingError::DegenerateSpeedRange { min: 1.0, max: 1.0 }.is_configuration());
        assert!(VibingError::ZeroOverrideCadence.is_configuration());
        assert!(!VibingError::PermissionDenied("nope".into()).is_configuration());
    }

    #[test]
    fn messages_name_the_offending_values() {
        let err = VibingError::InvertedVolumeRange { min: 0.8, max: 0.3 };
        assert_eq!(err.to_string(), "Min volume (0.8) must not exceed max volume (0.3)");
    }
}
