use std::path::{Path, PathBuf};
use std::time::Duration;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VibingError};
use crate::volume_mapping::{VolumeCurve, VolumeMapping};

lazy_static! {
    static ref SETTINGS_PATH: PathBuf = {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("vibing.json")))
            .unwrap_or_else(|| PathBuf::from("vibing.json"))
    };
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RideMode {
    Walk,
    #[default]
    Bike,
}

impl RideMode {
    pub fn max_speed_mps(&self) -> f64 {
        match self {
            RideMode::Walk => 2.5,
            RideMode::Bike => 9.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RideSettings {
    pub mode: RideMode,
    pub min_volume: f64,
    pub max_volume: f64,
    pub curve: VolumeCurve,
}

impl Default for RideSettings {
    fn default() -> Self {
        Self {
            mode: RideMode::Bike,
            min_volume: 0.2,
            max_volume: 0.9,
            curve: VolumeCurve::Linear,
        }
    }
}

/// Partial update for [`RideSettings`], applied mid-ride
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RideSettingsUpdate {
    pub mode: Option<RideMode>,
    pub min_volume: Option<f64>,
    pub max_volume: Option<f64>,
    pub curve: Option<VolumeCurve>,
}

impl RideSettings {
    /// Slider rule: min volume never rises above max volume
    pub fn set_min_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        self.min_volume = volume.clamp(0.0, self.max_volume);
    }

    pub fn set_max_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        self.max_volume = volume.clamp(self.min_volume, 1.0);
    }

    /// Merge an update. Fields are taken verbatim; call [`validate`](Self::validate) after.
    pub fn apply(&mut self, update: RideSettingsUpdate) {
        if let Some(mode) = update.mode {
            self.mode = mode;
        }
        if let Some(min_volume) = update.min_volume {
            self.min_volume = min_volume;
        }
        if let Some(max_volume) = update.max_volume {
            self.max_volume = max_volume;
        }
        if let Some(curve) = update.curve {
            self.curve = curve;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.mapping()?;
        self.curve.validate()
    }

    pub fn mapping(&self) -> Result<VolumeMapping> {
        VolumeMapping::new(0.0, self.mode.max_speed_mps(), self.min_volume, self.max_volume)
    }

    pub fn volume_for(&self, speed_mps: f64) -> Result<f64> {
        Ok(self.curve.volume_for(speed_mps, &self.mapping()?))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub ride: RideSettings,
    pub smoothing_alpha: f64,
    pub update_interval_ms: u64,
    /// Simulated speed; replaces the location source when set
    pub dev_override_mph: Option<f64>,
    pub override_cadence_ms: u64,
    pub osc_listen_port: u16,
    pub osc_fix_pattern: String,
    /// `host:port` to stream the volume to
    pub osc_volume_target: Option<String>,
    pub osc_volume_address: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ride: RideSettings::default(),
            smoothing_alpha: 0.25,
            update_interval_ms: 500,
            dev_override_mph: None,
            override_cadence_ms: 500,
            osc_listen_port: 9001,
            osc_fix_pattern: "/vibing/fix".into(),
            osc_volume_target: None,
            osc_volume_address: "/vibing/volume".into(),
        }
    }
}

impl Settings {
    pub fn load_or_default() -> anyhow::Result<Self> {
        Self::load_from(&SETTINGS_PATH)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let settings = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&settings)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(VibingError::InvalidSmoothingFactor(self.smoothing_alpha));
        }
        if let Some(mph) = self.dev_override_mph {
            if !(mph.is_finite() && mph >= 0.0) {
                return Err(VibingError::InvalidOverrideSpeed(mph));
            }
        }
        if self.override_cadence_ms == 0 {
            return Err(VibingError::ZeroOverrideCadence);
        }
        self.ride.validate()
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn override_cadence(&self) -> Duration {
        Duration::from_millis(self.override_cadence_ms)
    }

    pub fn path() -> &'static Path {
        &SETTINGS_PATH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_speed_bounds() {
        assert_eq!(RideMode::Walk.max_speed_mps(), 2.5);
        assert_eq!(RideMode::Bike.max_speed_mps(), 9.0);
    }

    #[test]
    fn sliders_keep_min_below_max() {
        let mut ride = RideSettings::default();
        ride.set_min_volume(0.95);
        assert_eq!(ride.min_volume, 0.9);

        ride.set_max_volume(0.1);
        assert_eq!(ride.max_volume, 0.9);

        ride.set_min_volume(0.3);
        ride.set_max_volume(0.1);
        assert_eq!(ride.max_volume, 0.3);
    }

    #[test]
    fn apply_merges_partial_updates() {
        let mut ride = RideSettings::default();
        ride.apply(RideSettingsUpdate {
            mode: Some(RideMode::Walk),
            max_volume: Some(0.6),
            ..Default::default()
        });

        assert_eq!(ride.mode, RideMode::Walk);
        assert_eq!(ride.min_volume, 0.2);
        assert_eq!(ride.max_volume, 0.6);
        assert_eq!(ride.mapping().unwrap().max_speed_mps, 2.5);
    }

    #[test]
    fn validate_catches_inverted_volumes() {
        let ride = RideSettings {
            min_volume: 0.8,
            max_volume: 0.4,
            ..Default::default()
        };
        assert!(matches!(ride.validate(), Err(VibingError::InvertedVolumeRange { .. })));
    }

    #[test]
    fn bike_mode_end_to_end_volume() {
        let volume = RideSettings::default().volume_for(4.5).unwrap();
        assert!((volume - 0.55).abs() < 1e-12);
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let json = r#"{ "ride": { "mode": "walk" }, "smoothing_alpha": 0.5 }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.ride.mode, RideMode::Walk);
        assert_eq!(settings.ride.max_volume, 0.9);
        assert_eq!(settings.smoothing_alpha, 0.5);
        assert_eq!(settings.update_interval(), Duration::from_millis(500));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn parses_stepped_curve() {
        let json = r#"{ "ride": { "curve": { "kind": "stepped", "steps": [
            { "min_speed_mps": 0.0, "volume": 0.1 },
            { "min_speed_mps": 3.0, "volume": 0.7 }
        ] } } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert!(matches!(settings.ride.curve, VolumeCurve::Stepped(ref steps) if steps.len() == 2));
        assert_eq!(settings.ride.volume_for(3.5).unwrap(), 0.7);
    }

    #[test]
    fn rejects_bad_smoothing_factor() {
        let settings = Settings {
            smoothing_alpha: 1.5,
            ..Default::default()
        };
        assert!(settings.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn rejects_zero_override_cadence() {
        let settings: Settings = serde_json::from_str(r#"{ "dev_override_mph": 5.0, "override_cadence_ms": 0 }"#).unwrap();
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, VibingError::ZeroOverrideCadence));
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("vibing-settings-that-does-not-exist.json");
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_fails_fast_on_misconfiguration() {
        let path = std::env::temp_dir().join(format!("vibing-settings-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{ "ride": { "min_volume": 0.9, "max_volume": 0.1 } }"#).unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        let err = err.downcast::<VibingError>().unwrap();
        assert!(err.is_configuration());
    }
}
