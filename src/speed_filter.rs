use crate::error::{Result, VibingError};

/// Exponential moving average over speed estimates.
///
/// The first update seeds the filter with its input so a ride that starts
/// mid-motion does not ramp up from zero.
#[derive(Debug, Clone)]
pub struct SpeedFilter {
    smoothed_speed: Option<f64>,
    alpha: f64,
}

impl SpeedFilter {
    pub fn new(alpha: f64) -> Result<Self> {
        // Also rejects NaN
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(VibingError::InvalidSmoothingFactor(alpha));
        }

        Ok(Self {
            smoothed_speed: None,
            alpha,
        })
    }

    pub fn update(&mut self, speed: f64) -> f64 {
        let smoothed = match self.smoothed_speed {
            None => speed,
            Some(previous) => self.alpha * speed + (1.0 - self.alpha) * previous,
        };

        self.smoothed_speed = Some(smoothed);
        smoothed
    }

    /// Clear the state, or seed it with `seed`
    pub fn reset(&mut self, seed: Option<f64>) {
        self.smoothed_speed = seed;
    }

    pub fn current(&self) -> f64 {
        self.smoothed_speed.unwrap_or(0.0)
    }

    pub fn is_seeded(&self) -> bool {
        self.smoothed_speed.is_some()
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}
