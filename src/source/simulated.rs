use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::Result;
use crate::fix::{epoch_millis, mph_to_mps, LocationFix};
use super::{FixSender, FixSource, Subscription};

/// Developer override: emits a fix with a fixed reported speed at a steady
/// cadence, standing in for the real location source.
pub struct OverrideFixSource {
    speed_mph: Arc<AtomicU64>,
    cadence: Duration,
    latitude: f64,
    longitude: f64,
}

impl OverrideFixSource {
    pub fn new(speed_mph: f64, cadence: Duration) -> Self {
        Self {
            speed_mph: Arc::new(AtomicU64::new(speed_mph.to_bits())),
            cadence,
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    /// Takes effect from the next tick, also while watching
    pub fn set_speed_mph(&self, speed_mph: f64) {
        self.speed_mph.store(speed_mph.to_bits(), Ordering::SeqCst);
    }

    pub fn speed_mph(&self) -> f64 {
        f64::from_bits(self.speed_mph.load(Ordering::SeqCst))
    }
}

impl FixSource for OverrideFixSource {
    fn ensure_permission(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_watching(&mut self, tx: FixSender) -> anyhow::Result<Subscription> {
        let runtime = tokio::runtime::Handle::try_current()?;
        if self.cadence.is_zero() {
            anyhow::bail!("Override cadence must be above zero");
        }

        let active = Arc::new(AtomicBool::new(true));
        let task_active = active.clone();
        let speed_mph = self.speed_mph.clone();
        let (latitude, longitude, cadence) = (self.latitude, self.longitude, self.cadence);

        let task = runtime.spawn(async move {
            let mut ticker = interval(cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !task_active.load(Ordering::SeqCst) {
                    break;
                }

                let speed = mph_to_mps(f64::from_bits(speed_mph.load(Ordering::SeqCst)));
                let fix = LocationFix::at(latitude, longitude, epoch_millis()).with_speed(speed);
                if tx.send(fix).is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::with_task(active, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[tokio::test(flavor = "multi_thread")]
    async fn ticks_with_the_override_speed() {
        let mut source = OverrideFixSource::new(8.0, Duration::from_millis(10));
        let (tx, rx) = channel();
        let mut subscription = source.start_watching(tx).unwrap();

        let first = tokio::task::spawn_blocking(move || {
            let fix = rx.recv_timeout(Duration::from_secs(2));
            (fix, rx)
        })
        .await
        .unwrap();
        let (fix, _rx) = first;
        let fix = fix.unwrap();

        assert!((fix.speed.unwrap() - mph_to_mps(8.0)).abs() < 1e-12);
        assert_eq!((fix.latitude, fix.longitude), (0.0, 0.0));

        subscription.stop();
        assert!(!subscription.is_active());
    }

    #[test]
    fn speed_can_change_while_watching() {
        let source = OverrideFixSource::new(8.0, Duration::from_millis(500));
        source.set_speed_mph(12.5);
        assert_eq!(source.speed_mph(), 12.5);
    }

    #[test]
    fn needs_a_runtime() {
        let mut source = OverrideFixSource::new(8.0, Duration::from_millis(500));
        let (tx, _rx) = channel();
        assert!(source.start_watching(tx).is_err());
    }
}
