use std::sync::mpsc::{channel, Receiver};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::fix::{LocationFix, SpeedSample};
use crate::settings::{RideSettings, RideSettingsUpdate, Settings};
use crate::sink::{AudioSink, NullSink};
use crate::source::{FixSource, Subscription};
use crate::speed_estimator::SpeedEstimator;
use crate::speed_filter::SpeedFilter;
use crate::scheduler::UpdateScheduler;
use crate::volume_mapping::VolumeMapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Tracking,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RideUpdate {
    pub sample: SpeedSample,
    pub smoothed_speed_mps: f64,
    /// Always recomputed, even when the sink write was suppressed
    pub target_volume: f64,
    pub pushed: bool,
}

/// One ride: owns the pipeline state between start and stop.
///
/// Fix events are handled synchronously. Anything arriving while the session
/// is not running is dropped without touching the sink.
pub struct RideSession {
    id: Uuid,
    state: SessionState,
    running: bool,
    settings: RideSettings,
    mapping: VolumeMapping,
    estimator: SpeedEstimator,
    filter: SpeedFilter,
    scheduler: UpdateScheduler,
    sink: Box<dyn AudioSink>,
    subscription: Option<Subscription>,
    fix_rx: Option<Receiver<LocationFix>>,
    started_at: Instant,
    last_update: Option<RideUpdate>,
}

impl RideSession {
    pub fn new(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            running: false,
            settings: settings.ride.clone(),
            mapping: settings.ride.mapping()?,
            estimator: SpeedEstimator::new(),
            filter: SpeedFilter::new(settings.smoothing_alpha)?,
            scheduler: UpdateScheduler::new(settings.update_interval()),
            sink: Box::new(NullSink::new()),
            subscription: None,
            fix_rx: None,
            started_at: Instant::now(),
            last_update: None,
        })
    }

    /// Enter Tracking. A permission or attach failure leaves the session Idle.
    pub fn start(&mut self, source: &mut dyn FixSource, sink: Box<dyn AudioSink>) -> Result<()> {
        if self.state == SessionState::Tracking {
            debug!(session = %self.id, "Start ignored, already tracking");
            return Ok(());
        }

        source.ensure_permission()?;

        let (tx, rx) = channel::<LocationFix>();
        let subscription = source.start_watching(tx)?;

        self.id = Uuid::new_v4();
        self.estimator.reset();
        self.filter.reset(None);
        self.scheduler.reset();
        self.last_update = None;

        self.sink = if sink.is_available() {
            sink
        } else {
            warn!(session = %self.id, "Audio sink '{}' unavailable, volume changes will not be applied", sink.name());
            Box::new(NullSink::new())
        };

        self.subscription = Some(subscription);
        self.fix_rx = Some(rx);
        self.started_at = Instant::now();
        self.running = true;
        self.state = SessionState::Tracking;

        if let Err(err) = self.sink.play() {
            warn!(session = %self.id, "Failed to start playback: {}", err);
        }

        info!(session = %self.id, sink = self.sink.name(), mode = ?self.settings.mode, "Ride started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }

        self.running = false;
        if let Some(mut subscription) = self.subscription.take() {
            subscription.stop();
        }
        // Fixes still queued are dropped with the receiver
        self.fix_rx = None;

        if let Err(err) = self.sink.pause() {
            warn!(session = %self.id, "Failed to pause playback: {}", err);
        }
        if let Err(err) = self.sink.seek_to_start() {
            warn!(session = %self.id, "Failed to rewind playback: {}", err);
        }

        self.state = SessionState::Idle;
        info!(session = %self.id, "Ride stopped");
    }

    /// Run one fix through the pipeline. `now_ms` is a monotonic clock used
    /// only to rate-limit sink writes.
    pub fn handle_fix(&mut self, fix: &LocationFix, now_ms: u64) -> Option<RideUpdate> {
        if !self.running {
            debug!(session = %self.id, "Dropping fix received while not tracking");
            return None;
        }

        let sample = self.estimator.estimate(fix);
        let smoothed_speed_mps = self.filter.update(sample.speed_mps);
        let target_volume = self.settings.curve.volume_for(smoothed_speed_mps, &self.mapping);

        let pushed = self.scheduler.should_push(now_ms);
        if pushed {
            if let Err(err) = self.sink.set_volume(target_volume) {
                warn!(session = %self.id, "Failed to set volume on '{}': {}", self.sink.name(), err);
            }
        }

        debug!(
            session = %self.id,
            speed = sample.speed_mps,
            smoothed = smoothed_speed_mps,
            volume = target_volume,
            pushed,
            "Fix processed"
        );

        let update = RideUpdate {
            sample,
            smoothed_speed_mps,
            target_volume,
            pushed,
        };
        self.last_update = Some(update);
        Some(update)
    }

    /// Process every fix queued since the last call, timed by the session clock
    pub fn pump(&mut self) -> Vec<RideUpdate> {
        let fixes: Vec<LocationFix> = match &self.fix_rx {
            Some(rx) => rx.try_iter().collect(),
            None => return Vec::new(),
        };

        let mut updates = Vec::with_capacity(fixes.len());
        for fix in fixes {
            let now_ms = self.started_at.elapsed().as_millis() as u64;
            if let Some(update) = self.handle_fix(&fix, now_ms) {
                updates.push(update);
            }
        }
        updates
    }

    /// Merge a settings change; rejected whole when the result is invalid
    pub fn update_settings(&mut self, update: RideSettingsUpdate) -> Result<()> {
        let mut next = self.settings.clone();
        next.apply(update);
        next.validate()?;

        self.mapping = next.mapping()?;
        self.settings = next;
        Ok(())
    }

    pub fn set_min_volume(&mut self, volume: f64) -> Result<()> {
        let mut next = self.settings.clone();
        next.set_min_volume(volume);
        self.mapping = next.mapping()?;
        self.settings = next;
        Ok(())
    }

    pub fn set_max_volume(&mut self, volume: f64) -> Result<()> {
        let mut next = self.settings.clone();
        next.set_max_volume(volume);
        self.mapping = next.mapping()?;
        self.settings = next;
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn settings(&self) -> &RideSettings {
        &self.settings
    }

    pub fn last_update(&self) -> Option<&RideUpdate> {
        self.last_update.as_ref()
    }

    pub fn target_volume(&self) -> Option<f64> {
        self.last_update.map(|update| update.target_volume)
    }

    pub fn smoothed_speed_mps(&self) -> f64 {
        self.filter.current()
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }
}

impl Drop for RideSession {
    fn drop(&mut self) {
        self.stop();
    }
}
