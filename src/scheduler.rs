use std::time::Duration;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Rate limiter for writes to the audio sink.
///
/// Every event still produces a target volume for display; only the sink
/// write is gated.
#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    interval_ms: u64,
    last_push_ms: Option<u64>,
}

impl UpdateScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            last_push_ms: None,
        }
    }

    /// Whether a write is due at `now_ms`. Records the write when it is.
    pub fn should_push(&mut self, now_ms: u64) -> bool {
        let due = match self.last_push_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        };

        if due {
            self.last_push_ms = Some(now_ms);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last_push_ms = None;
    }

    pub fn last_push_ms(&self) -> Option<u64> {
        self.last_push_ms
    }
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_INTERVAL)
    }
}
