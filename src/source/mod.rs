//! Location fix sources
//!
//! A source delivers fixes over a single-consumer channel until its
//! [`Subscription`] is stopped or dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::fix::LocationFix;

pub mod osc;
pub mod simulated;

pub use osc::OscFixSource;
pub use simulated::OverrideFixSource;

pub type FixSender = Sender<LocationFix>;

pub trait FixSource {
    /// Fails with [`VibingError::PermissionDenied`](crate::VibingError::PermissionDenied)
    /// when location access is not granted.
    fn ensure_permission(&mut self) -> Result<()>;

    fn start_watching(&mut self, tx: FixSender) -> anyhow::Result<Subscription>;
}

/// Handle for an active fix delivery. Stops delivery on drop.
#[derive(Debug)]
pub struct Subscription {
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Subscription driven by a flag the producer polls before each send
    pub fn new(active: Arc<AtomicBool>) -> Self {
        Self { active, task: None }
    }

    pub fn with_task(active: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Self {
            active,
            task: Some(task),
        }
    }

    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}
