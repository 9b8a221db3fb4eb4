//! Speed-driven volume control.
//!
//! Location fixes flow through [`SpeedEstimator`] and [`SpeedFilter`], the
//! smoothed speed is mapped to a volume, and [`UpdateScheduler`] decides when
//! the volume is actually written to an [`AudioSink`]. [`RideSession`] ties
//! the pipeline to a fix source for the duration of a ride.

pub mod error;
pub mod fix;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod sink;
pub mod source;
pub mod speed_estimator;
pub mod speed_filter;
pub mod volume_mapping;

pub use error::{Result, VibingError};
pub use fix::{AccuracyGrade, LocationFix, SpeedSample};
pub use scheduler::UpdateScheduler;
pub use session::{RideSession, RideUpdate, SessionState};
pub use settings::{RideMode, RideSettings, RideSettingsUpdate, Settings};
pub use sink::{AudioSink, NullSink, OscVolumeSink};
pub use source::{FixSender, FixSource, OscFixSource, OverrideFixSource, Subscription};
pub use speed_estimator::{haversine_distance_m, SpeedEstimator};
pub use speed_filter::SpeedFilter;
pub use volume_mapping::{map_speed_to_volume, SpeedStep, VolumeCurve, VolumeMapping};
