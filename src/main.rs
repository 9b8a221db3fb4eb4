use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vibing::fix::mps_to_mph;
use vibing::{AudioSink, FixSource, NullSink, OscFixSource, OscVolumeSink, OverrideFixSource, RideSession, Settings};

const PUMP_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibing=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load_from(&PathBuf::from(path))?,
        None => {
            info!("Loading settings from {}", Settings::path().display());
            Settings::load_or_default()?
        }
    };

    let mut session = RideSession::new(&settings)?;

    let mut source: Box<dyn FixSource> = match settings.dev_override_mph {
        Some(mph) => {
            info!("Developer override active: {:.1} mph", mph);
            Box::new(OverrideFixSource::new(mph, settings.override_cadence()))
        }
        None => {
            info!("Listening for fixes on UDP port {}", settings.osc_listen_port);
            Box::new(OscFixSource::new(settings.osc_listen_port, &settings.osc_fix_pattern))
        }
    };

    let sink: Box<dyn AudioSink> = match &settings.osc_volume_target {
        Some(target) => match OscVolumeSink::connect_to(target.as_str(), &settings.osc_volume_address) {
            Ok(sink) => Box::new(sink),
            Err(err) => {
                error!("Could not reach volume target {}: {}", target, err);
                Box::new(NullSink::new())
            }
        },
        None => Box::new(NullSink::new()),
    };

    session.start(source.as_mut(), sink)?;

    let mut ticker = tokio::time::interval(PUMP_INTERVAL);
    let mut last_volume: Option<f64> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for update in session.pump() {
                    if update.pushed && last_volume != Some(update.target_volume) {
                        last_volume = Some(update.target_volume);
                        info!(
                            "{:.1} mph -> volume {:.0}% ({} accuracy)",
                            mps_to_mph(update.smoothed_speed_mps),
                            update.target_volume * 100.0,
                            update.sample.accuracy_grade().label(),
                        );
                    }
                }
            }
            _ = &mut ctrl_c => {
                break;
            }
        }
    }

    session.stop();
    Ok(())
}
