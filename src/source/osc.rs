use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket as StdUdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use rosc::{OscMessage, OscPacket, OscType};
use tokio::net::UdpSocket;
use tracing::{debug, warn};
use wildmatch::WildMatch;

use crate::error::Result;
use crate::fix::{epoch_millis, LocationFix};
use super::{FixSender, FixSource, Subscription};

const RECEIVE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Receives location fixes as OSC messages over UDP.
///
/// Arguments, in order: latitude, longitude, then optionally speed (m/s,
/// negative when unavailable), accuracy, altitude, heading and a timestamp in
/// milliseconds. Missing timestamps use the receive time.
///
/// The port is bound on the first watch and held until the source is dropped,
/// so a ride can be restarted immediately on the same port.
pub struct OscFixSource {
    port: u16,
    pattern: WildMatch,
    socket: Option<StdUdpSocket>,
}

impl OscFixSource {
    pub fn new(port: u16, pattern: &str) -> Self {
        Self {
            port,
            pattern: WildMatch::new(pattern),
            socket: None,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|socket| socket.local_addr().ok())
    }

    fn watch_socket(&mut self) -> anyhow::Result<StdUdpSocket> {
        let socket = match self.socket.take() {
            Some(socket) => socket,
            None => {
                let socket = StdUdpSocket::bind(("0.0.0.0", self.port))?;
                socket.set_nonblocking(true)?;
                socket
            }
        };

        // Fixes that queued up between rides are stale
        let mut buffer = [0; rosc::decoder::MTU];
        let mut discarded = 0;
        loop {
            match socket.recv_from(&mut buffer) {
                Ok(_) => discarded += 1,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    debug!("Stopped draining OSC socket: {}", err);
                    break;
                }
            }
        }
        if discarded > 0 {
            debug!("Discarded {} queued OSC packets", discarded);
        }

        let watched = socket.try_clone();
        self.socket = Some(socket);
        Ok(watched?)
    }

    async fn osc_task(socket: StdUdpSocket, tx: FixSender, pattern: WildMatch, active: Arc<AtomicBool>) -> anyhow::Result<()> {
        let socket = UdpSocket::from_std(socket)?;

        let mut buffer = [0; rosc::decoder::MTU];
        while active.load(Ordering::SeqCst) {
            let (len, peer) = match socket.recv_from(&mut buffer).await {
                Ok(received) => received,
                Err(err) => {
                    warn!("OSC receive failed: {}", err);
                    tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
                    continue;
                }
            };
            let packet = match rosc::decoder::decode_udp(&buffer[..len]) {
                Ok((_, packet)) => packet,
                Err(err) => {
                    warn!("Dropping malformed OSC packet from {}: {:?}", peer, err);
                    continue;
                }
            };

            let OscPacket::Message(message) = packet else {
                continue;
            };
            if !pattern.matches(&message.addr) {
                continue;
            }

            let Some(fix) = parse_fix(&message, epoch_millis()) else {
                debug!("Ignoring {} without coordinates", message.addr);
                continue;
            };

            // Session gone or subscription stopped while we were waiting
            if !active.load(Ordering::SeqCst) || tx.send(fix).is_err() {
                break;
            }
        }

        Ok(())
    }
}

impl FixSource for OscFixSource {
    fn ensure_permission(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_watching(&mut self, tx: FixSender) -> anyhow::Result<Subscription> {
        let runtime = tokio::runtime::Handle::try_current()?;

        let socket = self.watch_socket()?;

        let active = Arc::new(AtomicBool::new(true));
        let pattern = self.pattern.clone();
        let task_active = active.clone();
        let task = runtime.spawn(async move {
            if let Err(err) = OscFixSource::osc_task(socket, tx, pattern, task_active).await {
                warn!("OSC fix source stopped: {}", err);
            }
        });

        Ok(Subscription::with_task(active, task))
    }
}

fn arg_f64(arg: &OscType) -> Option<f64> {
    match arg {
        OscType::Float(value) => Some(*value as f64),
        OscType::Double(value) => Some(*value),
        OscType::Int(value) => Some(*value as f64),
        OscType::Long(value) => Some(*value as f64),
        _ => None,
    }
}

/// Decode one fix message; `received_ms` stands in for a missing timestamp
pub fn parse_fix(message: &OscMessage, received_ms: u64) -> Option<LocationFix> {
    let mut args = message.args.iter().map(arg_f64);

    let latitude = args.next().flatten()?;
    let longitude = args.next().flatten()?;
    if !(latitude.is_finite() && longitude.is_finite()) {
        return None;
    }

    let speed = args.next().flatten();
    let accuracy = args.next().flatten().filter(|v| *v >= 0.0);
    let altitude = args.next().flatten().filter(|v| v.is_finite());
    let heading = args.next().flatten().filter(|v| *v >= 0.0);
    let timestamp_ms = args
        .next()
        .flatten()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
        .unwrap_or(received_ms);

    Some(LocationFix {
        latitude,
        longitude,
        altitude,
        heading,
        accuracy,
        speed,
        timestamp_ms,
    })
}
