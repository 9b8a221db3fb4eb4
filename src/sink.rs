use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use rosc::{OscMessage, OscPacket, OscType};
use tracing::debug;

/// Output that applies the computed volume.
///
/// Calls are fire-and-forget from the session's point of view: errors are
/// logged and dropped, and the next scheduled update retries implicitly.
pub trait AudioSink: Send {
    fn set_volume(&mut self, volume: f64) -> anyhow::Result<()>;

    fn play(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn seek_to_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Whether the backing platform binding exists. Checked once per session start.
    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str;
}

/// Stand-in used when no volume binding is available
#[derive(Debug, Default)]
pub struct NullSink {
    last_volume: Option<f64>,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_volume(&self) -> Option<f64> {
        self.last_volume
    }
}

impl AudioSink for NullSink {
    fn set_volume(&mut self, volume: f64) -> anyhow::Result<()> {
        debug!("Volume {:.3} (no output attached)", volume);
        self.last_volume = Some(volume);
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Streams the volume as an OSC float to a remote peer over UDP
pub struct OscVolumeSink {
    socket: UdpSocket,
    target: SocketAddr,
    address: String,
}

impl OscVolumeSink {
    pub fn connect_to(target: impl ToSocketAddrs, address: &str) -> anyhow::Result<Self> {
        let target = target
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| anyhow::anyhow!("OSC target did not resolve to an address"))?;

        let bind_addr: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)?;

        Ok(Self {
            socket,
            target,
            address: address.to_string(),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    fn send(&self, args: Vec<OscType>) -> anyhow::Result<()> {
        let packet = OscPacket::Message(OscMessage {
            addr: self.address.clone(),
            args,
        });
        let bytes = rosc::encoder::encode(&packet)?;
        self.socket.send_to(&bytes, self.target)?;
        Ok(())
    }
}

impl AudioSink for OscVolumeSink {
    fn set_volume(&mut self, volume: f64) -> anyhow::Result<()> {
        let volume = volume.clamp(0.0, 1.0);
        self.send(vec![OscType::Float(volume as f32)])
    }

    fn name(&self) -> &str {
        "osc"
    }
}
