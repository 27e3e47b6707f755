use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::state::{AssociationState, HandlerState, StateError};
use crate::traits::{FrameSink, FrameSource, TransportStats};

/// Largest UDP payload that fits an IPv4 datagram (65 535 − 8 − 20).
pub const UDP_MAX_DATAGRAM: usize = 65_507;

/// Configuration for [`UdpTransport`].
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Local address to bind. Port 0 picks an ephemeral port.
    pub bind_addr: SocketAddr,
    /// Read timeout for `read_frame`. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Write timeout for `send_frame`.
    pub write_timeout: Option<Duration>,
    /// Largest frame accepted by `send_frame` and read by `read_frame`.
    pub max_datagram: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            read_timeout: None,
            write_timeout: None,
            max_datagram: UDP_MAX_DATAGRAM,
        }
    }
}

/// One frame per datagram over a UDP socket.
///
/// A sender is created with a remote host and port that are resolved on
/// [`attach_to_network`](FrameSink::attach_to_network); a receiver only binds.
pub struct UdpTransport {
    remote: Option<(String, u16)>,
    config: UdpConfig,
    socket: Option<UdpSocket>,
    remote_addr: Option<SocketAddr>,
    state: AssociationState,
    stats: TransportStats,
    recv_buf: Vec<u8>,
}

impl UdpTransport {
    /// Sender to `remote_host:port`, bound to an ephemeral local port.
    pub fn sender(remote_host: impl Into<String>, port: u16) -> Self {
        Self::sender_with_config(remote_host, port, UdpConfig::default())
    }

    /// Sender with explicit configuration.
    pub fn sender_with_config(
        remote_host: impl Into<String>,
        port: u16,
        config: UdpConfig,
    ) -> Self {
        Self::build(Some((remote_host.into(), port)), config)
    }

    /// Receiver bound to `bind_addr`.
    pub fn receiver(bind_addr: SocketAddr) -> Self {
        Self::receiver_with_config(UdpConfig {
            bind_addr,
            ..UdpConfig::default()
        })
    }

    /// Receiver with explicit configuration.
    pub fn receiver_with_config(config: UdpConfig) -> Self {
        Self::build(None, config)
    }

    fn build(remote: Option<(String, u16)>, config: UdpConfig) -> Self {
        Self {
            remote,
            recv_buf: vec![0u8; config.max_datagram],
            config,
            socket: None,
            remote_addr: None,
            state: AssociationState::configured(),
            stats: TransportStats::default(),
        }
    }

    /// Release the socket and move `Operational` → `Disabled`.
    pub fn detach(&mut self) -> Result<()> {
        self.state.disable()?;
        self.socket = None;
        self.remote_addr = None;
        debug!("udp transport detached");
        Ok(())
    }

    /// Address the socket is bound to, once attached.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotAttached)?;
        Ok(socket.local_addr()?)
    }

    /// Resolved destination, once attached (senders only).
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Traffic counters.
    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Current configuration.
    pub fn config(&self) -> &UdpConfig {
        &self.config
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "udp"
    }

    fn attach(&mut self) -> Result<()> {
        let state = self.state.state();
        if state != HandlerState::Disabled {
            return Err(StateError {
                operation: "attach_to_network",
                state,
            }
            .into());
        }

        // Any acquisition failure moves the association to `Error`.
        let (socket, bind_addr, remote_addr) = match self.acquire() {
            Ok(acquired) => acquired,
            Err(err) => {
                self.state.fail();
                return Err(err);
            }
        };

        self.socket = Some(socket);
        self.remote_addr = remote_addr;
        self.state.enable()?;
        self.stats.attach_count = self.stats.attach_count.saturating_add(1);
        info!(%bind_addr, remote = ?remote_addr, "udp transport attached");
        Ok(())
    }

    fn acquire(&self) -> Result<(UdpSocket, SocketAddr, Option<SocketAddr>)> {
        let remote_addr = match &self.remote {
            Some((host, port)) => Some(resolve(host, *port)?),
            None => None,
        };
        let bind_addr = local_bind_addr(self.config.bind_addr, remote_addr);
        let socket = bind_socket(bind_addr, &self.config)?;
        Ok((socket, bind_addr, remote_addr))
    }
}

impl FrameSink for UdpTransport {
    fn state(&self) -> &AssociationState {
        &self.state
    }

    fn attach_to_network(&mut self) -> Result<()> {
        self.attach()
    }

    fn send_frame(&mut self, frame: Bytes) -> Result<()> {
        self.state.ensure_operational("send_frame")?;
        if frame.len() > self.config.max_datagram {
            return Err(TransportError::DatagramTooLarge {
                size: frame.len(),
                max: self.config.max_datagram,
            });
        }

        let socket = self.socket.as_ref().ok_or(TransportError::NotAttached)?;
        let addr = self.remote_addr.ok_or(TransportError::NotAttached)?;
        socket
            .send_to(&frame, addr)
            .map_err(|source| TransportError::Send {
                addr,
                len: frame.len(),
                source,
            })?;

        self.stats.record_sent(frame.len());
        debug!(%addr, len = frame.len(), "frame sent");
        Ok(())
    }
}

impl FrameSource for UdpTransport {
    fn state(&self) -> &AssociationState {
        &self.state
    }

    fn attach_to_network(&mut self) -> Result<()> {
        self.attach()
    }

    fn read_frame(&mut self) -> Result<Bytes> {
        self.state.ensure_operational("read_frame")?;
        let socket = self.socket.as_ref().ok_or(TransportError::NotAttached)?;

        let (len, from) = socket
            .recv_from(&mut self.recv_buf)
            .map_err(TransportError::Receive)?;

        self.stats.record_received(len);
        debug!(%from, len, "frame received");
        Ok(Bytes::copy_from_slice(&self.recv_buf[..len]))
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("remote", &self.remote)
            .field("remote_addr", &self.remote_addr)
            .field("state", &self.state.state())
            .finish()
    }
}

/// Resolve `host:port`, preferring an IPv4 address.
pub(crate) fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| TransportError::NoAddress {
            host: host.to_string(),
        })
}

/// Switch an IPv4 wildcard bind to IPv6 when the remote is IPv6.
pub(crate) fn local_bind_addr(bind_addr: SocketAddr, remote: Option<SocketAddr>) -> SocketAddr {
    match remote {
        Some(SocketAddr::V6(_)) if bind_addr.is_ipv4() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), bind_addr.port())
        }
        _ => bind_addr,
    }
}

fn bind_socket(addr: SocketAddr, config: &UdpConfig) -> Result<UdpSocket> {
    let socket = UdpSocket::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
    socket.set_read_timeout(config.read_timeout)?;
    socket.set_write_timeout(config.write_timeout)?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn loopback_receiver() -> UdpTransport {
        let mut receiver = UdpTransport::receiver_with_config(UdpConfig {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            read_timeout: Some(Duration::from_secs(2)),
            ..UdpConfig::default()
        });
        FrameSource::attach_to_network(&mut receiver).unwrap();
        receiver
    }

    #[test]
    fn starts_disabled_with_zero_counters() {
        let sender = UdpTransport::sender("127.0.0.1", 4800);
        assert_eq!(FrameSink::state(&sender).state(), HandlerState::Disabled);
        assert_eq!(sender.stats(), TransportStats::default());
        assert!(matches!(
            sender.local_addr(),
            Err(TransportError::NotAttached)
        ));
    }

    #[test]
    fn send_before_attach_is_rejected() {
        let mut sender = UdpTransport::sender("127.0.0.1", 4800);
        let err = sender.send_frame(Bytes::from_static(b"x")).unwrap_err();
        assert!(matches!(err, TransportError::State(_)));
        assert_eq!(sender.stats().sent_messages, 0);
    }

    #[test]
    fn attach_send_receive_counts_traffic() {
        let mut receiver = loopback_receiver();
        let port = receiver.local_addr().unwrap().port();

        let mut sender = UdpTransport::sender("127.0.0.1", port);
        FrameSink::attach_to_network(&mut sender).unwrap();
        assert_eq!(FrameSink::state(&sender).state(), HandlerState::Operational);
        assert_eq!(sender.stats().attach_count, 1);

        sender.send_frame(Bytes::from_static(b"frame-1")).unwrap();
        let frame = receiver.read_frame().unwrap();

        assert_eq!(frame.as_ref(), b"frame-1");
        assert_eq!(sender.stats().sent_messages, 1);
        assert_eq!(sender.stats().sent_bytes, 7);
        assert_eq!(receiver.stats().received_messages, 1);
        assert_eq!(receiver.stats().received_bytes, 7);
    }

    #[test]
    fn second_attach_is_rejected() {
        let mut receiver = loopback_receiver();
        let err = FrameSource::attach_to_network(&mut receiver).unwrap_err();
        assert!(matches!(err, TransportError::State(_)));
        assert_eq!(receiver.stats().attach_count, 1);
    }

    #[test]
    fn oversized_frame_rejected_before_io() {
        let receiver = loopback_receiver();
        let port = receiver.local_addr().unwrap().port();

        let mut sender = UdpTransport::sender_with_config(
            "127.0.0.1",
            port,
            UdpConfig {
                max_datagram: 8,
                ..UdpConfig::default()
            },
        );
        FrameSink::attach_to_network(&mut sender).unwrap();

        let err = sender.send_frame(Bytes::from(vec![0u8; 9])).unwrap_err();
        assert!(matches!(
            err,
            TransportError::DatagramTooLarge { size: 9, max: 8 }
        ));
        assert_eq!(sender.stats().sent_messages, 0);
    }

    #[test]
    fn detach_returns_to_disabled() {
        let mut receiver = loopback_receiver();
        receiver.detach().unwrap();

        assert_eq!(FrameSource::state(&receiver).state(), HandlerState::Disabled);
        assert!(matches!(
            receiver.read_frame(),
            Err(TransportError::State(_))
        ));
        assert!(receiver.detach().is_err());
    }

    #[test]
    fn read_timeout_surfaces_receive_error() {
        let mut receiver = UdpTransport::receiver_with_config(UdpConfig {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            read_timeout: Some(Duration::from_millis(20)),
            ..UdpConfig::default()
        });
        FrameSource::attach_to_network(&mut receiver).unwrap();

        let err = receiver.read_frame().unwrap_err();
        assert!(matches!(err, TransportError::Receive(_)));
    }

    #[test]
    fn unresolvable_host_fails_the_association() {
        let mut sender = UdpTransport::sender("host.invalid", 4840);
        let err = FrameSink::attach_to_network(&mut sender).unwrap_err();

        assert!(matches!(
            err,
            TransportError::Resolve { .. } | TransportError::NoAddress { .. }
        ));
        assert_eq!(FrameSink::state(&sender).state(), HandlerState::Error);
        assert_eq!(sender.stats().attach_count, 0);

        // Reconfiguring makes the association attachable again.
        FrameSink::state(&sender).configure().unwrap();
        assert_eq!(FrameSink::state(&sender).state(), HandlerState::Disabled);
    }

    #[test]
    fn bind_failure_fails_the_association() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut receiver = UdpTransport::receiver(taken.local_addr().unwrap());
        let err = FrameSource::attach_to_network(&mut receiver).unwrap_err();

        assert!(matches!(err, TransportError::Bind { .. }));
        assert_eq!(FrameSource::state(&receiver).state(), HandlerState::Error);
    }

    #[test]
    fn resolve_prefers_ipv4() {
        let addr = resolve("127.0.0.1", 9000).unwrap();
        assert!(addr.is_ipv4());
        assert_eq!(addr.port(), 9000);
    }
}
