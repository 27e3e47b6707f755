//! Async UDP transport on tokio (feature `async`).

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::state::{AssociationState, HandlerState, StateError};
use crate::traits::TransportStats;
use crate::udp::{local_bind_addr, UdpConfig};

/// Async counterpart of [`UdpTransport`](crate::UdpTransport).
///
/// Timeouts in [`UdpConfig`] are ignored; wrap calls in
/// `tokio::time::timeout` instead.
pub struct AsyncUdpTransport {
    remote: Option<(String, u16)>,
    config: UdpConfig,
    socket: Option<UdpSocket>,
    remote_addr: Option<SocketAddr>,
    state: AssociationState,
    stats: TransportStats,
    recv_buf: Vec<u8>,
}

impl AsyncUdpTransport {
    /// Sender to `remote_host:port`.
    pub fn sender(remote_host: impl Into<String>, port: u16, config: UdpConfig) -> Self {
        Self::build(Some((remote_host.into(), port)), config)
    }

    /// Receiver bound to `config.bind_addr`.
    pub fn receiver(config: UdpConfig) -> Self {
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

    /// Lifecycle state.
    pub fn state(&self) -> &AssociationState {
        &self.state
    }

    /// Traffic counters.
    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Address the socket is bound to, once attached.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotAttached)?;
        Ok(socket.local_addr()?)
    }

    /// Resolve, bind and move `Disabled` → `Operational`.
    pub async fn attach_to_network(&mut self) -> Result<()> {
        let state = self.state.state();
        if state != HandlerState::Disabled {
            return Err(StateError {
                operation: "attach_to_network",
                state,
            }
            .into());
        }

        let (socket, bind_addr, remote_addr) = match self.acquire().await {
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
        info!(%bind_addr, remote = ?remote_addr, "async udp transport attached");
        Ok(())
    }

    async fn acquire(&self) -> Result<(UdpSocket, SocketAddr, Option<SocketAddr>)> {
        let remote_addr = match &self.remote {
            Some((host, port)) => Some(resolve_async(host, *port).await?),
            None => None,
        };
        let bind_addr = local_bind_addr(self.config.bind_addr, remote_addr);
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: bind_addr,
                source,
            })?;
        Ok((socket, bind_addr, remote_addr))
    }

    /// Send one frame as one datagram.
    pub async fn send_frame(&mut self, frame: Bytes) -> Result<()> {
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
            .await
            .map_err(|source| TransportError::Send {
                addr,
                len: frame.len(),
                source,
            })?;

        self.stats.record_sent(frame.len());
        debug!(%addr, len = frame.len(), "frame sent");
        Ok(())
    }

    /// Wait for the next datagram.
    pub async fn read_frame(&mut self) -> Result<Bytes> {
        self.state.ensure_operational("read_frame")?;
        let socket = self.socket.as_ref().ok_or(TransportError::NotAttached)?;

        let (len, from) = socket
            .recv_from(&mut self.recv_buf)
            .await
            .map_err(TransportError::Receive)?;

        self.stats.record_received(len);
        debug!(%from, len, "frame received");
        Ok(Bytes::copy_from_slice(&self.recv_buf[..len]))
    }
}

async fn resolve_async(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
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
