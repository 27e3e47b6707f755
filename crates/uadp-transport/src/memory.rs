//! In-process loopback transport.
//!
//! Frames sent on a [`MemorySink`] arrive, unchanged and in order, at the
//! paired [`MemorySource`]. Both halves run the same lifecycle as a network
//! transport, which makes the pair useful for exercising writers and readers
//! without sockets.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::state::{AssociationState, HandlerState, StateError};
use crate::traits::{FrameSink, FrameSource, TransportStats};

/// Create a connected sink/source pair. Both start `Disabled`.
pub fn memory_pair() -> (MemorySink, MemorySource) {
    let (tx, rx) = mpsc::channel();
    (
        MemorySink {
            tx,
            state: AssociationState::configured(),
            stats: TransportStats::default(),
        },
        MemorySource {
            rx,
            state: AssociationState::configured(),
            stats: TransportStats::default(),
            read_timeout: None,
        },
    )
}

/// Sending half of [`memory_pair`].
#[derive(Debug)]
pub struct MemorySink {
    tx: Sender<Bytes>,
    state: AssociationState,
    stats: TransportStats,
}

impl MemorySink {
    /// Traffic counters.
    pub fn stats(&self) -> TransportStats {
        self.stats
    }
}

impl FrameSink for MemorySink {
    fn state(&self) -> &AssociationState {
        &self.state
    }

    fn attach_to_network(&mut self) -> Result<()> {
        attach(&self.state, &mut self.stats)
    }

    fn send_frame(&mut self, frame: Bytes) -> Result<()> {
        self.state.ensure_operational("send_frame")?;
        let len = frame.len();
        self.tx.send(frame).map_err(|_| TransportError::Closed)?;
        self.stats.record_sent(len);
        debug!(len, "frame queued");
        Ok(())
    }
}

/// Receiving half of [`memory_pair`].
#[derive(Debug)]
pub struct MemorySource {
    rx: Receiver<Bytes>,
    state: AssociationState,
    stats: TransportStats,
    read_timeout: Option<Duration>,
}

impl MemorySource {
    /// Bound how long `read_frame` waits. `None` waits until the sink is dropped.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Traffic counters.
    pub fn stats(&self) -> TransportStats {
        self.stats
    }
}

impl FrameSource for MemorySource {
    fn state(&self) -> &AssociationState {
        &self.state
    }

    fn attach_to_network(&mut self) -> Result<()> {
        attach(&self.state, &mut self.stats)
    }

    fn read_frame(&mut self) -> Result<Bytes> {
        self.state.ensure_operational("read_frame")?;
        let frame = match self.read_timeout {
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => TransportError::Receive(std::io::Error::from(
                    std::io::ErrorKind::TimedOut,
                )),
                RecvTimeoutError::Disconnected => TransportError::Closed,
            })?,
            None => self.rx.recv().map_err(|_| TransportError::Closed)?,
        };
        self.stats.record_received(frame.len());
        Ok(frame)
    }
}

fn attach(state: &AssociationState, stats: &mut TransportStats) -> Result<()> {
    let current = state.state();
    if current != HandlerState::Disabled {
        return Err(StateError {
            operation: "attach_to_network",
            state: current,
        }
        .into());
    }
    state.enable()?;
    stats.attach_count = stats.attach_count.saturating_add(1);
    Ok(())
}
