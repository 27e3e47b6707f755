use bytes::Bytes;

use crate::error::Result;
use crate::state::AssociationState;

/// Outbound half of a transport: ships complete frames.
pub trait FrameSink {
    /// Lifecycle state of the association this sink belongs to.
    fn state(&self) -> &AssociationState;

    /// Acquire network resources and move `Disabled` → `Operational`.
    ///
    /// The state only changes after the resources were acquired.
    fn attach_to_network(&mut self) -> Result<()>;

    /// Transmit exactly this frame, once.
    fn send_frame(&mut self, frame: Bytes) -> Result<()>;
}

/// Inbound half of a transport: yields complete frames.
pub trait FrameSource {
    /// Lifecycle state of the association this source belongs to.
    fn state(&self) -> &AssociationState;

    /// Acquire network resources and move `Disabled` → `Operational`.
    fn attach_to_network(&mut self) -> Result<()>;

    /// Block until the next frame arrives.
    fn read_frame(&mut self) -> Result<Bytes>;
}

/// Counters a transport keeps about its own traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Successful `attach_to_network` calls.
    pub attach_count: u64,
    /// Frames handed to the network.
    pub sent_messages: u64,
    /// Bytes handed to the network.
    pub sent_bytes: u64,
    /// Frames received.
    pub received_messages: u64,
    /// Bytes received.
    pub received_bytes: u64,
}

impl TransportStats {
    pub(crate) fn record_sent(&mut self, len: usize) {
        self.sent_messages = self.sent_messages.saturating_add(1);
        self.sent_bytes = self.sent_bytes.saturating_add(len as u64);
    }

    pub(crate) fn record_received(&mut self, len: usize) {
        self.received_messages = self.received_messages.saturating_add(1);
        self.received_bytes = self.received_bytes.saturating_add(len as u64);
    }
}
