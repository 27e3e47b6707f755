//! Association lifecycle and frame transports for UADP PubSub.
//!
//! This is the lowest layer of uadp. It owns:
//! - the [`HandlerState`] machine that gates every network operation
//! - the [`FrameSink`] / [`FrameSource`] contract the codec layers talk to
//! - a UDP adapter (one frame per datagram) and an in-process loopback pair
//!
//! Transports move opaque byte frames. They never look inside them.

pub mod error;
pub mod memory;
pub mod state;
pub mod traits;
pub mod udp;

#[cfg(feature = "async")]
pub mod tokio_udp;

pub use error::{Result, TransportError};
pub use memory::{memory_pair, MemorySink, MemorySource};
pub use state::{AssociationState, HandlerState, StateError};
pub use traits::{FrameSink, FrameSource, TransportStats};
pub use udp::{UdpConfig, UdpTransport, UDP_MAX_DATAGRAM};

#[cfg(feature = "async")]
pub use tokio_udp::AsyncUdpTransport;
