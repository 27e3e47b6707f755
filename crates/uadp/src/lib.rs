//! UADP PubSub messaging: header codec, message writer and UDP transport.
//!
//! uadp turns application values into OPC UA PubSub (UADP) messages and ships
//! them as UDP datagrams, and reads them back on the other side.
//!
//! # Crate Structure
//!
//! - [`transport`]: Association lifecycle and frame transports (UDP, in-memory)
//! - [`frame`]: Header codec, value encoding, message writer and reader
//! - [`association`]: Publisher / subscriber over a DataSet (behind `association` feature)

/// Re-export transport types.
pub mod transport {
    pub use uadp_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use uadp_frame::*;
}

/// Re-export association types (requires `association` feature).
#[cfg(feature = "association")]
pub mod association {
    pub use uadp_association::*;
}
