//! Publisher and subscriber associations for UADP DataSets.
//!
//! This is the "just works" layer: describe a DataSet once with
//! [`DataSetMetaData`], then publish values or receive decoded messages over
//! any transport from `uadp-transport`.

pub mod config;
pub mod error;
pub mod metadata;
pub mod publisher;
mod serde_types;
pub mod subscriber;

pub use config::{PublisherConfig, SubscriberConfig, DEFAULT_PORT};
pub use error::{AssociationError, Result};
pub use metadata::{DataSetMetaData, FieldMetaData};
pub use publisher::Publisher;
pub use subscriber::{DataSetMessage, Delivery, Subscriber};
