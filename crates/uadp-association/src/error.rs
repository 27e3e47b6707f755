use std::path::PathBuf;

use uadp_frame::ConfigurationVersion;

/// Errors that can occur in publisher and subscriber operations.
#[derive(Debug, thiserror::Error)]
pub enum AssociationError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] uadp_frame::FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] uadp_transport::TransportError),

    /// The producer's DataSet layout changed incompatibly.
    #[error("incompatible schema: expected version {expected}, received {received}")]
    IncompatibleSchema {
        expected: ConfigurationVersion,
        received: ConfigurationVersion,
    },

    /// The number of values does not match the DataSet fields.
    #[error("DataSet has {expected} fields but {actual} values were given")]
    FieldCountMismatch { expected: usize, actual: usize },

    /// A configuration file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AssociationError>;
