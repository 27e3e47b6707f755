use std::fmt;
use std::io;

use uadp_association::AssociationError;
use uadp_frame::FrameError;
use uadp_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Send { source, .. }
        | TransportError::Receive(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Resolve { .. } | TransportError::NoAddress { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::DatagramTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::InvalidState(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::NotSynchronized { .. } | FrameError::NotApplicable { .. } => {
            CliError::new(INTERNAL, format!("{context}: {err}"))
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn association_error(context: &str, err: AssociationError) -> CliError {
    match err {
        AssociationError::Frame(err) => frame_error(context, err),
        AssociationError::Transport(err) => transport_error(context, err),
        AssociationError::Config { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        AssociationError::FieldCountMismatch { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        AssociationError::IncompatibleSchema { .. } | AssociationError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_timeout_maps_to_timeout_code() {
        let err = TransportError::Receive(io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(transport_error("receive", err).code, TIMEOUT);
    }

    #[test]
    fn nested_frame_errors_keep_their_category() {
        let err = AssociationError::Frame(FrameError::Transport(
            TransportError::DatagramTooLarge {
                size: 70_000,
                max: 65_507,
            },
        ));
        assert_eq!(association_error("publish", err).code, DATA_INVALID);

        let err = FrameError::UnknownMessageType(9);
        let cli = frame_error("decode", err);
        assert_eq!(cli.code, DATA_INVALID);
        assert_eq!(cli.message, "decode: unknown message type 0x09");
    }
}
