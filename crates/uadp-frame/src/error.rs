use uadp_transport::{StateError, TransportError};

use crate::value::BuiltInType;

/// Errors raised by the header codec, the value encoders and the writer.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The association is not in a state that permits the operation.
    #[error("invalid state: {0}")]
    InvalidState(#[from] StateError),

    /// A consumer header field was read before a successful decode pass.
    #[error("header field `{field}` read before the header was synchronized")]
    NotSynchronized { field: &'static str },

    /// The operation does not apply to this header role.
    #[error("operation `{operation}` is not applicable for the {role} message header")]
    NotApplicable {
        operation: &'static str,
        role: &'static str,
    },

    /// A bound value does not match its declared built-in type.
    #[error("item {index}: declared {declared} but value is {actual}")]
    TypeMismatch {
        index: usize,
        declared: BuiltInType,
        actual: BuiltInType,
    },

    /// A bound value is null.
    #[error("item {index}: missing value for declared {declared}")]
    MissingValue { index: usize, declared: BuiltInType },

    /// A textual literal does not parse as its built-in type.
    #[error("`{literal}` is not a valid {ty}")]
    InvalidLiteral { ty: BuiltInType, literal: String },

    /// Built-in type id outside the supported set.
    #[error("unsupported built-in type id {0}")]
    UnsupportedType(u8),

    /// Message type byte outside the defined set.
    #[error("unknown message type {0:#04x}")]
    UnknownMessageType(u8),

    /// Encoding flags byte uses a reserved selector or reserved bits.
    #[error("invalid encoding flags {0:#04x}")]
    InvalidEncodingFlags(u8),

    /// The message length does not fit the selected length field.
    #[error("message length {length} does not fit the length field (max {max})")]
    MessageTooLong { length: usize, max: u64 },

    /// More items requested than the caller's ceiling or the field count allow.
    #[error("too many items ({count}, max {max})")]
    TooManyItems { count: usize, max: u64 },

    /// Input ended before the value or header was complete.
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// A string field is not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidString(#[from] std::string::FromUtf8Error),

    /// A length-prefixed field has a negative length other than -1.
    #[error("invalid length prefix {0}")]
    InvalidLengthPrefix(i32),

    /// The header's length field disagrees with the received frame.
    #[error("header declares {declared} bytes but frame has {actual}")]
    LengthMismatch { declared: u32, actual: usize },

    /// The number of field types does not match the header's field count.
    #[error("field count mismatch: header has {header}, metadata has {expected}")]
    FieldCountMismatch { header: u16, expected: usize },

    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Transport(TransportError::Io(err))
    }
}
