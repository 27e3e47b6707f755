//! UADP message header codec and message assembly.
//!
//! Every message starts with a header carrying:
//! - the message type and a bit-packed encoding flags byte
//! - the total message length in a 1, 2 or 4 byte field
//! - a 16-bit sequence number and the DataSet configuration version
//! - for data and event messages, a timestamp and the field count
//!
//! The [`MessageWriter`] encodes a sequence of bound values behind that header
//! and hands exactly one frame to the transport per call.

pub mod codec;
pub mod datetime;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod flags;
pub mod header;
pub mod reader;
pub mod sequence;
pub mod value;
pub mod writer;

pub use codec::{split_message, DEFAULT_MAX_MESSAGE};
pub use datetime::UaDateTime;
pub use decoder::BinaryDecoder;
pub use encoder::{write_value, BinaryEncoder};
pub use error::{FrameError, Result};
pub use flags::{
    decode_flags, encode_flags, EncodingFlags, FieldEncoding, MessageLengthFieldType,
};
pub use header::{
    compute_header_length, ConfigurationVersion, ConsumerMessageHeader, MessageHeader,
    MessageType, ProducerMessageHeader,
};
pub use reader::{MessageReader, ReceivedMessage};
pub use sequence::{is_newer, SequenceTracker};
pub use value::{BuiltInType, Value};
pub use writer::{
    BinaryMessageWriter, Binding, DataSetId, MessageWriter, ProducerBinding, WriterConfig,
};

#[cfg(feature = "async")]
pub use codec::MessageCodec;
