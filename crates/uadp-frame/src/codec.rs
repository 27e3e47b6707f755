//! Splitting a byte stream into messages.
//!
//! Datagram transports deliver one message per frame. Stream transports do
//! not, so the header's own length field is used to find message boundaries.

use bytes::{Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::flags::{EncodingFlags, MessageLengthFieldType};
use crate::header::{compute_header_length, MessageType};

/// Default upper bound on a single message: 64 KiB.
pub const DEFAULT_MAX_MESSAGE: usize = 64 * 1024;

/// Split one complete message off the front of `src`.
///
/// Returns `Ok(None)` until the whole message is buffered. Messages larger
/// than `max_message` are rejected as soon as their length field is read.
pub fn split_message(src: &mut BytesMut, max_message: usize) -> Result<Option<Bytes>> {
    if src.len() < 2 {
        return Ok(None);
    }

    let message_type = MessageType::try_from(src[0])?;
    let flags = EncodingFlags::from_bits(src[1])?;
    let width = flags.length_type.width();
    if src.len() < 2 + width {
        return Ok(None);
    }

    let field = &src[2..2 + width];
    let length = match flags.length_type {
        MessageLengthFieldType::OneByte => field[0] as usize,
        MessageLengthFieldType::TwoBytes => u16::from_le_bytes([field[0], field[1]]) as usize,
        MessageLengthFieldType::FourBytes => {
            u32::from_le_bytes([field[0], field[1], field[2], field[3]]) as usize
        }
    };

    if length > max_message {
        return Err(FrameError::MessageTooLong {
            length,
            max: max_message as u64,
        });
    }
    let header_len = compute_header_length(flags, message_type);
    if length < header_len {
        return Err(FrameError::LengthMismatch {
            declared: length as u32,
            actual: header_len,
        });
    }

    if src.len() < length {
        src.reserve(length - src.len());
        return Ok(None);
    }

    Ok(Some(src.split_to(length).freeze()))
}

#[cfg(feature = "async")]
pub use self::framed::MessageCodec;

#[cfg(feature = "async")]
mod framed {
    use bytes::{Bytes, BytesMut};
    use tokio_util::codec::{Decoder, Encoder};
    use tracing::{trace, warn};

    use super::{split_message, DEFAULT_MAX_MESSAGE};
    use crate::error::{FrameError, Result};
    use crate::reader::ReceivedMessage;

    /// `tokio_util` codec yielding [`ReceivedMessage`]s and writing assembled frames.
    #[derive(Debug, Clone)]
    pub struct MessageCodec {
        max_message: usize,
    }

    impl MessageCodec {
        pub fn new() -> Self {
            Self::with_max_message(DEFAULT_MAX_MESSAGE)
        }

        pub fn with_max_message(max_message: usize) -> Self {
            Self { max_message }
        }
    }

    impl Default for MessageCodec {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Decoder for MessageCodec {
        type Item = ReceivedMessage;
        type Error = FrameError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ReceivedMessage>> {
            match split_message(src, self.max_message) {
                Ok(Some(frame)) => {
                    trace!(len = frame.len(), "message split from stream");
                    ReceivedMessage::parse(frame).map(Some)
                }
                Ok(None) => Ok(None),
                Err(err) => {
                    warn!(error = %err, "stream decode error");
                    Err(err)
                }
            }
        }
    }

    impl Encoder<Bytes> for MessageCodec {
        type Error = FrameError;

        fn encode(&mut self, frame: Bytes, dst: &mut BytesMut) -> Result<()> {
            if frame.len() > self.max_message {
                return Err(FrameError::MessageTooLong {
                    length: frame.len(),
                    max: self.max_message as u64,
                });
            }
            dst.extend_from_slice(&frame);
            Ok(())
        }
    }
}
