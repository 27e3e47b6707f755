use bytes::Bytes;
use tracing::debug;
use uadp_transport::{AssociationState, FrameSource};

use crate::decoder::BinaryDecoder;
use crate::error::{FrameError, Result};
use crate::header::{ConsumerMessageHeader, MessageHeader, MessageType};
use crate::value::{BuiltInType, Value};

/// One received frame with its decoded header.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    header: ConsumerMessageHeader,
    payload: Bytes,
}

impl ReceivedMessage {
    /// Decode the header of a complete frame.
    ///
    /// The header's length field must equal the frame size.
    pub fn parse(frame: Bytes) -> Result<Self> {
        let actual = frame.len();
        let mut cursor = frame;
        let mut header = ConsumerMessageHeader::new();
        header.synchronize(&mut cursor)?;

        let declared = header.message_length()?;
        if declared as usize != actual {
            return Err(FrameError::LengthMismatch { declared, actual });
        }

        Ok(Self {
            header,
            payload: cursor,
        })
    }

    pub fn header(&self) -> &ConsumerMessageHeader {
        &self.header
    }

    pub fn message_type(&self) -> Result<MessageType> {
        self.header.message_type()
    }

    /// Bytes following the header.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Decode the payload fields, one per entry of `types`.
    ///
    /// `types` must have exactly as many entries as the header's field count.
    pub fn decode_fields(&self, types: &[BuiltInType]) -> Result<Vec<Value>> {
        let field_count = self.header.field_count()?;
        if usize::from(field_count) != types.len() {
            return Err(FrameError::FieldCountMismatch {
                header: field_count,
                expected: types.len(),
            });
        }

        let mut payload = self.payload.clone();
        types.iter().map(|ty| payload.read_value(*ty)).collect()
    }

    /// Decode the first `types.len()` fields, ignoring any that follow.
    ///
    /// Lets a consumer read messages from a producer whose DataSet grew at
    /// the end (same major, newer minor version).
    pub fn decode_leading_fields(&self, types: &[BuiltInType]) -> Result<Vec<Value>> {
        let field_count = self.header.field_count()?;
        if usize::from(field_count) < types.len() {
            return Err(FrameError::FieldCountMismatch {
                header: field_count,
                expected: types.len(),
            });
        }

        let mut payload = self.payload.clone();
        types.iter().map(|ty| payload.read_value(*ty)).collect()
    }
}

/// Reads messages from any [`FrameSource`].
#[derive(Debug)]
pub struct MessageReader<S> {
    source: S,
}

impl<S: FrameSource> MessageReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn state(&self) -> &AssociationState {
        self.source.state()
    }

    pub fn attach_to_network(&mut self) -> Result<()> {
        self.source.attach_to_network()?;
        Ok(())
    }

    /// Block until the next frame arrives and decode its header.
    pub fn read_message(&mut self) -> Result<ReceivedMessage> {
        self.source.state().ensure_operational("read_message")?;
        let frame = self.source.read_frame()?;
        let message = ReceivedMessage::parse(frame)?;
        debug!(
            message_type = %message.message_type()?,
            sequence = message.header.sequence_number()?,
            len = message.header.message_length()?,
            "message received"
        );
        Ok(message)
    }

    /// Borrow the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutably borrow the underlying source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the reader and return the source.
    pub fn into_inner(self) -> S {
        self.source
    }
}
