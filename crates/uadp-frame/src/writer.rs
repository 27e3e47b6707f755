//! Message assembly: turns a sequence of bound values into one framed message.

use std::fmt;

use bytes::BytesMut;
use tracing::debug;
use uadp_transport::{AssociationState, FrameSink};
use uuid::Uuid;

use crate::datetime::UaDateTime;
use crate::encoder::write_value;
use crate::error::{FrameError, Result};
use crate::flags::EncodingFlags;
use crate::header::{MessageHeader, MessageType, ProducerMessageHeader};
use crate::value::{BuiltInType, Value};

const INITIAL_BUFFER_CAPACITY: usize = 1500;

/// A single value exposed by the application, with its declared kind.
pub trait ProducerBinding {
    /// Current value. [`Value::Null`] if unset.
    fn value(&self) -> Value;

    /// Declared built-in type used to encode the value.
    fn encoding(&self) -> BuiltInType;
}

impl<B: ProducerBinding + ?Sized> ProducerBinding for &B {
    fn value(&self) -> Value {
        (**self).value()
    }

    fn encoding(&self) -> BuiltInType {
        (**self).encoding()
    }
}

/// A binding holding its value directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub encoding: BuiltInType,
    pub value: Value,
}

impl Binding {
    pub fn new(encoding: BuiltInType, value: impl Into<Value>) -> Self {
        Self {
            encoding,
            value: value.into(),
        }
    }

    /// Binding whose declared type is the value's own kind.
    ///
    /// Returns `None` for [`Value::Null`].
    pub fn typed(value: Value) -> Option<Self> {
        let encoding = value.built_in_type()?;
        Some(Self { encoding, value })
    }
}

impl ProducerBinding for Binding {
    fn value(&self) -> Value {
        self.value.clone()
    }

    fn encoding(&self) -> BuiltInType {
        self.encoding
    }
}

/// Opaque DataSet identity supplied by the semantic layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DataSetId(Uuid);

impl DataSetId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Placeholder identity for frames not tied to a DataSet.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for DataSetId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for DataSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Writer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Header encoding flags. Default: two-byte length, variant fields.
    pub flags: EncodingFlags,
    /// Set the header timestamp to the current time on each data send. Default: true.
    pub stamp_time: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            flags: EncodingFlags::default(),
            stamp_time: true,
        }
    }
}

/// Producer-side message assembly.
///
/// Implementors supply buffer management and the hand-off to the network;
/// [`send`](Self::send) drives them in a fixed order.
pub trait MessageWriter {
    fn state(&self) -> &AssociationState;

    fn attach_to_network(&mut self) -> Result<()>;

    fn config(&self) -> &WriterConfig;

    fn header_mut(&mut self) -> &mut ProducerMessageHeader;

    /// Scratch buffer receiving the encoded payload of the frame being built.
    fn encoder(&mut self) -> &mut BytesMut;

    /// Assemble a frame of `length` bytes: the header followed by the encoded payload.
    fn create_message(&mut self, length: usize, dataset_id: DataSetId) -> Result<()>;

    /// Hand the assembled frame to the transport.
    fn send_message(&mut self) -> Result<()>;

    /// Encode `item_count` values and send them as one data message.
    ///
    /// `accessor(i)` is called exactly once per item, in order. Any encoding
    /// failure aborts the message before anything reaches the transport. On
    /// success the sequence number advances. A header set to a message type
    /// without a field trailer is switched to `DataKeyFrame`.
    fn send<F, B>(
        &mut self,
        mut accessor: F,
        item_count: usize,
        max_size: u64,
        dataset_id: DataSetId,
    ) -> Result<()>
    where
        Self: Sized,
        F: FnMut(usize) -> B,
        B: ProducerBinding,
    {
        self.state().ensure_operational("send")?;
        if item_count as u64 > max_size {
            return Err(FrameError::TooManyItems {
                count: item_count,
                max: max_size,
            });
        }
        let field_count = u16::try_from(item_count).map_err(|_| FrameError::TooManyItems {
            count: item_count,
            max: u16::MAX as u64,
        })?;

        let payload = self.encoder();
        payload.clear();
        for index in 0..item_count {
            let binding = accessor(index);
            write_value(payload, index, binding.encoding(), &binding.value())?;
        }
        let payload_len = payload.len();

        let stamp_time = self.config().stamp_time;
        let header = self.header_mut();
        if !header.message_type()?.has_trailer() {
            header.set_message_type(MessageType::DataKeyFrame)?;
        }
        header.set_field_count(field_count)?;
        if stamp_time {
            header.set_timestamp(UaDateTime::now())?;
        }
        let length = header.encoded_len() + payload_len;

        self.create_message(length, dataset_id)?;
        self.send_message()?;
        self.header_mut().advance_sequence_number();
        Ok(())
    }

    /// Send a `KeepAlive` message: header only, no payload.
    fn send_keep_alive(&mut self) -> Result<()>
    where
        Self: Sized,
    {
        self.send_opaque(MessageType::KeepAlive, &[], DataSetId::nil())
    }

    /// Send a message without a field trailer, carrying `payload` verbatim.
    ///
    /// Only `KeepAlive` and `DataSetMetadata` qualify. The header's message
    /// type is restored afterwards; the sequence number advances on success.
    fn send_opaque(
        &mut self,
        message_type: MessageType,
        payload: &[u8],
        dataset_id: DataSetId,
    ) -> Result<()>
    where
        Self: Sized,
    {
        self.state().ensure_operational("send_opaque")?;
        if message_type.has_trailer() {
            return Err(FrameError::NotApplicable {
                operation: "send_opaque",
                role: message_type.as_str(),
            });
        }

        let encoder = self.encoder();
        encoder.clear();
        encoder.extend_from_slice(payload);

        let header = self.header_mut();
        let previous = header.message_type()?;
        header.set_message_type(message_type)?;
        let length = header.encoded_len() + payload.len();

        let sent = self
            .create_message(length, dataset_id)
            .and_then(|()| self.send_message());
        let header = self.header_mut();
        header.set_message_type(previous)?;
        sent?;
        header.advance_sequence_number();
        Ok(())
    }
}

/// [`MessageWriter`] producing binary frames on any [`FrameSink`].
#[derive(Debug)]
pub struct BinaryMessageWriter<T> {
    transport: T,
    config: WriterConfig,
    header: ProducerMessageHeader,
    payload: BytesMut,
    frame: BytesMut,
    dataset_id: DataSetId,
}

impl<T: FrameSink> BinaryMessageWriter<T> {
    /// Create a writer with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, WriterConfig::default())
    }

    pub fn with_config(transport: T, config: WriterConfig) -> Self {
        Self {
            transport,
            config,
            header: ProducerMessageHeader::new(config.flags),
            payload: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            frame: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            dataset_id: DataSetId::nil(),
        }
    }

    pub fn header(&self) -> &ProducerMessageHeader {
        &self.header
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the writer and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T: FrameSink> MessageWriter for BinaryMessageWriter<T> {
    fn state(&self) -> &AssociationState {
        self.transport.state()
    }

    fn attach_to_network(&mut self) -> Result<()> {
        self.transport.attach_to_network()?;
        Ok(())
    }

    fn config(&self) -> &WriterConfig {
        &self.config
    }

    fn header_mut(&mut self) -> &mut ProducerMessageHeader {
        &mut self.header
    }

    fn encoder(&mut self) -> &mut BytesMut {
        &mut self.payload
    }

    fn create_message(&mut self, length: usize, dataset_id: DataSetId) -> Result<()> {
        self.frame.clear();
        self.frame.reserve(length);
        self.header.synchronize(&mut self.frame, length)?;
        self.frame.extend_from_slice(&self.payload);
        debug_assert_eq!(self.frame.len(), length);
        self.dataset_id = dataset_id;
        Ok(())
    }

    fn send_message(&mut self) -> Result<()> {
        let frame = self.frame.split().freeze();
        let len = frame.len();
        self.transport.send_frame(frame)?;
        debug!(
            dataset = %self.dataset_id,
            sequence = self.header.sequence_number()?,
            message_type = %self.header.message_type()?,
            len,
            "message sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use uadp_transport::{HandlerState, TransportError};

    use super::*;
    use crate::header::ConsumerMessageHeader;

    /// Sink recording every frame it is handed.
    struct RecordingSink {
        state: AssociationState,
        frames: Vec<Bytes>,
        fail_sends: bool,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                state: AssociationState::configured(),
                frames: Vec::new(),
                fail_sends: false,
            }
        }
    }

    impl FrameSink for RecordingSink {
        fn state(&self) -> &AssociationState {
            &self.state
        }

        fn attach_to_network(&mut self) -> uadp_transport::Result<()> {
            self.state.enable()?;
            Ok(())
        }

        fn send_frame(&mut self, frame: Bytes) -> uadp_transport::Result<()> {
            if self.fail_sends {
                return Err(TransportError::Closed);
            }
            self.frames.push(frame);
            Ok(())
        }
    }

    fn attached_writer() -> BinaryMessageWriter<RecordingSink> {
        let mut writer = BinaryMessageWriter::new(RecordingSink::new());
        writer.attach_to_network().unwrap();
        writer
    }

    fn decode(frame: &Bytes) -> ConsumerMessageHeader {
        let mut header = ConsumerMessageHeader::new();
        header.synchronize(&mut frame.clone()).unwrap();
        header
    }

    #[test]
    fn send_calls_accessor_once_per_item_and_sends_one_frame() {
        let mut writer = attached_writer();
        let values = [Value::from(1.5f64), Value::from(7u16), Value::from("x")];
        let mut calls = Vec::new();

        writer
            .send(
                |i| {
                    calls.push(i);
                    Binding::typed(values[i].clone()).unwrap()
                },
                values.len(),
                u64::MAX,
                DataSetId::new_v4(),
            )
            .unwrap();

        assert_eq!(calls, vec![0, 1, 2]);
        let frames = &writer.transport().frames;
        assert_eq!(frames.len(), 1);

        let header = decode(&frames[0]);
        assert_eq!(header.message_type().unwrap(), MessageType::DataKeyFrame);
        assert_eq!(header.field_count().unwrap(), 3);
        assert_eq!(header.message_length().unwrap() as usize, frames[0].len());
        // 18 header + 8 double + 2 uint16 + 4 + 1 string.
        assert_eq!(frames[0].len(), 18 + 8 + 2 + 5);
    }

    #[test]
    fn zero_items_still_sends_a_frame() {
        let mut writer = attached_writer();
        let mut calls = 0;
        writer
            .send(
                |_| {
                    calls += 1;
                    Binding::new(BuiltInType::Int32, 0i32)
                },
                0,
                u64::MAX,
                DataSetId::nil(),
            )
            .unwrap();

        assert_eq!(calls, 0);
        let frames = &writer.transport().frames;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 18);
        assert_eq!(decode(&frames[0]).field_count().unwrap(), 0);
    }

    #[test]
    fn send_requires_operational_state() {
        let mut writer = BinaryMessageWriter::new(RecordingSink::new());
        let mut calls = 0;
        let err = writer
            .send(
                |_| {
                    calls += 1;
                    Binding::new(BuiltInType::Boolean, true)
                },
                1,
                u64::MAX,
                DataSetId::nil(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            FrameError::InvalidState(ref e) if e.state == HandlerState::Disabled
        ));
        assert_eq!(calls, 0);
        assert!(writer.transport().frames.is_empty());
    }

    #[test]
    fn type_mismatch_aborts_frame() {
        let mut writer = attached_writer();
        let bindings = [
            Binding::new(BuiltInType::Int32, 1i32),
            Binding::new(BuiltInType::Int32, 2.0f64),
        ];
        let err = writer
            .send(|i| &bindings[i], 2, u64::MAX, DataSetId::nil())
            .unwrap_err();

        assert!(matches!(
            err,
            FrameError::TypeMismatch {
                index: 1,
                declared: BuiltInType::Int32,
                actual: BuiltInType::Double,
            }
        ));
        assert!(writer.transport().frames.is_empty());
        assert_eq!(writer.header().sequence_number().unwrap(), 0);
    }

    #[test]
    fn null_value_aborts_frame() {
        let mut writer = attached_writer();
        let err = writer
            .send(
                |_| Binding::new(BuiltInType::Float, None::<f32>),
                1,
                u64::MAX,
                DataSetId::nil(),
            )
            .unwrap_err();
        assert!(matches!(err, FrameError::MissingValue { index: 0, .. }));
        assert!(writer.transport().frames.is_empty());
    }

    #[test]
    fn item_limits_checked_before_accessor() {
        let mut writer = attached_writer();
        let mut calls = 0;
        let mut accessor = |_: usize| {
            calls += 1;
            Binding::new(BuiltInType::Byte, 1u8)
        };

        let err = writer
            .send(&mut accessor, 5, 4, DataSetId::nil())
            .unwrap_err();
        assert!(matches!(err, FrameError::TooManyItems { count: 5, max: 4 }));

        let err = writer
            .send(&mut accessor, 70_000, u64::MAX, DataSetId::nil())
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::TooManyItems {
                count: 70_000,
                max: 65_535
            }
        ));
        assert_eq!(calls, 0);
    }

    #[test]
    fn sequence_number_advances_and_wraps() {
        let mut writer = attached_writer();
        writer.header_mut().set_sequence_number(u16::MAX).unwrap();

        for _ in 0..2 {
            writer
                .send(
                    |_| Binding::new(BuiltInType::Boolean, true),
                    1,
                    u64::MAX,
                    DataSetId::nil(),
                )
                .unwrap();
        }

        let frames = &writer.transport().frames;
        assert_eq!(decode(&frames[0]).sequence_number().unwrap(), u16::MAX);
        assert_eq!(decode(&frames[1]).sequence_number().unwrap(), 0);
        assert_eq!(writer.header().sequence_number().unwrap(), 1);
    }

    #[test]
    fn transport_failure_does_not_advance_sequence() {
        let mut writer = attached_writer();
        writer.transport_mut().fail_sends = true;
        let err = writer
            .send(
                |_| Binding::new(BuiltInType::Boolean, true),
                1,
                u64::MAX,
                DataSetId::nil(),
            )
            .unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Closed)));
        assert_eq!(writer.header().sequence_number().unwrap(), 0);
    }

    #[test]
    fn timestamp_stamping_is_configurable() {
        let config = WriterConfig {
            stamp_time: false,
            ..WriterConfig::default()
        };
        let mut writer = BinaryMessageWriter::with_config(RecordingSink::new(), config);
        writer.attach_to_network().unwrap();
        writer
            .header_mut()
            .set_timestamp(UaDateTime::from_ticks(99))
            .unwrap();
        writer
            .send(
                |_| Binding::new(BuiltInType::Boolean, true),
                1,
                u64::MAX,
                DataSetId::nil(),
            )
            .unwrap();

        let header = decode(&writer.transport().frames[0]);
        assert_eq!(header.timestamp().unwrap(), UaDateTime::from_ticks(99));
    }

    #[test]
    fn keep_alive_is_header_only() {
        let mut writer = attached_writer();
        writer.send_keep_alive().unwrap();

        let frames = &writer.transport().frames;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 8);
        let header = decode(&frames[0]);
        assert_eq!(header.message_type().unwrap(), MessageType::KeepAlive);
        assert_eq!(header.message_length().unwrap(), 8);

        // The data message type is restored.
        assert_eq!(
            writer.header().message_type().unwrap(),
            MessageType::DataKeyFrame
        );
        assert_eq!(writer.header().sequence_number().unwrap(), 1);
    }

    #[test]
    fn opaque_payload_follows_trailerless_header() {
        let mut writer = attached_writer();
        writer
            .send_opaque(MessageType::DataSetMetadata, b"{}", DataSetId::nil())
            .unwrap();

        let frame = &writer.transport().frames[0];
        assert_eq!(frame.len(), 10);
        assert_eq!(&frame[8..], b"{}");
        assert_eq!(
            decode(frame).message_type().unwrap(),
            MessageType::DataSetMetadata
        );

        let err = writer
            .send_opaque(MessageType::Event, b"", DataSetId::nil())
            .unwrap_err();
        assert!(matches!(err, FrameError::NotApplicable { .. }));
        assert_eq!(writer.transport().frames.len(), 1);
    }

    #[test]
    fn length_field_overflow_is_reported() {
        let config = WriterConfig {
            flags: EncodingFlags::new(
                crate::flags::MessageLengthFieldType::OneByte,
                crate::flags::FieldEncoding::Variant,
            ),
            ..WriterConfig::default()
        };
        let mut writer = BinaryMessageWriter::with_config(RecordingSink::new(), config);
        writer.attach_to_network().unwrap();
        let blob = Binding::new(BuiltInType::ByteString, vec![0u8; 300]);

        let err = writer
            .send(|_| &blob, 1, u64::MAX, DataSetId::nil())
            .unwrap_err();
        assert!(matches!(err, FrameError::MessageTooLong { max: 255, .. }));
        assert!(writer.transport().frames.is_empty());
    }
}
