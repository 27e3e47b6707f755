//! Message header codec.
//!
//! Wire layout (little-endian):
//!
//! ```text
//! ┌──────┬───────┬──────────┬──────────┬───────┬───────┬────────────┬────────────┐
//! │ Type │ Flags │ Length   │ Sequence │ Major │ Minor │ TimeStamp  │ FieldCount │
//! │ (1B) │ (1B)  │ (1/2/4B) │ (2B)     │ (1B)  │ (1B)  │ (8B)       │ (2B)       │
//! └──────┴───────┴──────────┴──────────┴───────┴───────┴────────────┴────────────┘
//!                                                      └── data and event messages only ──┘
//! ```
//!
//! The producer side owns a mutable [`ProducerMessageHeader`] and writes it in
//! front of each payload. The consumer side fills a [`ConsumerMessageHeader`]
//! from received bytes; its fields are read-only.

use std::fmt;

use crate::datetime::UaDateTime;
use crate::decoder::BinaryDecoder;
use crate::encoder::BinaryEncoder;
use crate::error::{FrameError, Result};
use crate::flags::{EncodingFlags, MessageLengthFieldType};

/// Fixed part of every header: type, flags, sequence number and version.
const FIXED_HEADER_LEN: usize = 6;

/// TimeStamp (8) + FieldCount (2).
const TRAILER_LEN: usize = 10;

/// Kind of message carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    DataKeyFrame = 0,
    DataDeltaFrame = 1,
    Event = 2,
    KeepAlive = 3,
    DataSetMetadata = 4,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::DataKeyFrame,
        MessageType::DataDeltaFrame,
        MessageType::Event,
        MessageType::KeepAlive,
        MessageType::DataSetMetadata,
    ];

    /// Whether the header carries the TimeStamp / FieldCount trailer.
    pub fn has_trailer(self) -> bool {
        matches!(
            self,
            MessageType::DataKeyFrame | MessageType::DataDeltaFrame | MessageType::Event
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::DataKeyFrame => "DataKeyFrame",
            MessageType::DataDeltaFrame => "DataDeltaFrame",
            MessageType::Event => "Event",
            MessageType::KeepAlive => "KeepAlive",
            MessageType::DataSetMetadata => "DataSetMetadata",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| *ty as u8 == value)
            .ok_or(FrameError::UnknownMessageType(value))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DataSet configuration version.
///
/// `major` changes when fields are removed, reordered, inserted or retyped and
/// must match between producer and consumer. `minor` tracks backward
/// compatible tail appends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigurationVersion {
    pub major: u8,
    pub minor: u8,
}

impl ConfigurationVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Incompatible change: next major, minor reset to 0. Wraps on overflow.
    pub fn bump_major(&mut self) {
        self.major = self.major.wrapping_add(1);
        self.minor = 0;
    }

    /// Compatible change. An overflowing minor rolls into a major bump.
    pub fn bump_minor(&mut self) {
        match self.minor.checked_add(1) {
            Some(minor) => self.minor = minor,
            None => self.bump_major(),
        }
    }

    /// Consumers can decode data produced under `other`.
    pub fn is_compatible_with(self, other: ConfigurationVersion) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for ConfigurationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Encoded header size for the given flags and message type.
pub fn compute_header_length(flags: EncodingFlags, message_type: MessageType) -> usize {
    let trailer = if message_type.has_trailer() {
        TRAILER_LEN
    } else {
        0
    };
    FIXED_HEADER_LEN + flags.length_type.width() + trailer
}

/// Field access shared by both header roles.
///
/// Producer headers reject reading `message_length`, which only exists once a
/// frame is assembled. Consumer headers reject every setter and fail reads
/// until synchronized.
pub trait MessageHeader {
    fn message_type(&self) -> Result<MessageType>;
    fn set_message_type(&mut self, message_type: MessageType) -> Result<()>;

    fn encoding_flags(&self) -> Result<EncodingFlags>;

    /// Total frame length, header included.
    fn message_length(&self) -> Result<u32>;

    fn sequence_number(&self) -> Result<u16>;
    fn set_sequence_number(&mut self, sequence_number: u16) -> Result<()>;

    fn configuration_version(&self) -> Result<ConfigurationVersion>;
    fn set_configuration_version(&mut self, version: ConfigurationVersion) -> Result<()>;

    /// Time the data was collected. `UaDateTime::MIN` for messages without a trailer.
    fn timestamp(&self) -> Result<UaDateTime>;
    fn set_timestamp(&mut self, timestamp: UaDateTime) -> Result<()>;

    /// Number of DataSet fields. `0` for messages without a trailer.
    fn field_count(&self) -> Result<u16>;
    fn set_field_count(&mut self, field_count: u16) -> Result<()>;

    fn header_length(&self) -> Result<usize> {
        Ok(compute_header_length(
            self.encoding_flags()?,
            self.message_type()?,
        ))
    }
}

/// Header of an outbound association.
#[derive(Debug, Clone)]
pub struct ProducerMessageHeader {
    flags: EncodingFlags,
    message_type: MessageType,
    sequence_number: u16,
    configuration_version: ConfigurationVersion,
    timestamp: UaDateTime,
    field_count: u16,
}

impl ProducerMessageHeader {
    const ROLE: &'static str = "producer";

    pub fn new(flags: EncodingFlags) -> Self {
        Self {
            flags,
            message_type: MessageType::DataKeyFrame,
            sequence_number: 0,
            configuration_version: ConfigurationVersion::default(),
            timestamp: UaDateTime::MIN,
            field_count: 0,
        }
    }

    pub fn flags(&self) -> EncodingFlags {
        self.flags
    }

    /// Encoded size of this header as currently configured.
    pub fn encoded_len(&self) -> usize {
        compute_header_length(self.flags, self.message_type)
    }

    /// Advance the sequence number, wrapping at 16 bits.
    pub fn advance_sequence_number(&mut self) -> u16 {
        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.sequence_number
    }

    /// Write the header for a frame of `message_length` total bytes.
    ///
    /// Nothing is written if the length does not fit the length field.
    pub fn synchronize<E: BinaryEncoder + ?Sized>(
        &self,
        encoder: &mut E,
        message_length: usize,
    ) -> Result<()> {
        let max = self.flags.length_type.max_length();
        if message_length as u64 > max {
            return Err(FrameError::MessageTooLong {
                length: message_length,
                max,
            });
        }

        encoder.write_byte(self.message_type as u8);
        encoder.write_byte(self.flags.bits());
        // Range checked above.
        match self.flags.length_type {
            MessageLengthFieldType::OneByte => encoder.write_byte(message_length as u8),
            MessageLengthFieldType::TwoBytes => encoder.write_uint16(message_length as u16),
            MessageLengthFieldType::FourBytes => encoder.write_uint32(message_length as u32),
        }
        encoder.write_uint16(self.sequence_number);
        encoder.write_byte(self.configuration_version.major);
        encoder.write_byte(self.configuration_version.minor);
        if self.message_type.has_trailer() {
            encoder.write_date_time(self.timestamp);
            encoder.write_uint16(self.field_count);
        }
        Ok(())
    }
}

impl Default for ProducerMessageHeader {
    fn default() -> Self {
        Self::new(EncodingFlags::default())
    }
}

impl MessageHeader for ProducerMessageHeader {
    fn message_type(&self) -> Result<MessageType> {
        Ok(self.message_type)
    }

    fn set_message_type(&mut self, message_type: MessageType) -> Result<()> {
        self.message_type = message_type;
        Ok(())
    }

    fn encoding_flags(&self) -> Result<EncodingFlags> {
        Ok(self.flags)
    }

    fn message_length(&self) -> Result<u32> {
        Err(FrameError::NotApplicable {
            operation: "message_length",
            role: Self::ROLE,
        })
    }

    fn sequence_number(&self) -> Result<u16> {
        Ok(self.sequence_number)
    }

    fn set_sequence_number(&mut self, sequence_number: u16) -> Result<()> {
        self.sequence_number = sequence_number;
        Ok(())
    }

    fn configuration_version(&self) -> Result<ConfigurationVersion> {
        Ok(self.configuration_version)
    }

    fn set_configuration_version(&mut self, version: ConfigurationVersion) -> Result<()> {
        self.configuration_version = version;
        Ok(())
    }

    fn timestamp(&self) -> Result<UaDateTime> {
        Ok(self.timestamp)
    }

    fn set_timestamp(&mut self, timestamp: UaDateTime) -> Result<()> {
        self.timestamp = timestamp;
        Ok(())
    }

    fn field_count(&self) -> Result<u16> {
        Ok(self.field_count)
    }

    fn set_field_count(&mut self, field_count: u16) -> Result<()> {
        self.field_count = field_count;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct DecodedFields {
    message_type: MessageType,
    flags: EncodingFlags,
    message_length: u32,
    sequence_number: u16,
    configuration_version: ConfigurationVersion,
    timestamp: UaDateTime,
    field_count: u16,
}

impl DecodedFields {
    fn decode<D: BinaryDecoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        let message_type = MessageType::try_from(decoder.read_byte()?)?;
        let flags = EncodingFlags::from_bits(decoder.read_byte()?)?;
        let message_length = match flags.length_type {
            MessageLengthFieldType::OneByte => u32::from(decoder.read_byte()?),
            MessageLengthFieldType::TwoBytes => u32::from(decoder.read_uint16()?),
            MessageLengthFieldType::FourBytes => decoder.read_uint32()?,
        };
        let sequence_number = decoder.read_uint16()?;
        let major = decoder.read_byte()?;
        let minor = decoder.read_byte()?;
        let (timestamp, field_count) = if message_type.has_trailer() {
            (decoder.read_date_time()?, decoder.read_uint16()?)
        } else {
            (UaDateTime::MIN, 0)
        };

        Ok(Self {
            message_type,
            flags,
            message_length,
            sequence_number,
            configuration_version: ConfigurationVersion::new(major, minor),
            timestamp,
            field_count,
        })
    }
}

/// Header of an inbound association, filled by [`synchronize`](Self::synchronize).
#[derive(Debug, Clone, Default)]
pub struct ConsumerMessageHeader {
    fields: Option<DecodedFields>,
}

impl ConsumerMessageHeader {
    const ROLE: &'static str = "consumer";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_synchronized(&self) -> bool {
        self.fields.is_some()
    }

    /// Decode a header from `decoder`, consuming exactly the header bytes.
    ///
    /// On failure the header is left unsynchronized.
    pub fn synchronize<D: BinaryDecoder + ?Sized>(&mut self, decoder: &mut D) -> Result<()> {
        self.fields = None;
        self.fields = Some(DecodedFields::decode(decoder)?);
        Ok(())
    }

    fn fields(&self, field: &'static str) -> Result<&DecodedFields> {
        self.fields
            .as_ref()
            .ok_or(FrameError::NotSynchronized { field })
    }

    fn read_only(operation: &'static str) -> Result<()> {
        Err(FrameError::NotApplicable {
            operation,
            role: Self::ROLE,
        })
    }
}

impl MessageHeader for ConsumerMessageHeader {
    fn message_type(&self) -> Result<MessageType> {
        Ok(self.fields("message_type")?.message_type)
    }

    fn set_message_type(&mut self, _: MessageType) -> Result<()> {
        Self::read_only("set_message_type")
    }

    fn encoding_flags(&self) -> Result<EncodingFlags> {
        Ok(self.fields("encoding_flags")?.flags)
    }

    fn message_length(&self) -> Result<u32> {
        Ok(self.fields("message_length")?.message_length)
    }

    fn sequence_number(&self) -> Result<u16> {
        Ok(self.fields("sequence_number")?.sequence_number)
    }

    fn set_sequence_number(&mut self, _: u16) -> Result<()> {
        Self::read_only("set_sequence_number")
    }

    fn configuration_version(&self) -> Result<ConfigurationVersion> {
        Ok(self.fields("configuration_version")?.configuration_version)
    }

    fn set_configuration_version(&mut self, _: ConfigurationVersion) -> Result<()> {
        Self::read_only("set_configuration_version")
    }

    fn timestamp(&self) -> Result<UaDateTime> {
        Ok(self.fields("timestamp")?.timestamp)
    }

    fn set_timestamp(&mut self, _: UaDateTime) -> Result<()> {
        Self::read_only("set_timestamp")
    }

    fn field_count(&self) -> Result<u16> {
        Ok(self.fields("field_count")?.field_count)
    }

    fn set_field_count(&mut self, _: u16) -> Result<()> {
        Self::read_only("set_field_count")
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Buf, BytesMut};

    use super::*;
    use crate::flags::FieldEncoding;

    fn producer(
        length_type: MessageLengthFieldType,
        message_type: MessageType,
    ) -> ProducerMessageHeader {
        let mut header =
            ProducerMessageHeader::new(EncodingFlags::new(length_type, FieldEncoding::Variant));
        header.set_message_type(message_type).unwrap();
        header
    }

    #[test]
    fn data_key_frame_two_byte_header_is_18_bytes() {
        let header = producer(MessageLengthFieldType::TwoBytes, MessageType::DataKeyFrame);
        let mut buf = BytesMut::new();
        header.synchronize(&mut buf, 18).unwrap();
        assert_eq!(buf.len(), 18);
        assert_eq!(header.encoded_len(), 18);
        assert_eq!(&buf[..4], &[0x00, 0x01, 18, 0]);
    }

    #[test]
    fn computed_length_matches_written_bytes() {
        for length_type in MessageLengthFieldType::ALL {
            for message_type in MessageType::ALL {
                let header = producer(length_type, message_type);
                let mut buf = BytesMut::new();
                header.synchronize(&mut buf, 20).unwrap();
                assert_eq!(
                    buf.len(),
                    compute_header_length(header.flags(), message_type),
                    "{length_type:?} {message_type}"
                );
            }
        }
    }

    #[test]
    fn consumer_reproduces_producer_fields() {
        for length_type in MessageLengthFieldType::ALL {
            for message_type in MessageType::ALL {
                let mut header = producer(length_type, message_type);
                header.set_sequence_number(0xBEEF).unwrap();
                header
                    .set_configuration_version(ConfigurationVersion::new(3, 7))
                    .unwrap();
                header
                    .set_timestamp(UaDateTime::from_ticks(131_000_000_000_000_000))
                    .unwrap();
                header.set_field_count(12).unwrap();

                let mut buf = BytesMut::new();
                header.synchronize(&mut buf, 200).unwrap();
                buf.extend_from_slice(b"payload");

                let mut input = buf.freeze();
                let mut consumer = ConsumerMessageHeader::new();
                consumer.synchronize(&mut input).unwrap();

                assert_eq!(consumer.message_type().unwrap(), message_type);
                assert_eq!(consumer.encoding_flags().unwrap(), header.flags());
                assert_eq!(consumer.message_length().unwrap(), 200);
                assert_eq!(consumer.sequence_number().unwrap(), 0xBEEF);
                assert_eq!(
                    consumer.configuration_version().unwrap(),
                    ConfigurationVersion::new(3, 7)
                );
                if message_type.has_trailer() {
                    assert_eq!(consumer.timestamp().unwrap(), header.timestamp().unwrap());
                    assert_eq!(consumer.field_count().unwrap(), 12);
                } else {
                    assert_eq!(consumer.timestamp().unwrap(), UaDateTime::MIN);
                    assert_eq!(consumer.field_count().unwrap(), 0);
                }
                assert_eq!(consumer.header_length().unwrap(), header.encoded_len());
                // Only the header is consumed.
                assert_eq!(input.chunk(), b"payload");
            }
        }
    }

    fn assert_every_getter_unsynchronized(consumer: &ConsumerMessageHeader) {
        assert!(!consumer.is_synchronized());
        let unsynced = |result: Result<()>, expected: &str| match result {
            Err(FrameError::NotSynchronized { field }) => assert_eq!(field, expected),
            other => panic!("{expected}: expected NotSynchronized, got {other:?}"),
        };
        unsynced(consumer.message_type().map(drop), "message_type");
        unsynced(consumer.encoding_flags().map(drop), "encoding_flags");
        unsynced(consumer.message_length().map(drop), "message_length");
        unsynced(consumer.sequence_number().map(drop), "sequence_number");
        unsynced(
            consumer.configuration_version().map(drop),
            "configuration_version",
        );
        unsynced(consumer.timestamp().map(drop), "timestamp");
        unsynced(consumer.field_count().map(drop), "field_count");
        assert!(matches!(
            consumer.header_length(),
            Err(FrameError::NotSynchronized { .. })
        ));
    }

    #[test]
    fn consumer_getters_fail_before_sync() {
        let consumer = ConsumerMessageHeader::new();
        assert_every_getter_unsynchronized(&consumer);
    }

    #[test]
    fn consumer_getters_fail_after_failed_decode() {
        let header = producer(MessageLengthFieldType::TwoBytes, MessageType::DataKeyFrame);
        let mut buf = BytesMut::new();
        header.synchronize(&mut buf, 18).unwrap();

        let mut consumer = ConsumerMessageHeader::new();
        consumer.synchronize(&mut buf.clone().freeze()).unwrap();
        assert_eq!(consumer.sequence_number().unwrap(), 0);

        let mut truncated = &buf[..12];
        assert!(consumer.synchronize(&mut truncated).is_err());
        assert_every_getter_unsynchronized(&consumer);
    }

    #[test]
    fn consumer_setters_always_fail() {
        let header = producer(MessageLengthFieldType::OneByte, MessageType::KeepAlive);
        let mut buf = BytesMut::new();
        header.synchronize(&mut buf, 9).unwrap();

        let mut consumer = ConsumerMessageHeader::new();
        for synced in [false, true] {
            if synced {
                consumer.synchronize(&mut buf.clone().freeze()).unwrap();
            }
            assert!(matches!(
                consumer.set_sequence_number(1),
                Err(FrameError::NotApplicable {
                    operation: "set_sequence_number",
                    role: "consumer"
                })
            ));
            assert!(consumer.set_message_type(MessageType::Event).is_err());
            assert!(consumer
                .set_configuration_version(ConfigurationVersion::new(1, 0))
                .is_err());
            assert!(consumer.set_timestamp(UaDateTime::now()).is_err());
            assert!(consumer.set_field_count(1).is_err());
        }
    }

    #[test]
    fn producer_message_length_not_applicable() {
        let header = ProducerMessageHeader::default();
        assert!(matches!(
            header.message_length(),
            Err(FrameError::NotApplicable {
                operation: "message_length",
                role: "producer"
            })
        ));
    }

    #[test]
    fn length_overflowing_field_rejected() {
        let header = producer(MessageLengthFieldType::OneByte, MessageType::DataKeyFrame);
        let mut buf = BytesMut::new();
        let err = header.synchronize(&mut buf, 256).unwrap_err();
        assert!(matches!(
            err,
            FrameError::MessageTooLong {
                length: 256,
                max: 255
            }
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn failed_decode_leaves_header_unsynchronized() {
        let header = producer(MessageLengthFieldType::TwoBytes, MessageType::DataKeyFrame);
        let mut buf = BytesMut::new();
        header.synchronize(&mut buf, 18).unwrap();

        let mut consumer = ConsumerMessageHeader::new();
        consumer.synchronize(&mut buf.clone().freeze()).unwrap();
        assert!(consumer.is_synchronized());

        let mut truncated = &buf[..10];
        assert!(matches!(
            consumer.synchronize(&mut truncated),
            Err(FrameError::Truncated { .. })
        ));
        assert!(!consumer.is_synchronized());

        let mut unknown: &[u8] = &[9, 0, 0];
        assert!(matches!(
            consumer.synchronize(&mut unknown),
            Err(FrameError::UnknownMessageType(9))
        ));

        let mut bad_flags: &[u8] = &[0, 0x03, 0];
        assert!(matches!(
            consumer.synchronize(&mut bad_flags),
            Err(FrameError::InvalidEncodingFlags(0x03))
        ));
    }

    #[test]
    fn version_bumps() {
        let mut version = ConfigurationVersion::new(1, 4);
        version.bump_minor();
        assert_eq!(version, ConfigurationVersion::new(1, 5));
        version.bump_major();
        assert_eq!(version, ConfigurationVersion::new(2, 0));

        let mut full = ConfigurationVersion::new(2, u8::MAX);
        full.bump_minor();
        assert_eq!(full, ConfigurationVersion::new(3, 0));

        let v3 = ConfigurationVersion::new(3, 0);
        assert!(v3.is_compatible_with(ConfigurationVersion::new(3, 9)));
        assert!(!v3.is_compatible_with(ConfigurationVersion::new(4, 0)));
    }

    #[test]
    fn message_type_bytes() {
        assert_eq!(MessageType::try_from(3).unwrap(), MessageType::KeepAlive);
        assert!(matches!(
            MessageType::try_from(5),
            Err(FrameError::UnknownMessageType(5))
        ));
    }
}
