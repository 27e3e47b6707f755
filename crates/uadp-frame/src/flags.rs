//! The encoding flags byte.
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───┬───┬───┬───┬───────┬───────┐
//! │ reserved (0)  │ field │ length│
//! │               │ enc.  │ width │
//! └───┴───┴───┴───┴───────┴───────┘
//! ```

use crate::error::{FrameError, Result};

/// Mask of the length-field width selector.
pub const LENGTH_FIELD_MASK: u8 = 0x03;

/// Mask of the field-encoding selector.
pub const FIELD_ENCODING_MASK: u8 = 0x0C;

/// Width of the `MessageLength` header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageLengthFieldType {
    OneByte = 0x0,
    TwoBytes = 0x1,
    FourBytes = 0x2,
}

impl MessageLengthFieldType {
    pub const ALL: [MessageLengthFieldType; 3] = [
        MessageLengthFieldType::OneByte,
        MessageLengthFieldType::TwoBytes,
        MessageLengthFieldType::FourBytes,
    ];

    /// Bytes occupied on the wire.
    pub fn width(self) -> usize {
        match self {
            MessageLengthFieldType::OneByte => 1,
            MessageLengthFieldType::TwoBytes => 2,
            MessageLengthFieldType::FourBytes => 4,
        }
    }

    /// Largest message length the field can carry.
    pub fn max_length(self) -> u64 {
        match self {
            MessageLengthFieldType::OneByte => u8::MAX as u64,
            MessageLengthFieldType::TwoBytes => u16::MAX as u64,
            MessageLengthFieldType::FourBytes => u32::MAX as u64,
        }
    }
}

/// How DataSet fields are represented in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldEncoding {
    Variant = 0x0,
    RawData = 0x4,
    DataValue = 0x8,
}

impl FieldEncoding {
    pub const ALL: [FieldEncoding; 3] = [
        FieldEncoding::Variant,
        FieldEncoding::RawData,
        FieldEncoding::DataValue,
    ];
}

/// Pack both selectors into one flags byte.
pub fn encode_flags(length_type: MessageLengthFieldType, field_encoding: FieldEncoding) -> u8 {
    (field_encoding as u8 & FIELD_ENCODING_MASK) | (length_type as u8 & LENGTH_FIELD_MASK)
}

/// Split a flags byte into its selectors.
///
/// Reserved selector values and any bit outside the two masks are rejected.
pub fn decode_flags(flags: u8) -> Result<(MessageLengthFieldType, FieldEncoding)> {
    if flags & !(LENGTH_FIELD_MASK | FIELD_ENCODING_MASK) != 0 {
        return Err(FrameError::InvalidEncodingFlags(flags));
    }

    let length_type = match flags & LENGTH_FIELD_MASK {
        0x0 => MessageLengthFieldType::OneByte,
        0x1 => MessageLengthFieldType::TwoBytes,
        0x2 => MessageLengthFieldType::FourBytes,
        _ => return Err(FrameError::InvalidEncodingFlags(flags)),
    };

    let field_encoding = match flags & FIELD_ENCODING_MASK {
        0x0 => FieldEncoding::Variant,
        0x4 => FieldEncoding::RawData,
        0x8 => FieldEncoding::DataValue,
        _ => return Err(FrameError::InvalidEncodingFlags(flags)),
    };

    Ok((length_type, field_encoding))
}

/// Typed view of a validated flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingFlags {
    pub length_type: MessageLengthFieldType,
    pub field_encoding: FieldEncoding,
}

impl EncodingFlags {
    pub fn new(length_type: MessageLengthFieldType, field_encoding: FieldEncoding) -> Self {
        Self {
            length_type,
            field_encoding,
        }
    }

    /// Wire representation.
    pub fn bits(self) -> u8 {
        encode_flags(self.length_type, self.field_encoding)
    }

    /// Parse a wire byte.
    pub fn from_bits(flags: u8) -> Result<Self> {
        let (length_type, field_encoding) = decode_flags(flags)?;
        Ok(Self::new(length_type, field_encoding))
    }
}

impl Default for EncodingFlags {
    fn default() -> Self {
        Self::new(MessageLengthFieldType::TwoBytes, FieldEncoding::Variant)
    }
}
