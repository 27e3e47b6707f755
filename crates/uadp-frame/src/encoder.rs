//! Typed write primitives.
//!
//! All multi-byte values are little-endian. Strings and byte strings carry an
//! `i32` length prefix; `-1` encodes a null string.

use bytes::{BufMut, BytesMut};

use crate::datetime::UaDateTime;
use crate::error::{FrameError, Result};
use crate::value::{BuiltInType, Value};

/// Length prefix of a null string or byte string.
pub const NULL_LENGTH: i32 = -1;

/// Sink for the protocol's primitive kinds.
///
/// Implemented for [`BytesMut`]; custom implementations can redirect or
/// inspect the payload as it is produced.
pub trait BinaryEncoder {
    fn write_boolean(&mut self, value: bool);
    fn write_sbyte(&mut self, value: i8);
    fn write_byte(&mut self, value: u8);
    fn write_int16(&mut self, value: i16);
    fn write_uint16(&mut self, value: u16);
    fn write_int32(&mut self, value: i32);
    fn write_uint32(&mut self, value: u32);
    fn write_int64(&mut self, value: i64);
    fn write_uint64(&mut self, value: u64);
    fn write_float(&mut self, value: f32);
    fn write_double(&mut self, value: f64);
    fn write_bytes(&mut self, value: &[u8]);

    fn write_date_time(&mut self, value: UaDateTime) {
        self.write_int64(value.ticks());
    }

    fn write_string(&mut self, value: Option<&str>) -> Result<()> {
        self.write_byte_string(value.map(str::as_bytes))
    }

    fn write_byte_string(&mut self, value: Option<&[u8]>) -> Result<()> {
        match value {
            None => self.write_int32(NULL_LENGTH),
            Some(bytes) => {
                let len = i32::try_from(bytes.len()).map_err(|_| FrameError::MessageTooLong {
                    length: bytes.len(),
                    max: i32::MAX as u64,
                })?;
                self.write_int32(len);
                self.write_bytes(bytes);
            }
        }
        Ok(())
    }
}

impl BinaryEncoder for BytesMut {
    fn write_boolean(&mut self, value: bool) {
        self.put_u8(u8::from(value));
    }

    fn write_sbyte(&mut self, value: i8) {
        self.put_i8(value);
    }

    fn write_byte(&mut self, value: u8) {
        self.put_u8(value);
    }

    fn write_int16(&mut self, value: i16) {
        self.put_i16_le(value);
    }

    fn write_uint16(&mut self, value: u16) {
        self.put_u16_le(value);
    }

    fn write_int32(&mut self, value: i32) {
        self.put_i32_le(value);
    }

    fn write_uint32(&mut self, value: u32) {
        self.put_u32_le(value);
    }

    fn write_int64(&mut self, value: i64) {
        self.put_i64_le(value);
    }

    fn write_uint64(&mut self, value: u64) {
        self.put_u64_le(value);
    }

    fn write_float(&mut self, value: f32) {
        self.put_f32_le(value);
    }

    fn write_double(&mut self, value: f64) {
        self.put_f64_le(value);
    }

    fn write_bytes(&mut self, value: &[u8]) {
        self.put_slice(value);
    }
}

/// Write one bound value, checking it against its declared kind.
///
/// `index` is the item position, reported in errors. A null value is only
/// encodable for strings and byte strings (as a null length prefix).
pub fn write_value<E: BinaryEncoder + ?Sized>(
    encoder: &mut E,
    index: usize,
    declared: BuiltInType,
    value: &Value,
) -> Result<()> {
    match (declared, value) {
        (BuiltInType::String, Value::Null) => encoder.write_string(None)?,
        (BuiltInType::ByteString, Value::Null) => encoder.write_byte_string(None)?,
        (_, Value::Null) => return Err(FrameError::MissingValue { index, declared }),
        (BuiltInType::Boolean, Value::Boolean(v)) => encoder.write_boolean(*v),
        (BuiltInType::SByte, Value::SByte(v)) => encoder.write_sbyte(*v),
        (BuiltInType::Byte, Value::Byte(v)) => encoder.write_byte(*v),
        (BuiltInType::Int16, Value::Int16(v)) => encoder.write_int16(*v),
        (BuiltInType::UInt16, Value::UInt16(v)) => encoder.write_uint16(*v),
        (BuiltInType::Int32, Value::Int32(v)) => encoder.write_int32(*v),
        (BuiltInType::UInt32, Value::UInt32(v)) => encoder.write_uint32(*v),
        (BuiltInType::Int64, Value::Int64(v)) => encoder.write_int64(*v),
        (BuiltInType::UInt64, Value::UInt64(v)) => encoder.write_uint64(*v),
        (BuiltInType::Float, Value::Float(v)) => encoder.write_float(*v),
        (BuiltInType::Double, Value::Double(v)) => encoder.write_double(*v),
        (BuiltInType::String, Value::String(v)) => encoder.write_string(Some(v.as_str()))?,
        (BuiltInType::DateTime, Value::DateTime(v)) => encoder.write_date_time(*v),
        (BuiltInType::ByteString, Value::ByteString(v)) => {
            encoder.write_byte_string(Some(v.as_ref()))?
        }
        (declared, other) => {
            return Err(FrameError::TypeMismatch {
                index,
                declared,
                // Null is handled above, so every remaining value has a kind.
                actual: other.built_in_type().unwrap_or(declared),
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(declared: BuiltInType, value: Value) -> Result<Vec<u8>> {
        let mut buf = BytesMut::new();
        write_value(&mut buf, 0, declared, &value)?;
        Ok(buf.to_vec())
    }

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(
            encode(BuiltInType::UInt16, Value::UInt16(0x1234)).unwrap(),
            vec![0x34, 0x12]
        );
        assert_eq!(
            encode(BuiltInType::Int32, Value::Int32(-2)).unwrap(),
            vec![0xFE, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            encode(BuiltInType::UInt64, Value::UInt64(1)).unwrap(),
            vec![1, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn boolean_is_one_byte() {
        assert_eq!(encode(BuiltInType::Boolean, Value::Boolean(true)).unwrap(), vec![1]);
        assert_eq!(encode(BuiltInType::Boolean, Value::Boolean(false)).unwrap(), vec![0]);
    }

    #[test]
    fn floats_use_ieee_layout() {
        assert_eq!(
            encode(BuiltInType::Float, Value::Float(1.0)).unwrap(),
            1.0f32.to_le_bytes().to_vec()
        );
        assert_eq!(
            encode(BuiltInType::Double, Value::Double(-0.5)).unwrap(),
            (-0.5f64).to_le_bytes().to_vec()
        );
    }

    #[test]
    fn strings_are_length_prefixed() {
        assert_eq!(
            encode(BuiltInType::String, Value::from("abc")).unwrap(),
            vec![3, 0, 0, 0, b'a', b'b', b'c']
        );
        assert_eq!(
            encode(BuiltInType::String, Value::from("")).unwrap(),
            vec![0, 0, 0, 0]
        );
        assert_eq!(
            encode(BuiltInType::String, Value::Null).unwrap(),
            vec![0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            encode(BuiltInType::ByteString, Value::from(vec![9u8, 8])).unwrap(),
            vec![2, 0, 0, 0, 9, 8]
        );
    }

    #[test]
    fn date_time_is_tick_count() {
        let ticks = 131_000_000_000_000_000i64;
        assert_eq!(
            encode(BuiltInType::DateTime, Value::DateTime(UaDateTime::from_ticks(ticks))).unwrap(),
            ticks.to_le_bytes().to_vec()
        );
    }

    #[test]
    fn declared_type_mismatch_rejected() {
        let mut buf = BytesMut::new();
        let err = write_value(&mut buf, 3, BuiltInType::Int32, &Value::Int64(1)).unwrap_err();
        assert!(matches!(
            err,
            FrameError::TypeMismatch {
                index: 3,
                declared: BuiltInType::Int32,
                actual: BuiltInType::Int64,
            }
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn null_numeric_is_missing_value() {
        let err = encode(BuiltInType::Float, Value::from(None::<f32>)).unwrap_err();
        assert!(matches!(
            err,
            FrameError::MissingValue {
                index: 0,
                declared: BuiltInType::Float,
            }
        ));
    }
}
