//! Typed read primitives, the inverse of [`crate::encoder`].

use bytes::{Buf, Bytes};

use crate::datetime::UaDateTime;
use crate::encoder::NULL_LENGTH;
use crate::error::{FrameError, Result};
use crate::value::{BuiltInType, Value};

/// Source of the protocol's primitive kinds.
///
/// Every read checks the remaining input first and fails with
/// [`FrameError::Truncated`] instead of panicking.
pub trait BinaryDecoder {
    fn read_boolean(&mut self) -> Result<bool>;
    fn read_sbyte(&mut self) -> Result<i8>;
    fn read_byte(&mut self) -> Result<u8>;
    fn read_int16(&mut self) -> Result<i16>;
    fn read_uint16(&mut self) -> Result<u16>;
    fn read_int32(&mut self) -> Result<i32>;
    fn read_uint32(&mut self) -> Result<u32>;
    fn read_int64(&mut self) -> Result<i64>;
    fn read_uint64(&mut self) -> Result<u64>;
    fn read_float(&mut self) -> Result<f32>;
    fn read_double(&mut self) -> Result<f64>;
    fn read_bytes(&mut self, len: usize) -> Result<Bytes>;

    fn read_date_time(&mut self) -> Result<UaDateTime> {
        self.read_int64().map(UaDateTime::from_ticks)
    }

    /// `None` for a null byte string.
    fn read_byte_string(&mut self) -> Result<Option<Bytes>> {
        match self.read_int32()? {
            NULL_LENGTH => Ok(None),
            len if len < 0 => Err(FrameError::InvalidLengthPrefix(len)),
            len => self.read_bytes(len as usize).map(Some),
        }
    }

    /// `None` for a null string.
    fn read_string(&mut self) -> Result<Option<String>> {
        match self.read_byte_string()? {
            None => Ok(None),
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
        }
    }

    /// Read one value of the given kind. Null strings decode to [`Value::Null`].
    fn read_value(&mut self, ty: BuiltInType) -> Result<Value> {
        Ok(match ty {
            BuiltInType::Boolean => Value::Boolean(self.read_boolean()?),
            BuiltInType::SByte => Value::SByte(self.read_sbyte()?),
            BuiltInType::Byte => Value::Byte(self.read_byte()?),
            BuiltInType::Int16 => Value::Int16(self.read_int16()?),
            BuiltInType::UInt16 => Value::UInt16(self.read_uint16()?),
            BuiltInType::Int32 => Value::Int32(self.read_int32()?),
            BuiltInType::UInt32 => Value::UInt32(self.read_uint32()?),
            BuiltInType::Int64 => Value::Int64(self.read_int64()?),
            BuiltInType::UInt64 => Value::UInt64(self.read_uint64()?),
            BuiltInType::Float => Value::Float(self.read_float()?),
            BuiltInType::Double => Value::Double(self.read_double()?),
            BuiltInType::String => self.read_string()?.into(),
            BuiltInType::DateTime => Value::DateTime(self.read_date_time()?),
            BuiltInType::ByteString => self.read_byte_string()?.into(),
        })
    }
}

fn ensure<B: Buf>(buf: &B, needed: usize) -> Result<()> {
    let remaining = buf.remaining();
    if remaining < needed {
        return Err(FrameError::Truncated { needed, remaining });
    }
    Ok(())
}

macro_rules! read_fixed {
    ($name:ident, $ty:ty, $get:ident) => {
        fn $name(&mut self) -> Result<$ty> {
            ensure(&*self, std::mem::size_of::<$ty>())?;
            Ok(self.$get())
        }
    };
}

impl<B: Buf> BinaryDecoder for B {
    fn read_boolean(&mut self) -> Result<bool> {
        self.read_byte().map(|b| b != 0)
    }

    read_fixed!(read_sbyte, i8, get_i8);
    read_fixed!(read_byte, u8, get_u8);
    read_fixed!(read_int16, i16, get_i16_le);
    read_fixed!(read_uint16, u16, get_u16_le);
    read_fixed!(read_int32, i32, get_i32_le);
    read_fixed!(read_uint32, u32, get_u32_le);
    read_fixed!(read_int64, i64, get_i64_le);
    read_fixed!(read_uint64, u64, get_u64_le);
    read_fixed!(read_float, f32, get_f32_le);
    read_fixed!(read_double, f64, get_f64_le);

    fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        ensure(&*self, len)?;
        Ok(self.copy_to_bytes(len))
    }
}
