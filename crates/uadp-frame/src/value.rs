//! Built-in value model.
//!
//! The payload carries a closed set of primitive kinds. [`BuiltInType`] is the
//! declared kind of a field; [`Value`] is a runtime value of one of those kinds.

use std::fmt;

use bytes::Bytes;

use crate::datetime::UaDateTime;
use crate::error::{FrameError, Result};

/// Supported OPC UA built-in types, tagged with their standard type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BuiltInType {
    Boolean = 1,
    SByte = 2,
    Byte = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float = 10,
    Double = 11,
    String = 12,
    DateTime = 13,
    ByteString = 15,
}

impl BuiltInType {
    pub const ALL: [BuiltInType; 14] = [
        BuiltInType::Boolean,
        BuiltInType::SByte,
        BuiltInType::Byte,
        BuiltInType::Int16,
        BuiltInType::UInt16,
        BuiltInType::Int32,
        BuiltInType::UInt32,
        BuiltInType::Int64,
        BuiltInType::UInt64,
        BuiltInType::Float,
        BuiltInType::Double,
        BuiltInType::String,
        BuiltInType::DateTime,
        BuiltInType::ByteString,
    ];

    /// Standard type id.
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltInType::Boolean => "Boolean",
            BuiltInType::SByte => "SByte",
            BuiltInType::Byte => "Byte",
            BuiltInType::Int16 => "Int16",
            BuiltInType::UInt16 => "UInt16",
            BuiltInType::Int32 => "Int32",
            BuiltInType::UInt32 => "UInt32",
            BuiltInType::Int64 => "Int64",
            BuiltInType::UInt64 => "UInt64",
            BuiltInType::Float => "Float",
            BuiltInType::Double => "Double",
            BuiltInType::String => "String",
            BuiltInType::DateTime => "DateTime",
            BuiltInType::ByteString => "ByteString",
        }
    }

    /// Look up a type by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(name))
    }

    /// Encoded size for fixed-width kinds; `None` for length-prefixed ones.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            BuiltInType::Boolean | BuiltInType::SByte | BuiltInType::Byte => Some(1),
            BuiltInType::Int16 | BuiltInType::UInt16 => Some(2),
            BuiltInType::Int32 | BuiltInType::UInt32 | BuiltInType::Float => Some(4),
            BuiltInType::Int64
            | BuiltInType::UInt64
            | BuiltInType::Double
            | BuiltInType::DateTime => Some(8),
            BuiltInType::String | BuiltInType::ByteString => None,
        }
    }
}

impl TryFrom<u8> for BuiltInType {
    type Error = FrameError;

    fn try_from(id: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.id() == id)
            .ok_or(FrameError::UnsupportedType(id))
    }
}

impl fmt::Display for BuiltInType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A runtime value as produced by a binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value. Encodable only as a null string or byte string.
    Null,
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    DateTime(UaDateTime),
    ByteString(Bytes),
}

impl Value {
    /// Runtime kind. `None` for [`Value::Null`].
    pub fn built_in_type(&self) -> Option<BuiltInType> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(_) => BuiltInType::Boolean,
            Value::SByte(_) => BuiltInType::SByte,
            Value::Byte(_) => BuiltInType::Byte,
            Value::Int16(_) => BuiltInType::Int16,
            Value::UInt16(_) => BuiltInType::UInt16,
            Value::Int32(_) => BuiltInType::Int32,
            Value::UInt32(_) => BuiltInType::UInt32,
            Value::Int64(_) => BuiltInType::Int64,
            Value::UInt64(_) => BuiltInType::UInt64,
            Value::Float(_) => BuiltInType::Float,
            Value::Double(_) => BuiltInType::Double,
            Value::String(_) => BuiltInType::String,
            Value::DateTime(_) => BuiltInType::DateTime,
            Value::ByteString(_) => BuiltInType::ByteString,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parse a textual literal as the given kind.
    ///
    /// Byte strings are hex; date-times are 100 ns ticks since 1601.
    pub fn parse(ty: BuiltInType, literal: &str) -> Result<Self> {
        let invalid = || FrameError::InvalidLiteral {
            ty,
            literal: literal.to_string(),
        };
        fn num<T: std::str::FromStr>(literal: &str) -> Option<T> {
            literal.trim().parse::<T>().ok()
        }

        let value = match ty {
            BuiltInType::Boolean => num(literal).map(Value::Boolean),
            BuiltInType::SByte => num(literal).map(Value::SByte),
            BuiltInType::Byte => num(literal).map(Value::Byte),
            BuiltInType::Int16 => num(literal).map(Value::Int16),
            BuiltInType::UInt16 => num(literal).map(Value::UInt16),
            BuiltInType::Int32 => num(literal).map(Value::Int32),
            BuiltInType::UInt32 => num(literal).map(Value::UInt32),
            BuiltInType::Int64 => num(literal).map(Value::Int64),
            BuiltInType::UInt64 => num(literal).map(Value::UInt64),
            BuiltInType::Float => num(literal).map(Value::Float),
            BuiltInType::Double => num(literal).map(Value::Double),
            BuiltInType::String => Some(Value::String(literal.to_string())),
            BuiltInType::DateTime => num(literal)
                .map(UaDateTime::from_ticks)
                .map(Value::DateTime),
            BuiltInType::ByteString => hex::decode(literal.trim())
                .ok()
                .map(|bytes| Value::ByteString(Bytes::from(bytes))),
        };
        value.ok_or_else(invalid)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::SByte(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::ByteString(v) => f.write_str(&hex::encode(v)),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    &str => String,
    UaDateTime => DateTime,
    Bytes => ByteString,
    Vec<u8> => ByteString,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
