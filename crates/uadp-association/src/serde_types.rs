//! Serde adapters for wire-level types that do not derive serde themselves.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uadp_frame::{BuiltInType, ConfigurationVersion, FieldEncoding, MessageLengthFieldType};

#[derive(Serialize, Deserialize)]
#[serde(remote = "ConfigurationVersion")]
pub(crate) struct ConfigurationVersionDef {
    major: u8,
    minor: u8,
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "MessageLengthFieldType", rename_all = "snake_case")]
pub(crate) enum MessageLengthFieldTypeDef {
    OneByte,
    TwoBytes,
    FourBytes,
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "FieldEncoding", rename_all = "snake_case")]
pub(crate) enum FieldEncodingDef {
    Variant,
    RawData,
    DataValue,
}

/// Built-in types as their standard names, matched case-insensitively.
pub(crate) mod built_in_type {
    use super::*;

    pub fn serialize<S: Serializer>(ty: &BuiltInType, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(ty.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BuiltInType, D::Error> {
        let name = String::deserialize(deserializer)?;
        BuiltInType::from_name(&name)
            .ok_or_else(|| de::Error::custom(format!("unknown built-in type `{name}`")))
    }
}
