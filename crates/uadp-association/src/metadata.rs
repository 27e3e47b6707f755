use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use uadp_frame::{
    BinaryDecoder, BinaryEncoder, BuiltInType, ConfigurationVersion, DataSetId, FrameError,
};
use uuid::Uuid;

use crate::error::Result;
use crate::serde_types::{built_in_type, ConfigurationVersionDef};

/// One DataSet field: its name and declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetaData {
    pub name: String,
    #[serde(rename = "type", with = "built_in_type")]
    pub built_in_type: BuiltInType,
}

impl FieldMetaData {
    pub fn new(name: impl Into<String>, built_in_type: BuiltInType) -> Self {
        Self {
            name: name.into(),
            built_in_type,
        }
    }
}

/// Layout of a DataSet shared between publisher and subscriber.
///
/// Field order is the payload order. Changing the layout goes through
/// [`append_field`](Self::append_field) (minor bump) or
/// [`replace_fields`](Self::replace_fields) (major bump).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSetMetaData {
    pub name: String,
    #[serde(default = "Uuid::new_v4")]
    pub dataset_id: Uuid,
    #[serde(with = "ConfigurationVersionDef", default)]
    pub configuration_version: ConfigurationVersion,
    pub fields: Vec<FieldMetaData>,
}

impl DataSetMetaData {
    /// New DataSet with a random id at version 0.0.
    pub fn new(name: impl Into<String>, fields: Vec<FieldMetaData>) -> Self {
        Self {
            name: name.into(),
            dataset_id: Uuid::new_v4(),
            configuration_version: ConfigurationVersion::default(),
            fields,
        }
    }

    pub fn id(&self) -> DataSetId {
        DataSetId::from(self.dataset_id)
    }

    pub fn field_types(&self) -> Vec<BuiltInType> {
        self.fields.iter().map(|f| f.built_in_type).collect()
    }

    /// Backward-compatible change: add a field at the end.
    pub fn append_field(&mut self, field: FieldMetaData) {
        self.fields.push(field);
        self.configuration_version.bump_minor();
    }

    /// Incompatible change: new field list.
    pub fn replace_fields(&mut self, fields: Vec<FieldMetaData>) {
        self.fields = fields;
        self.configuration_version.bump_major();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Payload of a `DataSetMetadata` message: the JSON document as a string field.
    pub fn encode_payload(&self) -> Result<Bytes> {
        let json = self.to_json()?;
        let mut payload = BytesMut::with_capacity(json.len() + 4);
        payload.write_string(Some(json.as_str()))?;
        Ok(payload.freeze())
    }

    pub fn decode_payload(mut payload: Bytes) -> Result<Self> {
        let json = payload
            .read_string()?
            .ok_or(FrameError::InvalidLengthPrefix(-1))?;
        Self::from_json(&json)
    }
}
