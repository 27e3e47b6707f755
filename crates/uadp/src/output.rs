use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use uadp_association::{DataSetMessage, DataSetMetaData};
use uadp_frame::{MessageHeader, ReceivedMessage, Value};

const MESSAGE_SCHEMA_ID: &str = "https://schemas.3leaps.dev/uadp/cli/v1/message.schema.json";
const PUBLISH_SCHEMA_ID: &str =
    "https://schemas.3leaps.dev/uadp/cli/v1/publish-summary.schema.json";

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FieldOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub built_in_type: String,
    pub value: String,
}

/// One received or decoded message, flattened for printing.
#[derive(Debug, Default, Serialize)]
pub struct MessageOutput {
    pub schema_id: &'static str,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_count: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sequence_number: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldOutput>,
    #[serde(skip)]
    pub payload: Vec<u8>,
}

impl MessageOutput {
    fn new(kind: &'static str) -> Self {
        Self {
            schema_id: MESSAGE_SCHEMA_ID,
            kind,
            ..Self::default()
        }
    }

    /// Header fields of a message whose payload was not decoded.
    pub fn from_received(kind: &'static str, message: &ReceivedMessage) -> Self {
        let header = message.header();
        let has_trailer = header
            .message_type()
            .map(|ty| ty.has_trailer())
            .unwrap_or(false);
        Self {
            message_type: header.message_type().ok().map(|ty| ty.to_string()),
            sequence_number: header.sequence_number().ok(),
            configuration_version: header.configuration_version().ok().map(|v| v.to_string()),
            timestamp: has_trailer
                .then(|| header.timestamp().ok().map(|t| t.to_string()))
                .flatten(),
            field_count: has_trailer.then(|| header.field_count().ok()).flatten(),
            message_length: header.message_length().ok(),
            payload: message.payload().to_vec(),
            ..Self::new(kind)
        }
    }

    /// Received message with its payload decoded into named fields.
    pub fn with_values(mut self, names: &[String], values: &[Value]) -> Self {
        self.fields = field_outputs(names, values);
        self
    }

    pub fn dataset(message: &DataSetMessage, metadata: Option<&DataSetMetaData>) -> Self {
        let names: Vec<String> = match metadata {
            Some(meta) => meta.fields.iter().map(|f| f.name.clone()).collect(),
            None => Vec::new(),
        };
        Self {
            message_type: Some(message.message_type.to_string()),
            sequence_number: Some(message.sequence_number),
            configuration_version: Some(message.configuration_version.to_string()),
            timestamp: Some(message.timestamp.to_string()),
            field_count: u16::try_from(message.values.len()).ok(),
            fields: field_outputs(&names, &message.values),
            ..Self::new("dataset")
        }
    }

    pub fn keep_alive(sequence_number: u16) -> Self {
        Self {
            message_type: Some("KeepAlive".to_string()),
            sequence_number: Some(sequence_number),
            ..Self::new("keep_alive")
        }
    }

    pub fn stale(sequence_number: u16, last: u16) -> Self {
        Self {
            sequence_number: Some(sequence_number),
            last_sequence_number: Some(last),
            ..Self::new("stale")
        }
    }

    pub fn metadata(metadata: &DataSetMetaData) -> Self {
        Self {
            message_type: Some("DataSetMetadata".to_string()),
            configuration_version: Some(metadata.configuration_version.to_string()),
            fields: metadata
                .fields
                .iter()
                .map(|f| FieldOutput {
                    name: f.name.clone(),
                    built_in_type: f.built_in_type.to_string(),
                    value: String::new(),
                })
                .collect(),
            ..Self::new("metadata")
        }
    }

    fn values_summary(&self) -> String {
        self.fields
            .iter()
            .map(|f| {
                if f.value.is_empty() {
                    format!("{}:{}", f.name, f.built_in_type)
                } else {
                    format!("{}={}", f.name, f.value)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn field_outputs(names: &[String], values: &[Value]) -> Vec<FieldOutput> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| FieldOutput {
            name: names.get(i).cloned().unwrap_or_else(|| format!("field{i}")),
            built_in_type: value
                .built_in_type()
                .map(|ty| ty.to_string())
                .unwrap_or_else(|| "Null".to_string()),
            value: value.to_string(),
        })
        .collect()
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}

pub fn print_message(message: &MessageOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(message).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "TYPE", "SEQ", "VERSION", "LENGTH", "FIELDS"])
                .add_row(vec![
                    message.kind.to_string(),
                    opt(&message.message_type),
                    opt(&message.sequence_number),
                    opt(&message.configuration_version),
                    opt(&message.message_length),
                    message.values_summary(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "kind={} type={} seq={} version={} fields=[{}]",
                message.kind,
                opt(&message.message_type),
                opt(&message.sequence_number),
                opt(&message.configuration_version),
                message.values_summary()
            );
        }
        OutputFormat::Raw => {
            if message.payload.is_empty() {
                for field in &message.fields {
                    println!("{}", field.value);
                }
            } else {
                print_raw(&message.payload);
            }
        }
    }
}

/// Result of a `publish` run.
#[derive(Debug, Serialize)]
pub struct PublishSummary {
    pub schema_id: &'static str,
    pub target: String,
    pub dataset_id: String,
    pub messages: u64,
    pub bytes: u64,
    pub next_sequence_number: u16,
}

impl PublishSummary {
    pub fn new(target: String, dataset_id: String) -> Self {
        Self {
            schema_id: PUBLISH_SCHEMA_ID,
            target,
            dataset_id,
            messages: 0,
            bytes: 0,
            next_sequence_number: 0,
        }
    }
}

pub fn print_summary(summary: &PublishSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TARGET", "DATASET", "MESSAGES", "BYTES", "NEXT SEQ"])
                .add_row(vec![
                    summary.target.clone(),
                    summary.dataset_id.clone(),
                    summary.messages.to_string(),
                    summary.bytes.to_string(),
                    summary.next_sequence_number.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "target={} dataset={} messages={} bytes={} next_seq={}",
                summary.target,
                summary.dataset_id,
                summary.messages,
                summary.bytes,
                summary.next_sequence_number
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
