use std::fs;

use bytes::Bytes;
use uadp_association::DataSetMetaData;
use uadp_frame::{BuiltInType, MessageType, ReceivedMessage};

use crate::cmd::{load_metadata, DecodeArgs};
use crate::exit::{association_error, frame_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{print_message, MessageOutput, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = read_input(&args)?;
    let message = ReceivedMessage::parse(Bytes::from(raw))
        .map_err(|err| frame_error("invalid message", err))?;
    let message_type = message
        .message_type()
        .map_err(|err| frame_error("invalid message", err))?;

    let (names, types) = field_layout(&args)?;
    let mut output = MessageOutput::from_received("message", &message);
    if !types.is_empty() && message_type.has_trailer() {
        let values = message
            .decode_fields(&types)
            .map_err(|err| frame_error("payload decode failed", err))?;
        output = output.with_values(&names, &values);
    } else if message_type == MessageType::DataSetMetadata {
        let metadata = DataSetMetaData::decode_payload(message.payload().clone())
            .map_err(|err| association_error("metadata decode failed", err))?;
        output = MessageOutput::metadata(&metadata);
    }

    print_message(&output, format);
    Ok(SUCCESS)
}

fn read_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    let text = args.hex.as_deref().unwrap_or_default();
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|err| CliError::usage(format!("input is not valid hex: {err}")))
}

/// Field names and types from `--types` or `--metadata`. Empty when neither is given.
fn field_layout(args: &DecodeArgs) -> CliResult<(Vec<String>, Vec<BuiltInType>)> {
    if let Some(path) = &args.metadata {
        let metadata = load_metadata(path)?;
        let names = metadata.fields.iter().map(|f| f.name.clone()).collect();
        return Ok((names, metadata.field_types()));
    }

    let Some(type_names) = &args.types else {
        return Ok((Vec::new(), Vec::new()));
    };
    let types = type_names
        .iter()
        .map(|name| {
            BuiltInType::from_name(name.trim())
                .ok_or_else(|| CliError::usage(format!("unknown built-in type `{name}`")))
        })
        .collect::<CliResult<Vec<_>>>()?;
    let names = (0..types.len()).map(|i| format!("field{i}")).collect();
    Ok((names, types))
}
