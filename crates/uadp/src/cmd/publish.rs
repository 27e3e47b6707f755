use std::thread;

use tracing::{debug, info};
use uadp_association::{DataSetMetaData, FieldMetaData, Publisher, PublisherConfig};
use uadp_frame::{BuiltInType, Value};

use crate::cmd::{parse_duration, PublishArgs};
use crate::exit::{association_error, CliError, CliResult, SUCCESS};
use crate::output::{print_summary, OutputFormat, PublishSummary};

pub fn run(args: PublishArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let mut config = match &args.config {
        Some(path) => {
            PublisherConfig::load(path).map_err(|err| association_error("config", err))?
        }
        None => PublisherConfig::default(),
    };
    if let Some(host) = &args.host {
        config.remote_host = host.clone();
    }
    if let Some(port) = args.port {
        config.remote_port = port;
    }

    let (fields, values) = parse_values(&args.values)?;
    let metadata = DataSetMetaData::new(args.name.clone(), fields);
    let mut summary = PublishSummary::new(
        format!("{}:{}", config.remote_host, config.remote_port),
        metadata.dataset_id.to_string(),
    );

    let mut publisher =
        Publisher::udp(&config, metadata).map_err(|err| association_error("setup failed", err))?;
    publisher
        .attach_to_network()
        .map_err(|err| association_error("attach failed", err))?;

    if args.announce {
        publisher
            .announce()
            .map_err(|err| association_error("announce failed", err))?;
    }

    for i in 0..args.count {
        if i > 0 && !interval.is_zero() {
            thread::sleep(interval);
        }
        publisher
            .publish(&values)
            .map_err(|err| association_error("publish failed", err))?;
        debug!(sent = i + 1, of = args.count, "published");
    }

    if args.keep_alive {
        publisher
            .keep_alive()
            .map_err(|err| association_error("keep-alive failed", err))?;
    }

    let stats = publisher.writer().transport().stats();
    summary.messages = stats.sent_messages;
    summary.bytes = stats.sent_bytes;
    summary.next_sequence_number = publisher
        .next_sequence_number()
        .map_err(|err| association_error("publish failed", err))?;
    info!(
        remote = %summary.target,
        messages = summary.messages,
        bytes = summary.bytes,
        "publish complete"
    );

    print_summary(&summary, format);
    Ok(SUCCESS)
}

/// Turn `TYPE:LITERAL` arguments into field metadata and values.
fn parse_values(raw: &[String]) -> CliResult<(Vec<FieldMetaData>, Vec<Value>)> {
    let mut fields = Vec::with_capacity(raw.len());
    let mut values = Vec::with_capacity(raw.len());

    for (i, arg) in raw.iter().enumerate() {
        let (type_name, literal) = arg
            .split_once(':')
            .ok_or_else(|| CliError::usage(format!("--value `{arg}` must be TYPE:LITERAL")))?;
        let ty = BuiltInType::from_name(type_name)
            .ok_or_else(|| CliError::usage(format!("unknown built-in type `{type_name}`")))?;
        let value =
            Value::parse(ty, literal).map_err(|err| CliError::usage(err.to_string()))?;

        fields.push(FieldMetaData::new(format!("field{i}"), ty));
        values.push(value);
    }

    Ok((fields, values))
}
