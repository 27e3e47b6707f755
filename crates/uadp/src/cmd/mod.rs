use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use uadp_association::DataSetMetaData;

use crate::exit::{association_error, io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod listen;
pub mod publish;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish DataSet messages to a subscriber.
    Publish(PublishArgs),
    /// Listen on a UDP port and print received messages.
    Listen(ListenArgs),
    /// Decode one hex-encoded message.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Publish(args) => publish::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Subscriber host. Overrides the config file.
    #[arg(long)]
    pub host: Option<String>,
    /// Subscriber port. Overrides the config file.
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
    /// Publisher config file (JSON).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Field value as TYPE:LITERAL (e.g. Int32:42, String:hello). Repeatable.
    #[arg(long = "value", short = 'v', value_name = "TYPE:LITERAL", required = true)]
    pub values: Vec<String>,
    /// DataSet name announced with --announce.
    #[arg(long, default_value = "cli")]
    pub name: String,
    /// Number of data messages to send.
    #[arg(long, short = 'n', default_value = "1")]
    pub count: u64,
    /// Delay between messages (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Send the DataSet metadata before the first data message.
    #[arg(long)]
    pub announce: bool,
    /// Send a keep-alive after the last data message.
    #[arg(long)]
    pub keep_alive: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Local address to bind. Overrides the config file.
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<std::net::SocketAddr>,
    /// Subscriber config file (JSON).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// DataSet metadata file (JSON) used to decode data messages.
    #[arg(long, value_name = "PATH")]
    pub metadata: Option<PathBuf>,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up after this long without any message (e.g. 10s).
    #[arg(long)]
    pub idle_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Message bytes as hex.
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read the raw message from a file instead.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
    /// Field types to decode the payload with (comma-separated).
    #[arg(long, value_delimiter = ',', conflicts_with = "metadata")]
    pub types: Option<Vec<String>>,
    /// DataSet metadata file (JSON) to decode the payload with.
    #[arg(long, value_name = "PATH")]
    pub metadata: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

pub(crate) fn load_metadata(path: &std::path::Path) -> CliResult<DataSetMetaData> {
    let json = std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    DataSetMetaData::from_json(&json).map_err(|err| association_error("invalid metadata", err))
}
