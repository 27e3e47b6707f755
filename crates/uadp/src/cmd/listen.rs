use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::warn;
use uadp_association::{AssociationError, Delivery, Subscriber, SubscriberConfig};
use uadp_frame::FrameError;
use uadp_transport::TransportError;

use crate::cmd::{load_metadata, parse_duration, ListenArgs};
use crate::exit::{association_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_message, MessageOutput, OutputFormat};

/// Poll interval for the stop flag while no datagram arrives.
const POLL_INTERVAL_MS: u64 = 200;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = match &args.config {
        Some(path) => {
            SubscriberConfig::load(path).map_err(|err| association_error("config", err))?
        }
        None => SubscriberConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if config.read_timeout_ms.is_none() {
        config.read_timeout_ms = Some(POLL_INTERVAL_MS);
    }
    let idle_timeout = args.idle_timeout.as_deref().map(parse_duration).transpose()?;
    let metadata = args.metadata.as_deref().map(load_metadata).transpose()?;

    let mut subscriber = Subscriber::udp(&config, metadata);
    subscriber
        .attach_to_network()
        .map_err(|err| association_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    let mut last_activity = Instant::now();

    while running.load(Ordering::SeqCst) {
        let delivery = match subscriber.receive() {
            Ok(delivery) => delivery,
            Err(err) if is_timeout(&err) => {
                if idle_timeout.is_some_and(|limit| last_activity.elapsed() >= limit) {
                    return Err(CliError::new(TIMEOUT, "no message received before idle timeout"));
                }
                continue;
            }
            Err(err @ AssociationError::IncompatibleSchema { .. }) => {
                warn!(error = %err, "message skipped");
                last_activity = Instant::now();
                continue;
            }
            Err(AssociationError::Frame(err)) if is_malformed(&err) => {
                warn!(error = %err, "malformed message skipped");
                last_activity = Instant::now();
                continue;
            }
            Err(err) => return Err(association_error("receive failed", err)),
        };
        last_activity = Instant::now();

        let output = match &delivery {
            Delivery::DataSet(message) => MessageOutput::dataset(message, subscriber.metadata()),
            Delivery::KeepAlive { sequence_number } => MessageOutput::keep_alive(*sequence_number),
            Delivery::Stale {
                sequence_number,
                last,
            } => MessageOutput::stale(*sequence_number, *last),
            Delivery::Metadata(metadata) => MessageOutput::metadata(metadata),
            Delivery::Undecoded(message) => MessageOutput::from_received("undecoded", message),
        };
        print_message(&output, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

fn is_timeout(err: &AssociationError) -> bool {
    let transport = match err {
        AssociationError::Transport(err) | AssociationError::Frame(FrameError::Transport(err)) => {
            err
        }
        _ => return false,
    };
    match transport {
        TransportError::Receive(err) => matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ),
        _ => false,
    }
}

/// Decode failures of a single datagram. The listener keeps going after these.
fn is_malformed(err: &FrameError) -> bool {
    !matches!(err, FrameError::Transport(_) | FrameError::InvalidState(_))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
