use tracing::{debug, info, warn};
use uadp_frame::{
    ConfigurationVersion, MessageHeader, MessageReader, MessageType, ReceivedMessage,
    SequenceTracker, UaDateTime, Value,
};
use uadp_transport::{AssociationState, FrameSource, UdpTransport};

use crate::config::SubscriberConfig;
use crate::error::{AssociationError, Result};
use crate::metadata::DataSetMetaData;

/// A decoded DataSet message.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetMessage {
    pub message_type: MessageType,
    pub sequence_number: u16,
    pub configuration_version: ConfigurationVersion,
    pub timestamp: UaDateTime,
    /// Values in field order.
    pub values: Vec<Value>,
}

/// Outcome of one [`Subscriber::receive`] call.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// Data decoded against the known metadata.
    DataSet(DataSetMessage),
    KeepAlive { sequence_number: u16 },
    /// Sequence number not newer than the last accepted one; payload ignored.
    Stale { sequence_number: u16, last: u16 },
    /// The producer announced its metadata, which replaced the known one.
    Metadata(DataSetMetaData),
    /// Data arrived before any metadata was known.
    Undecoded(ReceivedMessage),
}

/// Inbound association: reads messages, drops stale ones, decodes DataSets.
pub struct Subscriber<S> {
    reader: MessageReader<S>,
    tracker: SequenceTracker,
    metadata: Option<DataSetMetaData>,
}

impl Subscriber<UdpTransport> {
    /// Subscriber listening on `config.bind_addr`.
    pub fn udp(config: &SubscriberConfig, metadata: Option<DataSetMetaData>) -> Self {
        Self::new(
            UdpTransport::receiver_with_config(config.udp_config()),
            metadata,
        )
    }
}

impl<S: FrameSource> Subscriber<S> {
    pub fn new(source: S, metadata: Option<DataSetMetaData>) -> Self {
        Self {
            reader: MessageReader::new(source),
            tracker: SequenceTracker::new(),
            metadata,
        }
    }

    pub fn state(&self) -> &AssociationState {
        self.reader.state()
    }

    pub fn attach_to_network(&mut self) -> Result<()> {
        self.reader.attach_to_network()?;
        info!("subscriber attached");
        Ok(())
    }

    pub fn metadata(&self) -> Option<&DataSetMetaData> {
        self.metadata.as_ref()
    }

    /// Block until the next message and classify it.
    ///
    /// Fails with [`AssociationError::IncompatibleSchema`] when a data
    /// message's major version differs from the known metadata.
    pub fn receive(&mut self) -> Result<Delivery> {
        let message = self.reader.read_message()?;
        let header = message.header();
        let sequence_number = header.sequence_number()?;

        if !self.tracker.accept(sequence_number) {
            let last = self.tracker.last().unwrap_or(sequence_number);
            warn!(sequence_number, last, "stale message dropped");
            return Ok(Delivery::Stale {
                sequence_number,
                last,
            });
        }

        let message_type = header.message_type()?;
        match message_type {
            MessageType::KeepAlive => Ok(Delivery::KeepAlive { sequence_number }),
            MessageType::DataSetMetadata => {
                let metadata = DataSetMetaData::decode_payload(message.payload().clone())?;
                debug!(
                    dataset = %metadata.name,
                    version = %metadata.configuration_version,
                    "metadata received"
                );
                self.metadata = Some(metadata.clone());
                Ok(Delivery::Metadata(metadata))
            }
            MessageType::DataKeyFrame | MessageType::DataDeltaFrame | MessageType::Event => {
                let Some(metadata) = &self.metadata else {
                    return Ok(Delivery::Undecoded(message));
                };

                let received = header.configuration_version()?;
                if !received.is_compatible_with(metadata.configuration_version) {
                    return Err(AssociationError::IncompatibleSchema {
                        expected: metadata.configuration_version,
                        received,
                    });
                }

                let values = message.decode_leading_fields(&metadata.field_types())?;
                Ok(Delivery::DataSet(DataSetMessage {
                    message_type,
                    sequence_number,
                    configuration_version: received,
                    timestamp: header.timestamp()?,
                    values,
                }))
            }
        }
    }

    /// Forget the last sequence number, e.g. after the producer restarted.
    pub fn reset_sequence(&mut self) {
        self.tracker.reset();
    }

    pub fn reader(&self) -> &MessageReader<S> {
        &self.reader
    }
}
