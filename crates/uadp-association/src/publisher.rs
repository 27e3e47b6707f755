use tracing::{debug, info};
use uadp_frame::{
    BinaryMessageWriter, Binding, MessageHeader, MessageType, MessageWriter, Value,
};
use uadp_transport::{AssociationState, FrameSink, UdpTransport};

use crate::config::PublisherConfig;
use crate::error::{AssociationError, Result};
use crate::metadata::DataSetMetaData;

/// Outbound association: publishes one DataSet through a message writer.
#[derive(Debug)]
pub struct Publisher<T> {
    writer: BinaryMessageWriter<T>,
    metadata: DataSetMetaData,
    max_items: u64,
}

impl Publisher<UdpTransport> {
    /// Publisher sending to `config.remote_host:remote_port` over UDP.
    pub fn udp(config: &PublisherConfig, metadata: DataSetMetaData) -> Result<Self> {
        let transport = UdpTransport::sender_with_config(
            config.remote_host.clone(),
            config.remote_port,
            config.udp_config(),
        );
        Self::new(transport, metadata, config)
    }
}

impl<T: FrameSink> Publisher<T> {
    pub fn new(transport: T, metadata: DataSetMetaData, config: &PublisherConfig) -> Result<Self> {
        let mut writer = BinaryMessageWriter::with_config(transport, config.writer_config());
        writer
            .header_mut()
            .set_configuration_version(metadata.configuration_version)?;
        Ok(Self {
            writer,
            metadata,
            max_items: config.max_items,
        })
    }

    pub fn state(&self) -> &AssociationState {
        self.writer.state()
    }

    pub fn attach_to_network(&mut self) -> Result<()> {
        self.writer.attach_to_network()?;
        info!(
            dataset = %self.metadata.name,
            version = %self.metadata.configuration_version,
            "publisher attached"
        );
        Ok(())
    }

    pub fn metadata(&self) -> &DataSetMetaData {
        &self.metadata
    }

    /// Replace the DataSet layout. Subsequent messages carry its version.
    pub fn update_metadata(&mut self, metadata: DataSetMetaData) -> Result<()> {
        self.writer
            .header_mut()
            .set_configuration_version(metadata.configuration_version)?;
        self.metadata = metadata;
        Ok(())
    }

    /// Send one key frame with `values` in field order.
    ///
    /// Each value must match the declared type of its field.
    pub fn publish(&mut self, values: &[Value]) -> Result<()> {
        let fields = &self.metadata.fields;
        if values.len() != fields.len() {
            return Err(AssociationError::FieldCountMismatch {
                expected: fields.len(),
                actual: values.len(),
            });
        }

        self.writer
            .header_mut()
            .set_message_type(MessageType::DataKeyFrame)?;
        self.writer.send(
            |i| Binding::new(fields[i].built_in_type, values[i].clone()),
            values.len(),
            self.max_items,
            self.metadata.id(),
        )?;
        debug!(dataset = %self.metadata.name, fields = values.len(), "dataset published");
        Ok(())
    }

    /// Send a keep-alive message.
    pub fn keep_alive(&mut self) -> Result<()> {
        self.writer.send_keep_alive()?;
        Ok(())
    }

    /// Send the DataSet metadata so subscribers can decode without prior knowledge.
    pub fn announce(&mut self) -> Result<()> {
        let payload = self.metadata.encode_payload()?;
        self.writer
            .send_opaque(MessageType::DataSetMetadata, &payload, self.metadata.id())?;
        debug!(dataset = %self.metadata.name, "metadata announced");
        Ok(())
    }

    /// Sequence number of the next message.
    pub fn next_sequence_number(&self) -> Result<u16> {
        Ok(self.writer.header().sequence_number()?)
    }

    pub fn writer(&self) -> &BinaryMessageWriter<T> {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut BinaryMessageWriter<T> {
        &mut self.writer
    }
}
