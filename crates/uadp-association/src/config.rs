use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uadp_frame::{EncodingFlags, FieldEncoding, MessageLengthFieldType, WriterConfig};
use uadp_transport::{UdpConfig, UDP_MAX_DATAGRAM};

use crate::error::{AssociationError, Result};
use crate::serde_types::{FieldEncodingDef, MessageLengthFieldTypeDef};

/// Default UADP port.
pub const DEFAULT_PORT: u16 = 4840;

/// Settings of an outbound association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherConfig {
    /// Host name or address of the subscriber.
    pub remote_host: String,
    pub remote_port: u16,
    /// Local address to send from. Port 0 picks an ephemeral port.
    pub bind_addr: SocketAddr,
    /// Width of the header's message-length field. Default: `two_bytes`.
    #[serde(with = "MessageLengthFieldTypeDef")]
    pub length_field: MessageLengthFieldType,
    /// Default: `variant`.
    #[serde(with = "FieldEncodingDef")]
    pub field_encoding: FieldEncoding,
    /// Stamp each data message with the current time. Default: true.
    pub stamp_time: bool,
    /// Upper bound on fields per message. Default: 65 535.
    pub max_items: u64,
    pub write_timeout_ms: Option<u64>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            remote_host: "127.0.0.1".to_string(),
            remote_port: DEFAULT_PORT,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            length_field: MessageLengthFieldType::TwoBytes,
            field_encoding: FieldEncoding::Variant,
            stamp_time: true,
            max_items: u64::from(u16::MAX),
            write_timeout_ms: None,
        }
    }
}

impl PublisherConfig {
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            flags: EncodingFlags::new(self.length_field, self.field_encoding),
            stamp_time: self.stamp_time,
        }
    }

    pub fn udp_config(&self) -> UdpConfig {
        UdpConfig {
            bind_addr: self.bind_addr,
            write_timeout: millis(self.write_timeout_ms),
            ..UdpConfig::default()
        }
    }

    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }
}

/// Settings of an inbound association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubscriberConfig {
    /// Address to listen on. Default: `0.0.0.0:4840`.
    pub bind_addr: SocketAddr,
    /// `None` or 0 blocks until a message arrives.
    pub read_timeout_ms: Option<u64>,
    /// Largest datagram accepted.
    pub max_datagram: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            read_timeout_ms: None,
            max_datagram: UDP_MAX_DATAGRAM,
        }
    }
}

impl SubscriberConfig {
    pub fn udp_config(&self) -> UdpConfig {
        UdpConfig {
            bind_addr: self.bind_addr,
            read_timeout: millis(self.read_timeout_ms),
            max_datagram: self.max_datagram,
            ..UdpConfig::default()
        }
    }

    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }
}

/// Socket timeouts reject a zero duration; 0 means none.
fn millis(ms: Option<u64>) -> Option<Duration> {
    ms.filter(|ms| *ms > 0).map(Duration::from_millis)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| AssociationError::Config {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config: PublisherConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PublisherConfig::default());
        let config: SubscriberConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SubscriberConfig::default());
    }

    #[test]
    fn publisher_overrides_map_to_writer_and_udp() {
        let config: PublisherConfig = serde_json::from_str(
            r#"{
                "remote_host": "10.0.0.9",
                "length_field": "four_bytes",
                "field_encoding": "raw_data",
                "stamp_time": false,
                "write_timeout_ms": 250
            }"#,
        )
        .unwrap();

        let writer = config.writer_config();
        assert_eq!(writer.flags.length_type, MessageLengthFieldType::FourBytes);
        assert_eq!(writer.flags.field_encoding, FieldEncoding::RawData);
        assert!(!writer.stamp_time);
        assert_eq!(
            config.udp_config().write_timeout,
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.remote_port, DEFAULT_PORT);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(serde_json::from_str::<SubscriberConfig>(r#"{"bind":"x"}"#).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SubscriberConfig::load("/nonexistent/uadp.json").unwrap_err();
        assert!(matches!(err, AssociationError::Config { .. }));
        assert!(err.to_string().contains("/nonexistent/uadp.json"));
    }

    #[test]
    fn subscriber_udp_config() {
        let config = SubscriberConfig {
            read_timeout_ms: Some(5),
            max_datagram: 1500,
            ..SubscriberConfig::default()
        };
        let udp = config.udp_config();
        assert_eq!(udp.read_timeout, Some(Duration::from_millis(5)));
        assert_eq!(udp.max_datagram, 1500);
        assert_eq!(udp.bind_addr.port(), DEFAULT_PORT);
    }
}
