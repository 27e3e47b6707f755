//! Publish a small DataSet to a subscriber on the same host and print what arrives.
//!
//! ```text
//! cargo run -p uadp --example loopback
//! ```

use std::net::SocketAddr;

use uadp::association::{
    DataSetMetaData, Delivery, FieldMetaData, Publisher, PublisherConfig, Subscriber,
    SubscriberConfig,
};
use uadp::frame::{BuiltInType, UaDateTime, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sub_config = SubscriberConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        read_timeout_ms: Some(1_000),
        ..SubscriberConfig::default()
    };
    let mut subscriber = Subscriber::udp(&sub_config, None);
    subscriber.attach_to_network()?;
    let port = subscriber.reader().source().local_addr()?.port();

    let metadata = DataSetMetaData::new(
        "boiler",
        vec![
            FieldMetaData::new("temperature", BuiltInType::Double),
            FieldMetaData::new("running", BuiltInType::Boolean),
            FieldMetaData::new("updated", BuiltInType::DateTime),
        ],
    );
    let pub_config = PublisherConfig {
        remote_host: "127.0.0.1".to_string(),
        remote_port: port,
        ..PublisherConfig::default()
    };
    let mut publisher = Publisher::udp(&pub_config, metadata)?;
    publisher.attach_to_network()?;
    publisher.announce()?;

    for step in 0..3 {
        publisher.publish(&[
            Value::from(20.0 + f64::from(step) * 0.5),
            Value::from(step % 2 == 0),
            Value::from(UaDateTime::now()),
        ])?;
    }
    publisher.keep_alive()?;

    for _ in 0..5 {
        match subscriber.receive()? {
            Delivery::Metadata(meta) => {
                println!("metadata {} v{}", meta.name, meta.configuration_version)
            }
            Delivery::DataSet(message) => {
                let values: Vec<String> = message.values.iter().map(Value::to_string).collect();
                println!("#{} {}", message.sequence_number, values.join(" "));
            }
            Delivery::KeepAlive { sequence_number } => println!("#{sequence_number} keep-alive"),
            other => println!("{other:?}"),
        }
    }

    Ok(())
}
