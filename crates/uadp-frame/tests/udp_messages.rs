use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use uadp_frame::{
    BinaryMessageWriter, Binding, BuiltInType, DataSetId, MessageHeader, MessageReader,
    MessageType, MessageWriter, SequenceTracker, Value,
};
use uadp_transport::{HandlerState, UdpConfig, UdpTransport};

fn loopback_reader() -> MessageReader<UdpTransport> {
    let mut reader = MessageReader::new(UdpTransport::receiver_with_config(UdpConfig {
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        read_timeout: Some(Duration::from_secs(2)),
        ..UdpConfig::default()
    }));
    reader.attach_to_network().unwrap();
    reader
}

#[test]
fn values_cross_a_udp_socket() {
    let mut reader = loopback_reader();
    let port = reader.source().local_addr().unwrap().port();

    let mut writer = BinaryMessageWriter::new(UdpTransport::sender("127.0.0.1", port));
    assert_eq!(writer.state().state(), HandlerState::Disabled);
    writer.attach_to_network().unwrap();
    assert_eq!(writer.state().state(), HandlerState::Operational);

    let bindings = vec![
        Binding::new(BuiltInType::Boolean, true),
        Binding::new(BuiltInType::UInt32, 4_000_000_000u32),
        Binding::new(BuiltInType::String, "pump-7"),
        Binding::new(BuiltInType::ByteString, vec![0xDEu8, 0xAD]),
    ];
    writer
        .send(|i| &bindings[i], bindings.len(), 32, DataSetId::new_v4())
        .unwrap();

    let message = reader.read_message().unwrap();
    let types: Vec<_> = bindings.iter().map(|b| b.encoding).collect();
    let values = message.decode_fields(&types).unwrap();
    let expected: Vec<Value> = bindings.into_iter().map(|b| b.value).collect();
    assert_eq!(values, expected);

    let sender_stats = writer.transport().stats();
    assert_eq!(sender_stats.attach_count, 1);
    assert_eq!(sender_stats.sent_messages, 1);
    assert_eq!(
        sender_stats.sent_bytes,
        u64::from(message.header().message_length().unwrap())
    );
}

#[test]
fn receiver_orders_by_sequence_number() {
    let mut reader = loopback_reader();
    let port = reader.source().local_addr().unwrap().port();
    let mut writer = BinaryMessageWriter::new(UdpTransport::sender("127.0.0.1", port));
    writer.attach_to_network().unwrap();
    writer.header_mut().set_sequence_number(u16::MAX).unwrap();

    let binding = Binding::new(BuiltInType::Int64, -1i64);
    writer.send(|_| &binding, 1, 1, DataSetId::nil()).unwrap();
    writer.send_keep_alive().unwrap();

    let mut tracker = SequenceTracker::new();
    let first = reader.read_message().unwrap();
    assert_eq!(first.message_type().unwrap(), MessageType::DataKeyFrame);
    assert!(tracker.accept(first.header().sequence_number().unwrap()));

    let second = reader.read_message().unwrap();
    assert_eq!(second.message_type().unwrap(), MessageType::KeepAlive);
    assert_eq!(second.header().sequence_number().unwrap(), 0);
    assert!(tracker.accept(second.header().sequence_number().unwrap()));

    // A replay of the first frame is stale.
    assert!(!tracker.accept(first.header().sequence_number().unwrap()));
}
