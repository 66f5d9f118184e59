use std::sync::Mutex;
use std::{thread, time};

use super::*;
use crate::testing::MockTransport;
use crate::v3::{ConnackReturnCode, Pub, Publish, SubAck, Subscribe, UnsubAck};
use crate::{ConfigWill, I32Converter, Packetize, Utf8Converter};

fn client(builder: ClientBuilder) -> (Arc<MockTransport>, Client) {
    let transport = Arc::new(MockTransport::default());
    let client = builder.build(Arc::clone(&transport) as Arc<dyn Transport>).unwrap();
    (transport, client)
}

fn feed(client: &Client, pkt: Packet) {
    let blob = pkt.encode().unwrap();
    client.on_frame(blob.as_ref()).unwrap();
}

fn connected() -> (Arc<MockTransport>, Client) {
    let builder = ClientBuilder { client_id: "andy111".to_string(), ..ClientBuilder::default() };
    let (transport, client) = client(builder);
    client.connect().unwrap();
    feed(&client, Packet::ConnAck(ConnAck::new(ConnackReturnCode::Accepted)));
    transport.take_packets();
    (transport, client)
}

#[test]
fn test_client_connect() {
    let builder = ClientBuilder {
        client_id: "andy111".to_string(),
        keep_alive: 30,
        clean_start: true,
        ..ClientBuilder::default()
    };
    let (transport, client) = client(builder);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.publish("a", QoS::AtMostOnce, vec![]).is_err());

    client.connect().unwrap();
    assert_eq!(client.state(), ConnectionState::Connecting);
    let bytes = b"\x10\x15\x00\x06MQIsdp\x03\x02\x00\x1e\x00\x07andy111".to_vec();
    let (pkt, _) = Packet::decode(&bytes).unwrap();
    assert_eq!(transport.take_packets(), vec![pkt]);

    // connect again while connecting is refused.
    let err = client.connect().unwrap_err();
    assert_eq!(err.state(), Some(ConnectionState::Connecting));

    feed(&client, Packet::ConnAck(ConnAck::new(ConnackReturnCode::Accepted)));
    assert_eq!(client.state(), ConnectionState::Connected);

    client.disconnect().unwrap();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(transport.take_packets(), vec![Packet::Disconnect]);
}

#[test]
fn test_client_connect_refused() {
    let builder = ClientBuilder { client_id: "andy111".to_string(), ..ClientBuilder::default() };
    let (_transport, client) = client(builder);

    client.connect().unwrap();
    feed(&client, Packet::ConnAck(ConnAck::new(ConnackReturnCode::NotAuthorized)));
    assert_eq!(client.state(), ConnectionState::Faulted);

    // can retry from faulted.
    client.connect().unwrap();
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[test]
fn test_client_id_too_long() {
    let transport = Arc::new(MockTransport::default()) as Arc<dyn Transport>;
    let client_id = "a".repeat(24);
    let builder = ClientBuilder { client_id: client_id.clone(), ..ClientBuilder::default() };
    let err = builder.build(transport).map(|_| ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClientIdentifierTooLong);
    assert_eq!(err.client_id(), Some(client_id.as_str()));
    assert_eq!(err.max_len(), Some(23));
}

#[test]
fn test_client_long_client_id() {
    let client_id = "abcdefghijklmnopqrstuvwxyz0123";
    let text = format!("client_id = {:?}\nmax_client_id_len = 64", client_id);
    let config = Config::from_toml(&text).unwrap();
    let (transport, client) = client(ClientBuilder::from_config(&config).unwrap());

    client.connect().unwrap();
    assert_eq!(client.state(), ConnectionState::Connecting);
    match transport.take_packets().as_slice() {
        [Packet::Connect(connect)] => assert_eq!(connect.payload.client_id, client_id),
        pkts => panic!("unexpected {:?}", pkts),
    }
}

#[test]
fn test_client_connect_broken_transport() {
    let builder = ClientBuilder { client_id: "andy111".to_string(), ..ClientBuilder::default() };
    let (transport, client) = client(builder);

    transport.set_broken(true);
    let err = client.connect().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionError);
    assert_eq!(client.state(), ConnectionState::Faulted);

    transport.set_broken(false);
    client.connect().unwrap();
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[test]
fn test_client_keep_alive_after_idle() {
    let builder = ClientBuilder {
        client_id: "andy111".to_string(),
        keep_alive: 1,
        ..ClientBuilder::default()
    };
    let (_transport, client) = client(builder);
    thread::sleep(time::Duration::from_millis(1600));

    // idle time before CONNECT does not count against the broker.
    assert!(!client.ping_if_due().unwrap());
    client.connect().unwrap();
    assert!(!client.ping_if_due().unwrap());
    assert_eq!(client.state(), ConnectionState::Connecting);

    feed(&client, Packet::ConnAck(ConnAck::new(ConnackReturnCode::Accepted)));
    assert!(!client.ping_if_due().unwrap());
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[test]
fn test_client_from_config() {
    let config = Config {
        client_id: Some("andy111".to_string()),
        keep_alive: Some(10),
        username: Some("andy".to_string()),
        password: Some("secret".to_string()),
        will: Some(ConfigWill {
            topic: "status/andy".to_string(),
            message: "gone".to_string(),
            qos: Some(1),
            retain: Some(true),
        }),
        ..Config::default()
    };
    let (transport, client) = client(ClientBuilder::from_config(&config).unwrap());
    assert_eq!(client.client_id(), "andy111");

    client.connect().unwrap();
    match transport.take_packets().as_slice() {
        [Packet::Connect(connect)] => {
            assert_eq!(connect.keep_alive, 10);
            assert!(connect.flags.is_will_flag());
            assert!(connect.flags.is_will_retain());
            assert_eq!(connect.flags.will_qos(), QoS::AtLeastOnce);
            assert!(connect.flags.is_username());
            assert!(connect.flags.is_password());
            assert_eq!(connect.payload.will_message, Some(b"gone".to_vec()));
        }
        pkts => panic!("unexpected {:?}", pkts),
    }
}

#[test]
fn test_client_publish() {
    let (transport, client) = connected();

    let id = client.publish_with("A/Topic", QoS::ExactlyOnce, &Utf8Converter, "test".to_string());
    assert_eq!(id.unwrap(), 0);
    let id = client.publish_with("A/Topic", QoS::AtLeastOnce, &I32Converter, -2_i32);
    assert_eq!(id.unwrap(), 1);

    let mut publ = Publish::new("A/Topic", QoS::AtLeastOnce, 1, vec![0xFF, 0xFF, 0xFF, 0xFE]);
    publ.set_retain(false);
    let pkts = transport.take_packets();
    assert_eq!(pkts.len(), 2);
    assert_eq!(pkts[1], Packet::Publish(publ));

    feed(&client, Packet::PubRec(Pub::new_pubrec(0)));
    assert_eq!(transport.take_packets(), vec![Packet::PubRel(Pub::new_pubrel(0))]);
    feed(&client, Packet::PubComp(Pub::new_pubcomp(0)));
    feed(&client, Packet::PubAck(Pub::new_puback(1)));
    assert_eq!(transport.len(), 0);
}

#[test]
fn test_client_subscribe_receive() {
    let (transport, client) = connected();

    let received = Arc::new(Mutex::new(vec![]));
    let callback: MessageCallback = {
        let received = Arc::clone(&received);
        Arc::new(move |msg: &Message| {
            received.lock().unwrap().push(msg.to_utf8().unwrap());
        })
    };
    client.on_message(callback);

    assert_eq!(client.subscribe("finance/#", QoS::AtLeastOnce).unwrap(), 0);
    assert_eq!(client.subscription_status("finance/#"), SubscriptionStatus::Pending);
    assert_eq!(
        transport.take_packets(),
        vec![Packet::Subscribe(Subscribe::new(0, "finance/#", QoS::AtLeastOnce))]
    );

    // not yet active, message is not handed to the callback.
    feed(&client, Packet::Publish(Publish::new("finance/ibm", QoS::AtMostOnce, 0, b"1".to_vec())));

    let suback = SubAck { packet_id: 0, return_codes: vec![QoS::AtLeastOnce] };
    feed(&client, Packet::SubAck(suback));
    assert_eq!(client.subscription_status("finance/#"), SubscriptionStatus::Active);

    feed(&client, Packet::Publish(Publish::new("finance/ibm", QoS::AtMostOnce, 0, b"2".to_vec())));
    feed(&client, Packet::Publish(Publish::new("finance", QoS::AtLeastOnce, 5, b"3".to_vec())));
    feed(&client, Packet::Publish(Publish::new("sport/x", QoS::AtMostOnce, 0, b"4".to_vec())));
    assert_eq!(*received.lock().unwrap(), vec!["2".to_string(), "3".to_string()]);
    assert_eq!(transport.take_packets(), vec![Packet::PubAck(Pub::new_puback(5))]);

    assert_eq!(client.unsubscribe("finance/#").unwrap(), 1);
    feed(&client, Packet::UnsubAck(UnsubAck { packet_id: 1 }));
    assert_eq!(client.subscription_status("finance/#"), SubscriptionStatus::DoesNotExist);
}

#[test]
fn test_client_ping() {
    let (transport, client) = connected();
    assert!(!client.ping_if_due().unwrap());
    assert_eq!(transport.len(), 0);

    feed(&client, Packet::PingResp);
    assert_eq!(client.state(), ConnectionState::Connected);
}
