use arbitrary::Unstructured;
use rand::{prelude::random, rngs::StdRng, Rng, SeedableRng};

use super::*;

fn connect_bytes() -> Vec<u8> {
    let mut bytes = vec![0x10, 0x15, 0x00, 0x06];
    bytes.extend_from_slice(b"MQIsdp");
    bytes.extend_from_slice(&[0x03, 0x02, 0x00, 0x1E, 0x00, 0x07]);
    bytes.extend_from_slice(b"andy111");
    bytes
}

#[test]
fn test_fixed_header_round_trip() {
    let seed = random();
    println!("test_fixed_header_round_trip seed:{}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..10_000 {
        let bytes = rng.gen::<[u8; 32]>();
        let mut uns = Unstructured::new(&bytes);
        let fh: FixedHeader = uns.arbitrary().unwrap();

        let blob = fh.encode().unwrap();
        let (out, n) = FixedHeader::decode(blob.as_ref()).unwrap();
        assert_eq!(out, fh);
        assert_eq!(n, blob.as_ref().len());
        assert_eq!(n, fh.len().unwrap());
        out.validate().unwrap();
    }
}

#[test]
fn test_fixed_header_byte1() {
    let fh = FixedHeader::new_publish(true, QoS::AtLeastOnce, true, VarU32(10)).unwrap();
    assert_eq!(fh.encode().unwrap().as_ref(), &[0x3B, 0x0A]);

    let fh = FixedHeader::new_pubrel(VarU32(2)).unwrap();
    assert_eq!(fh.encode().unwrap().as_ref(), &[0x62, 0x02]);

    let fh = FixedHeader::new_subscribe(VarU32(128)).unwrap();
    assert_eq!(fh.encode().unwrap().as_ref(), &[0x82, 0x80, 0x01]);

    let fh = FixedHeader::new_unsubscribe(VarU32(5)).unwrap();
    assert_eq!(fh.encode().unwrap().as_ref(), &[0xA2, 0x05]);

    let fh = FixedHeader::new(PacketType::PingReq, VarU32(0)).unwrap();
    assert_eq!(fh.encode().unwrap().as_ref(), &[0xC0, 0x00]);

    let err = FixedHeader::new(PacketType::Publish, VarU32(268_435_456)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayloadSize);
}

#[test]
fn test_fixed_header_invalid() {
    for bytes in [[0x00_u8, 0x00], [0xF0, 0x00], [0x0F, 0x02]] {
        let err = FixedHeader::decode(bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeader, "{:?}", bytes);
        let err = Packet::decode(bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeader, "{:?}", bytes);
    }

    let err = FixedHeader::decode([0x10_u8]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHeader);
    let err = FixedHeader::decode([0x30_u8, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHeader);

    // SUBSCRIBE must carry QoS-1, CONNACK carries no flags.
    let err = Packet::decode([0x80_u8, 0x00]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPacket);
    let err = Packet::decode([0x21_u8, 0x02, 0x00, 0x00]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPacket);
}

#[test]
fn test_connect_decode() {
    let bytes = connect_bytes();

    let (fh, n) = FixedHeader::decode(&bytes).unwrap();
    assert_eq!(n, 2);
    assert_eq!(fh.packet_type, PacketType::Connect);
    assert_eq!(fh.duplicate, false);
    assert_eq!(fh.retain, false);
    assert_eq!(fh.qos, QoS::AtMostOnce);
    assert_eq!(*fh.remaining_len, 21);

    let (pkt, n) = Connect::decode(&bytes).unwrap();
    assert_eq!(n, bytes.len());
    assert_eq!(pkt.protocol_name, "MQIsdp");
    assert_eq!(pkt.protocol_version, 3);
    assert_eq!(pkt.keep_alive, 30);
    assert!(pkt.flags.is_clean_start());
    assert!(!pkt.flags.is_will_flag());
    assert_eq!(pkt.payload.client_id, "andy111");
    assert_eq!(pkt.payload.will_topic, None);

    let payload = ConnectPayload::new("andy111", crate::MAX_CLIENT_ID_LEN).unwrap();
    let connect = Connect::new(payload, 30, true);
    assert_eq!(connect, pkt);
    assert_eq!(connect.encode().unwrap().as_ref(), bytes.as_slice());
}

#[test]
fn test_connect_flags() {
    let payload = ConnectPayload::new("client", 23)
        .unwrap()
        .with_will("last/will".to_string(), b"gone".to_vec())
        .with_credentials("user".to_string(), Some("secret".to_string()));
    let mut connect = Connect::new(payload, 60, false);
    connect.set_will_options(QoS::ExactlyOnce, true);

    let flags = connect.flags;
    assert_eq!(*flags, 0b_1111_0100);
    assert!(flags.is_will_flag() && flags.is_will_retain());
    assert!(flags.is_username() && flags.is_password());
    assert!(!flags.is_clean_start() && !flags.is_reserved());
    assert_eq!(flags.will_qos(), QoS::ExactlyOnce);

    let blob = connect.encode().unwrap();
    let (out, n) = Connect::decode(blob.as_ref()).unwrap();
    assert_eq!(out, connect);
    assert_eq!(n, blob.as_ref().len());

    // reserved bit survives a decode/encode.
    let mut bytes = connect_bytes();
    bytes[11] |= 0x01;
    let (pkt, _) = Connect::decode(&bytes).unwrap();
    assert!(pkt.flags.is_reserved());
    assert_eq!(pkt.encode().unwrap().as_ref(), bytes.as_slice());
}

#[test]
fn test_connect_client_id_too_long() {
    let client_id = "012345678901234567890123";
    let err = ConnectPayload::new(client_id, 23).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClientIdentifierTooLong);
    assert_eq!(err.client_id(), Some(client_id));
    assert_eq!(err.max_len(), Some(23));

    // outbound CONNECT honours the caller's limit.
    let payload = ConnectPayload::new(client_id, 24).unwrap();
    let connect = Connect::new(payload, 30, true);
    let blob = connect.encode().unwrap();
    assert_eq!(blob.as_ref()[1], 0x26);
    assert_eq!(ConnectPayload::new("", 23).unwrap_err().kind(), ErrorKind::InvalidInput);

    let mut bytes = vec![0x10, 0x26, 0x00, 0x06];
    bytes.extend_from_slice(b"MQIsdp");
    bytes.extend_from_slice(&[0x03, 0x02, 0x00, 0x1E, 0x00, 0x18]);
    bytes.extend_from_slice(client_id.as_bytes());
    let err = Connect::decode(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClientIdentifierTooLong);
}

#[test]
fn test_connack() {
    let (pkt, n) = Packet::decode([0x20_u8, 0x02, 0x00, 0x00]).unwrap();
    assert_eq!(n, 4);
    assert_eq!(pkt, Packet::ConnAck(ConnAck::new(ConnackReturnCode::Accepted)));

    let (pkt, _) = ConnAck::decode([0x20_u8, 0x02, 0x00, 0x05]).unwrap();
    assert_eq!(pkt.return_code, ConnackReturnCode::NotAuthorized);
    assert!(!pkt.is_accepted());

    let err = ConnAck::decode([0x20_u8, 0x02, 0x00, 0x06]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPacket);

    let err = ConnAck::decode([0x20_u8, 0x03, 0x00, 0x00, 0x00]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPacket);
}

#[test]
fn test_publish() {
    let publ = Publish::new("a/b", QoS::AtMostOnce, 10, b"hi".to_vec());
    assert_eq!(publ.packet_id, None);
    let bytes = [0x30_u8, 0x07, 0x00, 0x03, b'a', b'/', b'b', b'h', b'i'];
    assert_eq!(publ.encode().unwrap().as_ref(), &bytes);

    let publ = Publish::new("a/b", QoS::ExactlyOnce, 10, b"hi".to_vec());
    let bytes = [0x34_u8, 0x09, 0x00, 0x03, b'a', b'/', b'b', 0x00, 0x0A, b'h', b'i'];
    assert_eq!(publ.encode().unwrap().as_ref(), &bytes);

    // payload takes the rest of the frame, not the rest of the stream.
    let mut stream = bytes.to_vec();
    stream.extend_from_slice(&[0xC0, 0x00]);
    let (out, n) = Publish::decode(&stream).unwrap();
    assert_eq!(n, bytes.len());
    assert_eq!(out, publ);

    // empty payload
    let (out, n) = Publish::decode([0x30_u8, 0x03, 0x00, 0x01, b'x']).unwrap();
    assert_eq!(n, 5);
    assert!(out.payload.is_empty());
}

#[test]
fn test_publish_invalid() {
    // declared length overshoots available bytes.
    let err = Publish::decode([0x30_u8, 0x09, 0x00, 0x03, b'a', b'/', b'b']).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayloadSize);

    // topic length overshoots the frame.
    let err = Publish::decode([0x30_u8, 0x03, 0x00, 0x05, b'a', b'b', b'c']).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayloadSize);

    // QoS 3
    let err = Packet::decode([0x36_u8, 0x05, 0x00, 0x01, b'a', 0x00, 0x01]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPacket);

    let mut publ = Publish::new("a", QoS::AtLeastOnce, 1, vec![]);
    publ.packet_id = None;
    assert_eq!(publ.encode().unwrap_err().kind(), ErrorKind::MalformedPacket);
}

#[test]
fn test_pub_family() {
    let testcases = [
        (Pub::new_puback(7), [0x40_u8, 0x02, 0x00, 0x07]),
        (Pub::new_pubrec(7), [0x50, 0x02, 0x00, 0x07]),
        (Pub::new_pubrel(7), [0x62, 0x02, 0x00, 0x07]),
        (Pub::new_pubcomp(7), [0x70, 0x02, 0x00, 0x07]),
    ];
    for (pkt, bytes) in testcases.into_iter() {
        assert_eq!(pkt.encode().unwrap().as_ref(), &bytes);
        assert_eq!(Pub::decode(bytes).unwrap(), (pkt, 4));
    }

    let err = Pub::decode([0x40_u8, 0x03, 0x00, 0x07, 0x00]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPacket);
    let err = Pub::decode([0x40_u8, 0x02, 0x00]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayloadSize);
}

#[test]
fn test_subscribe_family() {
    let sub = Subscribe::new(1, "a/b", QoS::AtLeastOnce);
    let bytes = [0x82_u8, 0x08, 0x00, 0x01, 0x00, 0x03, b'a', b'/', b'b', 0x01];
    assert_eq!(sub.encode().unwrap().as_ref(), &bytes);
    assert_eq!(Subscribe::decode(bytes).unwrap(), (sub, bytes.len()));

    let (pkt, n) = Packet::decode([0x90_u8, 0x04, 0x00, 0x05, 0x01, 0x02]).unwrap();
    assert_eq!(n, 6);
    let suback = SubAck {
        packet_id: 5,
        return_codes: vec![QoS::AtLeastOnce, QoS::ExactlyOnce],
    };
    assert_eq!(pkt, Packet::SubAck(suback));

    let err = SubAck::decode([0x90_u8, 0x02, 0x00, 0x05]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPacket);

    let unsub = UnSubscribe::new(2, "a/b");
    let bytes = [0xA2_u8, 0x07, 0x00, 0x02, 0x00, 0x03, b'a', b'/', b'b'];
    assert_eq!(unsub.encode().unwrap().as_ref(), &bytes);
    assert_eq!(UnSubscribe::decode(bytes).unwrap(), (unsub, bytes.len()));

    let (pkt, _) = Packet::decode([0xB0_u8, 0x02, 0x00, 0x02]).unwrap();
    assert_eq!(pkt, Packet::UnsubAck(UnsubAck { packet_id: 2 }));
    assert_eq!(pkt.to_packet_id(), Some(2));
}

#[test]
fn test_header_only() {
    for (pkt, byte1) in [
        (Packet::PingReq, 0xC0_u8),
        (Packet::PingResp, 0xD0),
        (Packet::Disconnect, 0xE0),
    ] {
        assert_eq!(pkt.encode().unwrap().as_ref(), &[byte1, 0x00]);
        assert_eq!(Packet::decode([byte1, 0x00]).unwrap(), (pkt.clone(), 2));
        assert_eq!(pkt.to_packet_id(), None);

        let err = Packet::decode([byte1, 0x01, 0x00]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPacket);
    }
}

#[test]
fn test_packet_round_trip() {
    let seed = random();
    println!("test_packet_round_trip seed:{}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..10_000 {
        let bytes: Vec<u8> = (0..1024).map(|_| rng.gen::<u8>()).collect();
        let mut uns = Unstructured::new(&bytes);
        let pkt: Packet = uns.arbitrary().unwrap();

        let blob = pkt.encode().unwrap();
        let (out, n) = Packet::decode(blob.as_ref()).unwrap();
        assert_eq!(out, pkt, "{}", pkt);
        assert_eq!(n, blob.as_ref().len());
        assert_eq!(out.to_packet_type(), pkt.to_packet_type());

        let (fh, _) = FixedHeader::decode(blob.as_ref()).unwrap();
        assert_eq!(fh.frame_len().unwrap(), n);
    }
}
