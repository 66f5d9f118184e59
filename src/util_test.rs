use super::*;

#[test]
fn test_advance() {
    let stream = [1_u8, 2, 3];
    assert_eq!(advance(&stream, 0).unwrap(), &[1, 2, 3]);
    assert_eq!(advance(&stream, 2).unwrap(), &[3]);
    assert!(advance(&stream, 3).unwrap().is_empty());

    let err = advance(&stream, 4).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayloadSize);
}

#[test]
fn test_frame_len() {
    let stream = [0x30_u8, 0x03, 0x00, 0x01, b'a'];
    assert_eq!(frame_len(2, 3, &stream).unwrap(), 5);

    let err = frame_len(2, 4, &stream).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayloadSize);
}

#[test]
fn test_to_hex() {
    assert_eq!(to_hex(&[0x10, 0x0a, 0xff]), "10 0a ff");
    assert_eq!(to_hex(&[]), "");
}
