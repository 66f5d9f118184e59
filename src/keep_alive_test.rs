use std::time::{Duration, Instant};

use super::*;

#[test]
fn test_keep_alive_ping_due() {
    let mut ka = KeepAlive::new("test", 10);
    assert_eq!(ka.interval(), Some(Duration::from_secs(10)));

    let now = Instant::now();
    assert!(!ka.is_ping_due(now));
    assert!(ka.is_ping_due(now + Duration::from_secs(11)));

    // sending anything pushes the ping out.
    std::thread::sleep(Duration::from_millis(10));
    let before = Instant::now();
    ka.sent();
    assert!(!ka.is_ping_due(before + Duration::from_secs(10) - Duration::from_millis(5)));
}

#[test]
fn test_keep_alive_expired() {
    let mut ka = KeepAlive::new("test", 10);
    let now = Instant::now();
    assert!(ka.expired(now + Duration::from_secs(14), ConnectionState::Connected).is_ok());

    let err = ka.expired(now + Duration::from_secs(16), ConnectionState::Connected).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionError);
    assert_eq!(err.state(), Some(ConnectionState::Connected));

    ka.received();
    assert!(ka.expired(Instant::now(), ConnectionState::Connected).is_ok());
}

#[test]
fn test_keep_alive_disabled() {
    let ka = KeepAlive::new("test", 0);
    let later = Instant::now() + Duration::from_secs(100_000);
    assert_eq!(ka.interval(), None);
    assert!(!ka.is_ping_due(later));
    assert!(ka.expired(later, ConnectionState::Connected).is_ok());
}

#[test]
fn test_keep_alive_reset() {
    let mut ka = KeepAlive::new("test", 1);
    let start = Instant::now();
    std::thread::sleep(Duration::from_millis(20));

    ka.reset();
    // both timers restart from the reset, not from construction.
    let at = start + Duration::from_millis(1510);
    assert!(ka.expired(at, ConnectionState::Connected).is_ok());
    assert!(!ka.is_ping_due(start + Duration::from_millis(1005)));
}
