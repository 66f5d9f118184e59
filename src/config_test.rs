use std::{env, fs};

use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.keep_alive(), 60);
    assert!(config.clean_start());
    assert_eq!(config.max_client_id_len(), 23);
    assert!(config.will.is_none());

    let (a, b) = (config.client_id(), config.client_id());
    assert_ne!(a, b);
    assert_eq!(a.len(), 23);
    assert!(a.starts_with("mqv3-"));
}

#[test]
fn test_config_toml() {
    let text = r#"
        client_id = "andy111"
        keep_alive = 30
        clean_start = false
        username = "andy"

        [will]
        topic = "status/andy"
        message = "gone"
        qos = 1
    "#;
    let config = Config::from_toml(text).unwrap();
    assert_eq!(config.client_id(), "andy111");
    assert_eq!(config.keep_alive(), 30);
    assert!(!config.clean_start());
    assert_eq!(config.max_client_id_len(), 23);
    assert_eq!(config.username.as_deref(), Some("andy"));
    assert_eq!(config.password, None);

    let will = config.will.unwrap();
    assert_eq!(will.topic, "status/andy");
    assert_eq!(will.message, "gone");
    assert_eq!(will.qos().unwrap(), QoS::AtLeastOnce);
    assert!(!will.retain());

    // empty document takes every default.
    let config = Config::from_toml("").unwrap();
    assert_eq!(config.keep_alive(), Config::DEF_KEEP_ALIVE);
    assert!(config.client_id.is_none());
}

#[test]
fn test_config_will_qos() {
    for (qos, ok) in [(0_u8, true), (2, true), (3, false), (4, false)] {
        let will = ConfigWill {
            topic: "a".to_string(),
            message: "b".to_string(),
            qos: Some(qos),
            retain: Some(true),
        };
        assert_eq!(will.qos().is_ok(), ok, "qos {}", qos);
    }
}

#[test]
fn test_config_file() {
    let loc = env::temp_dir().join(format!("mqv3-config-{}.toml", std::process::id()));
    fs::write(&loc, "keep_alive = 5\nmax_client_id_len = 10\n").unwrap();
    let config = Config::from_file(&loc).unwrap();
    fs::remove_file(&loc).ok();
    assert_eq!(config.keep_alive(), 5);
    assert_eq!(config.client_id().len(), 10);

    let err = Config::from_file(&loc).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IOError);

    let err = Config::from_toml("keep_alive = \"x\"").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailConvert);
}
