use std::{sync::Arc, thread};

use super::*;

#[test]
fn test_dispenser_next() {
    let dispenser = IdDispenser::new();
    let key = IdDispenser::topic_key("a/b");
    assert_eq!(key, "topic:a/b");

    assert_eq!(dispenser.current(&key), None);
    for i in 0..100_u16 {
        assert_eq!(dispenser.next(&key), i);
    }
    assert_eq!(dispenser.current(&key), Some(99));

    // keys are independent.
    assert_eq!(dispenser.next(SUBSCRIPTIONS_KEY), 0);
    assert_eq!(dispenser.next(SUBSCRIPTIONS_KEY), 1);
    assert_eq!(dispenser.next(&key), 100);

    dispenser.reset(&key);
    assert_eq!(dispenser.next(&key), 0);
}

#[test]
fn test_dispenser_wrap() {
    let dispenser = IdDispenser::new();
    for _ in 0..=u16::MAX {
        dispenser.next("k");
    }
    assert_eq!(dispenser.current("k"), Some(u16::MAX));
    assert_eq!(dispenser.next("k"), 0);
    assert_eq!(dispenser.next("k"), 1);
}

#[test]
fn test_dispenser_threads() {
    let dispenser = Arc::new(IdDispenser::new());

    let mut handles = vec![];
    for _ in 0..8 {
        let dispenser = Arc::clone(&dispenser);
        handles.push(thread::spawn(move || {
            (0..1000).map(|_| dispenser.next("shared")).collect::<Vec<u16>>()
        }));
    }

    let mut ids: Vec<u16> = vec![];
    for handle in handles.into_iter() {
        ids.extend(handle.join().unwrap());
    }
    ids.sort();
    assert_eq!(ids, (0..8000).collect::<Vec<u16>>());
}
