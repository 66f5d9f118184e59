use rand::{prelude::random, rngs::StdRng, Rng, SeedableRng};

use super::*;

fn filter(s: &str) -> TopicFilter {
    TopicFilter::try_from(s).unwrap()
}

fn name(s: &str) -> TopicName {
    TopicName::try_from(s).unwrap()
}

#[test]
fn test_topic_wildcards() {
    let testcases = [
        ("finance/#", "finance", true),
        ("finance/#", "finance/ibm", true),
        ("finance/#", "finance/ibm/closing", true),
        ("finance/#", "financ", false),
        ("finance/+", "finance/ibm", true),
        ("finance/+", "finance/ibm/x", false),
        ("finance/+", "finance", false),
        ("finance/+/closing", "finance/ibm/closing", true),
        ("finance/+/closing", "finance/ibm/opening", false),
        ("+/+", "/a", true),
        ("+", "a", true),
        ("+", "/a", false),
        ("#", "/a/b", true),
        ("#", "a", true),
        ("/#", "/a/b", true),
        ("a/b", "a/b/c", false),
        ("a/b/c", "a/b", false),
        ("a//b", "a//b", true),
        ("a/+/b", "a//b", true),
    ];

    for (f, n, res) in testcases.iter() {
        assert_eq!(filter(f).matches(&name(n)), *res, "{:?} {:?}", f, n);
    }
}

#[test]
fn test_topic_matches_self() {
    let seed = random();
    println!("test_topic_matches_self seed:{}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let chars = ['a', 'b', 'z', '0', '/', ' ', '$', 'é'];
    for _ in 0..1000 {
        let n = (rng.gen::<usize>() % 32) + 1;
        let topic: String = (0..n).map(|_| chars[rng.gen::<usize>() % chars.len()]).collect();

        let t = name(&topic);
        assert!(filter(&topic).matches(&t), "{:?}", topic);
        assert_eq!(t.as_fragments().join("/"), topic);
    }
}

#[test]
fn test_topic_filter_invalid() {
    let long = "a".repeat(65_536);
    let testcases = [
        "a/#/topic",
        "a/##/topic",
        "a/#+/topic",
        "a/++/topic",
        "a/frag+/topic",
        "a#",
        "a/b#",
        "#/",
        "",
        long.as_str(),
    ];

    for topic in testcases.iter() {
        let err = TopicFilter::try_from(*topic).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTopic);
        assert_eq!(err.topic(), Some(*topic));
    }

    assert!(TopicFilter::try_from("a".repeat(65_535)).is_ok());
    assert!(TopicFilter::try_from("+/a/+/#").unwrap().has_wildcards());
    assert!(!TopicFilter::try_from("a/b").unwrap().has_wildcards());
}

#[test]
fn test_topic_name_invalid() {
    for topic in ["a/+", "#", "a/b#", "+", ""].iter() {
        let err = TopicName::try_from(*topic).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTopic);
        assert_eq!(err.topic(), Some(*topic));
    }

    let err = TopicName::try_from("a".repeat(65_536)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTopic);

    let t = name("/a/b");
    assert_eq!(t.as_fragments(), &["".to_string(), "a".to_string(), "b".to_string()]);
    assert_eq!(&*t, "/a/b");
}
