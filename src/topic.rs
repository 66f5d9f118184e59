//! Topic model, publication topics and subscription topics.
//!
//! A topic is split into `/` delimited fragments once, at construction time.
//! [TopicName] is used for publishing and cannot carry wildcards. [TopicFilter]
//! is used for subscribing and may carry `+`, matching exactly one fragment,
//! and `#`, matching the parent and every fragment under it.

use std::{fmt, ops::Deref};

use crate::{Error, ErrorDetail, ErrorKind, Result, MAX_TOPIC_LEN};

const SEP: char = '/';
const SINGLE: &str = "+";
const MULTI: &str = "#";

/// Publication topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicName {
    topic: String,
    fragments: Vec<String>,
}

impl Deref for TopicName {
    type Target = str;

    fn deref(&self) -> &str {
        self.topic.as_str()
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.topic)
    }
}

impl TryFrom<&str> for TopicName {
    type Error = Error;

    fn try_from(val: &str) -> Result<TopicName> {
        validate_common(val)?;
        if val.contains(|c: char| c == '+' || c == '#') {
            invalid_topic(val, "publication topic has wildcards")?;
        }

        Ok(TopicName { topic: val.to_string(), fragments: to_fragments(val) })
    }
}

impl TryFrom<String> for TopicName {
    type Error = Error;

    fn try_from(val: String) -> Result<TopicName> {
        TopicName::try_from(val.as_str())
    }
}

impl TopicName {
    pub fn as_fragments(&self) -> &[String] {
        &self.fragments
    }
}

/// Subscription topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicFilter {
    topic: String,
    fragments: Vec<String>,
}

impl Deref for TopicFilter {
    type Target = str;

    fn deref(&self) -> &str {
        self.topic.as_str()
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.topic)
    }
}

impl TryFrom<&str> for TopicFilter {
    type Error = Error;

    fn try_from(val: &str) -> Result<TopicFilter> {
        validate_common(val)?;

        let fragments = to_fragments(val);
        let last = fragments.len() - 1;
        for (i, frag) in fragments.iter().enumerate() {
            match frag.as_str() {
                MULTI if i != last => invalid_topic(val, "`#` must be the last fragment")?,
                MULTI | SINGLE => (),
                frag if frag.contains(|c: char| c == '+' || c == '#') => {
                    invalid_topic(val, "wildcard must occupy the entire fragment")?
                }
                _ => (),
            }
        }

        Ok(TopicFilter { topic: val.to_string(), fragments })
    }
}

impl TryFrom<String> for TopicFilter {
    type Error = Error;

    fn try_from(val: String) -> Result<TopicFilter> {
        TopicFilter::try_from(val.as_str())
    }
}

impl TopicFilter {
    pub fn as_fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn has_wildcards(&self) -> bool {
        self.fragments.iter().any(|f| f == SINGLE || f == MULTI)
    }

    /// Return whether publication `topic` matches this subscription.
    pub fn matches(&self, topic: &TopicName) -> bool {
        if self.topic == MULTI || self.topic == topic.topic {
            return true;
        }
        match_fragments(&self.fragments, &topic.fragments)
    }
}

fn match_fragments(filter: &[String], name: &[String]) -> bool {
    for (i, frag) in filter.iter().enumerate() {
        match frag.as_str() {
            // also matches the parent, "a/#" matches "a".
            MULTI => return true,
            SINGLE if i >= name.len() => return false,
            SINGLE => (),
            frag => match name.get(i) {
                Some(val) if val == frag => (),
                _ => return false,
            },
        }
    }

    filter.len() == name.len()
}

fn to_fragments(topic: &str) -> Vec<String> {
    topic.split(SEP).map(|f| f.to_string()).collect()
}

fn validate_common(topic: &str) -> Result<()> {
    if topic.is_empty() {
        invalid_topic(topic, "empty topic")
    } else if topic.len() > MAX_TOPIC_LEN {
        invalid_topic(topic, "topic too long")
    } else {
        Ok(())
    }
}

fn invalid_topic(topic: &str, reason: &str) -> Result<()> {
    let detail = ErrorDetail::Topic(topic.to_string());
    let topic = topic.chars().take(64).collect::<String>();
    err!(InvalidTopic, detail: detail, "{} {:?}", reason, topic)
}

#[cfg(test)]
#[path = "topic_test.rs"]
mod topic_test;
