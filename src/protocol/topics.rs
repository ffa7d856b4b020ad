//! Topic composition for the motion node
//!
//! The publish topic is the configured location string, normalised once at
//! startup and read-only afterwards.

use std::fmt;
use thiserror::Error;

/// System-wide "who is online" broadcast topic, subscribed on every connect
pub const WHO_TOPIC: &str = "diy/system/who";

/// Normalise a location string into topic form.
///
/// Trims whitespace around every segment, collapses repeated slashes and
/// strips leading and trailing slashes (`" /diy//main/living/ "` becomes
/// `"diy/main/living"`).
pub fn canonicalize_location(location: &str) -> String {
    location
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Publish topic derived from the node location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    /// Compose the topic from a configured location identifier
    pub fn from_location(location: &str) -> Result<Self, TopicError> {
        let topic = canonicalize_location(location);

        if topic.is_empty() {
            return Err(TopicError::EmptyLocation);
        }
        if let Some(ch) = topic.chars().find(|c| matches!(c, '+' | '#' | '\0')) {
            return Err(TopicError::InvalidChar(ch));
        }

        Ok(Self(topic))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Topic validation errors
#[derive(Debug, Error, PartialEq)]
pub enum TopicError {
    #[error("Location cannot be empty")]
    EmptyLocation,
    #[error("Location contains invalid topic character: '{0}'")]
    InvalidChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn canonicalize_location_is_idempotent(location in ".*") {
            let first = canonicalize_location(&location);
            let second = canonicalize_location(&first);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn canonicalize_location_has_no_empty_segments(location in "[a-z/ ]*") {
            let result = canonicalize_location(&location);
            prop_assert!(!result.contains("//"), "No consecutive slashes: {}", result);
            prop_assert!(!result.starts_with('/'), "No leading slash: {}", result);
            prop_assert!(!result.ends_with('/'), "No trailing slash: {}", result);
        }

        #[test]
        fn valid_locations_round_trip(location in "[a-z0-9_-]{1,12}(/[a-z0-9_-]{1,12}){0,4}") {
            let topic = Topic::from_location(&location).unwrap();
            prop_assert_eq!(topic.as_str(), location.as_str());
        }
    }

    #[test]
    fn test_location_examples() {
        assert_eq!(canonicalize_location("diy/main/living"), "diy/main/living");
        assert_eq!(canonicalize_location("/diy/main/living/"), "diy/main/living");
        assert_eq!(canonicalize_location("  diy//main///living "), "diy/main/living");
        assert_eq!(canonicalize_location("///"), "");
        assert_eq!(canonicalize_location("/ diy / main"), "diy/main");
    }

    #[test]
    fn test_topic_from_location() {
        let topic = Topic::from_location("diy/upper/guest").unwrap();
        assert_eq!(topic.as_str(), "diy/upper/guest");
        assert_eq!(topic.to_string(), "diy/upper/guest");
    }

    #[test]
    fn test_topic_rejects_empty() {
        assert_eq!(Topic::from_location(""), Err(TopicError::EmptyLocation));
        assert_eq!(Topic::from_location(" / "), Err(TopicError::EmptyLocation));
    }

    #[test]
    fn test_topic_rejects_wildcards() {
        assert_eq!(
            Topic::from_location("diy/+/living"),
            Err(TopicError::InvalidChar('+'))
        );
        assert_eq!(
            Topic::from_location("diy/main/#"),
            Err(TopicError::InvalidChar('#'))
        );
    }

    #[test]
    fn test_who_topic_is_valid_topic() {
        assert!(Topic::from_location(WHO_TOPIC).is_ok());
    }
}
