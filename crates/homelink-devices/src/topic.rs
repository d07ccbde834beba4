//! Vendor message topic parsing.
//!
//! Inbound hub messages carry a topic of the form
//! `"<host_device_id>/<ACTION>"` (e.g. `"wemos-t1/SENSOR"`).

use crate::error::{DeviceError, Result};

/// A parsed topic string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTopic {
    /// Vendor-side host identifier.
    pub host_id: String,
    /// Action segment, vocabulary unvalidated at this layer.
    pub action: String,
}

/// Split a topic on its first `/`.
///
/// The action vocabulary is firmware-specific and checked later during
/// classification; here only the two-segment shape is enforced.
pub fn parse_topic(topic: &str) -> Result<ParsedTopic> {
    let (host_id, action) = topic
        .split_once('/')
        .ok_or_else(|| DeviceError::MalformedTopic(topic.to_string()))?;

    if host_id.is_empty() {
        return Err(DeviceError::MalformedTopic(topic.to_string()));
    }

    Ok(ParsedTopic {
        host_id: host_id.to_string(),
        action: action.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_separator() {
        let parsed = parse_topic("wemos-t1/RESULT").unwrap();
        assert_eq!(parsed.host_id, "wemos-t1");
        assert_eq!(parsed.action, "RESULT");
    }

    #[test]
    fn extra_separators_stay_in_action() {
        let parsed = parse_topic("t1/stat/POWER").unwrap();
        assert_eq!(parsed.host_id, "t1");
        assert_eq!(parsed.action, "stat/POWER");
    }

    #[test]
    fn unknown_action_vocabulary_is_accepted_here() {
        let parsed = parse_topic("t1/INFO1").unwrap();
        assert_eq!(parsed.action, "INFO1");
    }

    #[test]
    fn missing_separator_is_malformed() {
        assert!(matches!(
            parse_topic("d1"),
            Err(DeviceError::MalformedTopic(_))
        ));
    }

    #[test]
    fn empty_host_is_malformed() {
        assert!(matches!(
            parse_topic("/RESULT"),
            Err(DeviceError::MalformedTopic(_))
        ));
    }
}
