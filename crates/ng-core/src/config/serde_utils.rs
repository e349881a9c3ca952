//! Shared serialization/deserialization utilities for configuration
//!
//! Durations are written as plain integers so the TOML stays readable:
//! `timeout = 30` rather than a nested table.

/// Serialize an optional `Duration` as whole seconds
///
/// # Example
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Config {
///     #[serde(default, with = "ng_core::config::serde_utils::option_duration_secs")]
///     timeout: Option<Duration>,
/// }
/// ```
pub mod option_duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize as seconds (u64); `None` is skipped by the caller
    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_u64(d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize from seconds (u64)
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

/// Serialize a `Duration` as milliseconds (u64)
pub mod duration_millis {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestConfig {
        #[serde(with = "duration_millis")]
        delay: Duration,
        #[serde(
            default,
            with = "option_duration_secs",
            skip_serializing_if = "Option::is_none"
        )]
        timeout: Option<Duration>,
    }

    #[test]
    fn test_duration_millis_serialize() {
        let config = TestConfig {
            delay: Duration::from_millis(50),
            timeout: None,
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(text.trim(), "delay = 50");
    }

    #[test]
    fn test_option_duration_secs_deserialize() {
        let config: TestConfig = toml::from_str("delay = 250\ntimeout = 30").unwrap();
        assert_eq!(config.delay, Duration::from_millis(250));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_timeout_defaults_to_none() {
        let config: TestConfig = toml::from_str("delay = 1").unwrap();
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_roundtrip() {
        let original = TestConfig {
            delay: Duration::from_millis(1500),
            timeout: Some(Duration::from_secs(3600)),
        };
        let text = toml::to_string(&original).unwrap();
        let parsed: TestConfig = toml::from_str(&text).unwrap();
        assert_eq!(original, parsed);
    }
}
