//! Human-readable duration (de)serialization for config structs, e.g.
//! `timeout = "30s"` in TOML instead of a raw millisecond integer.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

pub fn deserialize_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Duration, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Millis(u64),
        Human(String),
    }
    match Repr::deserialize(deserializer)? {
        Repr::Millis(ms) => Ok(Duration::from_millis(ms)),
        Repr::Human(s) => humantime::parse_duration(&s).map_err(serde::de::Error::custom),
    }
}

pub fn serialize_duration<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(
            deserialize_with = "deserialize_duration",
            serialize_with = "serialize_duration"
        )]
        timeout: Duration,
    }

    #[test]
    fn accepts_human_and_millis() {
        let human: Wrapper = serde_json::from_str(r#"{"timeout":"30s"}"#).unwrap();
        assert_eq!(human.timeout, Duration::from_secs(30));
        let millis: Wrapper = serde_json::from_str(r#"{"timeout":1500}"#).unwrap();
        assert_eq!(millis.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn round_trips_through_human_format() {
        let w = Wrapper {
            timeout: Duration::from_secs(60),
        };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("1m"));
    }
}
