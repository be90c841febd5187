//! Time and duration formatting utilities.

use std::time::Duration;

/// Format a latency for tables: `850µs`, `123ms`, `1.24s`.
#[must_use]
pub fn format_latency(d: Duration) -> String {
    let micros = d.as_micros();
    if micros < 1_000 {
        format!("{micros}µs")
    } else if micros < 1_000_000 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}

/// Format an elapsed wall-clock span: `42s`, `3m 12s`, `2h 5m`.
#[must_use]
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Serialize a [`Duration`] as integer milliseconds.
pub mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Serialize an `Option<Duration>` as integer milliseconds or `null`.
pub mod millis_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => super::millis::serialize(d, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_units() {
        assert_eq!(format_latency(Duration::from_micros(850)), "850µs");
        assert_eq!(format_latency(Duration::from_millis(123)), "123ms");
        assert_eq!(format_latency(Duration::from_millis(1_240)), "1.24s");
    }

    #[test]
    fn elapsed_spans() {
        assert_eq!(format_elapsed(Duration::from_secs(42)), "42s");
        assert_eq!(format_elapsed(Duration::from_secs(192)), "3m 12s");
        assert_eq!(format_elapsed(Duration::from_secs(7_500)), "2h 5m");
    }

    #[test]
    fn millis_round_trip_through_json() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Row {
            #[serde(with = "millis")]
            latency: Duration,
            #[serde(with = "millis_opt")]
            p95: Option<Duration>,
        }
        let row = Row {
            latency: Duration::from_millis(12),
            p95: None,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"latency":12,"p95":null}"#);
        assert_eq!(serde_json::from_str::<Row>(&json).unwrap(), row);
    }
}
