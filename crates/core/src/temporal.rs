//! The single decoding boundary for temporal fields.
//!
//! Historical documents carry instants in three shapes: RFC 3339 strings, epoch milliseconds,
//! and `{ "seconds": .., "nanoseconds": .. }` timestamp objects (also seen with leading
//! underscores). Every temporal field in the data model is declared with
//! `#[serde(with = "crate::temporal")]` (or `crate::temporal::option`), so the coercion happens
//! exactly once, here, and everything above this module works with `DateTime<Utc>`.
//!
//! Instants are always written back as RFC 3339 with millisecond precision.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Text(String),
    Millis(i64),
    Timestamp {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
}

fn parse_text(input: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(format!("unrecognised timestamp '{}'", input))
}

fn normalise(raw: RawInstant) -> Result<DateTime<Utc>, String> {
    match raw {
        RawInstant::Text(text) => parse_text(&text),
        RawInstant::Millis(ms) => DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| format!("epoch milliseconds out of range: {}", ms)),
        RawInstant::Timestamp {
            seconds,
            nanoseconds,
        } => DateTime::from_timestamp(seconds, nanoseconds)
            .ok_or_else(|| format!("timestamp out of range: {}s {}ns", seconds, nanoseconds)),
    }
}

/// The canonical stored form of an instant.
pub(crate) fn encode(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&encode(value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawInstant::deserialize(deserializer)?;
    normalise(raw).map_err(serde::de::Error::custom)
}

/// Same as the parent module, for optional fields. `null` and absent both decode to `None`.
pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => super::serialize(dt, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawInstant>::deserialize(deserializer)?;
        raw.map(normalise)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
