//! Identifier implementations.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Canonical record identifier (32 lowercase hex characters, no hyphens).
///
/// Ward and patient documents are keyed by a `RecordId` allocated by the document store when
/// the document is first inserted. Once constructed, the contained UUID is always rendered in
/// canonical form, so the same id maps to the same storage path everywhere.
///
/// # Construction
/// - [`RecordId::new`] generates a fresh identifier (store-side allocation).
/// - [`RecordId::parse`] validates an externally supplied identifier (API path, CLI argument).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// This does **not** normalise hyphenated or uppercase UUIDs.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not canonical.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if Self::is_canonical(input) {
            let uuid = Uuid::parse_str(input)
                .map_err(|e| UuidError::InvalidInput(format!("'{}': {}", input, e)))?;
            return Ok(Self(uuid));
        }
        Err(UuidError::InvalidInput(format!(
            "record id must be 32 lowercase hex characters without hyphens, got: '{}'",
            input
        )))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// Purely syntactic: exactly 32 bytes, all of them `0-9` or `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>.<extension>`.
    ///
    /// `s1` is the first two hex characters of the id, `s2` the next two.
    pub fn sharded_file(&self, parent_dir: &Path, extension: &str) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir
            .join(s1)
            .join(s2)
            .join(format!("{}.{}", canonical, extension))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A time-prefixed unique identifier for embedded sub-records.
///
/// Format:
/// `YYYYMMDDTHHMMSS.mmmZ-<canonical_uuid>`
///
/// Example:
/// `20260111T143522.045Z-550e8400e29b41d4a716446655440000`
///
/// The UUID half makes the id globally unique regardless of which client generated it; the
/// timestamp half keeps ids readable and ordered.
///
/// # Monotonicity
///
/// When [`TimestampUuid::generate`] is given the previous id of the same collection, the new
/// timestamp is strictly greater (bumped by 1 ms if the clock has not moved on).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimestampUuid {
    timestamp: DateTime<Utc>,
    uuid: RecordId,
}

impl TimestampUuid {
    /// Returns the timestamp component.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the UUID component.
    pub fn uuid(&self) -> &RecordId {
        &self.uuid
    }

    /// Generate a new id, strictly later than `last_uid` when one is given.
    ///
    /// The timestamp is truncated to milliseconds, the precision of the text form, so the
    /// ordering survives a round trip through storage.
    pub fn generate(last_uid: Option<&TimestampUuid>) -> Self {
        let now = Utc::now().trunc_subsecs(3);

        let timestamp = match last_uid {
            Some(prev) if now <= prev.timestamp => prev.timestamp + Duration::milliseconds(1),
            _ => now,
        };

        Self {
            timestamp,
            uuid: RecordId::new(),
        }
    }
}

impl FromStr for TimestampUuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ts_str, uuid_str) = s.split_once('-').ok_or_else(|| {
            UuidError::InvalidInput(format!("Invalid timestamp UID format: '{}'", s))
        })?;

        let ts_no_z = ts_str.strip_suffix('Z').ok_or_else(|| {
            UuidError::InvalidInput(format!("Timestamp must end with 'Z': '{}'", ts_str))
        })?;

        let naive =
            chrono::NaiveDateTime::parse_from_str(ts_no_z, "%Y%m%dT%H%M%S%.3f").map_err(|e| {
                UuidError::InvalidInput(format!("Invalid timestamp format '{}': {}", ts_str, e))
            })?;

        let timestamp = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
        let uuid = RecordId::parse(uuid_str)?;

        Ok(Self { timestamp, uuid })
    }
}

impl fmt::Display for TimestampUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.timestamp.format("%Y%m%dT%H%M%S%.3fZ"),
            self.uuid
        )
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TimestampUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TimestampUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TimestampUuid::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = RecordId::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(RecordId::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_id() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let id = RecordId::parse(canonical).expect("canonical id should parse");

        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_hyphenated_id() {
        let result = RecordId::parse("550e8400-e29b-41d4-a716-446655440000");

        match result {
            Err(UuidError::InvalidInput(msg)) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_is_canonical_invalid() {
        assert!(!RecordId::is_canonical("550E8400E29B41D4A716446655440000"));
        assert!(!RecordId::is_canonical("550e8400e29b41d4a71644665544000"));
        assert!(!RecordId::is_canonical("550e8400e29b41d4a7164466554400000"));
        assert!(!RecordId::is_canonical("550e8400e29b41d4a716446655440zzz"));
        assert!(!RecordId::is_canonical(""));
    }

    #[test]
    fn test_sharded_file_structure() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let sharded = id.sharded_file(Path::new("/data/wards"), "json");

        assert_eq!(
            sharded,
            PathBuf::from("/data/wards/55/0e/550e8400e29b41d4a716446655440000.json")
        );
    }

    #[test]
    fn test_record_id_serde_uses_canonical_string() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let err = serde_json::from_str::<RecordId>("\"not-an-id\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_timestamp_uid_generate_monotonic_same_instant() {
        let uid1 = TimestampUuid::generate(None);
        let uid2 = TimestampUuid::generate(Some(&uid1));

        assert!(uid2.timestamp() > uid1.timestamp());
        assert_ne!(uid1.uuid(), uid2.uuid());
    }

    #[test]
    fn test_timestamp_uid_generate_after_future_previous() {
        let prev = TimestampUuid::from_str("29990101T000000.000Z-550e8400e29b41d4a716446655440000")
            .unwrap();
        let next = TimestampUuid::generate(Some(&prev));

        assert!(next.to_string().starts_with("29990101T000000.001Z-"));
    }

    #[test]
    fn test_timestamp_uid_parse_valid() {
        let valid = "20260111T143522.045Z-550e8400e29b41d4a716446655440000";
        let uid = TimestampUuid::from_str(valid).expect("should parse");

        assert_eq!(uid.uuid().to_string(), "550e8400e29b41d4a716446655440000");
        assert_eq!(uid.to_string(), valid);
    }

    #[test]
    fn test_timestamp_uid_parse_missing_z_suffix() {
        let invalid = "20260111T143522.045-550e8400e29b41d4a716446655440000";

        match TimestampUuid::from_str(invalid) {
            Err(UuidError::InvalidInput(msg)) => assert!(msg.contains("must end with 'Z'")),
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_timestamp_uid_parse_invalid_timestamp() {
        let invalid = "20260199T143522.045Z-550e8400e29b41d4a716446655440000";

        match TimestampUuid::from_str(invalid) {
            Err(UuidError::InvalidInput(msg)) => assert!(msg.contains("Invalid timestamp format")),
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_timestamp_uid_serde_round_trips_through_display_form() {
        let raw = "\"20260111T143522.045Z-550e8400e29b41d4a716446655440000\"";
        let uid: TimestampUuid = serde_json::from_str(raw).unwrap();

        assert_eq!(serde_json::to_string(&uid).unwrap(), raw);
    }
}
