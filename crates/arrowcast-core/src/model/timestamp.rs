// ── Canonical timestamps ──
//
// The server encodes "not yet happened" as the zero instant
// `0001-01-01T00:00:00Z` rather than null. Both that sentinel and any
// absent or malformed value collapse into `Timestamp::Unset` here, so the
// lifecycle predicates never compare raw fields against "now".

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The wire representation of an unset instant.
pub const UNSET_SENTINEL: &str = "0001-01-01T00:00:00Z";

/// An instant that may be unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timestamp {
    #[default]
    Unset,
    At(DateTime<Utc>),
}

impl Timestamp {
    /// Normalize a raw wire value. Absent, malformed and sentinel inputs
    /// are all `Unset`.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Unset;
        };
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(dt) => {
                let utc = dt.with_timezone(&Utc);
                if utc == sentinel() { Self::Unset } else { Self::At(utc) }
            }
            Err(_) => Self::Unset,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::At(_))
    }

    pub fn is_unset(&self) -> bool {
        !self.is_set()
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(dt) => Some(*dt),
            Self::Unset => None,
        }
    }
}

/// `true` for the sentinel, absent input, or anything that is not an
/// RFC 3339 instant.
pub fn is_unset(raw: Option<&str>) -> bool {
    Timestamp::parse(raw).is_unset()
}

fn sentinel() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        if dt == sentinel() { Self::Unset } else { Self::At(dt) }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str(UNSET_SENTINEL),
            Self::At(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(Self::parse(value.as_ref().and_then(serde_json::Value::as_str)))
    }
}
