// ── Aggregate statistics ──

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::person::Person;

/// Totals for one person, either overall or within one tournament.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub shots: i64,
    pub sweeps: i64,
    pub kills: i64,
    #[serde(rename = "self")]
    pub self_kills: i64,
    pub matches: i64,
    pub rounds: i64,
    pub score: i64,
    /// Serialized as whole microseconds, the unit the server counts in.
    #[serde(with = "micros")]
    pub playtime: Duration,
    pub wins: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<Person>,
    pub total: PlayerSnapshot,
    pub rank: i64,
    /// Tournament id -> totals within that tournament.
    pub tournaments: BTreeMap<String, PlayerSnapshot>,
}

impl PersonStats {
    /// Number of tournaments this person has played in.
    pub fn participated(&self) -> usize {
        self.tournaments.len()
    }
}

/// Person id -> statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stats(pub BTreeMap<String, PersonStats>);

impl Stats {
    pub fn get(&self, person_id: &str) -> Option<&PersonStats> {
        self.0.get(person_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries ordered by rank (best first), then person id.
    pub fn ranked(&self) -> Vec<(&str, &PersonStats)> {
        let mut entries: Vec<(&str, &PersonStats)> =
            self.0.iter().map(|(id, s)| (id.as_str(), s)).collect();
        entries.sort_by(|a, b| a.1.rank.cmp(&b.1.rank).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

/// Microsecond counts, clamped at zero.
pub(crate) fn playtime_from_micros(raw: i64) -> Duration {
    Duration::from_micros(u64::try_from(raw).unwrap_or_default())
}

mod micros {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(super::playtime_from_micros(i64::deserialize(deserializer)?))
    }
}
