// ── Raw wire records ──
//
// Loosely-typed shapes of everything the server sends, over HTTP and over
// the push channel. Every field is optional or defaulted: the server omits
// zero values, emits `null` for empty slices, and the clients never agree
// on which timestamp encoding they get. `arrowcast-core` turns these into
// canonical domain types.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Lenient field helpers ────────────────────────────────────────────

/// Accept any JSON value, keeping it only if it is a string.
///
/// Timestamps arrive as RFC 3339 strings, as `null`, or occasionally as
/// garbage; everything that is not a string decodes to `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Accept an identifier sent either as a string slug or a numeric id.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept a list that may be sent as `null`.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ── People ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPerson {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub color_preference: Vec<String>,
    #[serde(default)]
    pub archer_type: Option<i64>,
    #[serde(default)]
    pub facebook_id: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub userlevel: Option<i64>,
    #[serde(default)]
    pub disabled: Option<bool>,
    /// Present (with any value) when the record describes a signed-in session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Value>,
    #[serde(default)]
    pub authenticated: Option<bool>,
}

// ── Players ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlayerState {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub arrows: Vec<i64>,
    #[serde(default)]
    pub shield: bool,
    #[serde(default)]
    pub wings: bool,
    #[serde(default)]
    pub hat: bool,
    #[serde(default)]
    pub invisible: bool,
    #[serde(default)]
    pub speed: bool,
    #[serde(default)]
    pub alive: bool,
    #[serde(default)]
    pub lava: bool,
    #[serde(default)]
    pub killer: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlayer {
    #[serde(default)]
    pub person: Option<RawPerson>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub person_id: Option<String>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub preferred_color: Option<String>,
    #[serde(default)]
    pub archer_type: i64,
    #[serde(default)]
    pub shots: i64,
    #[serde(default)]
    pub sweeps: i64,
    #[serde(default)]
    pub kills: i64,
    #[serde(default, rename = "self")]
    pub self_kills: i64,
    #[serde(default)]
    pub match_score: i64,
    #[serde(default)]
    pub total_score: i64,
    #[serde(default)]
    pub state: Option<RawPlayerState>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlayerSummary {
    #[serde(default, deserialize_with = "lenient_id")]
    pub person_id: Option<String>,
    #[serde(default)]
    pub person: Option<RawPerson>,
    #[serde(default)]
    pub shots: i64,
    #[serde(default)]
    pub sweeps: i64,
    #[serde(default)]
    pub kills: i64,
    #[serde(default, rename = "self")]
    pub self_kills: i64,
    #[serde(default)]
    pub matches: i64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub skill_score: i64,
}

// ── Matches ──────────────────────────────────────────────────────────

/// One committed round: per-player `[kills, self_kills]` plus shot flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCommit {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub kills: Vec<Vec<i64>>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub shots: Vec<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub committed: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub items: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMatch {
    /// Owning tournament id, when the server includes the back-reference.
    #[serde(default, deserialize_with = "lenient_id")]
    pub tournament: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scheduled: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub started: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ended: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub players: Vec<RawPlayer>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub commits: Vec<RawCommit>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub events: Vec<Option<RawEvent>>,
    #[serde(default)]
    pub level: Option<String>,
}

// ── Tournaments ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTournament {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub dbid: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub opened: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scheduled: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub started: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub qualifying_end: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ended: Option<String>,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub final_length: Option<u32>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub matches: Vec<RawMatch>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub players: Vec<RawPlayerSummary>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub casters: Vec<RawPerson>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub runnerups: Vec<RawPerson>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub events: Vec<Option<RawEvent>>,
}

/// The tournament collection as served by `/api/tournaments/`: either a
/// map keyed by id or a plain list, depending on the server revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTournamentCollection {
    Map(BTreeMap<String, RawTournament>),
    List(Vec<RawTournament>),
}

impl Default for RawTournamentCollection {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl RawTournamentCollection {
    pub fn into_vec(self) -> Vec<RawTournament> {
        match self {
            Self::Map(map) => map.into_values().collect(),
            Self::List(list) => list,
        }
    }
}

// ── Stats & credits ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlayerSnapshot {
    #[serde(default)]
    pub shots: i64,
    #[serde(default)]
    pub sweeps: i64,
    #[serde(default)]
    pub kills: i64,
    #[serde(default, rename = "self")]
    pub self_kills: i64,
    #[serde(default)]
    pub matches: i64,
    #[serde(default)]
    pub rounds: i64,
    #[serde(default)]
    pub score: i64,
    /// Raw playtime count in microseconds.
    #[serde(default)]
    pub playtime: i64,
    #[serde(default)]
    pub wins: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPersonStats {
    #[serde(default)]
    pub person: Option<RawPerson>,
    #[serde(default)]
    pub total: Option<RawPlayerSnapshot>,
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub tournaments: Option<BTreeMap<String, RawPlayerSnapshot>>,
}

/// Complete stats payload: person id -> per-person stats.
pub type RawStats = BTreeMap<String, RawPersonStats>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCredits {
    #[serde(default)]
    pub executive: Option<RawPerson>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub producers: Vec<RawPerson>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub players: Vec<RawPerson>,
    #[serde(default)]
    pub archers_harmed: i64,
}

// ── HTTP payloads ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TournamentList {
    #[serde(default)]
    pub tournaments: RawTournamentCollection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeopleList {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub people: Vec<RawPerson>,
}

// ── Push-channel envelope and payloads ───────────────────────────────

/// Tagged update message delivered over the push channel.
///
/// `version` is an optional monotonic stamp; servers that do not send it
/// get in-order application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub version: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TournamentPush {
    #[serde(default, deserialize_with = "lenient_id")]
    pub tournament_id: Option<String>,
    pub tournament: RawTournament,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerStatePush {
    #[serde(default, deserialize_with = "lenient_id")]
    pub tournament: Option<String>,
    #[serde(rename = "match")]
    pub match_index: usize,
    /// Slot within the match; older servers only send `state.index`.
    #[serde(default)]
    pub player: Option<usize>,
    pub state: RawPlayerState,
}

impl PlayerStatePush {
    /// The player slot this update addresses, if the payload names one.
    pub fn slot(&self) -> Option<usize> {
        self.player.or(self.state.index)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerSummariesPush {
    #[serde(default, deserialize_with = "lenient_id")]
    pub tournament_id: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub player_summaries: Vec<RawPlayerSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerupsPush {
    #[serde(default, deserialize_with = "lenient_id")]
    pub tournament_id: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub runnerups: Vec<RawPlayerSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchPush {
    #[serde(default, deserialize_with = "lenient_id")]
    pub tournament: Option<String>,
    #[serde(rename = "match", alias = "state")]
    pub match_record: RawMatch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchesPush {
    #[serde(default, deserialize_with = "lenient_id")]
    pub tournament_id: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub matches: Vec<RawMatch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchEndPush {
    #[serde(default, deserialize_with = "lenient_id")]
    pub tournament_id: Option<String>,
    pub tournament: RawTournament,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub matches: Vec<RawMatch>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub player_summaries: Vec<RawPlayerSummary>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub runnerups: Vec<RawPlayerSummary>,
}

/// Everything a client needs to follow one tournament from scratch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitialPayload {
    pub tournament: RawTournament,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub matches: Vec<RawMatch>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub player_summaries: Vec<RawPlayerSummary>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub runnerups: Vec<RawPlayerSummary>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub player_states: Vec<RawPlayerState>,
}
