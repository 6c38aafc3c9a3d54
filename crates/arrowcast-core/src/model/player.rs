// ── Players ──
//
// A person's participation in one match, the live per-slot state pushed
// while a round is being played, and tournament-wide summaries.

use serde::{Deserialize, Serialize};

use super::person::Person;

/// Live in-round state of one player slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Player slot within the match, when the server sends it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub arrows: Vec<i64>,
    pub shield: bool,
    pub wings: bool,
    pub hat: bool,
    pub invisible: bool,
    pub speed: bool,
    pub alive: bool,
    pub lava: bool,
    pub killer: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub person: Person,
    pub nick: String,
    pub color: String,
    pub preferred_color: String,
    pub archer_type: i64,
    pub shots: i64,
    pub sweeps: i64,
    pub kills: i64,
    #[serde(rename = "self")]
    pub self_kills: i64,
    pub match_score: i64,
    pub total_score: i64,
    pub state: PlayerState,
}

impl Player {
    pub fn avatar(&self) -> String {
        self.person.avatar()
    }

    pub fn display_name(&self) -> &str {
        self.person.display_name()
    }

    pub fn first_name(&self) -> &str {
        self.person.first_name()
    }

    pub fn person_id(&self) -> &str {
        &self.person.id
    }
}

/// Tournament-wide totals for one person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub person_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<Person>,
    pub shots: i64,
    pub sweeps: i64,
    pub kills: i64,
    #[serde(rename = "self")]
    pub self_kills: i64,
    pub matches: i64,
    pub score: i64,
    pub skill_score: i64,
}
