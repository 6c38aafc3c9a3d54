// ── Identity types ──
//
// Tournaments are addressed by their slug. Matches have no identity of
// their own beyond their position, so they are referenced by
// `(tournament, index)` and resolved through a lookup, never by pointer.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tournament slug, e.g. `"drunkenfall-2026-03"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TournamentId(String);

impl TournamentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TournamentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TournamentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for TournamentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for TournamentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Stable reference to a match: relation + lookup.
///
/// Unlike a bare list position this survives the owning tournament being
/// replaced, as long as the match at that index still exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRef {
    pub tournament: TournamentId,
    pub index: usize,
}

impl fmt::Display for MatchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tournament, self.index)
    }
}
