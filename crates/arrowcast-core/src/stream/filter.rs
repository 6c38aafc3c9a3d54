// ── Filter predicates for replica snapshots ──
//
// Used by list views to narrow a snapshot without another fetch.

use chrono::{DateTime, Utc};

use crate::model::Tournament;

/// Filter predicate for tournament lists.
pub enum TournamentFilter {
    All,
    Upcoming,
    Running,
    Ended,
    /// Ended within the last few hours.
    Recent,
    /// Tournaments not carrying the production name prefix.
    Test(String),
    Custom(Box<dyn Fn(&Tournament) -> bool + Send + Sync>),
}

impl TournamentFilter {
    pub fn matches(&self, tournament: &Tournament, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Upcoming => tournament.is_upcoming(now),
            Self::Running => tournament.is_running(),
            Self::Ended => tournament.is_ended(),
            Self::Recent => tournament.ended_recently(now),
            Self::Test(prefix) => tournament.is_test(prefix),
            Self::Custom(f) => f(tournament),
        }
    }

    /// Apply the filter to a list, keeping order.
    pub fn apply<'a>(
        &self,
        tournaments: impl IntoIterator<Item = &'a Tournament>,
        now: DateTime<Utc>,
    ) -> Vec<&'a Tournament> {
        tournaments
            .into_iter()
            .filter(|t| self.matches(t, now))
            .collect()
    }
}
