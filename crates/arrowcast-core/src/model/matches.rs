// ── Matches ──
//
// One game within a tournament. Lifecycle predicates are computed from
// the canonical timestamps on every call; nothing here caches.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::event::Event;
use super::ids::{MatchRef, TournamentId};
use super::player::Player;
use super::timestamp::Timestamp;

/// Kills needed to end a regular match.
pub const MATCH_LENGTH: u32 = 10;
/// Kills needed to end the final.
pub const FINAL_LENGTH: u32 = 20;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchKind {
    Tryout,
    Semi,
    Playoff,
    Final,
    Special,
}

/// One committed round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Per player slot: `[kills, self_kills]` scored this round.
    pub kills: Vec<[i64; 2]>,
    pub shots: Vec<bool>,
    pub committed: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Owning tournament. A relation, resolved through the replica.
    pub tournament: TournamentId,
    pub index: usize,
    pub kind: MatchKind,
    pub length: u32,
    pub scheduled: Timestamp,
    pub started: Timestamp,
    pub ended: Timestamp,
    pub players: Vec<Player>,
    pub commits: Vec<Commit>,
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl Match {
    pub fn reference(&self) -> MatchRef {
        MatchRef {
            tournament: self.tournament.clone(),
            index: self.index,
        }
    }

    /// Kills needed to end this match.
    pub fn end_score(&self) -> u32 {
        match self.kind {
            MatchKind::Tryout | MatchKind::Semi => MATCH_LENGTH,
            MatchKind::Final => FINAL_LENGTH,
            MatchKind::Playoff | MatchKind::Special => self.length,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled.is_set()
    }

    /// Ended matches always count as started, even if the server never
    /// recorded a start time.
    pub fn is_started(&self) -> bool {
        self.started.is_set() || self.ended.is_set()
    }

    pub fn is_ended(&self) -> bool {
        self.ended.is_set()
    }

    pub fn is_running(&self) -> bool {
        self.is_started() && !self.is_ended()
    }

    pub fn can_start(&self) -> bool {
        !self.is_started()
    }

    pub fn can_end(&self) -> bool {
        if self.is_ended() {
            return false;
        }
        let end = i64::from(self.end_score());
        self.players.iter().any(|p| p.kills >= end)
    }

    pub fn title(&self) -> String {
        match self.kind {
            MatchKind::Final => "Final".into(),
            MatchKind::Special => "Special".into(),
            kind => capitalize(&kind.to_string()),
        }
    }

    /// 1-based number of the round being played.
    pub fn round(&self) -> usize {
        self.commits.len() + 1
    }

    /// Cumulative kills per player slot, one point per commit, each series
    /// starting at zero.
    pub fn chart_data(&self) -> Vec<Vec<i64>> {
        let mut series: Vec<Vec<i64>> = self
            .players
            .iter()
            .map(|_| {
                let mut s = Vec::with_capacity(self.commits.len() + 1);
                s.push(0);
                s
            })
            .collect();

        for commit in &self.commits {
            for (slot, points) in series.iter_mut().enumerate() {
                let delta = commit.kills.get(slot).map_or(0, |k| k[0]);
                let last = points.last().copied().unwrap_or_default();
                points.push(last + delta);
            }
        }
        series
    }

    /// Players ordered by person id.
    pub fn sorted_players(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.iter().collect();
        players.sort_by(|a, b| a.person_id().cmp(b.person_id()));
        players
    }

    pub fn player(&self, slot: usize) -> Option<&Player> {
        self.players.get(slot)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{Person, PlayerState};

    pub(crate) fn player(id: &str, kills: i64) -> Player {
        Player {
            person: Person {
                id: id.into(),
                nick: format!("nick-{id}"),
                ..Person::default()
            },
            nick: format!("nick-{id}"),
            color: "green".into(),
            preferred_color: "green".into(),
            archer_type: 0,
            shots: 0,
            sweeps: 0,
            kills,
            self_kills: 0,
            match_score: 0,
            total_score: 0,
            state: PlayerState::default(),
        }
    }

    pub(crate) fn fixture(kind: MatchKind, index: usize) -> Match {
        Match {
            tournament: TournamentId::from("df-1"),
            index,
            kind,
            length: MATCH_LENGTH,
            scheduled: Timestamp::Unset,
            started: Timestamp::Unset,
            ended: Timestamp::Unset,
            players: Vec::new(),
            commits: Vec::new(),
            events: Vec::new(),
            level: None,
        }
    }

    fn at(s: &str) -> Timestamp {
        Timestamp::parse(Some(s))
    }

    #[test]
    fn lifecycle_states_are_exclusive() {
        let mut m = fixture(MatchKind::Playoff, 0);
        assert!(m.can_start() && !m.is_running() && !m.is_ended());

        m.started = at("2026-03-01T20:00:00Z");
        assert!(m.is_running() && !m.can_start() && !m.is_ended());

        m.ended = at("2026-03-01T20:10:00Z");
        assert!(m.is_ended() && m.is_started() && !m.is_running());
    }

    #[test]
    fn ended_implies_started_without_start_time() {
        let mut m = fixture(MatchKind::Playoff, 0);
        m.ended = at("2026-03-01T20:10:00Z");
        assert!(m.is_started());
        assert!(!m.is_running());
    }

    #[test]
    fn end_score_by_kind() {
        let mut playoff = fixture(MatchKind::Playoff, 0);
        playoff.length = 7;
        assert_eq!(playoff.end_score(), 7);
        assert_eq!(fixture(MatchKind::Tryout, 0).end_score(), 10);
        assert_eq!(fixture(MatchKind::Semi, 0).end_score(), 10);
        assert_eq!(fixture(MatchKind::Final, 0).end_score(), 20);
    }

    #[test]
    fn can_end_needs_a_winner_and_no_end() {
        let mut m = fixture(MatchKind::Semi, 0);
        m.started = at("2026-03-01T20:00:00Z");
        m.players = vec![player("1", 9), player("2", 4)];
        assert!(!m.can_end());

        m.players[0].kills = 10;
        assert!(m.can_end());

        m.ended = at("2026-03-01T20:10:00Z");
        assert!(!m.can_end());
    }

    #[test]
    fn titles() {
        assert_eq!(fixture(MatchKind::Final, 0).title(), "Final");
        assert_eq!(fixture(MatchKind::Special, 0).title(), "Special");
        assert_eq!(fixture(MatchKind::Playoff, 0).title(), "Playoff");
        assert_eq!(fixture(MatchKind::Semi, 0).title(), "Semi");
    }

    #[test]
    fn chart_data_starts_at_zero() {
        let mut m = fixture(MatchKind::Playoff, 0);
        m.players = vec![player("1", 0), player("2", 0)];
        assert_eq!(m.chart_data(), vec![vec![0], vec![0]]);
        assert_eq!(m.round(), 1);
    }

    #[test]
    fn chart_data_accumulates_commits() {
        let mut m = fixture(MatchKind::Playoff, 0);
        m.players = vec![player("1", 0), player("2", 0)];
        m.commits.push(Commit {
            kills: vec![[2, 0], [1, 1]],
            ..Commit::default()
        });
        assert_eq!(m.chart_data(), vec![vec![0, 2], vec![0, 1]]);

        m.commits.push(Commit {
            kills: vec![[1, 0]],
            ..Commit::default()
        });
        assert_eq!(m.chart_data(), vec![vec![0, 2, 3], vec![0, 1, 1]]);
        assert_eq!(m.round(), 3);
    }

    #[test]
    fn sorted_players_by_person_id() {
        let mut m = fixture(MatchKind::Playoff, 0);
        m.players = vec![player("3", 0), player("1", 0), player("2", 0)];
        let ids: Vec<&str> = m.sorted_players().iter().map(|p| p.person_id()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
