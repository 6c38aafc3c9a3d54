// ── Tournament ──
//
// The aggregate root. Every accessor below is recomputed from the owned
// match list and timestamps on each call. Time-dependent questions take
// `now` explicitly so they stay pure.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::event::Event;
use super::ids::{MatchRef, TournamentId};
use super::matches::{FINAL_LENGTH, MATCH_LENGTH, Match};
use super::person::Person;
use super::player::PlayerSummary;
use super::timestamp::Timestamp;
use crate::error::CoreError;

/// How long after its end a tournament still counts as "recent".
pub const RECENT_WINDOW: Duration = Duration::hours(6);

const DEFAULT_NUMERAL_COLOR: &str = "default-numeral";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbid: Option<u64>,
    pub name: String,
    pub color: String,
    pub cover: String,
    pub opened: Timestamp,
    pub scheduled: Timestamp,
    pub started: Timestamp,
    pub qualifying_end: Timestamp,
    pub ended: Timestamp,
    pub length: u32,
    pub final_length: u32,
    pub matches: Vec<Match>,
    pub players: Vec<PlayerSummary>,
    pub casters: Vec<Person>,
    pub runnerups: Vec<Person>,
    /// Tournament-level events only; see [`Tournament::event_log`].
    pub events: Vec<Event>,
}

impl Tournament {
    /// An empty tournament with default lengths.
    pub fn new(id: impl Into<TournamentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dbid: None,
            name: name.into(),
            color: String::new(),
            cover: String::new(),
            opened: Timestamp::Unset,
            scheduled: Timestamp::Unset,
            started: Timestamp::Unset,
            qualifying_end: Timestamp::Unset,
            ended: Timestamp::Unset,
            length: MATCH_LENGTH,
            final_length: FINAL_LENGTH,
            matches: Vec::new(),
            players: Vec::new(),
            casters: Vec::new(),
            runnerups: Vec::new(),
            events: Vec::new(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

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

    /// Anything not named with the production prefix is a test event.
    pub fn is_test(&self, prefix: &str) -> bool {
        !self.name.starts_with(prefix)
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.scheduled.instant().is_some_and(|at| now < at) && self.can_start()
    }

    pub fn is_today(&self, now: DateTime<Utc>) -> bool {
        self.scheduled
            .instant()
            .is_some_and(|at| at.date_naive() == now.date_naive())
    }

    pub fn ended_recently(&self, now: DateTime<Utc>) -> bool {
        self.ended
            .instant()
            .is_some_and(|at| at < now && now < at + RECENT_WINDOW)
    }

    /// Whether this is the first entry of a globally sorted upcoming list.
    pub fn is_next(&self, upcoming: &[&Tournament]) -> bool {
        upcoming.first().is_some_and(|t| t.id == self.id)
    }

    // ── Naming ───────────────────────────────────────────────────────

    /// `"DrunkenFall 2026: Title"` -> `"2026"`.
    pub fn numeral(&self) -> Option<&str> {
        let word = self.name.split(' ').nth(1)?;
        Some(word.strip_suffix(':').unwrap_or(word))
    }

    /// `"DrunkenFall 2026: Title"` -> `"Title"`.
    pub fn subtitle(&self) -> &str {
        self.name
            .rsplit_once(": ")
            .map_or(self.name.as_str(), |(_, rest)| rest)
    }

    pub fn numeral_color(&self) -> &str {
        if self.color.is_empty() {
            DEFAULT_NUMERAL_COLOR
        } else {
            &self.color
        }
    }

    pub fn player_joined(&self, person: &Person) -> bool {
        self.players.iter().any(|p| p.person_id == person.id)
    }

    // ── Match resolution ─────────────────────────────────────────────

    /// The first match that has not ended. `None` once every match has
    /// ended (the tournament is complete) or before any match exists.
    pub fn current_match(&self) -> Option<&Match> {
        self.matches.iter().find(|m| !m.is_ended())
    }

    /// Stable reference to [`current_match`](Self::current_match).
    pub fn current_ref(&self) -> Option<MatchRef> {
        self.current_match().map(|m| MatchRef {
            tournament: self.id.clone(),
            index: m.index,
        })
    }

    /// The first match that has not started yet.
    pub fn next_match(&self) -> Option<&Match> {
        self.matches.iter().find(|m| m.can_start())
    }

    pub fn match_at(&self, index: usize) -> Option<&Match> {
        self.matches.iter().find(|m| m.index == index)
    }

    /// The match whose scores should be visualized.
    ///
    /// Keeps showing the previous match until the current one starts, so
    /// graphs are not cleared the moment a match is ended. The first
    /// match has no predecessor. A complete tournament shows its last match.
    pub fn chart_match(&self) -> Option<&Match> {
        let Some(position) = self.matches.iter().position(|m| !m.is_ended()) else {
            return self.matches.last();
        };
        let current = self.matches.get(position)?;
        if position == 0 {
            return None;
        }
        if current.is_started() {
            Some(current)
        } else {
            self.matches.get(position - 1)
        }
    }

    /// Started, not ended, and no match is being played right now.
    pub fn between_matches(&self) -> bool {
        self.is_running() && !self.matches.iter().any(Match::is_running)
    }

    /// Player order can only change before the first match has started.
    pub fn can_shuffle(&self) -> bool {
        self.is_started() && self.matches.first().is_some_and(Match::can_start)
    }

    // ── Bracket structure ────────────────────────────────────────────

    /// Everything before the semis.
    pub fn playoffs(&self) -> Result<&[Match], CoreError> {
        let len = self.checked_len()?;
        Ok(self.matches.get(..len.saturating_sub(3)).unwrap_or_default())
    }

    /// The two matches before the final.
    pub fn semis(&self) -> Result<&[Match], CoreError> {
        let len = self.checked_len()?;
        if len == 0 {
            return Ok(&[]);
        }
        Ok(self.matches.get(len - 3..len - 1).unwrap_or_default())
    }

    pub fn final_match(&self) -> Result<Option<&Match>, CoreError> {
        self.checked_len()?;
        Ok(self.matches.last())
    }

    /// A bracket needs at least two semis and a final. An empty match list
    /// is a tournament that has not been set up yet.
    fn checked_len(&self) -> Result<usize, CoreError> {
        match self.matches.len() {
            len @ 1..3 => Err(CoreError::InvalidStructure {
                tournament: self.id.to_string(),
                message: format!("{len} matches cannot hold semis and a final"),
            }),
            len => Ok(len),
        }
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Tournament and match events merged, newest first. Events without a
    /// time sort last.
    pub fn event_log(&self) -> Vec<&Event> {
        let mut log: Vec<&Event> = self
            .events
            .iter()
            .chain(self.matches.iter().flat_map(|m| m.events.iter()))
            .collect();
        log.sort_by(|a, b| b.time.cmp(&a.time));
        log
    }
}
