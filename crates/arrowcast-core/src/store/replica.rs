// ── Replica snapshot ──
//
// One immutable value holding everything the client mirrors from the
// server. The `DataStore` publishes a fresh `Arc<Replica>` per mutation;
// entities inside are `Arc`-shared so each copy-on-write step only clones
// what it touches.
//
// The `apply_*` methods are the mutation bodies. They run against a
// private copy inside `DataStore::commit` and must leave that copy
// untouched when they return `Err`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::model::{
    Credits, Match, Person, Player, PlayerState, PlayerSummary, Stats, Tournament, TournamentId,
};

/// Outcome of a mutation that did not fail.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The replica changed and was published.
    Applied,
    /// The update carried an older version than the one held; ignored.
    Stale,
    /// The replica already held this value; nothing was published.
    Unchanged,
}

/// Push-channel connectivity as seen by readers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketState {
    pub connected: bool,
    pub reconnect_error: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Replica {
    pub(crate) tournaments: BTreeMap<TournamentId, Arc<Tournament>>,
    pub(crate) tournaments_loaded: bool,
    pub(crate) player_summaries: BTreeMap<TournamentId, Arc<Vec<PlayerSummary>>>,
    pub(crate) runnerups: BTreeMap<TournamentId, Arc<Vec<PlayerSummary>>>,
    pub(crate) matches: BTreeMap<TournamentId, Arc<Vec<Match>>>,
    pub(crate) player_states: BTreeMap<usize, PlayerState>,
    pub(crate) user: Person,
    pub(crate) user_loaded: bool,
    pub(crate) stats: Option<Arc<Stats>>,
    pub(crate) people: Option<Arc<BTreeMap<String, Person>>>,
    pub(crate) credits: BTreeMap<TournamentId, Arc<Credits>>,
    pub(crate) socket: SocketState,
    pub(crate) versions: BTreeMap<TournamentId, u64>,
    /// Highest version stamp applied so far, from any update.
    pub(crate) high_water: Option<u64>,
}

impl Replica {
    // ── Tournaments ──────────────────────────────────────────────────

    pub fn tournament(&self, id: &str) -> Option<&Tournament> {
        self.tournaments.get(id).map(Arc::as_ref)
    }

    pub fn tournaments(&self) -> impl Iterator<Item = &Tournament> {
        self.tournaments.values().map(Arc::as_ref)
    }

    pub fn tournament_count(&self) -> usize {
        self.tournaments.len()
    }

    /// Whether a full tournament snapshot has been applied.
    pub fn is_loaded(&self) -> bool {
        self.tournaments_loaded
    }

    /// Tournaments ordered by scheduled time (unscheduled first), then id.
    pub fn tournaments_sorted(&self) -> Vec<&Tournament> {
        let mut all: Vec<&Tournament> = self.tournaments().collect();
        all.sort_by(|a, b| a.scheduled.cmp(&b.scheduled).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn upcoming(&self, now: DateTime<Utc>) -> Vec<&Tournament> {
        self.tournaments_sorted()
            .into_iter()
            .filter(|t| t.is_upcoming(now))
            .collect()
    }

    /// The earliest-scheduled running tournament.
    pub fn running(&self) -> Option<&Tournament> {
        self.tournaments_sorted()
            .into_iter()
            .find(|t| t.is_running())
    }

    /// The most recently scheduled ended tournament.
    pub fn latest(&self) -> Option<&Tournament> {
        self.tournaments_sorted()
            .into_iter()
            .rev()
            .find(|t| t.is_ended())
    }

    pub fn is_next(&self, id: &str, now: DateTime<Utc>) -> bool {
        self.upcoming(now).first().is_some_and(|t| t.id.as_str() == id)
    }

    /// Resolve a tournament reference from a payload: either the slug or
    /// the numeric database id.
    pub fn resolve_tournament(&self, key: &str) -> Option<&TournamentId> {
        if let Some((id, _)) = self.tournaments.get_key_value(key) {
            return Some(id);
        }
        self.tournaments
            .values()
            .find(|t| t.dbid.is_some_and(|dbid| dbid.to_string() == key))
            .map(|t| &t.id)
    }

    pub fn version(&self, id: &str) -> Option<u64> {
        self.versions.get(id).copied()
    }

    // ── Per-tournament collections ───────────────────────────────────

    pub fn player_summaries(&self, id: &str) -> Option<&[PlayerSummary]> {
        self.player_summaries.get(id).map(|v| v.as_slice())
    }

    pub fn player_summary(&self, id: &str, person_id: &str) -> Option<&PlayerSummary> {
        self.player_summaries(id)?
            .iter()
            .find(|s| s.person_id == person_id)
    }

    pub fn runnerups(&self, id: &str) -> Option<&[PlayerSummary]> {
        self.runnerups.get(id).map(|v| v.as_slice())
    }

    pub fn matches(&self, id: &str) -> Option<&[Match]> {
        self.matches.get(id).map(|v| v.as_slice())
    }

    pub fn match_at(&self, id: &str, index: usize) -> Option<&Match> {
        self.matches(id)?.iter().find(|m| m.index == index)
    }

    /// Players of a match ordered by person id.
    pub fn match_players(&self, id: &str, index: usize) -> Option<Vec<&Player>> {
        self.match_at(id, index).map(Match::sorted_players)
    }

    pub fn credits(&self, id: &str) -> Option<&Credits> {
        self.credits.get(id).map(Arc::as_ref)
    }

    // ── Global collections ───────────────────────────────────────────

    pub fn player_state(&self, index: usize) -> Option<&PlayerState> {
        self.player_states.get(&index)
    }

    pub fn user(&self) -> &Person {
        &self.user
    }

    pub fn is_user_loaded(&self) -> bool {
        self.user_loaded
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_deref()
    }

    pub fn people(&self) -> Option<&BTreeMap<String, Person>> {
        self.people.as_deref()
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.people.as_ref()?.get(id)
    }

    pub fn socket(&self) -> SocketState {
        self.socket
    }

    pub fn is_connected(&self) -> bool {
        self.socket.connected
    }

    // ── Mutation bodies ──────────────────────────────────────────────

    /// Is `version` older than what this tournament already holds?
    fn is_stale(&self, id: &TournamentId, version: Option<u64>) -> bool {
        match (version, self.versions.get(id)) {
            (Some(incoming), Some(held)) => incoming < *held,
            _ => false,
        }
    }

    fn record_version(&mut self, id: &TournamentId, version: Option<u64>) {
        if let Some(v) = version {
            self.versions.insert(id.clone(), v);
            self.high_water = Some(self.high_water.map_or(v, |hw| hw.max(v)));
        }
    }

    fn require(&self, id: &TournamentId) -> Result<(), CoreError> {
        if self.tournaments.contains_key(id) {
            Ok(())
        } else {
            Err(CoreError::tournament_not_found(id.as_str()))
        }
    }

    pub(crate) fn apply_replace_all(
        &mut self,
        tournaments: Vec<Tournament>,
        version: Option<u64>,
    ) -> Applied {
        if let (Some(incoming), Some(hw)) = (version, self.high_water) {
            if incoming < hw {
                return Applied::Stale;
            }
        }

        self.tournaments = tournaments
            .into_iter()
            .map(|t| (t.id.clone(), Arc::new(t)))
            .collect();
        self.tournaments_loaded = true;

        // Per-tournament collections follow the tournament mapping.
        let live = &self.tournaments;
        self.player_summaries.retain(|id, _| live.contains_key(id));
        self.runnerups.retain(|id, _| live.contains_key(id));
        self.matches.retain(|id, _| live.contains_key(id));
        self.credits.retain(|id, _| live.contains_key(id));

        self.versions.clear();
        if let Some(v) = version {
            self.versions = self.tournaments.keys().map(|id| (id.clone(), v)).collect();
            self.high_water = Some(v);
        }
        Applied::Applied
    }

    pub(crate) fn apply_upsert_tournament(
        &mut self,
        tournament: Tournament,
        version: Option<u64>,
    ) -> Applied {
        let id = tournament.id.clone();
        if self.is_stale(&id, version) {
            return Applied::Stale;
        }
        self.tournaments.insert(id.clone(), Arc::new(tournament));
        self.record_version(&id, version);
        Applied::Applied
    }

    /// Patch one player's live state in place. The match is addressed by
    /// its index within the tournament, the player by slot.
    pub(crate) fn apply_player_state(
        &mut self,
        id: &TournamentId,
        match_index: usize,
        slot: usize,
        state: PlayerState,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let Some(tournament) = self.tournaments.get(id) else {
            return Err(CoreError::tournament_not_found(id.as_str()));
        };
        // The independent match list wins; tournaments pushed without
        // embedded matches rely on it.
        let found = self
            .match_at(id.as_str(), match_index)
            .or_else(|| tournament.match_at(match_index))
            .map(|m| m.players.len());
        match found {
            None => {
                return Err(CoreError::MatchNotFound {
                    tournament: id.to_string(),
                    index: match_index,
                });
            }
            Some(len) if slot >= len => {
                return Err(CoreError::PlayerNotFound {
                    tournament: id.to_string(),
                    match_index,
                    index: slot,
                });
            }
            Some(_) => {}
        }
        if self.is_stale(id, version) {
            return Ok(Applied::Stale);
        }

        if let Some(tournament) = self.tournaments.get_mut(id) {
            set_player_state(&mut Arc::make_mut(tournament).matches, match_index, slot, &state);
        }
        if let Some(list) = self.matches.get_mut(id) {
            set_player_state(Arc::make_mut(list).as_mut_slice(), match_index, slot, &state);
        }
        self.player_states.insert(state.index.unwrap_or(slot), state);
        self.record_version(id, version);
        Ok(Applied::Applied)
    }

    pub(crate) fn apply_player_summaries(
        &mut self,
        id: &TournamentId,
        summaries: Vec<PlayerSummary>,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        self.require(id)?;
        if self.is_stale(id, version) {
            return Ok(Applied::Stale);
        }
        self.player_summaries.insert(id.clone(), Arc::new(summaries));
        self.record_version(id, version);
        Ok(Applied::Applied)
    }

    pub(crate) fn apply_runnerups(
        &mut self,
        id: &TournamentId,
        runnerups: Vec<PlayerSummary>,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        self.require(id)?;
        if self.is_stale(id, version) {
            return Ok(Applied::Stale);
        }
        self.runnerups.insert(id.clone(), Arc::new(runnerups));
        self.record_version(id, version);
        Ok(Applied::Applied)
    }

    pub(crate) fn apply_matches(
        &mut self,
        id: &TournamentId,
        matches: Vec<Match>,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        self.require(id)?;
        if self.is_stale(id, version) {
            return Ok(Applied::Stale);
        }
        self.matches.insert(id.clone(), Arc::new(matches));
        self.record_version(id, version);
        Ok(Applied::Applied)
    }

    /// Replace a single match, both in the independent match list and in
    /// the owning tournament.
    pub(crate) fn apply_match(
        &mut self,
        id: &TournamentId,
        replacement: Match,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        self.require(id)?;
        if self.is_stale(id, version) {
            return Ok(Applied::Stale);
        }

        if let Some(tournament) = self.tournaments.get_mut(id) {
            if tournament.match_at(replacement.index).is_some() {
                upsert_match(&mut Arc::make_mut(tournament).matches, replacement.clone());
            }
        }
        let list = self.matches.entry(id.clone()).or_default();
        upsert_match(Arc::make_mut(list), replacement);
        self.record_version(id, version);
        Ok(Applied::Applied)
    }

    /// The compound end-of-match update: tournament, matches, summaries
    /// and runnerups land together or not at all.
    pub(crate) fn apply_match_end(
        &mut self,
        tournament: Tournament,
        matches: Vec<Match>,
        summaries: Vec<PlayerSummary>,
        runnerups: Vec<PlayerSummary>,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let id = tournament.id.clone();
        if self.apply_upsert_tournament(tournament, version) == Applied::Stale {
            return Ok(Applied::Stale);
        }
        // The tournament exists now, so the remaining steps cannot fail.
        let _ = self.apply_matches(&id, matches, version)?;
        let _ = self.apply_player_summaries(&id, summaries, version)?;
        let _ = self.apply_runnerups(&id, runnerups, version)?;
        Ok(Applied::Applied)
    }

    /// The compound first load of one tournament: the tournament, its
    /// summaries, runnerups and matches, and the live player states, which
    /// replace whatever states were held before.
    pub(crate) fn apply_initial(
        &mut self,
        tournament: Tournament,
        matches: Vec<Match>,
        summaries: Vec<PlayerSummary>,
        runnerups: Vec<PlayerSummary>,
        player_states: Vec<PlayerState>,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let id = tournament.id.clone();
        if self.apply_upsert_tournament(tournament, version) == Applied::Stale {
            return Ok(Applied::Stale);
        }
        let _ = self.apply_player_summaries(&id, summaries, version)?;
        let _ = self.apply_runnerups(&id, runnerups, version)?;
        let _ = self.apply_matches(&id, matches, version)?;
        self.player_states = player_states
            .into_iter()
            .enumerate()
            .map(|(position, state)| (state.index.unwrap_or(position), state))
            .collect();
        Ok(Applied::Applied)
    }

    pub(crate) fn apply_credits(
        &mut self,
        id: &TournamentId,
        credits: Credits,
    ) -> Result<Applied, CoreError> {
        self.require(id)?;
        self.credits.insert(id.clone(), Arc::new(credits));
        Ok(Applied::Applied)
    }

    pub(crate) fn apply_user(&mut self, user: Person) -> Applied {
        self.user = user;
        self.user_loaded = true;
        Applied::Applied
    }

    pub(crate) fn apply_user_loaded(&mut self, loaded: bool) -> Applied {
        if self.user_loaded == loaded {
            return Applied::Unchanged;
        }
        self.user_loaded = loaded;
        Applied::Applied
    }

    pub(crate) fn apply_logout(&mut self) -> Applied {
        self.user = self.user.logged_out();
        Applied::Applied
    }

    pub(crate) fn apply_stats(&mut self, stats: Stats) -> Applied {
        self.stats = Some(Arc::new(stats));
        Applied::Applied
    }

    pub(crate) fn apply_people(&mut self, people: Vec<Person>) -> Applied {
        let directory = people.into_iter().map(|p| (p.id.clone(), p)).collect();
        self.people = Some(Arc::new(directory));
        Applied::Applied
    }

    pub(crate) fn apply_connection_state(&mut self, connected: bool) -> Applied {
        if self.socket.connected == connected {
            return Applied::Unchanged;
        }
        self.socket.connected = connected;
        if connected {
            self.socket.reconnect_error = false;
        }
        Applied::Applied
    }

    pub(crate) fn apply_reconnect_error(&mut self, failed: bool) -> Applied {
        if self.socket.reconnect_error == failed {
            return Applied::Unchanged;
        }
        self.socket.reconnect_error = failed;
        Applied::Applied
    }
}

fn set_player_state(matches: &mut [Match], match_index: usize, slot: usize, state: &PlayerState) {
    if let Some(player) = matches
        .iter_mut()
        .find(|m| m.index == match_index)
        .and_then(|m| m.players.get_mut(slot))
    {
        player.state = state.clone();
    }
}

/// Replace the match with the same index, or insert it in index order.
fn upsert_match(matches: &mut Vec<Match>, replacement: Match) {
    match matches.iter().position(|m| m.index == replacement.index) {
        Some(pos) => matches[pos] = replacement,
        None => {
            let at = matches.partition_point(|m| m.index < replacement.index);
            matches.insert(at, replacement);
        }
    }
}
