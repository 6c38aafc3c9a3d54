// ── Central replica store ──
//
// Single source of truth for everything mirrored from the bracket server.
// Readers take `Arc<Replica>` snapshots; writers go through the named
// mutations below, each of which decodes its input, applies it to a
// private copy and publishes the copy in one step.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, trace};

use arrowcast_api::wire::{
    InitialPayload, MatchEndPush, RawCredits, RawMatch, RawPerson, RawPlayerState,
    RawPlayerSummary, RawStats, RawTournament,
};

use super::replica::{Applied, Replica};
use crate::convert::{decode_match, decode_matches, decode_people, decode_summaries};
use crate::error::CoreError;
use crate::model::{Credits, Person, PlayerState, Stats, Tournament, TournamentId};
use crate::stream::ReplicaStream;

/// Reactive store holding the current [`Replica`].
///
/// Mutations are serialized: `watch::Sender::send_if_modified` holds the
/// write lock for the whole copy-apply-publish step, so two mutations
/// never interleave and readers only ever observe complete replicas.
/// A mutation that fails publishes nothing.
pub struct DataStore {
    replica: watch::Sender<Arc<Replica>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (replica, _) = watch::channel(Arc::new(Replica::default()));
        Self { replica }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The current replica.
    pub fn snapshot(&self) -> Arc<Replica> {
        self.replica.borrow().clone()
    }

    pub fn subscribe(&self) -> ReplicaStream {
        ReplicaStream::new(self.replica.subscribe())
    }

    pub(crate) fn receiver(&self) -> watch::Receiver<Arc<Replica>> {
        self.replica.subscribe()
    }

    /// Resolve a payload's tournament reference (slug or database id).
    pub fn resolve(&self, key: &str) -> Result<TournamentId, CoreError> {
        self.replica
            .borrow()
            .resolve_tournament(key)
            .cloned()
            .ok_or_else(|| CoreError::tournament_not_found(key))
    }

    // ── Commit ───────────────────────────────────────────────────────

    fn commit(
        &self,
        op: &'static str,
        mutate: impl FnOnce(&mut Replica) -> Result<Applied, CoreError>,
    ) -> Result<Applied, CoreError> {
        let mut outcome = Err(CoreError::Internal(format!("{op} did not run")));
        self.replica.send_if_modified(|current| {
            let mut next = Replica::clone(current);
            outcome = mutate(&mut next);
            if matches!(outcome, Ok(Applied::Applied)) {
                *current = Arc::new(next);
                true
            } else {
                false
            }
        });
        match &outcome {
            Ok(Applied::Stale) => debug!(op, "stale update ignored"),
            Ok(applied) => trace!(op, ?applied, "mutation committed"),
            Err(e) => debug!(op, error = %e, "mutation rejected"),
        }
        outcome
    }

    // ── Tournaments ──────────────────────────────────────────────────

    /// Replace the whole tournament mapping and mark tournaments loaded.
    pub fn replace_all(
        &self,
        raw: Vec<RawTournament>,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let tournaments = raw
            .into_iter()
            .map(Tournament::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = tournaments.len(), "replacing all tournaments");
        self.commit("replace_all", |r| {
            Ok(r.apply_replace_all(tournaments, version))
        })
    }

    /// Insert or overwrite one tournament by id.
    pub fn upsert_tournament(
        &self,
        raw: RawTournament,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let tournament = Tournament::try_from(raw)?;
        self.commit("upsert_tournament", |r| {
            Ok(r.apply_upsert_tournament(tournament, version))
        })
    }

    /// Patch the live state of one player within one match.
    pub fn upsert_player_state(
        &self,
        tournament: &str,
        match_index: usize,
        player: usize,
        raw: RawPlayerState,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let id = self.resolve(tournament)?;
        let state = PlayerState::from(raw);
        self.commit("upsert_player_state", |r| {
            r.apply_player_state(&id, match_index, player, state, version)
        })
    }

    // ── Per-tournament collections ───────────────────────────────────

    pub fn set_player_summaries(
        &self,
        tournament: &str,
        raw: Vec<RawPlayerSummary>,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let id = self.resolve(tournament)?;
        let summaries = decode_summaries(raw)?;
        self.commit("set_player_summaries", |r| {
            r.apply_player_summaries(&id, summaries, version)
        })
    }

    pub fn set_runnerups(
        &self,
        tournament: &str,
        raw: Vec<RawPlayerSummary>,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let id = self.resolve(tournament)?;
        let runnerups = decode_summaries(raw)?;
        self.commit("set_runnerups", |r| r.apply_runnerups(&id, runnerups, version))
    }

    pub fn set_matches(
        &self,
        tournament: &str,
        raw: Vec<RawMatch>,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let id = self.resolve(tournament)?;
        let matches = decode_matches(raw, &id)?;
        self.commit("set_matches", |r| r.apply_matches(&id, matches, version))
    }

    /// Replace one match by index.
    pub fn set_match(
        &self,
        tournament: &str,
        raw: RawMatch,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let id = self.resolve(tournament)?;
        let position = raw.index.unwrap_or_default();
        let decoded = decode_match(raw, Some(&id), position)?;
        self.commit("set_match", |r| r.apply_match(&id, decoded, version))
    }

    /// Apply an end-of-match update: tournament, matches, summaries and
    /// runnerups in that order, published as one replica.
    pub fn apply_match_end(
        &self,
        payload: MatchEndPush,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let tournament = Tournament::try_from(payload.tournament)?;
        if let Some(key) = payload.tournament_id.as_deref() {
            let matches_key = key == tournament.id.as_str()
                || tournament.dbid.is_some_and(|dbid| dbid.to_string() == key);
            if !matches_key {
                return Err(CoreError::decode(
                    "match_end",
                    format!("payload for {key} carries tournament {}", tournament.id),
                ));
            }
        }

        let matches = decode_matches(payload.matches, &tournament.id)?;
        let summaries = decode_summaries(payload.player_summaries)?;
        let runnerups = decode_summaries(payload.runnerups)?;
        self.commit("apply_match_end", |r| {
            r.apply_match_end(tournament, matches, summaries, runnerups, version)
        })
    }

    /// Apply the first full load of one tournament and its live player
    /// states, published as one replica.
    pub fn set_initial(
        &self,
        payload: InitialPayload,
        version: Option<u64>,
    ) -> Result<Applied, CoreError> {
        let tournament = Tournament::try_from(payload.tournament)?;
        let matches = decode_matches(payload.matches, &tournament.id)?;
        let summaries = decode_summaries(payload.player_summaries)?;
        let runnerups = decode_summaries(payload.runnerups)?;
        let states = payload
            .player_states
            .into_iter()
            .map(PlayerState::from)
            .collect();
        debug!(tournament = %tournament.id, "applying initial tournament load");
        self.commit("set_initial", |r| {
            r.apply_initial(tournament, matches, summaries, runnerups, states, version)
        })
    }

    pub fn set_credits(&self, tournament: &str, raw: RawCredits) -> Result<Applied, CoreError> {
        let id = self.resolve(tournament)?;
        let credits = Credits::try_from(raw)?;
        self.commit("set_credits", |r| r.apply_credits(&id, credits))
    }

    // ── User ─────────────────────────────────────────────────────────

    /// Replace the authenticated user and mark the user loaded.
    pub fn set_user(&self, user: Person) -> Result<Applied, CoreError> {
        self.commit("set_user", |r| Ok(r.apply_user(user)))
    }

    pub fn set_user_loaded(&self, loaded: bool) -> Result<Applied, CoreError> {
        self.commit("set_user_loaded", |r| Ok(r.apply_user_loaded(loaded)))
    }

    /// Drop the current user's privileges.
    pub fn logout(&self) -> Result<Applied, CoreError> {
        self.commit("logout", |r| Ok(r.apply_logout()))
    }

    // ── Global collections ───────────────────────────────────────────

    pub fn set_stats(&self, raw: RawStats) -> Result<Applied, CoreError> {
        let stats = Stats::try_from(raw)?;
        self.commit("set_stats", |r| Ok(r.apply_stats(stats)))
    }

    pub fn set_people(&self, raw: Vec<RawPerson>) -> Result<Applied, CoreError> {
        let people = decode_people(raw)?;
        self.commit("set_people", |r| Ok(r.apply_people(people)))
    }

    // ── Connectivity ─────────────────────────────────────────────────

    pub fn set_connection_state(&self, connected: bool) -> Result<Applied, CoreError> {
        self.commit("set_connection_state", |r| {
            Ok(r.apply_connection_state(connected))
        })
    }

    pub fn set_reconnect_error(&self, failed: bool) -> Result<Applied, CoreError> {
        self.commit("set_reconnect_error", |r| Ok(r.apply_reconnect_error(failed)))
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
