// ── Update channel handler ──
//
// Turns push-channel traffic into replica mutations. Envelopes decode into
// a closed `Update` sum type, one variant per update kind, and each variant
// maps to exactly one `DataStore` mutation. Lifecycle events drive a small
// connectivity state machine that never touches replica data beyond the
// socket flags.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;
use serde_json::Value;
use strum::{Display, EnumString, IntoStaticStr};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use arrowcast_api::wire::{
    MatchEndPush, MatchPush, MatchesPush, PlayerStatePush, PlayerSummariesPush, RawTournament,
    RawTournamentCollection, RunnerupsPush, TournamentList, TournamentPush,
};
use arrowcast_api::Envelope;

pub use arrowcast_api::ChannelEvent;

use crate::error::CoreError;
use crate::store::{Applied, DataStore};

// ── Update kinds ─────────────────────────────────────────────────────

/// Tags the server puts in an envelope's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum UpdateKind {
    All,
    Tournament,
    Player,
    PlayerSummaries,
    Runnerups,
    Match,
    Matches,
    MatchEnd,
}

/// A decoded push update.
#[derive(Debug, Clone)]
pub enum Update {
    /// Full tournament snapshot.
    All(Vec<RawTournament>),
    Tournament(TournamentPush),
    Player(PlayerStatePush),
    PlayerSummaries(PlayerSummariesPush),
    Runnerups(RunnerupsPush),
    Match(MatchPush),
    Matches(MatchesPush),
    /// Tournament, matches, summaries and runnerups in one message.
    MatchEnd(MatchEndPush),
    /// A kind this client does not know. Logged and dropped.
    Unhandled { kind: String },
}

impl Update {
    /// Decode an envelope's payload according to its kind.
    ///
    /// Unknown kinds are not an error; they decode to [`Update::Unhandled`].
    pub fn decode(envelope: &Envelope) -> Result<Self, CoreError> {
        let Ok(kind) = envelope.kind.parse::<UpdateKind>() else {
            return Ok(Self::Unhandled {
                kind: envelope.kind.clone(),
            });
        };
        let data = &envelope.data;

        Ok(match kind {
            UpdateKind::All => Self::All(decode_all(data)?),
            UpdateKind::Tournament => Self::Tournament(decode_tournament(data)?),
            UpdateKind::Player => Self::Player(payload(kind, data)?),
            UpdateKind::PlayerSummaries => Self::PlayerSummaries(payload(kind, data)?),
            UpdateKind::Runnerups => Self::Runnerups(payload(kind, data)?),
            UpdateKind::Match => Self::Match(payload(kind, data)?),
            UpdateKind::Matches => Self::Matches(payload(kind, data)?),
            UpdateKind::MatchEnd => Self::MatchEnd(payload(kind, data)?),
        })
    }

    /// The kind tag, or `None` for unhandled updates.
    pub fn kind(&self) -> Option<UpdateKind> {
        Some(match self {
            Self::All(_) => UpdateKind::All,
            Self::Tournament(_) => UpdateKind::Tournament,
            Self::Player(_) => UpdateKind::Player,
            Self::PlayerSummaries(_) => UpdateKind::PlayerSummaries,
            Self::Runnerups(_) => UpdateKind::Runnerups,
            Self::Match(_) => UpdateKind::Match,
            Self::Matches(_) => UpdateKind::Matches,
            Self::MatchEnd(_) => UpdateKind::MatchEnd,
            Self::Unhandled { .. } => return None,
        })
    }
}

fn payload<T: DeserializeOwned>(kind: UpdateKind, data: &Value) -> Result<T, CoreError> {
    serde_json::from_value(data.clone()).map_err(|e| CoreError::decode(kind.into(), e.to_string()))
}

/// `all` arrives either wrapped as `{ "tournaments": ... }` or bare.
fn decode_all(data: &Value) -> Result<Vec<RawTournament>, CoreError> {
    if data.get("tournaments").is_some() {
        let list: TournamentList = payload(UpdateKind::All, data)?;
        return Ok(list.tournaments.into_vec());
    }
    let collection: RawTournamentCollection = payload(UpdateKind::All, data)?;
    Ok(collection.into_vec())
}

/// `tournament` arrives either wrapped with its id or as the bare record.
fn decode_tournament(data: &Value) -> Result<TournamentPush, CoreError> {
    if data.get("tournament").is_some_and(Value::is_object) {
        return payload(UpdateKind::Tournament, data);
    }
    Ok(TournamentPush {
        tournament_id: None,
        tournament: payload(UpdateKind::Tournament, data)?,
    })
}

fn required(kind: UpdateKind, key: Option<String>) -> Result<String, CoreError> {
    key.ok_or_else(|| CoreError::decode(kind.into(), "missing tournament reference"))
}

// ── Connectivity state machine ───────────────────────────────────────

/// Push-channel connectivity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connected,
    Reconnecting {
        attempt: u32,
    },
    /// The transport gave up reconnecting.
    Failed,
}

impl ChannelState {
    /// Transition on a lifecycle event.
    #[must_use]
    pub fn next(self, event: ChannelEvent) -> Self {
        match (self, event) {
            (_, ChannelEvent::Open) => Self::Connected,
            (_, ChannelEvent::GaveUp) | (Self::Failed, _) => Self::Failed,
            (_, ChannelEvent::Close) => Self::Disconnected,
            (_, ChannelEvent::Reconnect { attempt }) => Self::Reconnecting { attempt },
            (state, ChannelEvent::Error | ChannelEvent::ReconnectError) => state,
        }
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// Follow-up work the owner of the handler should perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    /// Re-fetch the full tournament snapshot.
    Resync,
}

// ── Handler ──────────────────────────────────────────────────────────

/// Applies push traffic to a [`DataStore`].
///
/// The handler is the only network-side producer of mutations. It never
/// resets replica data on lifecycle changes.
pub struct ChannelHandler {
    store: Arc<DataStore>,
    state: watch::Sender<ChannelState>,
    /// Set once the channel has dropped or failed to connect, so the next
    /// open may have missed updates.
    dropped: AtomicBool,
}

impl ChannelHandler {
    pub fn new(store: Arc<DataStore>) -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        Self {
            store,
            state,
            dropped: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    // ── Messages ─────────────────────────────────────────────────────

    /// Parse one text frame and apply it.
    pub fn handle_text(&self, text: &str) -> Result<Applied, CoreError> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| CoreError::decode("envelope", e.to_string()))?;
        self.handle_envelope(&envelope)
    }

    pub fn handle_envelope(&self, envelope: &Envelope) -> Result<Applied, CoreError> {
        let update = Update::decode(envelope)?;
        self.apply(update, envelope.version)
    }

    /// Route an update to its store mutation.
    pub fn apply(&self, update: Update, version: Option<u64>) -> Result<Applied, CoreError> {
        let store = &self.store;
        match update {
            Update::All(tournaments) => store.replace_all(tournaments, version),
            Update::Tournament(push) => store.upsert_tournament(push.tournament, version),
            Update::Player(push) => {
                let slot = push.slot().ok_or_else(|| {
                    CoreError::decode(UpdateKind::Player.into(), "missing player slot")
                })?;
                let tournament = required(UpdateKind::Player, push.tournament)?;
                store.upsert_player_state(&tournament, push.match_index, slot, push.state, version)
            }
            Update::PlayerSummaries(push) => {
                let tournament = required(UpdateKind::PlayerSummaries, push.tournament_id)?;
                store.set_player_summaries(&tournament, push.player_summaries, version)
            }
            Update::Runnerups(push) => {
                let tournament = required(UpdateKind::Runnerups, push.tournament_id)?;
                store.set_runnerups(&tournament, push.runnerups, version)
            }
            Update::Match(push) => {
                let key = push
                    .tournament
                    .or_else(|| push.match_record.tournament.clone());
                let tournament = required(UpdateKind::Match, key)?;
                store.set_match(&tournament, push.match_record, version)
            }
            Update::Matches(push) => {
                let tournament = required(UpdateKind::Matches, push.tournament_id)?;
                store.set_matches(&tournament, push.matches, version)
            }
            Update::MatchEnd(push) => store.apply_match_end(push, version),
            Update::Unhandled { kind } => {
                warn!(kind = %kind, "dropping update of unknown kind");
                Ok(Applied::Unchanged)
            }
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Advance the connectivity state on a lifecycle event.
    ///
    /// Returns [`ChannelAction::Resync`] when the channel opens and the
    /// replica may be missing data: either no snapshot has been loaded yet,
    /// or this open follows a close, a transport error or a reconnect.
    pub fn on_event(&self, event: ChannelEvent) -> Option<ChannelAction> {
        let previous = self.state();
        let next = previous.next(event);
        self.state.send_replace(next);
        if previous != next {
            debug!(?previous, ?next, "push channel state changed");
        }

        match event {
            ChannelEvent::Open => {
                let _ = self.store.set_connection_state(true);
                let reconnected = self.dropped.swap(false, Ordering::Relaxed);
                if reconnected {
                    info!("push channel reconnected");
                }
                (reconnected || !self.store.snapshot().is_loaded()).then_some(ChannelAction::Resync)
            }
            ChannelEvent::Close => {
                let _ = self.store.set_connection_state(false);
                self.dropped.store(true, Ordering::Relaxed);
                None
            }
            ChannelEvent::ReconnectError | ChannelEvent::GaveUp => {
                let _ = self.store.set_reconnect_error(true);
                self.dropped.store(true, Ordering::Relaxed);
                if event == ChannelEvent::GaveUp {
                    warn!("push channel gave up reconnecting");
                }
                None
            }
            ChannelEvent::Error => {
                debug!("push channel transport error");
                self.dropped.store(true, Ordering::Relaxed);
                None
            }
            ChannelEvent::Reconnect { .. } => {
                self.dropped.store(true, Ordering::Relaxed);
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use super::*;
    use serde_json::json;

    fn loaded_handler() -> ChannelHandler {
        let handler = ChannelHandler::new(Arc::new(DataStore::new()));
        let text = json!({
            "type": "all",
            "data": {"tournaments": {
                "df-1": {
                    "id": "df-1",
                    "dbid": 7,
                    "name": "DrunkenFall 1: Test",
                    "started": "2026-03-01T19:00:00Z",
                    "matches": [
                        {"index": 0, "kind": "playoff", "ended": "2026-03-01T19:30:00Z",
                         "players": [{"person": {"id": "1"}}, {"person": {"id": "2"}}]},
                        {"index": 1, "kind": "playoff",
                         "players": [{"person": {"id": "3"}}, {"person": {"id": "4"}}]},
                        {"index": 2, "kind": "final",
                         "players": [{"person": {"id": "1"}}, {"person": {"id": "3"}}]}
                    ]
                }
            }}
        })
        .to_string();
        let _ = handler.handle_text(&text).unwrap();
        handler
    }

    // ── Log capture ──

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    #[test]
    fn kind_tags() {
        assert_eq!("match_end".parse::<UpdateKind>().unwrap(), UpdateKind::MatchEnd);
        assert_eq!(UpdateKind::PlayerSummaries.to_string(), "player_summaries");
        assert!("bogus".parse::<UpdateKind>().is_err());
    }

    #[test]
    fn state_machine() {
        use ChannelEvent as E;
        let s = ChannelState::Disconnected;
        let s = s.next(E::Open);
        assert_eq!(s, ChannelState::Connected);
        let s = s.next(E::Error);
        assert_eq!(s, ChannelState::Connected);
        let s = s.next(E::Close);
        assert_eq!(s, ChannelState::Disconnected);
        let s = s.next(E::Reconnect { attempt: 1 });
        assert_eq!(s, ChannelState::Reconnecting { attempt: 1 });
        let s = s.next(E::ReconnectError);
        assert_eq!(s, ChannelState::Reconnecting { attempt: 1 });
        let s = s.next(E::Reconnect { attempt: 2 });
        assert_eq!(s.next(E::Open), ChannelState::Connected);
        let s = s.next(E::GaveUp);
        assert_eq!(s, ChannelState::Failed);
        assert_eq!(s.next(E::Close), ChannelState::Failed);
    }

    #[test]
    fn all_replaces_tournaments() {
        let handler = loaded_handler();
        let replica = handler.store().snapshot();
        assert!(replica.is_loaded());
        assert_eq!(replica.tournament("df-1").unwrap().current_match().unwrap().index, 1);
    }

    #[test]
    fn bare_all_and_bare_tournament() {
        let handler = ChannelHandler::new(Arc::new(DataStore::new()));
        let text = r#"{"type":"all","data":[{"id":"a","name":"A"},{"id":"b","name":"B"}]}"#;
        let _ = handler.handle_text(text).unwrap();
        assert_eq!(handler.store().snapshot().tournament_count(), 2);

        let text = r#"{"type":"tournament","data":{"id":"a","name":"Renamed"}}"#;
        let _ = handler.handle_text(text).unwrap();
        assert_eq!(handler.store().snapshot().tournament("a").unwrap().name, "Renamed");
    }

    #[test]
    fn wrapped_tournament() {
        let handler = loaded_handler();
        let text = json!({
            "type": "tournament",
            "data": {"tournament_id": 7, "tournament": {"id": "df-1", "name": "DrunkenFall 1: New"}}
        })
        .to_string();
        let _ = handler.handle_text(&text).unwrap();
        assert_eq!(
            handler.store().snapshot().tournament("df-1").unwrap().name,
            "DrunkenFall 1: New"
        );
    }

    #[test]
    fn bogus_kind_is_dropped_with_one_log_line() {
        let handler = loaded_handler();
        let before = handler.store().snapshot();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let outcome = tracing::subscriber::with_default(subscriber, || {
            handler.handle_text(r#"{"type":"bogus","data":{"x":1}}"#)
        });

        assert_eq!(outcome.unwrap(), Applied::Unchanged);
        assert!(Arc::ptr_eq(&before, &handler.store().snapshot()));
        let lines = captured.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("bogus"));
    }

    #[test]
    fn player_update_addresses_by_dbid() {
        let handler = loaded_handler();
        let text = json!({
            "type": "player",
            "data": {"tournament": 7, "match": 1, "state": {"index": 1, "shield": true}}
        })
        .to_string();
        assert_eq!(handler.handle_text(&text).unwrap(), Applied::Applied);

        let replica = handler.store().snapshot();
        let t = replica.tournament("df-1").unwrap();
        assert!(t.match_at(1).unwrap().players[1].state.shield);
        assert!(replica.player_state(1).unwrap().shield);
    }

    #[test]
    fn player_update_for_unknown_tournament_fails() {
        let handler = loaded_handler();
        let before = handler.store().snapshot();
        let text = json!({
            "type": "player",
            "data": {"tournament": "ghost", "match": 0, "player": 0, "state": {}}
        })
        .to_string();
        let err = handler.handle_text(&text).unwrap_err();
        assert!(matches!(err, CoreError::TournamentNotFound { .. }));
        assert!(Arc::ptr_eq(&before, &handler.store().snapshot()));
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let handler = loaded_handler();
        let err = handler
            .handle_text(r#"{"type":"matches","data":{"tournament_id":"df-1","matches":7}}"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::Decode { entity: "matches", .. }));
        assert!(handler.handle_text("not json").is_err());
    }

    #[test]
    fn summaries_runnerups_and_matches() {
        let handler = loaded_handler();
        let _ = handler
            .handle_text(
                &json!({"type": "player_summaries", "data": {
                    "tournament_id": 7,
                    "player_summaries": [{"person_id": "1", "score": 3}]
                }})
                .to_string(),
            )
            .unwrap();
        let _ = handler
            .handle_text(
                &json!({"type": "runnerups", "data": {
                    "tournament_id": "df-1",
                    "runnerups": [{"person_id": "2"}]
                }})
                .to_string(),
            )
            .unwrap();
        let _ = handler
            .handle_text(
                &json!({"type": "matches", "data": {
                    "tournament_id": "df-1",
                    "matches": [{"index": 0, "kind": "playoff"}, {"index": 1, "kind": "final"}]
                }})
                .to_string(),
            )
            .unwrap();
        let _ = handler
            .handle_text(
                &json!({"type": "match", "data": {
                    "tournament": 7,
                    "match": {"index": 1, "kind": "final", "started": "2026-03-01T21:00:00Z"}
                }})
                .to_string(),
            )
            .unwrap();

        let replica = handler.store().snapshot();
        assert_eq!(replica.player_summary("df-1", "1").unwrap().score, 3);
        assert_eq!(replica.runnerups("df-1").unwrap().len(), 1);
        assert_eq!(replica.matches("df-1").unwrap().len(), 2);
        assert!(replica.match_at("df-1", 1).unwrap().is_running());
    }

    #[test]
    fn versioned_envelopes_ignore_older_stamps() {
        let handler = loaded_handler();
        let newer = json!({"type": "tournament", "version": 4,
            "data": {"id": "df-1", "name": "Newer"}});
        let older = json!({"type": "tournament", "version": 3,
            "data": {"id": "df-1", "name": "Older"}});
        assert_eq!(handler.handle_text(&newer.to_string()).unwrap(), Applied::Applied);
        assert_eq!(handler.handle_text(&older.to_string()).unwrap(), Applied::Stale);
        assert_eq!(handler.store().snapshot().tournament("df-1").unwrap().name, "Newer");
    }

    #[test]
    fn lifecycle_keeps_data_and_requests_resync() {
        let handler = ChannelHandler::new(Arc::new(DataStore::new()));

        // First open before any snapshot: resync.
        assert_eq!(handler.on_event(ChannelEvent::Open), Some(ChannelAction::Resync));
        assert!(handler.store().snapshot().is_connected());

        let _ = handler
            .handle_text(r#"{"type":"all","data":[{"id":"a"}]}"#)
            .unwrap();

        assert_eq!(handler.on_event(ChannelEvent::Close), None);
        assert_eq!(handler.state(), ChannelState::Disconnected);
        assert!(!handler.store().snapshot().is_connected());
        // Data survives the drop.
        assert!(handler.store().snapshot().tournament("a").is_some());

        assert_eq!(handler.on_event(ChannelEvent::Reconnect { attempt: 1 }), None);
        assert_eq!(handler.on_event(ChannelEvent::ReconnectError), None);
        assert!(handler.store().snapshot().socket().reconnect_error);

        // Reopen after a drop: resync, error flag cleared.
        assert_eq!(handler.on_event(ChannelEvent::Open), Some(ChannelAction::Resync));
        assert_eq!(handler.state(), ChannelState::Connected);
        assert!(!handler.store().snapshot().socket().reconnect_error);
        assert!(handler.store().snapshot().tournament("a").is_some());
    }

    #[test]
    fn open_with_loaded_replica_needs_no_resync() {
        let handler = loaded_handler();
        assert_eq!(handler.on_event(ChannelEvent::Open), None);
    }

    #[test]
    fn open_after_failed_first_connect_resyncs() {
        let handler = loaded_handler();
        assert_eq!(handler.on_event(ChannelEvent::Error), None);
        assert_eq!(handler.on_event(ChannelEvent::Reconnect { attempt: 1 }), None);
        assert_eq!(handler.on_event(ChannelEvent::Open), Some(ChannelAction::Resync));

        // The flag is consumed by the open.
        assert_eq!(handler.on_event(ChannelEvent::Open), None);
    }

    #[test]
    fn gave_up_is_terminal() {
        let handler = ChannelHandler::new(Arc::new(DataStore::new()));
        let _ = handler.on_event(ChannelEvent::GaveUp);
        assert_eq!(handler.state(), ChannelState::Failed);
        assert!(handler.store().snapshot().socket().reconnect_error);
    }
}
