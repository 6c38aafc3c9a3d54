// ── Wire-to-domain conversions ──
//
// Bridges loosely-typed `arrowcast_api::wire` records into canonical
// `arrowcast_core::model` types. Optional fields fall back to documented
// defaults; only structurally required identifiers (ids, match kinds,
// player persons) fail the decode. Every function here is pure.

use std::collections::{BTreeMap, HashSet};

use serde::de::DeserializeOwned;
use serde_json::Value;

use arrowcast_api::wire::{
    RawCommit, RawCredits, RawEvent, RawMatch, RawPerson, RawPersonStats, RawPlayer,
    RawPlayerSnapshot, RawPlayerState, RawPlayerSummary, RawStats, RawTournament,
};

use crate::error::CoreError;
use crate::model::stats::playtime_from_micros;
use crate::model::{
    Commit, Credits, Event, FINAL_LENGTH, MATCH_LENGTH, Match, MatchKind, Person, PersonStats,
    Player, PlayerSnapshot, PlayerState, PlayerSummary, Stats, Timestamp, Tournament,
    TournamentId,
};

// ── Helpers ────────────────────────────────────────────────────────

fn timestamp(raw: Option<&String>) -> Timestamp {
    Timestamp::parse(raw.map(String::as_str))
}

/// Zero lengths are the server's "not set".
fn length_or(raw: Option<u32>, default: u32) -> u32 {
    raw.filter(|l| *l > 0).unwrap_or(default)
}

fn required_id(raw: Option<String>, entity: &'static str) -> Result<String, CoreError> {
    raw.filter(|id| !id.is_empty())
        .ok_or_else(|| CoreError::decode(entity, "missing id"))
}

fn from_value<T: DeserializeOwned>(value: Value, entity: &'static str) -> Result<T, CoreError> {
    serde_json::from_value(value).map_err(|e| CoreError::decode(entity, e.to_string()))
}

// ── Person ─────────────────────────────────────────────────────────

impl TryFrom<RawPerson> for Person {
    type Error = CoreError;

    fn try_from(raw: RawPerson) -> Result<Self, Self::Error> {
        Ok(Person {
            id: required_id(raw.id, "person")?,
            name: raw.name.unwrap_or_default(),
            nick: raw.nick.unwrap_or_default(),
            color_preference: raw.color_preference,
            archer_type: raw.archer_type.unwrap_or_default(),
            facebook_id: raw.facebook_id,
            avatar_url: raw.avatar_url,
            userlevel: raw.userlevel.unwrap_or_default(),
            disabled: raw.disabled.unwrap_or_default(),
            authenticated: raw.session.is_some() || raw.authenticated == Some(true),
        })
    }
}

/// Decode the `/api/user/` response. An unauthenticated answer carries no
/// identity and becomes the anonymous user rather than an error.
pub fn decode_user(raw: RawPerson) -> Result<Person, CoreError> {
    if raw.id.as_deref().is_none_or(str::is_empty) && raw.authenticated != Some(true) {
        return Ok(Person {
            userlevel: raw.userlevel.unwrap_or_default(),
            ..Person::default()
        });
    }
    Person::try_from(raw)
}

// ── Players ────────────────────────────────────────────────────────

impl From<RawPlayerState> for PlayerState {
    fn from(raw: RawPlayerState) -> Self {
        PlayerState {
            index: raw.index,
            arrows: raw.arrows,
            shield: raw.shield,
            wings: raw.wings,
            hat: raw.hat,
            invisible: raw.invisible,
            speed: raw.speed,
            alive: raw.alive,
            lava: raw.lava,
            killer: raw.killer,
        }
    }
}

impl TryFrom<RawPlayer> for Player {
    type Error = CoreError;

    fn try_from(raw: RawPlayer) -> Result<Self, Self::Error> {
        let person = raw
            .person
            .ok_or_else(|| CoreError::decode("player", "missing person"))
            .and_then(Person::try_from)?;

        let preferred_color = raw
            .preferred_color
            .unwrap_or_else(|| person.color().to_owned());
        Ok(Player {
            nick: raw.nick.unwrap_or_else(|| person.nick.clone()),
            color: raw.color.unwrap_or_else(|| preferred_color.clone()),
            preferred_color,
            archer_type: raw.archer_type,
            shots: raw.shots,
            sweeps: raw.sweeps,
            kills: raw.kills,
            self_kills: raw.self_kills,
            match_score: raw.match_score,
            total_score: raw.total_score,
            state: raw.state.map(PlayerState::from).unwrap_or_default(),
            person,
        })
    }
}

/// A bare player wrapping `person`, as referenced from event items.
fn player_for(person: Person) -> Player {
    Player {
        nick: person.nick.clone(),
        color: person.color().to_owned(),
        preferred_color: person.color().to_owned(),
        archer_type: person.archer_type,
        shots: 0,
        sweeps: 0,
        kills: 0,
        self_kills: 0,
        match_score: 0,
        total_score: 0,
        state: PlayerState::default(),
        person,
    }
}

impl TryFrom<RawPlayerSummary> for PlayerSummary {
    type Error = CoreError;

    fn try_from(raw: RawPlayerSummary) -> Result<Self, Self::Error> {
        let person = raw.person.map(Person::try_from).transpose()?;
        let person_id = match raw.person_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => person
                .as_ref()
                .map(|p| p.id.clone())
                .ok_or_else(|| CoreError::decode("player summary", "missing person id"))?,
        };

        Ok(PlayerSummary {
            person_id,
            person,
            shots: raw.shots,
            sweeps: raw.sweeps,
            kills: raw.kills,
            self_kills: raw.self_kills,
            matches: raw.matches,
            score: raw.score,
            skill_score: raw.skill_score,
        })
    }
}

pub fn decode_summaries(raw: Vec<RawPlayerSummary>) -> Result<Vec<PlayerSummary>, CoreError> {
    raw.into_iter().map(PlayerSummary::try_from).collect()
}

// ── Events ─────────────────────────────────────────────────────────

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        let items = raw.items.unwrap_or_default();
        let player = items
            .get("person")
            .cloned()
            .and_then(|value| serde_json::from_value::<RawPerson>(value).ok())
            .and_then(|person| Person::try_from(person).ok())
            .map(player_for);

        Event {
            time: timestamp(raw.time.as_ref()),
            kind: raw.kind.unwrap_or_default(),
            message: raw.message.unwrap_or_default(),
            items,
            player,
        }
    }
}

/// The server occasionally sends `null` entries in event lists.
fn decode_events(raw: Vec<Option<RawEvent>>) -> Vec<Event> {
    raw.into_iter().flatten().map(Event::from).collect()
}

// ── Matches ────────────────────────────────────────────────────────

impl From<RawCommit> for Commit {
    fn from(raw: RawCommit) -> Self {
        Commit {
            kills: raw
                .kills
                .into_iter()
                .map(|k| [k.first().copied().unwrap_or(0), k.get(1).copied().unwrap_or(0)])
                .collect(),
            shots: raw.shots,
            committed: timestamp(raw.committed.as_ref()),
        }
    }
}

/// Decode a match. The back-reference is the tournament it was found in
/// when there is one, since the record's own field may carry a database
/// id; a standalone record falls back to that field. `position` stands
/// in for a missing index.
pub fn decode_match(
    raw: RawMatch,
    owner: Option<&TournamentId>,
    position: usize,
) -> Result<Match, CoreError> {
    let tournament = owner
        .cloned()
        .or_else(|| raw.tournament.map(TournamentId::from))
        .ok_or_else(|| CoreError::decode("match", "missing tournament reference"))?;

    let kind_name = raw
        .kind
        .ok_or_else(|| CoreError::decode("match", "missing kind"))?;
    let kind: MatchKind = kind_name
        .parse()
        .map_err(|_| CoreError::decode("match", format!("unknown kind {kind_name:?}")))?;

    let players = raw
        .players
        .into_iter()
        .map(Player::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let mut seen = HashSet::with_capacity(players.len());
    for player in &players {
        if !seen.insert(player.person_id()) {
            return Err(CoreError::decode(
                "match",
                format!("player {} appears twice", player.person_id()),
            ));
        }
    }

    Ok(Match {
        tournament,
        index: raw.index.unwrap_or(position),
        kind,
        length: length_or(raw.length, MATCH_LENGTH),
        scheduled: timestamp(raw.scheduled.as_ref()),
        started: timestamp(raw.started.as_ref()),
        ended: timestamp(raw.ended.as_ref()),
        commits: raw.commits.into_iter().map(Commit::from).collect(),
        events: decode_events(raw.events),
        level: raw.level.filter(|l| !l.is_empty()),
        players,
    })
}

/// Decode a match list belonging to `owner`.
pub fn decode_matches(raw: Vec<RawMatch>, owner: &TournamentId) -> Result<Vec<Match>, CoreError> {
    raw.into_iter()
        .enumerate()
        .map(|(position, m)| decode_match(m, Some(owner), position))
        .collect()
}

impl TryFrom<RawMatch> for Match {
    type Error = CoreError;

    fn try_from(raw: RawMatch) -> Result<Self, Self::Error> {
        let position = raw.index.unwrap_or_default();
        decode_match(raw, None, position)
    }
}

// ── Tournament ─────────────────────────────────────────────────────

impl TryFrom<RawTournament> for Tournament {
    type Error = CoreError;

    fn try_from(raw: RawTournament) -> Result<Self, Self::Error> {
        let id = TournamentId::from(required_id(raw.id, "tournament")?);
        let matches = decode_matches(raw.matches, &id)?;

        Ok(Tournament {
            dbid: raw.dbid,
            name: raw.name.unwrap_or_default(),
            color: raw.color.unwrap_or_default(),
            cover: raw.cover.unwrap_or_default(),
            opened: timestamp(raw.opened.as_ref()),
            scheduled: timestamp(raw.scheduled.as_ref()),
            started: timestamp(raw.started.as_ref()),
            qualifying_end: timestamp(raw.qualifying_end.as_ref()),
            ended: timestamp(raw.ended.as_ref()),
            length: length_or(raw.length, MATCH_LENGTH),
            final_length: length_or(raw.final_length, FINAL_LENGTH),
            matches,
            players: decode_summaries(raw.players)?,
            casters: decode_people(raw.casters)?,
            runnerups: decode_people(raw.runnerups)?,
            events: decode_events(raw.events),
            id,
        })
    }
}

// ── Stats, people, credits ─────────────────────────────────────────

impl From<RawPlayerSnapshot> for PlayerSnapshot {
    fn from(raw: RawPlayerSnapshot) -> Self {
        PlayerSnapshot {
            shots: raw.shots,
            sweeps: raw.sweeps,
            kills: raw.kills,
            self_kills: raw.self_kills,
            matches: raw.matches,
            rounds: raw.rounds,
            score: raw.score,
            playtime: playtime_from_micros(raw.playtime),
            wins: raw.wins,
        }
    }
}

impl TryFrom<RawPersonStats> for PersonStats {
    type Error = CoreError;

    fn try_from(raw: RawPersonStats) -> Result<Self, Self::Error> {
        Ok(PersonStats {
            person: raw.person.map(Person::try_from).transpose()?,
            total: raw.total.map(PlayerSnapshot::from).unwrap_or_default(),
            rank: raw.rank,
            tournaments: raw
                .tournaments
                .unwrap_or_default()
                .into_iter()
                .map(|(tid, snapshot)| (tid, PlayerSnapshot::from(snapshot)))
                .collect(),
        })
    }
}

impl TryFrom<RawStats> for Stats {
    type Error = CoreError;

    fn try_from(raw: RawStats) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(id, stats)| Ok((id, PersonStats::try_from(stats)?)))
            .collect::<Result<BTreeMap<_, _>, CoreError>>()
            .map(Stats)
    }
}

pub fn decode_people(raw: Vec<RawPerson>) -> Result<Vec<Person>, CoreError> {
    raw.into_iter().map(Person::try_from).collect()
}

impl TryFrom<RawCredits> for Credits {
    type Error = CoreError;

    fn try_from(raw: RawCredits) -> Result<Self, Self::Error> {
        Ok(Credits {
            executive: raw.executive.map(Person::try_from).transpose()?,
            producers: decode_people(raw.producers)?,
            players: decode_people(raw.players)?,
            archers_harmed: raw.archers_harmed,
        })
    }
}

// ── Loosely-typed entry points ─────────────────────────────────────
//
// For callers holding a `serde_json::Value` (push payloads, fixtures).

pub fn decode_person(value: Value) -> Result<Person, CoreError> {
    Person::try_from(from_value::<RawPerson>(value, "person")?)
}

pub fn decode_player(value: Value) -> Result<Player, CoreError> {
    Player::try_from(from_value::<RawPlayer>(value, "player")?)
}

pub fn decode_tournament(value: Value) -> Result<Tournament, CoreError> {
    Tournament::try_from(from_value::<RawTournament>(value, "tournament")?)
}

pub fn decode_match_value(value: Value) -> Result<Match, CoreError> {
    Match::try_from(from_value::<RawMatch>(value, "match")?)
}

pub fn decode_stats(value: Value) -> Result<Stats, CoreError> {
    Stats::try_from(from_value::<RawStats>(value, "stats")?)
}

pub fn decode_credits(value: Value) -> Result<Credits, CoreError> {
    Credits::try_from(from_value::<RawCredits>(value, "credits")?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_tournament() -> Value {
        json!({
            "id": "df-1",
            "dbid": 7,
            "name": "DrunkenFall 2026: Spring Fling",
            "color": "green",
            "opened": "2026-03-01T18:00:00Z",
            "scheduled": "2026-03-01T19:00:00Z",
            "started": "2026-03-01T19:05:00Z",
            "ended": "0001-01-01T00:00:00Z",
            "players": [
                {"person_id": "1", "kills": 12, "self": 1, "score": 40},
                {"person": {"id": "2", "nick": "two"}, "kills": 3}
            ],
            "casters": [{"id": "9", "nick": "caster"}],
            "events": [
                null,
                {"time": "2026-03-01T19:05:00Z", "kind": "started",
                 "message": "{nick} started it", "items": {"nick": "judge"}}
            ],
            "matches": [
                {
                    "index": 0,
                    "kind": "playoff",
                    "length": 0,
                    "started": "2026-03-01T19:10:00Z",
                    "ended": "2026-03-01T19:20:00Z",
                    "players": [
                        {"person": {"id": "1", "nick": "one", "color_preference": ["red"]}, "kills": 10},
                        {"person": {"id": "2", "nick": "two"}, "kills": 4,
                         "state": {"arrows": [1, 2], "alive": true}}
                    ],
                    "commits": [{"kills": [[2, 0], [1, 1]], "shots": [true, false]}],
                    "events": [
                        {"time": "2026-03-01T19:12:00Z", "kind": "kill",
                         "message": "{killer} shot",
                         "items": {"killer": "one", "person": {"id": "1", "nick": "one"}}}
                    ]
                },
                {"index": 1, "kind": "playoff", "players": null, "started": null},
                {"index": 2, "kind": "semi"},
                {"index": 3, "kind": "final"}
            ]
        })
    }

    #[test]
    fn decodes_nested_tournament() {
        let t = decode_tournament(raw_tournament()).unwrap();

        assert_eq!(t.id.as_str(), "df-1");
        assert_eq!(t.dbid, Some(7));
        assert!(t.is_started());
        assert!(!t.is_ended());
        assert_eq!(t.length, MATCH_LENGTH);
        assert_eq!(t.final_length, FINAL_LENGTH);
        assert!(t.runnerups.is_empty());
        assert_eq!(t.players[1].person_id, "2");
        assert_eq!(t.events.len(), 1);

        let m = &t.matches[0];
        assert_eq!(m.tournament, t.id);
        assert_eq!(m.length, MATCH_LENGTH);
        assert_eq!(m.players[0].color, "red");
        assert_eq!(m.players[1].color, "white");
        assert!(m.players[1].state.alive);
        assert_eq!(m.commits[0].kills, vec![[2, 0], [1, 1]]);
        assert!(m.events[0].has_player());

        assert_eq!(t.current_match().unwrap().index, 1);
        assert_eq!(t.event_log().len(), 2);
    }

    #[test]
    fn canonical_form_round_trips() {
        let t = decode_tournament(raw_tournament()).unwrap();
        let again = decode_tournament(serde_json::to_value(&t).unwrap()).unwrap();
        assert_eq!(t, again);
    }

    #[test]
    fn tournament_without_id_fails() {
        let err = decode_tournament(json!({"name": "nameless"})).unwrap_err();
        assert!(matches!(err, CoreError::Decode { entity: "tournament", .. }));
    }

    #[test]
    fn unknown_match_kind_fails() {
        let err = decode_match_value(json!({"tournament": "df-1", "kind": "bonus"})).unwrap_err();
        assert!(matches!(err, CoreError::Decode { entity: "match", .. }));
    }

    #[test]
    fn orphan_match_fails() {
        let err = decode_match_value(json!({"index": 0, "kind": "final"})).unwrap_err();
        assert!(matches!(err, CoreError::Decode { entity: "match", .. }));
    }

    #[test]
    fn owner_wins_over_database_id_backref() {
        let mut value = raw_tournament();
        value["matches"][0]["tournament"] = json!(7);
        let t = decode_tournament(value).unwrap();
        assert_eq!(t.matches[0].tournament.as_str(), "df-1");

        let listed: Vec<RawMatch> = serde_json::from_value(json!([
            {"tournament": 7, "index": 0, "kind": "playoff"}
        ]))
        .unwrap();
        let owner = TournamentId::new("df-1");
        let matches = decode_matches(listed, &owner).unwrap();
        assert_eq!(matches[0].tournament, owner);

        // Standalone records keep their own reference.
        let m = decode_match_value(json!({"tournament": 7, "kind": "final"})).unwrap();
        assert_eq!(m.tournament.as_str(), "7");
    }

    #[test]
    fn duplicate_players_fail() {
        let err = decode_match_value(json!({
            "tournament": "df-1",
            "kind": "playoff",
            "players": [{"person": {"id": "1"}}, {"person": {"id": "1"}}]
        }))
        .unwrap_err();
        assert!(matches!(err, CoreError::Decode { .. }));
    }

    #[test]
    fn player_without_person_fails() {
        let err = decode_player(json!({"kills": 3})).unwrap_err();
        assert!(matches!(err, CoreError::Decode { entity: "player", .. }));
    }

    #[test]
    fn anonymous_user() {
        let user = decode_user(serde_json::from_value(json!({"authenticated": false})).unwrap())
            .unwrap();
        assert!(!user.authenticated);
        assert!(!user.is_player());

        let user = decode_user(
            serde_json::from_value(json!({"id": "1", "session": "x", "userlevel": 50})).unwrap(),
        )
        .unwrap();
        assert!(user.authenticated);
        assert!(user.is_commentator());
    }

    #[test]
    fn stats_convert_playtime() {
        let stats = decode_stats(json!({
            "1": {"total": {"playtime": 2_500_000}, "rank": 4,
                  "tournaments": {"df-1": {"kills": 3}, "df-2": {}}}
        }))
        .unwrap();
        let entry = stats.get("1").unwrap();
        assert_eq!(entry.total.playtime, std::time::Duration::from_millis(2500));
        assert_eq!(entry.participated(), 2);
    }

    #[test]
    fn credits() {
        let credits = decode_credits(json!({
            "executive": {"id": "1"},
            "producers": [{"id": "2"}, {"id": "3"}],
            "archers_harmed": 77
        }))
        .unwrap();
        assert_eq!(credits.producers.len(), 2);
        assert!(credits.players.is_empty());
        assert_eq!(credits.archers_harmed, 77);
    }
}
