// ── Canonical domain model ──
//
// Every type here is the typed, immutable-by-convention form of a record
// the bracket server sends. Construction goes through `crate::convert`;
// derived facts are methods computed on read.

pub mod credits;
pub mod event;
pub mod ids;
pub mod matches;
pub mod person;
pub mod player;
pub mod stats;
pub mod timestamp;
pub mod tournament;

// ── Re-exports ──────────────────────────────────────────────────────

pub use credits::Credits;
pub use event::Event;
pub use ids::{MatchRef, TournamentId};
pub use matches::{Commit, FINAL_LENGTH, MATCH_LENGTH, Match, MatchKind};
pub use person::{DEFAULT_COLOR, Person, Userlevel};
pub use player::{Player, PlayerState, PlayerSummary};
pub use stats::{PersonStats, PlayerSnapshot, Stats};
pub use timestamp::{Timestamp, UNSET_SENTINEL, is_unset};
pub use tournament::{RECENT_WINDOW, Tournament};
