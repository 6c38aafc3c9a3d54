//! Client-side replica of a live tournament bracket.
//!
//! This crate mirrors server-authoritative tournament data and derives
//! everything a view needs from it:
//!
//! - **[`Controller`]**: lifecycle facade. [`connect()`](Controller::connect)
//!   fetches the initial snapshots, then bridges the push channel into the
//!   store and resynchronizes after reconnects.
//!
//! - **[`DataStore`]**: copy-on-write [`Replica`] published through a
//!   `tokio::sync::watch` channel. Mutations are named, serialized and
//!   atomic; readers never observe a partial update.
//!
//! - **[`ReplicaStream`]**: subscription handle exposing
//!   `current()` / `latest()` / `changed()` for reactive consumers.
//!
//! - **[`ChannelHandler`]**: decodes push envelopes into [`Update`]s and
//!   routes each to exactly one store mutation; tracks connectivity.
//!
//! - **Domain model** ([`model`]): typed tournaments, matches, players and
//!   people with derived accessors (current match, chart data, lifecycle
//!   predicates) computed on read.
//!
//! - **[`Countdown`] / [`Clock`]**: cosmetic one-second tickers.

pub mod channel;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod model;
pub mod store;
pub mod stream;
pub mod timer;

// ── Primary re-exports ──────────────────────────────────────────────
pub use channel::{ChannelAction, ChannelEvent, ChannelHandler, ChannelState, Update, UpdateKind};
pub use config::{ReconnectPolicy, ReplicaConfig};
pub use controller::Controller;
pub use error::CoreError;
pub use store::{Applied, DataStore, Replica, SocketState};
pub use stream::{ReplicaStream, TournamentFilter};
pub use timer::{Clock, Countdown};

pub use model::{
    Commit, Credits, Event, Match, MatchKind, MatchRef, Person, PersonStats, Player,
    PlayerSnapshot, PlayerState, PlayerSummary, Stats, Timestamp, Tournament, TournamentId,
    Userlevel,
};
