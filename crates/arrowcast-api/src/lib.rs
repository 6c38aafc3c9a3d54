//! Transport layer for a live tournament-bracket server.
//!
//! - [`client::ApiClient`] fetches complete snapshots over HTTP.
//! - [`websocket::PushHandle`] streams tagged update envelopes with
//!   automatic reconnection.
//! - [`wire`] holds the loosely-typed records both surfaces carry.
//!
//! Nothing here interprets the data; `arrowcast-core` owns decoding,
//! the replica store and derived views.

pub mod client;
pub mod error;
pub mod websocket;
pub mod wire;

pub use client::ApiClient;
pub use error::Error;
pub use websocket::{ChannelEvent, PushHandle, PushMessage, ReconnectConfig};
pub use wire::Envelope;
