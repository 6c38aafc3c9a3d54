// ── Replica store ──
//
// Copy-on-write replica with push-based change notification.

mod data_store;
mod replica;

pub use data_store::DataStore;
pub use replica::{Applied, Replica, SocketState};
