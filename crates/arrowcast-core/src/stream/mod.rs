// ── Reactive replica streams ──
//
// Subscription types for consuming replica changes from the DataStore.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::Replica;

pub use filter::TournamentFilter;

/// A subscription to the replica.
///
/// Provides both point-in-time snapshot access and change notification
/// via `changed()` or by converting to a `Stream`. Every snapshot handed
/// out is a complete replica; partial mutations are never observable.
pub struct ReplicaStream {
    current: Arc<Replica>,
    receiver: watch::Receiver<Arc<Replica>>,
}

impl ReplicaStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Replica>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation time or at the last `changed()`.
    pub fn current(&self) -> &Arc<Replica> {
        &self.current
    }

    /// Latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<Replica> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published replica.
    /// Returns `None` if the `DataStore` has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Replica>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Wait until a published replica satisfies `predicate`, checking the
    /// current one first.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&Replica) -> bool,
    ) -> Option<Arc<Replica>> {
        let snap = self
            .receiver
            .wait_for(|replica| predicate(&**replica))
            .await
            .ok()?
            .clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> ReplicaWatchStream {
        ReplicaWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current replica immediately, then one per publication.
/// Publications that land between polls are coalesced.
pub struct ReplicaWatchStream {
    inner: WatchStream<Arc<Replica>>,
}

impl Stream for ReplicaWatchStream {
    type Item = Arc<Replica>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::DataStore;
    use crate::model::Person;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn changed_tracks_publications() {
        let store = DataStore::new();
        let mut stream = store.subscribe();
        assert!(!stream.current().is_user_loaded());

        let _ = store.set_user(Person::default()).unwrap();
        let snap = stream.changed().await.unwrap();
        assert!(snap.is_user_loaded());
        assert!(stream.current().is_user_loaded());
    }

    #[tokio::test]
    async fn unchanged_mutations_do_not_notify() {
        let store = DataStore::new();
        let mut stream = store.subscribe();

        let _ = store.set_connection_state(false).unwrap();
        let _ = store.set_connection_state(true).unwrap();
        let snap = stream.changed().await.unwrap();
        assert!(snap.is_connected());
        assert!(!stream.receiver.has_changed().unwrap());
    }

    #[tokio::test]
    async fn wait_for_sees_current_value() {
        let store = DataStore::new();
        let _ = store.replace_all(vec![], None).unwrap();
        let mut stream = store.subscribe();
        let snap = stream.wait_for(Replica::is_loaded).await.unwrap();
        assert!(snap.is_loaded());
    }

    #[tokio::test]
    async fn into_stream_yields_current_then_updates() {
        let store = DataStore::new();
        let mut stream = store.subscribe().into_stream();

        let first = stream.next().await.unwrap();
        assert!(!first.is_loaded());

        let _ = store.replace_all(vec![], None).unwrap();
        let second = stream.next().await.unwrap();
        assert!(second.is_loaded());
    }

    #[tokio::test]
    async fn changed_returns_none_after_store_drop() {
        let store = DataStore::new();
        let mut stream = store.subscribe();
        drop(store);
        assert!(stream.changed().await.is_none());
    }
}
