// ── Controller ──
//
// Full lifecycle of one replica: initial snapshot fetches, the push
// channel bridge, on-demand resynchronization and periodic refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use arrowcast_api::{ApiClient, PushHandle, PushMessage, ReconnectConfig};

use crate::channel::{ChannelAction, ChannelHandler, ChannelState};
use crate::config::ReplicaConfig;
use crate::convert::decode_user;
use crate::error::CoreError;
use crate::store::{Applied, DataStore, Replica};
use crate::stream::ReplicaStream;

// ── Controller ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the store, the
/// HTTP client, the push-channel connection and the background tasks.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ReplicaConfig,
    store: Arc<DataStore>,
    handler: ChannelHandler,
    cancel: CancellationToken,
    client: Mutex<Option<ApiClient>>,
    push: Mutex<Option<PushHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller. Does NOT connect; call
    /// [`connect()`](Self::connect) to fetch snapshots and start syncing.
    pub fn new(config: ReplicaConfig) -> Self {
        let store = Arc::new(DataStore::new());
        let handler = ChannelHandler::new(Arc::clone(&store));
        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                handler,
                cancel: CancellationToken::new(),
                client: Mutex::new(None),
                push: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ReplicaConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn handler(&self) -> &ChannelHandler {
        &self.inner.handler
    }

    /// The current replica.
    pub fn replica(&self) -> Arc<Replica> {
        self.inner.store.snapshot()
    }

    pub fn subscribe(&self) -> ReplicaStream {
        self.inner.store.subscribe()
    }

    /// Subscribe to push-channel connectivity changes.
    pub fn channel_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.handler.subscribe_state()
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Fetch the initial snapshots, then start the push channel and the
    /// periodic refresh task.
    ///
    /// Returns once the tournament snapshot has been applied, so callers
    /// can read the replica immediately.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let client = ApiClient::new(config.url.clone(), config.timeout)?;
        *self.inner.client.lock().await = Some(client.clone());

        self.full_refresh().await?;

        let mut handles = self.inner.task_handles.lock().await;

        if config.websocket_enabled {
            let url = client.push_url(&config.push_path)?;
            info!(url = %url, "starting push channel");
            let push = PushHandle::connect(
                url,
                ReconnectConfig::from(&config.reconnect),
                self.inner.cancel.child_token(),
            );
            let rx = push.subscribe();
            *self.inner.push.lock().await = Some(push);

            let ctrl = self.clone();
            handles.push(tokio::spawn(bridge_task(ctrl, rx)));
        }

        let interval_secs = config.refresh_interval_secs;
        if interval_secs > 0 {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(refresh_task(ctrl, interval_secs, cancel)));
        }

        info!(
            tournaments = self.inner.store.snapshot().tournament_count(),
            "replica connected"
        );
        Ok(())
    }

    /// Stop background tasks and the push channel. Replica data is kept.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();
        if let Some(push) = self.inner.push.lock().await.take() {
            push.shutdown();
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        let _ = self.inner.store.set_connection_state(false);
        debug!("disconnected");
    }

    /// Wait until a full tournament snapshot has been applied.
    ///
    /// Resolves immediately when the replica is already loaded.
    pub async fn wait_until_loaded(&self, timeout: Duration) -> Result<Arc<Replica>, CoreError> {
        let mut stream = self.inner.store.subscribe();
        match tokio::time::timeout(timeout, stream.wait_for(Replica::is_loaded)).await {
            Ok(Some(replica)) => Ok(replica),
            Ok(None) => Err(CoreError::Internal("replica store dropped".into())),
            Err(_) => Err(CoreError::Fetch {
                message: format!("no tournament snapshot within {timeout:?}"),
                status: None,
                transient: true,
            }),
        }
    }

    // ── Snapshot fetches ─────────────────────────────────────────────

    async fn client(&self) -> Result<ApiClient, CoreError> {
        self.inner
            .client
            .lock()
            .await
            .clone()
            .ok_or_else(|| CoreError::Internal("controller is not connected".into()))
    }

    /// Fetch tournaments, then user, people and stats in parallel.
    ///
    /// Only the tournament snapshot is required; the others are logged and
    /// skipped on failure, leaving their loaded state untouched.
    pub async fn full_refresh(&self) -> Result<(), CoreError> {
        self.resync().await?;

        let (user, people, stats) = tokio::join!(
            self.refresh_user(),
            self.refresh_people(),
            self.refresh_stats(),
        );
        for (what, result) in [("user", user), ("people", people), ("stats", stats)] {
            if let Err(e) = result {
                warn!(resource = what, error = %e, "snapshot fetch failed");
            }
        }
        Ok(())
    }

    /// Re-fetch the full tournament snapshot and replace the replica's
    /// tournaments with it.
    pub async fn resync(&self) -> Result<Applied, CoreError> {
        let client = self.client().await?;
        let list = client.tournaments().await.map_err(|e| {
            warn!(error = %e, "tournament snapshot fetch failed");
            CoreError::from(e)
        })?;
        let applied = self
            .inner
            .store
            .replace_all(list.tournaments.into_vec(), None)?;
        debug!(
            tournaments = self.inner.store.snapshot().tournament_count(),
            "tournament snapshot applied"
        );
        Ok(applied)
    }

    pub async fn refresh_user(&self) -> Result<Applied, CoreError> {
        let raw = self.client().await?.user().await?;
        self.inner.store.set_user(decode_user(raw)?)
    }

    pub async fn refresh_people(&self) -> Result<Applied, CoreError> {
        let list = self.client().await?.people().await?;
        self.inner.store.set_people(list.people)
    }

    pub async fn refresh_stats(&self) -> Result<Applied, CoreError> {
        let raw = self.client().await?.stats().await?;
        self.inner.store.set_stats(raw)
    }

    /// Fetch the credits roll for one tournament.
    pub async fn fetch_credits(&self, tournament: &str) -> Result<Applied, CoreError> {
        let id = self.inner.store.resolve(tournament)?;
        let raw = self.client().await?.credits(id.as_str()).await?;
        self.inner.store.set_credits(id.as_str(), raw)
    }

    /// Drop the current user's privileges locally.
    pub fn logout(&self) -> Result<Applied, CoreError> {
        self.inner.store.logout()
    }

    // ── One-shot convenience ─────────────────────────────────────────

    /// Connect without the push channel or periodic refresh, run `f`,
    /// disconnect.
    pub async fn oneshot<F, Fut, T>(config: ReplicaConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.websocket_enabled = false;
        cfg.refresh_interval_secs = 0;

        let controller = Controller::new(cfg);
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Feed push-channel traffic into the handler, resyncing when asked to.
async fn bridge_task(controller: Controller, mut rx: broadcast::Receiver<PushMessage>) {
    let cancel = controller.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = rx.recv() => {
                match msg {
                    Ok(PushMessage::Envelope(envelope)) => {
                        if let Err(e) = controller.inner.handler.handle_envelope(&envelope) {
                            error!(kind = %envelope.kind, error = %e, "failed to apply update");
                        }
                    }
                    Ok(PushMessage::Lifecycle(event)) => {
                        if controller.inner.handler.on_event(event) == Some(ChannelAction::Resync) {
                            if let Err(e) = controller.resync().await {
                                warn!(error = %e, "resync after reconnect failed");
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "push bridge lagged, resyncing");
                        if let Err(e) = controller.resync().await {
                            warn!(error = %e, "resync after lag failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

/// Periodically re-fetch the tournament snapshot.
async fn refresh_task(controller: Controller, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.resync().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
