//! Push-channel transport with auto-reconnect.
//!
//! Connects to the bracket server's update endpoint and streams parsed
//! [`Envelope`]s through a [`tokio::sync::broadcast`] channel, interleaved
//! with [`ChannelEvent`] lifecycle notifications. Reconnection uses
//! exponential backoff + jitter.
//!
//! # Example
//!
//! ```rust,ignore
//! use arrowcast_api::websocket::{PushHandle, PushMessage, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let url = Url::parse("wss://bracket.example/api/auto-updater")?;
//!
//! let handle = PushHandle::connect(url, ReconnectConfig::default(), cancel.clone());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(msg) = rx.recv().await {
//!     if let PushMessage::Envelope(env) = msg {
//!         println!("{}", env.kind);
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::wire::Envelope;

const MESSAGE_CHANNEL_CAPACITY: usize = 1024;

// ── Messages ─────────────────────────────────────────────────────────

/// Lifecycle notifications emitted by the push transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// A connection was established.
    Open,
    /// The connection ended, cleanly or not.
    Close,
    /// A transport error occurred on a live connection.
    Error,
    /// A reconnection attempt is starting (1-based).
    Reconnect { attempt: u32 },
    /// A reconnection attempt failed.
    ReconnectError,
    /// The retry limit was reached; no further attempts will be made.
    GaveUp,
}

/// Everything a subscriber receives from the push transport.
#[derive(Debug, Clone)]
pub enum PushMessage {
    Lifecycle(ChannelEvent),
    Envelope(Arc<Envelope>),
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for push-channel reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── PushHandle ───────────────────────────────────────────────────────

/// Handle to a running push-channel connection.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`connect`](Self::connect)) to tear down the background task.
pub struct PushHandle {
    tx: broadcast::Sender<PushMessage>,
    cancel: CancellationToken,
}

impl PushHandle {
    /// Spawn the connection loop. Returns immediately; the first
    /// connection attempt happens in the background.
    pub fn connect(url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (tx, _rx) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);

        let task_tx = tx.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            push_loop(url, task_tx, reconnect, task_cancel).await;
        });

        Self { tx, cancel }
    }

    /// Get a new receiver. Messages sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<PushMessage> {
        self.tx.subscribe()
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// connect → read → on drop, backoff → reconnect.
async fn push_loop(
    url: Url,
    tx: broadcast::Sender<PushMessage>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    // Reconnection attempts since the last successful connection.
    let mut attempt: u32 = 0;
    let mut reconnecting = false;

    while !cancel.is_cancelled() {
        if reconnecting {
            if let Some(max) = reconnect.max_retries {
                if attempt >= max {
                    tracing::error!(max_retries = max, "push channel retry limit reached, giving up");
                    emit(&tx, ChannelEvent::GaveUp);
                    break;
                }
            }

            let delay = calculate_backoff(attempt, &reconnect);
            attempt += 1;
            tracing::info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "waiting before reconnect"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
            emit(&tx, ChannelEvent::Reconnect { attempt });
        }

        let stream = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect(&url) => result,
        };

        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, attempt, "push channel connect failed");
                emit(
                    &tx,
                    if reconnecting { ChannelEvent::ReconnectError } else { ChannelEvent::Error },
                );
                reconnecting = true;
                continue;
            }
        };

        attempt = 0;
        emit(&tx, ChannelEvent::Open);

        if let Err(e) = read_until_closed(stream, &tx, &cancel).await {
            tracing::warn!(error = %e, "push channel error");
            emit(&tx, ChannelEvent::Error);
        }
        emit(&tx, ChannelEvent::Close);
        reconnecting = true;
    }

    tracing::debug!("push loop exiting");
}

type PushStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(url: &Url) -> Result<PushStream, Error> {
    tracing::info!(url = %url, "connecting to push channel");
    let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
    tracing::info!("push channel connected");
    Ok(stream)
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Read frames until the connection drops. `Ok` means a clean close.
async fn read_until_closed(
    stream: PushStream,
    tx: &broadcast::Sender<PushMessage>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let (_write, mut read) = stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        parse_and_broadcast(&text, tx);
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        return match frame {
                            Some(cf) if cf.code != tungstenite::protocol::frame::coding::CloseCode::Normal => {
                                Err(Error::WebSocketClosed {
                                    code: u16::from(cf.code),
                                    reason: cf.reason.to_string(),
                                })
                            }
                            _ => Ok(()),
                        };
                    }
                    Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                    None => {
                        tracing::info!("push stream ended");
                        return Ok(());
                    }
                    // Binary, Ping, Pong, Frame -- tungstenite answers pings itself
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

fn emit(tx: &broadcast::Sender<PushMessage>, event: ChannelEvent) {
    tracing::debug!(?event, "push channel lifecycle");
    // No subscribers is fine.
    let _ = tx.send(PushMessage::Lifecycle(event));
}

/// Parse one text frame and broadcast the envelope. Malformed frames are
/// logged and dropped.
fn parse_and_broadcast(text: &str, tx: &broadcast::Sender<PushMessage>) {
    match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) => {
            tracing::trace!(kind = %envelope.kind, "push envelope");
            let _ = tx.send(PushMessage::Envelope(Arc::new(envelope)));
        }
        Err(e) => tracing::debug!(error = %e, "failed to parse push envelope"),
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}
