// ── Countdown and clock ──
//
// Cosmetic tickers for views: a countdown to a scheduled start and a wall
// clock with UTC offset. Each owns at most one tick task; starting again
// aborts the previous one before spawning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

/// Tick period for both timers.
pub const TICK: Duration = Duration::from_millis(1000);

/// What a countdown shows before its first tick and once it has expired.
pub const COUNTDOWN_PLACEHOLDER: &str = "00:00";

/// What a clock shows before its first tick.
pub const CLOCK_PLACEHOLDER: &str = "00:00 (+02:00)";

type NowFn<Tz> = Arc<dyn Fn() -> DateTime<Tz> + Send + Sync>;

// ── Tick task slot ───────────────────────────────────────────────────

/// Holds the one running tick task of a timer.
#[derive(Default)]
struct TaskSlot(Mutex<Option<JoinHandle<()>>>);

impl TaskSlot {
    fn replace(&self, handle: JoinHandle<()>) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn abort(&self) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn is_running(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

fn ticker() -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

// ── Countdown ────────────────────────────────────────────────────────

/// Format a remaining duration as `[HH:]MM:SS`, hours only when non-zero.
///
/// Returns `None` once nothing remains.
pub fn format_remaining(remaining: TimeDelta) -> Option<String> {
    if remaining <= TimeDelta::zero() {
        return None;
    }
    let total = remaining.num_seconds();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    Some(if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    })
}

/// Time remaining until a target instant, refreshed once per [`TICK`].
///
/// Must be started from within a tokio runtime.
pub struct Countdown {
    now: NowFn<Utc>,
    time: watch::Sender<String>,
    ticks: Arc<AtomicU64>,
    task: TaskSlot,
}

impl Countdown {
    pub fn new() -> Self {
        Self::with_now(Utc::now)
    }

    /// Build a countdown reading the current time from `now`.
    pub fn with_now(now: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        let (time, _) = watch::channel(COUNTDOWN_PLACEHOLDER.to_owned());
        Self {
            now: Arc::new(now),
            time,
            ticks: Arc::new(AtomicU64::new(0)),
            task: TaskSlot::default(),
        }
    }

    /// Count down to `target`, replacing any countdown already running.
    pub fn start(&self, target: DateTime<Utc>) {
        let now = Arc::clone(&self.now);
        let time = self.time.clone();
        let ticks = Arc::clone(&self.ticks);

        let handle = tokio::spawn(async move {
            let mut interval = ticker();
            loop {
                interval.tick().await;
                ticks.fetch_add(1, Ordering::Relaxed);
                match format_remaining(target - now()) {
                    Some(text) => {
                        time.send_replace(text);
                    }
                    None => {
                        time.send_replace(COUNTDOWN_PLACEHOLDER.to_owned());
                        trace!("countdown expired");
                        break;
                    }
                }
            }
        });
        self.task.replace(handle);
    }

    /// Stop ticking. Safe to call when nothing is running.
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    /// The current formatted remaining time.
    pub fn time(&self) -> String {
        self.time.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.time.subscribe()
    }

    /// Ticks processed since construction, across restarts.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ── Clock ────────────────────────────────────────────────────────────

pub fn format_clock(at: DateTime<FixedOffset>) -> String {
    at.format("%H:%M (%:z)").to_string()
}

/// Wall-clock time with UTC offset, refreshed once per [`TICK`].
pub struct Clock {
    now: NowFn<FixedOffset>,
    time: watch::Sender<String>,
    task: TaskSlot,
}

impl Clock {
    /// A clock showing local time.
    pub fn new() -> Self {
        Self::with_now(|| Local::now().fixed_offset())
    }

    pub fn with_now(now: impl Fn() -> DateTime<FixedOffset> + Send + Sync + 'static) -> Self {
        let (time, _) = watch::channel(CLOCK_PLACEHOLDER.to_owned());
        Self {
            now: Arc::new(now),
            time,
            task: TaskSlot::default(),
        }
    }

    /// Start ticking, replacing any running tick task.
    pub fn start(&self) {
        let now = Arc::clone(&self.now);
        let time = self.time.clone();
        let handle = tokio::spawn(async move {
            let mut interval = ticker();
            loop {
                interval.tick().await;
                time.send_replace(format_clock(now()));
            }
        });
        self.task.replace(handle);
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    pub fn time(&self) -> String {
        self.time.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.time.subscribe()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    /// A `now` that follows tokio's (pausable) clock.
    fn paused_now(base: DateTime<Utc>) -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
        let origin = Instant::now();
        move || base + TimeDelta::from_std(origin.elapsed()).unwrap()
    }

    fn base() -> DateTime<Utc> {
        "2026-03-01T19:00:00Z".parse().unwrap()
    }

    #[test]
    fn remaining_formats() {
        assert_eq!(format_remaining(TimeDelta::seconds(65)).unwrap(), "01:05");
        assert_eq!(format_remaining(TimeDelta::seconds(3600 + 61)).unwrap(), "01:01:01");
        assert_eq!(format_remaining(TimeDelta::seconds(59)).unwrap(), "00:59");
        assert!(format_remaining(TimeDelta::zero()).is_none());
        assert!(format_remaining(TimeDelta::seconds(-3)).is_none());
    }

    #[test]
    fn clock_formats_with_offset() {
        let at = DateTime::parse_from_rfc3339("2026-03-01T21:07:00+02:00").unwrap();
        assert_eq!(format_clock(at), "21:07 (+02:00)");
        let at = DateTime::parse_from_rfc3339("2026-03-01T04:30:00-05:00").unwrap();
        assert_eq!(format_clock(at), "04:30 (-05:00)");
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_once_per_second() {
        let countdown = Countdown::with_now(paused_now(base()));
        assert_eq!(countdown.time(), COUNTDOWN_PLACEHOLDER);

        countdown.start(base() + TimeDelta::hours(1));
        sleep(Duration::from_millis(2500)).await;

        assert_eq!(countdown.ticks(), 2);
        assert_eq!(countdown.time(), "59:58");
        assert!(countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn starting_twice_leaves_one_timer() {
        let countdown = Countdown::with_now(paused_now(base()));
        countdown.start(base() + TimeDelta::hours(2));
        countdown.start(base() + TimeDelta::hours(1));

        sleep(Duration::from_millis(5500)).await;

        assert_eq!(countdown.ticks(), 5);
        assert_eq!(countdown.time(), "59:55");
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_stops_at_zero() {
        let countdown = Countdown::with_now(paused_now(base()));
        countdown.start(base() + TimeDelta::seconds(3));

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(countdown.time(), "00:02");

        sleep(Duration::from_secs(10)).await;
        assert_eq!(countdown.time(), COUNTDOWN_PLACEHOLDER);
        assert_eq!(countdown.ticks(), 3);
        assert!(!countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_in_the_past_expires_on_first_tick() {
        let countdown = Countdown::with_now(paused_now(base()));
        countdown.start(base() - TimeDelta::minutes(5));
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(countdown.time(), COUNTDOWN_PLACEHOLDER);
        assert_eq!(countdown.ticks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let countdown = Countdown::with_now(paused_now(base()));
        countdown.stop();
        countdown.start(base() + TimeDelta::hours(1));
        countdown.stop();
        countdown.stop();

        sleep(Duration::from_secs(3)).await;
        assert_eq!(countdown.ticks(), 0);
        assert!(!countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_updates() {
        let countdown = Countdown::with_now(paused_now(base()));
        let mut rx = countdown.subscribe();
        countdown.start(base() + TimeDelta::minutes(10));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "09:59");
    }

    #[tokio::test(start_paused = true)]
    async fn clock_ticks_and_restarts() {
        let at = DateTime::parse_from_rfc3339("2026-03-01T21:07:00+01:00").unwrap();
        let clock = Clock::with_now(move || at);
        assert_eq!(clock.time(), CLOCK_PLACEHOLDER);

        clock.start();
        clock.start();
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(clock.time(), "21:07 (+01:00)");
        assert!(clock.is_running());

        clock.stop();
        clock.stop();
        assert!(!clock.is_running());
    }
}
