//! Live follow mode.
//!
//! Connects with the push channel enabled and prints one status line per
//! visible change of the followed tournament until Ctrl-C. Before the
//! tournament starts, a countdown to its scheduled time is shown instead.

use chrono::Utc;
use tracing::{debug, warn};

use arrowcast_core::{
    ChannelState, Clock, Controller, Countdown, Replica, Tournament, TournamentId,
};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;

// ── Status lines ────────────────────────────────────────────────────

/// What the followed tournament is doing right now.
fn status_line(t: &Tournament) -> String {
    if t.is_ended() {
        return format!("{}: complete", t.name);
    }
    if !t.is_started() {
        return format!("{}: not started", t.name);
    }
    match t.current_match() {
        Some(m) if m.is_running() => {
            let scores = m
                .players
                .iter()
                .map(|p| format!("{} {}", p.display_name(), p.kills))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}: {} round {} | {scores}", t.name, m.title(), m.round())
        }
        Some(m) => format!("{}: between matches, next up {}", t.name, m.title()),
        None => format!("{}: waiting for results", t.name),
    }
}

fn connection_line(state: ChannelState) -> String {
    match state {
        ChannelState::Connected => "live updates connected".into(),
        ChannelState::Disconnected => "live updates disconnected".into(),
        ChannelState::Reconnecting { attempt } => format!("reconnecting (attempt {attempt})"),
        ChannelState::Failed => "live updates unavailable, showing last known state".into(),
    }
}

/// Pick the tournament to follow: the requested one, else the running one.
fn target(replica: &Replica, id: Option<&str>) -> Result<TournamentId, CliError> {
    match id {
        Some(id) => replica
            .resolve_tournament(id)
            .cloned()
            .ok_or_else(|| CliError::NotFound {
                resource_type: "tournament".into(),
                identifier: id.into(),
                list_command: "tournaments list".into(),
            }),
        None => replica
            .running()
            .map(|t| t.id.clone())
            .ok_or(CliError::NothingRunning),
    }
}

// ── Printer ─────────────────────────────────────────────────────────

struct Printer {
    clock: Option<Clock>,
    quiet: bool,
    last: Option<String>,
}

impl Printer {
    /// Print `line` unless it repeats the previous one.
    fn emit(&mut self, line: String) {
        if self.quiet || self.last.as_deref() == Some(line.as_str()) {
            return;
        }
        match self.clock {
            Some(ref clock) => println!("[{}] {line}", clock.time()),
            None => println!("{line}"),
        }
        self.last = Some(line);
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: Controller,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    controller.connect().await?;

    let mut stream = controller.subscribe();
    let id = target(stream.current(), args.id.as_deref())?;
    debug!(tournament = %id, "following");

    let clock = if args.no_clock {
        None
    } else {
        let clock = Clock::new();
        clock.start();
        Some(clock)
    };
    let mut printer = Printer {
        clock,
        quiet: global.quiet,
        last: None,
    };

    let countdown = Countdown::new();
    let mut remaining = countdown.subscribe();
    let mut channel = controller.channel_state();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut replica = stream.current().clone();
    loop {
        match replica.tournament(id.as_str()) {
            Some(t) => {
                let starts_at = t
                    .scheduled
                    .instant()
                    .filter(|at| !t.is_started() && *at > Utc::now());
                match starts_at {
                    Some(at) if !countdown.is_running() => countdown.start(at),
                    None if countdown.is_running() => countdown.stop(),
                    _ => {}
                }
                if starts_at.is_none() {
                    printer.emit(status_line(t));
                }
            }
            None => warn!(tournament = %id, "tournament is no longer on the server"),
        }

        tokio::select! {
            biased;
            _ = &mut ctrl_c => break,
            next = stream.changed() => {
                let Some(next) = next else { break };
                replica = next;
            }
            Ok(()) = channel.changed() => {
                let state = *channel.borrow_and_update();
                if !global.quiet {
                    eprintln!("{}", connection_line(state));
                }
            }
            Ok(()) = remaining.changed() => {
                let time = remaining.borrow_and_update().clone();
                if let Some(t) = replica.tournament(id.as_str()) {
                    printer.emit(format!("{}: starts in {time}", t.name));
                }
            }
        }
    }

    countdown.stop();
    controller.disconnect().await;
    Ok(())
}
