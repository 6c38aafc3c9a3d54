//! Tournament command handlers.

use std::fmt::Write;

use chrono::Utc;
use tabled::Tabled;

use arrowcast_core::{Controller, Match, ReplicaConfig, Tournament, TournamentFilter};

use crate::cli::{GlobalOpts, OutputFormat, StatusFilter, TournamentsArgs, TournamentsCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct TournamentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Scheduled")]
    scheduled: String,
    #[tabled(rename = "Current")]
    current: String,
}

impl From<&&Tournament> for TournamentRow {
    fn from(t: &&Tournament) -> Self {
        Self {
            id: t.id.to_string(),
            name: t.name.clone(),
            status: status(t).into(),
            scheduled: t
                .scheduled
                .instant()
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            current: t.current_match().map(Match::title).unwrap_or_default(),
        }
    }
}

/// One-word lifecycle summary.
pub(crate) fn status(t: &Tournament) -> &'static str {
    if t.is_ended() {
        "ended"
    } else if t.between_matches() {
        "between matches"
    } else if t.is_running() {
        "running"
    } else if t.scheduled.is_set() {
        "scheduled"
    } else {
        "draft"
    }
}

fn filter_for(status: StatusFilter) -> TournamentFilter {
    match status {
        StatusFilter::All => TournamentFilter::All,
        StatusFilter::Upcoming => TournamentFilter::Upcoming,
        StatusFilter::Running => TournamentFilter::Running,
        StatusFilter::Ended => TournamentFilter::Ended,
        StatusFilter::Recent => TournamentFilter::Recent,
    }
}

// ── Detail view ─────────────────────────────────────────────────────

fn match_line(m: &Match) -> String {
    let state = if m.is_ended() {
        "ended"
    } else if m.is_running() {
        "playing"
    } else {
        "waiting"
    };
    let players = m
        .players
        .iter()
        .map(|p| format!("{} {}", p.display_name(), p.kills))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{:<10} {state:<8} {players}", m.title())
}

/// Multi-line description of one tournament and its bracket.
pub(crate) fn describe(t: &Tournament) -> Result<String, CliError> {
    let mut out = String::new();
    let _ = writeln!(out, "{}", t.name);
    let _ = writeln!(out, "  id:         {}", t.id);
    if let Some(dbid) = t.dbid {
        let _ = writeln!(out, "  dbid:       {dbid}");
    }
    let _ = writeln!(out, "  status:     {}", status(t));
    for (label, ts) in [
        ("scheduled", &t.scheduled),
        ("started", &t.started),
        ("ended", &t.ended),
    ] {
        if let Some(at) = ts.instant() {
            let _ = writeln!(out, "  {:<11} {}", format!("{label}:"), at.to_rfc3339());
        }
    }
    if let Some(current) = t.current_match() {
        let _ = writeln!(out, "  current:    {} (round {})", current.title(), current.round());
    }
    if let Some(chart) = t.chart_match() {
        let _ = writeln!(out, "  chart:      {}", chart.title());
    }

    let playoffs = t.playoffs()?;
    let semis = t.semis()?;
    let final_match = t.final_match()?;
    if !playoffs.is_empty() {
        let _ = writeln!(out, "\nPlayoffs");
        for m in playoffs {
            let _ = writeln!(out, "  {}", match_line(m));
        }
    }
    if !semis.is_empty() {
        let _ = writeln!(out, "\nSemis");
        for m in semis {
            let _ = writeln!(out, "  {}", match_line(m));
        }
    }
    if let Some(m) = final_match {
        let _ = writeln!(out, "\nFinal");
        let _ = writeln!(out, "  {}", match_line(m));
    }
    Ok(out.trim_end().to_owned())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ReplicaConfig,
    args: TournamentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let test_prefix = config.test_prefix.clone();

    match args.command {
        TournamentsCommand::List {
            status,
            include_tests,
        } => {
            let replica =
                Controller::oneshot(config, |controller| async move { Ok(controller.replica()) })
                    .await?;

            let now = Utc::now();
            let tests = TournamentFilter::Test(test_prefix);
            let mut list = filter_for(status).apply(replica.tournaments_sorted(), now);
            if !include_tests {
                list.retain(|t| !tests.matches(t, now));
            }
            list.reverse();

            let out = output::render_list(
                &global.output,
                &list,
                |t| TournamentRow::from(t),
                |t| t.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TournamentsCommand::Get { id } => {
            let replica =
                Controller::oneshot(config, |controller| async move { Ok(controller.replica()) })
                    .await?;
            let key = replica
                .resolve_tournament(&id)
                .ok_or_else(|| not_found(&id))?;
            let tournament = replica.tournament(key.as_str()).ok_or_else(|| not_found(&id))?;

            let detail = match global.output {
                OutputFormat::Table => describe(tournament)?,
                _ => String::new(),
            };
            let out = output::render_single(
                &global.output,
                tournament,
                |_| detail.clone(),
                |t| t.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TournamentsCommand::Credits { id } => {
            let lookup = id.clone();
            let replica = Controller::oneshot(config, |controller| async move {
                let _ = controller.fetch_credits(&lookup).await?;
                Ok(controller.replica())
            })
            .await?;
            let key = replica
                .resolve_tournament(&id)
                .ok_or_else(|| not_found(&id))?;
            let credits = replica.credits(key.as_str()).ok_or_else(|| not_found(&id))?;

            let out = output::render_single(
                &global.output,
                credits,
                |c| {
                    let mut out = String::new();
                    if let Some(ref exec) = c.executive {
                        let _ = writeln!(out, "Executive producer  {}", exec.display_name());
                    }
                    for p in &c.producers {
                        let _ = writeln!(out, "Producer            {}", p.display_name());
                    }
                    for p in &c.players {
                        let _ = writeln!(out, "Player              {}", p.display_name());
                    }
                    let _ = write!(out, "Archers harmed      {}", c.archers_harmed);
                    out
                },
                |c| c.archers_harmed.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn not_found(id: &str) -> CliError {
    CliError::NotFound {
        resource_type: "tournament".into(),
        identifier: id.into(),
        list_command: "tournaments list".into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use arrowcast_core::{MatchKind, Timestamp, TournamentId};

    fn at(s: &str) -> Timestamp {
        Timestamp::parse(Some(s))
    }

    fn bracket(ended: usize, total: usize) -> Tournament {
        let mut t = Tournament::new("df-12", "DrunkenFall 12: The Return");
        t.started = at("2026-03-01T19:00:00Z");
        t.matches = (0..total)
            .map(|index| Match {
                tournament: TournamentId::new("df-12"),
                index,
                kind: if index + 1 == total {
                    MatchKind::Final
                } else {
                    MatchKind::Playoff
                },
                length: 10,
                scheduled: Timestamp::Unset,
                started: Timestamp::Unset,
                ended: if index < ended {
                    at("2026-03-01T19:30:00Z")
                } else {
                    Timestamp::Unset
                },
                players: Vec::new(),
                commits: Vec::new(),
                events: Vec::new(),
                level: None,
            })
            .collect();
        t
    }

    #[test]
    fn status_reflects_lifecycle() {
        let t = bracket(1, 4);
        assert_eq!(status(&t), "between matches");

        let mut ended = bracket(4, 4);
        ended.ended = at("2026-03-01T22:00:00Z");
        assert_eq!(status(&ended), "ended");

        let draft = Tournament::new("x", "DrunkenFall 13");
        assert_eq!(status(&draft), "draft");
    }

    #[test]
    fn describe_lists_bracket_sections() {
        let text = describe(&bracket(1, 5)).unwrap();
        assert!(text.contains("Playoffs"));
        assert!(text.contains("Semis"));
        assert!(text.contains("Final"));
        assert!(text.contains("current:"));
    }

    #[test]
    fn describe_rejects_broken_bracket() {
        assert!(matches!(
            describe(&bracket(0, 2)),
            Err(CliError::BadData { .. })
        ));
    }
}
