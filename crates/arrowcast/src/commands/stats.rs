//! Leaderboard command handler.

use serde::Serialize;
use tabled::Tabled;

use arrowcast_core::{Controller, PersonStats, Replica, ReplicaConfig};

use crate::cli::{GlobalOpts, StatsArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Ranked<'a> {
    person_id: &'a str,
    #[serde(flatten)]
    stats: &'a PersonStats,
}

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "Rank")]
    rank: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kills")]
    kills: i64,
    #[tabled(rename = "Wins")]
    wins: i64,
    #[tabled(rename = "Matches")]
    matches: i64,
    #[tabled(rename = "Tournaments")]
    tournaments: usize,
    #[tabled(rename = "Playtime")]
    playtime: String,
}

fn playtime(secs: u64) -> String {
    format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
}

/// Display name from the stats entry, then the people directory, then the id.
fn name_of<'a>(replica: &'a Replica, entry: &Ranked<'a>) -> &'a str {
    entry
        .stats
        .person
        .as_ref()
        .or_else(|| replica.person(entry.person_id))
        .map_or(entry.person_id, |p| p.display_name())
}

pub async fn handle(
    config: ReplicaConfig,
    args: StatsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let replica = Controller::oneshot(config, |controller| async move {
        // Stats are optional during the initial load; fetch again so a
        // failure surfaces here.
        let _ = controller.refresh_stats().await?;
        Ok(controller.replica())
    })
    .await?;

    let Some(stats) = replica.stats() else {
        return Err(CliError::Internal("no statistics loaded".into()));
    };

    let ranked: Vec<Ranked<'_>> = stats
        .ranked()
        .into_iter()
        .take(args.limit)
        .map(|(person_id, stats)| Ranked { person_id, stats })
        .collect();

    let out = output::render_list(
        &global.output,
        &ranked,
        |r| StatsRow {
            rank: r.stats.rank,
            name: name_of(&replica, r).to_owned(),
            kills: r.stats.total.kills,
            wins: r.stats.total.wins,
            matches: r.stats.total.matches,
            tournaments: r.stats.participated(),
            playtime: playtime(r.stats.total.playtime.as_secs()),
        },
        |r| r.person_id.to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playtime_is_hours_and_minutes() {
        assert_eq!(playtime(90), "0h01m");
        assert_eq!(playtime(3 * 3600 + 5 * 60 + 59), "3h05m");
    }
}
