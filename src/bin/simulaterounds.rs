//! Simulates a whole tournament and prints the tabs.

use std::process::ExitCode;

use clap::Parser;
use itertools::Itertools;
use tabmaker::{
    config::{self, Settings},
    tournaments::standings::tab::PlayoffLabel,
    workloads::Workload,
};

#[derive(Parser)]
pub struct Simulate {
    /// Number of teams (a multiple of four).
    #[arg(long, default_value_t = 24)]
    teams: usize,
    /// Number of qualification rounds.
    #[arg(long, default_value_t = 5)]
    rounds: usize,
    /// Teams in the elimination bracket, 0 for none.
    #[arg(long, default_value_t = 8)]
    break_size: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Run the last qualification round silently.
    #[arg(long)]
    silent_last: bool,
    /// Print the whole outcome as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let args = Simulate::parse();
    let settings = match config::settings() {
        Ok(settings) => settings.clone(),
        Err(e) => {
            eprintln!("{e}; continuing with the default settings");
            Settings::default()
        }
    };
    config::init_tracing(&settings);

    let workload = Workload {
        teams: args.teams,
        rounds: args.rounds,
        break_size: args.break_size,
        seed: args.seed,
        silent_last: args.silent_last,
    };
    let outcome = match workload.run() {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("simulation failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("could not serialise the outcome: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!(
        "Simulated {} teams over {} rounds ({} forced repeat pairings).",
        args.teams,
        outcome.tournament.rounds.len(),
        outcome.forced_repeats
    );

    println!("\nTeam tab");
    for row in &outcome.team_tab.rows {
        let rounds = row
            .rounds
            .iter()
            .map(|points| points.map_or("-".to_string(), |p| p.to_string()))
            .join(" ");
        let playoff = match row.playoff {
            PlayoffLabel::NotInBreak => String::new(),
            label => format!("  [{label}]"),
        };
        println!(
            "{:>3}. {:<10} {}  | {}{playoff}",
            row.rank,
            row.name,
            rounds,
            row.metrics.iter().join(" ")
        );
    }

    println!("\nSpeaker tab");
    for row in outcome.speaker_tab.iter().take(20) {
        println!(
            "{:>3}. {:<14} {:<10} {}",
            row.rank.map_or("-".to_string(), |r| r.to_string()),
            row.name,
            row.team_name,
            row.total.map_or("-".to_string(), |t| t.to_string())
        );
    }

    ExitCode::SUCCESS
}
