//! Seeded whole-tournament simulations.
//!
//! A [`Workload`] runs a tournament from registration to the final through
//! the [`Tabulator`], with results made up by a seeded RNG. The same seed
//! always produces the same tournament.

use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::TabError,
    state::Tabulator,
    tournaments::{
        Tournament, TournamentStatus,
        config::TournamentConfig,
        participants::{Adjudicator, AdjudicatorRole},
        rounds::{
            Motion, Round, RoundKind,
            results::{
                BenchScores, FinalResult, GameResult, PlayoffResult,
                QualificationResult,
            },
        },
        standings::tab::{self, SpeakerTabRow, TeamTab},
        teams::Team,
    },
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Workload {
    pub teams: usize,
    pub rounds: usize,
    /// `0` for no elimination rounds.
    pub break_size: usize,
    pub seed: u64,
    /// Run the last qualification round as a silent round.
    pub silent_last: bool,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            teams: 24,
            rounds: 5,
            break_size: 8,
            seed: 0,
            silent_last: false,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct SimulationOutcome {
    pub tournament: Tournament,
    pub team_tab: TeamTab,
    pub speaker_tab: Vec<SpeakerTabRow>,
    /// Pairings that had to be repeated because no draw avoided them.
    pub forced_repeats: usize,
}

const MOTIONS: [&str; 4] = [
    "This House would abolish the monarchy",
    "This House regrets the rise of influencer culture",
    "This House would ban private schools",
    "This House supports a universal basic income",
];

impl Workload {
    /// Builds a small but valid workload out of arbitrary bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let byte = |i: usize| data.get(i).copied().unwrap_or(0);
        let teams = 4 * (1 + usize::from(byte(0) % 8));
        let break_size = [0, 4, 8, 16]
            .into_iter()
            .filter(|size| *size <= teams)
            .nth(usize::from(byte(2)) % 4)
            .unwrap_or(0);

        let mut seed = [0u8; 8];
        for (dst, src) in seed.iter_mut().zip(data.iter().skip(3)) {
            *dst = *src;
        }

        Self {
            teams,
            rounds: usize::from(byte(1) % 6),
            break_size,
            seed: u64::from_le_bytes(seed),
            silent_last: byte(1) & 0x80 != 0,
        }
    }

    fn tournament(&self) -> Result<Tournament, TabError> {
        let config = TournamentConfig {
            count_teams_in_break: self.break_size,
            ..TournamentConfig::default()
        };
        let mut t =
            Tournament::new(format!("Simulated {}", self.seed), config);
        for i in 0..self.teams {
            t.add_team(
                Team::new(
                    format!("team-{i}"),
                    format!("Team {}", i + 1),
                    [format!("speaker-{i}-a"), format!("speaker-{i}-b")],
                ),
                [
                    format!("Speaker {}A", i + 1),
                    format!("Speaker {}B", i + 1),
                ],
            )?;
        }
        for i in 0..self.teams / 2 {
            t.add_adjudicator(Adjudicator {
                id: format!("adj-{i}"),
                name: format!("Adjudicator {}", i + 1),
                role: if i % 2 == 0 {
                    AdjudicatorRole::Chair
                } else {
                    AdjudicatorRole::Wing
                },
            })?;
        }
        Ok(t)
    }

    #[tracing::instrument(skip(self), fields(seed = self.seed))]
    pub fn run(&self) -> Result<SimulationOutcome, TabError> {
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
        let tabulator = Tabulator::new(std::time::Duration::from_secs(1));
        let id = tabulator.insert(self.tournament()?);
        tabulator.start(&id)?;

        let mut motions = MOTIONS.iter().cycle();
        let mut motion =
            || Motion::new(*motions.next().unwrap_or(&MOTIONS[0]));

        for seq in 1..=self.rounds {
            let silent = self.silent_last && seq == self.rounds;
            tabulator.generate_next_round(&id, motion(), silent, &mut rng)?;
            play_out(&tabulator, &id, &mut rng)?;
        }

        if self.break_size > 0 {
            let breaking =
                tabulator.read(&id, Tournament::default_break)??;
            tabulator.generate_playoff(&id, &breaking, motion())?;
            loop {
                play_out(&tabulator, &id, &mut rng)?;
                if tabulator.advance_playoff(&id, motion())?.is_none() {
                    break;
                }
            }
        } else {
            tabulator.mutate(&id, |t| t.finish())?;
        }

        let standings = tabulator.standings(&id)?;
        let tournament = tabulator.read(&id, Tournament::clone)?;
        debug_assert_eq!(tournament.status, TournamentStatus::Finished);
        let forced_repeats = tournament
            .qualification_rounds()
            .flat_map(|round| &round.rooms)
            .map(|room| room.repeats.len())
            .sum();
        tracing::info!(
            rounds = tournament.rounds.len(),
            forced_repeats,
            "simulation finished"
        );

        Ok(SimulationOutcome {
            team_tab: tab::render_team_tab(&standings, true),
            speaker_tab: tab::render_speaker_tab(&standings, true, &mut rng),
            tournament,
            forced_repeats,
        })
    }
}

/// Publishes the latest round and records a result in each of its rooms.
fn play_out(
    tabulator: &Tabulator,
    id: &str,
    rng: &mut ChaCha20Rng,
) -> Result<(), TabError> {
    let round = tabulator.publish_last_round(id)?;
    for room in &round.rooms {
        let result = simulated_result(&round, rng);
        tabulator.record_result(id, &room.id, result)?;
    }
    Ok(())
}

/// A plausible result of the right kind for the rooms of `round`: a random
/// ranking, with speaker scores that loosely follow it.
pub fn simulated_result<R: Rng + ?Sized>(
    round: &Round,
    rng: &mut R,
) -> GameResult {
    let mut places = [1, 2, 3, 4];
    places.shuffle(rng);

    match round.kind {
        RoundKind::Qualification => {
            GameResult::Qualification(QualificationResult {
                places,
                benches: places.map(|place| {
                    let base = 80 - 2 * i64::from(place);
                    let mut bench = BenchScores::new(
                        base + rng.random_range(-3..=3),
                        base + rng.random_range(-3..=3),
                    );
                    bench.reversed = rng.random_bool(0.2);
                    bench
                }),
            })
        }
        RoundKind::Playoff if round.is_final() => {
            GameResult::Final(FinalResult {
                places,
                reversed: [false; 4],
            })
        }
        RoundKind::Playoff => GameResult::Playoff(PlayoffResult {
            advanced: places.map(|place| place <= 2),
            reversed: [false; 4],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournaments::standings::tab::PlayoffLabel;

    #[test]
    fn workload_regression_1() {
        let outcome = Workload::from_bytes(&[]).run().unwrap();
        assert_eq!(outcome.team_tab.rows.len(), 4);
        assert_eq!(outcome.tournament.rounds.len(), 0);
    }

    #[test]
    fn workload_regression_2() {
        tracing_subscriber::fmt().try_init().ok();

        let outcome = Workload::default().run().unwrap();
        let t = &outcome.tournament;
        assert_eq!(t.status, TournamentStatus::Finished);
        // five qualification rounds, a two-room semifinal and the final
        assert_eq!(t.rounds.len(), 7);
        assert_eq!(outcome.speaker_tab.len(), 48);

        let winners = outcome
            .team_tab
            .rows
            .iter()
            .filter(|row| row.playoff == PlayoffLabel::Winner)
            .count();
        let finalists = outcome
            .team_tab
            .rows
            .iter()
            .filter(|row| row.playoff == PlayoffLabel::Finalist)
            .count();
        assert_eq!((winners, finalists), (1, 3));
    }

    #[test]
    fn same_seed_same_tournament() {
        let workload = Workload {
            teams: 16,
            rounds: 4,
            break_size: 4,
            seed: 99,
            silent_last: true,
        };
        let a = workload.run().unwrap();
        let b = workload.run().unwrap();
        assert_eq!(a.team_tab.rows, b.team_tab.rows);
        assert_eq!(a.speaker_tab, b.speaker_tab);
    }

    #[test]
    fn byte_workloads_are_well_formed() {
        for bytes in [&[7u8, 5, 3, 1, 2, 3][..], &[255; 16], &[1, 0x85, 1]] {
            let workload = Workload::from_bytes(bytes);
            assert_eq!(workload.teams % 4, 0);
            assert!(workload.break_size <= workload.teams);
            workload.run().unwrap();
        }
    }
}
