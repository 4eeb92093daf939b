//! The elimination stage: generating the break and advancing the bracket
//! layer by layer until the final.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::{
    error::{ParticipantKind, TabError},
    tournaments::{
        TEAMS_PER_ROOM, Tournament, TournamentStatus,
        rounds::{
            Motion, Room, Round, RoundKind, RoundStatus, results::GameResult,
        },
        standings::compute::TournamentTeamStandings,
    },
};

pub mod seeding;

/// What [`Tournament::advance_playoff`] did.
#[derive(Debug, PartialEq, Eq)]
pub enum PlayoffAdvance<'a> {
    /// The next layer of the bracket was drawn.
    Next(&'a Round),
    /// The final has been decided and the tournament is finished.
    Finished,
}

/// Whether `size` teams can form an elimination bracket of four-team rooms.
pub fn check_break_size(size: usize) -> Result<(), TabError> {
    if size < TEAMS_PER_ROOM || !size.is_power_of_two() {
        return Err(TabError::InvalidBreakSize(size));
    }
    Ok(())
}

/// Seed of each team: its 1-based rank in the qualification standings.
fn seeds(standings: &TournamentTeamStandings) -> HashMap<&str, usize> {
    standings
        .ranked_ids()
        .enumerate()
        .map(|(idx, team)| (team, idx + 1))
        .collect()
}

impl Tournament {
    /// The teams that would break on the standings as they are: the top
    /// `count_teams_in_break`.
    pub fn default_break(&self) -> Result<Vec<String>, TabError> {
        let standings = TournamentTeamStandings::compute(self)?;
        Ok(standings
            .ranked_ids()
            .take(self.config.count_teams_in_break)
            .map(String::from)
            .collect())
    }

    /// Draws the first layer of the elimination bracket from `breaking`.
    #[tracing::instrument(skip(self, breaking, motion), fields(tournament = %self.id))]
    pub fn generate_playoff(
        &mut self,
        breaking: &[String],
        motion: Motion,
    ) -> Result<&Round, TabError> {
        self.check_integrity()?;
        match self.status {
            TournamentStatus::Started => {}
            TournamentStatus::Playoff
                if self.playoff_rounds().next().is_none() => {}
            status => {
                return Err(TabError::LifecycleOrder(format!(
                    "the break cannot be generated while {status:?}"
                )));
            }
        }
        if let Some(latest) = self.latest_round() {
            if !latest.all_results_recorded() {
                return Err(TabError::LifecycleOrder(format!(
                    "round {} still has rooms without a result",
                    latest.seq
                )));
            }
        }

        check_break_size(breaking.len())?;
        let mut seen = HashSet::new();
        for team in breaking {
            self.participants.team(team)?;
            if !seen.insert(team.as_str()) {
                return Err(TabError::InvalidResult(format!(
                    "team `{team}` is listed twice in the break"
                )));
            }
        }

        let rooms = breaking.len() / TEAMS_PER_ROOM;
        let required = rooms * self.config.min_chairs_per_room;
        let available = self.participants.chairs();
        if available < required {
            return Err(TabError::InsufficientParticipants {
                kind: ParticipantKind::Adjudicators,
                required,
                available,
            });
        }

        let standings = TournamentTeamStandings::compute(self)
            .map_err(|err| self.note_fault(err))?;
        let seed_of = seeds(&standings);
        let seeded = breaking
            .iter()
            .sorted_by_key(|team| {
                seed_of.get(team.as_str()).copied().unwrap_or(usize::MAX)
            })
            .collect_vec();

        let rooms = seeding::first_layer(rooms)
            .into_iter()
            .zip(1..)
            .map(|(seeds, slot)| {
                let mut room =
                    Room::new(slot, seeds.map(|s| seeded[s - 1].clone()));
                room.bracket_slot = Some(slot);
                room
            })
            .collect_vec();

        let seq = self.rounds.len() as u32 + 1;
        let round = Round::new(seq, RoundKind::Playoff, motion, rooms);
        if let Some(previous) = self.rounds.last_mut() {
            previous.status = RoundStatus::Closed;
        }
        self.status = TournamentStatus::Playoff;
        tracing::info!(seq, teams = breaking.len(), "generated break");
        self.rounds.push(round);

        Ok(&self.rounds[self.rounds.len() - 1])
    }

    /// Draws the next bracket layer from the advancing teams of the current
    /// one, or, once the final has a result, finishes the tournament.
    #[tracing::instrument(skip(self, motion), fields(tournament = %self.id))]
    pub fn advance_playoff(
        &mut self,
        motion: Motion,
    ) -> Result<PlayoffAdvance<'_>, TabError> {
        self.check_integrity()?;
        if self.status != TournamentStatus::Playoff {
            return Err(TabError::LifecycleOrder(format!(
                "there is no bracket to advance while {:?}",
                self.status
            )));
        }
        let standings = TournamentTeamStandings::compute(self)
            .map_err(|err| self.note_fault(err))?;
        let seed_of = seeds(&standings);

        let Some(layer) = self
            .rounds
            .last()
            .filter(|round| round.kind == RoundKind::Playoff)
        else {
            return Err(TabError::LifecycleOrder(
                "the break has not been generated".into(),
            ));
        };
        if !layer.all_results_recorded() {
            return Err(TabError::LifecycleOrder(format!(
                "round {} still has rooms without a result",
                layer.seq
            )));
        }

        if layer.is_final() {
            if let Some(last) = self.rounds.last_mut() {
                last.status = RoundStatus::Closed;
            }
            self.status = TournamentStatus::Finished;
            tracing::info!("final decided, tournament finished");
            return Ok(PlayoffAdvance::Finished);
        }

        let advancing = layer
            .rooms
            .iter()
            .sorted_by_key(|room| room.bracket_slot)
            .map(|room| match &room.result {
                Some(GameResult::Playoff(result)) => Ok(room
                    .teams
                    .iter()
                    .zip(result.advanced)
                    .filter(|(_, advanced)| *advanced)
                    .map(|(team, _)| team.clone())
                    .collect_vec()),
                _ => Err(TabError::DataIntegrity(format!(
                    "playoff room {} of round {} has no playoff result",
                    room.number, layer.seq
                ))),
            })
            .collect::<Result<Vec<_>, _>>();
        let advancing = match advancing {
            Ok(advancing) => advancing,
            Err(err) => return Err(self.note_fault(err)),
        };

        let mut rooms = Vec::with_capacity(advancing.len() / 2);
        for (pair, slot) in advancing.chunks(2).zip(1..) {
            let teams = pair
                .iter()
                .flatten()
                .sorted_by_key(|team| {
                    seed_of.get(team.as_str()).copied().unwrap_or(usize::MAX)
                })
                .cloned()
                .collect_vec();
            let teams = <[String; 4]>::try_from(teams).map_err(|teams| {
                TabError::DataIntegrity(format!(
                    "bracket slot {slot} would hold {} teams",
                    teams.len()
                ))
            });
            let teams = match teams {
                Ok(teams) => teams,
                Err(err) => return Err(self.note_fault(err)),
            };
            let mut room = Room::new(slot, teams);
            room.bracket_slot = Some(slot);
            rooms.push(room);
        }

        let seq = self.rounds.len() as u32 + 1;
        let round = Round::new(seq, RoundKind::Playoff, motion, rooms);
        if let Some(previous) = self.rounds.last_mut() {
            previous.status = RoundStatus::Closed;
        }
        tracing::info!(seq, rooms = round.rooms.len(), "advanced bracket");
        self.rounds.push(round);

        Ok(PlayoffAdvance::Next(&self.rounds[self.rounds.len() - 1]))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{
        test::fixtures::{play_round, record_all, started},
        workloads::simulated_result,
    };

    fn qualified(teams: usize, chairs: usize, rounds: usize) -> Tournament {
        let mut t = started(teams, chairs);
        let mut rng = ChaCha20Rng::seed_from_u64(teams as u64);
        for _ in 0..rounds {
            play_round(&mut t, &mut rng);
        }
        t
    }

    #[test]
    fn break_sizes_must_be_powers_of_two() {
        let mut t = qualified(16, 4, 2);
        let ranked = t.default_break().unwrap();
        for size in [0, 2, 6, 12] {
            let breaking = t
                .participants
                .teams
                .keys()
                .take(size)
                .cloned()
                .collect_vec();
            assert_eq!(
                t.generate_playoff(&breaking, Motion::new("THW")),
                Err(TabError::InvalidBreakSize(size))
            );
        }
        assert_eq!(ranked.len(), 8);
        assert_eq!(t.status, TournamentStatus::Started);
        assert_eq!(t.playoff_rounds().count(), 0);
    }

    #[test]
    fn first_layer_is_seeded_by_standings() {
        let mut t = qualified(16, 4, 3);
        let breaking = t.default_break().unwrap();
        let round = t
            .generate_playoff(&breaking, Motion::new("THW"))
            .unwrap()
            .clone();

        assert_eq!(round.rooms.len(), 2);
        assert_eq!(round.kind, RoundKind::Playoff);
        assert_eq!(t.status, TournamentStatus::Playoff);
        assert_eq!(t.rounds[2].status, RoundStatus::Closed);

        let seeded = |seeds: [usize; 4]| seeds.map(|s| breaking[s - 1].clone());
        assert_eq!(round.rooms[0].teams, seeded([1, 4, 5, 8]));
        assert_eq!(round.rooms[1].teams, seeded([2, 3, 6, 7]));
        assert_eq!(round.rooms[1].bracket_slot, Some(2));

        let drawn = round.team_ids().collect::<HashSet<_>>();
        assert_eq!(drawn.len(), 8);
        assert!(breaking.iter().all(|team| drawn.contains(team.as_str())));
    }

    #[test]
    fn small_break_goes_straight_to_the_final() {
        let mut t = qualified(8, 2, 2);
        let breaking = t.default_break().unwrap()[..4].to_vec();
        let round = t
            .generate_playoff(&breaking, Motion::new("THW"))
            .unwrap();
        assert_eq!(round.rooms.len(), 1);
        assert!(round.is_final());

        assert!(matches!(
            t.advance_playoff(Motion::new("THW")),
            Err(TabError::LifecycleOrder(_))
        ));
        assert!(matches!(
            t.generate_next_round(
                Motion::new("THW"),
                false,
                &mut ChaCha20Rng::seed_from_u64(0)
            ),
            Err(TabError::LifecycleOrder(_))
        ));
    }

    #[test]
    fn bracket_advances_to_the_final_and_finishes() {
        let mut t = qualified(16, 4, 3);
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        let breaking = t.default_break().unwrap();
        t.generate_playoff(&breaking, Motion::new("Semis")).unwrap();
        t.publish_last_round().unwrap();
        record_all(&mut t, &mut rng);

        let advanced = t.rounds[3]
            .rooms
            .iter()
            .flat_map(|room| {
                let Some(GameResult::Playoff(result)) = &room.result else {
                    panic!("missing playoff result")
                };
                room.teams
                    .iter()
                    .zip(result.advanced)
                    .filter(|(_, adv)| *adv)
                    .map(|(team, _)| team.clone())
                    .collect_vec()
            })
            .collect::<HashSet<_>>();

        let PlayoffAdvance::Next(fin) =
            t.advance_playoff(Motion::new("Final")).unwrap()
        else {
            panic!("expected a final")
        };
        assert!(fin.is_final());
        assert_eq!(
            fin.team_ids().map(String::from).collect::<HashSet<_>>(),
            advanced
        );

        let standings = TournamentTeamStandings::compute(&t).unwrap();
        for team in &advanced {
            let team = standings.team(team).unwrap();
            assert_eq!(
                (team.count_playoff_rounds, team.playoff_position),
                (2, 2)
            );
        }

        // undoing the final takes the finalists back to the semis
        assert_eq!(t.remove_last_round(), Ok(true));
        let standings = TournamentTeamStandings::compute(&t).unwrap();
        for team in &advanced {
            assert_eq!(standings.team(team).unwrap().playoff_position, 1);
        }

        t.advance_playoff(Motion::new("Final")).unwrap();
        t.publish_last_round().unwrap();
        record_all(&mut t, &mut rng);
        assert_eq!(
            t.advance_playoff(Motion::new("None")),
            Ok(PlayoffAdvance::Finished)
        );
        assert_eq!(t.status, TournamentStatus::Finished);

        let standings = TournamentTeamStandings::compute(&t).unwrap();
        let winners = standings
            .teams
            .iter()
            .filter(|team| team.playoff_position == 3)
            .count();
        assert_eq!(winners, 1);
        let not_broken = standings
            .teams
            .iter()
            .filter(|team| team.count_playoff_rounds == 0)
            .count();
        assert_eq!(not_broken, 8);
    }

    #[test]
    fn playoff_teams_keep_their_bracket_slot() {
        let mut t = qualified(16, 4, 2);
        let breaking = t.default_break().unwrap();
        let round = t
            .generate_playoff(&breaking, Motion::new("THW"))
            .unwrap()
            .clone();
        let (top, second) = (&round.rooms[0], &round.rooms[1]);

        assert!(matches!(
            t.swap_teams(&top.teams[0], &second.teams[0]),
            Err(TabError::InvalidResult(_))
        ));
        assert_eq!(t.rounds.last().unwrap().rooms, round.rooms);

        // changing benches within a room is fine
        t.swap_teams(&top.teams[0], &top.teams[3]).unwrap();
        let swapped = &t.rounds.last().unwrap().rooms[0];
        assert_eq!(swapped.teams[0], top.teams[3]);
        assert_eq!(swapped.teams[3], top.teams[0]);
        assert_eq!(swapped.bracket_slot, top.bracket_slot);
    }

    #[test]
    fn playoff_layer_with_a_result_cannot_be_removed() {
        let mut t = qualified(16, 4, 2);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let breaking = t.default_break().unwrap();
        let round = t
            .generate_playoff(&breaking, Motion::new("THW"))
            .unwrap()
            .clone();
        t.publish_last_round().unwrap();
        t.record_result(&round.rooms[0].id, simulated_result(&round, &mut rng))
            .unwrap();

        assert!(matches!(
            t.remove_last_round(),
            Err(TabError::LifecycleOrder(_))
        ));
        assert_eq!(t.playoff_rounds().count(), 1);
        assert_eq!(t.status, TournamentStatus::Playoff);
    }

    #[test]
    fn break_needs_distinct_known_teams() {
        let mut t = qualified(8, 2, 1);
        let mut breaking = t.default_break().unwrap()[..4].to_vec();
        breaking[3] = "ghost".into();
        assert!(matches!(
            t.generate_playoff(&breaking, Motion::new("THW")),
            Err(TabError::NotFound(_))
        ));
        breaking[3] = breaking[0].clone();
        assert!(matches!(
            t.generate_playoff(&breaking, Motion::new("THW")),
            Err(TabError::InvalidResult(_))
        ));
    }
}
