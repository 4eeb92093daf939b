//! Runs whole tournaments, step by step, and checks after every step that
//! the draw, the standings and the bracket still hold together.

use std::collections::HashSet;

use itertools::Itertools;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::{
    error::TabError,
    test::fixtures::{play_round, record_all, started},
    tournaments::{
        Tournament, TournamentStatus,
        breaks::PlayoffAdvance,
        rounds::{Motion, Round, results::GameResult},
        standings::{
            compute::TournamentTeamStandings,
            tab::{PlayoffLabel, render_team_tab},
        },
    },
};

// A macro rather than a function so that a failure points at the step that
// broke rather than at the helper.
macro_rules! assert_consistent {
    ($t:expr) => {{
        let first = TournamentTeamStandings::compute($t).unwrap();
        let second = TournamentTeamStandings::compute($t).unwrap();
        assert_eq!(first, second, "standings are not a pure function");
        check_rank_ties(&first);
        first
    }};
}

fn check_rank_ties(standings: &TournamentTeamStandings) {
    for reveal in [false, true] {
        let tab = render_team_tab(standings, reveal);
        for (a, b) in tab.rows.iter().tuple_windows() {
            if a.metrics == b.metrics {
                assert_eq!(
                    a.rank, b.rank,
                    "{} and {} are level",
                    a.name, b.name
                );
            } else {
                assert!(a.metrics > b.metrics);
                assert!(a.rank < b.rank);
            }
        }
    }
}

fn pair(a: &str, b: &str) -> (String, String) {
    if a < b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Every team sits in exactly one room, and any pairing that already
/// happened in an earlier round is one the draw reported as forced.
fn check_qualification_draw(t: &Tournament, round: &Round) {
    let seated = round.team_ids().collect::<HashSet<_>>();
    assert_eq!(seated.len(), t.participants.teams.len());
    assert_eq!(round.rooms.len() * 4, t.participants.teams.len());

    let earlier = t
        .qualification_rounds()
        .filter(|r| r.seq < round.seq)
        .flat_map(|r| &r.rooms)
        .flat_map(|room| {
            room.teams
                .iter()
                .tuple_combinations()
                .map(|(a, b)| pair(a, b))
        })
        .collect::<HashSet<_>>();

    for room in &round.rooms {
        let forced = room
            .repeats
            .iter()
            .map(|(a, b)| pair(a, b))
            .collect::<HashSet<_>>();
        for (a, b) in room.teams.iter().tuple_combinations() {
            let p = pair(a, b);
            if earlier.contains(&p) {
                assert!(
                    forced.contains(&p),
                    "round {}: {a} and {b} meet again without it being \
                     reported",
                    round.seq
                );
            } else {
                assert!(!forced.contains(&p));
            }
        }
    }
}

/// The next round cannot be drawn while a room is still waiting for its
/// result; nothing is created by the attempt.
fn check_lifecycle_guard(t: &mut Tournament, rng: &mut ChaCha20Rng) {
    let rounds = t.rounds.len();
    let res = t.generate_next_round(Motion::new("THW"), false, rng);
    assert!(matches!(res, Err(TabError::LifecycleOrder(_))));
    assert_eq!(t.rounds.len(), rounds);
}

fn advanced_teams(round: &Round) -> HashSet<String> {
    round
        .rooms
        .iter()
        .flat_map(|room| match &room.result {
            Some(GameResult::Playoff(result)) => room
                .teams
                .iter()
                .zip(result.advanced)
                .filter(|(_, advanced)| *advanced)
                .map(|(team, _)| team.clone())
                .collect_vec(),
            other => panic!("expected a playoff result, found {other:?}"),
        })
        .collect()
}

fn run_tournament(seed: u64, teams: usize, rounds: usize, break_size: usize) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut t = started(teams, teams / 4);
    t.config.count_teams_in_break = break_size;
    assert_consistent!(&t);

    for _ in 0..rounds {
        t.generate_next_round(Motion::new("THW"), false, &mut rng)
            .unwrap();
        check_qualification_draw(&t, t.latest_round().unwrap());
        check_lifecycle_guard(&mut t, &mut rng);

        t.publish_last_round().unwrap();
        check_lifecycle_guard(&mut t, &mut rng);
        record_all(&mut t, &mut rng);
        assert_consistent!(&t);
    }

    let breaking = t.default_break().unwrap();
    assert_eq!(breaking.len(), break_size);
    let first = t
        .generate_playoff(&breaking, Motion::new("THW"))
        .unwrap()
        .clone();
    let first_layer = first.team_ids().map(String::from).collect_vec();
    assert_eq!(first_layer.len(), break_size);
    assert_eq!(
        first_layer.iter().cloned().collect::<HashSet<_>>(),
        breaking.iter().cloned().collect::<HashSet<_>>()
    );

    loop {
        t.publish_last_round().unwrap();
        record_all(&mut t, &mut rng);
        assert_consistent!(&t);
        let layer = t.latest_round().unwrap().clone();

        match t.advance_playoff(Motion::new("THW")).unwrap() {
            PlayoffAdvance::Next(next) => {
                let next = next.team_ids().map(String::from).collect_vec();
                assert_eq!(next.len(), layer.rooms.len() * 2);
                assert_eq!(
                    next.into_iter().collect::<HashSet<_>>(),
                    advanced_teams(&layer)
                );
            }
            PlayoffAdvance::Finished => break,
        }
    }

    assert_eq!(t.status, TournamentStatus::Finished);
    let standings = assert_consistent!(&t);
    let labels = standings
        .teams
        .iter()
        .map(PlayoffLabel::of_team)
        .counts();
    assert_eq!(labels.get(&PlayoffLabel::Winner), Some(&1));
    assert_eq!(labels.get(&PlayoffLabel::Finalist), Some(&3));
    assert_eq!(
        labels.get(&PlayoffLabel::NotInBreak).copied().unwrap_or(0),
        teams - break_size
    );
    assert_eq!(t.qualification_rounds().count(), rounds);
}

#[test]
fn small_tournaments() {
    for seed in 0..8 {
        run_tournament(seed, 8, 3, 4);
    }
}

#[test]
fn medium_tournaments() {
    for seed in 0..4 {
        run_tournament(seed, 24, 5, 8);
    }
}

#[test]
fn large_break() {
    run_tournament(17, 40, 6, 16);
}

#[test]
fn removing_a_round_restores_the_standings() {
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let mut t = started(16, 4);
    play_round(&mut t, &mut rng);
    play_round(&mut t, &mut rng);
    let before = assert_consistent!(&t);

    t.generate_next_round(Motion::new("THW"), false, &mut rng)
        .unwrap();
    assert!(t.remove_last_round().unwrap());
    assert_eq!(assert_consistent!(&t), before);
}
