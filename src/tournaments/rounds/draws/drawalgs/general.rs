//! Power-pairing for qualification rounds after the first.
//!
//! Teams are ordered by standings and split into point brackets. Brackets
//! that do not divide into rooms are balanced by moving teams across the
//! bracket boundary (see [`BracketPolicy`]), the result is cut into rooms of
//! four, and a bounded local search then swaps teams between neighbouring
//! rooms to get rid of repeat pairings. Finally each room's positions are
//! chosen to even out how often each team has held each position.

use std::{
    cmp::Reverse,
    collections::{HashMap, HashSet, VecDeque},
};

use itertools::Itertools;
use rand::{Rng, seq::SliceRandom};
use rand_chacha::ChaCha20Rng;

use crate::tournaments::{
    TEAMS_PER_ROOM,
    config::{BracketPolicy, PullupMetric, TournamentConfig},
    rounds::{
        draws::drawalgs::{
            Draw, DrawInput, DrawnRoom, MakeDrawError, check_team_count,
            into_room_teams,
        },
        side_names::Position,
    },
    standings::compute::{TournamentTeamStandings, history::TeamHistory},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Direction {
    /// Teams from the lower bracket join the one above.
    Up,
    /// Surplus teams of a bracket join the one below.
    Down,
}

/// Everything the balancing and repair steps look up by team.
struct PairingContext<'a> {
    config: &'a TournamentConfig,
    history: &'a TeamHistory,
    rank: HashMap<String, usize>,
    points: HashMap<String, i64>,
}

impl PairingContext<'_> {
    fn rank_of(&self, team: &str) -> i64 {
        self.rank
            .get(team)
            .and_then(|rank| i64::try_from(*rank).ok())
            .unwrap_or(i64::MAX)
    }

    fn points_of(&self, team: &str) -> i64 {
        self.points.get(team).copied().unwrap_or(0)
    }

    fn conflicts(&self, group: &[String]) -> usize {
        self.history.repeats_in(group).len()
    }
}

pub fn make_draw(
    DrawInput {
        config,
        teams,
        standings,
        history,
        rng,
    }: DrawInput,
) -> Result<Draw, MakeDrawError> {
    check_team_count(teams.len())?;

    let ranked = rank_for_pairing(&teams, standings, config, rng)?;
    let ctx = PairingContext {
        config,
        history,
        rank: ranked
            .iter()
            .enumerate()
            .map(|(idx, team)| (team.clone(), idx))
            .collect(),
        points: ranked
            .iter()
            .map(|team| {
                (team.clone(), standings.points_of_team(team).unwrap_or(0))
            })
            .collect(),
    };

    let brackets = ranked
        .iter()
        .chunk_by(|team| ctx.points_of(team))
        .into_iter()
        .map(|(_, bracket)| bracket.cloned().collect_vec())
        .collect::<VecDeque<_>>();

    let (mut groups, moved) = balance_brackets(brackets, &ctx, rng)?;
    repair_repeats(&mut groups, &ctx);

    groups
        .into_iter()
        .map(|group| {
            let teams = assign_positions(group, history, rng)?;
            let repeats = history
                .repeats_in(&teams)
                .into_iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect_vec();
            for (a, b) in &repeats {
                tracing::warn!(%a, %b, "forced repeat pairing");
            }
            Ok(DrawnRoom {
                pullups: teams
                    .iter()
                    .filter(|team| moved.up.contains(*team))
                    .cloned()
                    .collect(),
                pulldowns: teams
                    .iter()
                    .filter(|team| moved.down.contains(*team))
                    .cloned()
                    .collect(),
                teams,
                repeats,
            })
        })
        .collect()
}

/// Orders the teams for pairing: by points, then by the configured
/// standings metrics. Teams level on everything are shuffled so that
/// registration order does not decide who is pulled up.
fn rank_for_pairing(
    teams: &[String],
    standings: &TournamentTeamStandings,
    config: &TournamentConfig,
    rng: &mut ChaCha20Rng,
) -> Result<Vec<String>, MakeDrawError> {
    let wanted = teams.iter().map(String::as_str).collect::<HashSet<_>>();
    let mut candidates = standings
        .teams
        .iter()
        .filter(|team| wanted.contains(team.team_id.as_str()))
        .map(|team| {
            let key = (
                team.points,
                team.key(&config.team_standings_metrics, true),
            );
            (key, team.team_id.clone())
        })
        .collect_vec();

    if candidates.len() != teams.len() {
        return Err(MakeDrawError::InvalidConfiguration(format!(
            "{} of {} teams have no standing",
            teams.len() - candidates.len(),
            teams.len()
        )));
    }

    candidates.sort_by(|(a, _), (b, _)| b.cmp(a));

    let mut ranked = Vec::with_capacity(candidates.len());
    for (_, tied) in &candidates.into_iter().chunk_by(|(key, _)| key.clone())
    {
        let mut tied = tied.map(|(_, team)| team).collect_vec();
        tied.shuffle(rng);
        ranked.extend(tied);
    }
    Ok(ranked)
}

/// Picks `count` teams of `candidates` to move across the bracket boundary,
/// applying the pull-up metrics in order.
///
/// Rank metrics are read from the point of view of a pull-up. For a
/// pull-down they are mirrored, so that [`PullupMetric::HighestRank`] always
/// prefers the teams nearest to the boundary.
fn choose_movers(
    candidates: &[String],
    count: usize,
    direction: Direction,
    ctx: &PairingContext,
    rng: &mut ChaCha20Rng,
) -> Vec<String> {
    let toward_boundary = |team: &str| match direction {
        Direction::Up => ctx.rank_of(team),
        Direction::Down => -ctx.rank_of(team),
    };

    candidates
        .iter()
        .map(|team| {
            let key = ctx
                .config
                .pullup_metrics
                .iter()
                .map(|metric| match metric {
                    PullupMetric::HighestRank => toward_boundary(team),
                    PullupMetric::LowestRank => -toward_boundary(team),
                    PullupMetric::Random => i64::from(rng.random::<u32>()),
                    PullupMetric::FewerPreviousPullups => {
                        ctx.history.pullup_count(team) as i64
                    }
                })
                .chain(std::iter::once(toward_boundary(team)))
                .collect_vec();
            (key, team)
        })
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .take(count)
        .map(|(_, team)| team.clone())
        .collect()
}

/// Teams that left their point bracket, by direction.
#[derive(Default)]
struct Moved {
    up: HashSet<String>,
    down: HashSet<String>,
}

/// Turns point brackets into groups of four, moving teams between adjacent
/// brackets as the bracket policy dictates. Returns the groups in ranking
/// order and the teams that were moved.
fn balance_brackets(
    mut brackets: VecDeque<Vec<String>>,
    ctx: &PairingContext,
    rng: &mut ChaCha20Rng,
) -> Result<(Vec<Vec<String>>, Moved), MakeDrawError> {
    let mut groups = Vec::new();
    let mut moved = Moved::default();

    while let Some(mut bracket) = brackets.pop_front() {
        let rem = bracket.len() % TEAMS_PER_ROOM;
        if rem != 0 {
            let pull_up = match ctx.config.bracket_policy {
                BracketPolicy::PullUp => true,
                BracketPolicy::PullDown => false,
                BracketPolicy::FewestMoved => TEAMS_PER_ROOM - rem <= rem,
            };

            if pull_up {
                let mut need = TEAMS_PER_ROOM - rem;
                while need > 0 {
                    let Some(next) = brackets.front_mut() else {
                        return Err(MakeDrawError::InvalidConfiguration(
                            "no teams left to pull up".to_string(),
                        ));
                    };
                    let movers = choose_movers(
                        next,
                        need.min(next.len()),
                        Direction::Up,
                        ctx,
                        rng,
                    );
                    next.retain(|team| !movers.contains(team));
                    if next.is_empty() {
                        brackets.pop_front();
                    }
                    need -= movers.len();
                    tracing::trace!(?movers, "pulled up");
                    moved.up.extend(movers.iter().cloned());
                    bracket.extend(movers);
                }
            } else {
                let movers =
                    choose_movers(&bracket, rem, Direction::Down, ctx, rng);
                bracket.retain(|team| !movers.contains(team));
                let Some(next) = brackets.front_mut() else {
                    return Err(MakeDrawError::InvalidConfiguration(
                        "no bracket left to pull down into".to_string(),
                    ));
                };
                tracing::trace!(?movers, "pulled down");
                moved.down.extend(movers.iter().cloned());
                // moved teams rank above the rest of the lower bracket
                let rest = std::mem::replace(next, movers);
                next.extend(rest);
            }
        }

        groups.extend(
            bracket
                .chunks(TEAMS_PER_ROOM)
                .map(<[String]>::to_vec),
        );
    }

    Ok((groups, moved))
}

fn swap_between(
    groups: &mut [Vec<String>],
    (g, i): (usize, usize),
    (h, j): (usize, usize),
) {
    let (lo, hi) = if g < h { (g, h) } else { (h, g) };
    let (left, right) = groups.split_at_mut(hi);
    let (a, b) = if g < h {
        (&mut left[lo][i], &mut right[0][j])
    } else {
        (&mut right[0][i], &mut left[lo][j])
    };
    std::mem::swap(a, b);
}

/// Bounded local search: for each group containing a repeat, apply the swap
/// with a neighbouring group that removes the most repeats, preferring swaps
/// between teams on similar points. Stops once a full pass changes nothing.
fn repair_repeats(groups: &mut [Vec<String>], ctx: &PairingContext) {
    for pass in 0..ctx.config.max_swap_passes {
        let mut improved = false;

        for g in 0..groups.len() {
            if ctx.conflicts(&groups[g]) == 0 {
                continue;
            }

            let mut best: Option<((Reverse<usize>, i64), usize, usize, usize)> =
                None;
            for h in [g.wrapping_sub(1), g + 1] {
                if h >= groups.len() {
                    continue;
                }
                let before =
                    ctx.conflicts(&groups[g]) + ctx.conflicts(&groups[h]);
                for i in 0..groups[g].len() {
                    for j in 0..groups[h].len() {
                        let mut a = groups[g].clone();
                        let mut b = groups[h].clone();
                        std::mem::swap(&mut a[i], &mut b[j]);
                        let after = ctx.conflicts(&a) + ctx.conflicts(&b);
                        if after >= before {
                            continue;
                        }
                        let gap = (ctx.points_of(&groups[g][i])
                            - ctx.points_of(&groups[h][j]))
                        .abs();
                        let score = (Reverse(before - after), gap);
                        if best.as_ref().is_none_or(|(s, ..)| score < *s) {
                            best = Some((score, h, i, j));
                        }
                    }
                }
            }

            if let Some((_, h, i, j)) = best {
                tracing::debug!(
                    pass,
                    a = %groups[g][i],
                    b = %groups[h][j],
                    "swapped to avoid a repeat pairing"
                );
                swap_between(groups, (g, i), (h, j));
                improved = true;
            }
        }

        if !improved {
            break;
        }
    }
}

/// Chooses the positions of a room's teams, minimising the number of times
/// each team has already held the position it is given. Equally good
/// arrangements are picked between at random.
fn assign_positions(
    group: Vec<String>,
    history: &TeamHistory,
    rng: &mut ChaCha20Rng,
) -> Result<[String; 4], MakeDrawError> {
    let best = (0..group.len())
        .permutations(group.len())
        .map(|perm| {
            let cost = perm
                .iter()
                .zip(Position::ALL)
                .map(|(idx, position)| {
                    history.position_count(&group[*idx], position)
                })
                .sum::<usize>();
            ((cost, rng.random::<u32>()), perm)
        })
        .min_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, perm)| perm)
        .unwrap_or_default();

    into_room_teams(best.into_iter().map(|idx| group[idx].clone()).collect())
}
