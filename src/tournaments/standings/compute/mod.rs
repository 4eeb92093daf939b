use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::{
    error::TabError,
    tournaments::{
        Tournament,
        config::TeamMetric,
        rounds::{
            Round, RoundKind, results::GameResult, side_names::Position,
        },
        standings::compute::metrics::compute_metric,
    },
};

pub mod history;
pub mod metrics;

/// One team's result in one qualification round.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TeamRoundEntry {
    pub seq: u32,
    pub place: u8,
    pub points: i64,
    pub speaker_points: i64,
    pub silent: bool,
}

/// A column of the tab: one completed qualification round.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RoundColumn {
    pub seq: u32,
    pub silent: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TeamStanding {
    pub team_id: String,
    pub name: String,
    /// Aligned with [`TournamentTeamStandings::rounds`].
    pub rounds: Vec<Option<TeamRoundEntry>>,
    pub points: i64,
    pub speaker_points: i64,
    /// Number of layers in the elimination bracket the team broke into; zero
    /// if it did not break.
    pub count_playoff_rounds: u32,
    /// Deepest layer the team reached (1-based). One more than
    /// `count_playoff_rounds` for the winner.
    pub playoff_position: u32,
}

impl TeamStanding {
    pub fn metric(&self, metric: TeamMetric, reveal: bool) -> i64 {
        compute_metric(metric, &self.rounds, reveal)
    }

    /// Sort key: metric values in order, larger is better.
    pub fn key(&self, metrics: &[TeamMetric], reveal: bool) -> Vec<i64> {
        metrics
            .iter()
            .map(|metric| self.metric(*metric, reveal))
            .collect()
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SpeakerStanding {
    pub speaker_id: String,
    pub name: String,
    pub team_id: String,
    pub team_name: String,
    /// Score per round column. `None` when the speaker did not speak.
    pub points: Vec<Option<i64>>,
    pub total: i64,
}

/// Everything the tab is built from. A pure function of the tournament's
/// completed rounds.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TournamentTeamStandings {
    pub metrics: Vec<TeamMetric>,
    pub rounds: Vec<RoundColumn>,
    /// Best first.
    pub teams: Vec<TeamStanding>,
    /// Highest total first.
    pub speakers: Vec<SpeakerStanding>,
}

/// Checks a completed round before any of its results are trusted.
fn check_round(t: &Tournament, round: &Round) -> Result<(), TabError> {
    let mut seen = HashSet::new();
    for room in &round.rooms {
        let Some(result) = &room.result else {
            return Err(TabError::DataIntegrity(format!(
                "round {} is marked {:?} but room {} has no result",
                round.seq, round.status, room.number
            )));
        };
        if result.kind() != round.expected_result_kind() {
            return Err(TabError::DataIntegrity(format!(
                "room {} of round {} holds a {} result, expected {}",
                room.number,
                round.seq,
                result.kind(),
                round.expected_result_kind()
            )));
        }
        for team in &room.teams {
            if !t.participants.teams.contains_key(team) {
                return Err(TabError::DataIntegrity(format!(
                    "round {} refers to unknown team `{team}`",
                    round.seq
                )));
            }
            if !seen.insert(team.as_str()) {
                return Err(TabError::DataIntegrity(format!(
                    "team `{team}` appears twice in round {}",
                    round.seq
                )));
            }
        }
    }
    Ok(())
}

impl TournamentTeamStandings {
    #[tracing::instrument(skip_all, fields(tournament = %t.id))]
    pub fn compute(t: &Tournament) -> Result<Self, TabError> {
        let completed = t
            .rounds
            .iter()
            .filter(|round| round.status.is_complete())
            .collect::<Vec<_>>();
        for round in &completed {
            check_round(t, round)?;
        }

        let columns = completed
            .iter()
            .filter(|round| round.kind == RoundKind::Qualification)
            .map(|round| RoundColumn {
                seq: round.seq,
                silent: round.silent,
            })
            .collect::<Vec<_>>();

        let mut entries: HashMap<&str, Vec<Option<TeamRoundEntry>>> = t
            .participants
            .teams
            .keys()
            .map(|id| (id.as_str(), vec![None; columns.len()]))
            .collect();
        let mut speaker_points: HashMap<&str, Vec<Option<i64>>> = t
            .participants
            .speakers
            .keys()
            .map(|id| (id.as_str(), vec![None; columns.len()]))
            .collect();

        let qualification = completed
            .iter()
            .filter(|round| round.kind == RoundKind::Qualification);
        for (col, round) in qualification.enumerate() {
            for room in &round.rooms {
                let Some(result @ GameResult::Qualification(_)) = &room.result
                else {
                    continue;
                };
                for position in Position::ALL {
                    let team_id = room.team_at(position);
                    let team = t.participants.team(team_id)?;
                    let outcome = result.outcome(position);
                    let points =
                        result.team_points(position, &t.config).unwrap_or(0);

                    // reversal decides who gets which score, not the total
                    let order = team.speaking_order(outcome.reversed);
                    for (speaker, score) in order.iter().zip(outcome.speeches)
                    {
                        if let Some(slot) = speaker_points.get_mut(speaker) {
                            slot[col] = score;
                        }
                    }

                    if let Some(slots) = entries.get_mut(team_id) {
                        slots[col] = Some(TeamRoundEntry {
                            seq: round.seq,
                            place: outcome.place.unwrap_or(0),
                            points,
                            speaker_points: outcome
                                .speeches
                                .iter()
                                .flatten()
                                .sum(),
                            silent: round.silent,
                        });
                    }
                }
            }
        }

        let playoff = playoff_bookkeeping(t);

        let mut teams = t
            .participants
            .teams
            .values()
            .map(|team| {
                let rounds =
                    entries.remove(team.id.as_str()).unwrap_or_default();
                let (count_playoff_rounds, playoff_position) = playoff
                    .get(team.id.as_str())
                    .copied()
                    .unwrap_or((0, 0));
                TeamStanding {
                    team_id: team.id.clone(),
                    name: team.name.clone(),
                    points: compute_metric(TeamMetric::Points, &rounds, true),
                    speaker_points: compute_metric(
                        TeamMetric::SpeakerPoints,
                        &rounds,
                        true,
                    ),
                    rounds,
                    count_playoff_rounds,
                    playoff_position,
                }
            })
            .collect::<Vec<_>>();

        let metrics = t.config.team_standings_metrics.clone();
        // stable: registration order settles complete ties
        teams.sort_by_cached_key(|team| Reverse(team.key(&metrics, true)));

        let mut speakers = t
            .participants
            .speakers
            .values()
            .map(|speaker| {
                let points = speaker_points
                    .remove(speaker.id.as_str())
                    .unwrap_or_default();
                SpeakerStanding {
                    speaker_id: speaker.id.clone(),
                    name: speaker.name.clone(),
                    team_id: speaker.team_id.clone(),
                    team_name: t
                        .participants
                        .teams
                        .get(&speaker.team_id)
                        .map(|team| team.name.clone())
                        .unwrap_or_default(),
                    total: points.iter().flatten().sum(),
                    points,
                }
            })
            .collect::<Vec<_>>();
        speakers.sort_by_key(|speaker| Reverse(speaker.total));

        Ok(Self {
            metrics,
            rounds: columns,
            teams,
            speakers,
        })
    }

    pub fn team(&self, team_id: &str) -> Option<&TeamStanding> {
        self.teams.iter().find(|team| team.team_id == team_id)
    }

    pub fn points_of_team(&self, team_id: &str) -> Option<i64> {
        self.team(team_id).map(|team| team.points)
    }

    /// Team ids, best first.
    pub fn ranked_ids(&self) -> impl Iterator<Item = &str> {
        self.teams.iter().map(|team| team.team_id.as_str())
    }
}

/// `(count_playoff_rounds, playoff_position)` for every team that broke.
///
/// Layers count as reached as soon as they are drawn, so removing the most
/// recent layer also removes the positions it granted.
fn playoff_bookkeeping(t: &Tournament) -> HashMap<&str, (u32, u32)> {
    let mut bookkeeping = HashMap::new();

    let layers = t.playoff_rounds().collect::<Vec<_>>();
    let Some(first) = layers.first() else {
        return bookkeeping;
    };
    // rooms halve every layer down to the final
    let depth = first.rooms.len().max(1).ilog2() + 1;

    for (layer, round) in layers.iter().enumerate() {
        for team in round.team_ids() {
            bookkeeping.insert(team, (depth, layer as u32 + 1));
        }
        if round.is_final() {
            if let Some(GameResult::Final(result)) =
                round.rooms.first().and_then(|room| room.result.as_ref())
            {
                let room = &round.rooms[0];
                for position in Position::ALL {
                    if result.places[position.index()] == 1 {
                        bookkeeping
                            .insert(room.team_at(position), (depth, depth + 1));
                    }
                }
            }
        }
    }

    bookkeeping
}
