//! Shapes standings into the tables shown to participants.

use std::cmp::Reverse;
use std::fmt;

use rand::{Rng, seq::SliceRandom};
use serde::Serialize;

use crate::tournaments::{
    config::TeamMetric,
    standings::compute::{RoundColumn, TeamStanding, TournamentTeamStandings},
};

/// How far a team got in the elimination bracket.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayoffLabel {
    NotInBreak,
    /// Knocked out in the round of `1/denominator` (e.g. 4 for the
    /// quarterfinals).
    Eliminated { denominator: u32 },
    Finalist,
    Winner,
}

impl PlayoffLabel {
    pub fn of(count_playoff_rounds: u32, playoff_position: u32) -> Self {
        if count_playoff_rounds == 0 || playoff_position == 0 {
            PlayoffLabel::NotInBreak
        } else if playoff_position > count_playoff_rounds {
            PlayoffLabel::Winner
        } else if playoff_position == count_playoff_rounds {
            PlayoffLabel::Finalist
        } else {
            PlayoffLabel::Eliminated {
                denominator: 1 << (count_playoff_rounds - playoff_position),
            }
        }
    }

    pub fn of_team(team: &TeamStanding) -> Self {
        Self::of(team.count_playoff_rounds, team.playoff_position)
    }
}

impl fmt::Display for PlayoffLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayoffLabel::NotInBreak => Ok(()),
            PlayoffLabel::Eliminated { denominator } => {
                write!(f, "1/{denominator}")
            }
            PlayoffLabel::Finalist => f.write_str("finalist"),
            PlayoffLabel::Winner => f.write_str("winner"),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TeamTabRow {
    /// Shared by every team level on all the tab's metrics.
    pub rank: usize,
    pub team_id: String,
    pub name: String,
    /// Team points per round column. `None` for rounds the team did not
    /// take part in, and for silent rounds while they are hidden.
    pub rounds: Vec<Option<i64>>,
    /// Values of the tab's metrics, in order.
    pub metrics: Vec<i64>,
    pub playoff: PlayoffLabel,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TeamTab {
    pub metrics: Vec<TeamMetric>,
    pub rounds: Vec<RoundColumn>,
    pub rows: Vec<TeamTabRow>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SpeakerTabRow {
    /// `None` while scores are hidden.
    pub rank: Option<usize>,
    pub speaker_id: String,
    pub name: String,
    pub team_name: String,
    pub scores: Vec<Option<i64>>,
    pub total: Option<i64>,
}

/// Ranks for rows already sorted best first: equal keys share the rank of
/// the first of them, i.e. one more than the number of strictly better rows.
fn competition_ranks<K: PartialEq>(keys: &[K]) -> Vec<usize> {
    let mut ranks: Vec<usize> = Vec::with_capacity(keys.len());
    for (idx, key) in keys.iter().enumerate() {
        let rank = match ranks.last() {
            Some(prev) if keys[idx - 1] == *key => *prev,
            _ => idx + 1,
        };
        ranks.push(rank);
    }
    ranks
}

/// The team tab, ordered by the tournament's standings metrics.
pub fn render_team_tab(
    standings: &TournamentTeamStandings,
    reveal: bool,
) -> TeamTab {
    render_team_tab_by(standings, &standings.metrics, reveal)
}

/// The team tab ordered (and ranked) by `metrics` alone.
///
/// Unless `reveal` is set, silent rounds are blanked out and left out of
/// every metric, so the tab does not give their results away.
pub fn render_team_tab_by(
    standings: &TournamentTeamStandings,
    metrics: &[TeamMetric],
    reveal: bool,
) -> TeamTab {
    let mut keyed = standings
        .teams
        .iter()
        .map(|team| (team.key(metrics, reveal), team))
        .collect::<Vec<_>>();
    // stable, so teams level on every metric keep the standings order
    keyed.sort_by_key(|(key, _)| Reverse(key.clone()));

    let keys = keyed.iter().map(|(key, _)| key.clone()).collect::<Vec<_>>();
    let ranks = competition_ranks(&keys);

    let rows = keyed
        .into_iter()
        .zip(ranks)
        .map(|((key, team), rank)| TeamTabRow {
            rank,
            team_id: team.team_id.clone(),
            name: team.name.clone(),
            rounds: team
                .rounds
                .iter()
                .map(|entry| {
                    entry
                        .as_ref()
                        .filter(|entry| reveal || !entry.silent)
                        .map(|entry| entry.points)
                })
                .collect(),
            metrics: key,
            playoff: PlayoffLabel::of_team(team),
        })
        .collect();

    TeamTab {
        metrics: metrics.to_vec(),
        rounds: standings.rounds.clone(),
        rows,
    }
}

/// The speaker tab. While scores are hidden the speakers are listed in a
/// random order without scores, as any order would hint at the ranking.
pub fn render_speaker_tab<R: Rng + ?Sized>(
    standings: &TournamentTeamStandings,
    reveal: bool,
    rng: &mut R,
) -> Vec<SpeakerTabRow> {
    if !reveal {
        let mut rows = standings
            .speakers
            .iter()
            .map(|speaker| SpeakerTabRow {
                rank: None,
                speaker_id: speaker.speaker_id.clone(),
                name: speaker.name.clone(),
                team_name: speaker.team_name.clone(),
                scores: vec![None; speaker.points.len()],
                total: None,
            })
            .collect::<Vec<_>>();
        rows.shuffle(rng);
        return rows;
    }

    let totals = standings
        .speakers
        .iter()
        .map(|speaker| speaker.total)
        .collect::<Vec<_>>();
    standings
        .speakers
        .iter()
        .zip(competition_ranks(&totals))
        .map(|(speaker, rank)| SpeakerTabRow {
            rank: Some(rank),
            speaker_id: speaker.speaker_id.clone(),
            name: speaker.name.clone(),
            team_name: speaker.team_name.clone(),
            scores: speaker.points.clone(),
            total: Some(speaker.total),
        })
        .collect()
}
