use crate::tournaments::{
    config::TeamMetric, standings::compute::TeamRoundEntry,
};

pub mod n_times_specific_result;
pub mod points;
pub mod tss;

use n_times_specific_result::NTimesSpecificResultComputer;
use points::TeamPointsComputer;
use tss::TotalTeamSpeakerScoreComputer;

/// A value folded over the qualification rounds of one team.
///
/// `rounds` is aligned with the standings' round columns; `None` marks a
/// round the team did not take part in.
pub trait Metric {
    fn compute(&self, rounds: &[Option<TeamRoundEntry>], reveal: bool) -> i64;
}

/// The entries a viewer may see. Silent rounds only count once revealed.
pub fn visible(
    rounds: &[Option<TeamRoundEntry>],
    reveal: bool,
) -> impl Iterator<Item = &TeamRoundEntry> {
    rounds
        .iter()
        .flatten()
        .filter(move |entry| reveal || !entry.silent)
}

pub fn compute_metric(
    metric: TeamMetric,
    rounds: &[Option<TeamRoundEntry>],
    reveal: bool,
) -> i64 {
    match metric {
        TeamMetric::Points => TeamPointsComputer.compute(rounds, reveal),
        TeamMetric::SpeakerPoints => {
            TotalTeamSpeakerScoreComputer.compute(rounds, reveal)
        }
        TeamMetric::NTimesAchieved(p) => {
            NTimesSpecificResultComputer(p).compute(rounds, reveal)
        }
    }
}

#[cfg(test)]
pub(crate) fn entry(seq: u32, points: i64, speaks: i64) -> TeamRoundEntry {
    TeamRoundEntry {
        seq,
        place: (4 - points) as u8,
        points,
        speaker_points: speaks,
        silent: false,
    }
}
