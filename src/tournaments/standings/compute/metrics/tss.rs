use crate::tournaments::standings::compute::{
    TeamRoundEntry,
    metrics::{Metric, visible},
};

/// Sum of both speakers' scores over every counted round.
pub struct TotalTeamSpeakerScoreComputer;

impl Metric for TotalTeamSpeakerScoreComputer {
    fn compute(&self, rounds: &[Option<TeamRoundEntry>], reveal: bool) -> i64 {
        visible(rounds, reveal)
            .map(|entry| entry.speaker_points)
            .sum()
    }
}

#[cfg(test)]
#[test]
fn sums_speaker_points() {
    use crate::tournaments::standings::compute::metrics::entry;

    let rounds = vec![
        Some(entry(1, 3, 150)),
        Some(entry(2, 2, 140)),
        Some(entry(3, 0, 135)),
    ];
    assert_eq!(TotalTeamSpeakerScoreComputer.compute(&rounds, true), 425);
}
