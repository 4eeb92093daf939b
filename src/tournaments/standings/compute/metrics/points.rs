use crate::tournaments::standings::compute::{
    TeamRoundEntry,
    metrics::{Metric, visible},
};

pub struct TeamPointsComputer;

impl Metric for TeamPointsComputer {
    fn compute(&self, rounds: &[Option<TeamRoundEntry>], reveal: bool) -> i64 {
        visible(rounds, reveal).map(|entry| entry.points).sum()
    }
}

#[cfg(test)]
#[test]
fn silent_rounds_are_hidden_until_revealed() {
    use crate::tournaments::standings::compute::metrics::entry;

    let mut silent = entry(3, 3, 150);
    silent.silent = true;
    let rounds = vec![Some(entry(1, 2, 150)), None, Some(silent)];

    assert_eq!(TeamPointsComputer.compute(&rounds, true), 5);
    assert_eq!(TeamPointsComputer.compute(&rounds, false), 2);
}
