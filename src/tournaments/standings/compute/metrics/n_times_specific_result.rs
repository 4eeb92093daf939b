use crate::tournaments::standings::compute::{
    TeamRoundEntry,
    metrics::{Metric, visible},
};

/// How many times a team took exactly `.0` points from a room.
pub struct NTimesSpecificResultComputer(pub u8);

impl Metric for NTimesSpecificResultComputer {
    fn compute(&self, rounds: &[Option<TeamRoundEntry>], reveal: bool) -> i64 {
        visible(rounds, reveal)
            .filter(|entry| entry.points == i64::from(self.0))
            .count() as i64
    }
}

#[cfg(test)]
#[test]
fn counts_rooms_won() {
    use crate::tournaments::standings::compute::metrics::entry;

    let rounds = vec![
        Some(entry(1, 3, 150)),
        Some(entry(2, 3, 140)),
        Some(entry(3, 1, 135)),
    ];
    assert_eq!(NTimesSpecificResultComputer(3).compute(&rounds, true), 2);
    assert_eq!(NTimesSpecificResultComputer(0).compute(&rounds, true), 0);
}
