use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::tournaments::rounds::{Round, RoundKind, side_names::Position};

/// Contains the draw history of each team in the given tournament: how often
/// it has sat in each position, whom it has already met, and how often it
/// was moved between point brackets.
#[derive(Debug, Default, Clone)]
pub struct TeamHistory {
    pub positions: HashMap<String, [usize; 4]>,
    met: HashSet<(String, String)>,
    pub pullups: HashMap<String, usize>,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl TeamHistory {
    /// Builds the history from every qualification round generated so far,
    /// whatever its status.
    pub fn of_rounds<'a>(rounds: impl IntoIterator<Item = &'a Round>) -> Self {
        let mut history = TeamHistory::default();

        for round in rounds
            .into_iter()
            .filter(|round| round.kind == RoundKind::Qualification)
        {
            for room in &round.rooms {
                for position in Position::ALL {
                    history
                        .positions
                        .entry(room.team_at(position).to_string())
                        .or_default()[position.index()] += 1;
                }
                for (a, b) in room.teams.iter().tuple_combinations() {
                    history.met.insert(pair_key(a, b));
                }
                for team in &room.pullups {
                    *history.pullups.entry(team.clone()).or_default() += 1;
                }
            }
        }

        history
    }

    pub fn have_met(&self, a: &str, b: &str) -> bool {
        self.met.contains(&pair_key(a, b))
    }

    /// Pairs in `teams` which have already shared a room.
    pub fn repeats_in<'a>(
        &self,
        teams: &'a [String],
    ) -> Vec<(&'a str, &'a str)> {
        teams
            .iter()
            .tuple_combinations()
            .filter(|(a, b)| self.have_met(a, b))
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect()
    }

    pub fn position_count(&self, team: &str, position: Position) -> usize {
        self.positions
            .get(team)
            .map(|counts| counts[position.index()])
            .unwrap_or(0)
    }

    pub fn pullup_count(&self, team: &str) -> usize {
        self.pullups.get(team).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournaments::rounds::{Motion, Room};

    #[test]
    fn records_meetings_and_positions() {
        let mut room = Room::new(
            1,
            ["a", "b", "c", "d"].map(String::from),
        );
        room.pullups.push("d".into());
        let round = Round::new(
            1,
            RoundKind::Qualification,
            Motion::new("THW"),
            vec![room],
        );
        let history = TeamHistory::of_rounds([&round]);

        assert!(history.have_met("a", "d"));
        assert!(history.have_met("d", "a"));
        assert!(!history.have_met("a", "e"));
        assert_eq!(history.position_count("c", Position::CG), 1);
        assert_eq!(history.position_count("c", Position::OG), 0);
        assert_eq!(history.pullup_count("d"), 1);

        let group = ["a", "e", "b", "f"].map(String::from);
        assert_eq!(history.repeats_in(&group), vec![("a", "b")]);
    }

    #[test]
    fn playoff_rounds_are_ignored() {
        let round = Round::new(
            4,
            RoundKind::Playoff,
            Motion::new("THW"),
            vec![Room::new(1, ["a", "b", "c", "d"].map(String::from))],
        );
        let history = TeamHistory::of_rounds([&round]);
        assert!(!history.have_met("a", "b"));
    }
}
