use serde::{Deserialize, Serialize};

/// A team of two speakers. The order of `speakers` is the canonical order;
/// a result may record that the pair spoke the other way round.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub speakers: [String; 2],
}

impl Team {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        speakers: [String; 2],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            speakers,
        }
    }

    /// The speakers in the order they actually spoke.
    pub fn speaking_order(&self, reversed: bool) -> [&str; 2] {
        if reversed {
            [&self.speakers[1], &self.speakers[0]]
        } else {
            [&self.speakers[0], &self.speakers[1]]
        }
    }
}

#[cfg(test)]
#[test]
fn reversed_teams_swap_speaking_order() {
    let team = Team::new("t", "Team", ["a".to_string(), "b".to_string()]);
    assert_eq!(team.speaking_order(false), ["a", "b"]);
    assert_eq!(team.speaking_order(true), ["b", "a"]);
}
