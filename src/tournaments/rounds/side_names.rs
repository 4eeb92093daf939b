use serde::{Deserialize, Serialize};

/// The four benches of a British Parliamentary room, in speaking order of
/// their first speakers.
#[derive(
    Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum Position {
    /// Opening Government (Prime Minister and Deputy Prime Minister).
    OG,
    /// Opening Opposition (Leader and Deputy Leader of the Opposition).
    OO,
    /// Closing Government (Member of Government and Government Whip).
    CG,
    /// Closing Opposition (Member of Opposition and Opposition Whip).
    CO,
}

impl Position {
    pub const ALL: [Position; 4] =
        [Position::OG, Position::OO, Position::CG, Position::CO];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self, short: bool) -> &'static str {
        match (self, short) {
            (Position::OG, true) => "OG",
            (Position::OG, false) => "Opening Government",
            (Position::OO, true) => "OO",
            (Position::OO, false) => "Opening Opposition",
            (Position::CG, true) => "CG",
            (Position::CG, false) => "Closing Government",
            (Position::CO, true) => "CO",
            (Position::CO, false) => "Closing Opposition",
        }
    }

    /// Names of the two speeches given by this bench.
    pub fn speech_names(self) -> [&'static str; 2] {
        match self {
            Position::OG => ["Prime Minister", "Deputy Prime Minister"],
            Position::OO => {
                ["Leader of Opposition", "Deputy Leader of Opposition"]
            }
            Position::CG => ["Member of Government", "Government Whip"],
            Position::CO => ["Member of Opposition", "Opposition Whip"],
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name(true))
    }
}

#[cfg(test)]
#[test]
fn positions_index_in_speaking_order() {
    for (i, position) in Position::ALL.iter().enumerate() {
        assert_eq!(position.index(), i);
    }
    assert_eq!(Position::CG.to_string(), "CG");
    assert_eq!(Position::OO.speech_names()[1], "Deputy Leader of Opposition");
}
