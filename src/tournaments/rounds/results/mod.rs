//! Results of a single room.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    error::TabError,
    tournaments::{config::TournamentConfig, rounds::side_names::Position},
};

/// Speaker scores of one bench, in speech order (e.g. Prime Minister then
/// Deputy Prime Minister).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BenchScores {
    pub scores: [i64; 2],
    /// `false` when nobody gave that speech. The score is then ignored.
    pub exists: [bool; 2],
    /// The team's speakers spoke in the opposite order to the one they were
    /// registered in.
    pub reversed: bool,
}

impl BenchScores {
    pub fn new(first: i64, second: i64) -> Self {
        Self {
            scores: [first, second],
            exists: [true, true],
            reversed: false,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Scores in speech order, `None` for speeches that did not happen.
    pub fn speeches(&self) -> [Option<i64>; 2] {
        [0, 1].map(|i| self.exists[i].then_some(self.scores[i]))
    }

    pub fn total(&self) -> i64 {
        self.speeches().iter().flatten().sum()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct QualificationResult {
    /// Place (1 to 4) of each bench, indexed by [`Position`].
    pub places: [u8; 4],
    pub benches: [BenchScores; 4],
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlayoffResult {
    /// Whether each bench goes through, indexed by [`Position`].
    pub advanced: [bool; 4],
    pub reversed: [bool; 4],
}

/// Result of the grand final, which is placed rather than split into
/// advancing and eliminated teams.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FinalResult {
    pub places: [u8; 4],
    pub reversed: [bool; 4],
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum GameResult {
    Qualification(QualificationResult),
    Playoff(PlayoffResult),
    Final(FinalResult),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResultKind {
    Qualification,
    Playoff,
    Final,
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResultKind::Qualification => "qualification",
            ResultKind::Playoff => "playoff",
            ResultKind::Final => "final",
        })
    }
}

/// What a result says about one bench.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeamOutcome {
    pub place: Option<u8>,
    pub advanced: Option<bool>,
    /// Scores in speech order.
    pub speeches: [Option<i64>; 2],
    pub reversed: bool,
}

fn check_places(places: &[u8; 4]) -> Result<(), TabError> {
    let sorted = places.iter().copied().sorted().collect_vec();
    if sorted != [1, 2, 3, 4] {
        return Err(TabError::InvalidResult(format!(
            "places {places:?} must rank the four teams 1st to 4th without ties"
        )));
    }
    Ok(())
}

impl GameResult {
    pub fn kind(&self) -> ResultKind {
        match self {
            GameResult::Qualification(_) => ResultKind::Qualification,
            GameResult::Playoff(_) => ResultKind::Playoff,
            GameResult::Final(_) => ResultKind::Final,
        }
    }

    pub fn validate(&self, config: &TournamentConfig) -> Result<(), TabError> {
        match self {
            GameResult::Qualification(result) => {
                check_places(&result.places)?;
                let max = config.max_speaker_score;
                for (position, bench) in
                    Position::ALL.iter().zip(&result.benches)
                {
                    if let Some(score) = bench
                        .speeches()
                        .into_iter()
                        .flatten()
                        .find(|score| !(0..=max).contains(score))
                    {
                        return Err(TabError::InvalidResult(format!(
                            "speaker score {score} for {position} is outside \
                             0 to {max}"
                        )));
                    }
                }
                Ok(())
            }
            GameResult::Playoff(result) => {
                let advancing =
                    result.advanced.iter().filter(|adv| **adv).count();
                if advancing != 2 {
                    return Err(TabError::InvalidResult(format!(
                        "exactly two teams must advance from a playoff room \
                         ({advancing} marked)"
                    )));
                }
                Ok(())
            }
            GameResult::Final(result) => check_places(&result.places),
        }
    }

    pub fn outcome(&self, position: Position) -> TeamOutcome {
        let i = position.index();
        match self {
            GameResult::Qualification(result) => TeamOutcome {
                place: Some(result.places[i]),
                advanced: None,
                speeches: result.benches[i].speeches(),
                reversed: result.benches[i].reversed,
            },
            GameResult::Playoff(result) => TeamOutcome {
                place: None,
                advanced: Some(result.advanced[i]),
                speeches: [None, None],
                reversed: result.reversed[i],
            },
            GameResult::Final(result) => TeamOutcome {
                place: Some(result.places[i]),
                advanced: None,
                speeches: [None, None],
                reversed: result.reversed[i],
            },
        }
    }

    /// Team points earned by the bench, for results that award points.
    pub fn team_points(
        &self,
        position: Position,
        config: &TournamentConfig,
    ) -> Option<i64> {
        match self {
            GameResult::Qualification(result) => {
                Some(config.points_for_place(result.places[position.index()]))
            }
            GameResult::Playoff(_) | GameResult::Final(_) => None,
        }
    }
}
