use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};

/// Decides which teams of a neighbouring bracket are moved when a bracket has
/// to be padded (pull-up) or trimmed (pull-down).
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug)]
pub enum PullupMetric {
    #[serde(rename = "lowest_rank")]
    LowestRank,
    #[serde(rename = "highest_rank")]
    HighestRank,
    #[serde(rename = "random")]
    Random,
    #[serde(rename = "fewer_previous_pullups")]
    FewerPreviousPullups,
}

impl std::fmt::Display for PullupMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("prefer teams: ")?;
        f.write_str(match self {
            PullupMetric::LowestRank => "lowest rank",
            PullupMetric::HighestRank => "highest rank",
            PullupMetric::Random => "random",
            PullupMetric::FewerPreviousPullups => "fewer previous pullups",
        })
    }
}

/// Whether an uneven point bracket borrows teams from the bracket below
/// (pull-up) or hands its surplus down (pull-down).
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug)]
pub enum BracketPolicy {
    /// Move whichever side of the boundary involves fewer teams. Two spare
    /// teams are pulled up.
    #[serde(rename = "fewest_moved")]
    FewestMoved,
    #[serde(rename = "pull_up")]
    PullUp,
    #[serde(rename = "pull_down")]
    PullDown,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
/// A metric upon which teams can be ranked. Metrics are applied in order; a
/// later metric only separates teams that are level on every earlier one.
pub enum TeamMetric {
    Points,
    /// The total speaker score of all the speakers on the team.
    SpeakerPoints,
    /// The total number of times a team has achieved this many points.
    NTimesAchieved(u8),
}

impl Serialize for TeamMetric {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TeamMetric::Points => serializer.serialize_str("points"),
            TeamMetric::SpeakerPoints => {
                serializer.serialize_str("speaker_points")
            }
            TeamMetric::NTimesAchieved(n) => {
                let s = format!("n_times_achieved_{}", n);
                serializer.serialize_str(&s)
            }
        }
    }
}

impl<'de> Deserialize<'de> for TeamMetric {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TeamMetricVisitor;

        impl<'de> Visitor<'de> for TeamMetricVisitor {
            type Value = TeamMetric;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string representing a TeamMetric")
            }

            fn visit_str<E>(self, value: &str) -> Result<TeamMetric, E>
            where
                E: de::Error,
            {
                match value {
                    "points" => Ok(TeamMetric::Points),
                    "speaker_points" => Ok(TeamMetric::SpeakerPoints),
                    s if s.starts_with("n_times_achieved_") => {
                        let num_str = s.trim_start_matches("n_times_achieved_");
                        match num_str.parse::<u8>() {
                            Ok(n) => Ok(TeamMetric::NTimesAchieved(n)),
                            Err(_) => Err(E::custom(format!(
                                "invalid number in metric: {}",
                                s
                            ))),
                        }
                    }
                    _ => Err(E::unknown_variant(
                        value,
                        &["points", "speaker_points", "n_times_achieved_..."],
                    )),
                }
            }
        }
        deserializer.deserialize_str(TeamMetricVisitor)
    }
}

impl std::fmt::Display for TeamMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TeamMetric::Points => "#points",
            TeamMetric::SpeakerPoints => "total speaker score",
            TeamMetric::NTimesAchieved(points) => {
                return write!(f, "#times achieved {points} points");
            }
        })
    }
}

/// Tunable rules of a single tournament. Serialised as TOML when an operator
/// edits the configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TournamentConfig {
    /// Team points awarded for finishing 1st, 2nd, 3rd and 4th in a
    /// qualification room.
    pub placement_points: [i64; 4],
    /// Highest score a single speech can be given.
    pub max_speaker_score: i64,
    pub team_standings_metrics: Vec<TeamMetric>,
    pub pullup_metrics: Vec<PullupMetric>,
    pub bracket_policy: BracketPolicy,
    /// Upper bound on improvement passes when repairing repeat pairings.
    pub max_swap_passes: usize,
    pub count_teams_in_break: usize,
    pub min_chairs_per_room: usize,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            placement_points: [3, 2, 1, 0],
            max_speaker_score: 100,
            team_standings_metrics: vec![
                TeamMetric::Points,
                TeamMetric::SpeakerPoints,
            ],
            pullup_metrics: vec![PullupMetric::HighestRank],
            bracket_policy: BracketPolicy::FewestMoved,
            max_swap_passes: 16,
            count_teams_in_break: 8,
            min_chairs_per_room: 1,
        }
    }
}

impl TournamentConfig {
    /// Points for finishing in `place` (1-based). Places outside 1..=4 are
    /// rejected when results are recorded, so they never reach this.
    pub fn points_for_place(&self, place: u8) -> i64 {
        self.placement_points
            .get(usize::from(place).wrapping_sub(1))
            .copied()
            .unwrap_or(0)
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

#[cfg(test)]
#[test]
fn test_all_variants_roundtrip() {
    let metrics_to_test = vec![
        TeamMetric::Points,
        TeamMetric::SpeakerPoints,
        TeamMetric::NTimesAchieved(0),
        TeamMetric::NTimesAchieved(3),
        TeamMetric::NTimesAchieved(255),
    ];

    for original_metric in metrics_to_test {
        let serialized_metric = serde_json::to_string(&original_metric)
            .expect("Failed to serialize metric");

        let deserialized_metric: TeamMetric =
            serde_json::from_str(&serialized_metric)
                .expect("Failed to deserialize metric");

        assert_eq!(
            original_metric, deserialized_metric,
            "Round trip failed for {:?}",
            original_metric
        );
    }
}

#[cfg(test)]
#[test]
fn test_partial_toml_falls_back_to_defaults() {
    let config = TournamentConfig::from_toml(
        r#"
        placement_points = [4, 2, 1, 0]
        team_standings_metrics = ["points", "n_times_achieved_3"]
        bracket_policy = "pull_down"
        "#,
    )
    .unwrap();

    assert_eq!(config.placement_points, [4, 2, 1, 0]);
    assert_eq!(
        config.team_standings_metrics,
        vec![TeamMetric::Points, TeamMetric::NTimesAchieved(3)]
    );
    assert_eq!(config.bracket_policy, BracketPolicy::PullDown);
    assert_eq!(config.pullup_metrics, vec![PullupMetric::HighestRank]);
    assert_eq!(config.count_teams_in_break, 8);
    assert_eq!(config.points_for_place(1), 4);
    assert_eq!(config.points_for_place(4), 0);

    let reparsed =
        TournamentConfig::from_toml(&config.to_toml().unwrap()).unwrap();
    assert_eq!(reparsed, config);
}

#[cfg(test)]
#[test]
fn test_unknown_metric_is_rejected() {
    assert!(
        TournamentConfig::from_toml(r#"team_standings_metrics = ["wins"]"#)
            .is_err()
    );
}
