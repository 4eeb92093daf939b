use rand_chacha::ChaCha20Rng;

use crate::tournaments::{
    TEAMS_PER_ROOM,
    config::TournamentConfig,
    standings::compute::{TournamentTeamStandings, history::TeamHistory},
};

pub mod general;
pub mod random;

/// The error messages will be shown to the tab team, and therefore should be
/// readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MakeDrawError {
    InvalidConfiguration(String),
    InvalidTeamCount { required: usize, available: usize },
}

pub struct DrawInput<'a> {
    pub config: &'a TournamentConfig,
    /// Teams to be drawn, in registration order.
    pub teams: Vec<String>,
    pub standings: &'a TournamentTeamStandings,
    pub history: &'a TeamHistory,
    pub rng: &'a mut ChaCha20Rng,
}

/// One room of a generated draw. `teams` is indexed by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnRoom {
    pub teams: [String; 4],
    /// Teams pulled up from a lower point bracket into this room.
    pub pullups: Vec<String>,
    /// Surplus teams of a higher bracket pulled down into this room.
    pub pulldowns: Vec<String>,
    /// Pairs of teams in this room which have met before.
    pub repeats: Vec<(String, String)>,
}

/// Rooms in ranking order: the first room holds the top bracket.
pub type Draw = Vec<DrawnRoom>;

pub type DrawGenerator = fn(DrawInput) -> Result<Draw, MakeDrawError>;

/// Fails unless `teams` fill a whole number of rooms.
pub fn check_team_count(teams: usize) -> Result<(), MakeDrawError> {
    if teams < TEAMS_PER_ROOM || teams % TEAMS_PER_ROOM != 0 {
        return Err(MakeDrawError::InvalidTeamCount {
            required: teams.max(1).div_ceil(TEAMS_PER_ROOM) * TEAMS_PER_ROOM,
            available: teams,
        });
    }
    Ok(())
}

pub(crate) fn into_room_teams(
    teams: Vec<String>,
) -> Result<[String; 4], MakeDrawError> {
    let len = teams.len();
    <[String; 4]>::try_from(teams).map_err(|_| {
        MakeDrawError::InvalidConfiguration(format!(
            "a room was formed with {len} teams"
        ))
    })
}
