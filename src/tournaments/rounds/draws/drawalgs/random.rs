//! Creates a random draw.

use rand::seq::SliceRandom;

use crate::tournaments::{
    TEAMS_PER_ROOM,
    rounds::draws::drawalgs::{
        Draw, DrawInput, DrawnRoom, MakeDrawError, check_team_count,
        into_room_teams,
    },
};

/// Generates a random draw. Used for the first round, when there are no
/// standings to pair on.
pub fn gen_random(
    DrawInput {
        config: _,
        mut teams,
        standings: _,
        history: _,
        rng,
    }: DrawInput,
) -> Result<Draw, MakeDrawError> {
    check_team_count(teams.len())?;

    teams.shuffle(rng);

    let mut output = Vec::with_capacity(teams.len() / TEAMS_PER_ROOM);
    while !teams.is_empty() {
        let room = teams.split_off(teams.len() - TEAMS_PER_ROOM);
        output.push(DrawnRoom {
            teams: into_room_teams(room)?,
            pullups: Vec::new(),
            pulldowns: Vec::new(),
            repeats: Vec::new(),
        });
    }

    Ok(output)
}
