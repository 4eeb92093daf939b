use crate::tournaments::rounds::{
    Room,
    draws::drawalgs::{DrawInput, DrawGenerator, MakeDrawError},
};

pub mod drawalgs;

/// Runs `generator` and lays its output out as rooms, numbered from 1 in
/// ranking order.
pub fn do_draw(
    input: DrawInput,
    generator: DrawGenerator,
) -> Result<Vec<Room>, MakeDrawError> {
    let draw = (generator)(input)?;

    Ok(draw
        .into_iter()
        .zip(1..)
        .map(|(drawn, number)| {
            let mut room = Room::new(number, drawn.teams);
            room.pullups = drawn.pullups;
            room.pulldowns = drawn.pulldowns;
            room.repeats = drawn.repeats;
            room
        })
        .collect())
}
