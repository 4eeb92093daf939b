//! Seeding of the elimination bracket.
//!
//! Seeds are 1-based positions in the qualification standings. The breaking
//! teams are folded into rooms so that every room gets one team from each
//! quarter of the break, and the rooms are then laid out in bracket order so
//! that the rooms of the top seeds only meet in the final.

/// The `rooms`-room layer's rooms in bracket order, identified by the seed of
/// their top team. For example `[1, 4, 2, 3]` for four rooms.
///
/// `rooms` must be a power of two.
pub fn bracket_order(rooms: usize) -> Vec<usize> {
    let mut order = vec![1];
    while order.len() < rooms {
        let mirror = order.len() * 2 + 1;
        order = order
            .into_iter()
            .flat_map(|seed| [seed, mirror - seed])
            .collect();
    }
    order
}

/// Seeds placed in the room headed by seed `room` (1-based), when the break
/// fills `rooms` rooms.
pub fn room_seeds(room: usize, rooms: usize) -> [usize; 4] {
    [
        room,
        2 * rooms + 1 - room,
        2 * rooms + room,
        4 * rooms + 1 - room,
    ]
}

/// Seeds of every first-layer room, in bracket order.
pub fn first_layer(rooms: usize) -> Vec<[usize; 4]> {
    bracket_order(rooms)
        .into_iter()
        .map(|room| room_seeds(room, rooms))
        .collect()
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn bracket_order_keeps_top_seeds_apart() {
        assert_eq!(bracket_order(1), [1]);
        assert_eq!(bracket_order(2), [1, 2]);
        assert_eq!(bracket_order(4), [1, 4, 2, 3]);
        assert_eq!(bracket_order(8), [1, 8, 4, 5, 2, 7, 3, 6]);
    }

    #[test]
    fn rooms_take_one_team_per_quarter() {
        assert_eq!(room_seeds(1, 1), [1, 2, 3, 4]);
        assert_eq!(first_layer(2), [[1, 4, 5, 8], [2, 3, 6, 7]]);
    }

    #[test]
    fn every_seed_is_placed_once() {
        for rooms in [1, 2, 4, 8, 16] {
            let seeds = first_layer(rooms)
                .into_iter()
                .flatten()
                .sorted()
                .collect_vec();
            assert_eq!(seeds, (1..=rooms * 4).collect_vec());
        }
    }
}
