use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tournaments::rounds::{
    results::{GameResult, ResultKind},
    side_names::Position,
};

pub mod draws;
pub mod manage;
pub mod results;
pub mod side_names;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Motion {
    pub motion: String,
    pub infoslide: Option<String>,
}

impl Motion {
    pub fn new(motion: impl Into<String>) -> Self {
        Self {
            motion: motion.into(),
            infoslide: None,
        }
    }
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoundKind {
    Qualification,
    Playoff,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoundStatus {
    /// Generated, only visible to the tab team.
    Draft,
    Public,
    /// Every room has a result.
    ResultsRecorded,
    /// Superseded by the next round. Nothing about the draw or results may
    /// change any more.
    Closed,
}

impl RoundStatus {
    /// Results of rounds in these states count towards the standings.
    pub fn is_complete(self) -> bool {
        matches!(self, RoundStatus::ResultsRecorded | RoundStatus::Closed)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    /// Display order within the round, starting at 1 for the top room.
    pub number: u32,
    /// Team ids indexed by [`Position`]. Always four distinct teams.
    pub teams: [String; 4],
    pub chair: Option<String>,
    pub wings: Vec<String>,
    /// Opaque venue reference.
    pub place: Option<String>,
    /// Position of the room in the elimination bracket. Winners of slots
    /// `2k - 1` and `2k` meet in slot `k` of the next layer.
    pub bracket_slot: Option<u32>,
    /// Teams pulled up from a lower point bracket into this room.
    pub pullups: Vec<String>,
    #[serde(default)]
    pub pulldowns: Vec<String>,
    /// Pairs of teams placed together again because no better draw was
    /// found.
    pub repeats: Vec<(String, String)>,
    pub result: Option<GameResult>,
}

impl Room {
    pub fn new(number: u32, teams: [String; 4]) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            number,
            teams,
            chair: None,
            wings: Vec::new(),
            place: None,
            bracket_slot: None,
            pullups: Vec::new(),
            pulldowns: Vec::new(),
            repeats: Vec::new(),
            result: None,
        }
    }

    pub fn team_at(&self, position: Position) -> &str {
        &self.teams[position.index()]
    }

    pub fn position_of(&self, team_id: &str) -> Option<Position> {
        Position::ALL
            .into_iter()
            .find(|position| self.teams[position.index()] == team_id)
    }

    pub fn contains(&self, team_id: &str) -> bool {
        self.position_of(team_id).is_some()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub id: String,
    /// 1-based; playoff layers continue the numbering after the last
    /// qualification round.
    pub seq: u32,
    pub kind: RoundKind,
    pub motion: Motion,
    pub is_public: bool,
    pub status: RoundStatus,
    /// A "closed" round in BP terms: results stay off the public tab until
    /// the tab is revealed.
    pub silent: bool,
    pub rooms: Vec<Room>,
    pub created_at: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
}

impl Round {
    pub fn new(
        seq: u32,
        kind: RoundKind,
        motion: Motion,
        rooms: Vec<Room>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            seq,
            kind,
            motion,
            is_public: false,
            status: RoundStatus::Draft,
            silent: false,
            rooms,
            created_at: chrono::Utc::now().naive_utc(),
            published_at: None,
        }
    }

    pub fn all_results_recorded(&self) -> bool {
        self.rooms.iter().all(|room| room.result.is_some())
    }

    pub fn any_result_recorded(&self) -> bool {
        self.rooms.iter().any(|room| room.result.is_some())
    }

    pub fn is_final(&self) -> bool {
        self.kind == RoundKind::Playoff && self.rooms.len() == 1
    }

    /// The result variant rooms of this round must carry.
    pub fn expected_result_kind(&self) -> ResultKind {
        match self.kind {
            RoundKind::Qualification => ResultKind::Qualification,
            RoundKind::Playoff if self.is_final() => ResultKind::Final,
            RoundKind::Playoff => ResultKind::Playoff,
        }
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == room_id)
    }

    pub fn room_of_team(&self, team_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|room| room.contains(team_id))
    }

    pub fn team_ids(&self) -> impl Iterator<Item = &str> {
        self.rooms
            .iter()
            .flat_map(|room| room.teams.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teams(prefix: &str) -> [String; 4] {
        [0, 1, 2, 3].map(|i| format!("{prefix}{i}"))
    }

    #[test]
    fn rooms_locate_teams() {
        let room = Room::new(1, teams("t"));
        assert_eq!(room.position_of("t2"), Some(Position::CG));
        assert_eq!(room.team_at(Position::OO), "t1");
        assert!(!room.contains("x"));
    }

    #[test]
    fn single_room_playoff_is_the_final() {
        let round = Round::new(
            5,
            RoundKind::Playoff,
            Motion::new("THW"),
            vec![Room::new(1, teams("t"))],
        );
        assert!(round.is_final());
        assert_eq!(round.expected_result_kind(), ResultKind::Final);
        assert_eq!(round.status, RoundStatus::Draft);
        assert!(!round.all_results_recorded());
        assert_eq!(round.team_ids().count(), 4);
    }
}
