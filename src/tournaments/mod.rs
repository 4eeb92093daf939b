use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ParticipantKind, TabError},
    tournaments::{
        config::TournamentConfig,
        participants::{Adjudicator, TournamentParticipants},
        rounds::{Round, RoundKind},
        teams::Team,
    },
};

pub mod breaks;
pub mod config;
pub mod participants;
pub mod rounds;
pub mod standings;
pub mod teams;

pub const TEAMS_PER_ROOM: usize = 4;

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TournamentStatus {
    Registration,
    Preparation,
    /// Qualification rounds are being run.
    Started,
    Playoff,
    Finished,
}

/// One tournament: roster, configuration and the append-only log of rounds.
///
/// The struct is plain data; every relation is by id. All the operations
/// that change it live in `rounds::manage` and `breaks`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub status: TournamentStatus,
    pub config: TournamentConfig,
    pub participants: TournamentParticipants,
    pub rounds: Vec<Round>,
    integrity_fault: Option<String>,
}

impl Tournament {
    pub fn new(name: impl Into<String>, config: TournamentConfig) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            status: TournamentStatus::Registration,
            config,
            participants: TournamentParticipants::default(),
            rounds: Vec::new(),
            integrity_fault: None,
        }
    }

    pub fn latest_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn qualification_rounds(&self) -> impl Iterator<Item = &Round> {
        self.rounds
            .iter()
            .filter(|round| round.kind == RoundKind::Qualification)
    }

    pub fn playoff_rounds(&self) -> impl Iterator<Item = &Round> {
        self.rounds
            .iter()
            .filter(|round| round.kind == RoundKind::Playoff)
    }

    pub fn round_of_room(&self, room_id: &str) -> Option<&Round> {
        self.rounds
            .iter()
            .find(|round| round.room(room_id).is_some())
    }

    pub(crate) fn round_index_of_room(
        &self,
        room_id: &str,
    ) -> Result<usize, TabError> {
        self.rounds
            .iter()
            .position(|round| round.room(room_id).is_some())
            .ok_or_else(|| TabError::NotFound(format!("room `{room_id}`")))
    }

    pub(crate) fn check_not_finished(&self) -> Result<(), TabError> {
        if self.status == TournamentStatus::Finished {
            return Err(TabError::LifecycleOrder(
                "the tournament has finished".into(),
            ));
        }
        Ok(())
    }

    pub fn add_team(
        &mut self,
        team: Team,
        speaker_names: [String; 2],
    ) -> Result<(), TabError> {
        self.check_roster_open()?;
        self.participants.add_team(team, speaker_names)
    }

    pub fn add_adjudicator(
        &mut self,
        adjudicator: Adjudicator,
    ) -> Result<(), TabError> {
        self.check_not_finished()?;
        self.participants.add_adjudicator(adjudicator)
    }

    fn check_roster_open(&self) -> Result<(), TabError> {
        if !self.rounds.is_empty() || self.status == TournamentStatus::Finished
        {
            return Err(TabError::LifecycleOrder(
                "teams cannot be registered once the first round exists"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Checks there are enough teams to fill rooms of four (and that they
    /// divide evenly into rooms) and enough chairs for `teams / 4` rooms.
    pub fn check_teams_and_adjudicators(
        &self,
        teams: usize,
    ) -> Result<(), TabError> {
        if teams < TEAMS_PER_ROOM || teams % TEAMS_PER_ROOM != 0 {
            return Err(TabError::InsufficientParticipants {
                kind: ParticipantKind::Teams,
                required: teams.max(1).div_ceil(TEAMS_PER_ROOM)
                    * TEAMS_PER_ROOM,
                available: teams,
            });
        }

        let required =
            teams / TEAMS_PER_ROOM * self.config.min_chairs_per_room;
        let available = self.participants.chairs();
        if available < required {
            return Err(TabError::InsufficientParticipants {
                kind: ParticipantKind::Adjudicators,
                required,
                available,
            });
        }

        Ok(())
    }

    pub fn open_registration(&mut self) -> Result<(), TabError> {
        match self.status {
            TournamentStatus::Registration | TournamentStatus::Preparation => {
                self.status = TournamentStatus::Registration;
                Ok(())
            }
            status => Err(TabError::LifecycleOrder(format!(
                "cannot open registration while {status:?}"
            ))),
        }
    }

    pub fn close_registration(&mut self) -> Result<(), TabError> {
        match self.status {
            TournamentStatus::Registration | TournamentStatus::Preparation => {
                self.status = TournamentStatus::Preparation;
                Ok(())
            }
            TournamentStatus::Started if self.rounds.is_empty() => {
                self.status = TournamentStatus::Preparation;
                Ok(())
            }
            TournamentStatus::Started => Err(TabError::LifecycleOrder(
                "remove every round before reopening preparation".into(),
            )),
            status => Err(TabError::LifecycleOrder(format!(
                "cannot close registration while {status:?}"
            ))),
        }
    }

    /// Starts (or, coming back from an abandoned break, resumes) the
    /// qualification stage.
    pub fn start(&mut self) -> Result<(), TabError> {
        match self.status {
            TournamentStatus::Registration | TournamentStatus::Preparation => {
                self.check_teams_and_adjudicators(
                    self.participants.teams.len(),
                )?;
            }
            TournamentStatus::Playoff => {
                if self.playoff_rounds().next().is_some() {
                    return Err(TabError::LifecycleOrder(
                        "remove the playoff rounds before returning to \
                         qualification"
                            .into(),
                    ));
                }
            }
            status => {
                return Err(TabError::LifecycleOrder(format!(
                    "cannot start while {status:?}"
                )));
            }
        }
        self.status = TournamentStatus::Started;
        tracing::info!(tournament = %self.id, "tournament started");
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), TabError> {
        match self.status {
            TournamentStatus::Started | TournamentStatus::Playoff => {
                self.status = TournamentStatus::Finished;
                tracing::info!(tournament = %self.id, "tournament finished");
                Ok(())
            }
            status => Err(TabError::LifecycleOrder(format!(
                "cannot finish while {status:?}"
            ))),
        }
    }

    pub fn integrity_fault(&self) -> Option<&str> {
        self.integrity_fault.as_deref()
    }

    /// Clears a recorded integrity fault once an operator has repaired the
    /// underlying data.
    pub fn resolve_integrity_fault(&mut self) {
        if let Some(fault) = self.integrity_fault.take() {
            tracing::warn!(tournament = %self.id, %fault, "integrity fault cleared");
        }
    }

    pub(crate) fn check_integrity(&self) -> Result<(), TabError> {
        match &self.integrity_fault {
            Some(fault) => Err(TabError::DataIntegrity(fault.clone())),
            None => Ok(()),
        }
    }

    /// Remembers a fatal error so that automated progression stops.
    pub(crate) fn note_fault(&mut self, err: TabError) -> TabError {
        if let TabError::DataIntegrity(fault) = &err {
            tracing::error!(tournament = %self.id, %fault, "data integrity fault");
            self.integrity_fault = Some(fault.clone());
        }
        err
    }
}
