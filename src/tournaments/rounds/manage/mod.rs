//! The round lifecycle: `Draft → Public → ResultsRecorded → Closed`, with
//! removal of the latest round while it has no results.

use std::collections::HashSet;

use rand_chacha::ChaCha20Rng;

use crate::{
    error::TabError,
    tournaments::{
        Tournament, TournamentStatus,
        rounds::{
            Motion, Round, RoundKind, RoundStatus,
            draws::{
                do_draw,
                drawalgs::{DrawGenerator, DrawInput, general, random},
            },
            results::GameResult,
        },
        standings::compute::{TournamentTeamStandings, history::TeamHistory},
    },
};

/// Changes to a single room. Fields left as `None` are not touched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoomEdit {
    /// New team slots, indexed by position.
    pub teams: Option<[String; 4]>,
    pub chair: Option<Option<String>>,
    pub wings: Option<Vec<String>>,
    pub place: Option<Option<String>>,
    pub number: Option<u32>,
}

impl RoomEdit {
    fn changes_draw(&self) -> bool {
        self.teams.is_some() || self.chair.is_some() || self.wings.is_some()
    }
}

impl Tournament {
    /// Draws the next qualification round. The first round is drawn at
    /// random, every later one is power-paired on the current standings.
    ///
    /// On success the previous round is closed and the new round is stored
    /// as a draft.
    #[tracing::instrument(skip(self, motion, rng), fields(tournament = %self.id))]
    pub fn generate_next_round(
        &mut self,
        motion: Motion,
        silent: bool,
        rng: &mut ChaCha20Rng,
    ) -> Result<&Round, TabError> {
        self.check_integrity()?;
        if self.status != TournamentStatus::Started {
            return Err(TabError::LifecycleOrder(format!(
                "qualification rounds can only be drawn once the tournament \
                 has started (it is {:?})",
                self.status
            )));
        }
        if let Some(latest) = self.latest_round() {
            if !latest.all_results_recorded() || !latest.status.is_complete()
            {
                return Err(TabError::LifecycleOrder(format!(
                    "round {} still has rooms without a result",
                    latest.seq
                )));
            }
        }
        self.check_teams_and_adjudicators(self.participants.teams.len())?;

        let standings = TournamentTeamStandings::compute(self)
            .map_err(|err| self.note_fault(err))?;
        let history = TeamHistory::of_rounds(&self.rounds);
        let generator: DrawGenerator = if self.rounds.is_empty() {
            random::gen_random
        } else {
            general::make_draw
        };

        let rooms = do_draw(
            DrawInput {
                config: &self.config,
                teams: self.participants.teams.keys().cloned().collect(),
                standings: &standings,
                history: &history,
                rng,
            },
            generator,
        )?;

        let seq = self.rounds.len() as u32 + 1;
        let mut round =
            Round::new(seq, RoundKind::Qualification, motion, rooms);
        round.silent = silent;

        if let Some(previous) = self.rounds.last_mut() {
            previous.status = RoundStatus::Closed;
        }
        tracing::info!(
            seq,
            rooms = round.rooms.len(),
            repeats = round.rooms.iter().map(|r| r.repeats.len()).sum::<usize>(),
            "generated round"
        );
        self.rounds.push(round);

        Ok(&self.rounds[self.rounds.len() - 1])
    }

    /// Makes the latest round's draw public.
    #[tracing::instrument(skip(self), fields(tournament = %self.id))]
    pub fn publish_last_round(&mut self) -> Result<&Round, TabError> {
        self.check_not_finished()?;
        let round = self.rounds.last_mut().ok_or_else(|| {
            TabError::LifecycleOrder("there is no round to publish".into())
        })?;
        if round.status != RoundStatus::Draft {
            return Err(TabError::LifecycleOrder(format!(
                "round {} has already been published",
                round.seq
            )));
        }

        round.is_public = true;
        round.status = RoundStatus::Public;
        round.published_at = Some(chrono::Utc::now().naive_utc());
        tracing::info!(seq = round.seq, "published round");

        Ok(round)
    }

    /// Records (or corrects) the result of a room. Once every room of the
    /// round has a result the round becomes `ResultsRecorded`.
    #[tracing::instrument(skip(self, result), fields(tournament = %self.id))]
    pub fn record_result(
        &mut self,
        room_id: &str,
        result: GameResult,
    ) -> Result<&Round, TabError> {
        self.check_not_finished()?;
        result.validate(&self.config)?;

        let idx = self.round_index_of_room(room_id)?;
        let round = &mut self.rounds[idx];
        match round.status {
            RoundStatus::Draft => {
                return Err(TabError::LifecycleOrder(format!(
                    "round {} has not been published",
                    round.seq
                )));
            }
            RoundStatus::Closed => {
                return Err(TabError::LifecycleOrder(format!(
                    "round {} is closed",
                    round.seq
                )));
            }
            RoundStatus::Public | RoundStatus::ResultsRecorded => {}
        }
        if result.kind() != round.expected_result_kind() {
            return Err(TabError::InvalidResult(format!(
                "round {} expects a {} result, got a {} result",
                round.seq,
                round.expected_result_kind(),
                result.kind()
            )));
        }

        let seq = round.seq;
        if let Some(room) =
            round.rooms.iter_mut().find(|room| room.id == room_id)
        {
            if room.result.is_some() {
                tracing::info!(seq, room = room.number, "corrected result");
            }
            room.result = Some(result);
        }
        if round.all_results_recorded() {
            round.status = RoundStatus::ResultsRecorded;
            tracing::info!(seq, "all results recorded");
        }

        Ok(round)
    }

    /// Applies `edit` to a room of a round that is not yet closed.
    ///
    /// Teams and adjudicators are frozen once the room has a result; the
    /// venue and room number stay editable. In a playoff round teams may
    /// only change position within their room.
    #[tracing::instrument(skip(self, edit), fields(tournament = %self.id))]
    pub fn edit_room(
        &mut self,
        room_id: &str,
        edit: RoomEdit,
    ) -> Result<&Round, TabError> {
        self.check_not_finished()?;
        let idx = self.round_index_of_room(room_id)?;
        let round = &self.rounds[idx];
        if round.status == RoundStatus::Closed {
            return Err(TabError::LifecycleOrder(format!(
                "round {} is closed",
                round.seq
            )));
        }
        let Some(room) = round.room(room_id) else {
            return Err(TabError::NotFound(format!("room `{room_id}`")));
        };
        if edit.changes_draw() && room.result.is_some() {
            return Err(TabError::LifecycleOrder(format!(
                "room {} already has a result",
                room.number
            )));
        }

        if let Some(teams) = &edit.teams {
            let distinct = teams.iter().collect::<HashSet<_>>();
            if distinct.len() != teams.len() {
                return Err(TabError::InvalidResult(
                    "a room needs four different teams".into(),
                ));
            }
            for team in teams {
                self.participants.team(team)?;
                if round
                    .rooms
                    .iter()
                    .any(|other| other.id != room.id && other.contains(team))
                {
                    return Err(TabError::InvalidResult(format!(
                        "team `{team}` is already in another room of round {}",
                        round.seq
                    )));
                }
                if round.kind == RoundKind::Playoff && !room.contains(team) {
                    return Err(TabError::InvalidResult(format!(
                        "team `{team}` is not in this playoff room"
                    )));
                }
            }
        }

        let chair = match &edit.chair {
            Some(chair) => chair.as_deref(),
            None => room.chair.as_deref(),
        };
        let wings = edit.wings.as_ref().unwrap_or(&room.wings);
        if edit.chair.is_some() || edit.wings.is_some() {
            self.participants.check_panel(chair, wings)?;
        }

        let round = &mut self.rounds[idx];
        let Some(room) = round.rooms.iter_mut().find(|room| room.id == room_id)
        else {
            return Err(TabError::NotFound(format!("room `{room_id}`")));
        };
        let RoomEdit {
            teams,
            chair,
            wings,
            place,
            number,
        } = edit;
        if let Some(teams) = teams {
            room.teams = teams;
        }
        if let Some(chair) = chair {
            room.chair = chair;
        }
        if let Some(wings) = wings {
            room.wings = wings;
        }
        if let Some(place) = place {
            room.place = place;
        }
        if let Some(number) = number {
            room.number = number;
        }
        tracing::info!(seq = round.seq, room = room.number, "edited room");

        Ok(round)
    }

    /// Exchanges the slots of two teams in the latest round, which may be in
    /// the same room or in different rooms. Playoff teams keep their bracket
    /// slot, so in a playoff round both teams must share a room.
    #[tracing::instrument(skip(self), fields(tournament = %self.id))]
    pub fn swap_teams(&mut self, a: &str, b: &str) -> Result<&Round, TabError> {
        self.check_not_finished()?;
        let round = self.rounds.last_mut().ok_or_else(|| {
            TabError::LifecycleOrder("there is no round to edit".into())
        })?;
        if round.status == RoundStatus::Closed {
            return Err(TabError::LifecycleOrder(format!(
                "round {} is closed",
                round.seq
            )));
        }

        let slot_of = |team: &str| {
            round.rooms.iter().enumerate().find_map(|(r, room)| {
                room.position_of(team).map(|p| (r, p.index()))
            })
        };
        let (Some((ra, pa)), Some((rb, pb))) = (slot_of(a), slot_of(b)) else {
            return Err(TabError::NotFound(format!(
                "team `{a}` or `{b}` in round {}",
                round.seq
            )));
        };
        if round.kind == RoundKind::Playoff && ra != rb {
            return Err(TabError::InvalidResult(format!(
                "`{a}` and `{b}` are in different playoff rooms"
            )));
        }
        if round.rooms[ra].result.is_some() || round.rooms[rb].result.is_some()
        {
            return Err(TabError::LifecycleOrder(
                "rooms with a result cannot be changed".into(),
            ));
        }

        if (ra, pa) == (rb, pb) {
            return Ok(round);
        }
        let team_a = std::mem::take(&mut round.rooms[ra].teams[pa]);
        let team_b = std::mem::replace(&mut round.rooms[rb].teams[pb], team_a);
        round.rooms[ra].teams[pa] = team_b;
        tracing::info!(seq = round.seq, %a, %b, "swapped teams");

        Ok(round)
    }

    /// Removes the latest round, provided none of its results have been
    /// recorded. Returns `false` if there was no round to remove.
    ///
    /// The round before it is reopened, so its results can be corrected
    /// again. Removing a playoff layer also takes back the bracket positions
    /// it granted, as those are derived from the layers that exist.
    #[tracing::instrument(skip(self), fields(tournament = %self.id))]
    pub fn remove_last_round(&mut self) -> Result<bool, TabError> {
        self.check_not_finished()?;
        let Some(latest) = self.rounds.last() else {
            return Ok(false);
        };
        if latest.any_result_recorded()
            || !matches!(latest.status, RoundStatus::Draft | RoundStatus::Public)
        {
            return Err(TabError::LifecycleOrder(format!(
                "round {} already has results",
                latest.seq
            )));
        }

        let Some(removed) = self.rounds.pop() else {
            return Ok(false);
        };
        if let Some(previous) = self.rounds.last_mut() {
            if previous.status == RoundStatus::Closed {
                previous.status = RoundStatus::ResultsRecorded;
            }
        }
        tracing::info!(seq = removed.seq, kind = ?removed.kind, "removed round");

        Ok(true)
    }
}
