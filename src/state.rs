//! Registry of running tournaments.
//!
//! Each tournament sits behind its own lock, so operations on different
//! tournaments never wait on each other. Mutations take the write lock for
//! the whole of validation and modification (a failed validation releases
//! it like any other exit), which is what keeps two "generate next round"
//! requests from both drawing a round.

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::RwLock;
use rand_chacha::ChaCha20Rng;
use tokio::sync::broadcast;

use crate::{
    config::Settings,
    error::TabError,
    msg::{Msg, MsgContents},
    tournaments::{
        Tournament, TournamentStatus,
        breaks::PlayoffAdvance,
        rounds::{Motion, Round, manage::RoomEdit, results::GameResult},
        standings::{
            compute::TournamentTeamStandings,
            tab::{self, SpeakerTabRow, TeamTab},
        },
    },
};

pub type TournamentHandle = Arc<RwLock<Tournament>>;

pub struct Tabulator {
    tournaments: RwLock<HashMap<String, TournamentHandle>>,
    tx: broadcast::Sender<Msg>,
    lock_timeout: Duration,
}

impl Tabulator {
    pub fn new(lock_timeout: Duration) -> Self {
        let (tx, _) = broadcast::channel::<Msg>(1000);
        Self {
            tournaments: RwLock::new(HashMap::new()),
            tx,
            lock_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.lock_timeout())
    }

    /// Receives every [`Msg`] sent after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<Msg> {
        self.tx.subscribe()
    }

    /// Takes ownership of `tournament` and returns its id.
    pub fn insert(&self, tournament: Tournament) -> String {
        let id = tournament.id.clone();
        tracing::info!(
            tournament = %id,
            name = %tournament.name,
            "registered tournament"
        );
        self.tournaments
            .write()
            .insert(id.clone(), Arc::new(RwLock::new(tournament)));
        id
    }

    pub fn handle(
        &self,
        tournament_id: &str,
    ) -> Result<TournamentHandle, TabError> {
        self.tournaments
            .read()
            .get(tournament_id)
            .cloned()
            .ok_or_else(|| {
                TabError::NotFound(format!("tournament `{tournament_id}`"))
            })
    }

    /// Runs `f` against a consistent snapshot of the tournament.
    pub fn read<T>(
        &self,
        tournament_id: &str,
        f: impl FnOnce(&Tournament) -> T,
    ) -> Result<T, TabError> {
        let handle = self.handle(tournament_id)?;
        let tournament = handle.read();
        Ok(f(&*tournament))
    }

    /// Runs `f` with exclusive access to the tournament, waiting at most the
    /// configured lock timeout for other mutations to finish.
    pub fn mutate<T>(
        &self,
        tournament_id: &str,
        f: impl FnOnce(&mut Tournament) -> Result<T, TabError>,
    ) -> Result<T, TabError> {
        let handle = self.handle(tournament_id)?;
        let Some(mut tournament) = handle.try_write_for(self.lock_timeout)
        else {
            tracing::warn!(tournament = %tournament_id, "lock wait timed out");
            return Err(TabError::ConcurrentModification {
                tournament_id: tournament_id.to_string(),
            });
        };

        let status = tournament.status;
        let ret = f(&mut *tournament)?;
        if tournament.status != status {
            self.send(
                tournament_id,
                MsgContents::StatusChanged(tournament.status),
            );
        }
        Ok(ret)
    }

    fn send(&self, tournament_id: &str, inner: MsgContents) {
        tracing::trace!(tournament = %tournament_id, ?inner, "sending message");
        // no subscribers is fine
        let _ = self.tx.send(Msg {
            tournament_id: tournament_id.to_string(),
            inner,
        });
    }

    pub fn start(&self, tournament_id: &str) -> Result<(), TabError> {
        self.mutate(tournament_id, |t| {
            if t.status == TournamentStatus::Registration {
                t.close_registration()?;
            }
            t.start()
        })
    }

    pub fn generate_next_round(
        &self,
        tournament_id: &str,
        motion: Motion,
        silent: bool,
        rng: &mut ChaCha20Rng,
    ) -> Result<Round, TabError> {
        let round = self.mutate(tournament_id, |t| {
            t.generate_next_round(motion, silent, rng).cloned()
        })?;
        self.send(
            tournament_id,
            MsgContents::RoundGenerated(round.id.clone()),
        );
        Ok(round)
    }

    pub fn publish_last_round(
        &self,
        tournament_id: &str,
    ) -> Result<Round, TabError> {
        let round =
            self.mutate(tournament_id, |t| t.publish_last_round().cloned())?;
        self.send(
            tournament_id,
            MsgContents::RoundPublished(round.id.clone()),
        );
        Ok(round)
    }

    pub fn record_result(
        &self,
        tournament_id: &str,
        room_id: &str,
        result: GameResult,
    ) -> Result<(), TabError> {
        self.mutate(tournament_id, |t| {
            t.record_result(room_id, result).map(|_| ())
        })?;
        self.send(
            tournament_id,
            MsgContents::ResultRecorded(room_id.to_string()),
        );
        Ok(())
    }

    pub fn edit_room(
        &self,
        tournament_id: &str,
        room_id: &str,
        edit: RoomEdit,
    ) -> Result<(), TabError> {
        let round_id = self.mutate(tournament_id, |t| {
            t.edit_room(room_id, edit).map(|round| round.id.clone())
        })?;
        self.send(tournament_id, MsgContents::DrawEdited(round_id));
        Ok(())
    }

    /// Exchanges the slots of two teams in the latest round.
    pub fn swap_teams(
        &self,
        tournament_id: &str,
        a: &str,
        b: &str,
    ) -> Result<(), TabError> {
        let round_id = self.mutate(tournament_id, |t| {
            t.swap_teams(a, b).map(|round| round.id.clone())
        })?;
        self.send(tournament_id, MsgContents::DrawEdited(round_id));
        Ok(())
    }

    /// Removes the latest round. Returns `false` when there was none.
    pub fn remove_last_round(
        &self,
        tournament_id: &str,
    ) -> Result<bool, TabError> {
        let removed = self.mutate(tournament_id, |t| {
            let seq = t.latest_round().map(|round| round.seq);
            Ok(t.remove_last_round()?.then_some(seq).flatten())
        })?;
        if let Some(seq) = removed {
            self.send(tournament_id, MsgContents::RoundRemoved(seq));
        }
        Ok(removed.is_some())
    }

    pub fn generate_playoff(
        &self,
        tournament_id: &str,
        breaking: &[String],
        motion: Motion,
    ) -> Result<Round, TabError> {
        let round = self.mutate(tournament_id, |t| {
            t.generate_playoff(breaking, motion).cloned()
        })?;
        self.send(
            tournament_id,
            MsgContents::BreakGenerated(round.id.clone()),
        );
        Ok(round)
    }

    /// Draws the next bracket layer. `None` once the final has been decided.
    pub fn advance_playoff(
        &self,
        tournament_id: &str,
        motion: Motion,
    ) -> Result<Option<Round>, TabError> {
        let next = self.mutate(tournament_id, |t| {
            Ok(match t.advance_playoff(motion)? {
                PlayoffAdvance::Next(round) => Some(round.clone()),
                PlayoffAdvance::Finished => None,
            })
        })?;
        if let Some(round) = &next {
            self.send(
                tournament_id,
                MsgContents::BreakGenerated(round.id.clone()),
            );
        }
        Ok(next)
    }

    pub fn standings(
        &self,
        tournament_id: &str,
    ) -> Result<TournamentTeamStandings, TabError> {
        self.read(tournament_id, TournamentTeamStandings::compute)?
    }

    pub fn team_tab(
        &self,
        tournament_id: &str,
        reveal: bool,
    ) -> Result<TeamTab, TabError> {
        let standings = self.standings(tournament_id)?;
        Ok(tab::render_team_tab(&standings, reveal))
    }

    pub fn speaker_tab(
        &self,
        tournament_id: &str,
        reveal: bool,
        rng: &mut ChaCha20Rng,
    ) -> Result<Vec<SpeakerTabRow>, TabError> {
        let standings = self.standings(tournament_id)?;
        Ok(tab::render_speaker_tab(&standings, reveal, rng))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use rand::SeedableRng;

    use super::*;
    use crate::{
        test::fixtures::{ordered_result, register},
        tournaments::config::TournamentConfig,
    };

    fn registry_with(teams: usize) -> (Tabulator, String) {
        let tabulator = Tabulator::new(Duration::from_millis(20));
        let mut t =
            Tournament::new("Registry Open", TournamentConfig::default());
        register(&mut t, teams, teams / 4);
        let id = tabulator.insert(t);
        tabulator.start(&id).unwrap();
        (tabulator, id)
    }

    #[test]
    fn unknown_tournament_is_not_found() {
        let tabulator = Tabulator::new(Duration::from_millis(20));
        assert!(matches!(
            tabulator.standings("nope"),
            Err(TabError::NotFound(_))
        ));
    }

    #[test]
    fn concurrent_generation_draws_one_round() {
        let (tabulator, id) = registry_with(8);

        let outcomes = thread::scope(|s| {
            let workers = (0..4)
                .map(|seed| {
                    let tabulator = &tabulator;
                    let id = &id;
                    s.spawn(move || {
                        let mut rng = ChaCha20Rng::seed_from_u64(seed);
                        tabulator.generate_next_round(
                            id,
                            Motion::new("This House would"),
                            false,
                            &mut rng,
                        )
                    })
                })
                .collect::<Vec<_>>();
            workers
                .into_iter()
                .map(|w| w.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert!(outcomes.iter().filter_map(|o| o.as_ref().err()).all(|e| {
            matches!(
                e,
                TabError::LifecycleOrder(_)
                    | TabError::ConcurrentModification { .. }
            )
        }));
        assert_eq!(tabulator.read(&id, |t| t.rounds.len()).unwrap(), 1);
    }

    #[test]
    fn busy_tournament_times_out() {
        let (tabulator, id) = registry_with(4);
        let handle = tabulator.handle(&id).unwrap();

        thread::scope(|s| {
            let guard = handle.write();
            let waiter = s.spawn(|| {
                let mut rng = ChaCha20Rng::seed_from_u64(1);
                tabulator.generate_next_round(
                    &id,
                    Motion::new("This House would"),
                    false,
                    &mut rng,
                )
            });
            let res = waiter.join().unwrap();
            drop(guard);
            assert!(matches!(
                res,
                Err(TabError::ConcurrentModification { .. })
            ));
        });

        assert_eq!(tabulator.read(&id, |t| t.rounds.len()).unwrap(), 0);
    }

    #[test]
    fn other_tournaments_are_not_blocked() {
        let (tabulator, busy) = registry_with(4);
        let mut other = Tournament::new("Other", TournamentConfig::default());
        register(&mut other, 4, 1);
        let other = tabulator.insert(other);
        tabulator.start(&other).unwrap();

        let handle = tabulator.handle(&busy).unwrap();
        let _guard = handle.write();
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        tabulator
            .generate_next_round(
                &other,
                Motion::new("This House would"),
                false,
                &mut rng,
            )
            .unwrap();
    }

    #[test]
    fn mutations_are_announced() {
        let (tabulator, id) = registry_with(4);
        let mut rx = tabulator.subscribe();
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        let round = tabulator
            .generate_next_round(
                &id,
                Motion::new("This House would"),
                false,
                &mut rng,
            )
            .unwrap();
        tabulator.publish_last_round(&id).unwrap();
        let room = round.rooms[0].id.clone();
        tabulator.record_result(&id, &room, ordered_result()).unwrap();
        tabulator
            .edit_room(
                &id,
                &room,
                RoomEdit {
                    place: Some(Some("Hall B".into())),
                    ..RoomEdit::default()
                },
            )
            .unwrap();
        let second = tabulator
            .generate_next_round(
                &id,
                Motion::new("This House would not"),
                false,
                &mut rng,
            )
            .unwrap();
        assert!(tabulator.remove_last_round(&id).unwrap());

        let received = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|msg| {
                assert_eq!(msg.tournament_id, id);
                msg.inner
            })
            .collect::<Vec<_>>();
        assert_eq!(
            received,
            [
                MsgContents::RoundGenerated(round.id.clone()),
                MsgContents::RoundPublished(round.id.clone()),
                MsgContents::ResultRecorded(room),
                MsgContents::DrawEdited(round.id.clone()),
                MsgContents::RoundGenerated(second.id),
                MsgContents::RoundRemoved(2),
            ]
        );
    }

    #[test]
    fn failed_mutation_sends_nothing() {
        let (tabulator, id) = registry_with(4);
        let mut rx = tabulator.subscribe();

        assert!(tabulator.publish_last_round(&id).is_err());
        assert!(!tabulator.remove_last_round(&id).unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn swaps_are_applied_and_announced() {
        let (tabulator, id) = registry_with(8);
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let round = tabulator
            .generate_next_round(
                &id,
                Motion::new("This House would"),
                false,
                &mut rng,
            )
            .unwrap();
        let mut rx = tabulator.subscribe();
        let a = round.rooms[0].teams[0].clone();
        let b = round.rooms[1].teams[1].clone();

        assert!(tabulator.swap_teams(&id, &a, "ghost").is_err());
        tabulator.swap_teams(&id, &a, &b).unwrap();

        let rooms = tabulator
            .read(&id, |t| t.rounds[0].rooms.clone())
            .unwrap();
        assert_eq!(rooms[0].teams[0], b);
        assert_eq!(rooms[1].teams[1], a);
        assert_eq!(
            rx.try_recv().unwrap().inner,
            MsgContents::DrawEdited(round.id)
        );
        assert!(rx.try_recv().is_err());
    }
}
