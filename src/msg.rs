// TODO: notification delivery may want one channel per tournament once there
// are many tournaments running at the same time. For now everything goes
// through the registry's single channel.

use serde::{Deserialize, Serialize};

use crate::tournaments::TournamentStatus;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// A message which is sent after a tournament has been modified through the
/// [`crate::state::Tabulator`]. Subscribers (e.g. a chat bot announcing
/// draws) receive every message and filter by tournament.
pub struct Msg {
    pub tournament_id: String,
    pub inner: MsgContents,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum MsgContents {
    /// Round id.
    RoundGenerated(String),
    RoundPublished(String),
    /// Room id.
    ResultRecorded(String),
    /// Sequence number of the removed round.
    RoundRemoved(u32),
    /// Round id of the new bracket layer.
    BreakGenerated(String),
    /// Round id. Sent when rooms of a round are edited or teams swapped.
    DrawEdited(String),
    StatusChanged(TournamentStatus),
}
