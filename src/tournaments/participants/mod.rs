use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{error::TabError, tournaments::teams::Team};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Speaker {
    pub id: String,
    pub name: String,
    pub team_id: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdjudicatorRole {
    ChiefAdjudicator,
    Chair,
    Wing,
    /// Registered, but not to be placed on a panel.
    Observer,
}

impl AdjudicatorRole {
    pub fn can_chair(self) -> bool {
        matches!(
            self,
            AdjudicatorRole::ChiefAdjudicator | AdjudicatorRole::Chair
        )
    }

    pub fn can_judge(self) -> bool {
        self != AdjudicatorRole::Observer
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Adjudicator {
    pub id: String,
    pub name: String,
    pub role: AdjudicatorRole,
}

/// Everyone registered for a tournament, in registration order. Registration
/// order is the final (deterministic) tie-break wherever one is needed.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TournamentParticipants {
    pub teams: IndexMap<String, Team>,
    pub speakers: IndexMap<String, Speaker>,
    pub adjudicators: IndexMap<String, Adjudicator>,
}

impl TournamentParticipants {
    /// Registers a team together with its two speakers.
    pub fn add_team(
        &mut self,
        team: Team,
        speaker_names: [String; 2],
    ) -> Result<(), TabError> {
        if self.teams.contains_key(&team.id) {
            return Err(TabError::InvalidResult(format!(
                "team `{}` is already registered",
                team.id
            )));
        }
        if team.speakers[0] == team.speakers[1] {
            return Err(TabError::InvalidResult(format!(
                "team `{}` lists the same speaker twice",
                team.id
            )));
        }
        for speaker in &team.speakers {
            if self.speakers.contains_key(speaker) {
                return Err(TabError::InvalidResult(format!(
                    "speaker `{speaker}` is already on a team"
                )));
            }
        }

        for (id, name) in team.speakers.iter().zip(speaker_names) {
            self.speakers.insert(
                id.clone(),
                Speaker {
                    id: id.clone(),
                    name,
                    team_id: team.id.clone(),
                },
            );
        }
        self.teams.insert(team.id.clone(), team);

        Ok(())
    }

    pub fn add_adjudicator(
        &mut self,
        adjudicator: Adjudicator,
    ) -> Result<(), TabError> {
        if self.adjudicators.contains_key(&adjudicator.id) {
            return Err(TabError::InvalidResult(format!(
                "adjudicator `{}` is already registered",
                adjudicator.id
            )));
        }
        self.adjudicators
            .insert(adjudicator.id.clone(), adjudicator);
        Ok(())
    }

    pub fn team(&self, team_id: &str) -> Result<&Team, TabError> {
        self.teams
            .get(team_id)
            .ok_or_else(|| TabError::NotFound(format!("team `{team_id}`")))
    }

    pub fn chairs(&self) -> usize {
        self.adjudicators
            .values()
            .filter(|adj| adj.role.can_chair())
            .count()
    }

    /// Checks that the panel is made up of distinct, registered adjudicators
    /// and that the chair may chair.
    pub fn check_panel(
        &self,
        chair: Option<&str>,
        wings: &[String],
    ) -> Result<(), TabError> {
        let mut seen = HashSet::new();

        if let Some(chair) = chair {
            let adj = self.adjudicators.get(chair).ok_or_else(|| {
                TabError::NotFound(format!("adjudicator `{chair}`"))
            })?;
            if !adj.role.can_chair() {
                return Err(TabError::InvalidResult(format!(
                    "`{}` cannot chair a room",
                    adj.name
                )));
            }
            seen.insert(chair);
        }

        for wing in wings {
            let adj = self.adjudicators.get(wing).ok_or_else(|| {
                TabError::NotFound(format!("adjudicator `{wing}`"))
            })?;
            if !adj.role.can_judge() {
                return Err(TabError::InvalidResult(format!(
                    "`{}` cannot sit on a panel",
                    adj.name
                )));
            }
            if !seen.insert(wing.as_str()) {
                return Err(TabError::InvalidResult(format!(
                    "`{}` is on the panel twice",
                    adj.name
                )));
            }
        }

        Ok(())
    }
}
