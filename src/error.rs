//! Errors reported by the tabulation engine.

use std::fmt;

use thiserror::Error;

use crate::tournaments::rounds::draws::drawalgs::MakeDrawError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantKind {
    Teams,
    Adjudicators,
}

impl fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParticipantKind::Teams => "teams",
            ParticipantKind::Adjudicators => "chair adjudicators",
        })
    }
}

/// Errors which can arise when driving a tournament forward.
///
/// Every variant apart from [`TabError::DataIntegrity`] is a validation
/// failure: the attempted mutation was aborted and the tournament is exactly
/// as it was before the call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TabError {
    /// The operation is not legal in the current round/tournament state.
    #[error("operation not allowed now: {0}")]
    LifecycleOrder(String),

    #[error("not enough {kind}: {required} required, {available} available")]
    InsufficientParticipants {
        kind: ParticipantKind,
        required: usize,
        available: usize,
    },

    #[error(
        "invalid break of {0} teams (must be a power of two, and at least four)"
    )]
    InvalidBreakSize(usize),

    /// Stored round data contradicts itself. Not recoverable without manual
    /// intervention.
    #[error("data integrity fault: {0}")]
    DataIntegrity(String),

    #[error(
        "tournament `{tournament_id}` is being modified by another operation"
    )]
    ConcurrentModification { tournament_id: String },

    #[error("invalid result or room data: {0}")]
    InvalidResult(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("could not load settings: {0}")]
    Config(String),
}

impl TabError {
    /// Whether automated progression of the tournament must stop until an
    /// operator resolves the fault.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TabError::DataIntegrity(_))
    }
}

impl From<MakeDrawError> for TabError {
    fn from(err: MakeDrawError) -> Self {
        match err {
            MakeDrawError::InvalidTeamCount { required, available } => {
                TabError::InsufficientParticipants {
                    kind: ParticipantKind::Teams,
                    required,
                    available,
                }
            }
            MakeDrawError::InvalidConfiguration(msg) => {
                TabError::LifecycleOrder(msg)
            }
        }
    }
}

impl From<toml::de::Error> for TabError {
    fn from(err: toml::de::Error) -> Self {
        TabError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_integrity_faults_are_fatal() {
        assert!(TabError::DataIntegrity("x".into()).is_fatal());
        assert!(!TabError::LifecycleOrder("x".into()).is_fatal());
        assert!(!TabError::InvalidBreakSize(3).is_fatal());
    }

    #[test]
    fn draw_errors_map_to_participant_errors() {
        let err: TabError = MakeDrawError::InvalidTeamCount {
            required: 8,
            available: 6,
        }
        .into();
        assert_eq!(
            err,
            TabError::InsufficientParticipants {
                kind: ParticipantKind::Teams,
                required: 8,
                available: 6
            }
        );
        assert_eq!(err.to_string(), "not enough teams: 8 required, 6 available");
    }
}
