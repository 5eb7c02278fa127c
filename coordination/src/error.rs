//! Top-level error type for coordination requests

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::fabric::TopologyError;
use crate::patterns::{CoordinationPattern, UnknownPatternError};
use crate::roster::RosterError;
use crate::session::SessionError;

/// Step of a coordination request that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configuration,
    PatternSelection,
    ParticipantResolution,
    Placement,
    SessionAdmission,
    Execution,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Configuration => "configuration",
            Self::PatternSelection => "pattern_selection",
            Self::ParticipantResolution => "participant_resolution",
            Self::Placement => "placement",
            Self::SessionAdmission => "session_admission",
            Self::Execution => "execution",
        };
        write!(f, "{}", s)
    }
}

/// Fatal error for an engine or a coordination request.
///
/// Request errors are raised before any participant work, except
/// [`CoordinationError::Timeout`]. None of them leave a session active.
#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    #[error("Invalid topology: {0}")]
    InvalidTopology(#[from] TopologyError),

    #[error("Invalid roster: {0}")]
    InvalidRoster(#[from] RosterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("[{scenario_id}] {source}")]
    UnknownPattern {
        scenario_id: String,
        #[source]
        source: UnknownPatternError,
    },

    #[error("[{scenario_id}/{pattern}] Unknown participant: {workload_id}")]
    UnknownParticipant {
        scenario_id: String,
        pattern: CoordinationPattern,
        workload_id: String,
    },

    #[error("[{scenario_id}/{pattern}] Participant requested more than once: {workload_id}")]
    DuplicateParticipant {
        scenario_id: String,
        pattern: CoordinationPattern,
        workload_id: String,
    },

    #[error("[{scenario_id}/{pattern}] {requested} participants exceed fabric capacity of {available} nodes")]
    InsufficientCapacity {
        scenario_id: String,
        pattern: CoordinationPattern,
        requested: usize,
        available: usize,
    },

    #[error("[{scenario_id}/{pattern}] Session already active for this scenario")]
    DuplicateSession {
        scenario_id: String,
        pattern: CoordinationPattern,
    },

    #[error("[{scenario_id}/{pattern}] Active session limit of {limit} reached")]
    SessionLimitReached {
        scenario_id: String,
        pattern: CoordinationPattern,
        limit: usize,
    },

    #[error("[{scenario_id}/{pattern}] Session error: {source}")]
    Session {
        scenario_id: String,
        pattern: CoordinationPattern,
        #[source]
        source: SessionError,
    },

    #[error("[{scenario_id}/{pattern}] Coordination timed out after {after:?}")]
    Timeout {
        scenario_id: String,
        pattern: CoordinationPattern,
        after: Duration,
    },
}

impl CoordinationError {
    /// Map a session registry error for a request
    pub(crate) fn from_session(
        scenario_id: &str,
        pattern: CoordinationPattern,
        error: SessionError,
    ) -> Self {
        let scenario_id = scenario_id.to_string();
        match error {
            SessionError::DuplicateSession(_) => Self::DuplicateSession {
                scenario_id,
                pattern,
            },
            SessionError::SessionLimitReached { limit } => Self::SessionLimitReached {
                scenario_id,
                pattern,
                limit,
            },
            source => Self::Session {
                scenario_id,
                pattern,
                source,
            },
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidTopology(_) | Self::InvalidRoster(_) | Self::Config(_) => {
                Stage::Configuration
            }
            Self::UnknownPattern { .. } => Stage::PatternSelection,
            Self::UnknownParticipant { .. } | Self::DuplicateParticipant { .. } => {
                Stage::ParticipantResolution
            }
            Self::InsufficientCapacity { .. } => Stage::Placement,
            Self::DuplicateSession { .. }
            | Self::SessionLimitReached { .. }
            | Self::Session { .. } => Stage::SessionAdmission,
            Self::Timeout { .. } => Stage::Execution,
        }
    }

    pub fn scenario_id(&self) -> Option<&str> {
        match self {
            Self::InvalidTopology(_) | Self::InvalidRoster(_) | Self::Config(_) => None,
            Self::UnknownPattern { scenario_id, .. }
            | Self::UnknownParticipant { scenario_id, .. }
            | Self::DuplicateParticipant { scenario_id, .. }
            | Self::InsufficientCapacity { scenario_id, .. }
            | Self::DuplicateSession { scenario_id, .. }
            | Self::SessionLimitReached { scenario_id, .. }
            | Self::Session { scenario_id, .. }
            | Self::Timeout { scenario_id, .. } => Some(scenario_id),
        }
    }

    /// Pattern of the failed request, once it was parsed
    pub fn pattern(&self) -> Option<CoordinationPattern> {
        match self {
            Self::InvalidTopology(_)
            | Self::InvalidRoster(_)
            | Self::Config(_)
            | Self::UnknownPattern { .. } => None,
            Self::UnknownParticipant { pattern, .. }
            | Self::DuplicateParticipant { pattern, .. }
            | Self::InsufficientCapacity { pattern, .. }
            | Self::DuplicateSession { pattern, .. }
            | Self::SessionLimitReached { pattern, .. }
            | Self::Session { pattern, .. }
            | Self::Timeout { pattern, .. } => Some(*pattern),
        }
    }
}

/// Result type for coordination requests
pub type EngineResult<T> = Result<T, CoordinationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_map_to_admission() {
        let err = CoordinationError::from_session(
            "s1",
            CoordinationPattern::Consensus,
            SessionError::DuplicateSession("s1".to_string()),
        );
        assert!(matches!(err, CoordinationError::DuplicateSession { .. }));
        assert_eq!(err.stage(), Stage::SessionAdmission);
        assert_eq!(err.scenario_id(), Some("s1"));
        assert_eq!(err.pattern(), Some(CoordinationPattern::Consensus));
        assert!(err.to_string().contains("s1/consensus"));

        let err = CoordinationError::from_session(
            "s2",
            CoordinationPattern::Parallel,
            SessionError::SessionLimitReached { limit: 4 },
        );
        assert!(matches!(err, CoordinationError::SessionLimitReached { limit: 4, .. }));
    }

    #[test]
    fn test_unknown_pattern_has_no_pattern() {
        let err = CoordinationError::UnknownPattern {
            scenario_id: "s1".to_string(),
            source: UnknownPatternError("vote".to_string()),
        };
        assert_eq!(err.stage(), Stage::PatternSelection);
        assert_eq!(err.pattern(), None);
        assert!(err.to_string().contains("vote"));
    }

    #[test]
    fn test_construction_errors_have_no_scenario() {
        let err: CoordinationError = RosterError::Empty.into();
        assert_eq!(err.stage(), Stage::Configuration);
        assert_eq!(err.scenario_id(), None);
    }
}
