//! Coordination patterns
//!
//! Four protocols for gathering participant responses over one session:
//!
//! | Pattern        | Shape                                                     |
//! |----------------|-----------------------------------------------------------|
//! | `parallel`     | one concurrent generation per participant, joined         |
//! | `sequential`   | descending priority, each sees the responses before it    |
//! | `consensus`    | parallel rounds until agreement meets the policy          |
//! | `hierarchical` | parallel, then the primary decides with the others' input |

mod consensus;
mod engine;
mod hierarchical;
mod parallel;
pub mod response;
pub mod run;
mod sequential;

use serde::{Deserialize, Serialize};

pub use engine::PatternEngine;
pub use response::{ParticipantResponse, ResponseSet};
pub use run::{ParticipantFailure, PatternRun, PhaseTransition, RunPhase, TransitionError};

/// Raised for a pattern name the engine does not implement
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown coordination pattern: {0}")]
pub struct UnknownPatternError(pub String);

/// Multi-party response-gathering protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationPattern {
    Parallel,
    Sequential,
    Consensus,
    Hierarchical,
}

impl CoordinationPattern {
    pub const ALL: [CoordinationPattern; 4] = [
        Self::Parallel,
        Self::Sequential,
        Self::Consensus,
        Self::Hierarchical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
            Self::Consensus => "consensus",
            Self::Hierarchical => "hierarchical",
        }
    }
}

impl std::fmt::Display for CoordinationPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CoordinationPattern {
    type Err = UnknownPatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| UnknownPatternError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_parse() {
        assert_eq!("parallel".parse::<CoordinationPattern>().unwrap(), CoordinationPattern::Parallel);
        assert_eq!(" Consensus ".parse::<CoordinationPattern>().unwrap(), CoordinationPattern::Consensus);
        assert_eq!(
            "round_robin".parse::<CoordinationPattern>().unwrap_err(),
            UnknownPatternError("round_robin".to_string())
        );
    }

    #[test]
    fn test_pattern_display_matches_serde() {
        for pattern in CoordinationPattern::ALL {
            let json = serde_json::to_string(&pattern).unwrap();
            assert_eq!(json, format!("\"{}\"", pattern));
            assert_eq!(pattern.to_string().parse::<CoordinationPattern>().unwrap(), pattern);
        }
    }
}
