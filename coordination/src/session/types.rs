//! Session data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fabric::NodeId;
use crate::patterns::CoordinationPattern;
use crate::placement::Placement;

/// Lifecycle status of a coordination session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Admitted, participant work not started
    Initializing,
    /// Pattern run in progress
    Active,
    /// Run finished and result synthesized
    Completed,
    /// Released before completion
    Aborted,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Valid transitions from this status
    pub fn valid_transitions(self) -> &'static [SessionStatus] {
        match self {
            Self::Initializing => &[Self::Active, Self::Aborted],
            Self::Active => &[Self::Completed, Self::Aborted],
            Self::Completed | Self::Aborted => &[],
        }
    }

    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// How a session is being closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed,
    Aborted,
}

impl From<SessionOutcome> for SessionStatus {
    fn from(outcome: SessionOutcome) -> Self {
        match outcome {
            SessionOutcome::Completed => SessionStatus::Completed,
            SessionOutcome::Aborted => SessionStatus::Aborted,
        }
    }
}

/// Business priority of a scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for SessionPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for SessionPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Scenario category driving the bandwidth complexity multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCategory {
    Financial,
    Strategic,
    Crisis,
    Market,
    Technical,
    Legal,
    Operational,
    General,
}

impl ScenarioCategory {
    /// Classify a free-form scenario type, case-insensitively
    pub fn from_scenario_type(scenario_type: &str) -> Self {
        match scenario_type.trim().to_lowercase().as_str() {
            "financial" => Self::Financial,
            "strategic" => Self::Strategic,
            "crisis" => Self::Crisis,
            "market" => Self::Market,
            "technical" => Self::Technical,
            "legal" => Self::Legal,
            "operational" => Self::Operational,
            _ => Self::General,
        }
    }

    /// Bandwidth multiplier for this category
    pub fn complexity_multiplier(self) -> f64 {
        match self {
            Self::Financial => 1.2,
            Self::Strategic => 1.5,
            Self::Crisis => 2.0,
            Self::Market => 1.3,
            Self::Technical => 1.4,
            Self::Legal => 1.1,
            Self::Operational => 1.2,
            Self::General => 1.0,
        }
    }
}

/// Admission request for a new session
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub scenario_id: String,
    pub scenario_type: String,
    pub pattern: CoordinationPattern,
    pub priority: SessionPriority,
    pub primary: String,
    pub supporting: Vec<String>,
    pub placement: Placement,
}

impl SessionRequest {
    pub fn participant_count(&self) -> usize {
        1 + self.supporting.len()
    }
}

/// A bounded-lifetime coordination run over one placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationSession {
    /// Equal to the scenario id; unique while active
    pub session_id: String,
    pub scenario_type: String,
    pub primary: String,
    pub supporting: Vec<String>,
    pub pattern: CoordinationPattern,
    pub priority: SessionPriority,
    /// Accounting bandwidth (GB/s), not enforced
    pub allocated_bandwidth: f64,
    /// Estimated fabric latency in milliseconds
    pub estimated_latency_ms: f64,
    pub status: SessionStatus,
    pub placement: Placement,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl CoordinationSession {
    /// Primary followed by supporting participants
    pub fn participants(&self) -> Vec<String> {
        std::iter::once(self.primary.clone())
            .chain(self.supporting.iter().cloned())
            .collect()
    }

    pub fn participant_count(&self) -> usize {
        1 + self.supporting.len()
    }

    /// Nodes occupied by this session's participants
    pub fn occupied_nodes(&self) -> Vec<NodeId> {
        self.placement.nodes()
    }
}
