//! Event types for executive coordination

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patterns::CoordinationPattern;
use crate::session::SessionStatus;

/// All coordination events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinationEvent {
    /// A session was admitted
    SessionOpened {
        session_id: String,
        pattern: CoordinationPattern,
        primary: String,
        participants: Vec<String>,
        allocated_bandwidth: f64,
        timestamp: DateTime<Utc>,
    },

    /// A participant produced a response
    ParticipantResponded {
        session_id: String,
        workload_id: String,
        round: u32,
        confidence: f64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A participant's generation failed and it was dropped
    ParticipantFailed {
        session_id: String,
        workload_id: String,
        round: u32,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A consensus round finished
    RoundCompleted {
        session_id: String,
        round: u32,
        agreement: f64,
        timestamp: DateTime<Utc>,
    },

    /// Result synthesized and recorded
    CoordinationCompleted {
        session_id: String,
        pattern: CoordinationPattern,
        consensus_score: f64,
        weighted_confidence: f64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Coordination failed before producing a result
    CoordinationFailed {
        session_id: String,
        stage: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A session left the active set
    SessionClosed {
        session_id: String,
        status: SessionStatus,
        timestamp: DateTime<Utc>,
    },
}

impl CoordinationEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::SessionOpened { timestamp, .. }
            | Self::ParticipantResponded { timestamp, .. }
            | Self::ParticipantFailed { timestamp, .. }
            | Self::RoundCompleted { timestamp, .. }
            | Self::CoordinationCompleted { timestamp, .. }
            | Self::CoordinationFailed { timestamp, .. }
            | Self::SessionClosed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionOpened { .. } => "session_opened",
            Self::ParticipantResponded { .. } => "participant_responded",
            Self::ParticipantFailed { .. } => "participant_failed",
            Self::RoundCompleted { .. } => "round_completed",
            Self::CoordinationCompleted { .. } => "coordination_completed",
            Self::CoordinationFailed { .. } => "coordination_failed",
            Self::SessionClosed { .. } => "session_closed",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::SessionOpened { session_id, .. }
            | Self::ParticipantResponded { session_id, .. }
            | Self::ParticipantFailed { session_id, .. }
            | Self::RoundCompleted { session_id, .. }
            | Self::CoordinationCompleted { session_id, .. }
            | Self::CoordinationFailed { session_id, .. }
            | Self::SessionClosed { session_id, .. } => session_id,
        }
    }

    /// Get the workload ID if this event is participant-scoped
    pub fn workload_id(&self) -> Option<&str> {
        match self {
            Self::ParticipantResponded { workload_id, .. }
            | Self::ParticipantFailed { workload_id, .. } => Some(workload_id),
            _ => None,
        }
    }
}
