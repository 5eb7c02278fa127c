//! Run state machine for one pattern execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::convergence::{ConvergenceOutcome, RoundAgreement};

use super::response::ResponseSet;
use super::CoordinationPattern;

/// Phase of a pattern run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Initializing,
    Running,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn valid_transitions(self) -> &'static [RunPhase] {
        match self {
            Self::Initializing => &[Self::Running, Self::Failed],
            Self::Running => &[Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => &[],
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A phase transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: RunPhase,
    pub to: RunPhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Invalid run phase transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} -> {to}")]
pub struct TransitionError {
    pub from: RunPhase,
    pub to: RunPhase,
}

/// A participant whose generation failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantFailure {
    pub workload_id: String,
    pub round: u32,
    pub error: String,
}

/// Outcome of one pattern execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRun {
    pub pattern: CoordinationPattern,
    pub phase: RunPhase,
    pub transitions: Vec<PhaseTransition>,
    /// Latest response per participant
    pub responses: ResponseSet,
    pub failures: Vec<ParticipantFailure>,
    /// Generation rounds executed
    pub rounds: u32,
    /// Agreement after each consensus round
    pub agreement_trace: Vec<RoundAgreement>,
    /// Set by consensus runs only
    pub convergence: Option<ConvergenceOutcome>,
    /// Set by hierarchical runs only
    pub primary: Option<String>,
}

impl PatternRun {
    pub fn new(pattern: CoordinationPattern) -> Self {
        Self {
            pattern,
            phase: RunPhase::Initializing,
            transitions: Vec::new(),
            responses: ResponseSet::new(),
            failures: Vec::new(),
            rounds: 0,
            agreement_trace: Vec::new(),
            convergence: None,
            primary: None,
        }
    }

    /// Transition to a new phase with a reason
    pub fn transition(&mut self, to: RunPhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
            });
        }
        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;
        Ok(())
    }

    pub fn converged(&self) -> Option<bool> {
        self.convergence
            .map(|outcome| outcome == ConvergenceOutcome::Converged)
    }

    /// Participants that failed and never produced a response
    pub fn failed_participants(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for failure in &self.failures {
            if self.responses.get(&failure.workload_id).is_none() && !ids.contains(&failure.workload_id) {
                ids.push(failure.workload_id.clone());
            }
        }
        ids
    }

    pub fn status_line(&self) -> String {
        format!(
            "[{}] {} | {} responses | {} rounds | {} failures",
            self.phase,
            self.pattern,
            self.responses.len(),
            self.rounds,
            self.failures.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::response::response;

    #[test]
    fn test_run_lifecycle() {
        let mut run = PatternRun::new(CoordinationPattern::Parallel);
        assert_eq!(run.phase, RunPhase::Initializing);

        run.transition(RunPhase::Running, "started").unwrap();
        run.transition(RunPhase::Completed, "done").unwrap();

        assert!(run.phase.is_terminal());
        assert_eq!(run.transitions.len(), 2);
        assert_eq!(run.transitions[0].from, RunPhase::Initializing);
        assert_eq!(run.transitions[1].reason, "done");
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut run = PatternRun::new(CoordinationPattern::Sequential);
        let err = run.transition(RunPhase::Completed, "skip").unwrap_err();
        assert_eq!(err.from, RunPhase::Initializing);
        assert_eq!(err.to, RunPhase::Completed);
        assert!(run.transitions.is_empty());
    }

    #[test]
    fn test_failed_participants_excludes_recovered() {
        let mut run = PatternRun::new(CoordinationPattern::Consensus);
        run.failures.push(ParticipantFailure {
            workload_id: "cfo".to_string(),
            round: 1,
            error: "timeout".to_string(),
        });
        run.failures.push(ParticipantFailure {
            workload_id: "cto".to_string(),
            round: 2,
            error: "timeout".to_string(),
        });
        run.responses.upsert(response("cto", 0.5, 1));

        assert_eq!(run.failed_participants(), vec!["cfo".to_string()]);
        assert!(run.converged().is_none());
    }

    #[test]
    fn test_status_line() {
        let run = PatternRun::new(CoordinationPattern::Hierarchical);
        assert_eq!(
            run.status_line(),
            "[initializing] hierarchical | 0 responses | 0 rounds | 0 failures"
        );
    }
}
