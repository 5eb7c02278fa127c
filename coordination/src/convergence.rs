//! Consensus convergence - agreement metric and round policy

use serde::{Deserialize, Serialize};

/// Agreement at or above which a consensus run stops refining
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 0.7;

/// Upper bound on consensus rounds, the first included
pub const DEFAULT_MAX_ROUNDS: u32 = 3;

/// Agreement of a set of confidences.
///
/// `max(0, 1 - population variance)`; fewer than two values agree fully.
pub fn agreement(confidences: &[f64]) -> f64 {
    if confidences.len() < 2 {
        return 1.0;
    }
    let n = confidences.len() as f64;
    let mean = confidences.iter().sum::<f64>() / n;
    let variance = confidences.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
    (1.0 - variance).clamp(0.0, 1.0)
}

/// Agreement measured after one round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundAgreement {
    pub round: u32,
    pub agreement: f64,
}

/// How a consensus loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceOutcome {
    Converged,
    RoundLimit,
}

impl std::fmt::Display for ConvergenceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::RoundLimit => write!(f, "round_limit"),
        }
    }
}

/// Threshold and round bound of the consensus loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePolicy {
    pub threshold: f64,
    pub max_rounds: u32,
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl ConvergencePolicy {
    pub fn new(threshold: f64, max_rounds: u32) -> Self {
        Self {
            threshold,
            max_rounds: max_rounds.max(1),
        }
    }

    pub fn is_converged(&self, agreement: f64) -> bool {
        agreement >= self.threshold
    }

    /// Decide after `round` completed rounds. `None` means run another round.
    pub fn evaluate(&self, agreement: f64, round: u32) -> Option<ConvergenceOutcome> {
        if self.is_converged(agreement) {
            Some(ConvergenceOutcome::Converged)
        } else if round >= self.max_rounds {
            Some(ConvergenceOutcome::RoundLimit)
        } else {
            None
        }
    }
}
