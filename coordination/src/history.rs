//! Append-only log of coordination results

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::patterns::CoordinationPattern;
use crate::synthesis::CoordinationResult;

/// Aggregate statistics over the history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: usize,
    pub by_pattern: BTreeMap<String, usize>,
    pub mean_consensus_score: f64,
    pub mean_weighted_confidence: f64,
    pub mean_duration_ms: f64,
    /// Share of consensus runs that converged; `None` without consensus runs
    pub convergence_rate: Option<f64>,
    /// Results where no participant responded
    pub empty_results: usize,
}

/// In-memory result history. Entries are never mutated or removed.
#[derive(Debug, Default)]
pub struct ResultHistory {
    entries: RwLock<Vec<Arc<CoordinationResult>>>,
}

impl ResultHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<CoordinationResult>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a result; returns its position
    pub fn append(&self, result: CoordinationResult) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push(Arc::new(result));
        entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Every result in append order
    pub fn all(&self) -> Vec<Arc<CoordinationResult>> {
        self.read().clone()
    }

    /// Results for a scenario id, oldest first
    pub fn by_scenario(&self, scenario_id: &str) -> Vec<Arc<CoordinationResult>> {
        self.read()
            .iter()
            .filter(|r| r.scenario_id == scenario_id)
            .cloned()
            .collect()
    }

    pub fn by_pattern(&self, pattern: CoordinationPattern) -> Vec<Arc<CoordinationResult>> {
        self.read()
            .iter()
            .filter(|r| r.pattern == pattern)
            .cloned()
            .collect()
    }

    /// The `n` most recent results, newest first
    pub fn latest(&self, n: usize) -> Vec<Arc<CoordinationResult>> {
        self.read().iter().rev().take(n).cloned().collect()
    }

    pub fn stats(&self) -> HistoryStats {
        let entries = self.read();
        if entries.is_empty() {
            return HistoryStats::default();
        }

        let total = entries.len();
        let n = total as f64;
        let mut by_pattern = BTreeMap::new();
        let mut consensus_runs = 0usize;
        let mut converged = 0usize;

        for result in entries.iter() {
            *by_pattern.entry(result.pattern.to_string()).or_insert(0) += 1;
            if let Some(c) = result.converged {
                consensus_runs += 1;
                if c {
                    converged += 1;
                }
            }
        }

        HistoryStats {
            total,
            by_pattern,
            mean_consensus_score: entries.iter().map(|r| r.consensus_score).sum::<f64>() / n,
            mean_weighted_confidence: entries.iter().map(|r| r.weighted_confidence).sum::<f64>() / n,
            mean_duration_ms: entries.iter().map(|r| r.total_duration_ms as f64).sum::<f64>() / n,
            convergence_rate: (consensus_runs > 0).then(|| converged as f64 / consensus_runs as f64),
            empty_results: entries.iter().filter(|r| r.responses.is_empty()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::ResponseSet;
    use chrono::Utc;

    fn result(id: &str, pattern: CoordinationPattern, score: f64, converged: Option<bool>) -> CoordinationResult {
        CoordinationResult {
            scenario_id: id.to_string(),
            pattern,
            responses: ResponseSet::new(),
            final_decision: "d".to_string(),
            consensus_score: score,
            weighted_confidence: score,
            execution_plan: Vec::new(),
            total_duration_ms: 100,
            fabric_utilization: 0.1,
            rounds: 1,
            converged,
            primary: None,
            failed_participants: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_query() {
        let history = ResultHistory::new();
        assert!(history.is_empty());

        assert_eq!(history.append(result("a", CoordinationPattern::Parallel, 1.0, None)), 0);
        assert_eq!(history.append(result("b", CoordinationPattern::Consensus, 0.5, Some(true))), 1);
        history.append(result("a", CoordinationPattern::Consensus, 0.5, Some(false)));

        assert_eq!(history.len(), 3);
        assert_eq!(history.by_scenario("a").len(), 2);
        assert_eq!(history.by_pattern(CoordinationPattern::Consensus).len(), 2);
        assert_eq!(history.latest(1)[0].scenario_id, "a");
        assert_eq!(history.all()[1].scenario_id, "b");
    }

    #[test]
    fn test_stats() {
        let history = ResultHistory::new();
        assert_eq!(history.stats(), HistoryStats::default());

        history.append(result("a", CoordinationPattern::Parallel, 1.0, None));
        history.append(result("b", CoordinationPattern::Consensus, 0.5, Some(true)));
        history.append(result("c", CoordinationPattern::Consensus, 0.6, Some(false)));

        let stats = history.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_pattern["consensus"], 2);
        assert!((stats.mean_consensus_score - 0.7).abs() < 1e-9);
        assert_eq!(stats.convergence_rate, Some(0.5));
        assert_eq!(stats.empty_results, 3);
    }
}
