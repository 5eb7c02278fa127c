//! Decision synthesis
//!
//! Turns a finished pattern run into a [`CoordinationResult`]. Scores and the
//! execution plan are pure functions of the response set; only the decision
//! text needs one more generator call.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::CoordinationContext;
use crate::convergence::agreement;
use crate::generator::{GenerationOptions, SharedGenerator};
use crate::patterns::{CoordinationPattern, ParticipantResponse, PatternRun, ResponseSet};
use crate::roster::Roster;

/// Characters of each response quoted in the synthesis prompt
pub const DEFAULT_EXCERPT_CHARS: usize = 200;

/// Maximum execution plan length
pub const DEFAULT_PLAN_LIMIT: usize = 10;

/// Bandwidth that counts as full fabric utilization (GB/s)
pub const DEFAULT_REFERENCE_BANDWIDTH: f64 = 1000.0;

/// Decision recorded when no participant responded
pub const NO_RESPONSES_DECISION: &str =
    "No participant responses were received; no decision could be synthesized.";

/// Final output of one coordination request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationResult {
    pub scenario_id: String,
    pub pattern: CoordinationPattern,
    /// Latest response per participant, insertion ordered
    pub responses: ResponseSet,
    pub final_decision: String,
    pub consensus_score: f64,
    pub weighted_confidence: f64,
    pub execution_plan: Vec<String>,
    pub total_duration_ms: u64,
    pub fabric_utilization: f64,
    pub rounds: u32,
    /// Consensus runs only
    pub converged: Option<bool>,
    /// Hierarchical runs only
    pub primary: Option<String>,
    pub failed_participants: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// `sum(c * w) / sum(w)` over responses whose participant has a weight
pub fn weighted_confidence<F>(responses: &ResponseSet, weight_of: F) -> f64
where
    F: Fn(&str) -> Option<f64>,
{
    let (weighted, total) = responses
        .iter()
        .filter_map(|r| weight_of(&r.workload_id).map(|w| (r.confidence * w, w)))
        .fold((0.0, 0.0), |(sum, total), (cw, w)| (sum + cw, total + w));
    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

/// Agreement of the response set; zero when empty
pub fn consensus_score(responses: &ResponseSet) -> f64 {
    if responses.is_empty() {
        0.0
    } else {
        agreement(&responses.confidences())
    }
}

/// Recommendations in response order, truncated to `limit`
pub fn execution_plan(responses: &ResponseSet, limit: usize) -> Vec<String> {
    responses
        .iter()
        .flat_map(|r| r.recommendations.iter().cloned())
        .take(limit)
        .collect()
}

/// Builds coordination results from pattern runs
pub struct DecisionSynthesizer {
    generator: SharedGenerator,
    options: GenerationOptions,
    excerpt_chars: usize,
    plan_limit: usize,
    reference_bandwidth: f64,
}

impl DecisionSynthesizer {
    pub fn new(generator: SharedGenerator) -> Self {
        Self {
            generator,
            options: GenerationOptions::synthesis(),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            plan_limit: DEFAULT_PLAN_LIMIT,
            reference_bandwidth: DEFAULT_REFERENCE_BANDWIDTH,
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    pub fn with_plan_limit(mut self, plan_limit: usize) -> Self {
        self.plan_limit = plan_limit;
        self
    }

    pub fn with_reference_bandwidth(mut self, reference_bandwidth: f64) -> Self {
        self.reference_bandwidth = reference_bandwidth;
        self
    }

    pub fn fabric_utilization(&self, allocated_bandwidth: f64) -> f64 {
        if self.reference_bandwidth > 0.0 {
            allocated_bandwidth / self.reference_bandwidth
        } else {
            0.0
        }
    }

    /// Produce the final result for a run started at `started`
    pub async fn synthesize(
        &self,
        ctx: &CoordinationContext,
        run: PatternRun,
        roster: &Roster,
        allocated_bandwidth: f64,
        started: Instant,
    ) -> CoordinationResult {
        let weight_of = |id: &str| roster.weight_of(id);
        let final_decision = self.final_decision(ctx, &run.responses, roster).await;

        CoordinationResult {
            scenario_id: ctx.scenario_id.clone(),
            pattern: run.pattern,
            final_decision,
            consensus_score: consensus_score(&run.responses),
            weighted_confidence: weighted_confidence(&run.responses, weight_of),
            execution_plan: execution_plan(&run.responses, self.plan_limit),
            total_duration_ms: started.elapsed().as_millis() as u64,
            fabric_utilization: self.fabric_utilization(allocated_bandwidth),
            rounds: run.rounds,
            converged: run.converged(),
            primary: run.primary.clone(),
            failed_participants: run.failed_participants(),
            completed_at: Utc::now(),
            responses: run.responses,
        }
    }

    async fn final_decision(
        &self,
        ctx: &CoordinationContext,
        responses: &ResponseSet,
        roster: &Roster,
    ) -> String {
        if responses.is_empty() {
            return NO_RESPONSES_DECISION.to_string();
        }

        let excerpts: Vec<(String, f64, String)> = responses
            .iter()
            .map(|r| {
                (
                    r.workload_id.clone(),
                    roster.weight_of(&r.workload_id).unwrap_or(0.0),
                    r.excerpt(self.excerpt_chars),
                )
            })
            .collect();
        let prompt = ctx.render_synthesis_prompt(&excerpts);
        let options = self.options.clone().with_new_request_id();

        match self.generator.generate(&prompt, &options).await {
            Ok(decision) => {
                debug!(scenario_id = %ctx.scenario_id, chars = decision.len(), "Decision synthesized");
                decision.trim().to_string()
            }
            Err(e) => match self.heaviest(responses, roster) {
                Some(fallback) => {
                    warn!(
                        scenario_id = %ctx.scenario_id,
                        workload_id = %fallback.workload_id,
                        "Synthesis generation failed, using highest-weighted response: {}",
                        e
                    );
                    fallback.excerpt(self.excerpt_chars)
                }
                None => NO_RESPONSES_DECISION.to_string(),
            },
        }
    }

    /// Highest-weighted response; ties go to the earliest
    fn heaviest<'a>(
        &self,
        responses: &'a ResponseSet,
        roster: &Roster,
    ) -> Option<&'a ParticipantResponse> {
        let mut best: Option<(&ParticipantResponse, f64)> = None;
        for response in responses {
            let weight = roster.weight_of(&response.workload_id).unwrap_or(0.0);
            match best {
                Some((_, best_weight)) if best_weight >= weight => {}
                _ => best = Some((response, weight)),
            }
        }
        best.map(|(response, _)| response)
    }
}
