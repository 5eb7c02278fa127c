//! Consensus pattern

use chrono::Utc;
use tracing::info;

use crate::context::{ContextStage, CoordinationContext};
use crate::convergence::{agreement, RoundAgreement};
use crate::events::CoordinationEvent;
use crate::roster::Workload;

use super::engine::PatternEngine;
use super::run::PatternRun;

impl PatternEngine {
    /// Parallel rounds until agreement meets the threshold or the round bound
    /// is reached. Later rounds see the previous round's responses.
    ///
    /// Agreement for a round covers only the responses generated in that
    /// round; a participant that fails a refinement drops out of it.
    pub(crate) async fn run_consensus(
        &self,
        run: &mut PatternRun,
        participants: &[Workload],
        ctx: &CoordinationContext,
    ) {
        let mut round = 1;
        let mut stage = ctx.clone();

        loop {
            let outcomes = self.fan_out(participants, &stage, round).await;
            self.record_all(run, &ctx.scenario_id, round, outcomes);
            run.rounds = round;

            let agreement = agreement(&run.responses.confidences_in_round(round));
            run.agreement_trace.push(RoundAgreement { round, agreement });
            self.publish(CoordinationEvent::RoundCompleted {
                session_id: ctx.scenario_id.clone(),
                round,
                agreement,
                timestamp: Utc::now(),
            });

            if let Some(outcome) = self.policy().evaluate(agreement, round) {
                info!(
                    scenario_id = %ctx.scenario_id,
                    round,
                    agreement,
                    outcome = %outcome,
                    "Consensus loop finished"
                );
                run.convergence = Some(outcome);
                break;
            }

            round += 1;
            stage = ctx.at_stage(
                ContextStage::Refinement { round },
                run.responses.priors_excluding(None),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::context::{CoordinationContext, Scenario, ScenarioContext};
    use crate::convergence::{ConvergenceOutcome, ConvergencePolicy};
    use crate::patterns::{CoordinationPattern, PatternEngine};
    use crate::test_support::{team, ScriptedGenerator};

    fn ctx() -> CoordinationContext {
        let scenario = Scenario::new("c1", "strategic", "Acquire a competitor", "consensus");
        CoordinationContext::new(&scenario, ScenarioContext::new())
    }

    #[tokio::test]
    async fn test_default_threshold_converges_in_first_round() {
        let generator = ScriptedGenerator::new()
            .confidence("a", 0.2)
            .confidence("b", 1.0)
            .shared();
        let engine = PatternEngine::new(generator.clone());
        let participants = team(&[("a", 1, 0.5), ("b", 1, 0.5)]);

        let run = engine.run(CoordinationPattern::Consensus, &participants, &ctx()).await;

        assert_eq!(run.rounds, 1);
        assert_eq!(run.convergence, Some(ConvergenceOutcome::Converged));
        assert_eq!(run.converged(), Some(true));
        assert!((run.agreement_trace[0].agreement - 0.84).abs() < 1e-9);
        assert_eq!(generator.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_strict_threshold_stops_at_round_three() {
        let generator = ScriptedGenerator::new()
            .confidence("a", 0.2)
            .confidence("b", 1.0)
            .shared();
        let engine =
            PatternEngine::new(generator.clone()).with_policy(ConvergencePolicy::new(0.95, 3));
        let participants = team(&[("a", 1, 0.5), ("b", 1, 0.5)]);

        let run = engine.run(CoordinationPattern::Consensus, &participants, &ctx()).await;

        assert_eq!(run.rounds, 3);
        assert_eq!(run.convergence, Some(ConvergenceOutcome::RoundLimit));
        assert_eq!(run.converged(), Some(false));
        assert_eq!(run.agreement_trace.len(), 3);
        assert_eq!(generator.calls().len(), 6);

        // latest generation per participant only
        assert_eq!(run.responses.len(), 2);
        assert!(run.responses.iter().all(|r| r.round == 3));

        let refinements = generator.calls_for("a");
        assert!(refinements[1].prompt.contains("Stage: refinement round 2"));
        assert!(refinements[1].prompt.contains("Responses from the previous round"));
        assert!(refinements[2].prompt.contains("Stage: refinement round 3"));
    }

    #[tokio::test]
    async fn test_participant_failing_late_keeps_earlier_response() {
        let generator = ScriptedGenerator::new().failing("b").shared();
        let engine = PatternEngine::new(generator).with_policy(ConvergencePolicy::new(1.1, 2));
        let participants = team(&[("a", 1, 0.5), ("b", 1, 0.5)]);

        let run = engine.run(CoordinationPattern::Consensus, &participants, &ctx()).await;

        assert_eq!(run.rounds, 2);
        assert_eq!(run.responses.workload_ids(), vec!["a".to_string()]);
        assert_eq!(run.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_agreement_ignores_responses_from_earlier_rounds() {
        let generator = ScriptedGenerator::new()
            .confidence("a", 0.2)
            .confidence("b", 1.0)
            .failing_when("b", "Stage: refinement round 2")
            .shared();
        let engine =
            PatternEngine::new(generator).with_policy(ConvergencePolicy::new(0.95, 3));
        let participants = team(&[("a", 1, 0.5), ("b", 1, 0.5)]);

        let run = engine.run(CoordinationPattern::Consensus, &participants, &ctx()).await;

        // round 1: a and b disagree; round 2: only a answered
        assert!((run.agreement_trace[0].agreement - 0.84).abs() < 1e-9);
        assert_eq!(run.agreement_trace[1].agreement, 1.0);
        assert_eq!(run.rounds, 2);
        assert_eq!(run.convergence, Some(ConvergenceOutcome::Converged));

        // b keeps its round 1 response for synthesis
        assert_eq!(run.responses.len(), 2);
        assert_eq!(run.responses.get("b").map(|r| r.round), Some(1));
        assert_eq!(run.failures.len(), 1);
    }
}
