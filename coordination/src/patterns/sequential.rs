//! Sequential pattern

use tracing::warn;

use crate::context::{ContextStage, CoordinationContext};
use crate::roster::Workload;

use super::engine::PatternEngine;
use super::run::PatternRun;

impl PatternEngine {
    /// Participants by descending priority, one at a time, each seeing every
    /// response collected before it. The first failure ends the chain.
    pub(crate) async fn run_sequential(
        &self,
        run: &mut PatternRun,
        participants: &[Workload],
        ctx: &CoordinationContext,
    ) {
        let mut order: Vec<&Workload> = participants.iter().collect();
        order.sort_by(|a, b| b.priority.cmp(&a.priority));

        let total = order.len();
        for (index, workload) in order.into_iter().enumerate() {
            let stage = ctx.at_stage(
                ContextStage::Chain {
                    position: index + 1,
                },
                run.responses.priors_excluding(None),
            );
            let result = self.generate_one(workload, &stage, 1).await;
            let failed = result.is_err();
            self.record(run, &ctx.scenario_id, 1, (workload.id.clone(), result));

            if failed {
                warn!(
                    scenario_id = %ctx.scenario_id,
                    workload_id = %workload.id,
                    skipped = total - index - 1,
                    "Sequential chain aborted"
                );
                break;
            }
        }
        run.rounds = 1;
    }
}

#[cfg(test)]
mod tests {
    use crate::context::{CoordinationContext, Scenario, ScenarioContext};
    use crate::patterns::{CoordinationPattern, PatternEngine, RunPhase};
    use crate::test_support::{team, ScriptedGenerator};

    fn ctx() -> CoordinationContext {
        let scenario = Scenario::new("s1", "operational", "Consolidate warehouses", "sequential");
        CoordinationContext::new(&scenario, ScenarioContext::new())
    }

    #[tokio::test]
    async fn test_sequential_orders_by_priority_stably() {
        let generator = ScriptedGenerator::new().shared();
        let engine = PatternEngine::new(generator.clone());
        let participants = team(&[("coo", 8, 0.12), ("cfo", 9, 0.15), ("cto", 9, 0.15), ("chro", 6, 0.08)]);

        let run = engine.run(CoordinationPattern::Sequential, &participants, &ctx()).await;

        let order: Vec<String> = generator.calls().into_iter().map(|c| c.role).collect();
        assert_eq!(order, vec!["cfo", "cto", "coo", "chro"]);
        assert_eq!(run.responses.workload_ids(), order);
        assert_eq!(run.phase, RunPhase::Completed);
    }

    #[tokio::test]
    async fn test_each_step_sees_previous_responses() {
        let generator = ScriptedGenerator::new().shared();
        let engine = PatternEngine::new(generator.clone());
        let participants = team(&[("a", 3, 0.3), ("b", 2, 0.3), ("c", 1, 0.3)]);

        engine.run(CoordinationPattern::Sequential, &participants, &ctx()).await;

        let calls = generator.calls();
        assert!(!calls[0].prompt.contains("Responses so far"));
        assert!(calls[1].prompt.contains("a assessment"));
        assert!(calls[2].prompt.contains("a assessment"));
        assert!(calls[2].prompt.contains("b assessment"));
        assert!(calls[2].prompt.contains("Stage: chain position 3"));
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_chain() {
        let generator = ScriptedGenerator::new().failing("b").shared();
        let engine = PatternEngine::new(generator.clone());
        let participants = team(&[("a", 3, 0.3), ("b", 2, 0.3), ("c", 1, 0.3)]);

        let run = engine.run(CoordinationPattern::Sequential, &participants, &ctx()).await;

        assert_eq!(run.responses.workload_ids(), vec!["a".to_string()]);
        assert_eq!(run.failures.len(), 1);
        assert!(generator.calls_for("c").is_empty());
    }
}
