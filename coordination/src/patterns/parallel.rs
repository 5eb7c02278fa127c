//! Parallel pattern

use crate::context::CoordinationContext;
use crate::roster::Workload;

use super::engine::PatternEngine;
use super::run::PatternRun;

impl PatternEngine {
    /// One concurrent generation per participant; failures drop that participant
    pub(crate) async fn run_parallel(
        &self,
        run: &mut PatternRun,
        participants: &[Workload],
        ctx: &CoordinationContext,
    ) {
        let outcomes = self.fan_out(participants, ctx, 1).await;
        self.record_all(run, &ctx.scenario_id, 1, outcomes);
        run.rounds = 1;
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::context::{CoordinationContext, Scenario, ScenarioContext};
    use crate::generator::GenerationError;
    use crate::patterns::{CoordinationPattern, PatternEngine, RunPhase};
    use crate::test_support::{team, ScriptedGenerator};

    fn ctx() -> CoordinationContext {
        let scenario = Scenario::new("p1", "market", "Enter the EU market", "parallel");
        CoordinationContext::new(&scenario, ScenarioContext::new())
    }

    #[tokio::test]
    async fn test_parallel_collects_all_in_input_order() {
        let generator = ScriptedGenerator::new().confidence("cmo", 0.9).shared();
        let engine = PatternEngine::new(generator.clone());
        let participants = team(&[("cmo", 7, 0.1), ("cfo", 9, 0.15), ("cto", 9, 0.15)]);

        let run = engine.run(CoordinationPattern::Parallel, &participants, &ctx()).await;

        assert_eq!(run.phase, RunPhase::Completed);
        assert_eq!(run.rounds, 1);
        assert_eq!(
            run.responses.workload_ids(),
            vec!["cmo".to_string(), "cfo".to_string(), "cto".to_string()]
        );
        let cmo = run.responses.get("cmo").unwrap();
        assert_eq!(cmo.confidence, 0.9);
        assert_eq!(cmo.round, 1);
        assert_eq!(cmo.recommendations, vec!["cmo action one", "cmo action two"]);
        assert_eq!(generator.calls().len(), 3);
        assert!(generator.calls().iter().all(|c| c.prompt.contains("Stage: initial")));
    }

    #[tokio::test]
    async fn test_parallel_drops_failures_without_failing_run() {
        let generator = ScriptedGenerator::new().failing("cto").shared();
        let engine = PatternEngine::new(generator);
        let participants = team(&[("cfo", 9, 0.15), ("cto", 9, 0.15)]);

        let run = engine.run(CoordinationPattern::Parallel, &participants, &ctx()).await;

        assert_eq!(run.responses.workload_ids(), vec!["cfo".to_string()]);
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failed_participants(), vec!["cto".to_string()]);
        assert_eq!(run.phase, RunPhase::Completed);
    }

    #[tokio::test]
    async fn test_parallel_all_failing_yields_empty_failed_run() {
        let generator = ScriptedGenerator::new().failing("cfo").failing("cto").shared();
        let engine = PatternEngine::new(generator);
        let participants = team(&[("cfo", 9, 0.15), ("cto", 9, 0.15)]);

        let run = engine.run(CoordinationPattern::Parallel, &participants, &ctx()).await;

        assert!(run.responses.is_empty());
        assert_eq!(run.phase, RunPhase::Failed);
        assert_eq!(run.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_parallel_runs_concurrently() {
        let generator = ScriptedGenerator::new()
            .delay("a", Duration::from_millis(150))
            .delay("b", Duration::from_millis(150))
            .delay("c", Duration::from_millis(150))
            .shared();
        let engine = PatternEngine::new(generator);
        let participants = team(&[("a", 1, 0.3), ("b", 1, 0.3), ("c", 1, 0.3)]);

        let start = Instant::now();
        let run = engine.run(CoordinationPattern::Parallel, &participants, &ctx()).await;

        assert_eq!(run.responses.len(), 3);
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_participant_timeout_drops_slow_participant() {
        let generator = ScriptedGenerator::new()
            .delay("slow", Duration::from_secs(5))
            .shared();
        let engine =
            PatternEngine::new(generator).with_participant_timeout(Some(Duration::from_millis(50)));
        let participants = team(&[("fast", 1, 0.5), ("slow", 1, 0.5)]);

        let run = engine.run(CoordinationPattern::Parallel, &participants, &ctx()).await;

        assert_eq!(run.responses.workload_ids(), vec!["fast".to_string()]);
        assert_eq!(
            run.failures[0].error,
            GenerationError::Timeout(Duration::from_millis(50)).to_string()
        );
    }
}
