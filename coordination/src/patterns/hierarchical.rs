//! Hierarchical pattern

use tracing::{debug, warn};

use crate::context::{ContextStage, CoordinationContext};
use crate::roster::{select_primary, Workload};

use super::engine::PatternEngine;
use super::run::PatternRun;

impl PatternEngine {
    /// Parallel round, then the primary decides with the others' responses
    /// as subordinate input. A failed re-run keeps the primary's first answer.
    pub(crate) async fn run_hierarchical(
        &self,
        run: &mut PatternRun,
        participants: &[Workload],
        ctx: &CoordinationContext,
    ) {
        self.run_parallel(run, participants, ctx).await;

        let Some(primary) = select_primary(participants, &ctx.scenario_type) else {
            return;
        };
        run.primary = Some(primary.id.clone());

        if run.responses.get(&primary.id).is_none() {
            warn!(
                scenario_id = %ctx.scenario_id,
                workload_id = %primary.id,
                "Primary has no first-round response"
            );
        }

        let stage = ctx.at_stage(
            ContextStage::Subordinate,
            run.responses.priors_excluding(Some(&primary.id)),
        );
        debug!(
            scenario_id = %ctx.scenario_id,
            workload_id = %primary.id,
            subordinates = stage.prior.len(),
            "Primary reviewing subordinate input"
        );

        let result = self.generate_one(primary, &stage, 2).await;
        self.record(run, &ctx.scenario_id, 2, (primary.id.clone(), result));
        run.rounds = 2;
    }
}
