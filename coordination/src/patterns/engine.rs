//! Pattern engine - dispatches participant work through the response generator

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::context::CoordinationContext;
use crate::convergence::ConvergencePolicy;
use crate::events::{CoordinationEvent, SharedEventBus};
use crate::generator::{
    parse_response, ConfidenceEstimator, GenerationError, GenerationOptions, MarkerConfidence,
    SharedGenerator,
};
use crate::roster::Workload;

use super::response::ParticipantResponse;
use super::run::{ParticipantFailure, PatternRun, RunPhase};
use super::CoordinationPattern;

/// Outcome of one participant's generation
pub(crate) type Outcome = (String, Result<ParticipantResponse, GenerationError>);

/// Executes coordination patterns against a response generator
pub struct PatternEngine {
    generator: SharedGenerator,
    estimator: Arc<dyn ConfidenceEstimator>,
    options: GenerationOptions,
    participant_timeout: Option<Duration>,
    policy: ConvergencePolicy,
    events: Option<SharedEventBus>,
}

impl PatternEngine {
    pub fn new(generator: SharedGenerator) -> Self {
        Self {
            generator,
            estimator: Arc::new(MarkerConfidence::default()),
            options: GenerationOptions::default(),
            participant_timeout: None,
            policy: ConvergencePolicy::default(),
            events: None,
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn ConfidenceEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Bound each participant generation; a slow participant becomes a
    /// [`GenerationError::Timeout`]
    pub fn with_participant_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.participant_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: ConvergencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_event_bus(mut self, events: Option<SharedEventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn policy(&self) -> &ConvergencePolicy {
        &self.policy
    }

    pub fn generator(&self) -> &SharedGenerator {
        &self.generator
    }

    /// Run a pattern over the participants.
    ///
    /// Participant failures never fail the call. The run ends `failed` only
    /// when no participant produced a response.
    pub async fn run(
        &self,
        pattern: CoordinationPattern,
        participants: &[Workload],
        ctx: &CoordinationContext,
    ) -> PatternRun {
        let mut run = PatternRun::new(pattern);
        advance(&mut run, RunPhase::Running, "participants dispatched");

        match pattern {
            CoordinationPattern::Parallel => self.run_parallel(&mut run, participants, ctx).await,
            CoordinationPattern::Sequential => self.run_sequential(&mut run, participants, ctx).await,
            CoordinationPattern::Consensus => self.run_consensus(&mut run, participants, ctx).await,
            CoordinationPattern::Hierarchical => {
                self.run_hierarchical(&mut run, participants, ctx).await
            }
        }

        if run.responses.is_empty() {
            advance(&mut run, RunPhase::Failed, "no participant produced a response");
        } else {
            advance(&mut run, RunPhase::Completed, "responses collected");
        }

        info!(
            scenario_id = %ctx.scenario_id,
            pattern = %pattern,
            responses = run.responses.len(),
            failures = run.failures.len(),
            rounds = run.rounds,
            phase = %run.phase,
            "Pattern run finished"
        );

        run
    }

    /// Generate one participant's response for a stage
    pub(crate) async fn generate_one(
        &self,
        workload: &Workload,
        ctx: &CoordinationContext,
        round: u32,
    ) -> Result<ParticipantResponse, GenerationError> {
        let prompt = ctx.render_prompt(workload);
        let options = self
            .options
            .clone()
            .with_role(workload.id.clone())
            .with_new_request_id();

        let start = Instant::now();
        let call = self.generator.generate(&prompt, &options);
        let text = match self.participant_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| GenerationError::Timeout(limit))??,
            None => call.await?,
        };
        let processing_duration_ms = start.elapsed().as_millis() as u64;

        let confidence = self.estimator.estimate(&workload.id, &text).clamp(0.0, 1.0);
        let parsed = parse_response(&text);

        debug!(
            scenario_id = %ctx.scenario_id,
            workload_id = %workload.id,
            round,
            stage = %ctx.stage,
            request_id = options.request_id.as_deref().unwrap_or("-"),
            confidence,
            duration_ms = processing_duration_ms,
            "Participant responded"
        );

        Ok(ParticipantResponse {
            workload_id: workload.id.clone(),
            text,
            confidence,
            reasoning: parsed.reasoning,
            recommendations: parsed.recommendations,
            timestamp: Utc::now(),
            processing_duration_ms,
            round,
        })
    }

    /// Concurrent fan-out with a join over every outcome
    pub(crate) async fn fan_out(
        &self,
        participants: &[Workload],
        ctx: &CoordinationContext,
        round: u32,
    ) -> Vec<Outcome> {
        join_all(participants.iter().map(|workload| async move {
            (workload.id.clone(), self.generate_one(workload, ctx, round).await)
        }))
        .await
    }

    /// Fold one outcome into the run
    pub(crate) fn record(&self, run: &mut PatternRun, session_id: &str, round: u32, outcome: Outcome) {
        let (workload_id, result) = outcome;
        match result {
            Ok(response) => {
                self.publish(CoordinationEvent::ParticipantResponded {
                    session_id: session_id.to_string(),
                    workload_id,
                    round,
                    confidence: response.confidence,
                    duration_ms: response.processing_duration_ms,
                    timestamp: Utc::now(),
                });
                run.responses.upsert(response);
            }
            Err(e) => {
                warn!(
                    scenario_id = session_id,
                    workload_id = %workload_id,
                    round,
                    "Participant dropped: {}",
                    e
                );
                self.publish(CoordinationEvent::ParticipantFailed {
                    session_id: session_id.to_string(),
                    workload_id: workload_id.clone(),
                    round,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                run.failures.push(ParticipantFailure {
                    workload_id,
                    round,
                    error: e.to_string(),
                });
            }
        }
    }

    pub(crate) fn record_all(&self, run: &mut PatternRun, session_id: &str, round: u32, outcomes: Vec<Outcome>) {
        for outcome in outcomes {
            self.record(run, session_id, round, outcome);
        }
    }

    pub(crate) fn publish(&self, event: CoordinationEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

fn advance(run: &mut PatternRun, to: RunPhase, reason: &str) {
    if let Err(e) = run.transition(to, reason) {
        warn!(pattern = %run.pattern, "Run state not advanced: {}", e);
    }
}
