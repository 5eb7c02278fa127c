//! Executive engine - central orchestrator for coordination requests
//!
//! One engine owns the roster, the fabric, the session registry and the
//! result history. A request flows through:
//!
//! ```text
//! parse pattern -> resolve participants -> place -> open session
//!   -> run pattern -> synthesize -> close session -> append history
//! ```
//!
//! Everything up to `open session` is synchronous validation; none of it
//! touches the response generator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigFile, EngineConfig};
use crate::context::{CoordinationContext, Scenario, ScenarioContext};
use crate::error::{CoordinationError, EngineResult};
use crate::events::{CoordinationEvent, SharedEventBus};
use crate::fabric::{FabricMetrics, FabricTopology, WARNING_UTILIZATION};
use crate::generator::{ConfidenceEstimator, MarkerConfidence, SharedGenerator};
use crate::history::ResultHistory;
use crate::patterns::{CoordinationPattern, PatternEngine};
use crate::placement::{Placement, PlacementError, PlacementOptimizer};
use crate::roster::{select_primary, Roster, RosterError, Workload};
use crate::session::{
    SessionGuard, SessionRegistry, SessionRequest, SharedSessionRegistry,
};
use crate::synthesis::{CoordinationResult, DecisionSynthesizer};

/// Shared reference to an ExecutiveEngine
pub type SharedExecutiveEngine = Arc<ExecutiveEngine>;

/// Validated request, ready for session admission
struct Plan {
    pattern: CoordinationPattern,
    participants: Vec<Workload>,
    primary: String,
    supporting: Vec<String>,
    placement: Placement,
}

/// Places, admits, runs and synthesizes coordination requests
pub struct ExecutiveEngine {
    roster: Roster,
    topology: Arc<FabricTopology>,
    sessions: SharedSessionRegistry,
    patterns: PatternEngine,
    synthesizer: DecisionSynthesizer,
    history: ResultHistory,
    events: Option<SharedEventBus>,
}

impl ExecutiveEngine {
    /// Create an engine over a fabric and roster
    pub fn new(
        config: &EngineConfig,
        topology: FabricTopology,
        roster: Roster,
        generator: SharedGenerator,
    ) -> EngineResult<Self> {
        config.validate()?;

        let topology = Arc::new(topology);
        let sessions =
            SessionRegistry::new(Arc::clone(&topology), config.session_settings()).shared();
        let estimator: Arc<dyn ConfidenceEstimator> =
            Arc::new(MarkerConfidence::new(config.confidence_fallback));

        let patterns = PatternEngine::new(Arc::clone(&generator))
            .with_estimator(estimator)
            .with_options(config.participant.clone())
            .with_participant_timeout(config.participant_timeout())
            .with_policy(config.convergence_policy());

        let synthesizer = DecisionSynthesizer::new(generator)
            .with_options(config.synthesis.clone())
            .with_excerpt_chars(config.excerpt_chars)
            .with_plan_limit(config.plan_limit)
            .with_reference_bandwidth(config.reference_bandwidth);

        info!(
            nodes = topology.node_count(),
            degree = topology.degree(),
            executives = roster.len(),
            "Executive engine ready"
        );

        Ok(Self {
            roster,
            topology,
            sessions,
            patterns,
            synthesizer,
            history: ResultHistory::new(),
            events: None,
        })
    }

    /// Build fabric and roster from a loaded config file
    pub fn from_config_file(file: &ConfigFile, generator: SharedGenerator) -> EngineResult<Self> {
        let topology = file.topology.build()?;
        let roster = Roster::from_directory(&file.directory())?;
        Self::new(&file.engine, topology, roster, generator)
    }

    /// Publish lifecycle and participant events to a bus
    pub fn with_event_bus(mut self, events: SharedEventBus) -> Self {
        self.patterns = self.patterns.with_event_bus(Some(Arc::clone(&events)));
        self.events = Some(events);
        self
    }

    /// Replace the confidence estimator used for participant responses
    pub fn with_estimator(mut self, estimator: Arc<dyn ConfidenceEstimator>) -> Self {
        self.patterns = self.patterns.with_estimator(estimator);
        self
    }

    /// Create a shared reference to this engine
    pub fn shared(self) -> SharedExecutiveEngine {
        Arc::new(self)
    }

    /// Run one scenario to a synthesized result.
    ///
    /// Participant failures never fail the call; with no responses the
    /// result carries zero scores. The result is appended to the history.
    pub async fn coordinate(
        &self,
        scenario: &Scenario,
        context: ScenarioContext,
    ) -> EngineResult<CoordinationResult> {
        let outcome = self.coordinate_inner(scenario, context).await;
        if let Err(e) = &outcome {
            self.fail(scenario, e);
        }
        outcome
    }

    /// [`ExecutiveEngine::coordinate`] bounded by a deadline. On expiry the
    /// in-flight run is dropped and its session closed as aborted.
    pub async fn coordinate_with_timeout(
        &self,
        scenario: &Scenario,
        context: ScenarioContext,
        after: Duration,
    ) -> EngineResult<CoordinationResult> {
        match tokio::time::timeout(after, self.coordinate_inner(scenario, context)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                self.fail(scenario, &e);
                Err(e)
            }
            Err(_) => {
                let e = CoordinationError::Timeout {
                    scenario_id: scenario.id.clone(),
                    pattern: scenario
                        .pattern
                        .parse()
                        .unwrap_or(CoordinationPattern::Parallel),
                    after,
                };
                self.fail(scenario, &e);
                Err(e)
            }
        }
    }

    async fn coordinate_inner(
        &self,
        scenario: &Scenario,
        context: ScenarioContext,
    ) -> EngineResult<CoordinationResult> {
        let started = Instant::now();
        let plan = self.plan(scenario)?;
        let pattern = plan.pattern;

        let request = SessionRequest {
            scenario_id: scenario.id.clone(),
            scenario_type: scenario.scenario_type.clone(),
            pattern,
            priority: scenario.priority,
            primary: plan.primary,
            supporting: plan.supporting,
            placement: plan.placement,
        };
        let (guard, session) = SessionGuard::open(&self.sessions, request)
            .map_err(|e| CoordinationError::from_session(&scenario.id, pattern, e))?;

        self.publish(CoordinationEvent::SessionOpened {
            session_id: session.session_id.clone(),
            pattern,
            primary: session.primary.clone(),
            participants: session.participants(),
            allocated_bandwidth: session.allocated_bandwidth,
            timestamp: Utc::now(),
        });

        let saturated = self
            .sessions
            .fabric_metrics()
            .saturated_nodes(WARNING_UTILIZATION);
        if !saturated.is_empty() {
            warn!(
                scenario_id = %scenario.id,
                nodes = ?saturated,
                "Fabric nodes above warning utilization"
            );
        }

        guard
            .activate()
            .map_err(|e| CoordinationError::from_session(&scenario.id, pattern, e))?;

        let ctx = CoordinationContext::new(scenario, context);
        let run = self.patterns.run(pattern, &plan.participants, &ctx).await;
        debug!(scenario_id = %scenario.id, "{}", run.status_line());
        let result = self
            .synthesizer
            .synthesize(&ctx, run, &self.roster, session.allocated_bandwidth, started)
            .await;

        let closed = guard.complete();

        info!(
            scenario_id = %result.scenario_id,
            pattern = %pattern,
            responses = result.responses.len(),
            consensus_score = result.consensus_score,
            weighted_confidence = result.weighted_confidence,
            duration_ms = result.total_duration_ms,
            "Coordination completed"
        );
        self.publish(CoordinationEvent::CoordinationCompleted {
            session_id: result.scenario_id.clone(),
            pattern,
            consensus_score: result.consensus_score,
            weighted_confidence: result.weighted_confidence,
            duration_ms: result.total_duration_ms,
            timestamp: Utc::now(),
        });
        if let Some(closed) = closed {
            self.publish(CoordinationEvent::SessionClosed {
                session_id: closed.session_id,
                status: closed.status,
                timestamp: Utc::now(),
            });
        }

        self.history.append(result.clone());
        Ok(result)
    }

    /// Synchronous validation: pattern, participants, placement, primary
    fn plan(&self, scenario: &Scenario) -> EngineResult<Plan> {
        let scenario_id = scenario.id.clone();
        let pattern: CoordinationPattern =
            scenario
                .pattern
                .parse()
                .map_err(|source| CoordinationError::UnknownPattern {
                    scenario_id: scenario_id.clone(),
                    source,
                })?;

        let participants = self
            .roster
            .resolve(&scenario.participants)
            .map_err(|e| match e {
                RosterError::UnknownWorkload(workload_id) => {
                    CoordinationError::UnknownParticipant {
                        scenario_id: scenario_id.clone(),
                        pattern,
                        workload_id,
                    }
                }
                other => CoordinationError::InvalidRoster(other),
            })?;
        let ids: Vec<String> = participants.iter().map(|w| w.id.clone()).collect();

        let placement = PlacementOptimizer::new(self.topology.node_count())
            .with_coordinator(self.roster.coordinator_id().map(str::to_string))
            .place(&ids)
            .map_err(|e| match e {
                PlacementError::InsufficientCapacity {
                    requested,
                    available,
                } => CoordinationError::InsufficientCapacity {
                    scenario_id: scenario_id.clone(),
                    pattern,
                    requested,
                    available,
                },
                PlacementError::DuplicateWorkload(workload_id) => {
                    CoordinationError::DuplicateParticipant {
                        scenario_id: scenario_id.clone(),
                        pattern,
                        workload_id,
                    }
                }
            })?;

        let primary = select_primary(&participants, &scenario.scenario_type)
            .map(|w| w.id.clone())
            .ok_or(CoordinationError::InvalidRoster(RosterError::Empty))?;
        let supporting = ids.into_iter().filter(|id| *id != primary).collect();

        Ok(Plan {
            pattern,
            participants,
            primary,
            supporting,
            placement,
        })
    }

    fn fail(&self, scenario: &Scenario, e: &CoordinationError) {
        match e {
            CoordinationError::Timeout { .. } => warn!(
                scenario_id = %scenario.id,
                stage = %e.stage(),
                "Coordination failed: {}",
                e
            ),
            _ => error!(
                scenario_id = %scenario.id,
                stage = %e.stage(),
                "Coordination rejected: {}",
                e
            ),
        }
        self.publish(CoordinationEvent::CoordinationFailed {
            session_id: scenario.id.clone(),
            stage: e.stage().to_string(),
            error: e.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn publish(&self, event: CoordinationEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    /// Append-only result log
    pub fn history(&self) -> &ResultHistory {
        &self.history
    }

    /// Ids of sessions currently open
    pub fn active_sessions(&self) -> Vec<String> {
        self.sessions.active_sessions().into_iter().collect()
    }

    pub fn sessions(&self) -> &SharedSessionRegistry {
        &self.sessions
    }

    pub fn fabric_metrics(&self) -> FabricMetrics {
        self.sessions.fabric_metrics()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn topology(&self) -> &FabricTopology {
        &self.topology
    }
}
