//! Session registry - admission, tracking and retirement of sessions
//!
//! The active-session index is guarded by a synchronous mutex so that a
//! [`SessionGuard`] can release its session from `Drop`. The lock is never
//! held across an await point.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::fabric::{FabricMetrics, FabricTopology};

use super::types::{
    CoordinationSession, ScenarioCategory, SessionOutcome, SessionRequest, SessionStatus,
};

/// Bandwidth allocated per participant before the complexity multiplier (GB/s)
pub const DEFAULT_BASE_RATE: f64 = 50.0;

/// Latency added per fabric hop (ms)
pub const DEFAULT_PER_HOP_LATENCY_MS: f64 = 0.5;

/// Error type for session operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Session already active for scenario {0}")]
    DuplicateSession(String),

    #[error("Active session limit of {limit} reached")]
    SessionLimitReached { limit: usize },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Participant {0} has no placement")]
    Unplaced(String),

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Shared reference to a SessionRegistry
pub type SharedSessionRegistry = Arc<SessionRegistry>;

/// Registry tuning
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub base_rate: f64,
    pub per_hop_latency_ms: f64,
    /// Admission cap on concurrently active sessions; unlimited when `None`
    pub max_active_sessions: Option<usize>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            base_rate: DEFAULT_BASE_RATE,
            per_hop_latency_ms: DEFAULT_PER_HOP_LATENCY_MS,
            max_active_sessions: None,
        }
    }
}

/// Creates, tracks and retires coordination sessions
#[derive(Debug)]
pub struct SessionRegistry {
    topology: Arc<FabricTopology>,
    settings: SessionSettings,
    active: Mutex<HashMap<String, CoordinationSession>>,
}

impl SessionRegistry {
    pub fn new(topology: Arc<FabricTopology>, settings: SessionSettings) -> Self {
        Self {
            topology,
            settings,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Create a shared reference to this registry
    pub fn shared(self) -> SharedSessionRegistry {
        Arc::new(self)
    }

    pub fn topology(&self) -> &FabricTopology {
        &self.topology
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CoordinationSession>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `base_rate x participant_count x complexity multiplier`
    pub fn allocated_bandwidth(&self, participant_count: usize, scenario_type: &str) -> f64 {
        let multiplier = ScenarioCategory::from_scenario_type(scenario_type).complexity_multiplier();
        self.settings.base_rate * participant_count as f64 * multiplier
    }

    /// Sum of hop distances from the primary's node to each supporting node,
    /// times the per-hop latency
    pub fn estimated_latency(&self, request: &SessionRequest) -> SessionResult<f64> {
        let placement = &request.placement;
        let primary_node = placement
            .node_of(&request.primary)
            .ok_or_else(|| SessionError::Unplaced(request.primary.clone()))?;

        let mut hops = 0u64;
        for id in &request.supporting {
            let node = placement
                .node_of(id)
                .ok_or_else(|| SessionError::Unplaced(id.clone()))?;
            let distance = self
                .topology
                .hop_distance(primary_node, node)
                .ok_or_else(|| SessionError::Unplaced(id.clone()))?;
            hops += u64::from(distance);
        }

        Ok(hops as f64 * self.settings.per_hop_latency_ms)
    }

    /// Admit a new session in `initializing` status
    pub fn open(&self, request: SessionRequest) -> SessionResult<CoordinationSession> {
        let allocated_bandwidth =
            self.allocated_bandwidth(request.participant_count(), &request.scenario_type);
        let estimated_latency_ms = self.estimated_latency(&request)?;

        let mut active = self.lock();
        if active.contains_key(&request.scenario_id) {
            return Err(SessionError::DuplicateSession(request.scenario_id));
        }
        if let Some(limit) = self.settings.max_active_sessions {
            if active.len() >= limit {
                return Err(SessionError::SessionLimitReached { limit });
            }
        }

        let session = CoordinationSession {
            session_id: request.scenario_id,
            scenario_type: request.scenario_type,
            primary: request.primary,
            supporting: request.supporting,
            pattern: request.pattern,
            priority: request.priority,
            allocated_bandwidth,
            estimated_latency_ms,
            status: SessionStatus::Initializing,
            placement: request.placement,
            opened_at: Utc::now(),
            closed_at: None,
        };
        active.insert(session.session_id.clone(), session.clone());
        drop(active);

        info!(
            session_id = %session.session_id,
            pattern = %session.pattern,
            participants = session.participant_count(),
            allocated_bandwidth = session.allocated_bandwidth,
            estimated_latency_ms = session.estimated_latency_ms,
            "Coordination session opened"
        );

        Ok(session)
    }

    /// Move a session from `initializing` to `active`
    pub fn activate(&self, session_id: &str) -> SessionResult<CoordinationSession> {
        let mut active = self.lock();
        let session = active
            .get_mut(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;

        if !session.status.can_transition_to(SessionStatus::Active) {
            return Err(SessionError::InvalidTransition {
                from: session.status,
                to: SessionStatus::Active,
            });
        }
        session.status = SessionStatus::Active;
        debug!(session_id, "Session active");
        Ok(session.clone())
    }

    /// Apply the terminal transition and remove the session from the active set.
    ///
    /// Idempotent: closing an unknown or already closed id returns `None`.
    /// Completing a session that never became active records it as aborted.
    pub fn close(&self, session_id: &str, outcome: SessionOutcome) -> Option<CoordinationSession> {
        let mut session = self.lock().remove(session_id)?;

        let requested = SessionStatus::from(outcome);
        session.status = if session.status.can_transition_to(requested) {
            requested
        } else {
            warn!(
                session_id,
                from = %session.status,
                to = %requested,
                "Invalid close transition, recording session as aborted"
            );
            SessionStatus::Aborted
        };
        session.closed_at = Some(Utc::now());

        info!(session_id, status = %session.status, "Coordination session closed");
        Some(session)
    }

    pub fn get(&self, session_id: &str) -> Option<CoordinationSession> {
        self.lock().get(session_id).cloned()
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    /// Ids of all active sessions
    pub fn active_sessions(&self) -> BTreeSet<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Accounting snapshot over active sessions
    pub fn fabric_metrics(&self) -> FabricMetrics {
        let loads: Vec<_> = self
            .lock()
            .values()
            .map(|s| (s.allocated_bandwidth, s.occupied_nodes()))
            .collect();
        FabricMetrics::compute(&self.topology, loads)
    }
}

/// Keeps a session open for the lifetime of a run.
///
/// Dropping the guard without calling [`SessionGuard::complete`] closes the
/// session as aborted, so error paths and cancelled futures never leak an
/// active session.
#[derive(Debug)]
pub struct SessionGuard {
    registry: SharedSessionRegistry,
    session_id: String,
    released: bool,
}

impl SessionGuard {
    /// Open a session and tie its lifetime to the returned guard
    pub fn open(
        registry: &SharedSessionRegistry,
        request: SessionRequest,
    ) -> SessionResult<(Self, CoordinationSession)> {
        let session = registry.open(request)?;
        let guard = Self {
            registry: Arc::clone(registry),
            session_id: session.session_id.clone(),
            released: false,
        };
        Ok((guard, session))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn activate(&self) -> SessionResult<CoordinationSession> {
        self.registry.activate(&self.session_id)
    }

    /// Close the session as completed
    pub fn complete(mut self) -> Option<CoordinationSession> {
        self.released = true;
        self.registry.close(&self.session_id, SessionOutcome::Completed)
    }

    /// Close the session as aborted
    pub fn abort(mut self) -> Option<CoordinationSession> {
        self.released = true;
        self.registry.close(&self.session_id, SessionOutcome::Aborted)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!(session_id = %self.session_id, "Session released before completion");
            self.registry.close(&self.session_id, SessionOutcome::Aborted);
        }
    }
}
