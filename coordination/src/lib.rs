//! Executive Coordination Library
//!
//! This library provides:
//! - A static interconnect fabric with placement of workloads onto nodes
//! - Coordination sessions with bandwidth and latency accounting
//! - Four multi-party coordination patterns over an external response generator
//! - Weighted synthesis of participant responses into one decision
//!
//! # Features
//!
//! ## Patterns
//! - `parallel`: one concurrent generation per participant
//! - `sequential`: descending priority, each participant sees those before it
//! - `consensus`: parallel rounds until confidence agreement meets the policy
//! - `hierarchical`: parallel, then the primary decides with subordinate input
//!
//! ## Generation
//! - [`ResponseGenerator`]: the external text-generation seam
//! - [`HttpResponseGenerator`]: OpenAI-compatible chat-completions adapter
//! - [`ConfidenceEstimator`]: confidence per response, `[confidence: x]` marker by default
//!
//! # Usage
//!
//! ```no_run
//! use executive_coordination::{
//!     EngineConfig, ExecutiveEngine, FabricTopology, HttpResponseGenerator, Roster, Scenario,
//!     ScenarioContext, StaticDirectory,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = EngineConfig::from_env();
//! let generator = Arc::new(HttpResponseGenerator::new(config.http_generator())?);
//! let engine = ExecutiveEngine::new(
//!     &config,
//!     FabricTopology::hypercube(3, 900.0)?,
//!     Roster::from_directory(&StaticDirectory::executive_team())?,
//!     generator,
//! )?;
//!
//! let scenario = Scenario::new("q3-pricing", "financial", "Raise list prices 8%?", "consensus");
//! let result = engine.coordinate(&scenario, ScenarioContext::new()).await?;
//! println!("{}", result.final_decision);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod context;
pub mod convergence;
pub mod engine;
pub mod error;
pub mod events;
pub mod fabric;
pub mod generator;
pub mod history;
pub mod patterns;
pub mod placement;
pub mod roster;
pub mod session;
pub mod synthesis;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export engine types
pub use config::{ConfigError, ConfigFile, EngineConfig};
pub use engine::{ExecutiveEngine, SharedExecutiveEngine};
pub use error::{CoordinationError, EngineResult, Stage};

// Re-export scenario and context types
pub use context::{ContextStage, CoordinationContext, PriorInput, Scenario, ScenarioContext};

// Re-export fabric and placement types
pub use fabric::{
    FabricMetrics, FabricTopology, NodeId, NodeLoadLevel, TopologyError, TopologySpec,
    WARNING_UTILIZATION,
};
pub use placement::{Placement, PlacementError, PlacementOptimizer};

// Re-export roster types
pub use roster::{select_primary, Roster, RosterError, StaticDirectory, Workload, WorkloadDirectory};

// Re-export session types
pub use session::{
    CoordinationSession, SessionError, SessionGuard, SessionPriority, SessionRegistry,
    SessionStatus, SharedSessionRegistry,
};

// Re-export pattern types
pub use convergence::{agreement, ConvergenceOutcome, ConvergencePolicy};
pub use patterns::{
    CoordinationPattern, ParticipantResponse, PatternEngine, PatternRun, ResponseSet,
    UnknownPatternError,
};

// Re-export generation types
pub use generator::{
    ConfidenceEstimator, GenerationError, GenerationOptions, HttpGeneratorConfig,
    HttpResponseGenerator, MarkerConfidence, ResponseGenerator, SharedGenerator,
};

// Re-export synthesis and history types
pub use history::{HistoryStats, ResultHistory};
pub use synthesis::{CoordinationResult, DecisionSynthesizer};

// Re-export event types
pub use events::{CoordinationEvent, EventBus, EventFilter, SharedEventBus};
