//! Coordination sessions
//!
//! A session is opened per scenario, lives for one pattern run, and is
//! removed from the active set when it completes or aborts.

pub mod registry;
pub mod types;

pub use registry::{
    SessionError, SessionGuard, SessionRegistry, SessionResult, SessionSettings,
    SharedSessionRegistry, DEFAULT_BASE_RATE, DEFAULT_PER_HOP_LATENCY_MS,
};
pub use types::{
    CoordinationSession, ScenarioCategory, SessionOutcome, SessionPriority, SessionRequest,
    SessionStatus,
};
