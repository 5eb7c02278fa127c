//! Observer interface for coordination runs
//!
//! Results are always returned to the caller directly. An engine can also be
//! given an [`EventBus`]; it then publishes lifecycle events for sessions,
//! participants and consensus rounds.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │    Engine    │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventFilter, FilteredReceiver, SharedEventBus};
pub use types::CoordinationEvent;
