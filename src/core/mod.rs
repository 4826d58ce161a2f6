//! Core engine types: ids, RNG, phases, consolidated match state.
//!
//! These are the leaf building blocks everything else depends on; none of
//! them knows about cards, zones, or combat.

pub mod ids;
pub mod phase;
pub mod rng;
pub mod state;

pub use ids::{InstanceId, InstanceIdAllocator, PlayerId};
pub use phase::{Phase, TurnManager};
pub use rng::{MatchRng, MatchRngState};
pub use state::{Lifecycle, MatchState, MatchView, PendingDiscard};
