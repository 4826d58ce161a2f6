//! # runeclash
//!
//! Match engine for a two-player turn-based card duel.
//!
//! ## Design Principles
//!
//! 1. **One orchestrator**: [`game::Game`] is the only component the
//!    outside world talks to. Everything else is owned by it.
//!
//! 2. **Events are the observation channel**: every meaningful mutation
//!    emits exactly one named event; collaborators (presentation, the
//!    automated opponent) subscribe and never reach into private state.
//!
//! 3. **Fail closed**: illegal actions (wrong phase, insufficient mana,
//!    invalid target, acting out of turn) return `false` and emit a log
//!    event. Errors are reserved for setup mistakes.
//!
//! 4. **Deterministic**: a match seeded with the same value replays
//!    identically — shuffles and the starting-player roll come from one
//!    seeded stream.
//!
//! ## Modules
//!
//! - `core`: ids, RNG, phases, consolidated match state
//! - `zones`: the four zone containers per player
//! - `cards`: definitions, per-copy instances, registry
//! - `effects`: structured effects, the generic resolver, legacy shims
//! - `player`: the per-seat aggregate (zones, life, mana, cleanup)
//! - `combat`: the attack/block sub-state machine
//! - `events`: the typed event feed and bus
//! - `controller`: single-slot command mailbox and the automated opponent
//! - `game`: the match orchestrator

pub mod cards;
pub mod combat;
pub mod controller;
pub mod core;
pub mod effects;
pub mod events;
pub mod game;
pub mod player;
pub mod zones;

// Re-export commonly used types
pub use crate::core::{
    InstanceId, Lifecycle, MatchRng, MatchState, MatchView, PendingDiscard, Phase, PlayerId,
    TurnManager,
};

pub use crate::zones::{Zone, ZoneSet};

pub use crate::cards::{
    CardDefinition, CardInstance, CardRegistry, CardSpec, CardType, DeckError, DefId,
    DefinitionError, KindState,
};

pub use crate::effects::{EffectDef, EffectKind, StatusKind, TargetRef, TargetRequirement};

pub use crate::player::{Player, HAND_SOFT_CAP, MANA_CAP, STARTING_LIFE};

pub use crate::combat::{CombatManager, CombatPhase};

pub use crate::events::{CardSummary, EventBus, GameEvent};

pub use crate::controller::{AutoController, Command, CommandSlot};

pub use crate::game::{Game, SetupError, OPENING_HAND_SIZE};
