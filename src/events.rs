//! The engine's event feed.
//!
//! Every meaningful mutation emits exactly one named event. The feed is the
//! only channel through which external collaborators (presentation,
//! automated controllers, logging) observe engine state; the engine never
//! calls into them directly.
//!
//! Serialized shapes reproduce the wire format consumed by presentation:
//! variant and field names serialize in camelCase (`turnChange`,
//! `previousPlayerId`, ...), with the variant name under an `"event"` tag.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::cards::{CardInstance, CardType};
use crate::core::{InstanceId, Phase, PlayerId};
use crate::effects::TargetRef;
use crate::zones::Zone;

/// Compact card payload embedded in events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    pub unique_id: InstanceId,
    pub def_id: crate::cards::DefId,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub cost: u8,
    pub owner_id: PlayerId,
    pub location: Zone,
}

impl CardSummary {
    /// Snapshot a card instance.
    #[must_use]
    pub fn of(card: &CardInstance) -> Self {
        Self {
            unique_id: card.uid,
            def_id: card.def_id,
            name: card.name.clone(),
            card_type: card.card_type(),
            cost: card.cost,
            owner_id: card.owner,
            location: card.zone,
        }
    }
}

/// Sparse player-stat update payload. Absent fields are unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub life: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mana: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_mana: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck_size: Option<usize>,
}

/// Sparse creature update payload. Absent fields are unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatureUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_toughness: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_toughness: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tapped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summoning_sickness: Option<bool>,
}

/// One attacker → blockers assignment, as declared by the defender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockerAssignment {
    pub attacker_id: InstanceId,
    pub blocker_ids: Vec<InstanceId>,
}

/// Named engine events with fixed payload shapes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GameEvent {
    #[serde(rename_all = "camelCase")]
    GameStarted {
        starting_player_id: PlayerId,
        player_names: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    TurnChange {
        previous_player_id: PlayerId,
        current_player_id: PlayerId,
        player_name: String,
        turn_number: u32,
    },
    #[serde(rename_all = "camelCase")]
    PhaseChange {
        player_id: PlayerId,
        old_phase: Phase,
        new_phase: Phase,
    },
    #[serde(rename_all = "camelCase")]
    PlayerStatsChanged {
        player_id: PlayerId,
        updates: StatUpdates,
    },
    #[serde(rename_all = "camelCase")]
    CardDrawn { player_id: PlayerId, card: CardSummary },
    #[serde(rename_all = "camelCase")]
    CardMoved {
        card_unique_id: InstanceId,
        card_data: CardSummary,
        from_zone: Zone,
        to_zone: Zone,
        owner_id: PlayerId,
    },
    #[serde(rename_all = "camelCase")]
    CardPlayed {
        player: PlayerId,
        card: CardSummary,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<TargetRef>,
    },
    #[serde(rename_all = "camelCase")]
    CreatureUpdate {
        card_unique_id: InstanceId,
        updates: CreatureUpdates,
    },
    #[serde(rename_all = "camelCase")]
    CreatureTookDamage {
        card_unique_id: InstanceId,
        amount: i32,
        current_toughness: i32,
    },
    #[serde(rename_all = "camelCase")]
    CreatureHealed {
        card_unique_id: InstanceId,
        amount: i32,
        current_toughness: i32,
    },
    #[serde(rename_all = "camelCase")]
    DamagePrevented {
        card_unique_id: InstanceId,
        amount: i32,
    },
    #[serde(rename_all = "camelCase")]
    AttackPhaseStart { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    AttackersDeclared {
        attacking_player_id: PlayerId,
        attackers: Vec<InstanceId>,
    },
    #[serde(rename_all = "camelCase")]
    NoBlockersPossible { attacking_player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    BlockersDeclared {
        defending_player_id: PlayerId,
        blocker_assignments: Vec<BlockerAssignment>,
        declared_blockers: Vec<InstanceId>,
    },
    CombatResolved,
    #[serde(rename_all = "camelCase")]
    DiscardRequired { player_id: PlayerId, count: u32 },
    #[serde(rename_all = "camelCase")]
    DiscardResolved { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    DeckEmpty { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    GameOver {
        winner_id: PlayerId,
        winner_name: String,
        loser_id: PlayerId,
        loser_name: String,
    },
    #[serde(rename_all = "camelCase")]
    GameLog { message: String },
}

impl GameEvent {
    /// The wire name of this event (`"turnChange"`, `"gameLog"`, ...).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::GameStarted { .. } => "gameStarted",
            GameEvent::TurnChange { .. } => "turnChange",
            GameEvent::PhaseChange { .. } => "phaseChange",
            GameEvent::PlayerStatsChanged { .. } => "playerStatsChanged",
            GameEvent::CardDrawn { .. } => "cardDrawn",
            GameEvent::CardMoved { .. } => "cardMoved",
            GameEvent::CardPlayed { .. } => "cardPlayed",
            GameEvent::CreatureUpdate { .. } => "creatureUpdate",
            GameEvent::CreatureTookDamage { .. } => "creatureTookDamage",
            GameEvent::CreatureHealed { .. } => "creatureHealed",
            GameEvent::DamagePrevented { .. } => "damagePrevented",
            GameEvent::AttackPhaseStart { .. } => "attackPhaseStart",
            GameEvent::AttackersDeclared { .. } => "attackersDeclared",
            GameEvent::NoBlockersPossible { .. } => "noBlockersPossible",
            GameEvent::BlockersDeclared { .. } => "blockersDeclared",
            GameEvent::CombatResolved => "combatResolved",
            GameEvent::DiscardRequired { .. } => "discardRequired",
            GameEvent::DiscardResolved { .. } => "discardResolved",
            GameEvent::DeckEmpty { .. } => "deckEmpty",
            GameEvent::GameOver { .. } => "gameOver",
            GameEvent::GameLog { .. } => "gameLog",
        }
    }
}

/// Subscriber callback. The engine is single-threaded; subscribers run
/// synchronously inside the emitting mutation.
pub type Subscriber = Box<dyn FnMut(&GameEvent)>;

/// Publish/subscribe hub plus an append-only journal of every event.
///
/// The journal uses a persistent vector so snapshots are O(1) clones.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    journal: Vector<GameEvent>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("journal", &self.journal.len())
            .finish()
    }
}

impl EventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Subscribers see every subsequent event.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&GameEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Emit an event to all subscribers and append it to the journal.
    pub fn emit(&mut self, event: GameEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }
        self.journal.push_back(event);
    }

    /// Emit a `gameLog` line.
    pub fn log(&mut self, message: impl Into<String>) {
        self.emit(GameEvent::GameLog {
            message: message.into(),
        });
    }

    /// Snapshot of the full event journal (O(1)).
    #[must_use]
    pub fn journal(&self) -> Vector<GameEvent> {
        self.journal.clone()
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.journal.len()
    }

    /// True if nothing has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }
}
