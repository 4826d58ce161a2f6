//! Combat: the attack/block sub-state machine.
//!
//! Nested inside the attack phase. States walk
//! `None → DeclareAttackers → DeclareBlockers → Resolving → None`, with a
//! shortcut straight to resolution when the defender has no creature able
//! to block.
//!
//! Damage assignment is asymmetric on purpose: a blocked attacker deals
//! its full attack to the *first* blocker in its assignment list, while
//! receiving the summed attack of *every* assigned blocker.
//!
//! Invalid input never aborts a whole declaration: bad attacker ids and
//! bad blocker assignments are filtered entry by entry. Resolution invoked
//! out of state logs a warning and force-resets to a safe baseline.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::warn;

use crate::core::{InstanceId, PlayerId};
use crate::effects::EffectDef;
use crate::events::{BlockerAssignment, CreatureUpdates, EventBus, GameEvent};
use crate::player::{CreatureDamage, Player};

/// Combat sub-state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    #[default]
    None,
    DeclareAttackers,
    DeclareBlockers,
    Resolving,
}

/// A death trigger waiting for the orchestrator's effect resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTrigger {
    /// Whose trigger it is (the dead creature's owner).
    pub controller: PlayerId,
    /// The creature that died.
    pub source: InstanceId,
    /// The effect to resolve.
    pub effect: EffectDef,
}

/// What fell out of a finished combat.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CombatOutcome {
    /// Death triggers, in resolution order.
    pub pending_triggers: Vec<PendingTrigger>,
}

/// Result of an attack declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttackDeclaration {
    /// Nothing valid was declared; combat state is unchanged.
    Rejected,
    /// Attackers locked in; waiting on the defender's blocks.
    AwaitingBlockers,
    /// Defender could not block; combat auto-resolved as fully unblocked.
    Resolved(CombatOutcome),
}

/// The attack-phase sub-state machine.
#[derive(Debug, Default)]
pub struct CombatManager {
    phase: CombatPhase,
    attacking_player: Option<PlayerId>,
    attackers: Vec<InstanceId>,
    assignments: FxHashMap<InstanceId, SmallVec<[InstanceId; 2]>>,
}

impl CombatManager {
    /// Create a manager in the idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current combat sub-state.
    #[must_use]
    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    /// The player whose attack is in flight, if any.
    #[must_use]
    pub fn attacking_player(&self) -> Option<PlayerId> {
        self.attacking_player
    }

    /// Currently declared attackers.
    #[must_use]
    pub fn attackers(&self) -> &[InstanceId] {
        &self.attackers
    }

    /// Clear all combat state. Idempotent; safe to call in any state.
    pub fn reset(&mut self) {
        self.phase = CombatPhase::None;
        self.attacking_player = None;
        self.attackers.clear();
        self.assignments.clear();
    }

    /// Declare attackers for the acting player.
    ///
    /// Each id must be a battlefield creature of the attacker that
    /// satisfies `can_attack`; invalid ids are dropped. Every surviving
    /// attacker is tapped. If the defender has no creature able to block,
    /// combat resolves immediately as fully unblocked.
    pub fn declare_attackers(
        &mut self,
        attacker_side: &mut Player,
        defender: &mut Player,
        ids: &[InstanceId],
        bus: &mut EventBus,
    ) -> AttackDeclaration {
        if !matches!(self.phase, CombatPhase::None | CombatPhase::DeclareAttackers) {
            warn!(state = ?self.phase, "declare_attackers out of state");
            return AttackDeclaration::Rejected;
        }

        let mut valid: Vec<InstanceId> = Vec::new();
        for &uid in ids {
            if valid.contains(&uid) {
                continue;
            }
            match attacker_side.card(uid) {
                Some(card) if card.can_attack() => valid.push(uid),
                _ => {
                    bus.log(format!("{uid} cannot attack; ignored"));
                }
            }
        }

        if valid.is_empty() {
            bus.log("no valid attackers declared");
            return AttackDeclaration::Rejected;
        }

        for &uid in &valid {
            if let Some(creature) = attacker_side.card_mut(uid).and_then(|c| c.creature_mut()) {
                creature.tapped = true;
                bus.emit(GameEvent::CreatureUpdate {
                    card_unique_id: uid,
                    updates: CreatureUpdates {
                        tapped: Some(true),
                        ..CreatureUpdates::default()
                    },
                });
            }
        }

        self.attacking_player = Some(attacker_side.id());
        self.attackers = valid.clone();
        self.assignments.clear();

        bus.emit(GameEvent::AttackersDeclared {
            attacking_player_id: attacker_side.id(),
            attackers: valid,
        });

        if defender.has_possible_blocker() {
            self.phase = CombatPhase::DeclareBlockers;
            AttackDeclaration::AwaitingBlockers
        } else {
            bus.emit(GameEvent::NoBlockersPossible {
                attacking_player_id: attacker_side.id(),
            });
            self.phase = CombatPhase::Resolving;
            AttackDeclaration::Resolved(self.resolve_combat(attacker_side, defender, bus))
        }
    }

    /// Declare the defender's blocker assignments and resolve combat.
    ///
    /// Assignments referencing an undeclared attacker, or a blocker the
    /// defender doesn't own or that cannot block, are dropped entry by
    /// entry. An empty (or fully filtered) map resolves as unblocked.
    pub fn declare_blockers(
        &mut self,
        attacker_side: &mut Player,
        defender: &mut Player,
        assignments: &[(InstanceId, Vec<InstanceId>)],
        bus: &mut EventBus,
    ) -> Option<CombatOutcome> {
        if self.phase != CombatPhase::DeclareBlockers {
            warn!(state = ?self.phase, "declare_blockers out of state");
            return None;
        }

        let mut kept: FxHashMap<InstanceId, SmallVec<[InstanceId; 2]>> = FxHashMap::default();
        for (attacker, blockers) in assignments {
            if !self.attackers.contains(attacker) {
                bus.log(format!("{attacker} is not a declared attacker; ignored"));
                continue;
            }
            let mut valid: SmallVec<[InstanceId; 2]> = SmallVec::new();
            for &blocker in blockers {
                match defender.card(blocker) {
                    Some(card) if card.can_block() => valid.push(blocker),
                    _ => {
                        bus.log(format!("{blocker} cannot block; ignored"));
                    }
                }
            }
            if !valid.is_empty() {
                kept.insert(*attacker, valid);
            }
        }

        let declared_blockers: Vec<InstanceId> =
            kept.values().flat_map(|b| b.iter().copied()).collect();
        let mut assignment_events: Vec<BlockerAssignment> = kept
            .iter()
            .map(|(&attacker_id, blockers)| BlockerAssignment {
                attacker_id,
                blocker_ids: blockers.to_vec(),
            })
            .collect();
        assignment_events.sort_by_key(|a| a.attacker_id);

        self.assignments = kept;
        bus.emit(GameEvent::BlockersDeclared {
            defending_player_id: defender.id(),
            blocker_assignments: assignment_events,
            declared_blockers,
        });

        self.phase = CombatPhase::Resolving;
        Some(self.resolve_combat(attacker_side, defender, bus))
    }

    /// Resolve declared combat.
    ///
    /// For each still-alive attacker in declaration order: a blocked
    /// attacker trades with its blockers (full attack into the first
    /// still-alive blocker, summed blocker attack back); an unblocked
    /// attacker damages the defending player directly. All combat state is
    /// cleared afterwards.
    pub fn resolve_combat(
        &mut self,
        attacker_side: &mut Player,
        defender: &mut Player,
        bus: &mut EventBus,
    ) -> CombatOutcome {
        if self.phase != CombatPhase::Resolving {
            warn!(state = ?self.phase, "resolve_combat outside resolving; force-resetting");
            bus.log("combat resolution out of state; combat reset");
            self.reset();
            return CombatOutcome::default();
        }

        let mut outcome = CombatOutcome::default();
        let attackers = std::mem::take(&mut self.attackers);

        for attacker in attackers {
            // Skip attackers that died to an earlier trade this combat.
            let Some(power) = attacker_side
                .card(attacker)
                .filter(|c| c.zone == crate::zones::Zone::Battlefield)
                .and_then(|c| c.creature())
                .map(|c| c.attack())
            else {
                continue;
            };

            let blockers: SmallVec<[InstanceId; 2]> = self
                .assignments
                .get(&attacker)
                .map(|assigned| {
                    assigned
                        .iter()
                        .copied()
                        .filter(|&b| {
                            defender
                                .card(b)
                                .is_some_and(|c| c.zone == crate::zones::Zone::Battlefield)
                        })
                        .collect()
                })
                .unwrap_or_default();

            if blockers.is_empty() {
                defender.take_damage(power, bus);
                continue;
            }

            // Attacker's full damage lands on the first blocker only.
            let first = blockers[0];
            if let CreatureDamage::Died { death_effects } =
                defender.damage_creature(first, power, bus)
            {
                for effect in death_effects {
                    outcome.pending_triggers.push(PendingTrigger {
                        controller: defender.id(),
                        source: first,
                        effect,
                    });
                }
            }

            // The attacker takes the summed attack of every blocker.
            let counter: i32 = blockers
                .iter()
                .filter_map(|&b| defender.card(b))
                .filter_map(|c| c.creature())
                .map(|c| c.attack())
                .sum();
            if let CreatureDamage::Died { death_effects } =
                attacker_side.damage_creature(attacker, counter, bus)
            {
                for effect in death_effects {
                    outcome.pending_triggers.push(PendingTrigger {
                        controller: attacker_side.id(),
                        source: attacker,
                        effect,
                    });
                }
            }
        }

        bus.emit(GameEvent::CombatResolved);
        self.reset();
        outcome
    }
}
