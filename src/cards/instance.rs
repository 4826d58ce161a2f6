//! Card instances: one per physical copy in a match.
//!
//! An instance pairs its immutable definition id with the mutable state a
//! copy accumulates during play. A card exists in exactly one zone at all
//! times; the instance's `zone` field and the owning player's zone
//! containers are kept in agreement by the zone-transfer primitive in
//! [`crate::player::Player`].
//!
//! The per-type runtime state is a closed tagged variant
//! (Creature / Runebinding / Instant) dispatched by pattern match.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::definition::{CardDefinition, CardType, DefKind};
use crate::core::{InstanceId, MatchView, Phase, PlayerId};
use crate::effects::shim::{self, KeywordTrigger, TriggerWhen};
use crate::effects::{EffectDef, StatusKind, TargetRef, TargetRequirement};
use crate::zones::Zone;

/// A temporary stat boost on a creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempBoost {
    pub attack: i32,
    pub toughness: i32,
    /// Remaining turns; `-1` = permanent.
    pub turns: i32,
}

/// Outcome of damaging a creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    /// A status cancelled the damage entirely.
    Prevented,
    /// Damage applied; the creature survives.
    Damaged { remaining: i32 },
    /// Damage applied; toughness reached zero.
    Dead,
}

/// Mutable creature state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatureState {
    pub base_attack: i32,
    pub base_toughness: i32,
    pub current_toughness: i32,
    pub tapped: bool,
    pub summoning_sickness: bool,
    /// Status name → remaining turns (`-1` = permanent).
    pub status_effects: FxHashMap<StatusKind, i32>,
    pub temp_boosts: SmallVec<[TempBoost; 2]>,
    /// Ability strings, scanned for trigger keywords at lookup time.
    pub abilities: Vec<String>,
}

impl CreatureState {
    fn new(attack: i32, toughness: i32, abilities: Vec<String>) -> Self {
        Self {
            base_attack: attack,
            base_toughness: toughness,
            current_toughness: toughness,
            tapped: false,
            summoning_sickness: false,
            status_effects: FxHashMap::default(),
            temp_boosts: SmallVec::new(),
            abilities,
        }
    }

    /// Calculated attack: base plus boosts, floored at 0.
    #[must_use]
    pub fn attack(&self) -> i32 {
        let boosted: i32 = self.temp_boosts.iter().map(|b| b.attack).sum();
        (self.base_attack + boosted).max(0)
    }

    /// Calculated maximum toughness: base plus boosts, floored at 1.
    #[must_use]
    pub fn max_toughness(&self) -> i32 {
        let boosted: i32 = self.temp_boosts.iter().map(|b| b.toughness).sum();
        (self.base_toughness + boosted).max(1)
    }

    /// Is a status currently present?
    #[must_use]
    pub fn has_status(&self, status: StatusKind) -> bool {
        self.status_effects.contains_key(&status)
    }

    /// Apply a status for `turns` turns (`-1` = permanent). Re-applying
    /// refreshes the duration.
    pub fn apply_status(&mut self, status: StatusKind, turns: i32) {
        self.status_effects.insert(status, turns);
    }

    /// Remove a status. Returns whether it was present.
    pub fn remove_status(&mut self, status: StatusKind) -> bool {
        self.status_effects.remove(&status).is_some()
    }

    /// Add a temporary boost. A positive toughness boost raises current
    /// toughness by the same amount.
    pub fn add_boost(&mut self, boost: TempBoost) {
        if boost.toughness > 0 {
            self.current_toughness += boost.toughness;
        }
        self.temp_boosts.push(boost);
        self.clamp_toughness();
    }

    fn clamp_toughness(&mut self) {
        let max = self.max_toughness();
        if self.current_toughness > max {
            self.current_toughness = max;
        }
    }

    /// Apply damage, honoring `shielded` (consumed once) and
    /// `prevent_damage`.
    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if amount <= 0 {
            return DamageOutcome::Damaged {
                remaining: self.current_toughness,
            };
        }
        if self.has_status(StatusKind::Shielded) {
            self.remove_status(StatusKind::Shielded);
            return DamageOutcome::Prevented;
        }
        if self.has_status(StatusKind::PreventDamage) {
            return DamageOutcome::Prevented;
        }
        self.current_toughness -= amount;
        if self.current_toughness <= 0 {
            DamageOutcome::Dead
        } else {
            DamageOutcome::Damaged {
                remaining: self.current_toughness,
            }
        }
    }

    /// Heal, clamped to the calculated maximum. Returns the amount
    /// actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current_toughness;
        self.current_toughness = (self.current_toughness + amount.max(0)).min(self.max_toughness());
        self.current_toughness - before
    }

    /// Tick end-of-turn durations: boosts and statuses with positive turn
    /// counts count down and expire at zero. Returns `true` if anything
    /// changed.
    pub fn tick_durations(&mut self) -> bool {
        let before_boosts = self.temp_boosts.len();
        for boost in &mut self.temp_boosts {
            if boost.turns > 0 {
                boost.turns -= 1;
            }
        }
        self.temp_boosts.retain(|b| b.turns != 0);
        self.clamp_toughness();

        let mut expired: SmallVec<[StatusKind; 2]> = SmallVec::new();
        for (status, turns) in &mut self.status_effects {
            if *turns > 0 {
                *turns -= 1;
                if *turns == 0 {
                    expired.push(*status);
                }
            }
        }
        for status in &expired {
            self.status_effects.remove(status);
        }

        before_boosts != self.temp_boosts.len() || !expired.is_empty()
    }

    /// Entry/death triggers recovered from the ability strings.
    /// Silenced creatures trigger nothing.
    #[must_use]
    pub fn triggers(&self, when: TriggerWhen) -> Vec<EffectDef> {
        if self.has_status(StatusKind::Silenced) {
            return Vec::new();
        }
        shim::creature_triggers(&self.abilities)
            .into_iter()
            .filter(|t| t.when == when)
            .map(|t| t.effect)
            .collect()
    }

    /// Raw keyword triggers, both timings.
    #[must_use]
    pub fn all_triggers(&self) -> Vec<KeywordTrigger> {
        shim::creature_triggers(&self.abilities)
    }
}

/// Mutable Runebinding state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunebindingState {
    pub target: TargetRequirement,
    pub is_temporary: bool,
    /// Remaining end-of-turn ticks for temporary bindings.
    pub duration_counters: Option<i32>,
    /// Where the binding resolved once on the battlefield.
    pub applied_to: Option<TargetRef>,
    /// Structured effects; empty means the per-id fallback table applies.
    pub effects: SmallVec<[EffectDef; 2]>,
}

impl RunebindingState {
    /// Tick one end-of-turn duration counter.
    ///
    /// Returns `true` when the counter reached zero and the binding should
    /// be removed.
    pub fn tick_duration(&mut self) -> bool {
        let Some(counters) = self.duration_counters.as_mut() else {
            return false;
        };
        if *counters > 0 {
            *counters -= 1;
        }
        *counters == 0
    }
}

/// Mutable Instant state: the ordered effect list to resolve.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstantState {
    pub effects: SmallVec<[EffectDef; 2]>,
}

/// Per-type runtime state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum KindState {
    Creature(CreatureState),
    Runebinding(RunebindingState),
    Instant(InstantState),
}

/// One physical card copy in a match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardInstance {
    pub uid: InstanceId,
    pub def_id: super::definition::DefId,
    pub name: String,
    pub cost: u8,
    pub owner: PlayerId,
    pub zone: Zone,
    pub kind: KindState,
}

impl CardInstance {
    /// Instantiate a copy of a definition. Copies start in the deck.
    #[must_use]
    pub fn from_definition(uid: InstanceId, def: &CardDefinition, owner: PlayerId) -> Self {
        let kind = match &def.kind {
            DefKind::Creature(c) => KindState::Creature(CreatureState::new(
                c.attack,
                c.toughness,
                c.abilities.clone(),
            )),
            DefKind::Runebinding(r) => KindState::Runebinding(RunebindingState {
                target: r.target,
                is_temporary: r.is_temporary,
                duration_counters: if r.is_temporary {
                    Some(r.duration.unwrap_or(1) as i32)
                } else {
                    None
                },
                applied_to: None,
                effects: r.effects.clone(),
            }),
            DefKind::Instant(i) => KindState::Instant(InstantState {
                effects: i.effects.clone(),
            }),
        };

        Self {
            uid,
            def_id: def.id,
            name: def.name.clone(),
            cost: def.cost,
            owner,
            zone: Zone::Deck,
            kind,
        }
    }

    /// The card's type.
    #[must_use]
    pub fn card_type(&self) -> CardType {
        match self.kind {
            KindState::Creature(_) => CardType::Creature,
            KindState::Runebinding(_) => CardType::Runebinding,
            KindState::Instant(_) => CardType::Instant,
        }
    }

    /// Creature state, if this is a creature.
    #[must_use]
    pub fn creature(&self) -> Option<&CreatureState> {
        match &self.kind {
            KindState::Creature(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable creature state, if this is a creature.
    pub fn creature_mut(&mut self) -> Option<&mut CreatureState> {
        match &mut self.kind {
            KindState::Creature(c) => Some(c),
            _ => None,
        }
    }

    /// Runebinding state, if this is a Runebinding.
    #[must_use]
    pub fn runebinding(&self) -> Option<&RunebindingState> {
        match &self.kind {
            KindState::Runebinding(r) => Some(r),
            _ => None,
        }
    }

    /// Mutable Runebinding state, if this is a Runebinding.
    pub fn runebinding_mut(&mut self) -> Option<&mut RunebindingState> {
        match &mut self.kind {
            KindState::Runebinding(r) => Some(r),
            _ => None,
        }
    }

    // === Play legality contract ===

    /// Can the owning player legally play this card right now?
    ///
    /// Base rule for every type: it is the acting player's turn, the card
    /// is in hand, and its cost fits the available mana. All three types
    /// are then main-phase plays.
    #[must_use]
    pub fn can_play(&self, view: &MatchView, available_mana: u8) -> bool {
        if !view.is_turn_of(self.owner) || self.zone != Zone::Hand || self.cost > available_mana {
            return false;
        }
        match &self.kind {
            KindState::Creature(_) => view.phase == Phase::Main,
            KindState::Runebinding(_) => view.phase == Phase::Main,
            KindState::Instant(_) => view.phase == Phase::Main,
        }
    }

    /// Does playing this card demand an explicit target?
    #[must_use]
    pub fn requires_target(&self) -> bool {
        self.target_type().is_some_and(TargetRequirement::needs_target)
    }

    /// What the play targets, if anything.
    ///
    /// For Instants this is the first effect that wants a target; the
    /// remaining effects reuse the same choice or act untargeted.
    #[must_use]
    pub fn target_type(&self) -> Option<TargetRequirement> {
        match &self.kind {
            KindState::Creature(_) => None,
            KindState::Runebinding(r) => Some(r.target),
            KindState::Instant(i) => i
                .effects
                .iter()
                .map(|e| e.target_requirement)
                .find(|t| t.needs_target()),
        }
    }

    // === Combat legality ===

    /// Creature attack eligibility: on the battlefield, untapped, no
    /// summoning sickness, positive attack, and not barred by status.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        let KindState::Creature(c) = &self.kind else {
            return false;
        };
        self.zone == Zone::Battlefield
            && !c.tapped
            && !c.summoning_sickness
            && c.attack() > 0
            && !c.has_status(StatusKind::CantAttack)
            && !c.has_status(StatusKind::Silenced)
    }

    /// Creature block eligibility: on the battlefield, untapped, not
    /// barred by status. Sickness does not prevent blocking.
    #[must_use]
    pub fn can_block(&self) -> bool {
        let KindState::Creature(c) = &self.kind else {
            return false;
        };
        self.zone == Zone::Battlefield && !c.tapped && !c.has_status(StatusKind::CantBlock)
    }

    // === Zone transitions ===

    /// Battlefield entry bookkeeping: creatures arrive untapped and
    /// summoning-sick.
    pub fn on_enter_battlefield(&mut self) {
        if let KindState::Creature(c) = &mut self.kind {
            c.tapped = false;
            c.summoning_sickness = true;
        }
    }

    /// Reset battlefield-only combat state when leaving the battlefield.
    pub fn on_leave_battlefield(&mut self) {
        if let KindState::Creature(c) = &mut self.kind {
            c.tapped = false;
            c.summoning_sickness = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Lifecycle;

    fn creature(attack: i32, toughness: i32) -> CreatureState {
        CreatureState::new(attack, toughness, vec![])
    }

    fn main_phase_view(current: PlayerId) -> MatchView {
        MatchView {
            lifecycle: Lifecycle::Playing,
            phase: Phase::Main,
            turn_number: 1,
            current_player: current,
        }
    }

    fn instance(kind: KindState, owner: PlayerId) -> CardInstance {
        CardInstance {
            uid: InstanceId::new(1),
            def_id: super::super::definition::DefId::new(1),
            name: "Test".to_string(),
            cost: 2,
            owner,
            zone: Zone::Hand,
            kind,
        }
    }

    #[test]
    fn test_attack_floor_zero() {
        let mut c = creature(1, 3);
        c.add_boost(TempBoost {
            attack: -5,
            toughness: 0,
            turns: -1,
        });
        assert_eq!(c.attack(), 0);
    }

    #[test]
    fn test_toughness_floor_one() {
        let mut c = creature(2, 2);
        c.add_boost(TempBoost {
            attack: 0,
            toughness: -5,
            turns: -1,
        });
        assert_eq!(c.max_toughness(), 1);
        // Current toughness clamps down to the new max
        assert_eq!(c.current_toughness, 1);
    }

    #[test]
    fn test_toughness_boost_raises_current() {
        let mut c = creature(2, 2);
        c.add_boost(TempBoost {
            attack: 0,
            toughness: 2,
            turns: 1,
        });
        assert_eq!(c.current_toughness, 4);
        assert_eq!(c.max_toughness(), 4);
    }

    #[test]
    fn test_shield_consumed_once() {
        let mut c = creature(2, 3);
        c.apply_status(StatusKind::Shielded, -1);

        assert_eq!(c.take_damage(5), DamageOutcome::Prevented);
        assert!(!c.has_status(StatusKind::Shielded));
        assert_eq!(c.current_toughness, 3);

        assert_eq!(c.take_damage(2), DamageOutcome::Damaged { remaining: 1 });
    }

    #[test]
    fn test_prevent_damage_persists() {
        let mut c = creature(2, 3);
        c.apply_status(StatusKind::PreventDamage, -1);

        assert_eq!(c.take_damage(5), DamageOutcome::Prevented);
        assert_eq!(c.take_damage(5), DamageOutcome::Prevented);
        assert!(c.has_status(StatusKind::PreventDamage));
    }

    #[test]
    fn test_lethal_damage() {
        let mut c = creature(2, 3);
        assert_eq!(c.take_damage(3), DamageOutcome::Dead);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut c = creature(2, 5);
        c.take_damage(3);
        assert_eq!(c.current_toughness, 2);

        assert_eq!(c.heal(10), 3);
        assert_eq!(c.current_toughness, 5);
    }

    #[test]
    fn test_tick_durations_expires_boosts_and_statuses() {
        let mut c = creature(2, 2);
        c.add_boost(TempBoost {
            attack: 2,
            toughness: 2,
            turns: 1,
        });
        c.apply_status(StatusKind::CantBlock, 1);
        c.apply_status(StatusKind::Silenced, -1);

        assert!(c.tick_durations());

        assert!(c.temp_boosts.is_empty());
        assert_eq!(c.attack(), 2);
        assert_eq!(c.current_toughness, 2); // clamped back
        assert!(!c.has_status(StatusKind::CantBlock));
        assert!(c.has_status(StatusKind::Silenced)); // permanent stays
    }

    #[test]
    fn test_can_play_base_rules() {
        let p0 = PlayerId::new(0);
        let card = instance(KindState::Creature(creature(2, 2)), p0);

        assert!(card.can_play(&main_phase_view(p0), 2));
        // Not enough mana
        assert!(!card.can_play(&main_phase_view(p0), 1));
        // Not this player's turn
        assert!(!card.can_play(&main_phase_view(PlayerId::new(1)), 5));
        // Wrong phase
        let mut view = main_phase_view(p0);
        view.phase = Phase::Attack;
        assert!(!card.can_play(&view, 5));
        // Not in hand
        let mut on_field = instance(KindState::Creature(creature(2, 2)), p0);
        on_field.zone = Zone::Battlefield;
        assert!(!on_field.can_play(&main_phase_view(p0), 5));
    }

    #[test]
    fn test_can_attack_requirements() {
        let p0 = PlayerId::new(0);
        let mut card = instance(KindState::Creature(creature(2, 2)), p0);
        card.zone = Zone::Battlefield;

        // Fresh arrival is summoning-sick
        card.on_enter_battlefield();
        assert!(!card.can_attack());

        card.creature_mut().unwrap().summoning_sickness = false;
        assert!(card.can_attack());

        card.creature_mut().unwrap().tapped = true;
        assert!(!card.can_attack());
        card.creature_mut().unwrap().tapped = false;

        card.creature_mut().unwrap().apply_status(StatusKind::CantAttack, -1);
        assert!(!card.can_attack());
        card.creature_mut().unwrap().remove_status(StatusKind::CantAttack);

        card.creature_mut().unwrap().apply_status(StatusKind::Silenced, -1);
        assert!(!card.can_attack());
    }

    #[test]
    fn test_can_block_ignores_sickness() {
        let p0 = PlayerId::new(0);
        let mut card = instance(KindState::Creature(creature(2, 2)), p0);
        card.zone = Zone::Battlefield;
        card.on_enter_battlefield();

        assert!(card.can_block());

        card.creature_mut().unwrap().apply_status(StatusKind::CantBlock, -1);
        assert!(!card.can_block());
    }

    #[test]
    fn test_leave_battlefield_resets_combat_state() {
        let p0 = PlayerId::new(0);
        let mut card = instance(KindState::Creature(creature(2, 2)), p0);
        card.zone = Zone::Battlefield;
        card.on_enter_battlefield();
        card.creature_mut().unwrap().tapped = true;

        card.on_leave_battlefield();
        let c = card.creature().unwrap();
        assert!(!c.tapped);
        assert!(!c.summoning_sickness);
    }

    #[test]
    fn test_runebinding_duration_tick() {
        let mut binding = RunebindingState {
            target: TargetRequirement::FriendlyCreature,
            is_temporary: true,
            duration_counters: Some(2),
            applied_to: None,
            effects: SmallVec::new(),
        };

        assert!(!binding.tick_duration());
        assert!(binding.tick_duration());
        // Permanent bindings never report removal
        let mut permanent = RunebindingState {
            target: TargetRequirement::None,
            is_temporary: false,
            duration_counters: None,
            applied_to: None,
            effects: SmallVec::new(),
        };
        assert!(!permanent.tick_duration());
    }

    #[test]
    fn test_silenced_creature_has_no_triggers() {
        let mut c = CreatureState::new(2, 2, vec!["Demise: deal 2 damage".to_string()]);
        assert_eq!(c.triggers(TriggerWhen::Death).len(), 1);

        c.apply_status(StatusKind::Silenced, -1);
        assert!(c.triggers(TriggerWhen::Death).is_empty());
    }

    #[test]
    fn test_instant_target_type_from_effects() {
        let p0 = PlayerId::new(0);
        let card = instance(
            KindState::Instant(InstantState {
                effects: SmallVec::from_vec(vec![
                    EffectDef::draw_cards(1),
                    EffectDef::deal_damage(3, TargetRequirement::Creature),
                ]),
            }),
            p0,
        );

        assert!(card.requires_target());
        assert_eq!(card.target_type(), Some(TargetRequirement::Creature));
    }
}
