//! The per-seat player aggregate.
//!
//! A player owns their four zones, the card copies in them, life and the
//! mana pool, and the per-turn bookkeeping (`prepare_for_turn`,
//! `end_turn_cleanup`). All zone transfers go through [`Player::move_card`],
//! the one primitive that keeps a card's `zone` field and the zone
//! containers in agreement and resets battlefield-only combat state on the
//! way out.
//!
//! Players never decide legality of whole actions; the orchestrator does.
//! What lives here are the fail-closed resource primitives (atomic mana
//! spend, once-per-turn discard-for-mana) and creature damage/heal with
//! their events.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cards::{CardInstance, DamageOutcome, KindState};
use crate::core::{InstanceId, MatchRng, PlayerId};
use crate::effects::shim::TriggerWhen;
use crate::effects::EffectDef;
use crate::events::{CardSummary, CreatureUpdates, EventBus, GameEvent, StatUpdates};
use crate::zones::{Zone, ZoneSet};

/// Life total each player starts with.
pub const STARTING_LIFE: i32 = 20;
/// Hard ceiling on `max_mana`.
pub const MANA_CAP: u8 = 10;
/// Hand size enforced only at end-of-turn cleanup.
pub const HAND_SOFT_CAP: usize = 7;

/// Result of damaging one of this player's creatures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreatureDamage {
    /// Target wasn't a living battlefield creature; nothing happened.
    Invalid,
    /// A status cancelled the damage.
    Prevented,
    /// Damage stuck; the creature lives.
    Survived,
    /// The creature died. Death-trigger effects bubble up for the
    /// orchestrator to resolve.
    Died { death_effects: Vec<EffectDef> },
}

/// One seat in the match.
#[derive(Debug, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    name: String,
    life: i32,
    mana: u8,
    max_mana: u8,
    has_discarded_for_mana: bool,
    zones: ZoneSet,
    cards: FxHashMap<InstanceId, CardInstance>,
}

impl Player {
    /// Create a player with an empty collection.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            life: STARTING_LIFE,
            mana: 0,
            max_mana: 0,
            has_discarded_for_mana: false,
            zones: ZoneSet::new(),
            cards: FxHashMap::default(),
        }
    }

    // === Accessors ===

    #[must_use]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn life(&self) -> i32 {
        self.life
    }

    #[must_use]
    pub fn mana(&self) -> u8 {
        self.mana
    }

    #[must_use]
    pub fn max_mana(&self) -> u8 {
        self.max_mana
    }

    #[must_use]
    pub fn has_discarded_for_mana(&self) -> bool {
        self.has_discarded_for_mana
    }

    /// The player's zone containers.
    #[must_use]
    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    /// Look up one of this player's cards.
    #[must_use]
    pub fn card(&self, uid: InstanceId) -> Option<&CardInstance> {
        self.cards.get(&uid)
    }

    /// Mutable card lookup.
    pub fn card_mut(&mut self, uid: InstanceId) -> Option<&mut CardInstance> {
        self.cards.get_mut(&uid)
    }

    /// Living creatures on this player's battlefield.
    pub fn battlefield_creatures(&self) -> impl Iterator<Item = &CardInstance> {
        self.zones
            .cards(Zone::Battlefield)
            .iter()
            .filter_map(|uid| self.cards.get(uid))
            .filter(|card| matches!(card.kind, KindState::Creature(_)))
    }

    /// Does this player have any creature currently able to block?
    #[must_use]
    pub fn has_possible_blocker(&self) -> bool {
        self.battlefield_creatures().any(CardInstance::can_block)
    }

    // === Setup ===

    /// Take ownership of an instantiated deck. Cards land in the deck zone.
    pub fn load_deck(&mut self, cards: Vec<CardInstance>) {
        for card in cards {
            debug_assert_eq!(card.zone, Zone::Deck);
            self.zones.insert(Zone::Deck, card.uid);
            self.cards.insert(card.uid, card);
        }
    }

    /// Shuffle the deck.
    pub fn shuffle_deck(&mut self, rng: &mut MatchRng) {
        self.zones.shuffle_deck(rng);
    }

    // === Zone transfer primitive ===

    /// Move a card to a zone, keeping the card's `zone` field and the zone
    /// containers in agreement, and emit `cardMoved`.
    ///
    /// Battlefield-only combat state (tapped, summoning sickness) is reset
    /// when the card leaves the battlefield. Fails closed if the card is
    /// unknown or its recorded zone disagrees with the containers.
    pub fn move_card(&mut self, uid: InstanceId, to: Zone, bus: &mut EventBus) -> bool {
        let Some(card) = self.cards.get_mut(&uid) else {
            warn!(player = %self.id, card = %uid, "move_card: unknown card");
            return false;
        };
        let from = card.zone;
        if from == to {
            return true;
        }
        if !self.zones.remove(from, uid) {
            warn!(player = %self.id, card = %uid, from = %from, "move_card: zone disagreement");
            return false;
        }

        if from == Zone::Battlefield {
            card.on_leave_battlefield();
        }
        card.zone = to;
        if to == Zone::Battlefield {
            card.on_enter_battlefield();
        }
        self.zones.insert(to, uid);

        let summary = CardSummary::of(&self.cards[&uid]);
        bus.emit(GameEvent::CardMoved {
            card_unique_id: uid,
            card_data: summary,
            from_zone: from,
            to_zone: to,
            owner_id: self.id,
        });
        true
    }

    // === Resources ===

    /// Spend mana atomically. Fails closed: either the full amount is
    /// spent or nothing is.
    pub fn spend_mana(&mut self, amount: u8, bus: &mut EventBus) -> bool {
        if amount > self.mana {
            return false;
        }
        self.mana -= amount;
        self.emit_stats(bus, StatUpdates {
            mana: Some(self.mana),
            ..StatUpdates::default()
        });
        true
    }

    /// Apply damage to the player's life total.
    pub fn take_damage(&mut self, amount: i32, bus: &mut EventBus) {
        if amount <= 0 {
            return;
        }
        self.life -= amount;
        self.emit_stats(bus, StatUpdates {
            life: Some(self.life),
            ..StatUpdates::default()
        });
    }

    /// Heal the player's life total.
    pub fn heal(&mut self, amount: i32, bus: &mut EventBus) {
        if amount <= 0 {
            return;
        }
        self.life += amount;
        self.emit_stats(bus, StatUpdates {
            life: Some(self.life),
            ..StatUpdates::default()
        });
    }

    fn emit_stats(&self, bus: &mut EventBus, updates: StatUpdates) {
        bus.emit(GameEvent::PlayerStatsChanged {
            player_id: self.id,
            updates,
        });
    }

    // === Turn pipeline ===

    /// Turn-start bookkeeping: clear the discard-for-mana flag, refill
    /// mana to `max_mana`, untap the battlefield.
    pub fn prepare_for_turn(&mut self, bus: &mut EventBus) {
        self.has_discarded_for_mana = false;
        self.mana = self.max_mana;
        self.emit_stats(bus, StatUpdates {
            mana: Some(self.mana),
            max_mana: Some(self.max_mana),
            ..StatUpdates::default()
        });

        let battlefield: Vec<InstanceId> = self.zones.cards(Zone::Battlefield).to_vec();
        for uid in battlefield {
            let Some(creature) = self.cards.get_mut(&uid).and_then(CardInstance::creature_mut)
            else {
                continue;
            };
            if creature.tapped {
                creature.tapped = false;
                bus.emit(GameEvent::CreatureUpdate {
                    card_unique_id: uid,
                    updates: CreatureUpdates {
                        tapped: Some(false),
                        ..CreatureUpdates::default()
                    },
                });
            }
        }
    }

    /// End-of-turn cleanup: tick temporary boosts/statuses and Runebinding
    /// durations, clear summoning sickness, then report how many cards the
    /// player must discard to get back under the hand cap (0 = none).
    pub fn end_turn_cleanup(&mut self, bus: &mut EventBus) -> u32 {
        let battlefield: Vec<InstanceId> = self.zones.cards(Zone::Battlefield).to_vec();
        let mut expired_bindings: Vec<InstanceId> = Vec::new();

        for uid in battlefield {
            let Some(card) = self.cards.get_mut(&uid) else {
                continue;
            };
            match &mut card.kind {
                KindState::Creature(creature) => {
                    let ticked = creature.tick_durations();
                    let woke = creature.summoning_sickness;
                    creature.summoning_sickness = false;
                    if ticked || woke {
                        let updates = CreatureUpdates {
                            attack: Some(creature.attack()),
                            current_toughness: Some(creature.current_toughness),
                            max_toughness: Some(creature.max_toughness()),
                            summoning_sickness: Some(false),
                            ..CreatureUpdates::default()
                        };
                        bus.emit(GameEvent::CreatureUpdate {
                            card_unique_id: uid,
                            updates,
                        });
                    }
                }
                KindState::Runebinding(binding) => {
                    if binding.tick_duration() {
                        expired_bindings.push(uid);
                    }
                }
                KindState::Instant(_) => {}
            }
        }

        for uid in expired_bindings {
            self.move_card(uid, Zone::Graveyard, bus);
        }

        let hand_size = self.zones.len(Zone::Hand);
        hand_size.saturating_sub(HAND_SOFT_CAP) as u32
    }

    // === Draw / discard ===

    /// Draw the top card of the deck into the hand.
    ///
    /// Returns `None` on an empty deck; deciding what that means for the
    /// match is the orchestrator's job.
    pub fn draw_card(&mut self, bus: &mut EventBus) -> Option<InstanceId> {
        let uid = self.zones.draw_top()?;
        // draw_top already removed it from the deck list; finish the
        // transfer by hand so we don't double-remove.
        let card = self.cards.get_mut(&uid).expect("drawn card must exist");
        card.zone = Zone::Hand;
        self.zones.insert(Zone::Hand, uid);

        let summary = CardSummary::of(&self.cards[&uid]);
        bus.emit(GameEvent::CardDrawn {
            player_id: self.id,
            card: summary,
        });
        self.emit_stats(bus, StatUpdates {
            hand_size: Some(self.zones.len(Zone::Hand)),
            deck_size: Some(self.zones.len(Zone::Deck)),
            ..StatUpdates::default()
        });
        Some(uid)
    }

    /// Discard a card from hand to the graveyard (no mana reward).
    pub fn discard_card(&mut self, uid: InstanceId, bus: &mut EventBus) -> bool {
        if !self.zones.contains(Zone::Hand, uid) {
            return false;
        }
        self.move_card(uid, Zone::Graveyard, bus)
    }

    /// Discard a card for +1 `max_mana`. At most once per turn, only while
    /// `max_mana` is below the cap, and only from a non-empty hand. The
    /// current mana pool is *not* refilled until the next turn's
    /// `prepare_for_turn`.
    pub fn discard_card_for_mana(&mut self, uid: InstanceId, bus: &mut EventBus) -> bool {
        if self.has_discarded_for_mana
            || self.max_mana >= MANA_CAP
            || self.zones.is_empty(Zone::Hand)
            || !self.zones.contains(Zone::Hand, uid)
        {
            return false;
        }
        if !self.move_card(uid, Zone::Graveyard, bus) {
            return false;
        }
        self.has_discarded_for_mana = true;
        self.max_mana += 1;
        self.emit_stats(bus, StatUpdates {
            max_mana: Some(self.max_mana),
            hand_size: Some(self.zones.len(Zone::Hand)),
            ..StatUpdates::default()
        });
        true
    }

    // === Creature damage / heal ===

    /// Damage one of this player's battlefield creatures.
    ///
    /// Emits `creatureTookDamage` / `damagePrevented`; on death the card
    /// moves to the graveyard and the death-trigger effects bubble up.
    pub fn damage_creature(
        &mut self,
        uid: InstanceId,
        amount: i32,
        bus: &mut EventBus,
    ) -> CreatureDamage {
        if !self.zones.contains(Zone::Battlefield, uid) {
            return CreatureDamage::Invalid;
        }
        let Some(creature) = self.cards.get_mut(&uid).and_then(CardInstance::creature_mut)
        else {
            return CreatureDamage::Invalid;
        };

        match creature.take_damage(amount) {
            DamageOutcome::Prevented => {
                bus.emit(GameEvent::DamagePrevented {
                    card_unique_id: uid,
                    amount,
                });
                CreatureDamage::Prevented
            }
            DamageOutcome::Damaged { remaining } => {
                bus.emit(GameEvent::CreatureTookDamage {
                    card_unique_id: uid,
                    amount,
                    current_toughness: remaining,
                });
                CreatureDamage::Survived
            }
            DamageOutcome::Dead => {
                bus.emit(GameEvent::CreatureTookDamage {
                    card_unique_id: uid,
                    amount,
                    current_toughness: 0,
                });
                let death_effects = creature.triggers(TriggerWhen::Death);
                self.move_card(uid, Zone::Graveyard, bus);
                CreatureDamage::Died { death_effects }
            }
        }
    }

    /// Heal one of this player's battlefield creatures, clamped to its
    /// calculated maximum toughness.
    pub fn heal_creature(&mut self, uid: InstanceId, amount: i32, bus: &mut EventBus) -> bool {
        if !self.zones.contains(Zone::Battlefield, uid) {
            return false;
        }
        let Some(creature) = self.cards.get_mut(&uid).and_then(CardInstance::creature_mut)
        else {
            return false;
        };
        let healed = creature.heal(amount);
        if healed > 0 {
            let current = creature.current_toughness;
            bus.emit(GameEvent::CreatureHealed {
                card_unique_id: uid,
                amount: healed,
                current_toughness: current,
            });
        }
        true
    }

    /// Destroy a battlefield creature outright (no damage step).
    ///
    /// Returns the death-trigger effects if it died.
    pub fn destroy_creature(&mut self, uid: InstanceId, bus: &mut EventBus) -> Option<Vec<EffectDef>> {
        if !self.zones.contains(Zone::Battlefield, uid) {
            return None;
        }
        let death_effects = self
            .cards
            .get(&uid)
            .and_then(CardInstance::creature)
            .map(|c| c.triggers(TriggerWhen::Death))?;
        self.move_card(uid, Zone::Graveyard, bus);
        Some(death_effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, CardSpec, CardType};
    use crate::core::InstanceIdAllocator;

    fn creature_def(id: u32, attack: i32, toughness: i32, abilities: Vec<String>) -> CardDefinition {
        CardDefinition::from_spec(CardSpec {
            id,
            name: format!("C{id}"),
            card_type: CardType::Creature,
            cost: 1,
            image_src: None,
            description: None,
            attack: Some(attack),
            toughness: Some(toughness),
            tribe: None,
            abilities,
            effect: None,
            target_type: None,
            is_temporary: None,
            duration: None,
            effects: vec![],
        })
        .unwrap()
    }

    fn player_with_deck(n: u32) -> (Player, Vec<InstanceId>) {
        let mut player = Player::new(PlayerId::new(0), "Tester");
        let mut alloc = InstanceIdAllocator::new();
        let def = creature_def(1, 2, 2, vec![]);
        let cards: Vec<CardInstance> = (0..n)
            .map(|_| CardInstance::from_definition(alloc.alloc(), &def, player.id()))
            .collect();
        let uids = cards.iter().map(|c| c.uid).collect();
        player.load_deck(cards);
        (player, uids)
    }

    #[test]
    fn test_draw_moves_top_card_to_hand() {
        let (mut player, uids) = player_with_deck(3);
        let mut bus = EventBus::new();

        let drawn = player.draw_card(&mut bus).unwrap();
        assert_eq!(drawn, *uids.last().unwrap());
        assert_eq!(player.card(drawn).unwrap().zone, Zone::Hand);
        assert!(player.zones().contains(Zone::Hand, drawn));
        assert_eq!(player.zones().len(Zone::Deck), 2);
    }

    #[test]
    fn test_draw_from_empty_deck_returns_none() {
        let (mut player, _) = player_with_deck(1);
        let mut bus = EventBus::new();

        assert!(player.draw_card(&mut bus).is_some());
        assert!(player.draw_card(&mut bus).is_none());
    }

    #[test]
    fn test_spend_mana_is_atomic() {
        let (mut player, _) = player_with_deck(1);
        let mut bus = EventBus::new();
        player.max_mana = 3;
        player.mana = 3;

        assert!(!player.spend_mana(5, &mut bus));
        assert_eq!(player.mana(), 3); // nothing spent on failure

        assert!(player.spend_mana(2, &mut bus));
        assert_eq!(player.mana(), 1);
    }

    #[test]
    fn test_discard_for_mana_once_per_turn() {
        let (mut player, _) = player_with_deck(5);
        let mut bus = EventBus::new();
        let a = player.draw_card(&mut bus).unwrap();
        let b = player.draw_card(&mut bus).unwrap();

        assert!(player.discard_card_for_mana(a, &mut bus));
        assert_eq!(player.max_mana(), 1);
        // Current mana is not refilled until the next prepare_for_turn
        assert_eq!(player.mana(), 0);

        assert!(!player.discard_card_for_mana(b, &mut bus));
        assert_eq!(player.max_mana(), 1);

        player.prepare_for_turn(&mut bus);
        assert_eq!(player.mana(), 1);
        assert!(player.discard_card_for_mana(b, &mut bus));
        assert_eq!(player.max_mana(), 2);
    }

    #[test]
    fn test_discard_for_mana_capped_at_ten() {
        let (mut player, _) = player_with_deck(3);
        let mut bus = EventBus::new();
        let card = player.draw_card(&mut bus).unwrap();
        player.max_mana = MANA_CAP;

        assert!(!player.discard_card_for_mana(card, &mut bus));
        assert_eq!(player.max_mana(), MANA_CAP);
    }

    #[test]
    fn test_move_card_keeps_location_consistent() {
        let (mut player, _) = player_with_deck(1);
        let mut bus = EventBus::new();
        let uid = player.draw_card(&mut bus).unwrap();

        assert!(player.move_card(uid, Zone::Battlefield, &mut bus));
        assert!(player.move_card(uid, Zone::Graveyard, &mut bus));

        let card = player.card(uid).unwrap();
        assert_eq!(card.zone, Zone::Graveyard);
        assert!(!player.zones().contains(Zone::Hand, uid));
        assert!(!player.zones().contains(Zone::Battlefield, uid));
        assert!(player.zones().contains(Zone::Graveyard, uid));
    }

    #[test]
    fn test_leaving_battlefield_resets_combat_state() {
        let (mut player, _) = player_with_deck(1);
        let mut bus = EventBus::new();
        let uid = player.draw_card(&mut bus).unwrap();
        player.move_card(uid, Zone::Battlefield, &mut bus);

        let creature = player.card_mut(uid).unwrap().creature_mut().unwrap();
        creature.tapped = true;
        assert!(creature.summoning_sickness);

        player.move_card(uid, Zone::Graveyard, &mut bus);
        let creature = player.card(uid).unwrap().creature().unwrap();
        assert!(!creature.tapped);
        assert!(!creature.summoning_sickness);
    }

    #[test]
    fn test_prepare_for_turn_untaps_and_refills() {
        let (mut player, _) = player_with_deck(1);
        let mut bus = EventBus::new();
        let uid = player.draw_card(&mut bus).unwrap();
        player.move_card(uid, Zone::Battlefield, &mut bus);
        player.card_mut(uid).unwrap().creature_mut().unwrap().tapped = true;
        player.max_mana = 4;

        player.prepare_for_turn(&mut bus);

        assert_eq!(player.mana(), 4);
        assert!(!player.card(uid).unwrap().creature().unwrap().tapped);
        assert!(!player.has_discarded_for_mana());
    }

    #[test]
    fn test_cleanup_clears_sickness_and_reports_excess_hand() {
        let (mut player, _) = player_with_deck(12);
        let mut bus = EventBus::new();
        let uid = player.draw_card(&mut bus).unwrap();
        player.move_card(uid, Zone::Battlefield, &mut bus);
        assert!(player.card(uid).unwrap().creature().unwrap().summoning_sickness);

        // Draw up to 9 cards in hand
        for _ in 0..9 {
            player.draw_card(&mut bus);
        }
        let excess = player.end_turn_cleanup(&mut bus);

        assert_eq!(excess, 2); // 9 - 7
        assert!(!player.card(uid).unwrap().creature().unwrap().summoning_sickness);
    }

    #[test]
    fn test_lethal_damage_moves_creature_to_graveyard() {
        let (mut player, _) = player_with_deck(1);
        let mut bus = EventBus::new();
        let uid = player.draw_card(&mut bus).unwrap();
        player.move_card(uid, Zone::Battlefield, &mut bus);

        let result = player.damage_creature(uid, 5, &mut bus);
        assert!(matches!(result, CreatureDamage::Died { .. }));
        assert_eq!(player.card(uid).unwrap().zone, Zone::Graveyard);
    }

    #[test]
    fn test_death_triggers_bubble_up() {
        let mut player = Player::new(PlayerId::new(0), "Tester");
        let mut alloc = InstanceIdAllocator::new();
        let def = creature_def(9, 1, 1, vec!["Demise: deal 2 damage".to_string()]);
        let card = CardInstance::from_definition(alloc.alloc(), &def, player.id());
        let uid = card.uid;
        player.load_deck(vec![card]);

        let mut bus = EventBus::new();
        player.draw_card(&mut bus);
        player.move_card(uid, Zone::Battlefield, &mut bus);

        match player.damage_creature(uid, 1, &mut bus) {
            CreatureDamage::Died { death_effects } => {
                assert_eq!(death_effects.len(), 1);
                assert_eq!(death_effects[0].value, 2);
            }
            other => panic!("expected death, got {other:?}"),
        }
    }

    #[test]
    fn test_damage_nonexistent_creature_is_invalid() {
        let (mut player, _) = player_with_deck(1);
        let mut bus = EventBus::new();
        assert_eq!(
            player.damage_creature(InstanceId::new(99), 3, &mut bus),
            CreatureDamage::Invalid
        );
    }
}
