//! Match-flow integration tests.
//!
//! These drive the engine exclusively through its public operations and
//! observe it through the event journal, the way real collaborators do.

use runeclash::cards::{CardSpec, CardType};
use runeclash::effects::{EffectDef, TargetRef, TargetRequirement};
use runeclash::{
    CardRegistry, DefId, Game, GameEvent, Lifecycle, Phase, PlayerId, Zone,
};

const P0: PlayerId = PlayerId(0);
const P1: PlayerId = PlayerId(1);

fn creature_spec(id: u32, cost: u8, attack: i32, toughness: i32) -> CardSpec {
    CardSpec {
        id,
        name: format!("Creature {id}"),
        card_type: CardType::Creature,
        cost,
        image_src: None,
        description: None,
        attack: Some(attack),
        toughness: Some(toughness),
        tribe: None,
        abilities: vec![],
        effect: None,
        target_type: None,
        is_temporary: None,
        duration: None,
        effects: vec![],
    }
}

fn instant_spec(id: u32, cost: u8, effects: Vec<EffectDef>) -> CardSpec {
    CardSpec {
        id,
        name: format!("Instant {id}"),
        card_type: CardType::Instant,
        cost,
        image_src: None,
        description: None,
        attack: None,
        toughness: None,
        tribe: None,
        abilities: vec![],
        effect: None,
        target_type: None,
        is_temporary: None,
        duration: None,
        effects,
    }
}

/// Registry with the creatures, instants and bindings the scenarios need.
fn scenario_registry() -> CardRegistry {
    let mut registry = CardRegistry::new();
    registry.register_spec(creature_spec(1, 1, 3, 3)).unwrap(); // 3/3
    registry.register_spec(creature_spec(2, 1, 4, 4)).unwrap(); // 4/4
    registry.register_spec(creature_spec(3, 1, 2, 2)).unwrap(); // 2/2
    registry.register_spec(creature_spec(4, 1, 3, 1)).unwrap(); // 3/1
    registry
        .register_spec(instant_spec(
            5,
            0,
            vec![EffectDef::deal_damage(3, TargetRequirement::Creature)],
        ))
        .unwrap(); // "Zap"
    registry.register_spec(creature_spec(6, 1, 2, 3)).unwrap(); // 2/3
    registry
        .register_spec(CardSpec {
            id: 7,
            name: "Shackling Rune".to_string(),
            card_type: CardType::Runebinding,
            cost: 0,
            image_src: None,
            description: None,
            attack: None,
            toughness: None,
            tribe: None,
            abilities: vec![],
            effect: Some("The enemy creature cannot attack".to_string()),
            target_type: Some(TargetRequirement::EnemyCreature),
            is_temporary: Some(true),
            duration: Some(2),
            effects: vec![EffectDef::apply_status(
                runeclash::StatusKind::CantAttack,
                2,
                TargetRequirement::EnemyCreature,
            )],
        })
        .unwrap();
    registry
}

fn mono_deck(def: u32) -> Vec<DefId> {
    (0..30).map(|_| DefId::new(def)).collect()
}

fn mixed_deck(a: u32, b: u32) -> Vec<DefId> {
    (0..30)
        .map(|i| DefId::new(if i % 2 == 0 { a } else { b }))
        .collect()
}

fn start_game(deck0: Vec<DefId>, deck1: Vec<DefId>) -> Game {
    let mut game = Game::new(scenario_registry(), 42);
    game.register_player("Ana", &deck0).unwrap();
    game.register_player("Bryn", &deck1).unwrap();
    game.set_starting_player(P0);
    game.start().unwrap();
    game
}

/// Find a card of the given definition anywhere outside the battlefield
/// and put it on the battlefield via the zone bridge.
fn put_on_battlefield(game: &mut Game, seat: PlayerId, def: DefId) -> runeclash::InstanceId {
    let player = game.player(seat).unwrap();
    let uid = player
        .zones()
        .cards(Zone::Deck)
        .iter()
        .chain(player.zones().cards(Zone::Hand))
        .copied()
        .find(|&uid| player.card(uid).unwrap().def_id == def)
        .expect("definition present in deck or hand");
    assert!(game.move_card_to_zone(seat, uid, Zone::Battlefield));
    uid
}

/// Pass from the mana phase to the attack phase of the current turn.
fn pass_to_attack(game: &mut Game, seat: PlayerId) {
    assert_eq!(game.current_phase(), Phase::Mana);
    assert!(game.pass_phase(seat)); // -> draw
    assert!(game.pass_phase(seat)); // -> main
    assert!(game.pass_phase(seat)); // -> attack
    assert_eq!(game.current_phase(), Phase::Attack);
}

/// Scenario A: one unblocked 3/3 into an empty board.
#[test]
fn unblocked_attacker_damages_player() {
    let mut game = start_game(mono_deck(1), mono_deck(1));

    let wolf = put_on_battlefield(&mut game, P0, DefId::new(1));
    game.end_turn(P0); // own cleanup clears summoning sickness
    game.end_turn(P1);

    assert_eq!(game.current_player(), P0);
    pass_to_attack(&mut game, P0);
    assert!(game.confirm_attack_declaration(P0, &[wolf]));

    assert_eq!(game.player(P1).unwrap().life(), 17);
    assert!(game
        .journal()
        .iter()
        .any(|e| matches!(e, GameEvent::CombatResolved)));
    assert_eq!(
        game.combat().phase(),
        runeclash::CombatPhase::None,
        "combat state returns to idle after resolution"
    );
}

/// Scenario B: a 4/4 blocked by a 2/2 and a 3/1.
#[test]
fn multi_blocker_damage_is_asymmetric() {
    let mut game = start_game(mono_deck(2), mixed_deck(3, 4));

    let attacker = put_on_battlefield(&mut game, P0, DefId::new(2));
    let first = put_on_battlefield(&mut game, P1, DefId::new(3)); // 2/2
    let second = put_on_battlefield(&mut game, P1, DefId::new(4)); // 3/1

    game.end_turn(P0);
    game.end_turn(P1);

    pass_to_attack(&mut game, P0);
    assert!(game.confirm_attack_declaration(P0, &[attacker]));
    assert_eq!(game.combat().phase(), runeclash::CombatPhase::DeclareBlockers);

    assert!(game.confirm_block_declaration(P1, &[(attacker, vec![first, second])]));

    // First blocker took the full 4 and died
    assert_eq!(game.player(P1).unwrap().card(first).unwrap().zone, Zone::Graveyard);
    // Second blocker was never damaged
    assert_eq!(
        game.player(P1).unwrap().card(second).unwrap().zone,
        Zone::Battlefield
    );
    // Attacker took 2 + 3 = 5 and died
    assert_eq!(
        game.player(P0).unwrap().card(attacker).unwrap().zone,
        Zone::Graveyard
    );
    // No damage leaked through to the defending player
    assert_eq!(game.player(P1).unwrap().life(), 20);
}

/// Scenario C: over-cap hand entering the end phase forces a discard, and
/// resolving it advances the turn.
#[test]
fn hand_cap_discard_interrupts_and_turn_advances() {
    let mut game = start_game(mono_deck(1), mono_deck(1));

    // Hand: 5 opening + 1 draw + 2 pulled from deck = 8
    game.pass_phase(P0); // mana -> draw (draws 1)
    for _ in 0..2 {
        let deck_card = game.player(P0).unwrap().zones().cards(Zone::Deck)[0];
        assert!(game.move_card_to_zone(P0, deck_card, Zone::Hand));
    }
    assert_eq!(game.player(P0).unwrap().zones().len(Zone::Hand), 8);

    game.pass_phase(P0); // draw -> main
    game.pass_phase(P0); // main -> attack
    game.pass_phase(P0); // attack -> end: cleanup finds 8 > 7

    assert_eq!(game.lifecycle(), Lifecycle::Discarding);
    assert!(game.journal().iter().any(|e| matches!(
        e,
        GameEvent::DiscardRequired { player_id: PlayerId(0), count: 1 }
    )));

    // Normal flow is paused while discarding
    assert!(!game.pass_phase(P0));

    let hand_card = game.player(P0).unwrap().zones().cards(Zone::Hand)[0];
    assert!(game.resolve_player_discard(P0, hand_card));

    assert!(game
        .journal()
        .iter()
        .any(|e| matches!(e, GameEvent::DiscardResolved { player_id: PlayerId(0) })));
    // Already in the end phase, so the turn advanced
    assert_eq!(game.current_player(), P1);
    assert_eq!(game.turn_number(), 2);
    assert_eq!(game.lifecycle(), Lifecycle::Playing);
}

/// Scenario D: drawing from an empty deck ends the match for the opponent.
#[test]
fn deck_exhaustion_ends_match() {
    let mut game = start_game(mono_deck(1), mono_deck(1));

    let deck: Vec<_> = game.player(P0).unwrap().zones().cards(Zone::Deck).to_vec();
    for uid in deck {
        assert!(game.move_card_to_zone(P0, uid, Zone::Graveyard));
    }
    assert!(game.player(P0).unwrap().zones().is_empty(Zone::Deck));

    game.pass_phase(P0); // mana -> draw: nothing to draw

    assert_eq!(game.lifecycle(), Lifecycle::GameOver);
    assert_eq!(game.winner(), Some(P1));
    assert!(game
        .journal()
        .iter()
        .any(|e| matches!(e, GameEvent::DeckEmpty { player_id: PlayerId(0) })));
    assert!(game.journal().iter().any(|e| matches!(
        e,
        GameEvent::GameOver { winner_id: PlayerId(1), .. }
    )));
}

/// Scenario E: a 3-damage instant kills a 3-toughness creature and ends in
/// the caster's graveyard.
#[test]
fn instant_kills_creature_and_is_discarded() {
    let mut game = start_game(mono_deck(5), mono_deck(6));

    let victim = put_on_battlefield(&mut game, P1, DefId::new(6)); // 2/3

    game.pass_phase(P0); // mana -> draw
    game.pass_phase(P0); // draw -> main

    let zap = game.player(P0).unwrap().zones().cards(Zone::Hand)[0];
    assert!(game.play_card(P0, zap, Some(TargetRef::Card(victim))));

    assert_eq!(game.player(P1).unwrap().card(victim).unwrap().zone, Zone::Graveyard);
    assert_eq!(game.player(P0).unwrap().card(zap).unwrap().zone, Zone::Graveyard);
}

/// An instant whose target evaporated still fails closed before mana is
/// spent; a resolved instant is discarded even when its effect fizzles.
#[test]
fn instant_with_invalid_target_is_rejected_before_mana() {
    let mut game = start_game(mono_deck(5), mono_deck(6));

    game.pass_phase(P0);
    game.pass_phase(P0);

    let zap = game.player(P0).unwrap().zones().cards(Zone::Hand)[0];
    // No creature anywhere: creature-targeting zap has no legal target
    assert!(!game.play_card(P0, zap, Some(TargetRef::Player(P1))));
    assert_eq!(game.player(P0).unwrap().card(zap).unwrap().zone, Zone::Hand);
}

/// A temporary Runebinding resolves onto the battlefield, shackles its
/// target, ticks down at its owner's cleanups, and removes itself.
#[test]
fn temporary_runebinding_expires_after_its_duration() {
    let mut game = start_game(mono_deck(7), mono_deck(6));

    let victim = put_on_battlefield(&mut game, P1, DefId::new(6));

    game.pass_phase(P0); // mana -> draw
    game.pass_phase(P0); // draw -> main

    let rune = game.player(P0).unwrap().zones().cards(Zone::Hand)[0];
    assert!(game.play_card(P0, rune, Some(TargetRef::Card(victim))));

    // Temporary binding sits on its owner's battlefield
    assert_eq!(game.player(P0).unwrap().card(rune).unwrap().zone, Zone::Battlefield);
    // Target is shackled
    assert!(game
        .player(P1)
        .unwrap()
        .card(victim)
        .unwrap()
        .creature()
        .unwrap()
        .has_status(runeclash::StatusKind::CantAttack));
    assert!(!game.player(P1).unwrap().card(victim).unwrap().can_attack());

    // Duration 2 ticks at the owner's end-of-turn cleanups
    game.end_turn(P0); // tick: 2 -> 1
    assert_eq!(game.player(P0).unwrap().card(rune).unwrap().zone, Zone::Battlefield);
    game.end_turn(P1);
    game.end_turn(P0); // tick: 1 -> 0, binding self-removes

    assert_eq!(game.player(P0).unwrap().card(rune).unwrap().zone, Zone::Graveyard);
}

/// Round-trip: hand → battlefield → graveyard leaves one consistent
/// location and no duplicates.
#[test]
fn zone_round_trip_is_consistent() {
    let mut game = start_game(mono_deck(1), mono_deck(1));

    let card = game.player(P0).unwrap().zones().cards(Zone::Hand)[0];
    assert!(game.move_card_to_zone(P0, card, Zone::Battlefield));
    assert!(game.move_card_to_zone(P0, card, Zone::Graveyard));

    let player = game.player(P0).unwrap();
    assert_eq!(player.card(card).unwrap().zone, Zone::Graveyard);
    assert!(!player.zones().contains(Zone::Hand, card));
    assert!(!player.zones().contains(Zone::Battlefield, card));
    assert!(player.zones().contains(Zone::Graveyard, card));
}

/// The defender may pass during block declaration (declaring no blocks);
/// the attacker may not.
#[test]
fn attack_phase_handshake() {
    let mut game = start_game(mono_deck(1), mono_deck(1));

    let wolf = put_on_battlefield(&mut game, P0, DefId::new(1));
    let _guard = put_on_battlefield(&mut game, P1, DefId::new(1));
    game.end_turn(P0);
    game.end_turn(P1);

    pass_to_attack(&mut game, P0);
    assert!(game.confirm_attack_declaration(P0, &[wolf]));
    assert_eq!(game.combat().phase(), runeclash::CombatPhase::DeclareBlockers);

    // Attacker cannot pass while the defender decides
    assert!(!game.pass_phase(P0));

    // Defender passing declares no blockers; combat resolves unblocked
    assert!(game.pass_phase(P1));
    assert_eq!(game.player(P1).unwrap().life(), 17);
    assert_eq!(game.combat().phase(), runeclash::CombatPhase::None);

    // Attack phase continues until the attacker passes out of it
    assert_eq!(game.current_phase(), Phase::Attack);
    assert!(game.pass_phase(P0));
    assert_eq!(game.current_phase(), Phase::End);
}

/// A fully automated match runs to a terminal state without outside input.
#[test]
fn automated_match_reaches_game_over() {
    let mut game = start_game(mixed_deck(1, 3), mixed_deck(1, 3));
    game.set_automated(P0, true);
    game.set_automated(P1, true);

    for _ in 0..5000 {
        if game.lifecycle() == Lifecycle::GameOver {
            break;
        }
        game.pump();
    }

    assert_eq!(game.lifecycle(), Lifecycle::GameOver);
    assert!(game.winner().is_some());
}

/// Same seed, same decks, same commands ⇒ same outcome.
#[test]
fn seeded_matches_are_deterministic() {
    let run = || {
        let mut game = start_game(mixed_deck(1, 3), mixed_deck(1, 3));
        game.set_automated(P0, true);
        game.set_automated(P1, true);
        for _ in 0..600 {
            game.pump();
        }
        (
            game.player(P0).unwrap().life(),
            game.player(P1).unwrap().life(),
            game.turn_number(),
            game.journal().len(),
        )
    };

    assert_eq!(run(), run());
}
