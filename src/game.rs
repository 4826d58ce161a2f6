//! The match orchestrator.
//!
//! `Game` is the only component the outside world talks to. It owns the
//! two players, the consolidated match state, the phase sequencer, the
//! combat sub-state machine, the RNG, and the event bus, and it drives
//! every cross-cutting flow: match lifecycle, phase side effects, the
//! discard interruption, combat entry points, and the generic effect
//! resolver that all card effects funnel through.
//!
//! Runtime rule violations fail closed (return `false`, emit a `gameLog`
//! event); errors are reserved for setup mistakes.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::warn;

use crate::cards::{CardRegistry, DeckError, DefId, KindState};
use crate::combat::{AttackDeclaration, CombatManager, CombatOutcome, CombatPhase, PendingTrigger};
use crate::controller::{AutoController, Command, CommandSlot};
use crate::core::{
    InstanceId, InstanceIdAllocator, Lifecycle, MatchRng, MatchState, MatchView, PendingDiscard,
    Phase, PlayerId, TurnManager,
};
use crate::effects::shim;
use crate::effects::{self, EffectDef, EffectKind, ResolveResult, TargetRef};
use crate::events::{CardSummary, EventBus, GameEvent};
use crate::player::Player;
use crate::zones::Zone;

/// Cards dealt to each player at match start.
pub const OPENING_HAND_SIZE: usize = 5;

/// Bound on chained death triggers resolved from one action.
const TRIGGER_CHAIN_LIMIT: usize = 64;

/// Construction-time setup errors.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("match already has two players")]
    TooManyPlayers,
    #[error("match requires exactly 2 players, has {0}")]
    NotEnoughPlayers(usize),
    #[error("match already started")]
    AlreadyStarted,
    #[error(transparent)]
    Deck(#[from] DeckError),
}

/// How a card will resolve, captured before any mutation.
enum PlayPlan {
    Creature,
    Runebinding {
        effects: Vec<EffectDef>,
        is_temporary: bool,
    },
    Instant {
        effects: Vec<EffectDef>,
    },
}

/// Does a binding with these effects stay on the battlefield? Continuing
/// modifications (statuses, boosts) do; one-shot effects resolve and the
/// card goes straight to the graveyard.
fn binding_persists(effects: &[EffectDef]) -> bool {
    effects.iter().any(|e| {
        matches!(
            e.kind,
            EffectKind::ApplyStatus | EffectKind::BoostAttack | EffectKind::BoostToughness
        )
    })
}

/// The match engine.
pub struct Game {
    registry: CardRegistry,
    players: Vec<Player>,
    state: MatchState,
    turn: TurnManager,
    combat: CombatManager,
    bus: EventBus,
    rng: MatchRng,
    alloc: InstanceIdAllocator,
    slots: [CommandSlot; 2],
    automated: [bool; 2],
    starting_player_override: Option<PlayerId>,
}

fn split_pair(players: &mut [Player], first: PlayerId) -> (&mut Player, &mut Player) {
    let (a, b) = players.split_at_mut(1);
    if first.index() == 0 {
        (&mut a[0], &mut b[0])
    } else {
        (&mut b[0], &mut a[0])
    }
}

impl Game {
    /// Create a match in the setup stage.
    #[must_use]
    pub fn new(registry: CardRegistry, seed: u64) -> Self {
        Self {
            registry,
            players: Vec::with_capacity(2),
            state: MatchState::new(),
            turn: TurnManager::new(),
            combat: CombatManager::new(),
            bus: EventBus::new(),
            rng: MatchRng::new(seed),
            alloc: InstanceIdAllocator::new(),
            slots: [CommandSlot::new(), CommandSlot::new()],
            automated: [false, false],
            starting_player_override: None,
        }
    }

    // === Setup ===

    /// Register a player with a validated deck list. At most two.
    pub fn register_player(&mut self, name: &str, deck: &[DefId]) -> Result<PlayerId, SetupError> {
        if self.state.lifecycle() != Lifecycle::Setup {
            return Err(SetupError::AlreadyStarted);
        }
        if self.players.len() >= 2 {
            return Err(SetupError::TooManyPlayers);
        }
        let id = PlayerId::new(self.players.len() as u8);
        let cards = self.registry.instantiate_deck(deck, id, &mut self.alloc)?;
        let mut player = Player::new(id, name);
        player.load_deck(cards);
        self.players.push(player);
        Ok(id)
    }

    /// Mark a seat as automated; its decisions then come from
    /// [`AutoController`] during [`Game::pump`].
    pub fn set_automated(&mut self, seat: PlayerId, automated: bool) {
        self.automated[seat.index()] = automated;
    }

    /// Fix the starting player instead of rolling for it.
    pub fn set_starting_player(&mut self, seat: PlayerId) {
        self.starting_player_override = Some(seat);
    }

    /// Shuffle decks, deal opening hands, roll the starting player, and
    /// begin turn 1.
    pub fn start(&mut self) -> Result<(), SetupError> {
        if self.state.lifecycle() != Lifecycle::Setup {
            return Err(SetupError::AlreadyStarted);
        }
        if self.players.len() != 2 {
            return Err(SetupError::NotEnoughPlayers(self.players.len()));
        }
        self.state.begin_starting();

        let rng = &mut self.rng;
        for player in &mut self.players {
            player.shuffle_deck(rng);
        }
        for id in PlayerId::both() {
            for _ in 0..OPENING_HAND_SIZE {
                self.with_seat(id, |p, bus| p.draw_card(bus));
            }
        }

        let starting = self.starting_player_override.unwrap_or_else(|| {
            if self.rng.gen_bool(0.5) {
                PlayerId::new(0)
            } else {
                PlayerId::new(1)
            }
        });
        self.state.begin_playing(starting);

        let player_names = self.players.iter().map(|p| p.name().to_string()).collect();
        self.bus.emit(GameEvent::GameStarted {
            starting_player_id: starting,
            player_names,
        });
        self.bus.emit(GameEvent::TurnChange {
            previous_player_id: starting.opponent(),
            current_player_id: starting,
            player_name: self.players[starting.index()].name().to_string(),
            turn_number: 1,
        });
        self.on_phase_enter(Phase::Mana);
        Ok(())
    }

    // === Views ===

    /// Read-only action-legality snapshot.
    #[must_use]
    pub fn view(&self) -> MatchView {
        MatchView {
            lifecycle: self.state.lifecycle(),
            phase: self.turn.phase(),
            turn_number: self.turn.turn_number(),
            current_player: self.state.current_player(),
        }
    }

    /// Current lifecycle stage.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle()
    }

    /// Current turn phase.
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        self.turn.phase()
    }

    /// Current turn number.
    #[must_use]
    pub fn turn_number(&self) -> u32 {
        self.turn.turn_number()
    }

    /// The player whose turn it is.
    #[must_use]
    pub fn current_player(&self) -> PlayerId {
        self.state.current_player()
    }

    /// The pending discard obligation, if flow is paused on one.
    #[must_use]
    pub fn pending_discard(&self) -> Option<PendingDiscard> {
        self.state.pending_discard()
    }

    /// The winner, once the match is over.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        self.state.winner()
    }

    /// The combat sub-state machine (read-only).
    #[must_use]
    pub fn combat(&self) -> &CombatManager {
        &self.combat
    }

    /// Read a player's public aggregate.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.index())
    }

    /// Subscribe to the event feed.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&GameEvent) + 'static) {
        self.bus.subscribe(subscriber);
    }

    /// Snapshot of every event emitted so far.
    #[must_use]
    pub fn journal(&self) -> im::Vector<GameEvent> {
        self.bus.journal()
    }

    // === Command pump ===

    /// Queue a command into its seat's single-slot mailbox, displacing any
    /// stale pending command.
    pub fn queue_command(&mut self, command: Command) -> Option<Command> {
        self.slots[command.player().index()].schedule(command)
    }

    /// Apply at most one pending command for the seat that may act right
    /// now, re-validating its preconditions at apply time. Automated seats
    /// decide fresh when their slot is empty.
    ///
    /// Returns whether a command was applied successfully.
    pub fn pump(&mut self) -> bool {
        if self.state.is_over() {
            return false;
        }
        let Some(seat) = self.acting_seat() else {
            return false;
        };
        let idx = seat.index();
        let mut command = self.slots[idx].take();
        if command.is_none() && self.automated[idx] {
            command = AutoController::decide(self, seat);
        }
        let Some(command) = command else {
            return false;
        };
        if command.player() != seat {
            self.bus.log("stale command discarded: seat may not act");
            return false;
        }
        self.apply_command(command)
    }

    fn acting_seat(&self) -> Option<PlayerId> {
        match self.state.lifecycle() {
            Lifecycle::Discarding => self.state.pending_discard().map(|p| p.player_id),
            Lifecycle::Playing => {
                if self.combat.phase() == CombatPhase::DeclareBlockers {
                    self.combat.attacking_player().map(PlayerId::opponent)
                } else {
                    Some(self.state.current_player())
                }
            }
            _ => None,
        }
    }

    fn apply_command(&mut self, command: Command) -> bool {
        match command {
            Command::PlayCard {
                player,
                card,
                target,
            } => self.play_card(player, card, target),
            Command::DiscardForMana { player, card } => self.discard_for_mana(player, card),
            Command::DeclareAttackers { player, attackers } => {
                self.confirm_attack_declaration(player, &attackers)
            }
            Command::DeclareBlockers {
                player,
                assignments,
            } => self.confirm_block_declaration(player, &assignments),
            Command::PassPhase { player } => self.pass_phase(player),
            Command::EndTurn { player } => self.end_turn(player),
            Command::ResolveDiscard { player, card } => self.resolve_player_discard(player, card),
        }
    }

    // === Phase driving ===

    /// Advance the current phase.
    ///
    /// In the attack phase, who may pass depends on the combat sub-state:
    /// the attacker passes only while combat is idle (skipping combat),
    /// the defender "passes" during block declaration (declaring no
    /// blockers), and nobody passes mid-resolution.
    pub fn pass_phase(&mut self, actor: PlayerId) -> bool {
        if !self.state.is_playing() {
            self.bus.log("cannot pass: match is not in normal flow");
            return false;
        }
        let current = self.state.current_player();

        if self.turn.phase() == Phase::Attack {
            return match self.combat.phase() {
                CombatPhase::None | CombatPhase::DeclareAttackers => {
                    if actor != current {
                        self.bus.log("only the attacking player may pass now");
                        false
                    } else {
                        self.advance_phase();
                        true
                    }
                }
                CombatPhase::DeclareBlockers => {
                    if actor != current.opponent() {
                        self.bus.log("only the defender may act now");
                        false
                    } else {
                        // Passing as defender declares no blockers.
                        self.confirm_block_declaration(actor, &[])
                    }
                }
                CombatPhase::Resolving => {
                    self.bus.log("combat is resolving");
                    false
                }
            };
        }

        if actor != current {
            self.bus.log("cannot pass: not this player's turn");
            return false;
        }
        self.advance_phase();
        true
    }

    /// Fast-forward the rest of the actor's turn, applying every phase's
    /// side effects on the way. Stops early if a discard interruption (or
    /// the end of the match) pauses flow.
    pub fn end_turn(&mut self, actor: PlayerId) -> bool {
        if !self.state.is_playing() || actor != self.state.current_player() {
            self.bus.log("cannot end turn now");
            return false;
        }
        if self.combat.phase() != CombatPhase::None {
            self.bus.log("cannot end turn during combat");
            return false;
        }
        let turn = self.turn.turn_number();
        let mut guard = 0;
        while self.state.is_playing()
            && self.turn.turn_number() == turn
            && guard <= Phase::ORDER.len()
        {
            self.advance_phase();
            guard += 1;
        }
        true
    }

    fn advance_phase(&mut self) {
        let old = self.turn.phase();
        let wrapped = self.turn.next_phase();
        if wrapped {
            self.next_turn();
        } else {
            let new = self.turn.phase();
            self.bus.emit(GameEvent::PhaseChange {
                player_id: self.state.current_player(),
                old_phase: old,
                new_phase: new,
            });
            self.on_phase_enter(new);
        }
    }

    fn next_turn(&mut self) {
        let previous = self.state.current_player();
        self.state.switch_current_player();
        self.turn.start_new_turn();
        let current = self.state.current_player();
        self.bus.emit(GameEvent::TurnChange {
            previous_player_id: previous,
            current_player_id: current,
            player_name: self.players[current.index()].name().to_string(),
            turn_number: self.turn.turn_number(),
        });
        self.on_phase_enter(Phase::Mana);
    }

    fn on_phase_enter(&mut self, phase: Phase) {
        let current = self.state.current_player();
        match phase {
            Phase::Mana => {
                self.with_seat(current, |p, bus| p.prepare_for_turn(bus));
            }
            Phase::Draw => {
                let drew = self.with_seat(current, |p, bus| p.draw_card(bus));
                if drew.is_none() {
                    self.handle_deck_exhaustion(current);
                }
            }
            Phase::Main => {}
            Phase::Attack => {
                self.combat.reset();
                self.bus.emit(GameEvent::AttackPhaseStart { player_id: current });
            }
            Phase::End => {
                let owed = self.with_seat(current, |p, bus| p.end_turn_cleanup(bus));
                if owed > 0 {
                    self.request_player_discard(current, owed);
                }
            }
        }
    }

    // === Discard interruption ===

    fn request_player_discard(&mut self, player_id: PlayerId, count: u32) {
        self.state.begin_discard(player_id, count);
        self.bus.emit(GameEvent::DiscardRequired { player_id, count });
    }

    /// Resolve one card of a pending discard obligation.
    ///
    /// When the obligation reaches zero, flow resumes; if the match was
    /// already in the end phase, the turn advances immediately.
    pub fn resolve_player_discard(&mut self, player_id: PlayerId, card: InstanceId) -> bool {
        if self.state.lifecycle() != Lifecycle::Discarding {
            self.bus.log("no discard is pending");
            return false;
        }
        let Some(pending) = self.state.pending_discard() else {
            return false;
        };
        if pending.player_id != player_id {
            self.bus.log("discard pending for the other player");
            return false;
        }
        if !self.with_seat(player_id, |p, bus| p.discard_card(card, bus)) {
            self.bus.log("card is not in hand; discard rejected");
            return false;
        }
        if self.state.discard_resolved() {
            self.bus.emit(GameEvent::DiscardResolved { player_id });
            if self.turn.phase() == Phase::End {
                self.next_turn();
            }
        }
        true
    }

    // === Card play ===

    /// Play a card from the acting player's hand.
    ///
    /// Validates play legality and the target (if the card wants one)
    /// *before* mana is spent; the spend itself is atomic. Instants always
    /// end in the graveyard regardless of how their effects fared, and
    /// spent mana is never refunded.
    pub fn play_card(
        &mut self,
        player_id: PlayerId,
        card_uid: InstanceId,
        target: Option<TargetRef>,
    ) -> bool {
        if !self.state.is_playing() {
            self.bus.log("cannot play cards now");
            return false;
        }
        let view = self.view();

        let Some(player) = self.players.get(player_id.index()) else {
            return false;
        };
        let Some(card) = player.card(card_uid) else {
            self.bus.log("no such card");
            return false;
        };
        if !card.can_play(&view, player.mana()) {
            self.bus.log(format!("{} cannot be played right now", card.name));
            return false;
        }

        let cost = card.cost;
        let def_id = card.def_id;
        let requirement = card.target_type();
        let plan = match &card.kind {
            KindState::Creature(_) => PlayPlan::Creature,
            KindState::Runebinding(binding) => PlayPlan::Runebinding {
                effects: binding.effects.to_vec(),
                is_temporary: binding.is_temporary,
            },
            KindState::Instant(instant) => PlayPlan::Instant {
                effects: instant.effects.to_vec(),
            },
        };

        // Target legality comes before any mana is spent.
        let resolved_target = match requirement {
            Some(req) => {
                let caster = &self.players[player_id.index()];
                let opponent = &self.players[player_id.opponent().index()];
                match effects::validate_target(req, target, caster, opponent) {
                    Some(resolved) => Some(resolved),
                    None => {
                        self.bus.log("invalid target; card not played");
                        return false;
                    }
                }
            }
            None => None,
        };

        if !self.with_seat(player_id, |p, bus| p.spend_mana(cost, bus)) {
            return false;
        }

        let summary = CardSummary::of(self.players[player_id.index()].card(card_uid).expect("checked"));
        self.bus.emit(GameEvent::CardPlayed {
            player: player_id,
            card: summary,
            target_id: resolved_target,
        });

        let mut queue: VecDeque<PendingTrigger> = VecDeque::new();

        match plan {
            PlayPlan::Creature => {
                self.with_seat(player_id, |p, bus| p.move_card(card_uid, Zone::Battlefield, bus));
                let arrival = self.players[player_id.index()]
                    .card(card_uid)
                    .and_then(|c| c.creature())
                    .map(|c| c.triggers(shim::TriggerWhen::Enter))
                    .unwrap_or_default();
                queue.extend(arrival.into_iter().map(|effect| PendingTrigger {
                    controller: player_id,
                    source: card_uid,
                    effect,
                }));
            }

            PlayPlan::Runebinding {
                effects,
                is_temporary,
            } => {
                // Structured effects are authoritative; the shipped-card
                // per-id table is the fallback for legacy data.
                let effects = if effects.is_empty() {
                    shim::runebinding_fallback(def_id)
                        .map(|e| e.to_vec())
                        .unwrap_or_default()
                } else {
                    effects
                };
                let persists = is_temporary || binding_persists(&effects);
                if effects.is_empty() {
                    self.bus
                        .log(format!("{def_id} has no resolvable binding effect"));
                }
                for effect in &effects {
                    let effect_target =
                        effect.target_requirement.needs_target().then_some(target).flatten();
                    let result = self.apply_effect(player_id, effect, effect_target);
                    queue.extend(result.pending);
                    if let Some(pid) = result.deck_empty {
                        self.handle_deck_exhaustion(pid);
                    }
                }
                if let Some(binding) = self.players[player_id.index()]
                    .card_mut(card_uid)
                    .and_then(|c| c.runebinding_mut())
                {
                    binding.applied_to = resolved_target;
                }
                let destination = if persists { Zone::Battlefield } else { Zone::Graveyard };
                self.with_seat(player_id, |p, bus| p.move_card(card_uid, destination, bus));
            }

            PlayPlan::Instant { effects } => {
                for effect in &effects {
                    let effect_target =
                        effect.target_requirement.needs_target().then_some(target).flatten();
                    let result = self.apply_effect(player_id, effect, effect_target);
                    queue.extend(result.pending);
                    if let Some(pid) = result.deck_empty {
                        self.handle_deck_exhaustion(pid);
                    }
                }
                // One resolution attempt, then the graveyard, no matter
                // how the effects fared.
                self.with_seat(player_id, |p, bus| p.move_card(card_uid, Zone::Graveyard, bus));
            }
        }

        self.drain_triggers(queue);
        self.check_life_totals();
        true
    }

    /// Discard a card for +1 max mana, at most once per turn.
    pub fn discard_for_mana(&mut self, player_id: PlayerId, card: InstanceId) -> bool {
        if !self.state.is_playing() || self.state.current_player() != player_id {
            self.bus.log("cannot discard for mana now");
            return false;
        }
        let ok = self.with_seat(player_id, |p, bus| p.discard_card_for_mana(card, bus));
        if !ok {
            self.bus.log("discard for mana rejected");
        }
        ok
    }

    // === Combat entry points ===

    /// Declare the acting player's attackers. The only external path into
    /// the combat state machine besides block confirmation.
    pub fn confirm_attack_declaration(
        &mut self,
        player_id: PlayerId,
        attackers: &[InstanceId],
    ) -> bool {
        if !self.state.is_playing()
            || self.turn.phase() != Phase::Attack
            || player_id != self.state.current_player()
        {
            self.bus.log("attack declaration rejected: wrong phase or turn");
            return false;
        }
        let (attacker_side, defender) = split_pair(&mut self.players, player_id);
        match self
            .combat
            .declare_attackers(attacker_side, defender, attackers, &mut self.bus)
        {
            AttackDeclaration::Rejected => false,
            AttackDeclaration::AwaitingBlockers => true,
            AttackDeclaration::Resolved(outcome) => {
                self.finish_combat(outcome);
                true
            }
        }
    }

    /// Declare the defender's blocker assignments; resolves combat.
    pub fn confirm_block_declaration(
        &mut self,
        player_id: PlayerId,
        assignments: &[(InstanceId, Vec<InstanceId>)],
    ) -> bool {
        if !self.state.is_playing()
            || self.turn.phase() != Phase::Attack
            || player_id != self.state.current_player().opponent()
        {
            self.bus.log("block declaration rejected: wrong phase or seat");
            return false;
        }
        let attacker_id = self.state.current_player();
        let (attacker_side, defender) = split_pair(&mut self.players, attacker_id);
        match self
            .combat
            .declare_blockers(attacker_side, defender, assignments, &mut self.bus)
        {
            Some(outcome) => {
                self.finish_combat(outcome);
                true
            }
            None => false,
        }
    }

    fn finish_combat(&mut self, outcome: CombatOutcome) {
        self.drain_triggers(outcome.pending_triggers.into());
        self.check_life_totals();
    }

    // === Effect funnel ===

    fn apply_effect(
        &mut self,
        caster: PlayerId,
        effect: &EffectDef,
        target: Option<TargetRef>,
    ) -> ResolveResult {
        let (caster_side, opponent) = split_pair(&mut self.players, caster);
        let mut ctx = effects::ResolverCtx {
            caster: caster_side,
            opponent,
            bus: &mut self.bus,
        };
        effects::resolve(effect, target, &mut ctx)
    }

    fn drain_triggers(&mut self, mut queue: VecDeque<PendingTrigger>) {
        let mut drained = 0;
        while let Some(trigger) = queue.pop_front() {
            if self.state.is_over() {
                break;
            }
            drained += 1;
            if drained > TRIGGER_CHAIN_LIMIT {
                warn!("trigger chain exceeded {TRIGGER_CHAIN_LIMIT}; truncating");
                self.bus.log("trigger chain truncated");
                break;
            }
            let result = self.apply_effect(trigger.controller, &trigger.effect, None);
            queue.extend(result.pending);
            if let Some(pid) = result.deck_empty {
                self.handle_deck_exhaustion(pid);
            }
        }
    }

    // === Termination ===

    fn handle_deck_exhaustion(&mut self, player_id: PlayerId) {
        self.bus.emit(GameEvent::DeckEmpty { player_id });
        self.bus.log(format!(
            "{} has no cards left to draw",
            self.players[player_id.index()].name()
        ));
        self.game_over(player_id.opponent());
    }

    fn check_life_totals(&mut self) {
        if self.state.is_over() {
            return;
        }
        for id in PlayerId::both() {
            if self.players[id.index()].life() <= 0 {
                self.game_over(id.opponent());
                return;
            }
        }
    }

    /// One-way terminal transition. Idempotent once reached.
    pub fn game_over(&mut self, winner: PlayerId) {
        if self.state.is_over() {
            return;
        }
        self.state.finish(winner);
        self.combat.reset();
        for slot in &mut self.slots {
            slot.cancel();
        }
        let loser = winner.opponent();
        self.bus.emit(GameEvent::GameOver {
            winner_id: winner,
            winner_name: self.players[winner.index()].name().to_string(),
            loser_id: loser,
            loser_name: self.players[loser.index()].name().to_string(),
        });
    }

    // === Zone bridge ===

    /// Move a card between a player's zones. Emits `cardMoved`.
    pub fn move_card_to_zone(&mut self, player_id: PlayerId, card: InstanceId, zone: Zone) -> bool {
        if self.state.is_over() || self.players.len() < 2 {
            return false;
        }
        self.with_seat(player_id, |p, bus| p.move_card(card, zone, bus))
    }

    // === Internals ===

    fn with_seat<R>(&mut self, id: PlayerId, f: impl FnOnce(&mut Player, &mut EventBus) -> R) -> R {
        let player = &mut self.players[id.index()];
        f(player, &mut self.bus)
    }
}
