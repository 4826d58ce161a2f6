//! Controllers and the command mailbox.
//!
//! The engine is single-threaded and cooperative. Controller intent
//! (human input or the automated opponent's decisions) is modeled as a
//! **single-slot, cancelable mailbox** per seat: scheduling a new command
//! replaces a stale pending one, and the engine applies at most one
//! command at a time, re-validating its preconditions at apply time —
//! a queued intent whose window has passed simply fails closed. Timing is
//! cosmetic and carries no correctness meaning, so there are no timers
//! here, only the queue discipline.
//!
//! [`AutoController`] decides for an automated seat using nothing but the
//! engine's public operations and views: act on its own turn, or respond
//! as defender during the opponent's attack.

use serde::{Deserialize, Serialize};

use crate::cards::KindState;
use crate::combat::CombatPhase;
use crate::core::{InstanceId, Lifecycle, Phase, PlayerId};
use crate::effects::{EffectKind, TargetRef, TargetRequirement};
use crate::game::Game;
use crate::player::MANA_CAP;
use crate::zones::Zone;

/// One intent from a controller, applied by the engine as a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    PlayCard {
        player: PlayerId,
        card: InstanceId,
        target: Option<TargetRef>,
    },
    DiscardForMana {
        player: PlayerId,
        card: InstanceId,
    },
    DeclareAttackers {
        player: PlayerId,
        attackers: Vec<InstanceId>,
    },
    DeclareBlockers {
        player: PlayerId,
        assignments: Vec<(InstanceId, Vec<InstanceId>)>,
    },
    PassPhase {
        player: PlayerId,
    },
    EndTurn {
        player: PlayerId,
    },
    ResolveDiscard {
        player: PlayerId,
        card: InstanceId,
    },
}

impl Command {
    /// The seat issuing this command.
    #[must_use]
    pub fn player(&self) -> PlayerId {
        match self {
            Command::PlayCard { player, .. }
            | Command::DiscardForMana { player, .. }
            | Command::DeclareAttackers { player, .. }
            | Command::DeclareBlockers { player, .. }
            | Command::PassPhase { player }
            | Command::EndTurn { player }
            | Command::ResolveDiscard { player, .. } => *player,
        }
    }
}

/// Single-slot command mailbox.
///
/// Holds at most one pending command. Scheduling replaces (cancels) any
/// stale pending command; cancellation is safe even if the slot already
/// drained.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CommandSlot {
    pending: Option<Command>,
}

impl CommandSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a command, replacing any stale pending one.
    ///
    /// Returns the command that was displaced, if any.
    pub fn schedule(&mut self, command: Command) -> Option<Command> {
        self.pending.replace(command)
    }

    /// Cancel the pending command. No-op when nothing is pending.
    pub fn cancel(&mut self) -> Option<Command> {
        self.pending.take()
    }

    /// Drain the pending command for execution.
    pub fn take(&mut self) -> Option<Command> {
        self.pending.take()
    }

    /// Is a command waiting?
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Decision logic for an automated seat.
///
/// Stateless: every decision is computed fresh from the current public
/// state, so a decision applied late is either still valid or rejected by
/// the operation's own precondition checks.
pub struct AutoController;

impl AutoController {
    /// Decide the automated seat's next command, if it can act right now.
    #[must_use]
    pub fn decide(game: &Game, seat: PlayerId) -> Option<Command> {
        match game.lifecycle() {
            Lifecycle::Discarding => Self::decide_discard(game, seat),
            Lifecycle::Playing => {
                if game.combat().phase() == CombatPhase::DeclareBlockers
                    && game.combat().attacking_player() == Some(seat.opponent())
                {
                    return Self::decide_blocks(game, seat);
                }
                if game.view().is_turn_of(seat) {
                    Self::decide_own_turn(game, seat)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn decide_discard(game: &Game, seat: PlayerId) -> Option<Command> {
        let pending = game.pending_discard()?;
        if pending.player_id != seat {
            return None;
        }
        let player = game.player(seat)?;
        // Discard the most expensive card; it is the least likely to be
        // castable soon.
        let card = player
            .zones()
            .cards(Zone::Hand)
            .iter()
            .filter_map(|&uid| player.card(uid))
            .max_by_key(|c| c.cost)
            .map(|c| c.uid)?;
        Some(Command::ResolveDiscard { player: seat, card })
    }

    fn decide_blocks(game: &Game, seat: PlayerId) -> Option<Command> {
        let defender = game.player(seat)?;
        let attacker_side = game.player(seat.opponent())?;

        // Biggest attackers first, cheapest blockers first, one each.
        let mut attackers: Vec<InstanceId> = game.combat().attackers().to_vec();
        attackers.sort_by_key(|&uid| {
            std::cmp::Reverse(
                attacker_side
                    .card(uid)
                    .and_then(|c| c.creature())
                    .map_or(0, |c| c.attack()),
            )
        });

        let mut blockers: Vec<InstanceId> = defender
            .battlefield_creatures()
            .filter(|c| c.can_block())
            .map(|c| c.uid)
            .collect();
        blockers.sort_by_key(|&uid| {
            defender
                .card(uid)
                .and_then(|c| c.creature())
                .map_or(0, |c| c.attack())
        });

        let assignments: Vec<(InstanceId, Vec<InstanceId>)> = attackers
            .into_iter()
            .zip(blockers)
            .map(|(attacker, blocker)| (attacker, vec![blocker]))
            .collect();

        Some(Command::DeclareBlockers {
            player: seat,
            assignments,
        })
    }

    fn decide_own_turn(game: &Game, seat: PlayerId) -> Option<Command> {
        match game.current_phase() {
            Phase::Main => Self::decide_main(game, seat),
            Phase::Attack if game.combat().phase() == CombatPhase::None => {
                let player = game.player(seat)?;
                let attackers: Vec<InstanceId> = player
                    .battlefield_creatures()
                    .filter(|c| c.can_attack())
                    .map(|c| c.uid)
                    .collect();
                if attackers.is_empty() {
                    Some(Command::PassPhase { player: seat })
                } else {
                    Some(Command::DeclareAttackers {
                        player: seat,
                        attackers,
                    })
                }
            }
            _ => Some(Command::PassPhase { player: seat }),
        }
    }

    fn decide_main(game: &Game, seat: PlayerId) -> Option<Command> {
        let player = game.player(seat)?;
        let view = game.view();

        // Grow the mana curve once per turn while anything in hand is
        // unaffordable (or the curve hasn't started).
        if !player.has_discarded_for_mana()
            && player.max_mana() < MANA_CAP
            && !player.zones().is_empty(Zone::Hand)
        {
            let unaffordable = player
                .zones()
                .cards(Zone::Hand)
                .iter()
                .filter_map(|&uid| player.card(uid))
                .filter(|c| c.cost > player.max_mana())
                .max_by_key(|c| c.cost)
                .map(|c| c.uid);
            let fallback = (player.max_mana() == 0)
                .then(|| player.zones().cards(Zone::Hand).first().copied())
                .flatten();
            if let Some(card) = unaffordable.or(fallback) {
                return Some(Command::DiscardForMana { player: seat, card });
            }
        }

        // Play the first playable card a legal target can be found for.
        for &uid in player.zones().cards(Zone::Hand) {
            let Some(card) = player.card(uid) else {
                continue;
            };
            if !card.can_play(&view, player.mana()) {
                continue;
            }
            match card.target_type() {
                None => {
                    return Some(Command::PlayCard {
                        player: seat,
                        card: uid,
                        target: None,
                    })
                }
                Some(requirement) => {
                    if let Some(target) = Self::pick_target(game, seat, card, requirement) {
                        return Some(Command::PlayCard {
                            player: seat,
                            card: uid,
                            target: Some(target),
                        });
                    }
                }
            }
        }

        Some(Command::PassPhase { player: seat })
    }

    fn pick_target(
        game: &Game,
        seat: PlayerId,
        card: &crate::cards::CardInstance,
        requirement: TargetRequirement,
    ) -> Option<TargetRef> {
        let player = game.player(seat)?;
        let opponent = game.player(seat.opponent())?;
        let own_creature = || player.battlefield_creatures().next().map(|c| c.uid);
        let enemy_creature = || opponent.battlefield_creatures().next().map(|c| c.uid);

        match requirement {
            TargetRequirement::None => None,
            TargetRequirement::EnemyCreature => enemy_creature().map(TargetRef::Card),
            TargetRequirement::FriendlyCreature => own_creature().map(TargetRef::Card),
            TargetRequirement::Creature => {
                // Aim harm at the enemy, help at ourselves.
                if Self::is_harmful(card) {
                    enemy_creature().or_else(own_creature).map(TargetRef::Card)
                } else {
                    own_creature().or_else(enemy_creature).map(TargetRef::Card)
                }
            }
            TargetRequirement::EnemyPlayer => Some(TargetRef::Player(seat.opponent())),
            TargetRequirement::Player => {
                if Self::is_harmful(card) {
                    Some(TargetRef::Player(seat.opponent()))
                } else {
                    Some(TargetRef::Player(seat))
                }
            }
            TargetRequirement::Any => {
                if Self::is_harmful(card) {
                    enemy_creature()
                        .map(TargetRef::Card)
                        .or(Some(TargetRef::Player(seat.opponent())))
                } else {
                    own_creature().map(TargetRef::Card).or(Some(TargetRef::Player(seat)))
                }
            }
        }
    }

    /// Does the card's first targeted effect hurt its target?
    fn is_harmful(card: &crate::cards::CardInstance) -> bool {
        let effects = match &card.kind {
            KindState::Instant(i) => &i.effects,
            KindState::Runebinding(r) => &r.effects,
            KindState::Creature(_) => return false,
        };
        effects
            .iter()
            .find(|e| e.target_requirement.needs_target())
            .is_some_and(|e| {
                matches!(
                    e.kind,
                    EffectKind::DealDamage | EffectKind::DestroyCreature | EffectKind::ApplyStatus
                )
            })
    }
}
