//! Generic effect resolution.
//!
//! Every structured effect in the game funnels through [`resolve`]:
//! Instant effect lists, Runebinding applications, and creature
//! entry/death triggers. The resolver checks target legality against the
//! effect's declared requirement (a creature-targeting effect needs a
//! living battlefield creature, a player-targeting effect a player) and
//! fails closed on anything else.
//!
//! Deaths caused here don't recurse: their triggers bubble up as
//! [`PendingTrigger`]s for the orchestrator to drain, which bounds
//! trigger chains explicitly.

use tracing::debug;

use super::effect::{EffectDef, EffectKind, TargetRef, TargetRequirement};
use crate::cards::TempBoost;
use crate::combat::PendingTrigger;
use crate::core::{InstanceId, PlayerId};
use crate::events::{CreatureUpdates, EventBus, GameEvent};
use crate::player::{CreatureDamage, Player};
use crate::zones::Zone;

/// Mutable context the resolver works against: the casting side, the
/// opposing side, and the event bus.
pub struct ResolverCtx<'a> {
    pub caster: &'a mut Player,
    pub opponent: &'a mut Player,
    pub bus: &'a mut EventBus,
}

impl ResolverCtx<'_> {
    fn side_of_creature(&self, uid: InstanceId) -> Option<Side> {
        side_of(self.caster, self.opponent, uid)
    }

    fn side_id(&self, side: Side) -> PlayerId {
        match side {
            Side::Caster => self.caster.id(),
            Side::Opponent => self.opponent.id(),
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut Player {
        match side {
            Side::Caster => self.caster,
            Side::Opponent => self.opponent,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Caster,
    Opponent,
}

/// What resolving one effect produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveResult {
    /// Did the effect apply? `false` means it was rejected fail-closed.
    pub applied: bool,
    /// Death triggers raised by this effect, for the orchestrator.
    pub pending: Vec<PendingTrigger>,
    /// Set when a draw effect hit an empty deck; deck exhaustion is a
    /// game-rule outcome the orchestrator decides.
    pub deck_empty: Option<PlayerId>,
}

impl ResolveResult {
    fn rejected() -> Self {
        Self::default()
    }

    fn applied() -> Self {
        Self {
            applied: true,
            ..Self::default()
        }
    }
}

fn side_of(caster: &Player, opponent: &Player, uid: InstanceId) -> Option<Side> {
    if caster.zones().contains(Zone::Battlefield, uid) {
        Some(Side::Caster)
    } else if opponent.zones().contains(Zone::Battlefield, uid) {
        Some(Side::Opponent)
    } else {
        None
    }
}

/// Check a supplied target against an effect's requirement, filling
/// defaults where the requirement implies one (enemy player → opponent,
/// bare player → caster).
///
/// Returns the resolved target, or `None` when the supplied target is
/// illegal for the requirement. Also used by the orchestrator to validate
/// targets *before* any mana is spent.
#[must_use]
pub fn validate_target(
    requirement: TargetRequirement,
    target: Option<TargetRef>,
    caster: &Player,
    opponent: &Player,
) -> Option<TargetRef> {
    match requirement {
        TargetRequirement::None => Some(TargetRef::Player(caster.id())),
        TargetRequirement::Creature => {
            let uid = target?.card()?;
            side_of(caster, opponent, uid).map(|_| TargetRef::Card(uid))
        }
        TargetRequirement::FriendlyCreature => {
            let uid = target?.card()?;
            (side_of(caster, opponent, uid) == Some(Side::Caster)).then_some(TargetRef::Card(uid))
        }
        TargetRequirement::EnemyCreature => {
            let uid = target?.card()?;
            (side_of(caster, opponent, uid) == Some(Side::Opponent)).then_some(TargetRef::Card(uid))
        }
        TargetRequirement::Player => match target {
            Some(TargetRef::Player(id)) if id == caster.id() || id == opponent.id() => {
                Some(TargetRef::Player(id))
            }
            None => Some(TargetRef::Player(caster.id())),
            _ => None,
        },
        TargetRequirement::EnemyPlayer => match target {
            Some(TargetRef::Player(id)) if id == opponent.id() => Some(TargetRef::Player(id)),
            None => Some(TargetRef::Player(opponent.id())),
            _ => None,
        },
        TargetRequirement::Any => match target {
            Some(TargetRef::Card(uid)) => {
                side_of(caster, opponent, uid).map(|_| TargetRef::Card(uid))
            }
            Some(TargetRef::Player(id)) if id == caster.id() || id == opponent.id() => {
                Some(TargetRef::Player(id))
            }
            _ => None,
        },
    }
}

/// Resolve one effect for the caster against an optional target.
pub fn resolve(effect: &EffectDef, target: Option<TargetRef>, ctx: &mut ResolverCtx) -> ResolveResult {
    let Some(resolved) =
        validate_target(effect.target_requirement, target, ctx.caster, ctx.opponent)
    else {
        debug!(kind = ?effect.kind, ?target, "effect target rejected");
        ctx.bus.log("effect fizzled: invalid target");
        return ResolveResult::rejected();
    };

    match effect.kind {
        EffectKind::DealDamage => match resolved {
            TargetRef::Player(id) => {
                if id == ctx.caster.id() {
                    ctx.caster.take_damage(effect.value, ctx.bus);
                } else {
                    ctx.opponent.take_damage(effect.value, ctx.bus);
                }
                ResolveResult::applied()
            }
            TargetRef::Card(uid) => {
                let side = ctx.side_of_creature(uid).expect("validated above");
                let controller = ctx.side_id(side);
                let damage = match side {
                    Side::Caster => ctx.caster.damage_creature(uid, effect.value, ctx.bus),
                    Side::Opponent => ctx.opponent.damage_creature(uid, effect.value, ctx.bus),
                };
                let mut result = ResolveResult::applied();
                if let CreatureDamage::Died { death_effects } = damage {
                    result.pending = death_effects
                        .into_iter()
                        .map(|effect| PendingTrigger {
                            controller,
                            source: uid,
                            effect,
                        })
                        .collect();
                }
                result
            }
        },

        EffectKind::Heal => match resolved {
            TargetRef::Player(id) => {
                if id == ctx.caster.id() {
                    ctx.caster.heal(effect.value, ctx.bus);
                } else {
                    ctx.opponent.heal(effect.value, ctx.bus);
                }
                ResolveResult::applied()
            }
            TargetRef::Card(uid) => {
                let side = ctx.side_of_creature(uid).expect("validated above");
                let ok = match side {
                    Side::Caster => ctx.caster.heal_creature(uid, effect.value, ctx.bus),
                    Side::Opponent => ctx.opponent.heal_creature(uid, effect.value, ctx.bus),
                };
                if ok {
                    ResolveResult::applied()
                } else {
                    ResolveResult::rejected()
                }
            }
        },

        EffectKind::DrawCards => {
            let mut result = ResolveResult::applied();
            for _ in 0..effect.value.max(0) {
                if ctx.caster.draw_card(ctx.bus).is_none() {
                    result.deck_empty = Some(ctx.caster.id());
                    break;
                }
            }
            result
        }

        EffectKind::BoostAttack | EffectKind::BoostToughness => {
            let Some(uid) = resolved.card() else {
                return ResolveResult::rejected();
            };
            let side = ctx.side_of_creature(uid).expect("validated above");
            let boost = match effect.kind {
                EffectKind::BoostAttack => TempBoost {
                    attack: effect.value,
                    toughness: 0,
                    turns: effect.duration.unwrap_or(-1),
                },
                _ => TempBoost {
                    attack: 0,
                    toughness: effect.value,
                    turns: effect.duration.unwrap_or(-1),
                },
            };
            let player = ctx.side_mut(side);
            let Some(creature) = player.card_mut(uid).and_then(|c| c.creature_mut()) else {
                return ResolveResult::rejected();
            };
            creature.add_boost(boost);
            let updates = CreatureUpdates {
                attack: Some(creature.attack()),
                current_toughness: Some(creature.current_toughness),
                max_toughness: Some(creature.max_toughness()),
                ..CreatureUpdates::default()
            };
            ctx.bus.emit(GameEvent::CreatureUpdate {
                card_unique_id: uid,
                updates,
            });
            ResolveResult::applied()
        }

        EffectKind::ApplyStatus => {
            let Some(status) = effect.status else {
                ctx.bus.log("applyStatus effect missing its status");
                return ResolveResult::rejected();
            };
            let Some(uid) = resolved.card() else {
                return ResolveResult::rejected();
            };
            let side = ctx.side_of_creature(uid).expect("validated above");
            let player = ctx.side_mut(side);
            let Some(creature) = player.card_mut(uid).and_then(|c| c.creature_mut()) else {
                return ResolveResult::rejected();
            };
            creature.apply_status(status, effect.duration.unwrap_or(-1));
            ctx.bus
                .log(format!("{uid} gains {}", status.name()));
            ResolveResult::applied()
        }

        EffectKind::DestroyCreature => {
            let Some(uid) = resolved.card() else {
                return ResolveResult::rejected();
            };
            let side = ctx.side_of_creature(uid).expect("validated above");
            let controller = ctx.side_id(side);
            let death_effects = match side {
                Side::Caster => ctx.caster.destroy_creature(uid, ctx.bus),
                Side::Opponent => ctx.opponent.destroy_creature(uid, ctx.bus),
            };
            match death_effects {
                Some(effects) => {
                    let mut result = ResolveResult::applied();
                    result.pending = effects
                        .into_iter()
                        .map(|effect| PendingTrigger {
                            controller,
                            source: uid,
                            effect,
                        })
                        .collect();
                    result
                }
                None => ResolveResult::rejected(),
            }
        }
    }
}
