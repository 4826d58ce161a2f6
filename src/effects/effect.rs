//! Structured effect definitions.
//!
//! Effects are the atomic actions cards perform: deal damage, draw cards,
//! boost a creature, apply a status. Instant cards carry an ordered list of
//! these; Runebindings and creature triggers resolve to the same vocabulary
//! so everything funnels through one resolver.
//!
//! The serialized field and variant names match the card-definition input
//! format (`{type, value, targetRequirement}`).

use serde::{Deserialize, Serialize};

use crate::core::{InstanceId, PlayerId};

/// Named creature statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Cancels the next damage instance, then is consumed.
    Shielded,
    /// Cancels all damage while present.
    PreventDamage,
    CantAttack,
    CantBlock,
    /// Suppresses attacking and triggered abilities.
    Silenced,
}

impl StatusKind {
    /// The snake_case spelling used in definitions and events.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            StatusKind::Shielded => "shielded",
            StatusKind::PreventDamage => "prevent_damage",
            StatusKind::CantAttack => "cant_attack",
            StatusKind::CantBlock => "cant_block",
            StatusKind::Silenced => "silenced",
        }
    }

    /// Parse a definition-side spelling.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "shielded" => Some(StatusKind::Shielded),
            "prevent_damage" => Some(StatusKind::PreventDamage),
            "cant_attack" => Some(StatusKind::CantAttack),
            "cant_block" => Some(StatusKind::CantBlock),
            "silenced" => Some(StatusKind::Silenced),
            _ => None,
        }
    }
}

/// What an effect must be aimed at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetRequirement {
    /// No target; the effect knows its subject (e.g. "draw 2 cards").
    #[default]
    None,
    /// Any living battlefield creature.
    Creature,
    /// A living battlefield creature controlled by the caster.
    FriendlyCreature,
    /// A living battlefield creature controlled by the opponent.
    EnemyCreature,
    /// Either player.
    Player,
    /// The opposing player.
    EnemyPlayer,
    /// Any creature or player.
    Any,
}

impl TargetRequirement {
    /// Does this requirement demand an explicit target from the caster?
    #[must_use]
    pub fn needs_target(self) -> bool {
        !matches!(self, TargetRequirement::None)
    }
}

/// A resolved target: a card copy or a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum TargetRef {
    Player(PlayerId),
    Card(InstanceId),
}

impl TargetRef {
    /// The card id, if this targets a card.
    #[must_use]
    pub fn card(self) -> Option<InstanceId> {
        match self {
            TargetRef::Card(id) => Some(id),
            TargetRef::Player(_) => None,
        }
    }

    /// The player id, if this targets a player.
    #[must_use]
    pub fn player(self) -> Option<PlayerId> {
        match self {
            TargetRef::Player(id) => Some(id),
            TargetRef::Card(_) => None,
        }
    }
}

/// The kind of an atomic effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectKind {
    /// Deal `value` damage to the target creature or player.
    DealDamage,
    /// Heal `value` on the target (creature toughness or player life).
    Heal,
    /// The caster draws `value` cards.
    DrawCards,
    /// Temporarily raise the target creature's attack by `value`.
    BoostAttack,
    /// Temporarily raise the target creature's toughness by `value`.
    BoostToughness,
    /// Apply `status` to the target creature for `duration` turns.
    ApplyStatus,
    /// Destroy the target creature outright.
    DestroyCreature,
}

impl EffectKind {
    /// Whether this kind acts on a target at all (everything except the
    /// caster-subject draw).
    #[must_use]
    pub fn wants_target(self) -> bool {
        !matches!(self, EffectKind::DrawCards)
    }
}

/// One structured effect definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectDef {
    /// What the effect does.
    #[serde(rename = "type")]
    pub kind: EffectKind,

    /// Magnitude (damage, heal, cards, boost amount). Unused by
    /// `ApplyStatus`/`DestroyCreature`.
    #[serde(default)]
    pub value: i32,

    /// What the effect must be aimed at.
    #[serde(default)]
    pub target_requirement: TargetRequirement,

    /// Status to apply, for `ApplyStatus`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusKind>,

    /// Turns a boost or status lasts. `-1` (or absent for statuses)
    /// means permanent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
}

impl EffectDef {
    /// Deal damage to whatever the requirement selects.
    #[must_use]
    pub fn deal_damage(value: i32, target: TargetRequirement) -> Self {
        Self {
            kind: EffectKind::DealDamage,
            value,
            target_requirement: target,
            status: None,
            duration: None,
        }
    }

    /// Heal the selected target.
    #[must_use]
    pub fn heal(value: i32, target: TargetRequirement) -> Self {
        Self {
            kind: EffectKind::Heal,
            value,
            target_requirement: target,
            status: None,
            duration: None,
        }
    }

    /// The caster draws cards.
    #[must_use]
    pub fn draw_cards(value: i32) -> Self {
        Self {
            kind: EffectKind::DrawCards,
            value,
            target_requirement: TargetRequirement::None,
            status: None,
            duration: None,
        }
    }

    /// Temporary attack boost.
    #[must_use]
    pub fn boost_attack(value: i32, duration: i32, target: TargetRequirement) -> Self {
        Self {
            kind: EffectKind::BoostAttack,
            value,
            target_requirement: target,
            status: None,
            duration: Some(duration),
        }
    }

    /// Temporary toughness boost.
    #[must_use]
    pub fn boost_toughness(value: i32, duration: i32, target: TargetRequirement) -> Self {
        Self {
            kind: EffectKind::BoostToughness,
            value,
            target_requirement: target,
            status: None,
            duration: Some(duration),
        }
    }

    /// Apply a status for a number of turns (`-1` = permanent).
    #[must_use]
    pub fn apply_status(status: StatusKind, duration: i32, target: TargetRequirement) -> Self {
        Self {
            kind: EffectKind::ApplyStatus,
            value: 0,
            target_requirement: target,
            status: Some(status),
            duration: Some(duration),
        }
    }

    /// Destroy a creature.
    #[must_use]
    pub fn destroy(target: TargetRequirement) -> Self {
        Self {
            kind: EffectKind::DestroyCreature,
            value: 0,
            target_requirement: target,
            status: None,
            duration: None,
        }
    }
}
