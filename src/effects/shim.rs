//! Legacy keyword and per-id dispatch.
//!
//! Older card data expresses creature triggers and Runebinding effects as
//! free text instead of structured effect lists. This module keeps those
//! paths alive as compatibility shims:
//!
//! - creature ability strings are scanned for `arrival:`/`demise:` trigger
//!   keywords,
//! - Runebinding target types are derived by scanning effect text,
//! - a handful of shipped Runebinding ids resolve through a fixed per-id
//!   table.
//!
//! Structured effect lists always win when a definition carries them; the
//! shim is consulted only for cards that predate them. It is deliberately
//! simplistic and not meant to be extended.

use smallvec::{smallvec, SmallVec};

use super::effect::{EffectDef, StatusKind, TargetRequirement};
use crate::cards::DefId;

/// When a creature trigger fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerWhen {
    /// The creature entered the battlefield.
    Enter,
    /// The creature died.
    Death,
}

/// A trigger recovered from an ability string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordTrigger {
    pub when: TriggerWhen,
    pub effect: EffectDef,
}

/// First integer appearing in `text`, or 1 when none does.
fn leading_amount(text: &str) -> i32 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(1)
}

/// Effect recovered from trigger body text, if any keyword matches.
fn scan_trigger_body(body: &str) -> Option<EffectDef> {
    let amount = leading_amount(body);

    if body.contains("draw") {
        Some(EffectDef::draw_cards(amount))
    } else if body.contains("damage") {
        Some(EffectDef::deal_damage(amount, TargetRequirement::EnemyPlayer))
    } else if body.contains("heal") || body.contains("restore") {
        Some(EffectDef::heal(amount, TargetRequirement::Player))
    } else {
        None
    }
}

/// Recover entry/death triggers from a creature's ability strings.
///
/// Recognized shapes: `"arrival: <body>"` and `"demise: <body>"` where the
/// body contains one of the keywords `draw`, `damage`, `heal`/`restore`,
/// with the first number in the body as the amount. Anything else is
/// silently ignored.
#[must_use]
pub fn creature_triggers(abilities: &[String]) -> Vec<KeywordTrigger> {
    let mut triggers = Vec::new();

    for ability in abilities {
        let lowered = ability.to_lowercase();
        let Some((head, body)) = lowered.split_once(':') else {
            continue;
        };
        let when = match head.trim() {
            "arrival" => TriggerWhen::Enter,
            "demise" => TriggerWhen::Death,
            _ => continue,
        };
        if let Some(effect) = scan_trigger_body(body) {
            triggers.push(KeywordTrigger { when, effect });
        }
    }

    triggers
}

/// Derive a Runebinding's target type by scanning its effect text.
///
/// Only used when the definition does not declare a target type explicitly.
#[must_use]
pub fn runebinding_target_from_text(text: &str) -> TargetRequirement {
    let lowered = text.to_lowercase();

    if lowered.contains("enemy creature") {
        TargetRequirement::EnemyCreature
    } else if lowered.contains("friendly creature") || lowered.contains("your creature") {
        TargetRequirement::FriendlyCreature
    } else if lowered.contains("creature") {
        TargetRequirement::Creature
    } else if lowered.contains("enemy player") || lowered.contains("opponent") {
        TargetRequirement::EnemyPlayer
    } else if lowered.contains("player") {
        TargetRequirement::Player
    } else {
        TargetRequirement::None
    }
}

// Shipped Runebinding ids still resolved through the per-id table.
pub const SIGIL_OF_VIGOR: DefId = DefId(2001);
pub const WARDING_RUNE: DefId = DefId(2002);
pub const BINDING_CHAINS: DefId = DefId(2003);
pub const RUNE_OF_RENEWAL: DefId = DefId(2004);

/// Per-id effect table for Runebindings without structured effect lists.
///
/// Returns `None` for unknown ids; callers then fail the play closed.
#[must_use]
pub fn runebinding_fallback(def: DefId) -> Option<SmallVec<[EffectDef; 2]>> {
    match def {
        SIGIL_OF_VIGOR => Some(smallvec![
            EffectDef::boost_attack(2, -1, TargetRequirement::FriendlyCreature),
        ]),
        WARDING_RUNE => Some(smallvec![EffectDef::apply_status(
            StatusKind::Shielded,
            -1,
            TargetRequirement::FriendlyCreature,
        )]),
        BINDING_CHAINS => Some(smallvec![EffectDef::apply_status(
            StatusKind::CantAttack,
            -1,
            TargetRequirement::EnemyCreature,
        )]),
        RUNE_OF_RENEWAL => Some(smallvec![EffectDef::heal(
            2,
            TargetRequirement::FriendlyCreature,
        )]),
        _ => None,
    }
}
