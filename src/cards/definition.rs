//! Card definitions: static, per-card-type data.
//!
//! Definitions arrive from the collection layer as [`CardSpec`] records
//! (the raw input format, one flat record with optional per-type fields)
//! and are validated into typed [`CardDefinition`]s at registry load. The
//! engine never works with unvalidated specs: a spec missing what its card
//! type requires is a construction-time error, not a runtime one.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::effects::shim::{self, KeywordTrigger};
use crate::effects::{EffectDef, TargetRequirement};

/// Identifier for a card definition. Shared by every copy of that card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefId(pub u32);

impl DefId {
    /// Create a definition ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for DefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Def({})", self.0)
    }
}

/// The three card types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Creature,
    Runebinding,
    Instant,
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CardType::Creature => "Creature",
            CardType::Runebinding => "Runebinding",
            CardType::Instant => "Instant",
        };
        f.write_str(s)
    }
}

/// Raw card-definition input, as supplied by the collection layer.
///
/// One flat record; which optional fields matter depends on `type`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardSpec {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub cost: u8,
    #[serde(default)]
    pub image_src: Option<String>,
    #[serde(default)]
    pub description: Option<String>,

    // Creature fields
    #[serde(default)]
    pub attack: Option<i32>,
    #[serde(default)]
    pub toughness: Option<i32>,
    #[serde(default)]
    pub tribe: Option<String>,
    #[serde(default)]
    pub abilities: Vec<String>,

    // Runebinding / Instant fields
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default, rename = "targetType")]
    pub target_type: Option<TargetRequirement>,
    #[serde(default, rename = "isTemporary")]
    pub is_temporary: Option<bool>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub effects: Vec<EffectDef>,
}

/// Construction-time definition errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("card {0} has an empty name")]
    EmptyName(DefId),
    #[error("creature {0} is missing attack/toughness")]
    MissingCombatStats(DefId),
    #[error("creature {0} has non-positive toughness {1}")]
    NonPositiveToughness(DefId, i32),
    #[error("instant {0} has neither structured effects nor effect text")]
    InstantWithoutEffects(DefId),
    #[error("runebinding {0} has no structured effects, no effect text, and no fallback entry")]
    RunebindingWithoutEffects(DefId),
    #[error("duplicate definition id {0}")]
    Duplicate(DefId),
}

/// Creature-specific definition data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatureDef {
    pub attack: i32,
    pub toughness: i32,
    pub tribe: Option<String>,
    pub abilities: Vec<String>,
}

impl CreatureDef {
    /// Entry/death triggers recovered from the ability strings.
    #[must_use]
    pub fn triggers(&self) -> Vec<KeywordTrigger> {
        shim::creature_triggers(&self.abilities)
    }
}

/// Runebinding-specific definition data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunebindingDef {
    /// Legacy effect text, kept for the keyword shims.
    pub effect_text: Option<String>,
    /// What the binding must be aimed at.
    pub target: TargetRequirement,
    /// Temporary bindings tick down and self-remove.
    pub is_temporary: bool,
    /// Initial duration counters for temporary bindings.
    pub duration: Option<u32>,
    /// Structured effects. Empty means the per-id fallback table applies.
    pub effects: SmallVec<[EffectDef; 2]>,
}

/// Instant-specific definition data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstantDef {
    /// Ordered structured effects, resolved in sequence.
    pub effects: SmallVec<[EffectDef; 2]>,
}

/// Per-type definition payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DefKind {
    Creature(CreatureDef),
    Runebinding(RunebindingDef),
    Instant(InstantDef),
}

/// A validated card definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardDefinition {
    pub id: DefId,
    pub name: String,
    pub cost: u8,
    pub description: Option<String>,
    pub image_src: Option<String>,
    pub kind: DefKind,
}

impl CardDefinition {
    /// Validate a raw spec into a typed definition.
    pub fn from_spec(spec: CardSpec) -> Result<Self, DefinitionError> {
        let id = DefId::new(spec.id);
        if spec.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName(id));
        }

        let kind = match spec.card_type {
            CardType::Creature => {
                let (Some(attack), Some(toughness)) = (spec.attack, spec.toughness) else {
                    return Err(DefinitionError::MissingCombatStats(id));
                };
                if toughness <= 0 {
                    return Err(DefinitionError::NonPositiveToughness(id, toughness));
                }
                DefKind::Creature(CreatureDef {
                    attack: attack.max(0),
                    toughness,
                    tribe: spec.tribe,
                    abilities: spec.abilities,
                })
            }
            CardType::Runebinding => {
                let effects: SmallVec<[EffectDef; 2]> = spec.effects.into_iter().collect();
                if effects.is_empty()
                    && spec.effect.is_none()
                    && shim::runebinding_fallback(id).is_none()
                {
                    return Err(DefinitionError::RunebindingWithoutEffects(id));
                }
                // Explicit declaration wins; otherwise derive from the
                // effect text via the keyword shim.
                let target = spec.target_type.unwrap_or_else(|| {
                    spec.effect
                        .as_deref()
                        .map(shim::runebinding_target_from_text)
                        .unwrap_or(TargetRequirement::None)
                });
                DefKind::Runebinding(RunebindingDef {
                    effect_text: spec.effect,
                    target,
                    is_temporary: spec.is_temporary.unwrap_or(false),
                    duration: spec.duration,
                    effects,
                })
            }
            CardType::Instant => {
                let mut effects: SmallVec<[EffectDef; 2]> = spec.effects.into_iter().collect();
                if effects.is_empty() {
                    return Err(DefinitionError::InstantWithoutEffects(id));
                }
                // Structured effects are authoritative. The text scan only
                // fills a target requirement a structured entry omitted.
                if let Some(text) = spec.effect.as_deref() {
                    let derived = shim::runebinding_target_from_text(text);
                    for effect in &mut effects {
                        if effect.target_requirement == TargetRequirement::None
                            && effect.kind.wants_target()
                            && derived != TargetRequirement::None
                        {
                            effect.target_requirement = derived;
                        }
                    }
                }
                DefKind::Instant(InstantDef { effects })
            }
        };

        Ok(Self {
            id,
            name: spec.name,
            cost: spec.cost,
            description: spec.description,
            image_src: spec.image_src,
            kind,
        })
    }

    /// The card's type.
    #[must_use]
    pub fn card_type(&self) -> CardType {
        match self.kind {
            DefKind::Creature(_) => CardType::Creature,
            DefKind::Runebinding(_) => CardType::Runebinding,
            DefKind::Instant(_) => CardType::Instant,
        }
    }

    /// Creature payload, if this is a creature.
    #[must_use]
    pub fn as_creature(&self) -> Option<&CreatureDef> {
        match &self.kind {
            DefKind::Creature(c) => Some(c),
            _ => None,
        }
    }

    /// Runebinding payload, if this is a Runebinding.
    #[must_use]
    pub fn as_runebinding(&self) -> Option<&RunebindingDef> {
        match &self.kind {
            DefKind::Runebinding(r) => Some(r),
            _ => None,
        }
    }

    /// Instant payload, if this is an instant.
    #[must_use]
    pub fn as_instant(&self) -> Option<&InstantDef> {
        match &self.kind {
            DefKind::Instant(i) => Some(i),
            _ => None,
        }
    }
}
