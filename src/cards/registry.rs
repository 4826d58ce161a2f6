//! Card definition registry and deck building.
//!
//! The collection layer supplies plain lists of definition ids; the
//! registry turns them into instantiated decks. Deck size is validated
//! here against the one authoritative range the engine enforces.

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::definition::{CardDefinition, CardSpec, DefId, DefinitionError};
use super::instance::CardInstance;
use crate::core::{InstanceIdAllocator, PlayerId};

/// Authoritative deck-size bounds, inclusive.
pub const DECK_MIN: usize = 30;
pub const DECK_MAX: usize = 40;

/// Deck-construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("deck has {0} cards; must be {DECK_MIN}-{DECK_MAX}")]
    SizeOutOfBounds(usize),
    #[error("deck references unknown definition {0}")]
    UnknownDefinition(DefId),
}

/// Lookup table of validated card definitions.
#[derive(Clone, Debug, Default)]
pub struct CardRegistry {
    definitions: FxHashMap<DefId, CardDefinition>,
}

impl CardRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validated definition. Replaces any previous entry with
    /// the same id.
    pub fn register(&mut self, definition: CardDefinition) {
        self.definitions.insert(definition.id, definition);
    }

    /// Validate and register a raw spec.
    pub fn register_spec(&mut self, spec: CardSpec) -> Result<DefId, DefinitionError> {
        let definition = CardDefinition::from_spec(spec)?;
        let id = definition.id;
        if self.definitions.contains_key(&id) {
            return Err(DefinitionError::Duplicate(id));
        }
        self.definitions.insert(id, definition);
        Ok(id)
    }

    /// Look up a definition.
    #[must_use]
    pub fn get(&self, id: DefId) -> Option<&CardDefinition> {
        self.definitions.get(&id)
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True when no definitions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Validate a deck list without instantiating it.
    pub fn validate_deck(&self, deck: &[DefId]) -> Result<(), DeckError> {
        if !(DECK_MIN..=DECK_MAX).contains(&deck.len()) {
            return Err(DeckError::SizeOutOfBounds(deck.len()));
        }
        for &id in deck {
            if !self.definitions.contains_key(&id) {
                return Err(DeckError::UnknownDefinition(id));
            }
        }
        Ok(())
    }

    /// Instantiate a validated deck list into card copies for a player.
    ///
    /// Each copy gets a fresh, never-reused instance id.
    pub fn instantiate_deck(
        &self,
        deck: &[DefId],
        owner: PlayerId,
        allocator: &mut InstanceIdAllocator,
    ) -> Result<Vec<CardInstance>, DeckError> {
        self.validate_deck(deck)?;
        Ok(deck
            .iter()
            .map(|&id| {
                let def = &self.definitions[&id];
                CardInstance::from_definition(allocator.alloc(), def, owner)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::definition::CardType;

    fn vanilla_creature(id: u32) -> CardSpec {
        CardSpec {
            id,
            name: format!("Creature {id}"),
            card_type: CardType::Creature,
            cost: 1,
            image_src: None,
            description: None,
            attack: Some(1),
            toughness: Some(1),
            tribe: None,
            abilities: vec![],
            effect: None,
            target_type: None,
            is_temporary: None,
            duration: None,
            effects: vec![],
        }
    }

    fn registry_with(n: u32) -> CardRegistry {
        let mut registry = CardRegistry::new();
        for id in 1..=n {
            registry.register_spec(vanilla_creature(id)).unwrap();
        }
        registry
    }

    #[test]
    fn test_register_and_get() {
        let registry = registry_with(3);
        assert_eq!(registry.len(), 3);
        assert!(registry.get(DefId::new(2)).is_some());
        assert!(registry.get(DefId::new(99)).is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = registry_with(1);
        assert_eq!(
            registry.register_spec(vanilla_creature(1)),
            Err(DefinitionError::Duplicate(DefId::new(1)))
        );
    }

    #[test]
    fn test_deck_size_bounds() {
        let registry = registry_with(5);

        let too_small: Vec<DefId> = (0..29).map(|i| DefId::new(i % 5 + 1)).collect();
        assert_eq!(
            registry.validate_deck(&too_small),
            Err(DeckError::SizeOutOfBounds(29))
        );

        let too_big: Vec<DefId> = (0..41).map(|i| DefId::new(i % 5 + 1)).collect();
        assert_eq!(
            registry.validate_deck(&too_big),
            Err(DeckError::SizeOutOfBounds(41))
        );

        let just_right: Vec<DefId> = (0..30).map(|i| DefId::new(i % 5 + 1)).collect();
        assert!(registry.validate_deck(&just_right).is_ok());

        let max: Vec<DefId> = (0..40).map(|i| DefId::new(i % 5 + 1)).collect();
        assert!(registry.validate_deck(&max).is_ok());
    }

    #[test]
    fn test_unknown_definition_rejected() {
        let registry = registry_with(2);
        let mut deck: Vec<DefId> = (0..30).map(|i| DefId::new(i % 2 + 1)).collect();
        deck[10] = DefId::new(77);

        assert_eq!(
            registry.validate_deck(&deck),
            Err(DeckError::UnknownDefinition(DefId::new(77)))
        );
    }

    #[test]
    fn test_instantiate_deck_allocates_unique_ids() {
        let registry = registry_with(3);
        let deck: Vec<DefId> = (0..30).map(|i| DefId::new(i % 3 + 1)).collect();
        let mut allocator = InstanceIdAllocator::new();

        let cards = registry
            .instantiate_deck(&deck, PlayerId::new(0), &mut allocator)
            .unwrap();

        assert_eq!(cards.len(), 30);
        let mut uids: Vec<_> = cards.iter().map(|c| c.uid).collect();
        uids.sort();
        uids.dedup();
        assert_eq!(uids.len(), 30);
    }
}
