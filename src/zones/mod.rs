//! Zone containers for a player's cards.
//!
//! Each player owns one of each zone. Per-zone semantics:
//!
//! - **Deck**: ordered, draws pop from the top (end of the vec), shuffled
//!   at match start.
//! - **Hand**: unique-by-id, soft size cap enforced only at end-of-turn
//!   cleanup (by the player, not the container).
//! - **Battlefield**: unique-by-id.
//! - **Graveyard**: append-ordered; the most recent entry is the visible
//!   "top".
//!
//! Zones are minimal CRUD containers: they answer "is this id here" and
//! keep per-zone order, nothing more. Play legality is the caller's
//! responsibility.

use serde::{Deserialize, Serialize};

use crate::core::{InstanceId, MatchRng};

/// One of the four zones a card copy can occupy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Deck,
    Hand,
    Battlefield,
    Graveyard,
}

impl Zone {
    /// Lowercase name as used in event payloads.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Zone::Deck => "deck",
            Zone::Hand => "hand",
            Zone::Battlefield => "battlefield",
            Zone::Graveyard => "graveyard",
        }
    }

    /// All four zones.
    pub const ALL: [Zone; 4] = [Zone::Deck, Zone::Hand, Zone::Battlefield, Zone::Graveyard];
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The four zone containers belonging to one player.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ZoneSet {
    deck: Vec<InstanceId>,
    hand: Vec<InstanceId>,
    battlefield: Vec<InstanceId>,
    graveyard: Vec<InstanceId>,
}

impl ZoneSet {
    /// Create an empty zone set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, zone: Zone) -> &Vec<InstanceId> {
        match zone {
            Zone::Deck => &self.deck,
            Zone::Hand => &self.hand,
            Zone::Battlefield => &self.battlefield,
            Zone::Graveyard => &self.graveyard,
        }
    }

    fn list_mut(&mut self, zone: Zone) -> &mut Vec<InstanceId> {
        match zone {
            Zone::Deck => &mut self.deck,
            Zone::Hand => &mut self.hand,
            Zone::Battlefield => &mut self.battlefield,
            Zone::Graveyard => &mut self.graveyard,
        }
    }

    /// Cards in a zone, in that zone's order.
    #[must_use]
    pub fn cards(&self, zone: Zone) -> &[InstanceId] {
        self.list(zone)
    }

    /// Number of cards in a zone.
    #[must_use]
    pub fn len(&self, zone: Zone) -> usize {
        self.list(zone).len()
    }

    /// True if a zone is empty.
    #[must_use]
    pub fn is_empty(&self, zone: Zone) -> bool {
        self.list(zone).is_empty()
    }

    /// Check whether an id is present in a zone.
    #[must_use]
    pub fn contains(&self, zone: Zone, id: InstanceId) -> bool {
        self.list(zone).contains(&id)
    }

    /// Insert an id into a zone.
    ///
    /// Hand and battlefield are unique-by-id: re-inserting an id already
    /// present is a no-op and returns `false`. Deck inserts go on top;
    /// graveyard inserts append (most recent = top).
    pub fn insert(&mut self, zone: Zone, id: InstanceId) -> bool {
        match zone {
            Zone::Hand | Zone::Battlefield => {
                if self.contains(zone, id) {
                    return false;
                }
            }
            Zone::Deck | Zone::Graveyard => {}
        }
        self.list_mut(zone).push(id);
        true
    }

    /// Remove an id from a zone. Returns `false` if it was not there.
    pub fn remove(&mut self, zone: Zone, id: InstanceId) -> bool {
        let list = self.list_mut(zone);
        if let Some(pos) = list.iter().position(|&c| c == id) {
            list.remove(pos);
            true
        } else {
            false
        }
    }

    /// Remove and return the top card of the deck.
    pub fn draw_top(&mut self) -> Option<InstanceId> {
        self.deck.pop()
    }

    /// Shuffle the deck.
    pub fn shuffle_deck(&mut self, rng: &mut MatchRng) {
        rng.shuffle(&mut self.deck);
    }

    /// The most recently added graveyard card, if any.
    #[must_use]
    pub fn graveyard_top(&self) -> Option<InstanceId> {
        self.graveyard.last().copied()
    }

    /// Locate the zone an id currently sits in.
    #[must_use]
    pub fn zone_of(&self, id: InstanceId) -> Option<Zone> {
        Zone::ALL.into_iter().find(|&z| self.contains(z, id))
    }

    /// All ids across the four zones.
    pub fn all_ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.deck
            .iter()
            .chain(&self.hand)
            .chain(&self.battlefield)
            .chain(&self.graveyard)
            .copied()
    }

    /// Total number of cards across all zones.
    #[must_use]
    pub fn total(&self) -> usize {
        self.deck.len() + self.hand.len() + self.battlefield.len() + self.graveyard.len()
    }
}
