//! Identifier types for players and card copies.
//!
//! ## PlayerId
//!
//! A match always has exactly two seats, `PlayerId(0)` and `PlayerId(1)`.
//!
//! ## InstanceId
//!
//! Every physical card copy in a match gets an `InstanceId` when it is
//! instantiated from its definition. Instance ids are allocated once and
//! never reused, even after the card reaches the graveyard.

use serde::{Deserialize, Serialize};

/// One of the two seats in a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Create a player ID. Only seats 0 and 1 exist.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Seat index (0 or 1).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The other seat.
    ///
    /// ```
    /// use runeclash::core::PlayerId;
    ///
    /// assert_eq!(PlayerId::new(0).opponent(), PlayerId::new(1));
    /// assert_eq!(PlayerId::new(1).opponent(), PlayerId::new(0));
    /// ```
    #[must_use]
    pub const fn opponent(self) -> Self {
        Self(1 - self.0)
    }

    /// Both seats in order.
    #[must_use]
    pub const fn both() -> [PlayerId; 2] {
        [PlayerId(0), PlayerId(1)]
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// Unique identifier for a card copy within a match.
///
/// Distinct from [`crate::cards::DefId`]: two copies of the same card share
/// a definition id but never an instance id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl InstanceId {
    /// Create an instance ID.
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

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card#{}", self.0)
    }
}

/// Monotonic allocator for instance ids. Ids are never reused.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InstanceIdAllocator {
    next: u32,
}

impl InstanceIdAllocator {
    /// Create an allocator starting at id 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next instance id.
    pub fn alloc(&mut self) -> InstanceId {
        let id = InstanceId(self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_is_involution() {
        for p in PlayerId::both() {
            assert_ne!(p, p.opponent());
            assert_eq!(p, p.opponent().opponent());
        }
    }

    #[test]
    fn test_instance_ids_never_reused() {
        let mut alloc = InstanceIdAllocator::new();
        let a = alloc.alloc();
        let b = alloc.alloc();
        let c = alloc.alloc();

        assert_eq!(a, InstanceId::new(0));
        assert_eq!(b, InstanceId::new(1));
        assert_eq!(c, InstanceId::new(2));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PlayerId::new(1)), "Player 1");
        assert_eq!(format!("{}", InstanceId::new(42)), "Card#42");
    }

    #[test]
    fn test_serialization() {
        let id = InstanceId(123);
        let json = serde_json::to_string(&id).unwrap();
        let back: InstanceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
