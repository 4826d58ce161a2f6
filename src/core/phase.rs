//! Turn phases and the phase sequencer.
//!
//! A turn walks the fixed list mana → draw → main → attack → end. The
//! sequencer is pure: it advances an index and counts turns, and performs
//! no side effects. All phase-entry behavior (untapping, drawing, cleanup)
//! is orchestrated by [`crate::game::Game`].

use serde::{Deserialize, Serialize};

/// The five phases of a turn, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Mana,
    Draw,
    Main,
    Attack,
    End,
}

impl Phase {
    /// All phases in turn order.
    pub const ORDER: [Phase; 5] = [
        Phase::Mana,
        Phase::Draw,
        Phase::Main,
        Phase::Attack,
        Phase::End,
    ];

    /// Lowercase name as used in event payloads.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Mana => "mana",
            Phase::Draw => "draw",
            Phase::Main => "main",
            Phase::Attack => "attack",
            Phase::End => "end",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pure sequencer over the fixed phase list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnManager {
    index: usize,
    turn_number: u32,
}

impl Default for TurnManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnManager {
    /// Create a sequencer positioned at the first phase of turn 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: 0,
            turn_number: 1,
        }
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::ORDER[self.index]
    }

    /// The current turn number (starts at 1).
    #[must_use]
    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    /// Advance to the next phase.
    ///
    /// Returns `true` when the turn wrapped (end → mana); the caller is
    /// expected to follow up with [`TurnManager::start_new_turn`].
    pub fn next_phase(&mut self) -> bool {
        if self.index + 1 == Phase::ORDER.len() {
            self.index = 0;
            true
        } else {
            self.index += 1;
            false
        }
    }

    /// Reset to the first phase and count a new turn.
    pub fn start_new_turn(&mut self) {
        self.index = 0;
        self.turn_number += 1;
    }
}
