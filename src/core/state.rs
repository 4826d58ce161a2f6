//! Consolidated match state.
//!
//! Everything that gates which actions are currently legal lives in one
//! value owned by [`crate::game::Game`]: the lifecycle stage, whose turn it
//! is, and any pending discard interruption. Combat keeps its own sub-state
//! machine in [`crate::combat::CombatManager`], also owned by `Game`.

use serde::{Deserialize, Serialize};

use super::ids::PlayerId;
use super::phase::Phase;

/// Lifecycle stage of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Players are being registered.
    Setup,
    /// Decks shuffled, opening hands dealt, first turn not yet begun.
    Starting,
    /// Normal turn flow.
    Playing,
    /// Normal flow paused until a pending discard is resolved.
    Discarding,
    /// Terminal; no further mutation is accepted.
    GameOver,
}

/// A discard obligation that pauses normal flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDiscard {
    /// Who must discard.
    pub player_id: PlayerId,
    /// How many cards remain to be discarded.
    pub count: u32,
}

/// The single consolidated match-state value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchState {
    lifecycle: Lifecycle,
    current_player: PlayerId,
    pending_discard: Option<PendingDiscard>,
    winner: Option<PlayerId>,
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchState {
    /// Create a fresh state in the setup stage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Setup,
            current_player: PlayerId::new(0),
            pending_discard: None,
            winner: None,
        }
    }

    /// Current lifecycle stage.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// The player whose turn it is.
    #[must_use]
    pub fn current_player(&self) -> PlayerId {
        self.current_player
    }

    /// The pending discard, if flow is paused on one.
    #[must_use]
    pub fn pending_discard(&self) -> Option<PendingDiscard> {
        self.pending_discard
    }

    /// The winner, once the match is over.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// True while normal turn actions are accepted.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.lifecycle == Lifecycle::Playing
    }

    /// True once the match has terminally ended.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.lifecycle == Lifecycle::GameOver
    }

    /// Move from setup into the starting stage.
    pub fn begin_starting(&mut self) {
        debug_assert_eq!(self.lifecycle, Lifecycle::Setup);
        self.lifecycle = Lifecycle::Starting;
    }

    /// Enter normal play with the given starting player.
    pub fn begin_playing(&mut self, starting_player: PlayerId) {
        self.lifecycle = Lifecycle::Playing;
        self.current_player = starting_player;
    }

    /// Hand the turn to the other player.
    pub fn switch_current_player(&mut self) {
        self.current_player = self.current_player.opponent();
    }

    /// Pause normal flow on a discard obligation.
    pub fn begin_discard(&mut self, player_id: PlayerId, count: u32) {
        self.pending_discard = Some(PendingDiscard { player_id, count });
        self.lifecycle = Lifecycle::Discarding;
    }

    /// Count one resolved discard.
    ///
    /// Returns `true` when the obligation is fully satisfied; the state is
    /// then back in [`Lifecycle::Playing`].
    pub fn discard_resolved(&mut self) -> bool {
        let Some(pending) = self.pending_discard.as_mut() else {
            return false;
        };
        pending.count = pending.count.saturating_sub(1);
        if pending.count == 0 {
            self.pending_discard = None;
            self.lifecycle = Lifecycle::Playing;
            true
        } else {
            false
        }
    }

    /// One-way transition into game over. Idempotent: the first winner
    /// recorded wins; later calls are ignored.
    pub fn finish(&mut self, winner: PlayerId) {
        if self.lifecycle == Lifecycle::GameOver {
            return;
        }
        self.lifecycle = Lifecycle::GameOver;
        self.winner = Some(winner);
        self.pending_discard = None;
    }
}

/// Read-only snapshot of the facts that gate action legality.
///
/// Handed to card legality checks and controllers so collaborators never
/// reach into private engine state.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MatchView {
    pub lifecycle: Lifecycle,
    pub phase: Phase,
    pub turn_number: u32,
    pub current_player: PlayerId,
}

impl MatchView {
    /// Is it this player's turn, with normal flow active?
    #[must_use]
    pub fn is_turn_of(&self, player: PlayerId) -> bool {
        self.lifecycle == Lifecycle::Playing && self.current_player == player
    }
}
