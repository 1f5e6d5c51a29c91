use serde::{Deserialize, Serialize};
use crate::action::State;
use crate::player::Player;
use crate::Card;

/// A validated decision for the controller: a menu selection made by a seat.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputData {
    pub selection: usize,
    pub seat: usize,
}

impl InputData {
    pub fn new(selection: usize, seat: usize) -> Self {
        Self { selection, seat }
    }
}

/// Read-only copy of everything the input layer and the display need for one
/// controller step. Published once per step and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub step: u64,
    pub turn: usize,
    pub state: State,
    pub players: Vec<Player>,
    pub active: Vec<usize>,
    // only populated while a target is being chosen
    pub valid_targets: Vec<usize>,
    pub current: usize,
    pub target: Option<usize>,
    pub blocker: Option<usize>,
    pub challenger: Option<usize>,
    pub block_type: Option<Card>,
    pub log: Vec<String>,
    pub victor: Option<usize>,
}

impl Snapshot {
    pub fn is_active(&self, seat: usize) -> bool {
        self.active.contains(&seat)
    }

    pub fn player(&self, seat: usize) -> Option<&Player> {
        self.players.get(seat)
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_local)
    }

    pub fn is_over(&self) -> bool {
        self.victor.is_some()
    }
}
