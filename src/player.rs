use serde::{Deserialize, Serialize};
use crate::{Card, CoupError, Result};

pub const STARTING_COINS: u8 = 2;
pub const INFLUENCE_PER_PLAYER: usize = 2;

pub static BOT_NAMES: [&str; 5] = ["Alice", "Bob", "Charlie", "Diana", "Elsie"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub index: usize,
    pub coins: u8,
    pub cards_held: Vec<Card>,
    // face up, never returns to the deck
    pub cards_lost: Vec<Card>,
    pub is_human: bool,
    pub is_local: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, index: usize, is_human: bool, is_local: bool) -> Result<Self> {
        let name = name.into();
        if !is_human && is_local {
            return Err(CoupError::InvalidPlayer(format!("bot {name} cannot be local")));
        }

        Ok(Self {
            name,
            index,
            coins: STARTING_COINS,
            cards_held: Vec::with_capacity(4),
            cards_lost: Vec::with_capacity(INFLUENCE_PER_PLAYER),
            is_human,
            is_local,
        })
    }

    /// One local human in seat 0 followed by bots.
    pub fn table(num_seats: usize, human_name: &str) -> Result<Vec<Player>> {
        if !(2..=BOT_NAMES.len() + 1).contains(&num_seats) {
            return Err(CoupError::InvalidSeatCount(num_seats));
        }

        let mut players = vec![Player::new(human_name, 0, true, true)?];
        for (idx, name) in BOT_NAMES.iter().take(num_seats - 1).enumerate() {
            players.push(Player::new(*name, idx + 1, false, false)?);
        }

        Ok(players)
    }

    pub fn is_alive(&self) -> bool {
        self.cards_lost.len() < INFLUENCE_PER_PLAYER
    }

    pub fn influence(&self) -> usize {
        self.cards_held.len() + self.cards_lost.len()
    }

    pub fn holds(&self, card: Card) -> Option<usize> {
        self.cards_held.iter().position(|&held| held == card)
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
