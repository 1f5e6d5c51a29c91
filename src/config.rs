use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::action_log::DEFAULT_LOG_CAPACITY;
use crate::player::BOT_NAMES;
use crate::{CoupError, Result};

/// Percent chance a bot challenges or bluff-blocks when it has nothing better to go on.
pub const DEFAULT_CHALLENGE_RATE: u8 = 20;

/// Everything fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of seats including the local human (2..=6)
    pub seats: usize,

    /// Seed for the deck and every bot; random when absent
    pub seed: Option<u64>,

    /// Lines kept in the on-screen action log
    pub log_capacity: usize,

    /// Bot challenge / bluff-block rate in percent
    pub challenge_rate: u8,

    /// Pause before a bot acts, purely cosmetic
    pub bot_delay: Duration,

    /// Diagnostic log destination
    pub log_path: PathBuf,

    pub human_name: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seats: 4,
            seed: None,
            log_capacity: DEFAULT_LOG_CAPACITY,
            challenge_rate: DEFAULT_CHALLENGE_RATE,
            bot_delay: Duration::from_millis(750),
            log_path: PathBuf::from("debug.log"),
            human_name: "Human".to_string(),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<()> {
        if !(2..=BOT_NAMES.len() + 1).contains(&self.seats) {
            return Err(CoupError::InvalidSeatCount(self.seats));
        }
        if self.challenge_rate > 100 {
            return Err(CoupError::InvalidConfig(format!("challenge rate {} is over 100%", self.challenge_rate)));
        }
        Ok(())
    }

    /// Each bot gets its own stream so one seat's choices don't shift another's.
    pub fn bot_seed(&self, seat: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_mul(31).wrapping_add(seat as u64 + 1))
    }
}
