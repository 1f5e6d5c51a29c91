use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use crate::Card::{Ambassador, Assassin, Captain, Contessa, Duke};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Card {
    Ambassador,
    Assassin,
    Captain,
    Contessa,
    Duke,
}

pub static CARD_VARIANTS: [Card; 5] = [
    Ambassador,
    Assassin,
    Captain,
    Contessa,
    Duke,
];

pub const COPIES_PER_CARD: usize = 3;

pub const DECK_SIZE: usize = CARD_VARIANTS.len() * COPIES_PER_CARD;

impl Card {
    pub fn name(&self) -> &'static str {
        match self {
            Ambassador => "Ambassador",
            Assassin => "Assassin",
            Captain => "Captain",
            Contessa => "Contessa",
            Duke => "Duke",
        }
    }

    /// Three letter tag used for face up cards in the player list.
    pub fn short(&self) -> String {
        self.name()[..3].to_uppercase()
    }
}

impl Display for Card {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use crate::card::{CARD_VARIANTS, DECK_SIZE};
    use crate::Card::{Contessa, Duke};

    #[test]
    fn deck_size() {
        assert_eq!(DECK_SIZE, 15);
        assert_eq!(CARD_VARIANTS.len(), 5);
    }

    #[test]
    fn short_names() {
        assert_eq!(Contessa.short(), "CON");
        assert_eq!(Duke.short(), "DUK");
    }
}
