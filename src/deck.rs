use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use crate::card::{CARD_VARIANTS, COPIES_PER_CARD, DECK_SIZE};
use crate::player::{Player, INFLUENCE_PER_PLAYER};
use crate::Card;

/// The court deck. Cards not in any hand live here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

impl Deck {
    pub fn new() -> Self {
        let cards = CARD_VARIANTS.iter()
            .flat_map(|&card| std::iter::repeat(card).take(COPIES_PER_CARD))
            .collect::<Vec<Card>>();

        debug_assert_eq!(cards.len(), DECK_SIZE);

        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Hands each player two cards off the top of the deck.
    pub fn deal(&mut self, players: &mut [Player]) {
        for player in players.iter_mut() {
            for _ in 0..INFLUENCE_PER_PLAYER {
                if let Some(card) = self.cards.pop() {
                    player.cards_held.push(card);
                }
            }
        }
    }

    /// Removes a uniformly chosen card.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Card> {
        if self.cards.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.cards.len());
        Some(self.cards.remove(idx))
    }

    /// Shuffles `card` back in and draws a replacement, which may be the same card.
    pub fn swap<R: Rng + ?Sized>(&mut self, card: Card, rng: &mut R) -> Card {
        self.cards.push(card);
        self.cards.shuffle(rng);
        // the deck is non-empty since we just pushed
        self.cards.remove(0)
    }

    pub fn return_cards(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
    }

    /// Takes a specific card out of the deck, used to rig hands.
    pub fn take(&mut self, card: Card) -> Option<Card> {
        let idx = self.cards.iter().position(|&c| c == card)?;
        Some(self.cards.remove(idx))
    }
}
