use std::fmt::{Debug, Display, Formatter};
use serde::{Deserialize, Serialize};
use crate::Card;
use crate::Card::{Ambassador, Assassin, Captain, Contessa, Duke};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    NoAction,
    Income,
    ForeignAid,
    Coup,
    Assassinate,
    Exchange,
    Steal,
    Tax,
}

pub const COUP_COST: u8 = 7;
pub const ASSASSINATE_COST: u8 = 3;
// at this many coins the only legal action is a coup
pub const FORCED_COUP_COINS: u8 = 10;

impl Action {
    /// Maps the action menu key (1-7) to an action.
    pub fn from_selection(selection: usize) -> Option<Action> {
        match selection {
            1 => Some(Action::Income),
            2 => Some(Action::ForeignAid),
            3 => Some(Action::Coup),
            4 => Some(Action::Assassinate),
            5 => Some(Action::Exchange),
            6 => Some(Action::Steal),
            7 => Some(Action::Tax),
            _ => None,
        }
    }

    pub fn selection(&self) -> usize {
        match self {
            Action::NoAction => 0,
            Action::Income => 1,
            Action::ForeignAid => 2,
            Action::Coup => 3,
            Action::Assassinate => 4,
            Action::Exchange => 5,
            Action::Steal => 6,
            Action::Tax => 7,
        }
    }

    /// The card an actor implicitly claims by taking this action.
    pub fn card(&self) -> Option<Card> {
        match self {
            Action::Assassinate => Some(Assassin),
            Action::Exchange => Some(Ambassador),
            Action::Steal => Some(Captain),
            Action::Tax => Some(Duke),
            _ => None,
        }
    }

    pub fn is_targeted(&self) -> bool {
        matches!(self, Action::Coup | Action::Assassinate | Action::Steal)
    }

    pub fn is_challengeable(&self) -> bool {
        self.card().is_some()
    }

    /// Cards that may be claimed to block this action, in menu order.
    pub fn blockers(&self) -> &'static [Card] {
        match self {
            Action::ForeignAid => &[Duke],
            Action::Assassinate => &[Contessa],
            Action::Steal => &[Ambassador, Captain],
            _ => &[],
        }
    }

    pub fn is_blockable(&self) -> bool {
        !self.blockers().is_empty()
    }

    /// Coins paid when the target is confirmed.
    pub fn cost(&self) -> u8 {
        match self {
            Action::Coup => COUP_COST,
            Action::Assassinate => ASSASSINATE_COST,
            _ => 0,
        }
    }

    pub fn is_affordable(&self, coins: u8) -> bool {
        if coins >= FORCED_COUP_COINS {
            return *self == Action::Coup;
        }
        *self != Action::NoAction && coins >= self.cost()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::NoAction => "",
            Action::Income => "Income",
            Action::ForeignAid => "Foreign Aid",
            Action::Coup => "Coup",
            Action::Assassinate => "Assassinate",
            Action::Exchange => "Exchange",
            Action::Steal => "Steal",
            Action::Tax => "Tax",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    SelectAction,
    SelectTarget,
    MakeChallenge,
    ChallengeReveal,
    ChallengeLoss,
    MakeBlock,
    ChallengeBlock,
    BlockReveal,
    BlockLoss,
    ResolveAction,
    ExchangeMiddle,
    ExchangeFinal,
    EndGame,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub phase: Phase,
    pub action: Action,
}

impl State {
    pub const fn new(phase: Phase, action: Action) -> Self {
        Self { phase, action }
    }

    pub const fn initial() -> Self {
        Self::new(Phase::SelectAction, Action::NoAction)
    }

    pub const fn end() -> Self {
        Self::new(Phase::EndGame, Action::NoAction)
    }
}

impl Debug for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{{{:?}, {:?}}}", self.phase, self.action))
    }
}
