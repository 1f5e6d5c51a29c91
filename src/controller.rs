use std::fmt::{Debug, Formatter};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use crate::action::{Action, Phase, State};
use crate::action_log::ActionLog;
use crate::config::GameConfig;
use crate::deck::Deck;
use crate::player::Player;
use crate::snapshot::{InputData, Snapshot};
use crate::{Card, CoupError, Result};

/// Turn-resolution state machine. Owns the deck, the players and the action
/// log; everything else only ever sees a [`Snapshot`].
#[derive(Clone)]
pub struct Controller {
    state: State,
    rng: Pcg64,
    deck: Deck,
    action_log: ActionLog,
    players: Vec<Player>,
    active_players: Vec<usize>,

    turn: usize,
    step: u64,
    current_player_idx: usize,
    target_player_idx: Option<usize>,
    blocker_player_idx: Option<usize>,
    challenger_player_idx: Option<usize>,
    num_passed: usize,
    block_type: Option<Card>,
    // cards set aside during an exchange, not yet back in the deck
    returned_cards: Vec<Card>,
    victor: Option<usize>,
}

impl Debug for Controller {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(format!("T {} | {:?} | P {} | A {:?}\n", self.turn, self.state, self.current_player_idx, self.active_players).as_str())?;
        for player in self.players.iter() {
            f.write_str(format!("\tP {}: ${} | {:?} / {:?}\n", player.index, player.coins, player.cards_held, player.cards_lost).as_str())?;
        }
        Ok(())
    }
}

impl Controller {
    pub fn new(players: Vec<Player>, rng: Pcg64) -> Result<Self> {
        if !(2..=6).contains(&players.len()) {
            return Err(CoupError::InvalidSeatCount(players.len()));
        }

        let mut controller = Self {
            state: State::initial(),
            rng,
            deck: Deck::new(),
            action_log: ActionLog::default(),
            players,
            active_players: vec![],
            turn: 0,
            step: 0,
            current_player_idx: 0,
            target_player_idx: None,
            blocker_player_idx: None,
            challenger_player_idx: None,
            num_passed: 0,
            block_type: None,
            returned_cards: vec![],
            victor: None,
        };
        controller.set_active_players();

        Ok(controller)
    }

    /// Builds the table described by `config` and deals the opening hands.
    pub fn from_config(config: &GameConfig) -> Result<Self> {
        let players = Player::table(config.seats, &config.human_name)?;
        let rng = match config.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };

        let mut controller = Self::new(players, rng)?;
        controller.action_log = ActionLog::new(config.log_capacity);
        controller.shuffle_and_deal();

        Ok(controller)
    }

    pub fn shuffle_and_deal(&mut self) {
        self.deck.shuffle(&mut self.rng);
        self.deck.deal(&mut self.players);
        log::debug!("dealt {} seats, {} cards left in the deck", self.players.len(), self.deck.len());
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.action_log
    }

    pub fn active_players(&self) -> &[usize] {
        &self.active_players
    }

    pub fn current(&self) -> usize {
        self.current_player_idx
    }

    pub fn target(&self) -> Option<usize> {
        self.target_player_idx
    }

    pub fn blocker(&self) -> Option<usize> {
        self.blocker_player_idx
    }

    pub fn challenger(&self) -> Option<usize> {
        self.challenger_player_idx
    }

    pub fn block_type(&self) -> Option<Card> {
        self.block_type
    }

    pub fn victor(&self) -> Option<usize> {
        self.victor
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn num_passed(&self) -> usize {
        self.num_passed
    }

    /// Every card in the game, wherever it currently is. Always 15.
    pub fn total_cards(&self) -> usize {
        self.deck.len()
            + self.returned_cards.len()
            + self.players.iter().map(|p| p.cards_held.len() + p.cards_lost.len()).sum::<usize>()
    }

    pub fn snapshot(&self) -> Snapshot {
        let valid_targets = if self.state.phase == Phase::SelectTarget {
            self.valid_targets()
        } else {
            vec![]
        };

        Snapshot {
            step: self.step,
            turn: self.turn,
            state: self.state,
            players: self.players.clone(),
            active: self.active_players.clone(),
            valid_targets,
            current: self.current_player_idx,
            target: self.target_player_idx,
            blocker: self.blocker_player_idx,
            challenger: self.challenger_player_idx,
            block_type: self.block_type,
            log: self.action_log.to_vec(),
            victor: self.victor,
        }
    }

    /// Living players other than the current one, in seat order after them.
    pub fn valid_targets(&self) -> Vec<usize> {
        self.other_player_indexes(self.current_player_idx)
    }

    fn other_player_indexes(&self, exclude_idx: usize) -> Vec<usize> {
        (1..self.players.len())
            .map(|n| (exclude_idx + n) % self.players.len())
            .filter(|player_idx| !self.is_player_dead(*player_idx))
            .collect()
    }

    fn is_player_dead(&self, player_idx: usize) -> bool {
        !self.players[player_idx].is_alive()
    }

    fn num_living_players(&self) -> usize {
        self.players.iter().filter(|p| p.is_alive()).count()
    }

    fn log(&mut self, message: String) {
        self.action_log.enqueue(message);
    }

    fn name(&self, player_idx: usize) -> String {
        self.players[player_idx].name.clone()
    }

    fn invalid(&self, selection: usize, seat: usize) -> CoupError {
        CoupError::InvalidSelection { state: self.state, selection, seat }
    }

    fn require(&self, player_idx: Option<usize>) -> Result<usize> {
        player_idx.ok_or(CoupError::UnhandledState(self.state))
    }

    fn set_active_players(&mut self) {
        let current = self.current_player_idx;
        let alive = |idx: Option<usize>| idx.filter(|&idx| !self.is_player_dead(idx));

        self.active_players = match self.state.phase {
            Phase::SelectAction
            | Phase::SelectTarget
            | Phase::ChallengeReveal
            | Phase::ExchangeMiddle
            | Phase::ExchangeFinal => vec![current],
            Phase::MakeChallenge => self.other_player_indexes(current),
            Phase::ChallengeLoss | Phase::BlockLoss => self.challenger_player_idx.into_iter().collect(),
            Phase::MakeBlock => match self.state.action {
                Action::ForeignAid => self.other_player_indexes(current),
                _ => alive(self.target_player_idx).into_iter().collect(),
            },
            Phase::ChallengeBlock => match self.blocker_player_idx {
                Some(blocker) => self.other_player_indexes(blocker),
                None => vec![],
            },
            Phase::BlockReveal => self.blocker_player_idx.into_iter().collect(),
            Phase::ResolveAction => match self.state.action {
                Action::Coup | Action::Assassinate => alive(self.target_player_idx).into_iter().collect(),
                Action::Exchange => vec![current],
                _ => vec![],
            },
            Phase::EndGame => self.players.iter().filter(|p| p.is_local).map(|p| p.index).collect(),
        };
    }

    /// Applies one decision and moves the state machine forward.
    pub fn update_game(&mut self, input: InputData) -> Result<()> {
        self.step += 1;

        // a target knocked out earlier in this action ends the turn, whatever the state says
        if let Some(target_player_idx) = self.target_player_idx {
            if self.is_player_dead(target_player_idx) && self.state.phase != Phase::EndGame {
                if self.state.action == Action::Steal {
                    self.log(format!("{} steals 0 coins from {}", self.name(self.current_player_idx), self.name(target_player_idx)));
                }
                log::debug!("target {target_player_idx} eliminated, skipping {:?}", self.state);
                self.state = self.go_next_turn();
                self.set_active_players();
                return Ok(());
            }
        }

        if self.state.phase != Phase::EndGame && self.num_living_players() <= 1 {
            self.state = self.go_next_turn();
            self.set_active_players();
            return Ok(());
        }

        log::debug!("state - {:?}; active - {:?}; input - {:?}", self.state, self.active_players, input);

        let InputData { selection, seat } = input;
        let next_state = match (self.state.phase, self.state.action) {
            (Phase::SelectAction, Action::NoAction) => self.select_action(selection, seat)?,
            (Phase::SelectTarget, Action::Coup | Action::Assassinate | Action::Steal) => self.select_target(selection, seat)?,
            (Phase::MakeChallenge, Action::Assassinate | Action::Exchange | Action::Steal | Action::Tax) => self.make_challenge(selection, seat)?,
            (Phase::ChallengeReveal, Action::Assassinate | Action::Exchange | Action::Steal | Action::Tax) => self.challenge_reveal(selection, seat)?,
            (Phase::ChallengeLoss, Action::Assassinate | Action::Exchange | Action::Steal | Action::Tax) => self.challenge_loss(selection, seat)?,
            (Phase::MakeBlock, Action::ForeignAid | Action::Assassinate | Action::Steal) => self.make_block(selection, seat)?,
            (Phase::ChallengeBlock, Action::ForeignAid | Action::Assassinate | Action::Steal) => self.challenge_block(selection, seat)?,
            (Phase::BlockReveal, Action::ForeignAid | Action::Assassinate | Action::Steal) => self.block_reveal(selection, seat)?,
            (Phase::BlockLoss, Action::ForeignAid | Action::Assassinate | Action::Steal) => self.block_loss(selection, seat)?,
            (Phase::ResolveAction, Action::NoAction) => return Err(CoupError::UnhandledState(self.state)),
            (Phase::ResolveAction, _) => self.resolve_action(selection, seat)?,
            (Phase::ExchangeMiddle, Action::Exchange) => self.exchange_middle(selection, seat)?,
            (Phase::ExchangeFinal, Action::Exchange) => self.exchange_final(selection, seat)?,
            (Phase::EndGame, Action::NoAction) => self.state,
            _ => return Err(CoupError::UnhandledState(self.state)),
        };

        log::debug!("{:?} -> {:?}", self.state, next_state);
        self.state = next_state;
        self.set_active_players();

        if log::log_enabled!(log::Level::Debug) {
            if let Ok(json) = serde_json::to_string(&self.snapshot()) {
                log::debug!("snapshot - {json}");
            }
        }

        Ok(())
    }

    fn go_next_turn(&mut self) -> State {
        // reset per-turn state
        self.active_players.clear();
        self.target_player_idx = None;
        self.blocker_player_idx = None;
        self.challenger_player_idx = None;
        self.block_type = None;
        self.num_passed = 0;
        self.returned_cards.clear();

        match self.next_living_player() {
            Some(player_idx) if self.num_living_players() > 1 => {
                self.turn += 1;
                self.current_player_idx = player_idx;
                State::initial()
            }
            _ => {
                self.victor = self.players.iter().find(|p| p.is_alive()).map(|p| p.index);
                if let Some(victor) = self.victor {
                    self.log(format!("The game is over, and {} is the victor!", self.name(victor)));
                }
                State::end()
            }
        }
    }

    /// The first living seat after the current one, or None if nobody else is left.
    fn next_living_player(&self) -> Option<usize> {
        let num_players = self.players.len();
        (1..num_players)
            .map(|n| (self.current_player_idx + n) % num_players)
            .find(|&idx| !self.is_player_dead(idx))
    }

    fn replace_influence_card(&mut self, player_idx: usize, card_idx: usize) -> Result<Card> {
        let hand_len = self.players[player_idx].cards_held.len();
        if card_idx >= hand_len {
            return Err(self.invalid(card_idx, player_idx));
        }

        let card = self.players[player_idx].cards_held.remove(card_idx);
        let replacement = self.deck.swap(card, &mut self.rng);

        // put the card back at the right position
        self.players[player_idx].cards_held.insert(card_idx, replacement);
        Ok(card)
    }

    fn lose_influence_card(&mut self, player_idx: usize, card_idx: usize) -> Result<Card> {
        let hand_len = self.players[player_idx].cards_held.len();
        if card_idx >= hand_len {
            return Err(self.invalid(card_idx, player_idx));
        }

        // 'losing' an influence means the card is flipped face up for good
        let card = self.players[player_idx].cards_held.remove(card_idx);
        self.players[player_idx].cards_lost.push(card);
        Ok(card)
    }

    fn select_action(&mut self, selection: usize, seat: usize) -> Result<State> {
        let action = Action::from_selection(selection).ok_or_else(|| self.invalid(selection, seat))?;
        if !action.is_affordable(self.players[self.current_player_idx].coins) {
            return Err(self.invalid(selection, seat));
        }

        if !action.is_targeted() {
            self.log(format!("{} has selected {}", self.name(self.current_player_idx), action));
        }

        let phase = if action.is_targeted() {
            Phase::SelectTarget
        } else if action.is_challengeable() {
            Phase::MakeChallenge
        } else if action.is_blockable() {
            Phase::MakeBlock
        } else {
            Phase::ResolveAction
        };
        Ok(State::new(phase, action))
    }

    fn select_target(&mut self, selection: usize, seat: usize) -> Result<State> {
        if selection == 0 {
            // cancelled before anything was paid for
            return Ok(State::initial());
        }

        // the menu is 1-based so that 0 can mean cancel
        let target_player_idx = *self.valid_targets()
            .get(selection - 1)
            .ok_or_else(|| self.invalid(selection, seat))?;

        let action = self.state.action;
        let current = self.current_player_idx;
        self.target_player_idx = Some(target_player_idx);

        match action {
            Action::Steal => {
                self.log(format!("{} is attempting to {} from {}", self.name(current), action, self.name(target_player_idx)));
                Ok(State::new(Phase::MakeChallenge, action))
            }
            Action::Assassinate => {
                self.players[current].coins -= action.cost();
                self.log(format!("{} has spent {} coins to attempt to {} {}", self.name(current), action.cost(), action, self.name(target_player_idx)));
                Ok(State::new(Phase::MakeChallenge, action))
            }
            Action::Coup => {
                // coups can't be challenged or blocked
                self.players[current].coins -= action.cost();
                self.log(format!("{} has spent {} coins to launch a {} against {}!", self.name(current), action.cost(), action, self.name(target_player_idx)));
                Ok(State::new(Phase::ResolveAction, action))
            }
            _ => Err(CoupError::UnhandledState(self.state)),
        }
    }

    fn make_challenge(&mut self, selection: usize, seat: usize) -> Result<State> {
        let action = self.state.action;
        let claim = action.card().ok_or(CoupError::UnhandledState(self.state))?;

        match selection {
            0 => {
                self.num_passed = self.active_players.len();
                self.log(format!("No one dares challenge {}'s {} claim", self.name(self.current_player_idx), claim));
                if action.is_blockable() {
                    Ok(State::new(Phase::MakeBlock, action))
                } else {
                    Ok(State::new(Phase::ResolveAction, action))
                }
            }
            1 => {
                if seat == self.current_player_idx || seat >= self.players.len() || self.is_player_dead(seat) {
                    return Err(self.invalid(selection, seat));
                }
                self.challenger_player_idx = Some(seat);
                self.log(format!("{} is challenging the {} claim of {}", self.name(seat), claim, self.name(self.current_player_idx)));
                Ok(State::new(Phase::ChallengeReveal, action))
            }
            _ => Err(self.invalid(selection, seat)),
        }
    }

    fn challenge_reveal(&mut self, selection: usize, seat: usize) -> Result<State> {
        let current = self.current_player_idx;
        let challenger = self.require(self.challenger_player_idx)?;
        let claim = self.state.action.card().ok_or(CoupError::UnhandledState(self.state))?;
        let revealed = *self.players[current].cards_held.get(selection).ok_or_else(|| self.invalid(selection, seat))?;

        self.log(format!("{} reveals... {}!", self.name(current), revealed));

        if revealed == claim {
            // challenge fails, the claim was true
            self.log(format!("Challenge fails! {} shuffles {} into the deck and draws a new card", self.name(current), revealed));
            self.replace_influence_card(current, selection)?;
            self.log(format!("{} must lose influence", self.name(challenger)));
            Ok(State::new(Phase::ChallengeLoss, self.state.action))
        } else {
            self.log(format!("Challenge succeeds! {} loses {}", self.name(current), revealed));
            self.lose_influence_card(current, selection)?;
            Ok(self.go_next_turn())
        }
    }

    fn challenge_loss(&mut self, selection: usize, seat: usize) -> Result<State> {
        let challenger = self.require(self.challenger_player_idx)?;
        if seat != challenger {
            return Err(self.invalid(selection, seat));
        }

        let lost = self.lose_influence_card(challenger, selection)?;
        self.log(format!("{} chooses to lose {}", self.name(challenger), lost));

        let action = self.state.action;
        let target_alive = self.target_player_idx.is_some_and(|idx| !self.is_player_dead(idx));

        // assassinate and steal can still be blocked after the challenge
        if action.is_blockable() && target_alive {
            Ok(State::new(Phase::MakeBlock, action))
        } else {
            Ok(State::new(Phase::ResolveAction, action))
        }
    }

    fn make_block(&mut self, selection: usize, seat: usize) -> Result<State> {
        let action = self.state.action;

        if selection == 0 {
            self.num_passed = self.active_players.len();
            return Ok(State::new(Phase::ResolveAction, action));
        }

        let claim = *action.blockers()
            .get(selection - 1)
            .ok_or_else(|| self.invalid(selection, seat))?;

        if seat == self.current_player_idx || seat >= self.players.len() || self.is_player_dead(seat) {
            return Err(self.invalid(selection, seat));
        }

        self.blocker_player_idx = Some(seat);
        self.block_type = Some(claim);
        self.log(format!("{} is claiming {} to block {}'s {}", self.name(seat), claim, self.name(self.current_player_idx), action));

        Ok(State::new(Phase::ChallengeBlock, action))
    }

    fn challenge_block(&mut self, selection: usize, seat: usize) -> Result<State> {
        let blocker = self.require(self.blocker_player_idx)?;
        let claim = self.block_type.ok_or(CoupError::UnhandledState(self.state))?;

        match selection {
            0 => {
                // an unchallenged block ends the turn
                self.num_passed = self.active_players.len();
                self.log(format!("{} successfully blocks {}'s {} attempt!", self.name(blocker), self.name(self.current_player_idx), self.state.action));
                Ok(self.go_next_turn())
            }
            1 => {
                if seat == blocker || seat >= self.players.len() || self.is_player_dead(seat) {
                    return Err(self.invalid(selection, seat));
                }
                self.challenger_player_idx = Some(seat);
                self.log(format!("{} is challenging the {} claim of {}", self.name(seat), claim, self.name(blocker)));
                Ok(State::new(Phase::BlockReveal, self.state.action))
            }
            _ => Err(self.invalid(selection, seat)),
        }
    }

    fn block_reveal(&mut self, selection: usize, seat: usize) -> Result<State> {
        let blocker = self.require(self.blocker_player_idx)?;
        let challenger = self.require(self.challenger_player_idx)?;
        let claim = self.block_type.ok_or(CoupError::UnhandledState(self.state))?;
        let revealed = *self.players[blocker].cards_held.get(selection).ok_or_else(|| self.invalid(selection, seat))?;

        self.log(format!("{} reveals... {}!", self.name(blocker), revealed));

        if revealed == claim {
            self.log(format!("Challenge fails. {} returns {} to the deck and draws a new card", self.name(blocker), revealed));
            self.replace_influence_card(blocker, selection)?;
            self.log(format!("{} must lose influence", self.name(challenger)));
            Ok(State::new(Phase::BlockLoss, self.state.action))
        } else {
            // a failed block lets the original action through
            self.lose_influence_card(blocker, selection)?;
            self.log(format!("Challenge succeeds. {} loses {} and {}'s {} continues!", self.name(blocker), revealed, self.name(self.current_player_idx), self.state.action));
            Ok(State::new(Phase::ResolveAction, self.state.action))
        }
    }

    fn block_loss(&mut self, selection: usize, seat: usize) -> Result<State> {
        let challenger = self.require(self.challenger_player_idx)?;
        if seat != challenger {
            return Err(self.invalid(selection, seat));
        }

        let lost = self.lose_influence_card(challenger, selection)?;
        self.log(format!("{} chooses to lose {}", self.name(challenger), lost));

        // the block held
        Ok(self.go_next_turn())
    }

    fn resolve_action(&mut self, selection: usize, seat: usize) -> Result<State> {
        let current = self.current_player_idx;

        match self.state.action {
            Action::Income => {
                self.players[current].coins = self.players[current].coins.saturating_add(1);
                self.log(format!("{} gains 1 coin", self.name(current)));
            }
            Action::ForeignAid => {
                self.players[current].coins = self.players[current].coins.saturating_add(2);
                self.log(format!("{} gains 2 coins", self.name(current)));
            }
            Action::Tax => {
                self.players[current].coins = self.players[current].coins.saturating_add(3);
                self.log(format!("{} gains 3 coins", self.name(current)));
            }
            Action::Coup | Action::Assassinate => {
                let target = self.require(self.target_player_idx)?;
                // target could already be dead from losing a challenge
                if !self.is_player_dead(target) {
                    if seat != target {
                        return Err(self.invalid(selection, seat));
                    }
                    let lost = self.lose_influence_card(target, selection)?;
                    self.log(format!("{} loses {}", self.name(target), lost));
                }
            }
            Action::Steal => {
                let target = self.require(self.target_player_idx)?;
                let stolen = self.players[target].coins.min(2);
                self.players[target].coins -= stolen;
                self.players[current].coins = self.players[current].coins.saturating_add(stolen);
                self.log(format!("{} steals {} coins from {}", self.name(current), stolen, self.name(target)));
            }
            Action::Exchange => {
                // draw before asking which cards go back
                for _ in 0..2 {
                    if let Some(card) = self.deck.draw(&mut self.rng) {
                        self.players[current].cards_held.push(card);
                    }
                }
                self.log(format!("{} draws 2 cards", self.name(current)));
                return Ok(State::new(Phase::ExchangeMiddle, Action::Exchange));
            }
            Action::NoAction => return Err(CoupError::UnhandledState(self.state)),
        }

        Ok(self.go_next_turn())
    }

    fn exchange_middle(&mut self, selection: usize, seat: usize) -> Result<State> {
        let current = self.current_player_idx;
        if selection >= self.players[current].cards_held.len() {
            return Err(self.invalid(selection, seat));
        }

        // held aside so the choice can be undone in the next phase
        let card = self.players[current].cards_held.remove(selection);
        self.returned_cards.push(card);

        Ok(State::new(Phase::ExchangeFinal, Action::Exchange))
    }

    fn exchange_final(&mut self, selection: usize, seat: usize) -> Result<State> {
        let current = self.current_player_idx;

        if selection == 0 {
            let returned = std::mem::take(&mut self.returned_cards);
            self.players[current].cards_held.extend(returned);
            return Ok(State::new(Phase::ExchangeMiddle, Action::Exchange));
        }

        // 0 means cancel, so the menu is 1-based
        let card_idx = selection - 1;
        if card_idx >= self.players[current].cards_held.len() {
            return Err(self.invalid(selection, seat));
        }

        let card = self.players[current].cards_held.remove(card_idx);
        self.returned_cards.push(card);

        let returned = std::mem::take(&mut self.returned_cards);
        self.deck.return_cards(returned);
        self.log(format!("{} returns 2 chosen cards to the deck", self.name(current)));

        Ok(self.go_next_turn())
    }
}
