use std::sync::Arc;
use std::time::Duration;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_pcg::Pcg64;
use tokio::sync::{mpsc, watch};
use crate::action::{Action, Phase};
use crate::input::{accepted_selection, ErrorSender, Signal};
use crate::snapshot::Snapshot;
use crate::{Card, CoupError, Result};

/// Attempts at finding a legal answer before a bot gives up.
pub const MAX_ATTEMPTS: usize = 10;

pub struct Bot {
    pub seat: usize,
    pub challenge_rate: u8,
    pub delay: Duration,
    pub rng: Pcg64,
}

fn rolls<R: Rng + ?Sized>(rng: &mut R, rate: u8) -> bool {
    rng.gen_range(0..100) < rate
}

fn pick_card<R: Rng + ?Sized>(rng: &mut R, held: usize) -> Option<u8> {
    (held > 0).then(|| rng.gen_range(1..=held) as u8)
}

/// What `seat` would press for the question in `snapshot`, or None if it
/// has nothing to say.
pub fn decide<R: Rng + ?Sized>(snapshot: &Snapshot, seat: usize, rng: &mut R, challenge_rate: u8) -> Option<u8> {
    let player = snapshot.player(seat)?;
    let held = player.cards_held.len();
    // shown 1-based on the menu
    let reveal = |claim: Option<Card>| claim.and_then(|card| player.holds(card)).map(|idx| idx as u8 + 1);

    match (snapshot.state.phase, snapshot.state.action) {
        (Phase::SelectAction, _) => {
            let legal = (1..=7)
                .filter_map(Action::from_selection)
                .filter(|action| action.is_affordable(player.coins))
                .collect::<Vec<Action>>();
            legal.choose(rng).map(|action| action.selection() as u8)
        }
        (Phase::SelectTarget, _) => {
            let num_targets = snapshot.valid_targets.len();
            (num_targets > 0).then(|| rng.gen_range(1..=num_targets) as u8)
        }
        (Phase::MakeChallenge | Phase::ChallengeBlock, _) => Some(rolls(rng, challenge_rate) as u8),
        (Phase::MakeBlock, action) => {
            let blockers = action.blockers();
            // block for real when we can
            if let Some(idx) = blockers.iter().position(|&card| player.holds(card).is_some()) {
                return Some(idx as u8 + 1);
            }
            if !blockers.is_empty() && rolls(rng, challenge_rate) {
                Some(rng.gen_range(1..=blockers.len()) as u8)
            } else {
                Some(0)
            }
        }
        (Phase::ChallengeReveal, action) => reveal(action.card()).or_else(|| pick_card(rng, held)),
        (Phase::BlockReveal, _) => reveal(snapshot.block_type).or_else(|| pick_card(rng, held)),
        (Phase::ChallengeLoss | Phase::BlockLoss | Phase::ExchangeMiddle, _) => pick_card(rng, held),
        (Phase::ResolveAction, Action::Coup | Action::Assassinate) => pick_card(rng, held),
        (Phase::ResolveAction, _) => Some(0),
        // never second-guesses an exchange
        (Phase::ExchangeFinal, _) => pick_card(rng, held),
        (Phase::EndGame, _) => None,
    }
}

impl Bot {
    pub fn new(seat: usize, challenge_rate: u8, delay: Duration, rng: Pcg64) -> Self {
        Self { seat, challenge_rate, delay, rng }
    }

    /// A legal answer, retrying the random choice a bounded number of times.
    pub fn answer(&mut self, snapshot: &Snapshot) -> Result<u8> {
        for _ in 0..MAX_ATTEMPTS {
            let Some(selection) = decide(snapshot, self.seat, &mut self.rng, self.challenge_rate) else {
                continue;
            };
            if accepted_selection(snapshot, self.seat, selection as usize).is_some() {
                return Ok(selection);
            }
        }

        Err(CoupError::BotExhausted {
            seat: self.seat,
            phase: snapshot.state.phase,
            attempts: MAX_ATTEMPTS,
        })
    }

    fn has_question(&self, snapshot: &Snapshot) -> bool {
        snapshot.is_active(self.seat)
            && !matches!(
                (snapshot.state.phase, snapshot.state.action),
                (Phase::EndGame, _) | (Phase::ResolveAction, Action::Income | Action::ForeignAid | Action::Tax | Action::Steal | Action::Exchange)
            )
    }

    /// Challenges and blocks get a longer, jittered pause; everything else
    /// waits the base delay.
    pub fn pause(&mut self, snapshot: &Snapshot) -> Duration {
        if self.delay.is_zero() {
            return Duration::ZERO;
        }

        match snapshot.state.phase {
            Phase::MakeChallenge | Phase::MakeBlock | Phase::ChallengeBlock => {
                self.delay * 2 + self.delay.mul_f64(self.rng.gen_range(0.0..=2.0))
            }
            _ => self.delay,
        }
    }

    /// Answers every snapshot in which this seat is asked something, until the
    /// seat is knocked out or the game ends.
    pub async fn run(mut self, mut snapshots: watch::Receiver<Arc<Snapshot>>, tx: mpsc::Sender<Signal>, errors: ErrorSender) {
        loop {
            let snapshot = Arc::clone(&snapshots.borrow_and_update());

            let alive = snapshot.player(self.seat).is_some_and(|p| p.is_alive());
            if snapshot.is_over() || !alive {
                log::debug!("bot {} is done", self.seat);
                return;
            }

            if self.has_question(&snapshot) {
                let pause = self.pause(&snapshot);
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }

                match self.answer(&snapshot) {
                    Ok(selection) => {
                        log::trace!("bot {} answers {selection} at step {}", self.seat, snapshot.step);
                        if tx.send(Signal::selection(selection, snapshot.step)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = errors.send(err);
                        return;
                    }
                }
            }

            if snapshots.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use tokio::sync::{mpsc, watch};
    use crate::action::{Action, Phase, State};
    use crate::bot::{decide, Bot};
    use crate::controller::Controller;
    use crate::input::InputHandler;
    use crate::player::Player;
    use crate::snapshot::{InputData, Snapshot};
    use crate::Card::{Captain, Contessa, Duke};
    use crate::CoupError;

    fn snapshot(num_players: usize) -> Snapshot {
        let players = Player::table(num_players, "Human").unwrap();
        let mut coup = Controller::new(players, Pcg64::seed_from_u64(11)).unwrap();
        coup.shuffle_and_deal();
        coup.snapshot()
    }

    #[test]
    fn forced_coup() {
        let mut snapshot = snapshot(3);
        snapshot.players[0].coins = 10;
        let mut rng = Pcg64::seed_from_u64(1);

        for _ in 0..20 {
            assert_eq!(decide(&snapshot, 0, &mut rng, 20), Some(3));
        }
    }

    #[test]
    fn affordable_actions_only() {
        let snapshot = snapshot(3);
        let mut rng = Pcg64::seed_from_u64(1);

        for _ in 0..100 {
            let selection = decide(&snapshot, 0, &mut rng, 20).unwrap();
            assert!(![3, 4].contains(&selection));
        }
    }

    #[test]
    fn honest_reveal() {
        let mut snapshot = snapshot(3);
        snapshot.state = State::new(Phase::ChallengeReveal, Action::Tax);
        snapshot.players[0].cards_held = vec![Contessa, Duke];
        let mut rng = Pcg64::seed_from_u64(1);

        assert_eq!(decide(&snapshot, 0, &mut rng, 20), Some(2));

        snapshot.state = State::new(Phase::BlockReveal, Action::Steal);
        snapshot.block_type = Some(Contessa);
        assert_eq!(decide(&snapshot, 0, &mut rng, 20), Some(1));
    }

    #[test]
    fn honest_block() {
        let mut snapshot = snapshot(3);
        snapshot.state = State::new(Phase::MakeBlock, Action::Steal);
        snapshot.players[1].cards_held = vec![Duke, Captain];
        let mut rng = Pcg64::seed_from_u64(1);

        assert_eq!(decide(&snapshot, 1, &mut rng, 0), Some(2));

        // nothing to block with and never bluffs
        snapshot.players[1].cards_held = vec![Duke, Duke];
        assert_eq!(decide(&snapshot, 1, &mut rng, 0), Some(0));
    }

    #[test]
    fn always_challenges() {
        let mut snapshot = snapshot(3);
        snapshot.state = State::new(Phase::MakeChallenge, Action::Tax);
        let mut rng = Pcg64::seed_from_u64(1);

        assert_eq!(decide(&snapshot, 1, &mut rng, 100), Some(1));
        assert_eq!(decide(&snapshot, 1, &mut rng, 0), Some(0));
    }

    #[test]
    fn exhausted() {
        let mut snapshot = snapshot(3);
        snapshot.state = State::end();
        let mut bot = Bot::new(1, 20, Duration::ZERO, Pcg64::seed_from_u64(1));

        let result = bot.answer(&snapshot);
        assert!(matches!(result, Err(CoupError::BotExhausted { seat: 1, attempts: 10, .. })));
    }

    #[test]
    fn pacing() {
        let mut snapshot = snapshot(3);
        let mut bot = Bot::new(1, 20, Duration::from_millis(100), Pcg64::seed_from_u64(3));
        assert_eq!(bot.pause(&snapshot), Duration::from_millis(100));

        snapshot.state = State::new(Phase::MakeChallenge, Action::Tax);
        for _ in 0..50 {
            let pause = bot.pause(&snapshot);
            assert!(pause >= Duration::from_millis(200) && pause <= Duration::from_millis(400), "{pause:?}");
        }

        let mut fast = Bot::new(1, 20, Duration::ZERO, Pcg64::seed_from_u64(3));
        assert_eq!(fast.pause(&snapshot), Duration::ZERO);
    }

    #[tokio::test]
    async fn answers_when_asked() {
        let players = vec![
            Player::new("Alice", 0, false, false).unwrap(),
            Player::new("Bob", 1, false, false).unwrap(),
        ];
        let mut coup = Controller::new(players, Pcg64::seed_from_u64(5)).unwrap();
        coup.shuffle_and_deal();
        let snapshot = Arc::new(coup.snapshot());

        let (mut handler, senders) = InputHandler::new(2);
        handler.update_state_data(snapshot.clone());
        let (_snapshots, rx) = watch::channel(snapshot);
        let (errors, _error_rx) = mpsc::unbounded_channel();

        let bot = Bot::new(0, 20, Duration::ZERO, Pcg64::seed_from_u64(6));
        tokio::spawn(bot.run(rx, senders[0].clone(), errors));

        let InputData { selection, seat } = handler.get_input_data().await.unwrap();
        assert_eq!(seat, 0);
        assert!((1..=7).contains(&selection) && ![3, 4].contains(&selection));
    }
}
