use std::sync::Arc;
use futures::future::select_all;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use crate::action::{Action, Phase, State};
use crate::snapshot::{InputData, Snapshot};
use crate::{CoupError, Result};

/// Signals a seat may have in flight before the handler drains them.
pub const SIGNAL_BUFFER: usize = 1;

pub const QUIT_KEY: u8 = b'q';

/// Where producers report anything that should end the game.
pub type ErrorSender = mpsc::UnboundedSender<CoupError>;

/// One keystroke-equivalent from a seat. Bots stamp the step of the snapshot
/// they answered so that answers to an old question can be told apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Signal {
    pub key: u8,
    pub step: Option<u64>,
}

impl Signal {
    pub fn key(key: u8) -> Self {
        Self { key, step: None }
    }

    pub fn selection(selection: u8, step: u64) -> Self {
        Self { key: b'0' + selection, step: Some(step) }
    }

    pub fn digit(&self) -> Option<usize> {
        (self.key as char).to_digit(10).map(|digit| digit as usize)
    }

    fn answers(&self, snapshot: &Snapshot) -> bool {
        self.step.map_or(true, |step| step == snapshot.step)
    }
}

/// The selection the controller expects if `seat` presses `digit` right now,
/// or None when the key means nothing in this state.
pub fn accepted_selection(snapshot: &Snapshot, seat: usize, digit: usize) -> Option<usize> {
    let player = snapshot.player(seat)?;
    let held = player.cards_held.len();
    // cards are shown 1-based
    let card_choice = (1..=held).contains(&digit).then(|| digit - 1);

    match (snapshot.state.phase, snapshot.state.action) {
        (Phase::SelectAction, _) => Action::from_selection(digit)
            .filter(|action| action.is_affordable(player.coins))
            .map(|_| digit),
        (Phase::SelectTarget, _) => (digit <= snapshot.valid_targets.len()).then_some(digit),
        (Phase::MakeChallenge | Phase::ChallengeBlock, _) => (digit <= 1).then_some(digit),
        (Phase::MakeBlock, action) => (digit <= action.blockers().len()).then_some(digit),
        (Phase::ChallengeReveal
        | Phase::ChallengeLoss
        | Phase::BlockReveal
        | Phase::BlockLoss
        | Phase::ExchangeMiddle, _) => card_choice,
        (Phase::ResolveAction, Action::Coup | Action::Assassinate) => card_choice,
        (Phase::ResolveAction, _) => Some(0),
        (Phase::ExchangeFinal, _) => (digit <= held).then_some(digit),
        (Phase::EndGame, _) => Some(0),
    }
}

/// Turns the raw signals of every seat into exactly one [`InputData`] per
/// controller step.
pub struct InputHandler {
    // None once the producer has hung up
    receivers: Vec<Option<mpsc::Receiver<Signal>>>,
    snapshot: Option<Arc<Snapshot>>,
}

impl InputHandler {
    pub fn new(num_seats: usize) -> (Self, Vec<mpsc::Sender<Signal>>) {
        Self::with_buffer(num_seats, SIGNAL_BUFFER)
    }

    pub fn with_buffer(num_seats: usize, buffer: usize) -> (Self, Vec<mpsc::Sender<Signal>>) {
        let (senders, receivers) = (0..num_seats)
            .map(|_| {
                let (tx, rx) = mpsc::channel(buffer);
                (tx, Some(rx))
            })
            .unzip();

        (Self { receivers, snapshot: None }, senders)
    }

    pub fn update_state_data(&mut self, snapshot: Arc<Snapshot>) {
        self.snapshot = Some(snapshot);
    }

    /// Waits until an eligible seat sends something valid for the current state.
    pub async fn get_input_data(&mut self) -> Result<InputData> {
        let snapshot = self.snapshot.clone().ok_or(CoupError::UnhandledState(State::initial()))?;

        if snapshot.active.is_empty() {
            return Ok(InputData::new(0, snapshot.current));
        }

        match (snapshot.state.phase, snapshot.state.action) {
            (Phase::MakeChallenge | Phase::ChallengeBlock, _)
            | (Phase::MakeBlock, Action::ForeignAid) => self.collect_responses(&snapshot).await,
            (Phase::ResolveAction, Action::Coup | Action::Assassinate) => self.single_response(&snapshot).await,
            (Phase::ResolveAction, _) => Ok(InputData::new(0, snapshot.current)),
            _ => self.single_response(&snapshot).await,
        }
    }

    async fn single_response(&mut self, snapshot: &Snapshot) -> Result<InputData> {
        loop {
            if snapshot.active.iter().all(|&seat| self.hung_up(seat)) {
                return Err(no_input());
            }

            let (seat, Some(signal)) = self.next_signal().await? else {
                continue;
            };
            if !snapshot.is_active(seat) || !signal.answers(snapshot) {
                log::trace!("dropped {:?} from seat {seat}", signal);
                continue;
            }

            if let Some(selection) = signal.digit().and_then(|digit| accepted_selection(snapshot, seat, digit)) {
                return Ok(InputData::new(selection, seat));
            }
        }
    }

    // anyone may challenge or block; the first 1 wins, otherwise everyone has passed
    async fn collect_responses(&mut self, snapshot: &Snapshot) -> Result<InputData> {
        let mut waiting = snapshot.active.clone();

        while !waiting.is_empty() {
            if waiting.iter().any(|&seat| self.hung_up(seat)) {
                return Err(no_input());
            }

            let (seat, Some(signal)) = self.next_signal().await? else {
                continue;
            };
            if !waiting.contains(&seat) || !signal.answers(snapshot) {
                log::trace!("dropped {:?} from seat {seat}", signal);
                continue;
            }

            match signal.digit() {
                Some(0) => waiting.retain(|&s| s != seat),
                Some(1) => return Ok(InputData::new(1, seat)),
                _ => {}
            }
        }

        Ok(InputData::new(0, snapshot.current))
    }

    fn hung_up(&self, seat: usize) -> bool {
        self.receivers.get(seat).map_or(true, |rx| rx.is_none())
    }

    // the next signal from any seat still connected; None means that seat just hung up
    async fn next_signal(&mut self) -> Result<(usize, Option<Signal>)> {
        let pending = self.receivers.iter_mut()
            .enumerate()
            .filter_map(|(seat, rx)| rx.as_mut().map(|rx| Box::pin(async move { (seat, rx.recv().await) })))
            .collect::<Vec<_>>();

        if pending.is_empty() {
            return Err(no_input());
        }

        let ((seat, signal), _, _) = select_all(pending).await;
        if signal.is_none() {
            log::debug!("seat {seat} hung up");
            self.receivers[seat] = None;
        }

        Ok((seat, signal))
    }
}

fn no_input() -> CoupError {
    CoupError::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "a seat that has to answer stopped sending input",
    ))
}

/// Forwards keystrokes from `reader` to the human seat until it closes.
/// `q` quits the game from anywhere.
pub async fn human_input_stream<R: AsyncRead + Unpin>(mut reader: R, tx: mpsc::Sender<Signal>, errors: ErrorSender) {
    let mut buf = [0u8; 1];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                log::debug!("human input closed");
                return;
            }
            Ok(_) if buf[0] == QUIT_KEY => {
                let _ = errors.send(CoupError::Quit);
                return;
            }
            Ok(_) => {
                if tx.send(Signal::key(buf[0])).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                let _ = errors.send(CoupError::Io(err));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use tokio::sync::mpsc;
    use crate::action::{Action, Phase};
    use crate::controller::Controller;
    use crate::input::{accepted_selection, human_input_stream, InputHandler, Signal};
    use crate::player::Player;
    use crate::snapshot::InputData;
    use crate::CoupError;

    fn new_game(num_players: usize) -> Controller {
        let players = Player::table(num_players, "Human").unwrap();
        let mut coup = Controller::new(players, Pcg64::seed_from_u64(3)).unwrap();
        coup.shuffle_and_deal();
        coup
    }

    #[test]
    fn select_action_keys() {
        let coup = new_game(3);
        let snapshot = coup.snapshot();

        assert_eq!(accepted_selection(&snapshot, 0, 1), Some(1));
        assert_eq!(accepted_selection(&snapshot, 0, 7), Some(7));
        // 2 coins: no coup, no assassination
        assert_eq!(accepted_selection(&snapshot, 0, 3), None);
        assert_eq!(accepted_selection(&snapshot, 0, 4), None);
        assert_eq!(accepted_selection(&snapshot, 0, 8), None);
        assert_eq!(accepted_selection(&snapshot, 0, 0), None);
    }

    #[tokio::test]
    async fn drops_inactive_and_invalid() {
        let coup = new_game(3);
        let (mut handler, senders) = InputHandler::with_buffer(3, 4);
        handler.update_state_data(Arc::new(coup.snapshot()));

        senders[1].send(Signal::key(b'1')).await.unwrap();
        senders[0].send(Signal::key(b'3')).await.unwrap();
        senders[0].send(Signal::key(b'x')).await.unwrap();
        senders[0].send(Signal::key(b'7')).await.unwrap();

        let input = handler.get_input_data().await.unwrap();
        assert_eq!(input, InputData::new(7, 0));
    }

    #[tokio::test]
    async fn drops_stale_bot_answers() {
        let mut coup = new_game(3);
        coup.update_game(InputData::new(7, 0)).unwrap();
        let snapshot = coup.snapshot();
        assert_eq!(snapshot.state.phase, Phase::MakeChallenge);

        let (mut handler, senders) = InputHandler::with_buffer(3, 4);
        handler.update_state_data(Arc::new(snapshot.clone()));

        senders[1].send(Signal::selection(1, snapshot.step - 1)).await.unwrap();
        senders[1].send(Signal::selection(0, snapshot.step)).await.unwrap();
        senders[2].send(Signal::selection(0, snapshot.step)).await.unwrap();

        let input = handler.get_input_data().await.unwrap();
        assert_eq!(input, InputData::new(0, 0));
    }

    #[tokio::test]
    async fn first_challenge_wins() {
        let mut coup = new_game(4);
        coup.update_game(InputData::new(7, 0)).unwrap();

        let (mut handler, senders) = InputHandler::with_buffer(4, 4);
        handler.update_state_data(Arc::new(coup.snapshot()));

        senders[1].send(Signal::key(b'0')).await.unwrap();
        // a seat only answers once
        senders[1].send(Signal::key(b'1')).await.unwrap();
        senders[3].send(Signal::key(b'1')).await.unwrap();

        let input = handler.get_input_data().await.unwrap();
        assert_eq!(input, InputData::new(1, 3));
    }

    #[tokio::test]
    async fn card_choices_are_zero_based() {
        let mut coup = new_game(3);
        coup.update_game(InputData::new(7, 0)).unwrap();
        coup.update_game(InputData::new(1, 2)).unwrap();
        assert_eq!(coup.state().phase, Phase::ChallengeReveal);

        let (mut handler, senders) = InputHandler::with_buffer(3, 4);
        handler.update_state_data(Arc::new(coup.snapshot()));

        senders[0].send(Signal::key(b'0')).await.unwrap();
        senders[0].send(Signal::key(b'3')).await.unwrap();
        senders[0].send(Signal::key(b'2')).await.unwrap();

        let input = handler.get_input_data().await.unwrap();
        assert_eq!(input, InputData::new(1, 0));
    }

    #[tokio::test]
    async fn no_input_needed() {
        let mut coup = new_game(3);
        coup.update_game(InputData::new(1, 0)).unwrap();
        assert_eq!(coup.state().action, Action::Income);

        let (mut handler, _senders) = InputHandler::new(3);
        handler.update_state_data(Arc::new(coup.snapshot()));

        let input = handler.get_input_data().await.unwrap();
        assert_eq!(input, InputData::new(0, 0));
    }

    #[tokio::test]
    async fn everyone_hung_up() {
        let coup = new_game(2);
        let (mut handler, senders) = InputHandler::new(2);
        handler.update_state_data(Arc::new(coup.snapshot()));
        drop(senders);

        let result = handler.get_input_data().await;
        assert!(matches!(result, Err(CoupError::Io(_))));
    }

    #[tokio::test]
    async fn responder_hung_up() {
        let mut coup = new_game(3);
        coup.update_game(InputData::new(7, 0)).unwrap();

        let (mut handler, mut senders) = InputHandler::with_buffer(3, 4);
        handler.update_state_data(Arc::new(coup.snapshot()));
        senders[2].send(Signal::key(b'0')).await.unwrap();
        // seat 1 leaves, seat 0 stays connected but silent
        drop(senders.remove(1));

        let result = handler.get_input_data().await;
        assert!(matches!(result, Err(CoupError::Io(_))));
    }

    #[tokio::test]
    async fn human_quits() {
        let (tx, mut rx) = mpsc::channel(4);
        let (errors, mut error_rx) = mpsc::unbounded_channel();

        human_input_stream(&b"12q3"[..], tx, errors).await;

        assert_eq!(rx.recv().await, Some(Signal::key(b'1')));
        assert_eq!(rx.recv().await, Some(Signal::key(b'2')));
        assert_eq!(rx.recv().await, None);
        assert!(matches!(error_rx.recv().await, Some(CoupError::Quit)));
    }

    #[tokio::test]
    async fn human_input_ends() {
        let (tx, mut rx) = mpsc::channel(4);
        let (errors, mut error_rx) = mpsc::unbounded_channel();

        human_input_stream(&b"5"[..], tx, errors).await;

        assert_eq!(rx.recv().await.and_then(|s| s.digit()), Some(5));
        assert_eq!(rx.recv().await, None);
        assert!(error_rx.recv().await.is_none());
    }
}
