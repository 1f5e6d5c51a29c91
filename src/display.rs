use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, Stylize};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use tokio::sync::watch;
use crate::action::{Action, Phase};
use crate::player::Player;
use crate::snapshot::Snapshot;
use crate::{Card, Result};

/// ~30 frames a second.
pub const FRAME: Duration = Duration::from_millis(33);

/// Raw mode on an alternate screen for as long as it lives.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

fn card_color(card: Card) -> Color {
    match card {
        Card::Ambassador => Color::Green,
        Card::Assassin => Color::Grey,
        Card::Captain => Color::Cyan,
        Card::Contessa => Color::Red,
        Card::Duke => Color::Magenta,
    }
}

/// Draws snapshots. Never changes anything.
#[derive(Copy, Clone, Debug, Default)]
pub struct Screen {
    styled: bool,
}

impl Screen {
    pub fn plain() -> Self {
        Self { styled: false }
    }

    pub fn styled() -> Self {
        Self { styled: true }
    }

    fn card(&self, card: Card) -> String {
        if self.styled {
            card.name().with(card_color(card)).to_string()
        } else {
            card.name().to_string()
        }
    }

    fn hand(&self, cards: &[Card]) -> String {
        let cards = cards.iter().map(|&card| self.card(card)).collect::<Vec<String>>();
        format!("[{}]", cards.join(" | "))
    }

    /// Everyone else only sees the cards that were lost.
    fn public_hand(player: &Player) -> String {
        let mut shown = player.cards_lost.iter().map(Card::short).collect::<Vec<String>>();
        while shown.len() < 2 {
            shown.push("???".to_string());
        }
        format!("[{}]", shown.join(" | "))
    }

    pub fn lines(&self, snapshot: &Snapshot) -> Vec<String> {
        let mut lines = vec![format!("{:>27}", "=== COUP ==="), String::new()];

        if snapshot.state.phase == Phase::EndGame {
            if let Some(victor) = snapshot.victor.and_then(|seat| snapshot.player(seat)) {
                lines.push(format!("The game is over, and {} is the victor!", victor.name));
            }
            lines.push("Press any key to leave.".to_string());
            return lines;
        }

        for player in snapshot.players.iter() {
            let marker = if player.index == snapshot.current { ">>> " } else { "    " };
            let coins = if player.is_alive() { format!("{:2}", player.coins) } else { "~DEAD~".to_string() };
            lines.push(format!("{marker}{:<12}{coins}      {}", player.name, Self::public_hand(player)));
        }
        lines.push(String::new());

        if !snapshot.log.is_empty() {
            lines.extend(snapshot.log.iter().cloned());
            lines.push(String::new());
        }

        if let Some(local) = snapshot.local_player() {
            if !local.cards_held.is_empty() {
                lines.push(format!("    Your hand: {}", self.hand(&local.cards_held)));
                lines.push(String::new());
            }
        }

        lines.extend(self.menu(snapshot).into_iter().map(|line| format!("    {line}")));
        lines
    }

    fn menu(&self, snapshot: &Snapshot) -> Vec<String> {
        let Some(local) = snapshot.local_player().filter(|p| snapshot.is_active(p.index)) else {
            return vec!["Biding your time...".to_string()];
        };

        let numbered = |verb: &str| {
            local.cards_held.iter()
                .enumerate()
                .map(|(idx, &card)| format!("[{}] {verb} {}", idx + 1, self.card(card)))
                .collect::<Vec<String>>()
        };

        match (snapshot.state.phase, snapshot.state.action) {
            (Phase::SelectAction, _) => vec![
                "[1] Income (+1 coin)".to_string(),
                format!("[2] Foreign Aid (+2 coins; blocked by {})", self.card(Card::Duke)),
                "[3] Coup (-7 coins; target loses influence)".to_string(),
                format!("[4] Assassinate (-3 coins; target loses influence; blocked by {})", self.card(Card::Contessa)),
                "[5] Exchange (draw 2 cards, then return 2 cards)".to_string(),
                format!("[6] Steal (take up to 2 coins from target; blocked by {} or {})", self.card(Card::Ambassador), self.card(Card::Captain)),
                "[7] Tax (+3 coins)".to_string(),
                String::new(),
                "The time has come to act:".to_string(),
            ],
            (Phase::SelectTarget, _) => {
                let mut menu = vec!["And you will act upon?".to_string()];
                menu.extend(snapshot.valid_targets.iter()
                    .filter_map(|&seat| snapshot.player(seat))
                    .enumerate()
                    .map(|(idx, target)| format!("[{}] {}", idx + 1, target.name)));
                menu.push("[0] Cancel".to_string());
                menu
            }
            (Phase::MakeChallenge | Phase::ChallengeBlock, _) => vec![
                "Are they bluffing?".to_string(),
                "[1] Challenge".to_string(),
                "[0] Pass".to_string(),
            ],
            (Phase::MakeBlock, action) => {
                let mut menu = vec!["Will you block?".to_string()];
                match action {
                    Action::Steal => menu.extend(action.blockers().iter()
                        .enumerate()
                        .map(|(idx, &card)| format!("[{}] Block with {}", idx + 1, self.card(card)))),
                    _ => menu.push("[1] Block".to_string()),
                }
                menu.push("[0] Pass".to_string());
                menu
            }
            (Phase::ChallengeReveal | Phase::BlockReveal, _) => {
                let mut menu = vec!["Show the world the truth. Reveal a card:".to_string()];
                menu.extend(numbered("Reveal"));
                menu
            }
            (Phase::ChallengeLoss | Phase::BlockLoss, _)
            | (Phase::ResolveAction, Action::Coup | Action::Assassinate) => {
                let mut menu = vec!["Who has disappointed you? Choose a card to lose:".to_string()];
                menu.extend(numbered("Lose"));
                menu
            }
            (Phase::ExchangeMiddle, _) => {
                let mut menu = vec!["Who do you no longer need? (Returned 0 of 2)".to_string()];
                menu.extend(numbered("Return"));
                menu
            }
            (Phase::ExchangeFinal, _) => {
                let mut menu = vec!["Who do you no longer need? (Returned 1 of 2)".to_string()];
                menu.extend(numbered("Return"));
                menu.push("[0] Cancel".to_string());
                menu
            }
            (Phase::ResolveAction | Phase::EndGame, _) => vec![],
        }
    }

    pub fn draw<W: Write>(&self, out: &mut W, snapshot: &Snapshot) -> Result<()> {
        queue!(out, Clear(ClearType::All))?;
        for (row, line) in self.lines(snapshot).iter().enumerate() {
            queue!(out, MoveTo(0, row as u16), Print(line))?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Redraws whenever a new snapshot has been published, until the game drops
/// its sender.
pub async fn render_loop(mut snapshots: watch::Receiver<Arc<Snapshot>>) -> Result<()> {
    let screen = Screen::styled();
    let mut clock = tokio::time::interval(FRAME);
    let mut stdout = io::stdout();
    let mut first = true;

    loop {
        clock.tick().await;

        match snapshots.has_changed() {
            Ok(changed) if changed || first => {}
            Ok(_) => continue,
            Err(_) => return Ok(()),
        }
        first = false;

        let snapshot = Arc::clone(&snapshots.borrow_and_update());
        screen.draw(&mut stdout, &snapshot)?;
    }
}
