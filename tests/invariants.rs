use rand::SeedableRng;
use rand_pcg::Pcg64;
use coup_rs::bot::decide;
use coup_rs::input::accepted_selection;
use coup_rs::{Action, Controller, InputData, Phase, Player, Snapshot, State};

fn respond(snapshot: &Snapshot, rng: &mut Pcg64) -> InputData {
    match (snapshot.state.phase, snapshot.state.action) {
        (Phase::MakeChallenge | Phase::ChallengeBlock, _) | (Phase::MakeBlock, Action::ForeignAid) => {
            for &seat in snapshot.active.iter() {
                if decide(snapshot, seat, rng, 30) == Some(1) {
                    return InputData::new(1, seat);
                }
            }
            InputData::new(0, snapshot.current)
        }
        _ => match snapshot.active.first() {
            Some(&seat) => {
                let digit = decide(snapshot, seat, rng, 30).expect("bots always have an answer mid-game");
                let selection = accepted_selection(snapshot, seat, digit as usize).expect("bot answers are valid");
                InputData::new(selection, seat)
            }
            None => InputData::new(0, snapshot.current),
        },
    }
}

fn bots(num_players: usize) -> Vec<Player> {
    (0..num_players)
        .map(|idx| Player::new(format!("Bot {idx}"), idx, false, false).unwrap())
        .collect()
}

fn check(coup: &Controller) {
    assert_eq!(coup.total_cards(), 15, "{:?}", coup);

    let snapshot = coup.snapshot();
    for &seat in snapshot.valid_targets.iter() {
        assert!(coup.players()[seat].is_alive(), "dead seat {seat} is targetable\n{:?}", coup);
    }
    for &seat in snapshot.active.iter() {
        if snapshot.state.phase != Phase::EndGame {
            assert!(coup.players()[seat].is_alive(), "dead seat {seat} is active\n{:?}", coup);
        }
    }

    if coup.state() == State::initial() {
        assert!(coup.players()[coup.current()].is_alive());
        assert_eq!(coup.target(), None);
        assert_eq!(coup.challenger(), None);
        assert_eq!(coup.blocker(), None);
        assert_eq!(coup.block_type(), None);
        for player in coup.players() {
            assert_eq!(player.cards_held.len() + player.cards_lost.len(), 2, "{:?}", coup);
        }
    }
}

#[test]
fn random_games_keep_invariants() {
    for num_players in 2..=6 {
        for seed in 0..25u64 {
            let mut rng = Pcg64::seed_from_u64(seed * 7 + num_players as u64);
            let mut coup = Controller::new(bots(num_players), Pcg64::seed_from_u64(seed)).unwrap();
            coup.shuffle_and_deal();
            check(&coup);

            let mut finished = false;
            for _ in 0..10_000 {
                let snapshot = coup.snapshot();
                if coup.state() == State::end() {
                    finished = true;
                    break;
                }

                coup.update_game(respond(&snapshot, &mut rng)).unwrap();
                check(&coup);
            }

            assert!(finished, "{num_players} seats, seed {seed} never finished\n{:?}", coup);

            let victor = coup.victor().unwrap();
            assert!(coup.players()[victor].is_alive());
            assert_eq!(coup.players().iter().filter(|p| p.is_alive()).count(), 1);
        }
    }
}

#[test]
fn same_seed_same_game() {
    let play = || {
        let mut rng = Pcg64::seed_from_u64(99);
        let mut coup = Controller::new(bots(4), Pcg64::seed_from_u64(99)).unwrap();
        coup.shuffle_and_deal();
        while coup.state() != State::end() {
            let snapshot = coup.snapshot();
            coup.update_game(respond(&snapshot, &mut rng)).unwrap();
        }
        (coup.victor(), coup.turn(), coup.action_log().to_vec())
    };

    assert_eq!(play(), play());
}

#[test]
fn five_seat_assassination() {
    let mut coup = Controller::new(
        Player::table(5, "Human").unwrap(),
        Pcg64::seed_from_u64(2024),
    ).unwrap();
    coup.shuffle_and_deal();

    // three rounds of income gets seat 0 from 2 to 5 coins, then tax to 8
    for _ in 0..15 {
        coup.update_game(InputData::new(1, coup.current())).unwrap();
        coup.update_game(InputData::new(0, coup.current())).unwrap();
    }
    assert_eq!(coup.current(), 0);
    assert_eq!(coup.players()[0].coins, 5);
    coup.update_game(InputData::new(7, 0)).unwrap();
    coup.update_game(InputData::new(0, 0)).unwrap();
    coup.update_game(InputData::new(0, 0)).unwrap();
    for _ in 0..4 {
        coup.update_game(InputData::new(1, coup.current())).unwrap();
        coup.update_game(InputData::new(0, coup.current())).unwrap();
    }
    assert_eq!(coup.players()[0].coins, 8);
    assert_eq!(coup.state(), State::initial());

    coup.update_game(InputData::new(4, 0)).unwrap();
    assert_eq!(coup.state(), State::new(Phase::SelectTarget, Action::Assassinate));

    coup.update_game(InputData::new(2, 0)).unwrap();
    assert_eq!(coup.state(), State::new(Phase::MakeChallenge, Action::Assassinate));
    assert_eq!(coup.target(), Some(2));
    assert_eq!(coup.players()[0].coins, 5);
    assert_eq!(coup.active_players(), &[1, 2, 3, 4]);
}
