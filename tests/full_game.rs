use std::sync::Arc;
use std::time::Duration;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tokio::sync::watch;
use coup_rs::game_loop::run_game;
use coup_rs::{Controller, CoupError, GameConfig, Phase, Player};

fn config(seats: usize, seed: u64) -> GameConfig {
    GameConfig {
        seats,
        seed: Some(seed),
        bot_delay: Duration::ZERO,
        ..GameConfig::default()
    }
}

fn bots(num_players: usize) -> Vec<Player> {
    (0..num_players)
        .map(|idx| Player::new(format!("Bot {idx}"), idx, false, false).unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bots_play_to_the_end() {
    for seats in 2..=6 {
        let config = config(seats, seats as u64);
        let mut controller = Controller::new(bots(seats), Pcg64::seed_from_u64(seats as u64)).unwrap();
        controller.shuffle_and_deal();
        let (snapshots, rx) = watch::channel(Arc::new(controller.snapshot()));

        let victor = tokio::time::timeout(
            Duration::from_secs(30),
            run_game(controller, &config, tokio::io::empty(), snapshots),
        )
        .await
        .expect("game should finish")
        .unwrap()
        .expect("someone should win");

        let last = Arc::clone(&rx.borrow());
        assert_eq!(last.state.phase, Phase::EndGame);
        assert_eq!(last.victor, Some(victor));
        assert!(last.players[victor].is_alive());
        for player in last.players.iter() {
            assert_eq!(player.cards_held.len() + player.cards_lost.len(), 2);
            assert_eq!(player.is_alive(), player.index == victor);
        }
        assert!(last.log.last().is_some_and(|line| line.ends_with("is the victor!")));
    }
}

#[tokio::test]
async fn quit_from_the_first_prompt() {
    let config = config(4, 7);
    let controller = Controller::from_config(&config).unwrap();
    let (snapshots, _rx) = watch::channel(Arc::new(controller.snapshot()));

    let result = run_game(controller, &config, &b"9q"[..], snapshots).await;
    assert!(matches!(result, Err(CoupError::Quit)));
}

#[tokio::test]
async fn closed_input_is_an_error() {
    let config = config(3, 7);
    let controller = Controller::from_config(&config).unwrap();
    let (snapshots, _rx) = watch::channel(Arc::new(controller.snapshot()));

    // seat 0 is asked first and never answers
    let result = run_game(controller, &config, tokio::io::empty(), snapshots).await;
    assert!(matches!(result, Err(CoupError::Io(_))));
}
