use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use tokio::sync::watch;
use coup_rs::action_log::DEFAULT_LOG_CAPACITY;
use coup_rs::config::DEFAULT_CHALLENGE_RATE;
use coup_rs::display::{render_loop, TerminalGuard};
use coup_rs::game_loop::run_game;
use coup_rs::{logging, Controller, GameConfig, Result};

#[derive(Parser, Debug)]
#[command(name = "coup")]
#[command(about = "Play Coup against bots in the terminal. Press q at any time to quit.", long_about = None)]
struct Args {
    /// Seats at the table, including yours
    #[arg(long, short = 'n', default_value_t = 4, value_parser = clap::value_parser!(u8).range(2..=6))]
    seats: u8,

    /// Seed for a reproducible game
    #[arg(long)]
    seed: Option<u64>,

    /// Where the diagnostic log goes
    #[arg(long, default_value = "debug.log")]
    log_file: PathBuf,

    /// How long bots think before acting, in milliseconds
    #[arg(long, default_value_t = 750)]
    bot_delay: u64,

    /// Percent chance a bot challenges or bluffs a block
    #[arg(long, default_value_t = DEFAULT_CHALLENGE_RATE)]
    challenge_rate: u8,

    /// Lines of history kept on screen
    #[arg(long, default_value_t = DEFAULT_LOG_CAPACITY)]
    log_capacity: usize,

    #[arg(long, default_value = "Human")]
    name: String,
}

impl From<Args> for GameConfig {
    fn from(args: Args) -> Self {
        Self {
            seats: args.seats as usize,
            seed: args.seed,
            log_capacity: args.log_capacity,
            challenge_rate: args.challenge_rate,
            bot_delay: Duration::from_millis(args.bot_delay),
            log_path: args.log_file,
            human_name: args.name,
        }
    }
}

fn main() -> ExitCode {
    let config = GameConfig::from(Args::parse());

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_quit() => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &GameConfig) -> Result<()> {
    config.validate()?;
    logging::init(&config.log_path)?;
    log::info!("starting with {:?}", config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(play(config));

    // a pending stdin read can't be cancelled, so don't wait for it
    runtime.shutdown_background();
    result
}

async fn play(config: &GameConfig) -> Result<()> {
    let controller = Controller::from_config(config)?;
    let (snapshots, rx) = watch::channel(Arc::new(controller.snapshot()));

    let guard = TerminalGuard::enter()?;
    let renderer = tokio::spawn(render_loop(rx));

    let result = run_game(controller, config, tokio::io::stdin(), snapshots).await;

    // the renderer stops once the game drops its sender
    let rendered = renderer.await;
    drop(guard);

    let victor = result?;
    rendered??;

    if let Some(victor) = victor {
        log::info!("victor: seat {victor}");
    }
    Ok(())
}
