use std::sync::Arc;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use crate::action::Phase;
use crate::bot::Bot;
use crate::config::GameConfig;
use crate::controller::Controller;
use crate::input::{human_input_stream, InputHandler};
use crate::snapshot::Snapshot;
use crate::{CoupError, Result};

/// Plays one game to the end and returns the winning seat.
///
/// Every seat gets its own producer task: the local human reads keystrokes
/// from `human_input`, bots answer the snapshots published on `snapshots`.
/// This task is the only one that touches the controller. The first error any
/// producer reports ends the game and every producer is aborted.
pub async fn run_game<R>(
    mut controller: Controller,
    config: &GameConfig,
    human_input: R,
    snapshots: watch::Sender<Arc<Snapshot>>,
) -> Result<Option<usize>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (mut handler, senders) = InputHandler::new(controller.players().len());
    let (errors, mut error_rx) = mpsc::unbounded_channel();
    let mut producers = JoinSet::new();

    let mut human_input = Some(human_input);
    for (player, tx) in controller.players().iter().zip(senders) {
        if player.is_human {
            match human_input.take() {
                Some(reader) if player.is_local => {
                    producers.spawn(human_input_stream(reader, tx, errors.clone()));
                }
                _ => log::warn!("no input source for {} in seat {}", player.name, player.index),
            }
            continue;
        }

        let rng = match config.bot_seed(player.index) {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };
        let bot = Bot::new(player.index, config.challenge_rate, config.bot_delay, rng);
        producers.spawn(bot.run(snapshots.subscribe(), tx, errors.clone()));
    }

    log::info!("game started with {} seats", controller.players().len());

    let result = consume(&mut controller, &mut handler, &mut producers, &mut error_rx, &snapshots).await;
    producers.abort_all();

    match &result {
        Ok(Some(victor)) => log::info!("seat {victor} won after {} turns", controller.turn()),
        Ok(None) => log::info!("game ended without a victor"),
        Err(err) => log::error!("game aborted: {err}"),
    }

    result
}

async fn consume(
    controller: &mut Controller,
    handler: &mut InputHandler,
    producers: &mut JoinSet<()>,
    error_rx: &mut mpsc::UnboundedReceiver<CoupError>,
    snapshots: &watch::Sender<Arc<Snapshot>>,
) -> Result<Option<usize>> {
    loop {
        let snapshot = Arc::new(controller.snapshot());
        // an identical snapshot would only make the bots answer twice
        snapshots.send_if_modified(|published| {
            if **published == *snapshot {
                return false;
            }
            *published = Arc::clone(&snapshot);
            true
        });
        handler.update_state_data(snapshot);

        let input = tokio::select! {
            biased;
            Some(err) = error_rx.recv() => Err(err),
            Some(Err(err)) = producers.join_next() => Err(CoupError::Join(err)),
            input = handler.get_input_data() => input,
        }?;

        // the local seats acknowledge the result before we leave
        if controller.state().phase == Phase::EndGame {
            return Ok(controller.victor());
        }

        controller.update_game(input)?;
    }
}
