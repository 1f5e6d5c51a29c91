use std::fs::OpenOptions;
use std::path::Path;
use env_logger::{Builder, Env, Target};
use crate::Result;

/// Sends every `log` record to `path`. The terminal belongs to the renderer,
/// so nothing is ever written to stderr.
pub fn init(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let mut builder = Builder::from_env(Env::default().default_filter_or("debug"));
    builder
        .target(Target::Pipe(Box::new(file)))
        .format_target(false);

    // a second init (tests, repeated games) keeps the first logger
    if builder.try_init().is_err() {
        log::debug!("logger already initialised, keeping it");
    }

    Ok(())
}
