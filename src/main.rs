use anyhow::{Context, Result};
use clap::Parser;
use snake_tui::game::{GameConfig, GameEngine, GameSession};
use snake_tui::modes::PlayMode;
use snake_tui::storage::{JsonFileStore, KeyValueStore, MemoryStore};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "snake_tui")]
#[command(version, about = "Snake in the terminal")]
struct Cli {
    /// JSON game configuration; omitted fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// File the best score is kept in
    #[arg(long, default_value = "snake_store.json")]
    store: PathBuf,

    /// Keep the best score in memory only
    #[arg(long)]
    no_persist: bool,

    /// Seed for food placement
    #[arg(long)]
    seed: Option<u64>,

    /// Log file (the terminal belongs to the game)
    #[arg(long, default_value = "snake.log")]
    log_file: PathBuf,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn init_logging(path: &Path, level: Level) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file, cli.log_level)?;

    let config = match &cli.config {
        Some(path) => GameConfig::from_json_file(path)?,
        None => GameConfig::default(),
    };
    info!(?config, "starting snake");

    let engine = match cli.seed {
        Some(seed) => GameEngine::with_seed(config, seed),
        None => GameEngine::new(config),
    };

    let store: Box<dyn KeyValueStore> = if cli.no_persist {
        Box::new(MemoryStore::new())
    } else {
        Box::new(JsonFileStore::open(&cli.store)?)
    };

    let session = GameSession::new(engine, store)?;
    let mut play_mode = PlayMode::new(session);
    play_mode.run().await?;

    Ok(())
}
