//! Local key-value storage for the persisted best score
//!
//! The game only ever stores one scalar, under [`BEST_SCORE_KEY`]. Backends
//! implement [`KeyValueStore`] so the game loop can run against a file on
//! disk or an in-memory map.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use anyhow::{Context, Result};
use tracing::warn;

/// Key the best score is stored under
pub const BEST_SCORE_KEY: &str = "bestScore";

/// String-keyed, string-valued storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Read the best score; a missing or unparsable value counts as 0
pub fn load_best_score(store: &dyn KeyValueStore) -> Result<u32> {
    let raw = store
        .get(BEST_SCORE_KEY)
        .context("Failed to read best score")?;
    Ok(match raw {
        None => 0,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(%value, "ignoring unparsable best score");
            0
        }),
    })
}

pub fn save_best_score(store: &mut dyn KeyValueStore, score: u32) -> Result<()> {
    store
        .set(BEST_SCORE_KEY, &score.to_string())
        .context("Failed to save best score")
}
