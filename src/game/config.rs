use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the game
///
/// Coordinates are in board units: every segment sits on a multiple of
/// `grid_step`, and the playable area is `board_size` units on each side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Side length of the square board
    pub board_size: i32,
    /// Distance between adjacent cells
    pub grid_step: i32,
    /// Spawn position of the snake head
    pub start_x: i32,
    pub start_y: i32,

    // Timing
    /// Tick interval at the start of each round, in milliseconds
    pub initial_tick_ms: u64,
    /// How much the interval shrinks on each speed-up
    pub speed_step_ms: u64,
    /// The interval never drops below this; defaults to one decrement so
    /// the last speed-up before reaching zero still happens
    pub min_tick_ms: u64,

    // Scoring
    /// Points awarded per food
    pub food_points: u32,
    /// A speed-up happens whenever the score reaches a multiple of this
    pub speed_up_every: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: 400,
            grid_step: 20,
            start_x: 160,
            start_y: 160,
            initial_tick_ms: 100,
            speed_step_ms: 10,
            min_tick_ms: 10,
            food_points: 10,
            speed_up_every: 50,
        }
    }
}

impl GameConfig {
    /// Create a configuration for a board of `cells` x `cells`, keeping the
    /// default grid step and placing the snake near the middle
    pub fn with_cells(cells: i32) -> Self {
        let defaults = Self::default();
        let step = defaults.grid_step;
        Self {
            board_size: cells * step,
            start_x: (cells / 2) * step,
            start_y: (cells / 2) * step,
            ..defaults
        }
    }

    /// Small board for tests
    pub fn small() -> Self {
        Self::with_cells(10)
    }

    /// Load a configuration from a JSON file; omitted fields take defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: GameConfig =
            serde_json::from_str(&raw).context("Failed to parse game config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject geometry and timing the game loop can't run with
    pub fn validate(&self) -> Result<()> {
        if self.grid_step <= 0 {
            bail!("grid_step must be positive, got {}", self.grid_step);
        }
        if self.board_size <= 0 || self.board_size % self.grid_step != 0 {
            bail!(
                "board_size {} must be a positive multiple of grid_step {}",
                self.board_size,
                self.grid_step
            );
        }
        for (name, v) in [("start_x", self.start_x), ("start_y", self.start_y)] {
            if v < 0 || v >= self.board_size || v % self.grid_step != 0 {
                bail!("{} = {} is not a cell on the board", name, v);
            }
        }
        if self.min_tick_ms == 0 || self.initial_tick_ms < self.min_tick_ms {
            bail!(
                "initial_tick_ms {} must be at least min_tick_ms {} (and both non-zero)",
                self.initial_tick_ms,
                self.min_tick_ms
            );
        }
        if self.food_points == 0 || self.speed_up_every == 0 {
            bail!("food_points and speed_up_every must be non-zero");
        }
        if self.speed_up_every % self.food_points != 0 {
            bail!(
                "speed_up_every {} must be a multiple of food_points {}",
                self.speed_up_every,
                self.food_points
            );
        }
        Ok(())
    }

    /// Number of cells along one side
    pub fn cells_per_side(&self) -> i32 {
        self.board_size / self.grid_step
    }

    pub fn initial_tick(&self) -> Duration {
        Duration::from_millis(self.initial_tick_ms)
    }

    pub fn min_tick(&self) -> Duration {
        Duration::from_millis(self.min_tick_ms)
    }

    pub fn speed_step(&self) -> Duration {
        Duration::from_millis(self.speed_step_ms)
    }
}
