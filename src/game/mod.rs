//! Core game logic module for Snake
//!
//! The engine and state carry no I/O or rendering dependencies. The session
//! wraps them into the tick-driven game loop and persists the best score.

pub mod config;
pub mod direction;
pub mod engine;
pub mod session;
pub mod state;

// Re-export commonly used types
pub use config::GameConfig;
pub use direction::Direction;
pub use engine::{GameEngine, StepResult};
pub use session::{GameSession, TimerCommand};
pub use state::{CollisionType, GameState, Phase, Position, Snake};
