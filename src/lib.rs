//! Snake for the terminal
//!
//! This library provides:
//! - Core game logic and the tick-driven game loop (game module)
//! - Best-score persistence behind a key-value store (storage module)
//! - TUI rendering (render module) and key mapping (input module)
//! - The interactive terminal driver (modes module)

pub mod game;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod render;
pub mod storage;
