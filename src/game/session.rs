//! The game loop controller
//!
//! `GameSession` owns the single mutable [`GameState`] and is the only thing
//! that touches it. The host calls [`GameSession::start`] when the player
//! asks for a round, [`GameSession::tick`] on every timer beat, and
//! [`GameSession::on_key`] for key presses; the host guarantees those calls
//! never overlap. Best-score persistence happens here as well.

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    direction::Direction,
    engine::{GameEngine, StepResult},
    state::{GameState, Phase},
};
use crate::input::KeyAction;
use crate::storage::{self, KeyValueStore};

/// What the host should do with its tick timer after an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// (Re)start the timer at this interval
    Start(Duration),
    /// Stop ticking
    Stop,
    /// Leave the timer as it is
    Keep,
    /// Leave the game
    Quit,
}

pub struct GameSession {
    engine: GameEngine,
    state: GameState,
    store: Box<dyn KeyValueStore>,
    /// Best score as last written to the store
    saved_best: u32,
}

impl GameSession {
    /// Build a session, reading the persisted best score from `store`
    pub fn new(mut engine: GameEngine, store: Box<dyn KeyValueStore>) -> Result<Self> {
        let best = storage::load_best_score(store.as_ref())?;
        info!(best, "loaded best score");
        let state = engine.initial_state(best);

        Ok(Self {
            engine,
            state,
            store,
            saved_best: best,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Begin a round. Ignored while one is running, since the start control
    /// is disabled for the duration of a round.
    pub fn start(&mut self) -> Option<Duration> {
        if self.state.is_running() {
            return None;
        }
        self.engine.reset(&mut self.state);
        info!(interval_ms = self.state.tick_interval.as_millis() as u64, "round started");
        Some(self.state.tick_interval)
    }

    /// Advance the game by one timer beat
    pub fn tick(&mut self) -> StepResult {
        let result = self.engine.step(&mut self.state);

        if let Some(interval) = result.speed_changed {
            debug!(
                score = self.state.score,
                interval_ms = interval.as_millis() as u64,
                "speed up"
            );
        }
        if result.new_best {
            self.persist_best();
        }
        if let Some(collision) = result.collision {
            info!(?collision, "snake crashed");
            self.end_round();
        }

        result
    }

    /// Request a direction change. Returns false when it was rejected.
    pub fn on_key(&mut self, direction: Direction) -> bool {
        if !self.state.is_running() {
            return false;
        }
        self.engine.turn(&mut self.state, direction)
    }

    /// Finish the current round: save the best score, stop the clock, zero
    /// the score, and make the start control available again
    pub fn end_round(&mut self) -> Option<u32> {
        let final_score = self.engine.finish_round(&mut self.state)?;
        self.persist_best();
        info!(
            final_score,
            best = self.state.best_score,
            "round over"
        );
        Some(final_score)
    }

    /// Route a mapped key press and tell the host what to do with its timer
    pub fn handle(&mut self, action: KeyAction) -> TimerCommand {
        match action {
            KeyAction::Turn(direction) => {
                self.on_key(direction);
                TimerCommand::Keep
            }
            KeyAction::Start => match self.start() {
                Some(interval) => TimerCommand::Start(interval),
                None => TimerCommand::Keep,
            },
            KeyAction::Restart => {
                self.end_round();
                TimerCommand::Stop
            }
            KeyAction::Quit => {
                self.end_round();
                TimerCommand::Quit
            }
            KeyAction::None => TimerCommand::Keep,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    fn persist_best(&mut self) {
        let best = self.state.best_score;
        if best <= self.saved_best {
            return;
        }
        match storage::save_best_score(self.store.as_mut(), best) {
            Ok(()) => self.saved_best = best,
            Err(err) => warn!(error = %format!("{err:#}"), "could not persist best score"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{CollisionType, GameConfig, Position, Snake};
    use crate::storage::{BEST_SCORE_KEY, MemoryStore};
    use anyhow::bail;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Store whose writes fail while `broken` is set
    #[derive(Clone, Default)]
    struct FlakyStore {
        broken: Rc<Cell<bool>>,
        inner: Rc<RefCell<MemoryStore>>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.borrow().get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if self.broken.get() {
                bail!("disk full");
            }
            self.inner.borrow_mut().set(key, value)
        }
    }

    fn session_with_best(best: u32) -> GameSession {
        let mut store = MemoryStore::new();
        store.set(BEST_SCORE_KEY, &best.to_string()).unwrap();
        let engine = GameEngine::with_seed(GameConfig::default(), 42);
        GameSession::new(engine, Box::new(store)).unwrap()
    }

    #[test]
    fn test_loads_best_score() {
        let session = session_with_best(70);
        assert_eq!(session.state().best_score, 70);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_start_only_when_not_running() {
        let mut session = session_with_best(0);

        assert_eq!(session.start(), Some(Duration::from_millis(100)));
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(session.start(), None);
        assert_eq!(
            session.handle(KeyAction::Start),
            TimerCommand::Keep
        );
    }

    #[test]
    fn test_eat_once() {
        let mut session = session_with_best(0);
        session.start();
        session.state.food = Position::new(180, 160);

        let result = session.tick();

        assert!(result.ate_food);
        assert_eq!(session.state().score, 10);
        assert_eq!(session.state().snake.len(), 2);
        assert_eq!(session.state().best_score, 10);
        assert_eq!(session.saved_best, 10);
    }

    #[test]
    fn test_key_ignored_when_reversing() {
        let mut session = session_with_best(0);
        session.start();

        assert!(!session.on_key(Direction::Left));
        assert!(session.on_key(Direction::Up));
        // Still travelling Right until the next tick, so Left stays illegal
        assert!(!session.on_key(Direction::Left));
    }

    #[test]
    fn test_crash_ends_round() {
        let mut session = session_with_best(20);
        session.start();
        session.state.snake = Snake::new(Position::new(380, 0), Direction::Right);
        session.state.direction = Direction::Right;
        session.state.score = 30;

        let result = session.tick();

        assert_eq!(result.collision, Some(CollisionType::Wall));
        assert_eq!(session.phase(), Phase::Over);
        assert_eq!(session.state().score, 0);
        assert_eq!(session.state().last_score, Some(30));
        assert_eq!(session.state().best_score, 30);
    }

    #[test]
    fn test_restart_ends_round() {
        let mut session = session_with_best(0);
        session.start();

        assert_eq!(session.handle(KeyAction::Restart), TimerCommand::Stop);
        assert_eq!(session.phase(), Phase::Over);
        assert_eq!(
            session.handle(KeyAction::Start),
            TimerCommand::Start(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_ticks_ignored_after_round() {
        let mut session = session_with_best(0);
        session.start();
        session.end_round();
        let before = session.state().clone();

        session.tick();

        assert_eq!(session.state(), &before);
    }

    #[test]
    fn test_failed_write_keeps_game_going_and_retries() {
        let store = FlakyStore::default();
        store.broken.set(true);
        let engine = GameEngine::with_seed(GameConfig::default(), 9);
        let mut session = GameSession::new(engine, Box::new(store.clone())).unwrap();

        session.start();
        session.state.food = Position::new(180, 160);
        let result = session.tick();

        assert!(result.new_best);
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(session.state().best_score, 10);
        assert_eq!(session.saved_best, 0);
        assert_eq!(store.get(BEST_SCORE_KEY).unwrap(), None);

        assert_eq!(session.end_round(), Some(10));
        assert_eq!(session.phase(), Phase::Over);
        assert_eq!(session.saved_best, 0);

        // Next improvement after the store recovers is written
        store.broken.set(false);
        session.start();
        session.state.food = Position::new(180, 160);
        session.tick();
        session.state.food = Position::new(200, 160);
        session.tick();

        assert_eq!(session.state().best_score, 20);
        assert_eq!(session.saved_best, 20);
        assert_eq!(store.get(BEST_SCORE_KEY).unwrap().as_deref(), Some("20"));
    }
}
