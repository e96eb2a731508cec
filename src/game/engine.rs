use super::{
    config::GameConfig,
    direction::Direction,
    state::{CollisionType, GameState, Phase, Position, Snake},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::time::Duration;

/// Result of a game step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResult {
    /// Whether the snake ate food this step
    pub ate_food: bool,
    /// New tick interval if this step sped the game up
    pub speed_changed: Option<Duration>,
    /// Set when the step ended the round
    pub collision: Option<CollisionType>,
    /// Whether the best score went up this step
    pub new_best: bool,
}

/// The game engine that handles all game rules
pub struct GameEngine {
    config: GameConfig,
    rng: StdRng,
}

impl GameEngine {
    /// Create a new game engine with the given configuration
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create an engine whose food placement is reproducible
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// State shown before the first round starts
    pub fn initial_state(&mut self, best_score: u32) -> GameState {
        let snake = self.spawn_snake();
        let food = self.spawn_food(&snake).unwrap_or(snake.head());
        let mut state = GameState::new(snake, food, &self.config);
        state.best_score = best_score;
        state
    }

    /// Put a fresh round on the board and set it running.
    /// The best score carries over.
    pub fn reset(&mut self, state: &mut GameState) {
        let snake = self.spawn_snake();
        if let Some(food) = self.spawn_food(&snake) {
            state.food = food;
        }
        state.direction = snake.direction;
        state.snake = snake;
        state.score = 0;
        state.tick_interval = self.config.initial_tick();
        state.phase = Phase::Running;
    }

    /// Request a new heading. Reversing onto the body is refused.
    pub fn turn(&self, state: &mut GameState, direction: Direction) -> bool {
        if state.snake.direction.is_opposite(direction) {
            return false;
        }
        state.direction = direction;
        true
    }

    /// Execute one tick of the game
    pub fn step(&mut self, state: &mut GameState) -> StepResult {
        let mut result = StepResult::default();
        if !state.is_running() {
            return result;
        }

        state.snake.direction = state.direction;
        let new_head = state
            .snake
            .head()
            .stepped(state.snake.direction, self.config.grid_step);

        result.ate_food = new_head == state.food;
        state.snake.advance(new_head, result.ate_food);

        if result.ate_food {
            state.score += self.config.food_points;
            if let Some(food) = self.spawn_food(&state.snake) {
                state.food = food;
            }
            if state.score % self.config.speed_up_every == 0 {
                result.speed_changed = self.speed_up(state);
            }
        }

        result.collision = self.check_collision(state);

        if state.score > state.best_score {
            state.best_score = state.score;
            result.new_best = true;
        }

        result
    }

    /// Close the current round. Returns the final score, or `None` if no
    /// round was running.
    pub fn finish_round(&self, state: &mut GameState) -> Option<u32> {
        if !state.is_running() {
            return None;
        }
        let final_score = state.score;
        state.best_score = state.best_score.max(final_score);
        state.last_score = Some(final_score);
        state.score = 0;
        state.phase = Phase::Over;
        Some(final_score)
    }

    fn speed_up(&self, state: &mut GameState) -> Option<Duration> {
        let faster = state
            .tick_interval
            .saturating_sub(self.config.speed_step())
            .max(self.config.min_tick());
        if faster == state.tick_interval {
            return None;
        }
        state.tick_interval = faster;
        Some(faster)
    }

    /// Check the head against the board edges and the rest of the body
    fn check_collision(&self, state: &GameState) -> Option<CollisionType> {
        let head = state.snake.head();
        if !state.is_in_bounds(head) {
            return Some(CollisionType::Wall);
        }
        if state.snake.collides_with_body(head) {
            return Some(CollisionType::SelfCollision);
        }
        None
    }

    fn spawn_snake(&self) -> Snake {
        Snake::new(
            Position::new(self.config.start_x, self.config.start_y),
            Direction::Right,
        )
    }

    /// Pick a random free cell, or `None` when the snake covers the board
    pub fn spawn_food(&mut self, snake: &Snake) -> Option<Position> {
        let cells = self.config.cells_per_side();
        let side = cells.max(0) as usize;
        if snake.len() >= side.saturating_mul(side) {
            return None;
        }
        let step = self.config.grid_step;
        loop {
            let x = self.rng.gen_range(0..cells) * step;
            let y = self.rng.gen_range(0..cells) * step;
            let pos = Position::new(x, y);

            if !snake.occupies(pos) {
                return Some(pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_state(engine: &mut GameEngine) -> GameState {
        let mut state = engine.initial_state(0);
        engine.reset(&mut state);
        state
    }

    #[test]
    fn test_reset() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 1);
        let state = running_state(&mut engine);

        assert!(state.is_running());
        assert_eq!(state.score, 0);
        assert_eq!(state.snake.len(), 1);
        assert_eq!(state.snake.head(), Position::new(160, 160));
        assert_eq!(state.direction, Direction::Right);
        assert_ne!(state.food, state.snake.head());
    }

    #[test]
    fn test_basic_movement() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 2);
        let mut state = running_state(&mut engine);
        state.food = Position::new(0, 0);

        let result = engine.step(&mut state);

        assert!(!result.ate_food);
        assert_eq!(result.collision, None);
        assert_eq!(state.snake.head(), Position::new(180, 160));
        assert_eq!(state.snake.len(), 1);
    }

    #[test]
    fn test_food_consumption() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 3);
        let mut state = running_state(&mut engine);
        state.food = Position::new(180, 160);

        let result = engine.step(&mut state);

        assert!(result.ate_food);
        assert!(result.new_best);
        assert_eq!(state.score, 10);
        assert_eq!(state.best_score, 10);
        assert_eq!(state.snake.len(), 2);
        assert!(!state.snake.occupies(state.food));
    }

    #[test]
    fn test_speed_up_every_fifty_points() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 4);
        let mut state = running_state(&mut engine);
        state.score = 40;
        state.food = Position::new(180, 160);

        let result = engine.step(&mut state);

        assert_eq!(state.score, 50);
        assert_eq!(result.speed_changed, Some(Duration::from_millis(90)));
        assert_eq!(state.tick_interval, Duration::from_millis(90));
    }

    #[test]
    fn test_speed_floor() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 5);
        let mut state = running_state(&mut engine);
        state.score = 90;
        state.tick_interval = Duration::from_millis(10);
        state.food = Position::new(180, 160);

        let result = engine.step(&mut state);

        assert_eq!(state.score, 100);
        assert_eq!(result.speed_changed, None);
        assert_eq!(state.tick_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_interval_reaches_ten_ms_at_450_points() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 14);
        let mut state = running_state(&mut engine);

        for _ in 0..45 {
            state.snake = Snake::new(Position::new(160, 160), Direction::Right);
            state.direction = Direction::Right;
            state.food = Position::new(180, 160);
            assert!(engine.step(&mut state).ate_food);
            if state.score == 400 {
                assert_eq!(state.tick_interval, Duration::from_millis(20));
            }
        }

        assert_eq!(state.score, 450);
        assert_eq!(state.tick_interval, Duration::from_millis(10));

        // 500 points would take the original to zero; it stays at 10ms
        for _ in 0..5 {
            state.snake = Snake::new(Position::new(160, 160), Direction::Right);
            state.direction = Direction::Right;
            state.food = Position::new(180, 160);
            engine.step(&mut state);
        }
        assert_eq!(state.score, 500);
        assert_eq!(state.tick_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_wall_collision() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 6);
        let mut state = running_state(&mut engine);
        state.snake = Snake::new(Position::new(380, 100), Direction::Right);
        state.direction = Direction::Right;

        let result = engine.step(&mut state);

        assert_eq!(result.collision, Some(CollisionType::Wall));
    }

    #[test]
    fn test_self_collision() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 7);
        let mut state = running_state(&mut engine);
        state.food = Position::new(0, 0);

        // Head at (100,100) travelling Left, body curling underneath
        state.snake = Snake {
            body: vec![
                Position::new(100, 100),
                Position::new(120, 100),
                Position::new(120, 120),
                Position::new(100, 120),
                Position::new(80, 120),
            ],
            direction: Direction::Left,
        };
        state.direction = Direction::Down;

        let result = engine.step(&mut state);

        assert_eq!(result.collision, Some(CollisionType::SelfCollision));
    }

    #[test]
    fn test_moving_into_vacated_tail_is_safe() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 8);
        let mut state = running_state(&mut engine);
        state.food = Position::new(0, 0);

        // A 2x2 loop: the head moves onto the cell the tail leaves
        state.snake = Snake {
            body: vec![
                Position::new(100, 100),
                Position::new(120, 100),
                Position::new(120, 120),
                Position::new(100, 120),
            ],
            direction: Direction::Left,
        };
        state.direction = Direction::Down;

        let result = engine.step(&mut state);

        assert_eq!(result.collision, None);
    }

    #[test]
    fn test_prevent_180_degree_turn() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 9);
        let mut state = running_state(&mut engine);

        assert!(!engine.turn(&mut state, Direction::Left));
        assert_eq!(state.direction, Direction::Right);

        assert!(engine.turn(&mut state, Direction::Up));
        assert_eq!(state.direction, Direction::Up);
    }

    #[test]
    fn test_idle_state_does_not_move() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 10);
        let mut state = engine.initial_state(0);
        let before = state.clone();

        let result = engine.step(&mut state);

        assert_eq!(result, StepResult::default());
        assert_eq!(state, before);
    }

    #[test]
    fn test_finish_round_keeps_best() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 11);
        let mut state = engine.initial_state(70);
        engine.reset(&mut state);
        state.score = 30;

        assert_eq!(engine.finish_round(&mut state), Some(30));
        assert_eq!(state.phase, Phase::Over);
        assert_eq!(state.score, 0);
        assert_eq!(state.best_score, 70);
        assert_eq!(state.last_score, Some(30));

        assert_eq!(engine.finish_round(&mut state), None);
    }

    #[test]
    fn test_food_never_on_snake() {
        let mut engine = GameEngine::with_seed(GameConfig::with_cells(3), 12);
        let snake = Snake {
            body: (0..8)
                .map(|i| Position::new((i % 3) * 20, (i / 3) * 20))
                .collect(),
            direction: Direction::Right,
        };

        // Only (40, 40) is free
        for _ in 0..20 {
            assert_eq!(engine.spawn_food(&snake), Some(Position::new(40, 40)));
        }
    }

    #[test]
    fn test_no_food_on_full_board() {
        let mut engine = GameEngine::with_seed(GameConfig::with_cells(2), 13);
        let snake = Snake {
            body: vec![
                Position::new(0, 0),
                Position::new(20, 0),
                Position::new(20, 20),
                Position::new(0, 20),
            ],
            direction: Direction::Up,
        };

        assert_eq!(engine.spawn_food(&snake), None);
    }
}
