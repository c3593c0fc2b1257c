//! Snake simulation
//!
//! Pure and deterministic: seeded RNG, no platform dependencies. The glue
//! layer decides when to call [`SnakeSim::step`] from its step clock.

use std::collections::VecDeque;

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Board dimensions in cells
pub const GRID_W: i32 = 24;
pub const GRID_H: i32 = 24;

/// Step interval at the start of a run (seconds)
pub const START_STEP_SECS: f32 = 0.14;
/// Fastest step interval a long run can reach
pub const MIN_STEP_SECS: f32 = 0.055;
/// Step interval reduction per food eaten
pub const STEP_DECAY_SECS: f32 = 0.002;

/// Points per food
pub const FOOD_POINTS: u64 = 10;

/// Movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// What a single step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Ate,
    Died,
    /// Board completely filled
    Won,
}

/// Complete snake state
pub struct SnakeSim {
    /// Body cells, head first
    pub body: VecDeque<(i32, i32)>,
    pub dir: Dir,
    /// Queued turns, applied one per step. Holds at most a few entries so
    /// key mashing inside one step interval stays predictable.
    pending: VecDeque<Dir>,
    pub food: (i32, i32),
    pub score: u64,
    pub alive: bool,
    pub won: bool,
    foods_eaten: u32,
    rng: Pcg32,
}

impl SnakeSim {
    pub fn new(seed: u64) -> Self {
        let cx = GRID_W / 2;
        let cy = GRID_H / 2;
        let mut sim = Self {
            body: VecDeque::from([(cx, cy), (cx - 1, cy), (cx - 2, cy)]),
            dir: Dir::Right,
            pending: VecDeque::new(),
            food: (0, 0),
            score: 0,
            alive: true,
            won: false,
            foods_eaten: 0,
            rng: Pcg32::seed_from_u64(seed),
        };
        sim.spawn_food();
        sim
    }

    /// Queue a direction change. Reversals relative to the last queued turn
    /// (or the current heading) are rejected.
    pub fn queue_turn(&mut self, dir: Dir) {
        let last = self.pending.back().copied().unwrap_or(self.dir);
        if dir == last || dir == last.opposite() {
            return;
        }
        if self.pending.len() < 3 {
            self.pending.push_back(dir);
        }
    }

    /// Current step interval, shrinking as food is eaten
    pub fn step_secs(&self) -> f32 {
        (START_STEP_SECS - self.foods_eaten as f32 * STEP_DECAY_SECS).max(MIN_STEP_SECS)
    }

    /// Advance the snake by one cell
    pub fn step(&mut self) -> StepOutcome {
        if !self.alive {
            return StepOutcome::Died;
        }

        if let Some(turn) = self.pending.pop_front() {
            self.dir = turn;
        }

        let (hx, hy) = self.body[0];
        let (dx, dy) = self.dir.delta();
        let head = (hx + dx, hy + dy);

        if head.0 < 0 || head.0 >= GRID_W || head.1 < 0 || head.1 >= GRID_H {
            self.alive = false;
            return StepOutcome::Died;
        }

        let growing = head == self.food;

        // Moving into the tail cell is legal when the tail vacates it this step
        let blocked = self
            .body
            .iter()
            .take(if growing {
                self.body.len()
            } else {
                self.body.len() - 1
            })
            .any(|&cell| cell == head);
        if blocked {
            self.alive = false;
            return StepOutcome::Died;
        }

        self.body.push_front(head);
        if growing {
            self.score += FOOD_POINTS;
            self.foods_eaten += 1;
            if self.body.len() as i32 == GRID_W * GRID_H {
                self.alive = false;
                self.won = true;
                return StepOutcome::Won;
            }
            self.spawn_food();
            StepOutcome::Ate
        } else {
            self.body.pop_back();
            StepOutcome::Moved
        }
    }

    pub fn occupied(&self, cell: (i32, i32)) -> bool {
        self.body.iter().any(|&c| c == cell)
    }

    /// Place food on a uniformly random free cell
    fn spawn_food(&mut self) {
        let free: Vec<(i32, i32)> = (0..GRID_H)
            .flat_map(|y| (0..GRID_W).map(move |x| (x, y)))
            .filter(|&c| !self.occupied(c))
            .collect();
        debug_assert!(!free.is_empty());
        self.food = free[self.rng.random_range(0..free.len())];
    }

    #[cfg(test)]
    fn from_body(body: &[(i32, i32)], dir: Dir, seed: u64) -> Self {
        let mut sim = Self {
            body: body.iter().copied().collect(),
            dir,
            pending: VecDeque::new(),
            food: (0, 0),
            score: 0,
            alive: true,
            won: false,
            foods_eaten: 0,
            rng: Pcg32::seed_from_u64(seed),
        };
        sim.spawn_food();
        sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_sim_food_off_body() {
        let sim = SnakeSim::new(7);
        assert!(!sim.occupied(sim.food));
        assert_eq!(sim.body.len(), 3);
        assert!(sim.alive);
    }

    #[test]
    fn test_step_moves_head() {
        let mut sim = SnakeSim::new(1);
        sim.food = (0, 0); // Out of the snake's immediate path
        let (hx, hy) = sim.body[0];
        assert_eq!(sim.step(), StepOutcome::Moved);
        assert_eq!(sim.body[0], (hx + 1, hy));
        assert_eq!(sim.body.len(), 3);
    }

    #[test]
    fn test_reversal_rejected() {
        let mut sim = SnakeSim::new(2);
        sim.queue_turn(Dir::Left); // Opposite of initial Right
        sim.food = (0, 0);
        sim.step();
        assert_eq!(sim.dir, Dir::Right);
    }

    #[test]
    fn test_turn_queue_applies_in_order() {
        let mut sim = SnakeSim::new(3);
        sim.food = (0, 0);
        sim.queue_turn(Dir::Up);
        sim.queue_turn(Dir::Left);
        sim.step();
        assert_eq!(sim.dir, Dir::Up);
        sim.step();
        assert_eq!(sim.dir, Dir::Left);
    }

    #[test]
    fn test_eating_grows_and_scores() {
        let mut sim = SnakeSim::new(4);
        let (hx, hy) = sim.body[0];
        sim.food = (hx + 1, hy);
        assert_eq!(sim.step(), StepOutcome::Ate);
        assert_eq!(sim.body.len(), 4);
        assert_eq!(sim.score, FOOD_POINTS);
        assert!(!sim.occupied(sim.food));
    }

    #[test]
    fn test_wall_kills() {
        let mut sim = SnakeSim::from_body(&[(GRID_W - 1, 5), (GRID_W - 2, 5)], Dir::Right, 5);
        assert_eq!(sim.step(), StepOutcome::Died);
        assert!(!sim.alive);
    }

    #[test]
    fn test_self_collision_kills() {
        // Moving right from (5,5) hits (6,5), which is body and not the tail
        let body = [(5, 5), (4, 5), (4, 6), (5, 6), (6, 6), (6, 5), (7, 5)];
        let mut sim = SnakeSim::from_body(&body, Dir::Right, 6);
        assert_eq!(sim.step(), StepOutcome::Died);
        assert!(!sim.alive);
    }

    #[test]
    fn test_tail_chase_allowed() {
        // 2x2 loop: the head may enter the tail cell because it vacates
        let mut sim = SnakeSim::from_body(&[(5, 6), (5, 5), (6, 5), (6, 6)], Dir::Right, 8);
        if sim.food == (6, 6) {
            sim.food = (0, 0);
        }
        assert_eq!(sim.step(), StepOutcome::Moved);
        assert!(sim.alive);
        assert_eq!(sim.body[0], (6, 6));
    }

    #[test]
    fn test_speed_ramps_down_to_floor() {
        let mut sim = SnakeSim::new(9);
        assert_eq!(sim.step_secs(), START_STEP_SECS);
        sim.foods_eaten = 10_000;
        assert_eq!(sim.step_secs(), MIN_STEP_SECS);
    }

    proptest! {
        /// Food never lands on the body, no matter how the snake wanders.
        #[test]
        fn prop_food_off_body(seed in 0u64..1000, turns in proptest::collection::vec(0u8..4, 0..64)) {
            let mut sim = SnakeSim::new(seed);
            for t in turns {
                let dir = match t {
                    0 => Dir::Up,
                    1 => Dir::Down,
                    2 => Dir::Left,
                    _ => Dir::Right,
                };
                sim.queue_turn(dir);
                if sim.alive {
                    sim.step();
                }
                prop_assert!(!sim.occupied(sim.food) || !sim.alive);
            }
        }
    }
}
