//! Tetris simulation
//!
//! Pure and deterministic. The glue layer drives gravity from
//! [`TetrisSim::gravity_secs`] and forwards key input to the move/rotate/drop
//! operations.

use std::collections::VecDeque;

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Well dimensions in cells
pub const WELL_W: usize = 10;
pub const WELL_H: usize = 20;

/// Line clear scoring at level 1 (multiplied by level)
pub const POINTS_SINGLE: u64 = 40;
pub const POINTS_DOUBLE: u64 = 100;
pub const POINTS_TRIPLE: u64 = 300;
pub const POINTS_TETRIS: u64 = 1200;

/// Points per cell dropped
pub const SOFT_DROP_POINTS: u64 = 1;
pub const HARD_DROP_POINTS: u64 = 2;

/// Lines needed to advance a level
pub const LINES_PER_LEVEL: u32 = 10;

/// The seven tetrominoes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Cell offsets within the piece's bounding box for a rotation state.
    /// Screen coordinates, y down.
    pub fn cells(self, rot: u8) -> [(i32, i32); 4] {
        match (self, rot % 4) {
            (PieceKind::I, 0) => [(0, 1), (1, 1), (2, 1), (3, 1)],
            (PieceKind::I, 1) => [(2, 0), (2, 1), (2, 2), (2, 3)],
            (PieceKind::I, 2) => [(0, 2), (1, 2), (2, 2), (3, 2)],
            (PieceKind::I, _) => [(1, 0), (1, 1), (1, 2), (1, 3)],

            (PieceKind::O, _) => [(1, 0), (2, 0), (1, 1), (2, 1)],

            (PieceKind::T, 0) => [(1, 0), (0, 1), (1, 1), (2, 1)],
            (PieceKind::T, 1) => [(1, 0), (1, 1), (2, 1), (1, 2)],
            (PieceKind::T, 2) => [(0, 1), (1, 1), (2, 1), (1, 2)],
            (PieceKind::T, _) => [(1, 0), (0, 1), (1, 1), (1, 2)],

            (PieceKind::S, 0) => [(1, 0), (2, 0), (0, 1), (1, 1)],
            (PieceKind::S, 1) => [(1, 0), (1, 1), (2, 1), (2, 2)],
            (PieceKind::S, 2) => [(1, 1), (2, 1), (0, 2), (1, 2)],
            (PieceKind::S, _) => [(0, 0), (0, 1), (1, 1), (1, 2)],

            (PieceKind::Z, 0) => [(0, 0), (1, 0), (1, 1), (2, 1)],
            (PieceKind::Z, 1) => [(2, 0), (1, 1), (2, 1), (1, 2)],
            (PieceKind::Z, 2) => [(0, 1), (1, 1), (1, 2), (2, 2)],
            (PieceKind::Z, _) => [(1, 0), (0, 1), (1, 1), (0, 2)],

            (PieceKind::J, 0) => [(0, 0), (0, 1), (1, 1), (2, 1)],
            (PieceKind::J, 1) => [(1, 0), (2, 0), (1, 1), (1, 2)],
            (PieceKind::J, 2) => [(0, 1), (1, 1), (2, 1), (2, 2)],
            (PieceKind::J, _) => [(1, 0), (1, 1), (0, 2), (1, 2)],

            (PieceKind::L, 0) => [(2, 0), (0, 1), (1, 1), (2, 1)],
            (PieceKind::L, 1) => [(1, 0), (1, 1), (1, 2), (2, 2)],
            (PieceKind::L, 2) => [(0, 1), (1, 1), (2, 1), (0, 2)],
            (PieceKind::L, _) => [(0, 0), (1, 0), (1, 1), (1, 2)],
        }
    }

    /// Fill color used by the canvas layer
    pub fn color(self) -> &'static str {
        match self {
            PieceKind::I => "#3cd6e8",
            PieceKind::O => "#f2d24b",
            PieceKind::T => "#b45ae0",
            PieceKind::S => "#57d45a",
            PieceKind::Z => "#e05a5a",
            PieceKind::J => "#4a6ee0",
            PieceKind::L => "#e0984a",
        }
    }
}

/// SRS wall kick offsets, screen coordinates (y down).
/// Indexed by (from_rot, clockwise); (0,0) is always tried first.
fn kick_table(kind: PieceKind, from: u8, cw: bool) -> [(i32, i32); 5] {
    let i_piece = kind == PieceKind::I;
    match (from % 4, cw) {
        // 0 -> R
        (0, true) if i_piece => [(0, 0), (-2, 0), (1, 0), (-2, 1), (1, -2)],
        (0, true) => [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
        // R -> 2
        (1, true) if i_piece => [(0, 0), (-1, 0), (2, 0), (-1, -2), (2, 1)],
        (1, true) => [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
        // 2 -> L
        (2, true) if i_piece => [(0, 0), (2, 0), (-1, 0), (2, -1), (-1, 2)],
        (2, true) => [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
        // L -> 0
        (3, true) if i_piece => [(0, 0), (1, 0), (-2, 0), (1, 2), (-2, -1)],
        (3, true) => [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
        // 0 -> L
        (0, false) if i_piece => [(0, 0), (-1, 0), (2, 0), (-1, -2), (2, 1)],
        (0, false) => [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
        // R -> 0
        (1, false) if i_piece => [(0, 0), (2, 0), (-1, 0), (2, -1), (-1, 2)],
        (1, false) => [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
        // 2 -> R
        (2, false) if i_piece => [(0, 0), (1, 0), (-2, 0), (1, 2), (-2, -1)],
        (2, false) => [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
        // L -> 2
        (3, false) if i_piece => [(0, 0), (-2, 0), (1, 0), (-2, 1), (1, -2)],
        (3, false) => [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
        _ => unreachable!(),
    }
}

/// The piece currently falling
#[derive(Debug, Clone, Copy)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub rot: u8,
    pub x: i32,
    pub y: i32,
}

impl ActivePiece {
    fn spawn(kind: PieceKind) -> Self {
        Self {
            kind,
            rot: 0,
            x: 3,
            y: 0,
        }
    }

    pub fn cells(&self) -> [(i32, i32); 4] {
        let mut out = self.kind.cells(self.rot);
        for c in &mut out {
            c.0 += self.x;
            c.1 += self.y;
        }
        out
    }
}

/// What a gravity step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallOutcome {
    Moved,
    Locked { lines_cleared: u32 },
    GameOver,
}

/// Complete tetris state
pub struct TetrisSim {
    /// Row-major well, row 0 at the top
    pub board: Vec<[Option<PieceKind>; WELL_W]>,
    pub active: ActivePiece,
    /// Upcoming pieces (front is next)
    pub next_queue: VecDeque<PieceKind>,
    bag: Vec<PieceKind>,
    pub score: u64,
    pub lines: u32,
    pub level: u32,
    pub game_over: bool,
    rng: Pcg32,
}

impl TetrisSim {
    pub fn new(seed: u64) -> Self {
        let mut sim = Self {
            board: vec![[None; WELL_W]; WELL_H],
            active: ActivePiece::spawn(PieceKind::I), // Replaced below
            next_queue: VecDeque::new(),
            bag: Vec::new(),
            score: 0,
            lines: 0,
            level: 1,
            game_over: false,
            rng: Pcg32::seed_from_u64(seed),
        };
        for _ in 0..3 {
            let p = sim.deal();
            sim.next_queue.push_back(p);
        }
        sim.spawn_next();
        sim
    }

    /// Draw from the 7-bag, refilling with a Fisher-Yates shuffle when empty
    fn deal(&mut self) -> PieceKind {
        if self.bag.is_empty() {
            self.bag.extend_from_slice(&PieceKind::ALL);
            for i in (1..self.bag.len()).rev() {
                let j = self.rng.random_range(0..=i);
                self.bag.swap(i, j);
            }
        }
        self.bag.pop().expect("bag refilled above")
    }

    fn spawn_next(&mut self) {
        let kind = self.next_queue.pop_front().expect("queue kept filled");
        let refill = self.deal();
        self.next_queue.push_back(refill);
        let piece = ActivePiece::spawn(kind);
        if !self.fits(&piece) {
            self.game_over = true;
        }
        self.active = piece;
    }

    /// True when the piece overlaps nothing and stays inside the well
    fn fits(&self, piece: &ActivePiece) -> bool {
        piece.cells().iter().all(|&(x, y)| {
            x >= 0
                && x < WELL_W as i32
                && y >= 0
                && y < WELL_H as i32
                && self.board[y as usize][x as usize].is_none()
        })
    }

    /// Shift the active piece horizontally. Returns whether it moved.
    pub fn move_horizontal(&mut self, dx: i32) -> bool {
        if self.game_over {
            return false;
        }
        let mut moved = self.active;
        moved.x += dx;
        if self.fits(&moved) {
            self.active = moved;
            true
        } else {
            false
        }
    }

    /// Rotate the active piece, trying each wall kick in order.
    /// Returns whether any kick fit.
    pub fn rotate(&mut self, cw: bool) -> bool {
        if self.game_over {
            return false;
        }
        let from = self.active.rot;
        let to = if cw { (from + 1) % 4 } else { (from + 3) % 4 };
        for (dx, dy) in kick_table(self.active.kind, from, cw) {
            let candidate = ActivePiece {
                rot: to,
                x: self.active.x + dx,
                y: self.active.y + dy,
                ..self.active
            };
            if self.fits(&candidate) {
                self.active = candidate;
                return true;
            }
        }
        false
    }

    /// One gravity step; locks the piece when it cannot fall further
    pub fn fall(&mut self) -> FallOutcome {
        if self.game_over {
            return FallOutcome::GameOver;
        }
        let mut moved = self.active;
        moved.y += 1;
        if self.fits(&moved) {
            self.active = moved;
            return FallOutcome::Moved;
        }
        let lines_cleared = self.lock();
        if self.game_over {
            FallOutcome::GameOver
        } else {
            FallOutcome::Locked { lines_cleared }
        }
    }

    /// Soft drop: one faster gravity step worth a point when it moves
    pub fn soft_drop(&mut self) -> FallOutcome {
        let outcome = self.fall();
        if outcome == FallOutcome::Moved {
            self.score += SOFT_DROP_POINTS;
        }
        outcome
    }

    /// Drop straight down and lock immediately
    pub fn hard_drop(&mut self) -> FallOutcome {
        if self.game_over {
            return FallOutcome::GameOver;
        }
        let mut dropped = 0u64;
        loop {
            let mut moved = self.active;
            moved.y += 1;
            if self.fits(&moved) {
                self.active = moved;
                dropped += 1;
            } else {
                break;
            }
        }
        self.score += dropped * HARD_DROP_POINTS;
        let lines_cleared = self.lock();
        if self.game_over {
            FallOutcome::GameOver
        } else {
            FallOutcome::Locked { lines_cleared }
        }
    }

    /// Row the active piece would land on, for the ghost outline
    pub fn ghost_y(&self) -> i32 {
        let mut ghost = self.active;
        loop {
            let mut moved = ghost;
            moved.y += 1;
            if self.fits(&moved) {
                ghost = moved;
            } else {
                return ghost.y;
            }
        }
    }

    fn lock(&mut self) -> u32 {
        for (x, y) in self.active.cells() {
            self.board[y as usize][x as usize] = Some(self.active.kind);
        }

        // Clear full rows, top rows shifting down
        let mut cleared = 0u32;
        let mut y = WELL_H as i32 - 1;
        while y >= 0 {
            if self.board[y as usize].iter().all(|c| c.is_some()) {
                self.board.remove(y as usize);
                self.board.insert(0, [None; WELL_W]);
                cleared += 1;
            } else {
                y -= 1;
            }
        }

        if cleared > 0 {
            let base = match cleared {
                1 => POINTS_SINGLE,
                2 => POINTS_DOUBLE,
                3 => POINTS_TRIPLE,
                _ => POINTS_TETRIS,
            };
            self.score += base * self.level as u64;
            self.lines += cleared;
            self.level = 1 + self.lines / LINES_PER_LEVEL;
        }

        self.spawn_next();
        cleared
    }

    /// Gravity interval for the current level
    pub fn gravity_secs(&self) -> f32 {
        (0.8 * 0.85_f32.powi(self.level as i32 - 1)).max(0.05)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bag_deals_each_piece_once_per_seven() {
        let mut sim = TetrisSim::new(42);
        // 4 already drawn (active + 3 queued); drain bags and count
        let mut counts = [0u32; 7];
        let mut tally = |k: PieceKind| {
            counts[PieceKind::ALL.iter().position(|&p| p == k).unwrap()] += 1;
        };
        tally(sim.active.kind);
        for &k in &sim.next_queue {
            tally(k);
        }
        for _ in 0..(7 * 4 - 4) {
            let k = sim.deal();
            tally(k);
        }
        assert!(counts.iter().all(|&c| c == 4), "uneven deal: {:?}", counts);
    }

    #[test]
    fn test_spawn_fits_empty_well() {
        let sim = TetrisSim::new(1);
        assert!(!sim.game_over);
        for (x, y) in sim.active.cells() {
            assert!((0..WELL_W as i32).contains(&x));
            assert!((0..WELL_H as i32).contains(&y));
        }
    }

    #[test]
    fn test_move_blocked_at_wall() {
        let mut sim = TetrisSim::new(2);
        while sim.move_horizontal(-1) {}
        let min_x = sim.active.cells().iter().map(|c| c.0).min().unwrap();
        assert_eq!(min_x, 0);
        assert!(!sim.move_horizontal(-1));
    }

    #[test]
    fn test_i_piece_wall_kick() {
        let mut sim = TetrisSim::new(3);
        sim.active = ActivePiece {
            kind: PieceKind::I,
            rot: 1,
            x: -2, // Vertical I hugging the left wall (cells at x = 0)
            y: 5,
        };
        assert!(sim.rotate(true));
        assert_eq!(sim.active.rot, 2);
        // The (2,0) kick pulls the piece back inside the well
        let min_x = sim.active.cells().iter().map(|c| c.0).min().unwrap();
        assert!(min_x >= 0);
    }

    #[test]
    fn test_rotation_fails_when_no_kick_fits() {
        let mut sim = TetrisSim::new(4);
        // Box the active piece in completely
        sim.board = vec![[Some(PieceKind::O); WELL_W]; WELL_H];
        sim.active = ActivePiece {
            kind: PieceKind::I,
            rot: 0,
            x: 3,
            y: 5,
        };
        // Carve out exactly the horizontal I cells
        for (x, y) in sim.active.cells() {
            sim.board[y as usize][x as usize] = None;
        }
        let before = sim.active;
        assert!(!sim.rotate(true));
        assert_eq!(sim.active.rot, before.rot);
        assert_eq!((sim.active.x, sim.active.y), (before.x, before.y));
    }

    #[test]
    fn test_hard_drop_locks_and_scores_descent() {
        let mut sim = TetrisSim::new(5);
        let outcome = sim.hard_drop();
        assert!(matches!(outcome, FallOutcome::Locked { .. }));
        assert!(sim.score > 0);
        // The locked cells are on the board now
        let filled = sim
            .board
            .iter()
            .flatten()
            .filter(|c| c.is_some())
            .count();
        assert_eq!(filled, 4);
    }

    #[test]
    fn test_line_clear_scoring() {
        let mut sim = TetrisSim::new(6);
        // Bottom row full except the four cells a flat I will fill
        for x in 0..WELL_W {
            sim.board[WELL_H - 1][x] = Some(PieceKind::O);
        }
        for x in 3..7 {
            sim.board[WELL_H - 1][x] = None;
        }
        sim.active = ActivePiece {
            kind: PieceKind::I,
            rot: 0,
            x: 3,
            y: 5,
        };
        let score_before = sim.score;
        let outcome = sim.hard_drop();
        assert_eq!(outcome, FallOutcome::Locked { lines_cleared: 1 });
        assert_eq!(sim.lines, 1);
        assert!(sim.score >= score_before + POINTS_SINGLE);
        // Bottom row now holds whatever shifted down (empty)
        assert!(sim.board[WELL_H - 1].iter().all(|c| c.is_none()));
    }

    #[test]
    fn test_game_over_on_blocked_spawn() {
        let mut sim = TetrisSim::new(7);
        for y in 0..4 {
            for x in 0..WELL_W {
                sim.board[y][x] = Some(PieceKind::O);
            }
        }
        sim.spawn_next();
        assert!(sim.game_over);
    }

    #[test]
    fn test_gravity_speeds_up_with_level() {
        let mut sim = TetrisSim::new(8);
        let slow = sim.gravity_secs();
        sim.level = 10;
        assert!(sim.gravity_secs() < slow);
        sim.level = 100;
        assert_eq!(sim.gravity_secs(), 0.05);
    }

    #[test]
    fn test_ghost_matches_hard_drop_landing() {
        let mut sim = TetrisSim::new(9);
        let before = sim.active;
        let landing = ActivePiece {
            y: sim.ghost_y(),
            ..before
        };
        sim.hard_drop();
        for (x, y) in landing.cells() {
            assert_eq!(sim.board[y as usize][x as usize], Some(before.kind));
        }
    }

    proptest! {
        /// The active piece never overlaps the board or leaves the well,
        /// whatever inputs arrive.
        #[test]
        fn prop_active_piece_always_fits(seed in 0u64..500, ops in proptest::collection::vec(0u8..5, 0..200)) {
            let mut sim = TetrisSim::new(seed);
            for op in ops {
                if sim.game_over {
                    break;
                }
                match op {
                    0 => { sim.move_horizontal(-1); }
                    1 => { sim.move_horizontal(1); }
                    2 => { sim.rotate(true); }
                    3 => { sim.rotate(false); }
                    _ => { sim.fall(); }
                }
                if !sim.game_over {
                    for (x, y) in sim.active.cells() {
                        prop_assert!((0..WELL_W as i32).contains(&x));
                        prop_assert!((0..WELL_H as i32).contains(&y));
                        prop_assert!(sim.board[y as usize][x as usize].is_none());
                    }
                }
            }
        }
    }
}
