//! Shooter simulation

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

pub const SIM_DT: f32 = 1.0 / 120.0;
pub const MAX_SUBSTEPS: u32 = 8;

pub const ARENA_W: f32 = 480.0;
pub const ARENA_H: f32 = 640.0;

pub const GUN_W: f32 = 34.0;
pub const GUN_H: f32 = 18.0;
pub const GUN_Y: f32 = ARENA_H - 50.0;
pub const GUN_SPEED: f32 = 320.0;

pub const SHOT_SPEED: f32 = 520.0;
pub const MAX_SHOTS: usize = 3;
/// Ticks between shots
pub const FIRE_COOLDOWN_TICKS: u32 = 20;

pub const BOMB_SPEED: f32 = 190.0;

pub const INVADER_ROWS: usize = 5;
pub const INVADER_COLS: usize = 8;
pub const INVADER_W: f32 = 30.0;
pub const INVADER_H: f32 = 22.0;
pub const INVADER_DX: f32 = 48.0;
pub const INVADER_DY: f32 = 38.0;
/// Horizontal march speed of a full fresh grid
pub const MARCH_BASE_SPEED: f32 = 28.0;
/// Vertical step at each edge
pub const STEP_DOWN: f32 = 18.0;
pub const EDGE_MARGIN: f32 = 16.0;

/// Bombs per second from a full fresh grid
pub const BOMB_RATE: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Playing,
    Paused,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Shot,
    InvaderDestroyed,
    GunHit,
    WaveCleared,
    GameOver,
}

#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Keyboard axis: -1, 0, or 1
    pub move_dir: f32,
    /// Absolute gun target (touch), arena coordinates
    pub target_x: Option<f32>,
    /// Fire held
    pub fire: bool,
    pub pause: bool,
}

pub struct ShooterSim {
    pub phase: GamePhase,
    pub gun_x: f32,
    pub shots: Vec<Vec2>,
    pub bombs: Vec<Vec2>,
    /// Which grid slots still hold a live invader
    pub alive: [[bool; INVADER_COLS]; INVADER_ROWS],
    /// Top-left of the invader grid
    pub grid_origin: Vec2,
    march_dir: f32,
    fire_cooldown: u32,
    pub score: u64,
    pub lives: u8,
    pub wave: u32,
    pub events: Vec<GameEvent>,
    rng: Pcg32,
}

impl ShooterSim {
    pub fn new(seed: u64) -> Self {
        Self {
            phase: GamePhase::Playing,
            gun_x: ARENA_W / 2.0,
            shots: Vec::new(),
            bombs: Vec::new(),
            alive: [[true; INVADER_COLS]; INVADER_ROWS],
            grid_origin: Vec2::new(60.0, 70.0),
            march_dir: 1.0,
            fire_cooldown: 0,
            score: 0,
            lives: 3,
            wave: 0,
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn invader_pos(&self, row: usize, col: usize) -> Vec2 {
        self.grid_origin + Vec2::new(col as f32 * INVADER_DX, row as f32 * INVADER_DY)
    }

    fn live_count(&self) -> usize {
        self.alive.iter().flatten().filter(|&&a| a).count()
    }

    /// March speed: faster waves, and faster as the grid thins
    fn march_speed(&self) -> f32 {
        let wave_factor = 1.0 + self.wave as f32 * 0.2;
        let total = (INVADER_ROWS * INVADER_COLS) as f32;
        let thin_factor = 1.0 + (1.0 - self.live_count() as f32 / total) * 2.5;
        MARCH_BASE_SPEED * wave_factor * thin_factor
    }

    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        if input.pause {
            match self.phase {
                GamePhase::Playing => {
                    self.phase = GamePhase::Paused;
                    return;
                }
                GamePhase::Paused => self.phase = GamePhase::Playing,
                GamePhase::GameOver => {}
            }
        }
        if self.phase != GamePhase::Playing {
            return;
        }

        // Gun movement
        let half = GUN_W / 2.0;
        if let Some(target) = input.target_x {
            let max_step = GUN_SPEED * 1.5 * dt;
            self.gun_x += (target - self.gun_x).clamp(-max_step, max_step);
        } else {
            self.gun_x += input.move_dir * GUN_SPEED * dt;
        }
        self.gun_x = self.gun_x.clamp(half, ARENA_W - half);

        // Firing
        if self.fire_cooldown > 0 {
            self.fire_cooldown -= 1;
        }
        if input.fire && self.fire_cooldown == 0 && self.shots.len() < MAX_SHOTS {
            self.shots.push(Vec2::new(self.gun_x, GUN_Y - GUN_H));
            self.fire_cooldown = FIRE_COOLDOWN_TICKS;
            self.events.push(GameEvent::Shot);
        }

        // Shots travel up
        for shot in &mut self.shots {
            shot.y -= SHOT_SPEED * dt;
        }
        self.shots.retain(|s| s.y > -10.0);

        // Shot vs invader: each shot takes out at most one slot
        let shots = std::mem::take(&mut self.shots);
        for shot in shots {
            let mut hit = None;
            'scan: for row in 0..INVADER_ROWS {
                for col in 0..INVADER_COLS {
                    if !self.alive[row][col] {
                        continue;
                    }
                    let pos = self.invader_pos(row, col);
                    if (shot.x - pos.x).abs() < INVADER_W / 2.0
                        && (shot.y - pos.y).abs() < INVADER_H / 2.0
                    {
                        hit = Some((row, col));
                        break 'scan;
                    }
                }
            }
            if let Some((row, col)) = hit {
                self.alive[row][col] = false;
                self.score += ((INVADER_ROWS - row) as u64) * 10;
                self.events.push(GameEvent::InvaderDestroyed);
            } else {
                self.shots.push(shot);
            }
        }

        // March
        self.grid_origin.x += self.march_dir * self.march_speed() * dt;
        let (min_x, max_x) = self.live_extent_x();
        if self.march_dir > 0.0 && max_x + INVADER_W / 2.0 > ARENA_W - EDGE_MARGIN {
            self.march_dir = -1.0;
            self.grid_origin.y += STEP_DOWN;
        } else if self.march_dir < 0.0 && min_x - INVADER_W / 2.0 < EDGE_MARGIN {
            self.march_dir = 1.0;
            self.grid_origin.y += STEP_DOWN;
        }

        // Bombs from random live invaders, more often as waves progress
        let rate = BOMB_RATE * (1.0 + self.wave as f32 * 0.25);
        if self.live_count() > 0 && self.rng.random::<f32>() < rate * dt {
            let live: Vec<(usize, usize)> = (0..INVADER_ROWS)
                .flat_map(|r| (0..INVADER_COLS).map(move |c| (r, c)))
                .filter(|&(r, c)| self.alive[r][c])
                .collect();
            let (row, col) = live[self.rng.random_range(0..live.len())];
            self.bombs.push(self.invader_pos(row, col));
        }

        let bomb_speed = BOMB_SPEED + self.wave as f32 * 15.0;
        for bomb in &mut self.bombs {
            bomb.y += bomb_speed * dt;
        }

        // Bomb vs gun
        let gun_min = Vec2::new(self.gun_x - half, GUN_Y - GUN_H / 2.0);
        let gun_max = Vec2::new(self.gun_x + half, GUN_Y + GUN_H / 2.0);
        let mut gun_hit = false;
        self.bombs.retain(|&b| {
            let hit = b.x > gun_min.x && b.x < gun_max.x && b.y > gun_min.y && b.y < gun_max.y;
            if hit {
                gun_hit = true;
            }
            !hit && b.y < ARENA_H + 10.0
        });

        // Invaders reaching the gun row also cost a life
        let reached = self.lowest_live_y() + INVADER_H / 2.0 >= GUN_Y - GUN_H;
        if gun_hit || reached {
            self.lose_life(reached);
        }

        if self.live_count() == 0 && self.phase == GamePhase::Playing {
            self.wave += 1;
            self.score += 50 * self.wave as u64;
            self.alive = [[true; INVADER_COLS]; INVADER_ROWS];
            self.grid_origin = Vec2::new(60.0, 70.0);
            self.march_dir = 1.0;
            // In-flight shots carry over into the new wave
            self.bombs.clear();
            self.events.push(GameEvent::WaveCleared);
        }
    }

    fn live_extent_x(&self) -> (f32, f32) {
        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        for row in 0..INVADER_ROWS {
            for col in 0..INVADER_COLS {
                if self.alive[row][col] {
                    let x = self.invader_pos(row, col).x;
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                }
            }
        }
        (min_x, max_x)
    }

    fn lowest_live_y(&self) -> f32 {
        let mut max_y = f32::NEG_INFINITY;
        for row in 0..INVADER_ROWS {
            for col in 0..INVADER_COLS {
                if self.alive[row][col] {
                    max_y = max_y.max(self.invader_pos(row, col).y);
                }
            }
        }
        max_y
    }

    fn lose_life(&mut self, push_grid_back: bool) {
        self.lives = self.lives.saturating_sub(1);
        self.events.push(GameEvent::GunHit);
        if self.lives == 0 {
            self.phase = GamePhase::GameOver;
            self.events.push(GameEvent::GameOver);
            return;
        }
        self.bombs.clear();
        if push_grid_back {
            // Survivors retreat to the top, same grid shape
            self.grid_origin.y = 70.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire_input() -> TickInput {
        TickInput {
            fire: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_fire_cooldown_and_cap() {
        let mut sim = ShooterSim::new(1);
        sim.tick(&fire_input(), SIM_DT);
        assert_eq!(sim.shots.len(), 1);
        // Held fire during cooldown adds nothing
        for _ in 0..(FIRE_COOLDOWN_TICKS - 1) {
            sim.tick(&fire_input(), SIM_DT);
        }
        assert_eq!(sim.shots.len(), 1);
        // Cooldown elapsed: second and third shots
        for _ in 0..(FIRE_COOLDOWN_TICKS * 2) as usize {
            sim.tick(&fire_input(), SIM_DT);
        }
        assert!(sim.shots.len() <= MAX_SHOTS);
    }

    #[test]
    fn test_shot_destroys_invader_and_scores_by_row() {
        let mut sim = ShooterSim::new(2);
        let target = sim.invader_pos(INVADER_ROWS - 1, 0);
        sim.shots.push(Vec2::new(target.x, target.y + 1.0));
        sim.tick(&TickInput::default(), SIM_DT);
        assert!(!sim.alive[INVADER_ROWS - 1][0]);
        assert_eq!(sim.score, 10); // Bottom row is worth the least
        assert!(sim.shots.is_empty());
        assert!(sim.events.contains(&GameEvent::InvaderDestroyed));
    }

    #[test]
    fn test_march_flips_and_steps_down_once_per_edge() {
        let mut sim = ShooterSim::new(3);
        sim.lives = 200; // Stray bombs must not end the test run
        let y0 = sim.grid_origin.y;
        let mut flips = 0;
        let mut last_dir = sim.march_dir;
        for _ in 0..200_000 {
            sim.tick(&TickInput::default(), SIM_DT);
            if sim.march_dir != last_dir {
                flips += 1;
                last_dir = sim.march_dir;
            }
            if flips == 2 {
                break;
            }
        }
        assert_eq!(flips, 2);
        // One step down per edge, nothing more
        assert!((sim.grid_origin.y - (y0 + 2.0 * STEP_DOWN)).abs() < 0.001);
    }

    #[test]
    fn test_bomb_hit_costs_life() {
        let mut sim = ShooterSim::new(4);
        sim.bombs.push(Vec2::new(sim.gun_x, GUN_Y));
        sim.tick(&TickInput::default(), SIM_DT);
        assert_eq!(sim.lives, 2);
        assert!(sim.bombs.is_empty());
        assert!(sim.events.contains(&GameEvent::GunHit));
    }

    #[test]
    fn test_invader_reaching_gun_row_costs_life_and_resets() {
        let mut sim = ShooterSim::new(5);
        sim.grid_origin.y = GUN_Y - GUN_H - (INVADER_ROWS - 1) as f32 * INVADER_DY;
        sim.tick(&TickInput::default(), SIM_DT);
        assert_eq!(sim.lives, 2);
        assert!(sim.grid_origin.y < 100.0, "survivors pushed back up");
    }

    #[test]
    fn test_wave_clear_spawns_fresh_faster_grid() {
        let mut sim = ShooterSim::new(6);
        let slow = sim.march_speed();
        sim.alive = [[false; INVADER_COLS]; INVADER_ROWS];
        sim.alive[0][0] = true;
        let target = sim.invader_pos(0, 0);
        sim.shots.push(Vec2::new(target.x, target.y + 1.0));
        sim.tick(&TickInput::default(), SIM_DT);
        assert_eq!(sim.wave, 1);
        assert_eq!(sim.live_count(), INVADER_ROWS * INVADER_COLS);
        assert!(sim.march_speed() > slow);
        assert!(sim.events.contains(&GameEvent::WaveCleared));
    }

    #[test]
    fn test_game_over_at_zero_lives() {
        let mut sim = ShooterSim::new(7);
        sim.lives = 1;
        sim.bombs.push(Vec2::new(sim.gun_x, GUN_Y));
        sim.tick(&TickInput::default(), SIM_DT);
        assert_eq!(sim.phase, GamePhase::GameOver);
        assert!(sim.events.contains(&GameEvent::GameOver));
    }
}
