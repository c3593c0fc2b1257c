//! Breakout simulation
//!
//! Fixed timestep only, seeded RNG only, no rendering or platform
//! dependencies. The glue layer feeds [`TickInput`] and drains
//! [`BreakoutSim::events`] for audio.

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Fixed simulation timestep (120 Hz)
pub const SIM_DT: f32 = 1.0 / 120.0;
/// Maximum substeps per frame to prevent spiral of death
pub const MAX_SUBSTEPS: u32 = 8;

/// Arena dimensions
pub const ARENA_W: f32 = 480.0;
pub const ARENA_H: f32 = 640.0;

/// Paddle defaults
pub const PADDLE_W: f32 = 84.0;
pub const PADDLE_H: f32 = 14.0;
pub const PADDLE_Y: f32 = ARENA_H - 40.0;
pub const PADDLE_SPEED: f32 = 540.0;

/// Ball defaults
pub const BALL_RADIUS: f32 = 7.0;
pub const BALL_START_SPEED: f32 = 320.0;
pub const BALL_MAX_SPEED: f32 = 560.0;
/// Speed gain applied every few bricks
pub const BALL_SPEEDUP: f32 = 1.04;
pub const BRICKS_PER_SPEEDUP: u32 = 4;

/// Steepest serve/bounce angle off vertical (radians)
pub const MAX_BOUNCE_ANGLE: f32 = 1.05;

/// Brick layout
pub const BRICK_COLS: usize = 10;
pub const BRICK_ROWS: usize = 6;
pub const BRICK_H: f32 = 22.0;
pub const BRICK_TOP: f32 = 70.0;
pub const BRICK_GAP: f32 = 3.0;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Ball attached to paddle, waiting for launch input
    Serve,
    /// Active gameplay
    Playing,
    Paused,
    GameOver,
}

/// Things that happened during a tick, for the audio/FX layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    WallHit,
    PaddleHit,
    BrickHit,
    BrickBroken,
    WaveCleared,
    BallLost,
    GameOver,
}

/// A brick (AABB)
#[derive(Debug, Clone)]
pub struct Brick {
    pub pos: Vec2,
    pub size: Vec2,
    pub hp: u8,
    pub row: usize,
}

impl Brick {
    pub fn points(&self) -> u64 {
        // Top rows are worth more
        ((BRICK_ROWS - self.row) as u64) * 10
    }
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Absolute paddle target (mouse/touch), arena coordinates
    pub target_x: Option<f32>,
    /// Keyboard axis: -1, 0, or 1
    pub move_dir: f32,
    /// Launch ball (click/tap/space)
    pub launch: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Complete breakout state
pub struct BreakoutSim {
    pub phase: GamePhase,
    pub paddle_x: f32,
    paddle_vx: f32,
    pub ball_pos: Vec2,
    pub ball_vel: Vec2,
    /// True while the ball rides the paddle before a serve
    pub ball_attached: bool,
    pub bricks: Vec<Brick>,
    pub score: u64,
    pub lives: u8,
    pub wave: u32,
    bricks_broken: u32,
    /// Ticks until the paddle may be hit again (prevents sticking)
    paddle_cooldown: u32,
    pub events: Vec<GameEvent>,
    rng: Pcg32,
}

/// Circle vs AABB overlap test.
/// Returns the surface normal (toward the circle) and penetration depth.
pub fn circle_aabb_collision(
    center: Vec2,
    radius: f32,
    box_min: Vec2,
    box_max: Vec2,
) -> Option<(Vec2, f32)> {
    let closest = center.clamp(box_min, box_max);
    let delta = center - closest;
    let dist_sq = delta.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }
    if dist_sq > 1e-6 {
        let dist = dist_sq.sqrt();
        Some((delta / dist, radius - dist))
    } else {
        // Center inside the box: push out along the thinnest axis
        let left = center.x - box_min.x;
        let right = box_max.x - center.x;
        let top = center.y - box_min.y;
        let bottom = box_max.y - center.y;
        let min = left.min(right).min(top).min(bottom);
        let normal = if min == left {
            Vec2::NEG_X
        } else if min == right {
            Vec2::X
        } else if min == top {
            Vec2::NEG_Y
        } else {
            Vec2::Y
        };
        Some((normal, radius + min))
    }
}

/// Reflect velocity off a surface: v' = v - 2(v.n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

impl BreakoutSim {
    pub fn new(seed: u64) -> Self {
        let mut sim = Self {
            phase: GamePhase::Serve,
            paddle_x: ARENA_W / 2.0,
            paddle_vx: 0.0,
            ball_pos: Vec2::ZERO,
            ball_vel: Vec2::ZERO,
            ball_attached: true,
            bricks: Vec::new(),
            score: 0,
            lives: 3,
            wave: 0,
            bricks_broken: 0,
            paddle_cooldown: 0,
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
        };
        sim.generate_wave();
        sim.attach_ball();
        sim
    }

    /// Lay out the brick field for the current wave
    pub fn generate_wave(&mut self) {
        let brick_w = (ARENA_W - BRICK_GAP * (BRICK_COLS as f32 + 1.0)) / BRICK_COLS as f32;
        self.bricks.clear();
        for row in 0..BRICK_ROWS {
            for col in 0..BRICK_COLS {
                // Armored rows show up from wave 2 onward
                let hp = if row < 2 && self.wave > 0 { 2 } else { 1 };
                self.bricks.push(Brick {
                    pos: Vec2::new(
                        BRICK_GAP + col as f32 * (brick_w + BRICK_GAP),
                        BRICK_TOP + row as f32 * (BRICK_H + BRICK_GAP),
                    ),
                    size: Vec2::new(brick_w, BRICK_H),
                    hp,
                    row,
                });
            }
        }
    }

    fn attach_ball(&mut self) {
        self.ball_attached = true;
        self.ball_vel = Vec2::ZERO;
        self.ball_pos = Vec2::new(self.paddle_x, PADDLE_Y - BALL_RADIUS - 2.0);
    }

    fn launch_ball(&mut self) {
        // Small random tilt plus whatever motion the paddle carries
        let tilt = self.rng.random_range(-0.25..0.25) + (self.paddle_vx / PADDLE_SPEED) * 0.5;
        let angle = tilt.clamp(-MAX_BOUNCE_ANGLE, MAX_BOUNCE_ANGLE);
        self.ball_vel = Vec2::new(angle.sin(), -angle.cos()) * BALL_START_SPEED;
        self.ball_attached = false;
    }

    /// Advance the game state by one fixed timestep
    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        if input.pause {
            match self.phase {
                GamePhase::Playing | GamePhase::Serve => {
                    self.phase = GamePhase::Paused;
                    return;
                }
                GamePhase::Paused => {
                    self.phase = if self.ball_attached {
                        GamePhase::Serve
                    } else {
                        GamePhase::Playing
                    };
                }
                GamePhase::GameOver => {}
            }
        }
        match self.phase {
            GamePhase::Paused | GamePhase::GameOver => return,
            _ => {}
        }

        self.move_paddle(input, dt);

        if self.paddle_cooldown > 0 {
            self.paddle_cooldown -= 1;
        }

        match self.phase {
            GamePhase::Serve => {
                self.ball_pos = Vec2::new(self.paddle_x, PADDLE_Y - BALL_RADIUS - 2.0);
                if input.launch {
                    self.launch_ball();
                    self.phase = GamePhase::Playing;
                }
            }
            GamePhase::Playing => self.tick_playing(dt),
            _ => {}
        }
    }

    fn move_paddle(&mut self, input: &TickInput, dt: f32) {
        let half = PADDLE_W / 2.0;
        let before = self.paddle_x;
        if let Some(target) = input.target_x {
            let max_step = PADDLE_SPEED * 1.5 * dt;
            let delta = (target - self.paddle_x).clamp(-max_step, max_step);
            self.paddle_x += delta;
        } else {
            self.paddle_x += input.move_dir * PADDLE_SPEED * dt;
        }
        self.paddle_x = self.paddle_x.clamp(half, ARENA_W - half);
        self.paddle_vx = (self.paddle_x - before) / dt;
    }

    fn tick_playing(&mut self, dt: f32) {
        self.ball_pos += self.ball_vel * dt;

        // Walls
        if self.ball_pos.x - BALL_RADIUS < 0.0 {
            self.ball_pos.x = BALL_RADIUS;
            self.ball_vel.x = self.ball_vel.x.abs();
            self.events.push(GameEvent::WallHit);
        } else if self.ball_pos.x + BALL_RADIUS > ARENA_W {
            self.ball_pos.x = ARENA_W - BALL_RADIUS;
            self.ball_vel.x = -self.ball_vel.x.abs();
            self.events.push(GameEvent::WallHit);
        }
        if self.ball_pos.y - BALL_RADIUS < 0.0 {
            self.ball_pos.y = BALL_RADIUS;
            self.ball_vel.y = self.ball_vel.y.abs();
            self.events.push(GameEvent::WallHit);
        }

        // Paddle
        let paddle_min = Vec2::new(self.paddle_x - PADDLE_W / 2.0, PADDLE_Y - PADDLE_H / 2.0);
        let paddle_max = Vec2::new(self.paddle_x + PADDLE_W / 2.0, PADDLE_Y + PADDLE_H / 2.0);
        if self.paddle_cooldown == 0
            && self.ball_vel.y > 0.0
            && circle_aabb_collision(self.ball_pos, BALL_RADIUS, paddle_min, paddle_max).is_some()
        {
            // Bounce angle from hit offset, not pure reflection
            let offset = ((self.ball_pos.x - self.paddle_x) / (PADDLE_W / 2.0)).clamp(-1.0, 1.0);
            let angle = offset * MAX_BOUNCE_ANGLE;
            let speed = self.ball_vel.length();
            self.ball_vel = Vec2::new(angle.sin(), -angle.cos()) * speed;
            self.ball_pos.y = paddle_min.y - BALL_RADIUS - 0.5;
            self.paddle_cooldown = 12;
            self.events.push(GameEvent::PaddleHit);
        }

        // Bricks: resolve the deepest overlap only, once per tick
        let mut hit: Option<(usize, Vec2, f32)> = None;
        for (i, brick) in self.bricks.iter().enumerate() {
            if let Some((normal, depth)) =
                circle_aabb_collision(self.ball_pos, BALL_RADIUS, brick.pos, brick.pos + brick.size)
            {
                if hit.map(|(_, _, d)| depth > d).unwrap_or(true) {
                    hit = Some((i, normal, depth));
                }
            }
        }
        if let Some((i, normal, depth)) = hit {
            self.ball_pos += normal * depth;
            self.ball_vel = reflect_velocity(self.ball_vel, normal);
            let brick = &mut self.bricks[i];
            brick.hp -= 1;
            if brick.hp == 0 {
                self.score += brick.points();
                self.bricks.remove(i);
                self.bricks_broken += 1;
                self.events.push(GameEvent::BrickBroken);
                if self.bricks_broken % BRICKS_PER_SPEEDUP == 0 {
                    let speed = (self.ball_vel.length() * BALL_SPEEDUP).min(BALL_MAX_SPEED);
                    self.ball_vel = self.ball_vel.normalize() * speed;
                }
            } else {
                self.events.push(GameEvent::BrickHit);
            }
        }

        if self.bricks.is_empty() {
            self.wave += 1;
            self.score += 100 * self.wave as u64;
            self.generate_wave();
            self.attach_ball();
            self.phase = GamePhase::Serve;
            self.events.push(GameEvent::WaveCleared);
            return;
        }

        // Bottom: ball lost
        if self.ball_pos.y - BALL_RADIUS > ARENA_H {
            self.lives = self.lives.saturating_sub(1);
            if self.lives == 0 {
                self.phase = GamePhase::GameOver;
                self.events.push(GameEvent::GameOver);
            } else {
                self.attach_ball();
                self.phase = GamePhase::Serve;
                self.events.push(GameEvent::BallLost);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_aabb_side_hit() {
        let min = Vec2::new(10.0, 10.0);
        let max = Vec2::new(50.0, 30.0);
        // Approaching the left face
        let hit = circle_aabb_collision(Vec2::new(7.0, 20.0), 5.0, min, max);
        let (normal, depth) = hit.expect("should overlap");
        assert!(normal.x < -0.99);
        assert!(depth > 0.0);
        // Clear miss
        assert!(circle_aabb_collision(Vec2::new(0.0, 0.0), 5.0, min, max).is_none());
    }

    #[test]
    fn test_reflect_velocity() {
        let v = reflect_velocity(Vec2::new(100.0, 0.0), Vec2::NEG_X);
        assert!((v.x + 100.0).abs() < 0.001);
        assert!(v.y.abs() < 0.001);
    }

    #[test]
    fn test_serve_ball_rides_paddle() {
        let mut sim = BreakoutSim::new(1);
        assert_eq!(sim.phase, GamePhase::Serve);
        let input = TickInput {
            move_dir: 1.0,
            ..Default::default()
        };
        for _ in 0..30 {
            sim.tick(&input, SIM_DT);
        }
        assert!(sim.ball_attached);
        assert!((sim.ball_pos.x - sim.paddle_x).abs() < 0.001);
    }

    #[test]
    fn test_launch_enters_playing_upward() {
        let mut sim = BreakoutSim::new(2);
        let input = TickInput {
            launch: true,
            ..Default::default()
        };
        sim.tick(&input, SIM_DT);
        assert_eq!(sim.phase, GamePhase::Playing);
        assert!(!sim.ball_attached);
        assert!(sim.ball_vel.y < 0.0);
        let speed = sim.ball_vel.length();
        assert!((speed - BALL_START_SPEED).abs() < 1.0);
    }

    #[test]
    fn test_paddle_hit_angle_follows_offset() {
        let mut sim = BreakoutSim::new(3);
        sim.phase = GamePhase::Playing;
        sim.ball_attached = false;
        // Ball dropping onto the right half of the paddle
        sim.ball_pos = Vec2::new(sim.paddle_x + PADDLE_W / 4.0, PADDLE_Y - PADDLE_H);
        sim.ball_vel = Vec2::new(0.0, 200.0);
        sim.tick(&TickInput::default(), SIM_DT);
        assert!(sim.ball_vel.y < 0.0);
        assert!(sim.ball_vel.x > 0.0, "right-side hit deflects right");
    }

    #[test]
    fn test_brick_damage_and_removal() {
        let mut sim = BreakoutSim::new(4);
        sim.phase = GamePhase::Playing;
        sim.ball_attached = false;
        let brick = sim.bricks[0].clone();
        let count_before = sim.bricks.len();
        // Ball moving up into the brick's underside
        sim.ball_pos = Vec2::new(
            brick.pos.x + brick.size.x / 2.0,
            brick.pos.y + brick.size.y + BALL_RADIUS - 1.0,
        );
        sim.ball_vel = Vec2::new(0.0, -200.0);
        sim.tick(&TickInput::default(), SIM_DT);
        assert_eq!(sim.bricks.len(), count_before - 1);
        assert!(sim.score > 0);
        assert!(sim.ball_vel.y > 0.0, "reflected downward");
        assert!(sim.events.contains(&GameEvent::BrickBroken));
    }

    #[test]
    fn test_ball_lost_and_game_over() {
        let mut sim = BreakoutSim::new(5);
        sim.phase = GamePhase::Playing;
        sim.ball_attached = false;
        sim.lives = 1;
        sim.ball_pos = Vec2::new(ARENA_W / 2.0, ARENA_H + BALL_RADIUS + 10.0);
        sim.ball_vel = Vec2::new(0.0, 100.0);
        sim.tick(&TickInput::default(), SIM_DT);
        assert_eq!(sim.phase, GamePhase::GameOver);
        assert_eq!(sim.lives, 0);
    }

    #[test]
    fn test_wave_clear_regenerates_bricks() {
        let mut sim = BreakoutSim::new(6);
        sim.phase = GamePhase::Playing;
        sim.ball_attached = false;
        let last = sim.bricks[0].clone();
        sim.bricks.truncate(1);
        sim.ball_pos = Vec2::new(
            last.pos.x + last.size.x / 2.0,
            last.pos.y + last.size.y + BALL_RADIUS - 1.0,
        );
        sim.ball_vel = Vec2::new(0.0, -200.0);
        sim.tick(&TickInput::default(), SIM_DT);
        assert_eq!(sim.wave, 1);
        assert_eq!(sim.phase, GamePhase::Serve);
        assert_eq!(sim.bricks.len(), BRICK_COLS * BRICK_ROWS);
        assert!(sim.events.contains(&GameEvent::WaveCleared));
    }

    #[test]
    fn test_pause_toggle() {
        let mut sim = BreakoutSim::new(7);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        sim.tick(&pause, SIM_DT);
        assert_eq!(sim.phase, GamePhase::Paused);
        sim.tick(&pause, SIM_DT);
        assert_eq!(sim.phase, GamePhase::Serve);
    }
}
