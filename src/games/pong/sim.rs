//! Pong simulation

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

pub const SIM_DT: f32 = 1.0 / 120.0;
pub const MAX_SUBSTEPS: u32 = 8;

pub const ARENA_W: f32 = 640.0;
pub const ARENA_H: f32 = 480.0;

pub const PADDLE_W: f32 = 12.0;
pub const PADDLE_H: f32 = 90.0;
pub const PADDLE_MARGIN: f32 = 24.0;
pub const PLAYER_SPEED: f32 = 420.0;

/// AI tuning: capped speed plus a dead zone so it can be beaten
pub const AI_SPEED: f32 = 300.0;
pub const AI_DEAD_ZONE: f32 = 14.0;

pub const BALL_RADIUS: f32 = 7.0;
pub const BALL_START_SPEED: f32 = 340.0;
pub const BALL_MAX_SPEED: f32 = 620.0;
/// Speed gain per paddle hit
pub const RALLY_SPEEDUP: f32 = 1.03;

/// Steepest bounce angle off horizontal (radians)
pub const MAX_BOUNCE_ANGLE: f32 = 1.0;

/// Points to win the match
pub const WIN_SCORE: u32 = 11;

/// Delay between a point and the next serve
pub const SERVE_DELAY_TICKS: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Serve,
    Playing,
    Paused,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    WallHit,
    PaddleHit,
    PlayerScored,
    AiScored,
    MatchOver { player_won: bool },
}

#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Absolute paddle target (mouse/touch), arena coordinates
    pub target_y: Option<f32>,
    /// Keyboard axis: -1, 0, or 1
    pub move_dir: f32,
    pub pause: bool,
}

pub struct PongSim {
    pub phase: GamePhase,
    /// Paddle centers
    pub player_y: f32,
    pub ai_y: f32,
    pub ball_pos: Vec2,
    pub ball_vel: Vec2,
    pub player_score: u32,
    pub ai_score: u32,
    serve_ticks: u32,
    /// Next serve direction: +1 toward the AI, -1 toward the player
    serve_dir: f32,
    pub events: Vec<GameEvent>,
    rng: Pcg32,
}

impl PongSim {
    pub fn new(seed: u64) -> Self {
        Self {
            phase: GamePhase::Serve,
            player_y: ARENA_H / 2.0,
            ai_y: ARENA_H / 2.0,
            ball_pos: Vec2::new(ARENA_W / 2.0, ARENA_H / 2.0),
            ball_vel: Vec2::ZERO,
            player_score: 0,
            ai_score: 0,
            serve_ticks: SERVE_DELAY_TICKS,
            serve_dir: 1.0,
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// True at match point for either side
    pub fn match_point(&self) -> bool {
        self.player_score == WIN_SCORE - 1 || self.ai_score == WIN_SCORE - 1
    }

    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        if input.pause {
            match self.phase {
                GamePhase::Playing | GamePhase::Serve => {
                    self.phase = GamePhase::Paused;
                    return;
                }
                GamePhase::Paused => {
                    self.phase = if self.ball_vel == Vec2::ZERO {
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

        self.move_player(input, dt);
        self.move_ai(dt);

        match self.phase {
            GamePhase::Serve => {
                self.ball_pos = Vec2::new(ARENA_W / 2.0, ARENA_H / 2.0);
                if self.serve_ticks > 0 {
                    self.serve_ticks -= 1;
                } else {
                    let angle: f32 = self.rng.random_range(-0.6..0.6);
                    self.ball_vel =
                        Vec2::new(angle.cos() * self.serve_dir, angle.sin()) * BALL_START_SPEED;
                    self.phase = GamePhase::Playing;
                }
            }
            GamePhase::Playing => self.tick_playing(dt),
            _ => {}
        }
    }

    fn move_player(&mut self, input: &TickInput, dt: f32) {
        let half = PADDLE_H / 2.0;
        if let Some(target) = input.target_y {
            let max_step = PLAYER_SPEED * 1.5 * dt;
            let delta = (target - self.player_y).clamp(-max_step, max_step);
            self.player_y += delta;
        } else {
            self.player_y += input.move_dir * PLAYER_SPEED * dt;
        }
        self.player_y = self.player_y.clamp(half, ARENA_H - half);
    }

    fn move_ai(&mut self, dt: f32) {
        let half = PADDLE_H / 2.0;
        // Track the ball when it approaches, drift home otherwise
        let target = if self.ball_vel.x > 0.0 {
            self.ball_pos.y
        } else {
            ARENA_H / 2.0
        };
        let delta = target - self.ai_y;
        if delta.abs() > AI_DEAD_ZONE {
            let step = delta.clamp(-AI_SPEED * dt, AI_SPEED * dt);
            self.ai_y = (self.ai_y + step).clamp(half, ARENA_H - half);
        }
    }

    fn tick_playing(&mut self, dt: f32) {
        self.ball_pos += self.ball_vel * dt;

        // Top/bottom walls
        if self.ball_pos.y - BALL_RADIUS < 0.0 {
            self.ball_pos.y = BALL_RADIUS;
            self.ball_vel.y = self.ball_vel.y.abs();
            self.events.push(GameEvent::WallHit);
        } else if self.ball_pos.y + BALL_RADIUS > ARENA_H {
            self.ball_pos.y = ARENA_H - BALL_RADIUS;
            self.ball_vel.y = -self.ball_vel.y.abs();
            self.events.push(GameEvent::WallHit);
        }

        // Player paddle (left)
        let px = PADDLE_MARGIN + PADDLE_W;
        if self.ball_vel.x < 0.0
            && self.ball_pos.x - BALL_RADIUS < px
            && self.ball_pos.x > PADDLE_MARGIN
            && (self.ball_pos.y - self.player_y).abs() < PADDLE_H / 2.0 + BALL_RADIUS
        {
            self.bounce_off_paddle(self.player_y, 1.0);
            self.ball_pos.x = px + BALL_RADIUS;
        }

        // AI paddle (right)
        let ax = ARENA_W - PADDLE_MARGIN - PADDLE_W;
        if self.ball_vel.x > 0.0
            && self.ball_pos.x + BALL_RADIUS > ax
            && self.ball_pos.x < ARENA_W - PADDLE_MARGIN
            && (self.ball_pos.y - self.ai_y).abs() < PADDLE_H / 2.0 + BALL_RADIUS
        {
            self.bounce_off_paddle(self.ai_y, -1.0);
            self.ball_pos.x = ax - BALL_RADIUS;
        }

        // Goals
        if self.ball_pos.x < -BALL_RADIUS {
            self.score_point(false);
        } else if self.ball_pos.x > ARENA_W + BALL_RADIUS {
            self.score_point(true);
        }
    }

    /// Angle from hit offset; `dir` is the outgoing x sign
    fn bounce_off_paddle(&mut self, paddle_y: f32, dir: f32) {
        let offset = ((self.ball_pos.y - paddle_y) / (PADDLE_H / 2.0)).clamp(-1.0, 1.0);
        let angle = offset * MAX_BOUNCE_ANGLE;
        let speed = (self.ball_vel.length() * RALLY_SPEEDUP).min(BALL_MAX_SPEED);
        self.ball_vel = Vec2::new(angle.cos() * dir, angle.sin()) * speed;
        self.events.push(GameEvent::PaddleHit);
    }

    fn score_point(&mut self, player: bool) {
        if player {
            self.player_score += 1;
            self.events.push(GameEvent::PlayerScored);
            self.serve_dir = -1.0; // Serve toward the loser of the point
        } else {
            self.ai_score += 1;
            self.events.push(GameEvent::AiScored);
            self.serve_dir = 1.0;
        }

        if self.player_score >= WIN_SCORE || self.ai_score >= WIN_SCORE {
            self.phase = GamePhase::GameOver;
            self.events.push(GameEvent::MatchOver {
                player_won: self.player_score >= WIN_SCORE,
            });
        } else {
            self.ball_vel = Vec2::ZERO;
            self.serve_ticks = SERVE_DELAY_TICKS;
            self.phase = GamePhase::Serve;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ticks(sim: &mut PongSim, n: u32) {
        let input = TickInput::default();
        for _ in 0..n {
            sim.tick(&input, SIM_DT);
        }
    }

    #[test]
    fn test_serve_after_delay() {
        let mut sim = PongSim::new(1);
        run_ticks(&mut sim, SERVE_DELAY_TICKS + 2);
        assert_eq!(sim.phase, GamePhase::Playing);
        assert!(sim.ball_vel.length() > 0.0);
    }

    #[test]
    fn test_ai_speed_capped() {
        let mut sim = PongSim::new(2);
        sim.phase = GamePhase::Playing;
        sim.ball_pos = Vec2::new(ARENA_W - 100.0, ARENA_H - 30.0);
        sim.ball_vel = Vec2::new(100.0, 0.0);
        let before = sim.ai_y;
        sim.tick(&TickInput::default(), SIM_DT);
        assert!((sim.ai_y - before).abs() <= AI_SPEED * SIM_DT + 0.001);
    }

    #[test]
    fn test_ai_dead_zone_holds_still() {
        let mut sim = PongSim::new(3);
        sim.phase = GamePhase::Playing;
        sim.ball_pos = Vec2::new(ARENA_W - 100.0, sim.ai_y + AI_DEAD_ZONE / 2.0);
        sim.ball_vel = Vec2::new(100.0, 0.0);
        let before = sim.ai_y;
        sim.tick(&TickInput::default(), SIM_DT);
        assert_eq!(sim.ai_y, before);
    }

    #[test]
    fn test_paddle_bounce_angle_clamped() {
        let mut sim = PongSim::new(4);
        sim.phase = GamePhase::Playing;
        // Graze the very edge of the player paddle
        sim.ball_pos = Vec2::new(
            PADDLE_MARGIN + PADDLE_W + BALL_RADIUS - 1.0,
            sim.player_y + PADDLE_H / 2.0 + BALL_RADIUS - 1.0,
        );
        sim.ball_vel = Vec2::new(-200.0, 0.0);
        sim.tick(&TickInput::default(), SIM_DT);
        assert!(sim.ball_vel.x > 0.0);
        let angle = sim.ball_vel.y.atan2(sim.ball_vel.x).abs();
        assert!(angle <= MAX_BOUNCE_ANGLE + 0.001, "angle {} too steep", angle);
    }

    #[test]
    fn test_player_point_and_reserve() {
        let mut sim = PongSim::new(5);
        sim.phase = GamePhase::Playing;
        sim.ball_pos = Vec2::new(ARENA_W + BALL_RADIUS + 5.0, 200.0);
        sim.ball_vel = Vec2::new(300.0, 0.0);
        sim.tick(&TickInput::default(), SIM_DT);
        assert_eq!(sim.player_score, 1);
        assert_eq!(sim.phase, GamePhase::Serve);
        assert_eq!(sim.serve_dir, -1.0);
        assert!(sim.events.contains(&GameEvent::PlayerScored));
    }

    #[test]
    fn test_match_ends_at_win_score() {
        let mut sim = PongSim::new(6);
        sim.phase = GamePhase::Playing;
        sim.player_score = WIN_SCORE - 1;
        assert!(sim.match_point());
        sim.ball_pos = Vec2::new(ARENA_W + BALL_RADIUS + 5.0, 200.0);
        sim.ball_vel = Vec2::new(300.0, 0.0);
        sim.tick(&TickInput::default(), SIM_DT);
        assert_eq!(sim.phase, GamePhase::GameOver);
        assert!(
            sim.events
                .contains(&GameEvent::MatchOver { player_won: true })
        );
    }

    #[test]
    fn test_rally_speeds_up_to_cap() {
        let mut sim = PongSim::new(7);
        sim.phase = GamePhase::Playing;
        sim.ball_vel = Vec2::new(-BALL_MAX_SPEED, 0.0);
        sim.ball_pos = Vec2::new(PADDLE_MARGIN + PADDLE_W + BALL_RADIUS - 1.0, sim.player_y);
        sim.tick(&TickInput::default(), SIM_DT);
        assert!(sim.ball_vel.length() <= BALL_MAX_SPEED + 0.001);
    }
}
