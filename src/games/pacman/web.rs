//! Pac-Man wasm glue
//!
//! Owns the canvas, keyboard/touch bindings, the fixed-timestep loop, and the
//! `pacman_best` LocalStorage key. Tile positions from the sim are
//! interpolated per frame for smooth motion.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, TouchEvent};

use super::maze::{MAZE_H, MAZE_ROWS, MAZE_W, Pellet, tile_index};
use super::sim::{
    DOWN, Dir, GameEvent, GamePhase, GhostState, LEFT, MAX_SUBSTEPS, PacmanSim, RIGHT, SIM_DT,
    TickInput, UP,
};
use crate::audio::{AudioManager, SoundEffect};
use crate::platform::storage;
use crate::settings::Settings;

const BEST_KEY: &str = "pacman_best";
const TILE: f64 = 24.0;
const HUD_H: f64 = 36.0;

const GHOST_COLORS: [&str; 4] = ["#e05a5a", "#e899c8", "#3cd6e8", "#e0984a"];

struct Game {
    sim: PacmanSim,
    input: TickInput,
    accumulator: f32,
    last_time: f64,
    best: u64,
    best_beaten: bool,
    audio: AudioManager,
    settings: Settings,
    touch_start: Option<(f32, f32)>,
    ctx: CanvasRenderingContext2d,
}

impl Game {
    fn new(ctx: CanvasRenderingContext2d) -> Self {
        let settings = Settings::load();
        let mut audio = AudioManager::new();
        audio.set_master_volume(settings.master_volume);
        audio.set_sfx_volume(settings.sfx_volume);

        Self {
            sim: PacmanSim::new(js_sys::Date::now() as u64),
            input: TickInput::default(),
            accumulator: 0.0,
            last_time: 0.0,
            best: storage::load_best(BEST_KEY),
            best_beaten: false,
            audio,
            settings,
            touch_start: None,
            ctx,
        }
    }

    fn restart(&mut self) {
        self.sim = PacmanSim::new(js_sys::Date::now() as u64);
        self.input = TickInput::default();
        self.accumulator = 0.0;
        self.best_beaten = false;
    }

    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            self.sim.tick(&input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            self.input.pause = false;
            self.input.desired = None;
        }

        let events: Vec<GameEvent> = self.sim.events.drain(..).collect();
        for event in events {
            match event {
                GameEvent::DotEaten => self.audio.play(SoundEffect::Pickup),
                GameEvent::PowerEaten => self.audio.play(SoundEffect::PowerUp),
                GameEvent::GhostEaten => self.audio.play(SoundEffect::Explosion),
                GameEvent::LifeLost => self.audio.play(SoundEffect::Crash),
                GameEvent::LevelCleared => self.audio.play(SoundEffect::LineClear),
                GameEvent::GameOver => self.finish_run(),
            }
        }
    }

    fn finish_run(&mut self) {
        if self.sim.score > self.best {
            self.best = self.sim.score;
            self.best_beaten = true;
            storage::save_best(BEST_KEY, self.best);
            self.audio.play(SoundEffect::HighScore);
        } else {
            self.audio.play(SoundEffect::GameOver);
        }
        log::info!(
            "Pac-Man run over (score {}, level {})",
            self.sim.score,
            self.sim.level
        );
    }

    /// Interpolated pixel center for a stepped entity. Wrap steps snap
    /// instead of lerping across the whole board.
    fn lerp_pos(prev: (i32, i32), tile: (i32, i32), progress: f64) -> (f64, f64) {
        let (dx, dy) = (tile.0 - prev.0, tile.1 - prev.1);
        if dx.abs() > 1 || dy.abs() > 1 {
            return (
                tile.0 as f64 * TILE + TILE / 2.0,
                tile.1 as f64 * TILE + TILE / 2.0,
            );
        }
        let x = prev.0 as f64 + dx as f64 * progress;
        let y = prev.1 as f64 + dy as f64 * progress;
        (x * TILE + TILE / 2.0, y * TILE + TILE / 2.0)
    }

    fn draw(&self, time: f64) {
        let ctx = &self.ctx;
        let w = MAZE_W as f64 * TILE;
        let h = MAZE_H as f64 * TILE + HUD_H;

        ctx.set_fill_style_str("#000008");
        ctx.fill_rect(0.0, 0.0, w, h);

        // Walls and door from the static layout
        for (row, line) in MAZE_ROWS.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let x = col as f64 * TILE;
                let y = row as f64 * TILE;
                match ch {
                    '#' => {
                        ctx.set_fill_style_str("#1b2a6b");
                        ctx.fill_rect(x + 1.0, y + 1.0, TILE - 2.0, TILE - 2.0);
                    }
                    '=' => {
                        ctx.set_fill_style_str("#e899c8");
                        ctx.fill_rect(x + 2.0, y + TILE / 2.0 - 2.0, TILE - 4.0, 4.0);
                    }
                    _ => {}
                }
            }
        }

        // Pellets
        let blink_off = !self.settings.reduced_flash && (time / 250.0) as u64 % 2 == 0;
        for row in 0..MAZE_H {
            for col in 0..MAZE_W {
                let cx = col as f64 * TILE + TILE / 2.0;
                let cy = row as f64 * TILE + TILE / 2.0;
                match self.sim.pellets[tile_index(col, row)] {
                    Pellet::Dot => {
                        ctx.set_fill_style_str("#f2d2a9");
                        ctx.fill_rect(cx - 2.0, cy - 2.0, 4.0, 4.0);
                    }
                    Pellet::Power => {
                        if !blink_off {
                            ctx.set_fill_style_str("#f2d2a9");
                            ctx.begin_path();
                            ctx.arc(cx, cy, 6.0, 0.0, std::f64::consts::TAU).ok();
                            ctx.fill();
                        }
                    }
                    Pellet::None => {}
                }
            }
        }

        // Player: a disc with a mouth wedge opening toward the heading
        let (px, py) = Self::lerp_pos(
            self.sim.pac_prev,
            self.sim.pac_tile,
            self.sim.pac_progress() as f64,
        );
        let mouth = 0.35 * ((time / 60.0).sin().abs());
        let heading = match self.sim.pac_dir {
            d if d == RIGHT => 0.0,
            d if d == DOWN => std::f64::consts::FRAC_PI_2,
            d if d == LEFT => std::f64::consts::PI,
            _ => -std::f64::consts::FRAC_PI_2,
        };
        ctx.set_fill_style_str("#ffd866");
        ctx.begin_path();
        ctx.move_to(px, py);
        ctx.arc(
            px,
            py,
            TILE * 0.42,
            heading + mouth,
            heading - mouth + std::f64::consts::TAU,
        )
        .ok();
        ctx.close_path();
        ctx.fill();

        // Ghosts
        for (i, ghost) in self.sim.ghosts.iter().enumerate() {
            let (gx, gy) = Self::lerp_pos(
                ghost.prev_tile,
                ghost.tile,
                self.sim.ghost_progress(i) as f64,
            );
            let r = TILE * 0.42;
            match ghost.state {
                GhostState::Eaten => {
                    // Just the eyes heading home
                    ctx.set_fill_style_str("#ffffff");
                    for ex in [-4.0, 4.0] {
                        ctx.begin_path();
                        ctx.arc(gx + ex, gy - 2.0, 3.0, 0.0, std::f64::consts::TAU).ok();
                        ctx.fill();
                    }
                    continue;
                }
                GhostState::Frightened => {
                    // Flash white as the window runs out
                    let closing = self.sim.frightened_ticks < 240;
                    let flash = closing
                        && !self.settings.reduced_flash
                        && (time / 180.0) as u64 % 2 == 0;
                    ctx.set_fill_style_str(if flash { "#e8e8e8" } else { "#3a4ae0" });
                }
                _ => ctx.set_fill_style_str(GHOST_COLORS[i % GHOST_COLORS.len()]),
            }
            // Dome plus skirt
            ctx.begin_path();
            ctx.arc(gx, gy - 1.0, r, std::f64::consts::PI, std::f64::consts::TAU)
                .ok();
            ctx.fill();
            ctx.fill_rect(gx - r, gy - 1.0, r * 2.0, r);
            if ghost.state != GhostState::Frightened {
                ctx.set_fill_style_str("#ffffff");
                for ex in [-4.0, 4.0] {
                    ctx.begin_path();
                    ctx.arc(gx + ex, gy - 3.0, 3.0, 0.0, std::f64::consts::TAU).ok();
                    ctx.fill();
                }
            }
        }

        // HUD strip below the maze
        let hud_y = MAZE_H as f64 * TILE + 24.0;
        ctx.set_fill_style_str("#e8e8e8");
        ctx.set_font("15px 'Fira Code', monospace");
        ctx.set_text_align("left");
        ctx.fill_text(&format!("SCORE {}", self.sim.score), 8.0, hud_y).ok();
        ctx.set_text_align("center");
        ctx.fill_text(
            &format!("LIVES {}  LVL {}", self.sim.lives, self.sim.level),
            w / 2.0,
            hud_y,
        )
        .ok();
        ctx.set_text_align("right");
        ctx.fill_text(&format!("BEST {}", self.best), w - 8.0, hud_y).ok();

        match self.sim.phase {
            GamePhase::Paused => self.draw_overlay("PAUSED", "Esc to resume"),
            GamePhase::GameOver => {
                let title = if self.best_beaten {
                    "NEW BEST!"
                } else {
                    "GAME OVER"
                };
                self.draw_overlay(title, "Space to restart");
            }
            GamePhase::Playing => {}
        }
    }

    fn draw_overlay(&self, title: &str, hint: &str) {
        let ctx = &self.ctx;
        let w = MAZE_W as f64 * TILE;
        let h = MAZE_H as f64 * TILE + HUD_H;

        ctx.set_fill_style_str("rgba(0,0,0,0.6)");
        ctx.fill_rect(0.0, 0.0, w, h);
        ctx.set_fill_style_str("#ffffff");
        ctx.set_text_align("center");
        ctx.set_font("26px 'Fira Code', monospace");
        ctx.fill_text(title, w / 2.0, h / 2.0 - 8.0).ok();
        ctx.set_font("15px 'Fira Code', monospace");
        ctx.fill_text(hint, w / 2.0, h / 2.0 + 24.0).ok();
    }
}

/// Start Pac-Man on the canvas with the given element id
#[wasm_bindgen]
pub fn start_pacman(canvas_id: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str("no canvas"))?
        .dyn_into()?;
    canvas.set_width((MAZE_W as f64 * TILE) as u32);
    canvas.set_height((MAZE_H as f64 * TILE + HUD_H) as u32);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    let game = Rc::new(RefCell::new(Game::new(ctx)));
    setup_input(&canvas, game.clone())?;
    run_loop(game);

    log::info!("Pac-Man running");
    Ok(())
}

fn setup_input(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let mut g = game.borrow_mut();
            g.audio.resume();
            let dir: Option<Dir> = match event.key().as_str() {
                "ArrowUp" | "w" | "W" => Some(UP),
                "ArrowDown" | "s" | "S" => Some(DOWN),
                "ArrowLeft" | "a" | "A" => Some(LEFT),
                "ArrowRight" | "d" | "D" => Some(RIGHT),
                " " | "Enter" => {
                    if g.sim.phase == GamePhase::GameOver {
                        g.restart();
                    }
                    None
                }
                "Escape" | "p" | "P" => {
                    g.input.pause = true;
                    None
                }
                _ => None,
            };
            if dir.is_some() {
                event.prevent_default();
                g.input.desired = dir;
            }
        });
        window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Swipe to steer
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
            event.prevent_default();
            if let Some(touch) = event.touches().get(0) {
                game.borrow_mut().touch_start =
                    Some((touch.client_x() as f32, touch.client_y() as f32));
            }
        });
        canvas.add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
            event.prevent_default();
            let mut g = game.borrow_mut();
            g.audio.resume();
            if g.sim.phase == GamePhase::GameOver {
                g.restart();
                return;
            }
            let Some((sx, sy)) = g.touch_start.take() else {
                return;
            };
            if let Some(touch) = event.changed_touches().get(0) {
                let dx = touch.client_x() as f32 - sx;
                let dy = touch.client_y() as f32 - sy;
                if dx.abs().max(dy.abs()) < 24.0 {
                    return;
                }
                let dir = if dx.abs() > dy.abs() {
                    if dx > 0.0 { RIGHT } else { LEFT }
                } else if dy > 0.0 {
                    DOWN
                } else {
                    UP
                };
                g.input.desired = Some(dir);
            }
        });
        canvas.add_event_listener_with_callback("touchend", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Auto-pause when the tab is hidden
    {
        let game = game.clone();
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                let mut g = game.borrow_mut();
                if g.sim.phase == GamePhase::Playing {
                    g.input.pause = true;
                }
            }
        });
        document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Mute on blur per settings
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
            let mut g = game.borrow_mut();
            if g.settings.mute_on_blur {
                g.audio.set_muted(true);
            }
            if g.sim.phase == GamePhase::Playing {
                g.input.pause = true;
            }
        });
        window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
            game.borrow_mut().audio.set_muted(false);
        });
        window.add_event_listener_with_callback("focus", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    Ok(())
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn run_loop(game: Rc<RefCell<Game>>) {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |time: f64| {
        {
            let mut gm = game.borrow_mut();
            let dt = if gm.last_time > 0.0 {
                ((time - gm.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            gm.last_time = time;
            gm.update(dt);
            gm.draw(time);
        }
        if let Some(w) = web_sys::window() {
            let _ = w.request_animation_frame(f.borrow().as_ref().unwrap().as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut(f64)>));

    if let Some(w) = web_sys::window() {
        let _ = w.request_animation_frame(g.borrow().as_ref().unwrap().as_ref().unchecked_ref());
    }
}
