//! Breakout wasm glue
//!
//! Owns the canvas, pointer/keyboard bindings, the fixed-timestep loop, and
//! the `breakout_best` LocalStorage key.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent};

use super::sim::{
    ARENA_H, ARENA_W, BALL_RADIUS, BreakoutSim, GameEvent, GamePhase, MAX_SUBSTEPS, PADDLE_H,
    PADDLE_W, PADDLE_Y, SIM_DT, TickInput,
};
use crate::audio::{AudioManager, SoundEffect};
use crate::platform::storage;
use crate::settings::Settings;

const BEST_KEY: &str = "breakout_best";

struct Game {
    sim: BreakoutSim,
    input: TickInput,
    left_held: bool,
    right_held: bool,
    accumulator: f32,
    last_time: f64,
    best: u64,
    best_beaten: bool,
    // FPS tracking
    frame_times: [f64; 60],
    frame_index: usize,
    fps: u32,
    audio: AudioManager,
    settings: Settings,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Game {
    fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        let settings = Settings::load();
        let mut audio = AudioManager::new();
        audio.set_master_volume(settings.master_volume);
        audio.set_sfx_volume(settings.sfx_volume);

        Self {
            sim: BreakoutSim::new(js_sys::Date::now() as u64),
            input: TickInput::default(),
            left_held: false,
            right_held: false,
            accumulator: 0.0,
            last_time: 0.0,
            best: storage::load_best(BEST_KEY),
            best_beaten: false,
            frame_times: [0.0; 60],
            frame_index: 0,
            fps: 0,
            audio,
            settings,
            canvas,
            ctx,
        }
    }

    fn restart(&mut self) {
        self.sim = BreakoutSim::new(js_sys::Date::now() as u64);
        self.input = TickInput::default();
        self.accumulator = 0.0;
        self.best_beaten = false;
    }

    /// Run simulation ticks
    fn update(&mut self, dt: f32, time: f64) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        self.input.move_dir =
            (self.right_held as i8 as f32) - (self.left_held as i8 as f32);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            self.sim.tick(&input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.launch = false;
            self.input.pause = false;
        }

        self.drain_events();

        // Track frame times for FPS
        self.frame_times[self.frame_index] = time;
        self.frame_index = (self.frame_index + 1) % 60;
        let oldest = self.frame_times[self.frame_index];
        if oldest > 0.0 {
            let elapsed = time - oldest;
            if elapsed > 0.0 {
                self.fps = (60000.0 / elapsed).round() as u32;
            }
        }
    }

    fn drain_events(&mut self) {
        let events: Vec<GameEvent> = self.sim.events.drain(..).collect();
        for event in events {
            match event {
                GameEvent::WallHit | GameEvent::PaddleHit => self.audio.play(SoundEffect::Bounce),
                GameEvent::BrickHit => self.audio.play(SoundEffect::Blip),
                GameEvent::BrickBroken => self.audio.play(SoundEffect::Break),
                GameEvent::WaveCleared => self.audio.play(SoundEffect::LineClear),
                GameEvent::BallLost => self.audio.play(SoundEffect::Crash),
                GameEvent::GameOver => {
                    self.audio.play(SoundEffect::Crash);
                    self.finish_run();
                }
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
        log::info!("Breakout run over (score {})", self.sim.score);
    }

    fn draw(&self) {
        let ctx = &self.ctx;

        ctx.set_fill_style_str("#101014");
        ctx.fill_rect(0.0, 0.0, ARENA_W as f64, ARENA_H as f64);

        // Bricks, tinted by row; armored bricks render pale until cracked
        const ROW_COLORS: [&str; 6] = [
            "#e05a5a", "#e0984a", "#f2d24b", "#57d45a", "#3cd6e8", "#4a6ee0",
        ];
        for brick in &self.sim.bricks {
            let color = if brick.hp > 1 {
                "#9aa0b0"
            } else {
                ROW_COLORS[brick.row % ROW_COLORS.len()]
            };
            ctx.set_fill_style_str(color);
            ctx.fill_rect(
                brick.pos.x as f64,
                brick.pos.y as f64,
                brick.size.x as f64,
                brick.size.y as f64,
            );
        }

        // Paddle
        ctx.set_fill_style_str("#e8e8e8");
        ctx.fill_rect(
            (self.sim.paddle_x - PADDLE_W / 2.0) as f64,
            (PADDLE_Y - PADDLE_H / 2.0) as f64,
            PADDLE_W as f64,
            PADDLE_H as f64,
        );

        // Ball
        ctx.set_fill_style_str("#ffd866");
        ctx.begin_path();
        ctx.arc(
            self.sim.ball_pos.x as f64,
            self.sim.ball_pos.y as f64,
            BALL_RADIUS as f64,
            0.0,
            std::f64::consts::TAU,
        )
        .ok();
        ctx.fill();

        // HUD
        ctx.set_fill_style_str("#e8e8e8");
        ctx.set_font("16px 'Fira Code', monospace");
        ctx.set_text_align("left");
        ctx.fill_text(&format!("SCORE {}", self.sim.score), 8.0, 22.0).ok();
        ctx.set_text_align("center");
        ctx.fill_text(&format!("LIVES {}", self.sim.lives), ARENA_W as f64 / 2.0, 22.0)
            .ok();
        ctx.set_text_align("right");
        ctx.fill_text(&format!("BEST {}", self.best), ARENA_W as f64 - 8.0, 22.0)
            .ok();
        if self.settings.show_fps {
            ctx.set_font("12px 'Fira Code', monospace");
            ctx.fill_text(&format!("{} fps", self.fps), ARENA_W as f64 - 8.0, 40.0)
                .ok();
        }

        match self.sim.phase {
            GamePhase::Serve => {
                ctx.set_text_align("center");
                ctx.set_font("15px 'Fira Code', monospace");
                ctx.fill_text(
                    "Click, tap, or press Space to launch",
                    ARENA_W as f64 / 2.0,
                    (PADDLE_Y - 60.0) as f64,
                )
                .ok();
            }
            GamePhase::Paused => self.draw_overlay("PAUSED", "Esc to resume"),
            GamePhase::GameOver => {
                if self.best_beaten {
                    self.draw_overlay("GAME OVER - NEW BEST!", "Space to restart");
                } else {
                    self.draw_overlay("GAME OVER", "Space to restart");
                }
            }
            GamePhase::Playing => {}
        }
    }

    fn draw_overlay(&self, title: &str, hint: &str) {
        let w = ARENA_W as f64;
        let h = ARENA_H as f64;
        let ctx = &self.ctx;

        ctx.set_fill_style_str("rgba(0,0,0,0.6)");
        ctx.fill_rect(0.0, 0.0, w, h);
        ctx.set_fill_style_str("#ffffff");
        ctx.set_text_align("center");
        ctx.set_font("26px 'Fira Code', monospace");
        ctx.fill_text(title, w / 2.0, h / 2.0 - 8.0).ok();
        ctx.set_font("15px 'Fira Code', monospace");
        ctx.fill_text(hint, w / 2.0, h / 2.0 + 24.0).ok();
    }

    /// Convert a client-space x coordinate to arena space
    fn client_to_arena_x(&self, client_x: f32) -> f32 {
        let rect = self.canvas.get_bounding_client_rect();
        let scale = ARENA_W / rect.width().max(1.0) as f32;
        (client_x - rect.left() as f32) * scale
    }
}

/// Start Breakout on the canvas with the given element id
#[wasm_bindgen]
pub fn start_breakout(canvas_id: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str("no canvas"))?
        .dyn_into()?;
    canvas.set_width(ARENA_W as u32);
    canvas.set_height(ARENA_H as u32);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    let game = Rc::new(RefCell::new(Game::new(canvas.clone(), ctx)));
    setup_input(&canvas, game.clone())?;
    run_loop(game);

    log::info!("Breakout running");
    Ok(())
}

fn setup_input(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // Mouse move steers the paddle
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
            let mut g = game.borrow_mut();
            let x = g.client_to_arena_x(event.client_x() as f32);
            g.input.target_x = Some(x);
        });
        canvas.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Click launches / restarts
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let mut g = game.borrow_mut();
            g.audio.resume();
            if g.sim.phase == GamePhase::GameOver {
                g.restart();
            } else {
                g.input.launch = true;
            }
        });
        canvas.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Touch: drag steers, tap launches
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
            event.prevent_default();
            if let Some(touch) = event.touches().get(0) {
                let mut g = game.borrow_mut();
                let x = g.client_to_arena_x(touch.client_x() as f32);
                g.input.target_x = Some(x);
            }
        });
        canvas.add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref())?;
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
            } else {
                g.input.launch = true;
            }
            if let Some(touch) = event.touches().get(0) {
                let x = g.client_to_arena_x(touch.client_x() as f32);
                g.input.target_x = Some(x);
            }
        });
        canvas.add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Keyboard
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let mut g = game.borrow_mut();
            g.audio.resume();
            match event.key().as_str() {
                "ArrowLeft" | "a" | "A" => {
                    g.left_held = true;
                    g.input.target_x = None;
                }
                "ArrowRight" | "d" | "D" => {
                    g.right_held = true;
                    g.input.target_x = None;
                }
                " " | "Enter" => {
                    if g.sim.phase == GamePhase::GameOver {
                        g.restart();
                    } else {
                        g.input.launch = true;
                    }
                }
                "Escape" | "p" | "P" => g.input.pause = true,
                _ => {}
            }
        });
        window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let mut g = game.borrow_mut();
            match event.key().as_str() {
                "ArrowLeft" | "a" | "A" => g.left_held = false,
                "ArrowRight" | "d" | "D" => g.right_held = false,
                _ => {}
            }
        });
        window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Auto-pause when the tab is hidden
    {
        let game = game.clone();
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                let mut g = game.borrow_mut();
                if matches!(g.sim.phase, GamePhase::Playing | GamePhase::Serve) {
                    g.input.pause = true;
                    log::info!("Auto-paused (tab hidden)");
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
            if matches!(g.sim.phase, GamePhase::Playing | GamePhase::Serve) {
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
            gm.update(dt, time);
            gm.draw();
        }
        if let Some(w) = web_sys::window() {
            let _ = w.request_animation_frame(f.borrow().as_ref().unwrap().as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut(f64)>));

    if let Some(w) = web_sys::window() {
        let _ = w.request_animation_frame(g.borrow().as_ref().unwrap().as_ref().unchecked_ref());
    }
}
