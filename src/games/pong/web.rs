//! Pong wasm glue
//!
//! Owns the canvas, pointer/keyboard bindings, the fixed-timestep loop, and
//! the `pong_best` LocalStorage key (best points scored in a match).

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent};

use super::sim::{
    ARENA_H, ARENA_W, BALL_RADIUS, GameEvent, GamePhase, MAX_SUBSTEPS, PADDLE_H, PADDLE_MARGIN,
    PADDLE_W, PongSim, SIM_DT, TickInput,
};
use crate::audio::{AudioManager, SoundEffect};
use crate::platform::storage;
use crate::settings::Settings;

const BEST_KEY: &str = "pong_best";

struct Game {
    sim: PongSim,
    input: TickInput,
    up_held: bool,
    down_held: bool,
    accumulator: f32,
    last_time: f64,
    best: u64,
    best_beaten: bool,
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
            sim: PongSim::new(js_sys::Date::now() as u64),
            input: TickInput::default(),
            up_held: false,
            down_held: false,
            accumulator: 0.0,
            last_time: 0.0,
            best: storage::load_best(BEST_KEY),
            best_beaten: false,
            audio,
            settings,
            canvas,
            ctx,
        }
    }

    fn restart(&mut self) {
        self.sim = PongSim::new(js_sys::Date::now() as u64);
        self.input = TickInput::default();
        self.accumulator = 0.0;
        self.best_beaten = false;
    }

    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        self.input.move_dir = (self.down_held as i8 as f32) - (self.up_held as i8 as f32);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            self.sim.tick(&input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            self.input.pause = false;
        }

        let events: Vec<GameEvent> = self.sim.events.drain(..).collect();
        for event in events {
            match event {
                GameEvent::WallHit | GameEvent::PaddleHit => self.audio.play(SoundEffect::Bounce),
                GameEvent::PlayerScored => self.audio.play(SoundEffect::Score),
                GameEvent::AiScored => self.audio.play(SoundEffect::Crash),
                GameEvent::MatchOver { player_won } => self.finish_match(player_won),
            }
        }
    }

    fn finish_match(&mut self, player_won: bool) {
        let score = self.sim.player_score as u64;
        if score > self.best {
            self.best = score;
            self.best_beaten = true;
            storage::save_best(BEST_KEY, self.best);
            self.audio.play(SoundEffect::HighScore);
        } else if player_won {
            self.audio.play(SoundEffect::LineClear);
        } else {
            self.audio.play(SoundEffect::GameOver);
        }
        log::info!(
            "Pong match over ({} - {})",
            self.sim.player_score,
            self.sim.ai_score
        );
    }

    fn draw(&self) {
        let ctx = &self.ctx;
        let w = ARENA_W as f64;
        let h = ARENA_H as f64;

        ctx.set_fill_style_str("#101014");
        ctx.fill_rect(0.0, 0.0, w, h);

        // Center line
        ctx.set_fill_style_str("#2e2e38");
        let mut y = 10.0;
        while y < h {
            ctx.fill_rect(w / 2.0 - 2.0, y, 4.0, 14.0);
            y += 28.0;
        }

        // Paddles
        ctx.set_fill_style_str("#e8e8e8");
        ctx.fill_rect(
            PADDLE_MARGIN as f64,
            (self.sim.player_y - PADDLE_H / 2.0) as f64,
            PADDLE_W as f64,
            PADDLE_H as f64,
        );
        ctx.fill_rect(
            (ARENA_W - PADDLE_MARGIN - PADDLE_W) as f64,
            (self.sim.ai_y - PADDLE_H / 2.0) as f64,
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

        // Scores
        ctx.set_fill_style_str("#e8e8e8");
        ctx.set_font("42px 'Fira Code', monospace");
        ctx.set_text_align("center");
        ctx.fill_text(&self.sim.player_score.to_string(), w / 2.0 - 70.0, 52.0)
            .ok();
        ctx.fill_text(&self.sim.ai_score.to_string(), w / 2.0 + 70.0, 52.0)
            .ok();

        ctx.set_font("13px 'Fira Code', monospace");
        ctx.set_text_align("left");
        ctx.fill_text(&format!("BEST {}", self.best), 8.0, 18.0).ok();

        if self.sim.match_point() && self.sim.phase != GamePhase::GameOver {
            ctx.set_fill_style_str("#ffd866");
            ctx.set_text_align("center");
            ctx.fill_text("MATCH POINT", w / 2.0, 80.0).ok();
        }

        match self.sim.phase {
            GamePhase::Paused => self.draw_overlay("PAUSED", "Esc to resume"),
            GamePhase::GameOver => {
                let title = if self.sim.player_score > self.sim.ai_score {
                    "YOU WIN!"
                } else {
                    "AI WINS"
                };
                self.draw_overlay(title, "Space to play again");
            }
            _ => {}
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
        ctx.set_font("28px 'Fira Code', monospace");
        ctx.fill_text(title, w / 2.0, h / 2.0 - 8.0).ok();
        ctx.set_font("15px 'Fira Code', monospace");
        ctx.fill_text(hint, w / 2.0, h / 2.0 + 24.0).ok();
    }

    fn client_to_arena_y(&self, client_y: f32) -> f32 {
        let rect = self.canvas.get_bounding_client_rect();
        let scale = ARENA_H / rect.height().max(1.0) as f32;
        (client_y - rect.top() as f32) * scale
    }
}

/// Start Pong on the canvas with the given element id
#[wasm_bindgen]
pub fn start_pong(canvas_id: &str) -> Result<(), JsValue> {
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

    log::info!("Pong running");
    Ok(())
}

fn setup_input(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // Mouse steers the player paddle
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
            let mut g = game.borrow_mut();
            let y = g.client_to_arena_y(event.client_y() as f32);
            g.input.target_y = Some(y);
        });
        canvas.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Click restarts after a match
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let mut g = game.borrow_mut();
            g.audio.resume();
            if g.sim.phase == GamePhase::GameOver {
                g.restart();
            }
        });
        canvas.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Touch drag steers
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
            event.prevent_default();
            if let Some(touch) = event.touches().get(0) {
                let mut g = game.borrow_mut();
                g.audio.resume();
                if g.sim.phase == GamePhase::GameOver {
                    g.restart();
                    return;
                }
                let y = g.client_to_arena_y(touch.client_y() as f32);
                g.input.target_y = Some(y);
            }
        });
        canvas.add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
            event.prevent_default();
            if let Some(touch) = event.touches().get(0) {
                let mut g = game.borrow_mut();
                let y = g.client_to_arena_y(touch.client_y() as f32);
                g.input.target_y = Some(y);
            }
        });
        canvas.add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Keyboard
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let mut g = game.borrow_mut();
            g.audio.resume();
            match event.key().as_str() {
                "ArrowUp" | "w" | "W" => {
                    g.up_held = true;
                    g.input.target_y = None;
                }
                "ArrowDown" | "s" | "S" => {
                    g.down_held = true;
                    g.input.target_y = None;
                }
                " " | "Enter" => {
                    if g.sim.phase == GamePhase::GameOver {
                        g.restart();
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
                "ArrowUp" | "w" | "W" => g.up_held = false,
                "ArrowDown" | "s" | "S" => g.down_held = false,
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
            gm.update(dt);
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
