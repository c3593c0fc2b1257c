//! Dodge wasm glue
//!
//! Owns the canvas, lane-move bindings, the fixed-timestep loop, and the
//! `dodge_best` LocalStorage key.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent};

use super::sim::{
    DodgeSim, GameEvent, GamePhase, LANES, MAX_SUBSTEPS, SIM_DT, TickInput,
};
use crate::audio::{AudioManager, SoundEffect};
use crate::platform::storage;
use crate::settings::Settings;

const BEST_KEY: &str = "dodge_best";
const ARENA_W: f64 = 480.0;
const ARENA_H: f64 = 480.0;
const PLAYER_Y: f64 = ARENA_H - 70.0;
const PLAYER_SIZE: f64 = 36.0;

struct Game {
    sim: DodgeSim,
    input: TickInput,
    accumulator: f32,
    last_time: f64,
    best: u64,
    best_beaten: bool,
    audio: AudioManager,
    settings: Settings,
    ctx: CanvasRenderingContext2d,
}

impl Game {
    fn new(ctx: CanvasRenderingContext2d) -> Self {
        let settings = Settings::load();
        let mut audio = AudioManager::new();
        audio.set_master_volume(settings.master_volume);
        audio.set_sfx_volume(settings.sfx_volume);

        Self {
            sim: DodgeSim::new(js_sys::Date::now() as u64),
            input: TickInput::default(),
            accumulator: 0.0,
            last_time: 0.0,
            best: storage::load_best(BEST_KEY),
            best_beaten: false,
            audio,
            settings,
            ctx,
        }
    }

    fn restart(&mut self) {
        self.sim = DodgeSim::new(js_sys::Date::now() as u64);
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

            // Clear one-shot inputs after processing
            self.input.move_dir = 0;
            self.input.pause = false;
        }

        let events: Vec<GameEvent> = self.sim.events.drain(..).collect();
        for event in events {
            match event {
                GameEvent::Telegraph => self.audio.play(SoundEffect::Blip),
                GameEvent::Strike => self.audio.play(SoundEffect::Explosion),
                GameEvent::Crash => {
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
        log::info!("Dodge run over (score {})", self.sim.score);
    }

    fn draw(&self) {
        let ctx = &self.ctx;
        let lane_w = ARENA_W / LANES as f64;

        ctx.set_fill_style_str("#101014");
        ctx.fill_rect(0.0, 0.0, ARENA_W, ARENA_H);

        // Lane separators
        ctx.set_stroke_style_str("#26262e");
        ctx.set_line_width(1.0);
        for i in 1..LANES {
            let x = i as f64 * lane_w;
            ctx.begin_path();
            ctx.move_to(x, 0.0);
            ctx.line_to(x, ARENA_H);
            ctx.stroke();
        }

        // Hazards: warning wash during telegraph, solid column during strike
        let full_window = self.sim.telegraph_ticks();
        for h in &self.sim.hazards {
            let x = h.lane as f64 * lane_w;
            if h.striking() {
                ctx.set_fill_style_str("rgba(255,70,70,0.85)");
                ctx.fill_rect(x, 0.0, lane_w, ARENA_H);
            } else {
                // Flash quickens as the strike nears; static under reduced flash
                let progress = h.telegraph_progress(full_window) as f64;
                let alpha = if self.settings.reduced_flash {
                    0.25
                } else {
                    let rate = 6.0 + progress * 14.0;
                    0.15 + 0.2 * ((self.sim.time_ticks as f64 * SIM_DT as f64 * rate).sin().abs())
                };
                ctx.set_fill_style_str(&format!("rgba(255,170,60,{:.3})", alpha));
                ctx.fill_rect(x, 0.0, lane_w, ARENA_H);
                ctx.set_fill_style_str("#ffaa3c");
                ctx.set_font("22px 'Fira Code', monospace");
                ctx.set_text_align("center");
                ctx.fill_text("!", x + lane_w / 2.0, 40.0).ok();
            }
        }

        // Player
        let px = self.sim.player_lane as f64 * lane_w + lane_w / 2.0;
        ctx.set_fill_style_str("#7dff6e");
        ctx.fill_rect(
            px - PLAYER_SIZE / 2.0,
            PLAYER_Y - PLAYER_SIZE / 2.0,
            PLAYER_SIZE,
            PLAYER_SIZE,
        );

        // HUD
        ctx.set_fill_style_str("#e8e8e8");
        ctx.set_font("16px 'Fira Code', monospace");
        ctx.set_text_align("left");
        ctx.fill_text(&format!("SCORE {}", self.sim.score), 8.0, 22.0).ok();
        ctx.set_text_align("right");
        ctx.fill_text(&format!("BEST {}", self.best), ARENA_W - 8.0, 22.0).ok();

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
        ctx.set_fill_style_str("rgba(0,0,0,0.6)");
        ctx.fill_rect(0.0, 0.0, ARENA_W, ARENA_H);
        ctx.set_fill_style_str("#ffffff");
        ctx.set_text_align("center");
        ctx.set_font("28px 'Fira Code', monospace");
        ctx.fill_text(title, ARENA_W / 2.0, ARENA_H / 2.0 - 8.0).ok();
        ctx.set_font("15px 'Fira Code', monospace");
        ctx.fill_text(hint, ARENA_W / 2.0, ARENA_H / 2.0 + 24.0).ok();
    }
}

/// Start Dodge on the canvas with the given element id
#[wasm_bindgen]
pub fn start_dodge(canvas_id: &str) -> Result<(), JsValue> {
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

    let game = Rc::new(RefCell::new(Game::new(ctx)));
    setup_input(&canvas, game.clone())?;
    run_loop(game);

    log::info!("Dodge running");
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
            match event.key().as_str() {
                "ArrowLeft" | "a" | "A" => g.input.move_dir = -1,
                "ArrowRight" | "d" | "D" => g.input.move_dir = 1,
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

    // Tap left/right half to move
    {
        let game = game.clone();
        let canvas_clone = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
            event.prevent_default();
            let mut g = game.borrow_mut();
            g.audio.resume();
            if g.sim.phase == GamePhase::GameOver {
                g.restart();
                return;
            }
            if let Some(touch) = event.touches().get(0) {
                let rect = canvas_clone.get_bounding_client_rect();
                let x = touch.client_x() as f64 - rect.left();
                g.input.move_dir = if x < rect.width() / 2.0 { -1 } else { 1 };
            }
        });
        canvas.add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Click halves work the same way
    {
        let game = game.clone();
        let canvas_clone = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
            let mut g = game.borrow_mut();
            g.audio.resume();
            if g.sim.phase == GamePhase::GameOver {
                g.restart();
                return;
            }
            let rect = canvas_clone.get_bounding_client_rect();
            let x = event.client_x() as f64 - rect.left();
            g.input.move_dir = if x < rect.width() / 2.0 { -1 } else { 1 };
        });
        canvas.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
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
