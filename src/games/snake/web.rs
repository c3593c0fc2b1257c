//! Snake wasm glue
//!
//! Owns the canvas, the keyboard/touch bindings, the rAF step clock, and the
//! `snake_best` LocalStorage key.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, TouchEvent};

use super::sim::{Dir, GRID_H, GRID_W, SnakeSim, StepOutcome};
use crate::audio::{AudioManager, SoundEffect};
use crate::platform::storage;
use crate::settings::Settings;

const BEST_KEY: &str = "snake_best";
const CELL: f64 = 20.0;

struct Game {
    sim: SnakeSim,
    step_accum: f32,
    last_time: f64,
    paused: bool,
    best: u64,
    best_beaten: bool,
    touch_start: Option<(f32, f32)>,
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
            sim: SnakeSim::new(js_sys::Date::now() as u64),
            step_accum: 0.0,
            last_time: 0.0,
            paused: false,
            best: storage::load_best(BEST_KEY),
            best_beaten: false,
            touch_start: None,
            audio,
            settings,
            canvas,
            ctx,
        }
    }

    fn restart(&mut self) {
        self.sim = SnakeSim::new(js_sys::Date::now() as u64);
        self.step_accum = 0.0;
        self.best_beaten = false;
        self.paused = false;
    }

    fn update(&mut self, dt: f32) {
        if self.paused || !self.sim.alive {
            return;
        }

        self.step_accum += dt;
        while self.step_accum >= self.sim.step_secs() {
            self.step_accum -= self.sim.step_secs();
            match self.sim.step() {
                StepOutcome::Ate => self.audio.play(SoundEffect::Pickup),
                StepOutcome::Died => {
                    self.audio.play(SoundEffect::Crash);
                    self.finish_run();
                    break;
                }
                StepOutcome::Won => {
                    self.audio.play(SoundEffect::LineClear);
                    self.finish_run();
                    break;
                }
                StepOutcome::Moved => {}
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
        log::info!("Snake run over (score {})", self.sim.score);
    }

    fn queue_turn(&mut self, dir: Dir) {
        if !self.paused && self.sim.alive {
            self.sim.queue_turn(dir);
        }
    }

    fn draw(&self) {
        let w = self.canvas.width() as f64;
        let h = self.canvas.height() as f64;
        let ctx = &self.ctx;

        ctx.set_fill_style_str("#101014");
        ctx.fill_rect(0.0, 0.0, w, h);

        // Food
        let (fx, fy) = self.sim.food;
        ctx.set_fill_style_str("#ff5252");
        ctx.begin_path();
        ctx.arc(
            fx as f64 * CELL + CELL / 2.0,
            fy as f64 * CELL + CELL / 2.0,
            CELL * 0.35,
            0.0,
            std::f64::consts::TAU,
        )
        .ok();
        ctx.fill();

        // Body, head brightest
        for (i, &(x, y)) in self.sim.body.iter().enumerate() {
            let color = if i == 0 { "#7dff6e" } else { "#3fae3a" };
            ctx.set_fill_style_str(color);
            ctx.fill_rect(
                x as f64 * CELL + 1.0,
                y as f64 * CELL + 1.0,
                CELL - 2.0,
                CELL - 2.0,
            );
        }

        // HUD
        ctx.set_fill_style_str("#e8e8e8");
        ctx.set_font("16px 'Fira Code', monospace");
        ctx.set_text_align("left");
        ctx.fill_text(&format!("SCORE {}", self.sim.score), 8.0, 22.0).ok();
        ctx.set_text_align("right");
        ctx.fill_text(&format!("BEST {}", self.best), w - 8.0, 22.0).ok();

        if self.paused {
            self.draw_overlay("PAUSED", "P to resume");
        } else if !self.sim.alive {
            if self.sim.won {
                self.draw_overlay("YOU WIN!", "Space to restart");
            } else if self.best_beaten {
                self.draw_overlay("GAME OVER - NEW BEST!", "Space to restart");
            } else {
                self.draw_overlay("GAME OVER", "Space to restart");
            }
        }
    }

    fn draw_overlay(&self, title: &str, hint: &str) {
        let w = self.canvas.width() as f64;
        let h = self.canvas.height() as f64;
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
}

/// Start Snake on the canvas with the given element id
#[wasm_bindgen]
pub fn start_snake(canvas_id: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str("no canvas"))?
        .dyn_into()?;
    canvas.set_width((GRID_W as f64 * CELL) as u32);
    canvas.set_height((GRID_H as f64 * CELL) as u32);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    let game = Rc::new(RefCell::new(Game::new(canvas.clone(), ctx)));
    setup_input(&canvas, game.clone())?;
    run_loop(game);

    log::info!("Snake running");
    Ok(())
}

fn setup_input(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // Keyboard
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let mut g = game.borrow_mut();
            g.audio.resume();
            match event.key().as_str() {
                "ArrowUp" | "w" | "W" => g.queue_turn(Dir::Up),
                "ArrowDown" | "s" | "S" => g.queue_turn(Dir::Down),
                "ArrowLeft" | "a" | "A" => g.queue_turn(Dir::Left),
                "ArrowRight" | "d" | "D" => g.queue_turn(Dir::Right),
                "p" | "P" | "Escape" => {
                    if g.sim.alive {
                        g.paused = !g.paused;
                        g.audio.play(SoundEffect::Blip);
                    }
                }
                " " | "Enter" => {
                    if !g.sim.alive {
                        g.restart();
                    }
                }
                _ => {}
            }
        });
        document.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Touch: swipe to turn, tap to restart when dead
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
            if !g.sim.alive {
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
                    return; // Tap, not a swipe
                }
                let dir = if dx.abs() > dy.abs() {
                    if dx > 0.0 { Dir::Right } else { Dir::Left }
                } else if dy > 0.0 {
                    Dir::Down
                } else {
                    Dir::Up
                };
                g.queue_turn(dir);
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
                if g.sim.alive {
                    g.paused = true;
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
            if g.sim.alive {
                g.paused = true;
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
                (((time - gm.last_time) / 1000.0) as f32).min(0.1)
            } else {
                0.0
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
