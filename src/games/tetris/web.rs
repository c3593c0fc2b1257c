//! Tetris wasm glue
//!
//! Owns the canvas, keyboard bindings, the gravity clock, and the
//! `tetris_best` LocalStorage key.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent};

use super::sim::{FallOutcome, TetrisSim, WELL_H, WELL_W};
use crate::audio::{AudioManager, SoundEffect};
use crate::platform::storage;
use crate::settings::Settings;

const BEST_KEY: &str = "tetris_best";
const CELL: f64 = 28.0;
const PANEL_W: f64 = 140.0;

struct Game {
    sim: TetrisSim,
    gravity_accum: f32,
    last_time: f64,
    paused: bool,
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
            sim: TetrisSim::new(js_sys::Date::now() as u64),
            gravity_accum: 0.0,
            last_time: 0.0,
            paused: false,
            best: storage::load_best(BEST_KEY),
            best_beaten: false,
            audio,
            settings,
            canvas,
            ctx,
        }
    }

    fn restart(&mut self) {
        self.sim = TetrisSim::new(js_sys::Date::now() as u64);
        self.gravity_accum = 0.0;
        self.best_beaten = false;
        self.paused = false;
    }

    fn update(&mut self, dt: f32) {
        if self.paused || self.sim.game_over {
            return;
        }
        self.gravity_accum += dt;
        while self.gravity_accum >= self.sim.gravity_secs() {
            self.gravity_accum -= self.sim.gravity_secs();
            let outcome = self.sim.fall();
            self.handle_outcome(outcome);
            if self.sim.game_over {
                break;
            }
        }
    }

    fn handle_outcome(&mut self, outcome: FallOutcome) {
        match outcome {
            FallOutcome::Moved => {}
            FallOutcome::Locked { lines_cleared: 0 } => self.audio.play(SoundEffect::Drop),
            FallOutcome::Locked { .. } => self.audio.play(SoundEffect::LineClear),
            FallOutcome::GameOver => {
                self.audio.play(SoundEffect::Crash);
                self.finish_run();
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
            "Tetris run over (score {}, lines {})",
            self.sim.score,
            self.sim.lines
        );
    }

    fn draw(&self) {
        let ctx = &self.ctx;
        let well_w = WELL_W as f64 * CELL;
        let well_h = WELL_H as f64 * CELL;

        ctx.set_fill_style_str("#101014");
        ctx.fill_rect(0.0, 0.0, well_w + PANEL_W, well_h);

        // Settled cells
        for (y, row) in self.sim.board.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if let Some(kind) = cell {
                    ctx.set_fill_style_str(kind.color());
                    ctx.fill_rect(
                        x as f64 * CELL + 1.0,
                        y as f64 * CELL + 1.0,
                        CELL - 2.0,
                        CELL - 2.0,
                    );
                }
            }
        }

        if !self.sim.game_over {
            // Ghost outline at the landing row
            let ghost_y = self.sim.ghost_y();
            ctx.set_stroke_style_str("rgba(255,255,255,0.25)");
            ctx.set_line_width(2.0);
            for (cx, cy) in self.sim.active.kind.cells(self.sim.active.rot) {
                let gx = (self.sim.active.x + cx) as f64 * CELL;
                let gy = (ghost_y + cy) as f64 * CELL;
                ctx.stroke_rect(gx + 2.0, gy + 2.0, CELL - 4.0, CELL - 4.0);
            }

            // Active piece
            ctx.set_fill_style_str(self.sim.active.kind.color());
            for (x, y) in self.sim.active.cells() {
                ctx.fill_rect(
                    x as f64 * CELL + 1.0,
                    y as f64 * CELL + 1.0,
                    CELL - 2.0,
                    CELL - 2.0,
                );
            }
        }

        // Well border
        ctx.set_stroke_style_str("#3a3a44");
        ctx.set_line_width(2.0);
        ctx.stroke_rect(0.0, 0.0, well_w, well_h);

        // Side panel
        let px = well_w + 16.0;
        ctx.set_fill_style_str("#e8e8e8");
        ctx.set_font("15px 'Fira Code', monospace");
        ctx.set_text_align("left");
        ctx.fill_text(&format!("SCORE {}", self.sim.score), px, 28.0).ok();
        ctx.fill_text(&format!("BEST  {}", self.best), px, 50.0).ok();
        ctx.fill_text(&format!("LEVEL {}", self.sim.level), px, 72.0).ok();
        ctx.fill_text(&format!("LINES {}", self.sim.lines), px, 94.0).ok();
        ctx.fill_text("NEXT", px, 130.0).ok();

        // Next-piece previews
        let preview_cell = CELL * 0.6;
        for (i, kind) in self.sim.next_queue.iter().enumerate() {
            ctx.set_fill_style_str(kind.color());
            for (cx, cy) in kind.cells(0) {
                ctx.fill_rect(
                    px + cx as f64 * preview_cell,
                    144.0 + i as f64 * preview_cell * 3.0 + cy as f64 * preview_cell,
                    preview_cell - 1.0,
                    preview_cell - 1.0,
                );
            }
        }

        if self.paused {
            self.draw_overlay("PAUSED", "P to resume");
        } else if self.sim.game_over {
            if self.best_beaten {
                self.draw_overlay("GAME OVER - NEW BEST!", "Enter to restart");
            } else {
                self.draw_overlay("GAME OVER", "Enter to restart");
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
        ctx.set_font("24px 'Fira Code', monospace");
        ctx.fill_text(title, w / 2.0, h / 2.0 - 8.0).ok();
        ctx.set_font("15px 'Fira Code', monospace");
        ctx.fill_text(hint, w / 2.0, h / 2.0 + 24.0).ok();
    }
}

/// Start Tetris on the canvas with the given element id
#[wasm_bindgen]
pub fn start_tetris(canvas_id: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str("no canvas"))?
        .dyn_into()?;
    canvas.set_width((WELL_W as f64 * CELL + PANEL_W) as u32);
    canvas.set_height((WELL_H as f64 * CELL) as u32);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    let game = Rc::new(RefCell::new(Game::new(canvas, ctx)));
    setup_input(game.clone())?;
    run_loop(game);

    log::info!("Tetris running");
    Ok(())
}

fn setup_input(game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let mut g = game.borrow_mut();
            g.audio.resume();
            if g.sim.game_over {
                if matches!(event.key().as_str(), "Enter" | " ") {
                    g.restart();
                }
                return;
            }
            if g.paused {
                if matches!(event.key().as_str(), "p" | "P" | "Escape") {
                    g.paused = false;
                }
                return;
            }
            match event.key().as_str() {
                "ArrowLeft" | "a" | "A" => {
                    if g.sim.move_horizontal(-1) {
                        g.audio.play(SoundEffect::Blip);
                    }
                }
                "ArrowRight" | "d" | "D" => {
                    if g.sim.move_horizontal(1) {
                        g.audio.play(SoundEffect::Blip);
                    }
                }
                "ArrowUp" | "x" | "X" => {
                    if g.sim.rotate(true) {
                        g.audio.play(SoundEffect::Blip);
                    }
                }
                "z" | "Z" => {
                    if g.sim.rotate(false) {
                        g.audio.play(SoundEffect::Blip);
                    }
                }
                "ArrowDown" | "s" | "S" => {
                    let outcome = g.sim.soft_drop();
                    g.handle_outcome(outcome);
                }
                " " => {
                    event.prevent_default();
                    let outcome = g.sim.hard_drop();
                    g.handle_outcome(outcome);
                }
                "p" | "P" | "Escape" => {
                    g.paused = true;
                    g.audio.play(SoundEffect::Blip);
                }
                _ => {}
            }
        });
        document.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Auto-pause when the tab is hidden
    {
        let game = game.clone();
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                let mut g = game.borrow_mut();
                if !g.sim.game_over {
                    g.paused = true;
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
            if !g.sim.game_over {
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
