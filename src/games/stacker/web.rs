//! Stacker wasm glue
//!
//! One-button input drops the sweeping slab. Owns the `stacker_best`
//! LocalStorage key.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent};

use super::sim::{
    ARENA_H, ARENA_W, GameEvent, GamePhase, MAX_SUBSTEPS, SIM_DT, SLAB_H, StackerSim,
};
use crate::audio::{AudioManager, SoundEffect};
use crate::platform::storage;
use crate::settings::Settings;

const BEST_KEY: &str = "stacker_best";

/// Tower rows render above this line once the stack grows tall
const CAMERA_LINE: f32 = 220.0;

const SLAB_COLORS: [&str; 6] = [
    "#e05a5a", "#e0984a", "#f2d24b", "#57d45a", "#3cd6e8", "#b45ae0",
];

struct Game {
    sim: StackerSim,
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
            sim: StackerSim::new(),
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
        self.sim = StackerSim::new();
        self.accumulator = 0.0;
        self.best_beaten = false;
    }

    fn press(&mut self) {
        self.audio.resume();
        if self.sim.phase == GamePhase::GameOver {
            self.restart();
        } else {
            self.sim.drop_slab();
            self.drain_events();
        }
    }

    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.sim.tick(SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
    }

    fn drain_events(&mut self) {
        let events: Vec<GameEvent> = self.sim.events.drain(..).collect();
        for event in events {
            match event {
                GameEvent::Dropped => self.audio.play(SoundEffect::Drop),
                GameEvent::PerfectDrop => self.audio.play(SoundEffect::PowerUp),
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
        log::info!(
            "Stacker run over (score {}, height {})",
            self.sim.score,
            self.sim.height()
        );
    }

    /// Vertical camera shift keeping the tower top on screen
    fn camera_offset(&self) -> f32 {
        let top_y = ARENA_H - (self.sim.tower.len() + 1) as f32 * SLAB_H;
        (CAMERA_LINE - top_y).max(0.0)
    }

    fn draw(&self) {
        let ctx = &self.ctx;
        let w = ARENA_W as f64;
        let h = ARENA_H as f64;
        let offset = self.camera_offset();

        ctx.set_fill_style_str("#101014");
        ctx.fill_rect(0.0, 0.0, w, h);

        // Tower
        for (i, slab) in self.sim.tower.iter().enumerate() {
            let y = ARENA_H - (i + 1) as f32 * SLAB_H + offset;
            if y > ARENA_H || y + SLAB_H < 0.0 {
                continue;
            }
            ctx.set_fill_style_str(SLAB_COLORS[i % SLAB_COLORS.len()]);
            ctx.fill_rect(slab.x as f64, y as f64, slab.w as f64, (SLAB_H - 2.0) as f64);
        }

        // Sweeping slab one row above the tower top
        if self.sim.phase == GamePhase::Playing {
            let y = ARENA_H - (self.sim.tower.len() + 1) as f32 * SLAB_H + offset;
            ctx.set_fill_style_str(SLAB_COLORS[self.sim.tower.len() % SLAB_COLORS.len()]);
            ctx.fill_rect(
                self.sim.active.x as f64,
                y as f64,
                self.sim.active.w as f64,
                (SLAB_H - 2.0) as f64,
            );
        }

        // HUD
        ctx.set_fill_style_str("#e8e8e8");
        ctx.set_font("16px 'Fira Code', monospace");
        ctx.set_text_align("left");
        ctx.fill_text(&format!("SCORE {}", self.sim.score), 8.0, 22.0).ok();
        ctx.set_text_align("right");
        ctx.fill_text(&format!("BEST {}", self.best), w - 8.0, 22.0).ok();
        ctx.set_text_align("center");
        ctx.set_font("13px 'Fira Code', monospace");
        ctx.fill_text(&format!("HEIGHT {}", self.sim.height()), w / 2.0, 22.0)
            .ok();

        if self.sim.phase == GamePhase::GameOver {
            ctx.set_fill_style_str("rgba(0,0,0,0.6)");
            ctx.fill_rect(0.0, 0.0, w, h);
            ctx.set_fill_style_str("#ffffff");
            ctx.set_font("28px 'Fira Code', monospace");
            let title = if self.best_beaten {
                "NEW BEST!"
            } else {
                "GAME OVER"
            };
            ctx.fill_text(title, w / 2.0, h / 2.0 - 8.0).ok();
            ctx.set_font("15px 'Fira Code', monospace");
            ctx.fill_text("Tap to restart", w / 2.0, h / 2.0 + 24.0).ok();
        }
    }
}

/// Start Stacker on the canvas with the given element id
#[wasm_bindgen]
pub fn start_stacker(canvas_id: &str) -> Result<(), JsValue> {
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

    log::info!("Stacker running");
    Ok(())
}

fn setup_input(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            game.borrow_mut().press();
        });
        canvas.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
            event.prevent_default();
            game.borrow_mut().press();
        });
        canvas.add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            if matches!(event.key().as_str(), " " | "Enter" | "ArrowDown") {
                event.prevent_default();
                game.borrow_mut().press();
            }
        });
        window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
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
