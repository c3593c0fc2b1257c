//! Shooter wasm glue
//!
//! Owns the canvas, move/fire bindings, the fixed-timestep loop, and the
//! `shooter_best` LocalStorage key.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, TouchEvent};

use super::sim::{
    ARENA_H, ARENA_W, GUN_H, GUN_W, GUN_Y, GameEvent, GamePhase, INVADER_COLS, INVADER_H,
    INVADER_ROWS, INVADER_W, MAX_SUBSTEPS, SIM_DT, ShooterSim, TickInput,
};
use crate::audio::{AudioManager, SoundEffect};
use crate::platform::storage;
use crate::settings::Settings;

const BEST_KEY: &str = "shooter_best";

const ROW_COLORS: [&str; 5] = ["#e05a5a", "#e0984a", "#f2d24b", "#57d45a", "#3cd6e8"];

struct Game {
    sim: ShooterSim,
    input: TickInput,
    left_held: bool,
    right_held: bool,
    fire_held: bool,
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
            sim: ShooterSim::new(js_sys::Date::now() as u64),
            input: TickInput::default(),
            left_held: false,
            right_held: false,
            fire_held: false,
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
        self.sim = ShooterSim::new(js_sys::Date::now() as u64);
        self.input = TickInput::default();
        self.accumulator = 0.0;
        self.best_beaten = false;
    }

    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        self.input.move_dir = (self.right_held as i8 as f32) - (self.left_held as i8 as f32);
        self.input.fire = self.fire_held;

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
                GameEvent::Shot => self.audio.play(SoundEffect::Shoot),
                GameEvent::InvaderDestroyed => self.audio.play(SoundEffect::Explosion),
                GameEvent::GunHit => self.audio.play(SoundEffect::Crash),
                GameEvent::WaveCleared => self.audio.play(SoundEffect::LineClear),
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
            "Shooter run over (score {}, wave {})",
            self.sim.score,
            self.sim.wave
        );
    }

    fn draw(&self) {
        let ctx = &self.ctx;
        let w = ARENA_W as f64;
        let h = ARENA_H as f64;

        ctx.set_fill_style_str("#101014");
        ctx.fill_rect(0.0, 0.0, w, h);

        // Invaders
        for row in 0..INVADER_ROWS {
            for col in 0..INVADER_COLS {
                if !self.sim.alive[row][col] {
                    continue;
                }
                let pos = self.sim.invader_pos(row, col);
                ctx.set_fill_style_str(ROW_COLORS[row % ROW_COLORS.len()]);
                ctx.fill_rect(
                    (pos.x - INVADER_W / 2.0) as f64,
                    (pos.y - INVADER_H / 2.0) as f64,
                    INVADER_W as f64,
                    INVADER_H as f64,
                );
            }
        }

        // Shots and bombs
        ctx.set_fill_style_str("#ffffff");
        for shot in &self.sim.shots {
            ctx.fill_rect((shot.x - 2.0) as f64, (shot.y - 7.0) as f64, 4.0, 14.0);
        }
        ctx.set_fill_style_str("#ff7a7a");
        for bomb in &self.sim.bombs {
            ctx.fill_rect((bomb.x - 3.0) as f64, (bomb.y - 5.0) as f64, 6.0, 10.0);
        }

        // Gun
        ctx.set_fill_style_str("#7dff6e");
        ctx.fill_rect(
            (self.sim.gun_x - GUN_W / 2.0) as f64,
            (GUN_Y - GUN_H / 2.0) as f64,
            GUN_W as f64,
            GUN_H as f64,
        );
        ctx.fill_rect(
            (self.sim.gun_x - 3.0) as f64,
            (GUN_Y - GUN_H / 2.0 - 8.0) as f64,
            6.0,
            8.0,
        );

        // HUD
        ctx.set_fill_style_str("#e8e8e8");
        ctx.set_font("16px 'Fira Code', monospace");
        ctx.set_text_align("left");
        ctx.fill_text(&format!("SCORE {}", self.sim.score), 8.0, 22.0).ok();
        ctx.set_text_align("center");
        ctx.fill_text(
            &format!("LIVES {}  WAVE {}", self.sim.lives, self.sim.wave + 1),
            w / 2.0,
            22.0,
        )
        .ok();
        ctx.set_text_align("right");
        ctx.fill_text(&format!("BEST {}", self.best), w - 8.0, 22.0).ok();

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

    fn client_to_arena_x(&self, client_x: f32) -> f32 {
        let rect = self.canvas.get_bounding_client_rect();
        let scale = ARENA_W / rect.width().max(1.0) as f32;
        (client_x - rect.left() as f32) * scale
    }
}

/// Start Shooter on the canvas with the given element id
#[wasm_bindgen]
pub fn start_shooter(canvas_id: &str) -> Result<(), JsValue> {
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

    log::info!("Shooter running");
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
                "ArrowLeft" | "a" | "A" => {
                    g.left_held = true;
                    g.input.target_x = None;
                }
                "ArrowRight" | "d" | "D" => {
                    g.right_held = true;
                    g.input.target_x = None;
                }
                " " => {
                    event.prevent_default();
                    if g.sim.phase == GamePhase::GameOver {
                        g.restart();
                    } else {
                        g.fire_held = true;
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
                " " => g.fire_held = false,
                _ => {}
            }
        });
        window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Touch: drag steers, holding a finger down keeps firing
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
            g.fire_held = true;
            if let Some(touch) = event.touches().get(0) {
                let x = g.client_to_arena_x(touch.client_x() as f32);
                g.input.target_x = Some(x);
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
            game.borrow_mut().fire_held = false;
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
