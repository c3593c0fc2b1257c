//! Flappy wasm glue
//!
//! One-button input: pointer, touch, or Space/ArrowUp. Owns the
//! `flappy_best` LocalStorage key.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent};

use super::sim::{
    ARENA_H, ARENA_W, BIRD_RADIUS, BIRD_X, FlappySim, GROUND_H, GameEvent, GamePhase,
    MAX_SUBSTEPS, PIPE_GAP, PIPE_W, SIM_DT, TickInput,
};
use crate::audio::{AudioManager, SoundEffect};
use crate::platform::storage;
use crate::settings::Settings;

const BEST_KEY: &str = "flappy_best";

struct Game {
    sim: FlappySim,
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
            sim: FlappySim::new(js_sys::Date::now() as u64),
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
        self.sim = FlappySim::new(js_sys::Date::now() as u64);
        self.input = TickInput::default();
        self.accumulator = 0.0;
        self.best_beaten = false;
    }

    /// A press either flaps or restarts, depending on phase
    fn press(&mut self) {
        self.audio.resume();
        if self.sim.phase == GamePhase::Dead {
            self.restart();
        } else {
            self.input.flap = true;
        }
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

            self.input.flap = false;
        }

        let events: Vec<GameEvent> = self.sim.events.drain(..).collect();
        for event in events {
            match event {
                GameEvent::Flap => self.audio.play(SoundEffect::Blip),
                GameEvent::PipePassed => self.audio.play(SoundEffect::Score),
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
        log::info!("Flappy run over (score {})", self.sim.score);
    }

    fn draw(&self) {
        let ctx = &self.ctx;
        let w = ARENA_W as f64;
        let h = ARENA_H as f64;

        // Sky
        ctx.set_fill_style_str("#1b2838");
        ctx.fill_rect(0.0, 0.0, w, h);

        // Pipes
        ctx.set_fill_style_str("#57d45a");
        for pipe in &self.sim.pipes {
            let half_gap = (PIPE_GAP / 2.0) as f64;
            let gap_y = pipe.gap_y as f64;
            let x = pipe.x as f64;
            ctx.fill_rect(x, 0.0, PIPE_W as f64, gap_y - half_gap);
            ctx.fill_rect(
                x,
                gap_y + half_gap,
                PIPE_W as f64,
                h - GROUND_H as f64 - (gap_y + half_gap),
            );
        }

        // Ground
        ctx.set_fill_style_str("#3a2e1e");
        ctx.fill_rect(0.0, h - GROUND_H as f64, w, GROUND_H as f64);

        // Bird
        ctx.set_fill_style_str("#ffd866");
        ctx.begin_path();
        ctx.arc(
            BIRD_X as f64,
            self.sim.bird_y as f64,
            BIRD_RADIUS as f64,
            0.0,
            std::f64::consts::TAU,
        )
        .ok();
        ctx.fill();
        ctx.set_fill_style_str("#101014");
        ctx.begin_path();
        ctx.arc(
            (BIRD_X + 5.0) as f64,
            (self.sim.bird_y - 4.0) as f64,
            2.5,
            0.0,
            std::f64::consts::TAU,
        )
        .ok();
        ctx.fill();

        // Score
        ctx.set_fill_style_str("#ffffff");
        ctx.set_font("40px 'Fira Code', monospace");
        ctx.set_text_align("center");
        ctx.fill_text(&self.sim.score.to_string(), w / 2.0, 70.0).ok();
        ctx.set_font("13px 'Fira Code', monospace");
        ctx.fill_text(&format!("BEST {}", self.best), w / 2.0, 92.0).ok();

        match self.sim.phase {
            GamePhase::Ready => {
                ctx.set_font("16px 'Fira Code', monospace");
                ctx.fill_text("Tap or press Space to flap", w / 2.0, h / 2.0 + 60.0)
                    .ok();
            }
            GamePhase::Dead => {
                ctx.set_fill_style_str("rgba(0,0,0,0.55)");
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
            GamePhase::Playing => {}
        }
    }
}

/// Start Flappy on the canvas with the given element id
#[wasm_bindgen]
pub fn start_flappy(canvas_id: &str) -> Result<(), JsValue> {
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

    log::info!("Flappy running");
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
            if matches!(event.key().as_str(), " " | "ArrowUp" | "w" | "W") {
                event.prevent_default();
                game.borrow_mut().press();
            }
        });
        window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Mute on blur per settings (no pause here: death is the only stakes)
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
