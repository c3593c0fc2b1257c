//! Canvas Arcade - a collection of standalone HTML5 canvas arcade games
//!
//! Every game under `games` is self-contained: it owns its canvas context,
//! input bindings, update/render loop, and best-score persistence. A host page
//! picks one game by calling its exported `start_*` function. There is no
//! shared engine and no cross-game state.
//!
//! Core modules:
//! - `games`: the individual games, each split into a pure `sim` and wasm glue
//! - `platform`: browser LocalStorage plumbing
//! - `audio`: procedurally synthesized sound effects (Web Audio)
//! - `settings`: player preferences, persisted separately from any game

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod games;
pub mod platform;
pub mod settings;

pub use settings::Settings;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// One-time crate initialization: panic hook and console logger.
///
/// Runs at wasm module load, before any `start_*` entry point.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");
    log::info!("Canvas Arcade loaded");
}
