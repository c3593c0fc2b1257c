//! The games.
//!
//! Each submodule is a complete, standalone game: a pure deterministic `sim`
//! plus wasm glue that owns the canvas, the input bindings, the
//! `requestAnimationFrame` loop, and the game's best-score key. Games never
//! call into each other.

pub mod breakout;
pub mod dodge;
pub mod flappy;
pub mod pacman;
pub mod pong;
pub mod shooter;
pub mod snake;
pub mod stacker;
pub mod tetris;
