//! Tetris
//!
//! Falling tetrominoes on a 10x20 well with SRS-style wall kicks, 7-bag
//! dealing, and classic line-clear scoring.

pub mod sim;

#[cfg(target_arch = "wasm32")]
mod web;
