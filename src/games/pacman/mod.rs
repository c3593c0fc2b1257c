//! Pac-Man
//!
//! Maze-graph chase: tile-quantized movement, scatter/chase scheduling,
//! frightened windows, and a wrapping side tunnel.

pub mod maze;
pub mod sim;

#[cfg(target_arch = "wasm32")]
mod web;
