//! Breakout
//!
//! Paddle, ball, and brick rows. Multi-hit bricks, paddle english, and a ball
//! that speeds up as the wave thins out.

pub mod sim;

#[cfg(target_arch = "wasm32")]
mod web;
