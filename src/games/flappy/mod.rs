//! Flappy
//!
//! One-button flapping through scrolling pipe gaps.

pub mod sim;

#[cfg(target_arch = "wasm32")]
mod web;
