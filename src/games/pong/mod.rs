//! Pong
//!
//! One player against a tracking AI paddle, first to 11.

pub mod sim;

#[cfg(target_arch = "wasm32")]
mod web;
