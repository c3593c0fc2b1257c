//! Snake
//!
//! Grid-based snake on a walled board. One food cell at a time; eating grows
//! the body and speeds the step clock.

pub mod sim;

#[cfg(target_arch = "wasm32")]
mod web;
