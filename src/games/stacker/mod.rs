//! Stacker
//!
//! A slab sweeps side to side; drop it on the tower and keep the overlap.
//! Near-perfect drops snap and restore a sliver of width.

pub mod sim;

#[cfg(target_arch = "wasm32")]
mod web;
