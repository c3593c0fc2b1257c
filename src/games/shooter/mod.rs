//! Shooter
//!
//! Fixed gunner against a marching invader grid. Shots up, bombs down,
//! waves speed up as they thin out.

pub mod sim;

#[cfg(target_arch = "wasm32")]
mod web;
