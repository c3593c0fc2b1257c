//! Dodge
//!
//! Lane hazards telegraph before they strike; keep moving to the safe lane.
//! Spawn rate and telegraph windows tighten as a run goes on.

pub mod sim;

#[cfg(target_arch = "wasm32")]
mod web;
