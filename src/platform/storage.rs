//! LocalStorage access for per-game best-score scalars.
//!
//! Each game persists exactly one value under its own key. Absent or
//! unparseable entries read as zero; storage failures are silent.

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()
}

/// Load a best score from LocalStorage (WASM only).
#[cfg(target_arch = "wasm32")]
pub fn load_best(key: &str) -> u64 {
    local_storage()
        .and_then(|s| s.get_item(key).ok().flatten())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Save a best score to LocalStorage (WASM only).
#[cfg(target_arch = "wasm32")]
pub fn save_best(key: &str, score: u64) {
    if let Some(storage) = local_storage() {
        let _ = storage.set_item(key, &score.to_string());
        log::info!("Best score saved ({}: {})", key, score);
    }
}

/// Native stubs
#[cfg(not(target_arch = "wasm32"))]
pub fn load_best(_key: &str) -> u64 {
    0
}

#[cfg(not(target_arch = "wasm32"))]
pub fn save_best(_key: &str, _score: u64) {
    // No-op for native
}
