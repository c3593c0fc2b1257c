//! Platform plumbing shared by the games.
//!
//! Only thin browser access lives here. Game loops, input bindings, and
//! rendering stay inside each game - there is no engine layer.

pub mod storage;
