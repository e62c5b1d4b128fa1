//! Contains the building blocks the countdown is assembled from.
//!
//! The watcher decides which notifications a recompute raises, the listener
//! registry delivers them to callbacks, and the ticker drives scheduled
//! recomputes. `Countdown` and `CountdownController` compose these pieces.

pub mod listener;
pub mod ticker;
pub mod watcher;
