//! # Countdown
//!
//! A live countdown engine for Rust.
//!
//! Countdown computes the time remaining until a target date, decomposes it into
//! days, hours, minutes and seconds for display, and keeps it fresh on a timer,
//! raising notifications when the countdown ticks, completes, or rolls over to
//! the next date of a multi-date target.
//!
//! ## Core Concepts
//!
//! - **Delta**: An immutable snapshot of the remaining time, produced by the pure
//!   [`compute_delta`](delta::compute_delta) calculator.
//! - **ClockSource**: Every computation reads "now" from a substitutable clock,
//!   so tests can freeze and step time.
//! - **Countdown**: A synchronous state machine that owns the current delta and
//!   decides which notifications each recompute raises.
//! - **CountdownController**: Drives a `Countdown` on the Tokio runtime with a
//!   single repeating task, callbacks and broadcast event streams.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use countdown::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Count down to a fixed date with the default configuration.
//!     let controller = CountdownController::new("2030-01-01T00:00:00Z", CountdownConfig::default());
//!
//!     // 2. React to notifications.
//!     controller.on_tick(|delta| println!("{}s left", delta.total / 1000)).await;
//!     controller.on_complete(|_| println!("Happy new year!")).await;
//!
//!     // 3. Start the periodic recompute, and stop it before discarding.
//!     controller.activate().await;
//!     tokio::signal::ctrl_c().await?;
//!     controller.deactivate().await;
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Countdown Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod countdown;
pub mod delta;
pub mod engine;
pub mod events;
pub mod format;
pub mod target;
pub mod time;

/// A prelude module for easy importing of the most common countdown types.
pub mod prelude {
    pub use crate::common::{ListenerId, Millis};
    pub use crate::config::CountdownConfig;
    pub use crate::countdown::{Countdown, CountdownStatus};
    pub use crate::delta::{compute_delta, Delta, DeltaOptions};
    pub use crate::engine::CountdownController;
    pub use crate::events::{CountdownEvent, SystemEvent};
    pub use crate::format::{format_delta, zero_pad, FormatOptions, FormattedDelta};
    pub use crate::target::{TargetPoint, TargetSpec};
    pub use crate::time::{ClockSource, ManualClock, SystemClock};
}
