//! Contains common, primitive types shared across the countdown crate.
//!
//! Time values are carried as signed epoch or duration milliseconds so that an
//! overtime countdown can represent a negative remainder without a separate type.

use slotmap::new_key_type;

/// A signed count of milliseconds, either since the Unix epoch or as a duration.
pub type Millis = i64;

/// Milliseconds in one second.
pub const MILLIS_PER_SECOND: Millis = 1_000;

new_key_type! {
    /// Uniquely and safely identifies a registered notification listener.
    ///
    /// Returned by `on_tick`, `on_complete` and `on_multi_switch`. Keys are never
    /// reused, so a stale id can't remove somebody else's listener.
    pub struct ListenerId;
}
