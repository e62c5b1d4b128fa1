//! Defines all public event types raised by a countdown.
//!
//! Listeners either register callbacks on the controller or subscribe to these
//! strongly-typed streams.

use crate::common::ListenerId;
use crate::delta::Delta;
use tokio::time::Instant;

/// What caused a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The periodic schedule fired.
    Schedule,
    /// The host changed the target or configuration, or asked for a refresh.
    Reconfigure,
}

/// The notification categories a callback can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Tick,
    Complete,
    MultiSwitch,
}

/// A notification produced by one recompute, carrying the fresh delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// A scheduled recompute found time remaining.
    Tick(Delta),
    /// The remaining time reached zero. Raised once per completion.
    Completed(Delta),
    /// The active target of a multi-date sequence rolled over to a later one.
    MultiSwitch(Delta),
}

impl CountdownEvent {
    pub fn delta(&self) -> &Delta {
        match self {
            CountdownEvent::Tick(delta)
            | CountdownEvent::Completed(delta)
            | CountdownEvent::MultiSwitch(delta) => delta,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            CountdownEvent::Tick(_) => NotificationKind::Tick,
            CountdownEvent::Completed(_) => NotificationKind::Complete,
            CountdownEvent::MultiSwitch(_) => NotificationKind::MultiSwitch,
        }
    }
}

/// Events related to the lifecycle of the controller itself.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// The periodic recompute started (or resumed after a pause).
    Activated { timestamp: Instant },
    Paused,
    /// The periodic recompute was canceled.
    Deactivated,
    /// The controller stopped publishing for good.
    Disposed,
    ListenerAdded { id: ListenerId },
    ListenerRemoved { id: ListenerId },
}
