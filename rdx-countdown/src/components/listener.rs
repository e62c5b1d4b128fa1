//! Callback registry for countdown notifications.

use crate::common::ListenerId;
use crate::delta::Delta;
use crate::events::{CountdownEvent, NotificationKind};
use slotmap::SlotMap;

/// A callback invoked with the delta carried by a notification.
pub type DeltaCallback = Box<dyn FnMut(&Delta) + Send>;

struct Listener {
    kind: NotificationKind,
    callback: DeltaCallback,
}

/// Holds every registered callback, keyed by a stable `ListenerId`.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: SlotMap<ListenerId, Listener>,
}

impl ListenerRegistry {
    pub(crate) fn insert(&mut self, kind: NotificationKind, callback: DeltaCallback) -> ListenerId {
        self.listeners.insert(Listener { kind, callback })
    }

    /// Returns `true` if the listener was found and removed.
    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id).is_some()
    }

    /// Runs every callback registered for the event's kind.
    /// Returns the number of callbacks executed.
    pub(crate) fn dispatch(&mut self, event: &CountdownEvent) -> usize {
        let kind = event.kind();
        let mut fired = 0;
        for (_id, listener) in self.listeners.iter_mut() {
            if listener.kind == kind {
                (listener.callback)(event.delta());
                fired += 1;
            }
        }
        fired
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}
