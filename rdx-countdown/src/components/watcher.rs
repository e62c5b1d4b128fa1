//! Transition detection between two consecutive deltas.

use crate::delta::Delta;
use crate::events::{CountdownEvent, Trigger};

/// Diffs the previously held delta against a fresh one and returns the
/// notifications to raise, in delivery order.
///
/// - `Completed` when `prev` was not completed and `next` is.
/// - `MultiSwitch` when a multi-date target's remaining time grew, meaning
///   the active point rolled over to a later one.
/// - `Tick` when the schedule drove the recompute and time is left.
///
/// Invalid deltas compare like NaN: they never complete, switch or tick.
pub(crate) fn detect_transitions(
    prev: &Delta,
    next: &Delta,
    trigger: Trigger,
) -> Vec<CountdownEvent> {
    let mut events = Vec::new();

    if !prev.completed && next.completed {
        events.push(CountdownEvent::Completed(*next));
    }

    if next.multi_dates && prev.valid && next.valid && next.total > prev.total {
        events.push(CountdownEvent::MultiSwitch(*next));
    }

    if trigger == Trigger::Schedule && next.has_time_left() {
        events.push(CountdownEvent::Tick(*next));
    }

    events
}
