//! The async controller that drives a [`Countdown`] on the Tokio runtime.

use crate::common::ListenerId;
use crate::components::listener::{DeltaCallback, ListenerRegistry};
use crate::components::ticker::{spawn_ticker, TickerHandle};
use crate::config::CountdownConfig;
use crate::countdown::{Countdown, CountdownStatus, Recompute};
use crate::delta::Delta;
use crate::events::{CountdownEvent, NotificationKind, SystemEvent};
use crate::format::FormattedDelta;
use crate::target::TargetSpec;
use crate::time::{ClockSource, SystemClock};
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, trace};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const SYSTEM_CHANNEL_CAPACITY: usize = 64;

/// The main countdown controller.
///
/// Owns a [`Countdown`], keeps at most one repeating recompute task alive for
/// it, and delivers notifications to registered callbacks and to broadcast
/// subscribers. Cloning yields another handle to the same controller.
///
/// Callbacks run while the controller is locked: they must not call back into
/// the controller. Subscribe to [`CountdownController::subscribe_events`] to
/// react with further controller calls.
#[derive(Clone)]
pub struct CountdownController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    event_sender: broadcast::Sender<CountdownEvent>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    delta_sender: watch::Sender<Delta>,
}

struct State {
    countdown: Countdown,
    listeners: ListenerRegistry,
    ticker: Option<TickerHandle>,
    /// Bumped whenever the ticker is replaced, so a stale tick is ignored.
    generation: u64,
    period: Duration,
}

// Core implementation block for internal logic.
impl CountdownController {
    /// Creates a controller counting against the system clock.
    pub fn new(target: impl Into<TargetSpec>, config: CountdownConfig) -> Self {
        Self::with_clock(target, config, Arc::new(SystemClock))
    }

    /// Creates a controller with a custom clock source.
    pub fn with_clock(
        target: impl Into<TargetSpec>,
        config: CountdownConfig,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let countdown = Countdown::with_clock(target, config, clock);
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (system_event_sender, _) = broadcast::channel(SYSTEM_CHANNEL_CAPACITY);
        let (delta_sender, _) = watch::channel(*countdown.current());
        let period = countdown.config().interval();

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    countdown,
                    listeners: ListenerRegistry::default(),
                    ticker: None,
                    generation: 0,
                    period,
                }),
                event_sender,
                system_event_sender,
                delta_sender,
            }),
        }
    }

    #[doc(hidden)]
    fn start_ticker(inner: &Arc<Inner>, state: &mut State) {
        Self::stop_ticker(state);
        state.period = state.countdown.config().interval();
        let generation = state.generation;
        let weak: Weak<Inner> = Arc::downgrade(inner);
        state.ticker = Some(spawn_ticker(state.period, move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => Self::scheduled_tick(&inner, generation).await,
                    None => ControlFlow::Break(()),
                }
            }
        }));
    }

    #[doc(hidden)]
    fn stop_ticker(state: &mut State) {
        if let Some(ticker) = state.ticker.take() {
            ticker.cancel();
        }
        state.generation += 1;
    }

    /// Arms or cancels the ticker so it matches the countdown's status.
    #[doc(hidden)]
    fn reconcile_ticker(inner: &Arc<Inner>, state: &mut State) {
        let running = state.countdown.status() == CountdownStatus::Running;
        if !running {
            if state.ticker.is_some() {
                Self::stop_ticker(state);
                inner.system_event_sender.send(SystemEvent::Deactivated).ok();
            }
        } else if state.ticker.is_none()
            || state.period != state.countdown.config().interval()
        {
            Self::start_ticker(inner, state);
        }
    }

    #[doc(hidden)]
    async fn scheduled_tick(inner: &Arc<Inner>, generation: u64) -> ControlFlow<()> {
        let mut state = inner.state.lock().await;
        if state.generation != generation {
            trace!("Ignoring tick from a canceled schedule.");
            return ControlFlow::Break(());
        }
        let Some(outcome) = state.countdown.tick() else {
            return ControlFlow::Break(());
        };
        Self::dispatch(inner, &mut state, &outcome);

        if state.countdown.status() == CountdownStatus::Running {
            return ControlFlow::Continue(());
        }
        // Completed inside the ticker task itself: release the handle, don't abort it.
        drop(state.ticker.take());
        state.generation += 1;
        inner.system_event_sender.send(SystemEvent::Deactivated).ok();
        ControlFlow::Break(())
    }

    /// Delivers completion and multi-switch, publishes the delta, then delivers ticks.
    #[doc(hidden)]
    fn dispatch(inner: &Inner, state: &mut State, outcome: &Recompute) {
        let (ticks, transitions): (Vec<_>, Vec<_>) = outcome
            .events
            .iter()
            .partition(|event| matches!(event, CountdownEvent::Tick(_)));

        for event in transitions {
            state.listeners.dispatch(event);
            inner.event_sender.send(*event).ok();
        }
        if outcome.published {
            inner.delta_sender.send_replace(outcome.delta);
        }
        for event in ticks {
            state.listeners.dispatch(event);
            inner.event_sender.send(*event).ok();
        }
    }
}

// Public API implementation block.
impl CountdownController {
    /// Starts the periodic recompute, or resumes it after a pause.
    ///
    /// A no-op in controlled mode, when already running, after completion and
    /// after disposal. Must be called from within a Tokio runtime.
    /// Returns `true` if a schedule was armed.
    pub async fn activate(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        if !state.countdown.activate() {
            return false;
        }
        Self::start_ticker(&self.inner, &mut state);
        info!("Countdown scheduled every {:?}.", state.period);
        self.inner
            .system_event_sender
            .send(SystemEvent::Activated {
                timestamp: tokio::time::Instant::now(),
            })
            .ok();
        true
    }

    /// Suspends the periodic recompute; paused time is not counted.
    pub async fn pause(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        if !state.countdown.pause() {
            return false;
        }
        Self::stop_ticker(&mut state);
        self.inner.system_event_sender.send(SystemEvent::Paused).ok();
        true
    }

    /// Cancels the periodic recompute.
    ///
    /// Idempotent. Once this returns no further scheduled recompute runs.
    /// Returns `true` if a schedule was canceled.
    pub async fn deactivate(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        let was_running = state.countdown.deactivate();
        let had_ticker = state.ticker.is_some();
        Self::stop_ticker(&mut state);
        if was_running || had_ticker {
            self.inner
                .system_event_sender
                .send(SystemEvent::Deactivated)
                .ok();
        }
        was_running || had_ticker
    }

    /// Deactivates and stops publishing deltas. Later calls are no-ops.
    pub async fn dispose(&self) {
        let mut state = self.inner.state.lock().await;
        Self::stop_ticker(&mut state);
        if state.countdown.dispose() {
            debug!("Countdown controller disposed.");
            self.inner.system_event_sender.send(SystemEvent::Disposed).ok();
        }
    }

    /// Replaces the target and configuration and recomputes immediately,
    /// raising completion and multi-switch notifications as a tick would.
    pub async fn update_target(
        &self,
        target: impl Into<TargetSpec>,
        config: CountdownConfig,
    ) -> Delta {
        let mut state = self.inner.state.lock().await;
        let outcome = state.countdown.update_target(target, config);
        Self::dispatch(&self.inner, &mut state, &outcome);
        Self::reconcile_ticker(&self.inner, &mut state);
        outcome.delta
    }

    /// Recomputes immediately with the current target and configuration.
    ///
    /// Hosts driving controlled mode call this on their own schedule.
    pub async fn refresh(&self) -> Delta {
        let mut state = self.inner.state.lock().await;
        let outcome = state.countdown.refresh();
        Self::dispatch(&self.inner, &mut state, &outcome);
        Self::reconcile_ticker(&self.inner, &mut state);
        outcome.delta
    }

    pub async fn current(&self) -> Delta {
        *self.inner.state.lock().await.countdown.current()
    }

    /// The current delta rendered with the configured format options.
    pub async fn formatted(&self) -> FormattedDelta {
        self.inner.state.lock().await.countdown.formatted()
    }

    pub async fn status(&self) -> CountdownStatus {
        self.inner.state.lock().await.countdown.status()
    }

    pub async fn config(&self) -> CountdownConfig {
        self.inner.state.lock().await.countdown.config().clone()
    }

    pub async fn target(&self) -> TargetSpec {
        self.inner.state.lock().await.countdown.target().clone()
    }

    /// Registers a callback for every scheduled recompute with time left.
    pub async fn on_tick(
        &self,
        callback: impl FnMut(&Delta) + Send + 'static,
    ) -> ListenerId {
        self.add_listener(NotificationKind::Tick, Box::new(callback)).await
    }

    /// Registers a callback for completion. It fires once per completion.
    pub async fn on_complete(
        &self,
        callback: impl FnMut(&Delta) + Send + 'static,
    ) -> ListenerId {
        self.add_listener(NotificationKind::Complete, Box::new(callback)).await
    }

    /// Registers a callback for multi-date rollovers.
    pub async fn on_multi_switch(
        &self,
        callback: impl FnMut(&Delta) + Send + 'static,
    ) -> ListenerId {
        self.add_listener(NotificationKind::MultiSwitch, Box::new(callback))
            .await
    }

    /// Removes a callback. Returns `true` if it was registered.
    pub async fn remove_listener(&self, id: ListenerId) -> bool {
        let was_removed = self.inner.state.lock().await.listeners.remove(id);
        if was_removed {
            self.inner
                .system_event_sender
                .send(SystemEvent::ListenerRemoved { id })
                .ok();
        }
        was_removed
    }

    /// Subscribes to the `CountdownEvent` stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<CountdownEvent> {
        self.inner.event_sender.subscribe()
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.inner.system_event_sender.subscribe()
    }

    /// Watches the published delta. Stops changing once the controller is disposed.
    pub fn subscribe_delta(&self) -> watch::Receiver<Delta> {
        self.inner.delta_sender.subscribe()
    }

    #[doc(hidden)]
    async fn add_listener(
        &self,
        kind: NotificationKind,
        callback: DeltaCallback,
    ) -> ListenerId {
        let id = self.inner.state.lock().await.listeners.insert(kind, callback);
        self.inner
            .system_event_sender
            .send(SystemEvent::ListenerAdded { id })
            .ok();
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Millis;
    use crate::time::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOW: Millis = 1_700_000_000_000;

    fn controller(target: impl Into<TargetSpec>) -> (CountdownController, ManualClock) {
        let clock = ManualClock::new(NOW);
        let controller = CountdownController::with_clock(
            target,
            CountdownConfig::default(),
            Arc::new(clock.clone()),
        );
        (controller, clock)
    }

    /// Advances the manual clock by one interval between scheduled ticks.
    /// Ticks land on whole seconds; this wakes up half a second off them.
    async fn run_intervals(clock: &ManualClock, intervals: usize) {
        tokio::time::sleep(Duration::from_millis(500)).await;
        for _ in 0..intervals {
            clock.advance(1_000);
            tokio::time::sleep(Duration::from_millis(1_000)).await;
        }
    }

    fn drain(rx: &mut broadcast::Receiver<CountdownEvent>) -> Vec<CountdownEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_then_completes_once() {
        let (controller, clock) = controller(NOW + 2_000);
        let completions = Arc::new(AtomicUsize::new(0));
        let counter = completions.clone();
        controller
            .on_complete(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let mut events = controller.subscribe_events();

        assert!(controller.activate().await);
        run_intervals(&clock, 5).await;

        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(controller.status().await, CountdownStatus::Completed);
        assert_eq!(
            drain(&mut events),
            vec![
                CountdownEvent::Tick(Delta::from_total(1_000, false)),
                CountdownEvent::Completed(Delta::from_total(0, false)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn activate_twice_keeps_one_schedule() {
        let (controller, clock) = controller(NOW + 60_000);
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        controller
            .on_tick(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(controller.activate().await);
        assert!(!controller.activate().await);
        run_intervals(&clock, 3).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivate_stops_recomputes() {
        let (controller, clock) = controller(NOW + 60_000);
        let mut events = controller.subscribe_events();
        controller.activate().await;
        run_intervals(&clock, 2).await;
        assert!(controller.deactivate().await);
        assert!(!controller.deactivate().await);
        assert_eq!(drain(&mut events).len(), 2);

        run_intervals(&clock, 3).await;
        assert!(drain(&mut events).is_empty());
        assert_eq!(controller.current().await.total, 58_000);
    }

    #[tokio::test(start_paused = true)]
    async fn multi_switch_is_reported() {
        let (controller, clock) = controller(TargetSpec::multi([NOW + 1_000, NOW + 4_000]));
        let mut events = controller.subscribe_events();
        controller.activate().await;
        run_intervals(&clock, 1).await;

        let delta = Delta::from_total(3_000, true);
        assert_eq!(
            drain(&mut events),
            vec![CountdownEvent::MultiSwitch(delta), CountdownEvent::Tick(delta)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn update_target_recomputes_without_tick() {
        let (controller, _clock) = controller(NOW + 60_000);
        let mut events = controller.subscribe_events();
        let mut deltas = controller.subscribe_delta();

        let delta = controller
            .update_target(NOW + 3_723_000, CountdownConfig::default())
            .await;
        assert_eq!((delta.hours, delta.minutes, delta.seconds), (1, 2, 3));
        assert!(drain(&mut events).is_empty());
        assert!(deltas.has_changed().unwrap());
        assert_eq!(deltas.borrow_and_update().total, 3_723_000);

        let formatted = controller.formatted().await;
        assert_eq!(
            (
                formatted.hours.as_str(),
                formatted.minutes.as_str(),
                formatted.seconds.as_str()
            ),
            ("01", "02", "03")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn completing_through_update_cancels_the_schedule() {
        let (controller, clock) = controller(NOW + 60_000);
        let mut system = controller.subscribe_system_events();
        controller.activate().await;
        controller.update_target(NOW, CountdownConfig::default()).await;
        assert_eq!(controller.status().await, CountdownStatus::Completed);

        let mut deactivated = false;
        while let Ok(event) = system.try_recv() {
            deactivated |= matches!(event, SystemEvent::Deactivated);
        }
        assert!(deactivated);

        let mut events = controller.subscribe_events();
        run_intervals(&clock, 2).await;
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume() {
        let (controller, clock) = controller(NOW + 10_000);
        controller.activate().await;
        run_intervals(&clock, 2).await;
        assert!(controller.pause().await);
        assert_eq!(controller.status().await, CountdownStatus::Paused);

        run_intervals(&clock, 3).await;
        assert_eq!(controller.current().await.total, 8_000);

        assert!(controller.activate().await);
        run_intervals(&clock, 1).await;
        assert_eq!(controller.current().await.total, 7_000);
    }

    #[tokio::test(start_paused = true)]
    async fn disposed_controller_stops_publishing() {
        let (controller, clock) = controller(NOW + 10_000);
        let deltas = controller.subscribe_delta();
        controller.activate().await;
        controller.dispose().await;
        assert_eq!(controller.status().await, CountdownStatus::Stopped);
        assert!(!controller.activate().await);

        clock.advance(5_000);
        let fresh = controller.refresh().await;
        assert_eq!(fresh.total, 5_000);
        assert_eq!(deltas.borrow().total, 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn disposed_controller_never_notifies() {
        let (controller, clock) = controller(NOW + 10_000);
        let completions = Arc::new(AtomicUsize::new(0));
        let counter = completions.clone();
        controller
            .on_complete(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let mut events = controller.subscribe_events();
        controller.dispose().await;

        clock.advance(20_000);
        for _ in 0..3 {
            controller.refresh().await;
        }
        controller.update_target(NOW, CountdownConfig::default()).await;
        assert_eq!(completions.load(Ordering::SeqCst), 0);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn past_target_arms_no_ticker() {
        let (controller, clock) = controller(NOW - 5_000);
        let mut system = controller.subscribe_system_events();
        assert!(!controller.activate().await);
        assert_eq!(controller.status().await, CountdownStatus::Completed);
        run_intervals(&clock, 10).await;
        assert!(system.try_recv().is_err());
        assert!(controller.inner.state.lock().await.ticker.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_restarts_the_ticker() {
        let (controller, clock) = controller(NOW + 60_000);
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        controller
            .on_tick(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        controller.activate().await;

        let config = CountdownConfig {
            interval_ms: 250,
            ..CountdownConfig::default()
        };
        controller.update_target(NOW + 60_000, config).await;
        assert_eq!(
            controller.inner.state.lock().await.period,
            Duration::from_millis(250)
        );

        // Ticks now land every 250ms; wake up between them.
        tokio::time::sleep(Duration::from_millis(125)).await;
        for _ in 0..4 {
            clock.advance(250);
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
        assert_eq!(controller.current().await.total, 59_000);
    }

    #[tokio::test(start_paused = true)]
    async fn callbacks_may_capture_non_sync_state() {
        let (controller, clock) = controller(NOW + 60_000);
        let seen = std::cell::Cell::new(0_i64);
        let (tx, rx) = std::sync::mpsc::channel();
        controller
            .on_tick(move |delta| {
                seen.set(delta.total);
                tx.send(seen.get()).ok();
            })
            .await;
        controller.activate().await;
        run_intervals(&clock, 1).await;
        assert_eq!(rx.try_recv(), Ok(59_000));
    }

    #[tokio::test(start_paused = true)]
    async fn removed_listener_is_not_called() {
        let (controller, clock) = controller(NOW + 60_000);
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let id = controller
            .on_tick(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        controller.activate().await;
        run_intervals(&clock, 1).await;
        assert!(controller.remove_listener(id).await);
        assert!(!controller.remove_listener(id).await);
        run_intervals(&clock, 2).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_ends_the_ticker() {
        let (controller, clock) = controller(NOW + 60_000);
        let mut events = controller.subscribe_events();
        controller.activate().await;
        drop(controller);
        run_intervals(&clock, 2).await;
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Closed)
        ));
    }
}
