//! The synchronous countdown state machine.
//!
//! `Countdown` owns the current [`Delta`] and decides, on every recompute,
//! which notifications fire. It never spawns anything: a host that keeps its own
//! timing can call [`Countdown::tick`] directly, while [`CountdownController`]
//! wraps it with a Tokio timer and event channels.
//!
//! [`CountdownController`]: crate::engine::CountdownController

use crate::common::Millis;
use crate::components::watcher::detect_transitions;
use crate::config::CountdownConfig;
use crate::delta::{compute_delta, Delta, DeltaOptions};
use crate::events::{CountdownEvent, Trigger};
use crate::format::{format_delta, FormattedDelta};
use crate::target::TargetSpec;
use crate::time::{ClockSource, SystemClock};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Lifecycle of the periodic recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStatus {
    /// Not scheduling. Initial state, and the only state in controlled mode.
    Stopped,
    Running,
    /// Scheduling suspended; paused time is excluded from the countdown.
    Paused,
    /// The completion notification fired and scheduling was canceled.
    Completed,
}

/// The result of one recompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recompute {
    pub delta: Delta,
    /// Notifications in delivery order.
    pub events: Vec<CountdownEvent>,
    /// Whether `delta` replaced the current delta.
    pub published: bool,
}

/// Holds the active target, its configuration and the current delta.
pub struct Countdown {
    target: TargetSpec,
    config: CountdownConfig,
    clock: Arc<dyn ClockSource>,
    current: Delta,
    status: CountdownStatus,
    offset_ms: Millis,
    paused_at: Option<Millis>,
    disposed: bool,
}

impl Countdown {
    /// Creates a countdown against the system clock.
    pub fn new(target: impl Into<TargetSpec>, config: CountdownConfig) -> Self {
        Self::with_clock(target, config, Arc::new(SystemClock))
    }

    /// Creates a countdown and computes its initial delta.
    pub fn with_clock(
        target: impl Into<TargetSpec>,
        config: CountdownConfig,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let mut countdown = Self {
            target: target.into(),
            config,
            clock,
            current: Delta::invalid(false),
            status: CountdownStatus::Stopped,
            offset_ms: 0,
            paused_at: None,
            disposed: false,
        };
        countdown.current = countdown.compute();
        if !countdown.current.valid {
            warn!("Countdown target {:?} could not be resolved.", countdown.target);
        }
        countdown
    }

    pub fn current(&self) -> &Delta {
        &self.current
    }

    /// The current delta rendered with the configured format options.
    pub fn formatted(&self) -> FormattedDelta {
        format_delta(&self.current, &self.config.format_options())
    }

    pub fn status(&self) -> CountdownStatus {
        self.status
    }

    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    pub fn config(&self) -> &CountdownConfig {
        &self.config
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Computes a fresh delta from the current inputs without applying it.
    pub fn compute(&self) -> Delta {
        let now = self.clock.now_millis();
        let paused_for = self.paused_at.map_or(0, |at| now.saturating_sub(at));
        let options = DeltaOptions {
            clock: self.clock.as_ref(),
            precision: self.config.precision,
            controlled: self.config.controlled,
            offset_ms: self.offset_ms.saturating_add(paused_for),
            overtime: self.config.overtime,
            timezone: self.config.timezone,
        };
        compute_delta(&self.target, &options)
    }

    /// Starts (or resumes) the periodic recompute.
    ///
    /// Returns `true` if the countdown entered `Running` and a schedule must be
    /// armed. Already running, completed, disposed and controlled countdowns
    /// are left as they are.
    pub fn activate(&mut self) -> bool {
        if self.disposed || self.config.controlled {
            return false;
        }
        match self.status {
            CountdownStatus::Running | CountdownStatus::Completed => false,
            CountdownStatus::Paused => {
                let now = self.clock.now_millis();
                if let Some(paused_at) = self.paused_at.take() {
                    self.offset_ms = self
                        .offset_ms
                        .saturating_add(now.saturating_sub(paused_at));
                }
                self.status = CountdownStatus::Running;
                info!("Countdown resumed (offset {} ms).", self.offset_ms);
                true
            }
            CountdownStatus::Stopped if self.current.completed && !self.config.overtime => {
                self.status = CountdownStatus::Completed;
                debug!("Countdown already completed; nothing to schedule.");
                false
            }
            CountdownStatus::Stopped => {
                self.status = CountdownStatus::Running;
                info!("Countdown started.");
                true
            }
        }
    }

    /// Suspends a running countdown. Returns `true` if it was running.
    pub fn pause(&mut self) -> bool {
        if self.status != CountdownStatus::Running {
            return false;
        }
        self.paused_at = Some(self.clock.now_millis());
        self.status = CountdownStatus::Paused;
        info!("Countdown paused.");
        true
    }

    /// Stops the periodic recompute and forgets any paused time.
    ///
    /// Safe to call any number of times. Returns `true` if a schedule was
    /// running and must be canceled.
    pub fn deactivate(&mut self) -> bool {
        let was_running = self.status == CountdownStatus::Running;
        if matches!(
            self.status,
            CountdownStatus::Running | CountdownStatus::Paused
        ) {
            self.status = CountdownStatus::Stopped;
            info!("Countdown stopped.");
        }
        self.offset_ms = 0;
        self.paused_at = None;
        was_running
    }

    /// Deactivates and stops publishing new deltas for good.
    ///
    /// Returns `true` the first time only.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.deactivate();
        self.disposed = true;
        debug!("Countdown disposed.");
        true
    }

    /// Runs a scheduled recompute. Returns `None` unless the countdown is running.
    pub fn tick(&mut self) -> Option<Recompute> {
        if self.disposed || self.status != CountdownStatus::Running {
            return None;
        }
        Some(self.recompute(Trigger::Schedule))
    }

    /// Recomputes immediately from the current inputs, as a reconfiguration.
    ///
    /// This is how a host driving controlled mode refreshes the countdown.
    pub fn refresh(&mut self) -> Recompute {
        self.recompute(Trigger::Reconfigure)
    }

    /// Replaces the target and configuration, then recomputes immediately.
    pub fn update_target(
        &mut self,
        target: impl Into<TargetSpec>,
        config: CountdownConfig,
    ) -> Recompute {
        self.target = target.into();
        self.config = config;
        if self.config.controlled
            && matches!(
                self.status,
                CountdownStatus::Running | CountdownStatus::Paused
            )
        {
            debug!("Controlled mode enabled; dropping the schedule.");
            self.deactivate();
        }

        let outcome = self.recompute(Trigger::Reconfigure);
        if !outcome.delta.valid {
            warn!("Countdown target {:?} could not be resolved.", self.target);
        }
        if self.status == CountdownStatus::Completed && !outcome.delta.completed {
            self.status = CountdownStatus::Stopped;
        }
        outcome
    }

    fn recompute(&mut self, trigger: Trigger) -> Recompute {
        let next = self.compute();
        if self.disposed {
            return Recompute {
                delta: next,
                events: Vec::new(),
                published: false,
            };
        }
        let events = detect_transitions(&self.current, &next, trigger);
        trace!(
            "Recompute ({:?}): total={} completed={}",
            trigger,
            next.total,
            next.completed
        );

        let completed = events
            .iter()
            .any(|event| matches!(event, CountdownEvent::Completed(_)));
        if completed {
            info!("Countdown completed.");
            if !self.config.overtime && self.status != CountdownStatus::Completed {
                self.status = CountdownStatus::Completed;
                self.paused_at = None;
            }
        }

        self.current = next;
        Recompute {
            delta: next,
            events,
            published: true,
        }
    }
}
