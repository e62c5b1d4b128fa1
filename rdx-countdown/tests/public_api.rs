//! End-to-end checks of the public countdown API.

use countdown::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const NOW: Millis = 1_767_225_600_000; // 2026-01-01T00:00:00Z

#[test]
fn one_hour_two_minutes_three_seconds() {
    let clock = ManualClock::new(NOW);
    let delta = compute_delta(&TargetSpec::from(NOW + 3_723_000), &DeltaOptions::new(&clock));
    assert_eq!(
        (delta.days, delta.hours, delta.minutes, delta.seconds, delta.completed),
        (0, 1, 2, 3, false)
    );

    let formatted = format_delta(&delta, &FormatOptions::default());
    assert_eq!(formatted.hours, "01");
    assert_eq!(formatted.minutes, "02");
    assert_eq!(formatted.seconds, "03");
}

#[test]
fn text_targets_are_resolved() {
    let clock = ManualClock::new(NOW);
    let delta = compute_delta(
        &TargetSpec::from("2026-01-02T00:00:00Z"),
        &DeltaOptions::new(&clock),
    );
    assert_eq!(delta.days, 1);
    assert_eq!(delta.total, 86_400_000);
}

#[test]
fn zero_pad_helper() {
    assert_eq!(zero_pad(5, 2), "05");
    assert_eq!(zero_pad(5, 0), "5");
    assert_eq!(zero_pad(123, 2), "123");
}

#[test]
fn synchronous_countdown_can_be_driven_by_hand() {
    let clock = ManualClock::new(NOW);
    let target = TargetSpec::multi(["2025-12-31T00:00:00Z", "2026-01-01T00:00:02Z"]);
    let mut countdown =
        Countdown::with_clock(target, CountdownConfig::default(), Arc::new(clock.clone()));
    assert!(countdown.activate());

    let mut kinds = Vec::new();
    for _ in 0..3 {
        clock.advance(1_000);
        if let Some(outcome) = countdown.tick() {
            kinds.extend(outcome.events);
        }
    }
    assert_eq!(
        kinds,
        vec![
            CountdownEvent::Tick(Delta::from_total(1_000, true)),
            CountdownEvent::Completed(Delta::from_total(0, true)),
        ]
    );
    assert_eq!(countdown.status(), CountdownStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn controller_runs_to_completion() {
    let clock = ManualClock::new(NOW);
    let config = CountdownConfig {
        interval_ms: 250,
        ..CountdownConfig::default()
    };
    let controller = CountdownController::with_clock(NOW + 1_000, config, Arc::new(clock.clone()));

    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    controller
        .on_tick(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;
    let mut events = controller.subscribe_events();
    controller.activate().await;

    // Step the clock between ticks, which land every 250ms.
    tokio::time::sleep(Duration::from_millis(125)).await;
    for _ in 0..8 {
        clock.advance(250);
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    // Zero precision rounds 750ms and 500ms up to a second, then 250ms down to zero.
    assert_eq!(ticks.load(Ordering::SeqCst), 2);
    let mut completed = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, CountdownEvent::Completed(_)) {
            completed += 1;
        }
    }
    assert_eq!(completed, 1);
    assert_eq!(controller.status().await, CountdownStatus::Completed);
    controller.dispose().await;
}

#[tokio::test]
async fn controlled_mode_is_driven_by_the_host() {
    let config = CountdownConfig {
        controlled: true,
        ..CountdownConfig::default()
    };
    let controller = CountdownController::new(90_000_i64, config.clone());
    assert!(!controller.activate().await);
    assert_eq!(controller.status().await, CountdownStatus::Stopped);
    assert_eq!(controller.current().await.minutes, 1);

    let completions = Arc::new(AtomicUsize::new(0));
    let counter = completions.clone();
    controller
        .on_complete(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;
    controller.update_target(0_i64, config).await;
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}
