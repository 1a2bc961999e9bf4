//! Lifecycle scenarios — start, drain modes and stop deadlines.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use relay_rust::{Bus, DrainMode, GroupConfig, PublishError};

// ============================================================================
// Test 1: Graceful drain finishes every fetched item
// ============================================================================

#[test]
fn graceful_stop_finishes_fetched_items() {
    support::init_tracing();
    let bus = Bus::new();

    let group = bus
        .bind_consumer_group(
            "work",
            "careful",
            GroupConfig::new()
                .workers(1)
                .prefetch(3)
                .drain(DrainMode::Graceful),
            |_| {
                thread::sleep(Duration::from_millis(50));
                Ok(())
            },
        )
        .unwrap();

    for _ in 0..3 {
        bus.publish("work", b"{}".to_vec()).unwrap();
    }
    bus.start();

    // Wait for the worker to have all three items in hand.
    assert!(support::wait_until(Duration::from_secs(1), || {
        group.in_flight().iter().sum::<usize>() == 3
    }));

    let report = bus.stop(Duration::from_secs(2));
    assert!(report.fully_drained);

    let (_, stats) = &report.groups[0];
    assert_eq!(stats.items_completed, 3);
    assert_eq!(stats.items_abandoned, 0);
}

// ============================================================================
// Test 2: Forced drain abandons fetched items after the current one
// ============================================================================

#[test]
fn forced_stop_abandons_fetched_items() {
    support::init_tracing();
    let bus = Bus::new();

    let group = bus
        .bind_consumer_group(
            "work",
            "hasty",
            GroupConfig::new()
                .workers(1)
                .prefetch(3)
                .drain(DrainMode::Forced),
            |_| {
                thread::sleep(Duration::from_millis(100));
                Ok(())
            },
        )
        .unwrap();

    for _ in 0..3 {
        bus.publish("work", b"{}".to_vec()).unwrap();
    }
    bus.start();

    assert!(support::wait_until(Duration::from_secs(1), || {
        group.in_flight().iter().sum::<usize>() == 3
    }));

    let report = bus.stop(Duration::from_secs(2));
    assert!(report.fully_drained);

    let (_, stats) = &report.groups[0];
    assert!(stats.items_abandoned >= 1);
    assert_eq!(stats.items_completed + stats.items_abandoned, 3);
    assert_eq!(group.in_flight().iter().sum::<usize>(), 0);
}

// ============================================================================
// Test 3: A worker that cannot finish in time is reported, not killed
// ============================================================================

#[test]
fn stop_deadline_is_reported() {
    support::init_tracing();
    let bus = Bus::new();
    let started_processing = Arc::new(AtomicUsize::new(0));

    {
        let started_processing = Arc::clone(&started_processing);
        bus.bind_consumer_group(
            "work",
            "glacial",
            GroupConfig::new().workers(1),
            move |_| {
                started_processing.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(500));
                Ok(())
            },
        )
        .unwrap();
    }
    bus.start();
    bus.publish("work", b"{}".to_vec()).unwrap();

    assert!(support::wait_until(Duration::from_secs(1), || {
        started_processing.load(Ordering::SeqCst) == 1
    }));

    let report = bus.stop(Duration::from_millis(50));
    assert!(!report.fully_drained);

    let (_, stats) = &report.groups[0];
    assert_eq!(stats.workers_stopped, 0);
}

// ============================================================================
// Test 4: Full composition — handlers and two groups under one stop
// ============================================================================

#[test]
fn stop_reports_every_group_and_handler() {
    support::init_tracing();
    let bus = Bus::new();
    let handled = Arc::new(AtomicUsize::new(0));
    let billed = Arc::new(AtomicUsize::new(0));
    let shipped = Arc::new(AtomicUsize::new(0));

    {
        let handled = Arc::clone(&handled);
        bus.subscribe("order.created", move |_| {
            handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    {
        let billed = Arc::clone(&billed);
        bus.bind_consumer_group(
            "order.created",
            "billing",
            GroupConfig::new().workers(2),
            move |_| {
                billed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .unwrap();
    }
    {
        let shipped = Arc::clone(&shipped);
        bus.bind_consumer_group(
            "order.created",
            "shipping",
            GroupConfig::new().workers(1),
            move |_| {
                shipped.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .unwrap();
    }
    bus.start();

    for _ in 0..8 {
        bus.publish("order.created", b"{}".to_vec()).unwrap();
    }

    assert!(support::wait_until(Duration::from_secs(2), || {
        billed.load(Ordering::SeqCst) == 8 && shipped.load(Ordering::SeqCst) == 8
    }));

    let report = bus.stop(Duration::from_secs(2));
    assert!(report.fully_drained);
    assert_eq!(report.handlers.messages_handled, 8);
    assert_eq!(handled.load(Ordering::SeqCst), 8);

    let mut names: Vec<&str> = report
        .groups
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["billing", "shipping"]);
    for (_, stats) in &report.groups {
        assert_eq!(stats.items_completed, 8);
    }

    assert!(matches!(
        bus.publish("order.created", b"{}".to_vec()),
        Err(PublishError::Closed)
    ));
}

// ============================================================================
// Test 5: Binding a group after start spins its workers up immediately
// ============================================================================

#[test]
fn bind_after_start_runs_immediately() {
    support::init_tracing();
    let bus = Bus::new();
    bus.start();

    let done = Arc::new(AtomicUsize::new(0));
    {
        let done = Arc::clone(&done);
        bus.bind_consumer_group(
            "work",
            "latecomer",
            GroupConfig::new().workers(1),
            move |_| {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .unwrap();
    }

    bus.publish("work", b"{}".to_vec()).unwrap();
    assert!(support::wait_until(Duration::from_secs(2), || {
        done.load(Ordering::SeqCst) == 1
    }));
    bus.stop(Duration::from_secs(1));
}
