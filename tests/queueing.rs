//! Work-queue scenarios — FIFO ordering and backpressure at the bus
//! surface.

mod support;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use relay_rust::{BackpressurePolicy, Bus, GroupConfig, PublishError};

// ============================================================================
// Test 1: FIFO — a single worker observes items in enqueue order
// ============================================================================

#[test]
fn single_worker_observes_enqueue_order() {
    support::init_tracing();
    let bus = Bus::new();
    let seen: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));

    {
        let seen = Arc::clone(&seen);
        bus.bind_consumer_group(
            "work",
            "single",
            GroupConfig::new().workers(1),
            move |envelope| {
                seen.lock().unwrap().push(envelope.sequence);
                Ok(())
            },
        )
        .unwrap();
    }
    bus.start();

    for _ in 0..10 {
        bus.publish("work", b"{}".to_vec()).unwrap();
    }

    assert!(support::wait_until(Duration::from_secs(2), || {
        seen.lock().unwrap().len() == 10
    }));
    bus.stop(Duration::from_secs(1));

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, (1..=10).collect::<Vec<u64>>());
}

// ============================================================================
// Test 2: Reject backpressure — capacity 2, three publishes, one rejection
// ============================================================================

#[test]
fn full_queue_rejects_third_publish() {
    support::init_tracing();
    let bus = Bus::new();

    // Workers never started, so nothing drains the queue.
    bus.bind_consumer_group(
        "work",
        "slowpokes",
        GroupConfig::new()
            .queue_capacity(2)
            .backpressure(BackpressurePolicy::Reject),
        |_| Ok(()),
    )
    .unwrap();

    assert!(bus.publish("work", b"a".to_vec()).is_ok());
    assert!(bus.publish("work", b"b".to_vec()).is_ok());

    match bus.publish("work", b"c".to_vec()) {
        Err(PublishError::EnqueueRejected { queue }) => assert_eq!(queue, "slowpokes"),
        other => panic!("expected EnqueueRejected, got {:?}", other),
    }

    assert_eq!(bus.group("slowpokes").unwrap().queue().len(), 2);
}

// ============================================================================
// Test 3: Block backpressure — a full queue stalls the publisher until a
// worker frees a slot
// ============================================================================

#[test]
fn full_queue_blocks_publisher_until_drained() {
    support::init_tracing();
    let bus = Bus::new();
    let completed = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    {
        let completed = Arc::clone(&completed);
        bus.bind_consumer_group(
            "work",
            "steady",
            GroupConfig::new()
                .workers(1)
                .queue_capacity(1)
                .backpressure(BackpressurePolicy::Block),
            move |_| {
                std::thread::sleep(Duration::from_millis(50));
                completed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            },
        )
        .unwrap();
    }
    bus.start();

    let started = Instant::now();
    for _ in 0..3 {
        bus.publish("work", b"{}".to_vec()).unwrap();
    }
    let elapsed = started.elapsed();

    // The third publish cannot be admitted before the worker has made
    // room, which takes at least one full processing step.
    assert!(
        elapsed >= Duration::from_millis(40),
        "publisher was never backpressured ({:?})",
        elapsed
    );

    assert!(support::wait_until(Duration::from_secs(2), || {
        completed.load(std::sync::atomic::Ordering::SeqCst) == 3
    }));
    let report = bus.stop(Duration::from_secs(2));
    let (_, stats) = &report.groups[0];
    assert_eq!(stats.items_completed, 3);
}

// ============================================================================
// Test 4: Rejected group delivery does not affect fan-out siblings
// ============================================================================

#[test]
fn rejection_does_not_affect_handler_subscribers() {
    support::init_tracing();
    let bus = Bus::new();
    let handled = Arc::new(Mutex::new(Vec::new()));

    {
        let handled = Arc::clone(&handled);
        bus.subscribe("work", move |envelope| {
            handled.lock().unwrap().push(envelope.sequence);
            Ok(())
        });
    }
    bus.bind_consumer_group(
        "work",
        "tiny",
        GroupConfig::new()
            .queue_capacity(1)
            .backpressure(BackpressurePolicy::Reject),
        |_| Ok(()),
    )
    .unwrap();

    // First publish fills the queue; second is rejected by the group but
    // still reaches the handler.
    assert!(bus.publish("work", b"a".to_vec()).is_ok());
    assert!(matches!(
        bus.publish("work", b"b".to_vec()),
        Err(PublishError::EnqueueRejected { .. })
    ));

    let report = bus.stop(Duration::from_secs(2));
    assert_eq!(report.handlers.messages_handled, 2);
    assert_eq!(*handled.lock().unwrap(), vec![1, 2]);
    // The group's workers were never started, so there was nothing to drain.
    assert!(report.fully_drained);
}
