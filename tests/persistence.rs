//! Tests for the debounced persistence controller.
//!
//! Timing-based: debounce intervals are kept short and wait margins
//! generous so the state machine's behavior (coalescing, queued re-save,
//! skip intent, failure retention) is observable without test-util clocks.

mod common;

use common::*;
use flowcanvas::persistence::{PersistenceConfig, PersistenceController, SaveError};
use flowcanvas::store::Persist;
use flowcanvas::workspace::Viewport;
use tokio::time::{Duration, sleep};

fn config(debounce_ms: u64) -> PersistenceConfig {
    PersistenceConfig::default().with_debounce(Duration::from_millis(debounce_ms))
}

#[tokio::test]
async fn rapid_mutations_coalesce_into_one_save() {
    let (store, backend) = store_fixture();
    let controller = PersistenceController::spawn(store.clone(), backend.clone(), config(50));

    for _ in 0..5 {
        store.add_node(text_node(), None);
    }
    sleep(Duration::from_millis(400)).await;

    assert_eq!(backend.save_count(), 1);
    // The single save carries the state after the fifth mutation.
    assert_eq!(backend.saved()[0].nodes.len(), 5);
    assert!(!controller.is_dirty());
    controller.dispose().await;
}

#[tokio::test]
async fn mutation_during_save_triggers_exactly_one_follow_up() {
    let (store, backend) = store_fixture();
    backend.set_save_delay(Duration::from_millis(200));
    let controller = PersistenceController::spawn(store.clone(), backend.clone(), config(30));

    store.add_node(text_node(), None);
    // Let the debounce fire and the slow save get in flight.
    sleep(Duration::from_millis(100)).await;
    assert!(controller.is_dirty());
    store.add_node(text_node(), None);

    sleep(Duration::from_millis(600)).await;
    assert_eq!(backend.save_count(), 2);
    // The follow-up carries the latest state, not the one that queued it.
    assert_eq!(backend.saved()[1].nodes.len(), 2);
    assert!(!controller.is_dirty());
    controller.dispose().await;
}

#[tokio::test]
async fn skip_intent_mutations_never_schedule_a_save() {
    let (store, backend) = store_fixture();
    let controller = PersistenceController::spawn(store.clone(), backend.clone(), config(30));

    store.set_viewport(
        Viewport {
            x: 40.0,
            y: 0.0,
            zoom: 1.5,
        },
        Persist::Skip,
    );
    sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.save_count(), 0);
    assert!(!controller.is_dirty());

    // A subsequent ordinary mutation saves exactly once.
    store.set_viewport(Viewport::default(), Persist::Commit);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.save_count(), 1);
    controller.dispose().await;
}

#[tokio::test]
async fn renaming_alone_is_not_a_relevant_change() {
    let (store, backend) = store_fixture();
    let controller = PersistenceController::spawn(store.clone(), backend.clone(), config(30));

    store.set_name("renamed workflow");
    sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.save_count(), 0);

    // The rename rides along with the next structural save.
    store.add_node(text_node(), None);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.save_count(), 1);
    assert_eq!(backend.saved()[0].name, "renamed workflow");
    controller.dispose().await;
}

#[tokio::test]
async fn flush_saves_immediately_and_is_a_no_op_when_clean() {
    let (store, backend) = store_fixture();
    // Debounce far beyond the test horizon; only the flush can save.
    let controller = PersistenceController::spawn(store.clone(), backend.clone(), config(60_000));

    controller.flush("nothing to do").await.unwrap();
    assert_eq!(backend.save_count(), 0);

    store.add_node(text_node(), None);
    assert!(controller.is_dirty());
    controller.flush("navigation").await.unwrap();
    assert_eq!(backend.save_count(), 1);
    assert!(!controller.is_dirty());

    controller.flush("still clean").await.unwrap();
    assert_eq!(backend.save_count(), 1);
    controller.dispose().await;
}

#[tokio::test]
async fn failed_save_keeps_the_document_dirty_for_retry() {
    let (store, backend) = store_fixture();
    let controller = PersistenceController::spawn(store.clone(), backend.clone(), config(60_000));

    store.add_node(text_node(), None);
    backend.fail_next_save();

    let err = controller.flush("doomed").await.unwrap_err();
    assert!(matches!(err, SaveError::Backend(_)));
    assert!(controller.is_dirty());
    assert_eq!(backend.save_count(), 0);

    // The retry reads the then-current snapshot, not the failed payload.
    store.add_node(text_node(), None);
    controller.flush("retry").await.unwrap();
    assert_eq!(backend.save_count(), 1);
    assert_eq!(backend.saved()[0].nodes.len(), 2);
    assert!(!controller.is_dirty());
    controller.dispose().await;
}

#[tokio::test]
async fn best_effort_flush_hands_off_without_clearing_dirty() {
    let (store, backend) = store_fixture();
    let controller = PersistenceController::spawn(store.clone(), backend.clone(), config(60_000));

    // Clean: nothing is handed to the transport.
    controller.flush_best_effort("unload");
    assert!(backend.best_effort_saves().is_empty());
    assert!(!controller.handle_unload());

    store.add_node(text_node(), None);
    assert!(controller.handle_unload());
    let handed_off = backend.best_effort_saves();
    assert_eq!(handed_off.len(), 1);
    assert_eq!(handed_off[0].nodes.len(), 1);
    // No confirmation the beacon landed, so the flag stays set.
    assert!(controller.is_dirty());
    assert_eq!(backend.save_count(), 0);
    controller.dispose().await;
}

#[tokio::test]
async fn dispose_cancels_the_pending_timer() {
    let (store, backend) = store_fixture();
    let controller = PersistenceController::spawn(store.clone(), backend.clone(), config(100));

    store.add_node(text_node(), None);
    controller.dispose().await;
    sleep(Duration::from_millis(300)).await;

    assert_eq!(backend.save_count(), 0);
    let err = controller.flush("after dispose").await.unwrap_err();
    assert!(matches!(err, SaveError::Disposed));
}

#[tokio::test]
async fn flush_during_in_flight_save_resolves_with_it() {
    let (store, backend) = store_fixture();
    backend.set_save_delay(Duration::from_millis(150));
    let controller = PersistenceController::spawn(store.clone(), backend.clone(), config(20));

    store.add_node(text_node(), None);
    sleep(Duration::from_millis(80)).await;

    // The save is in flight; a flush must wait for it, not start another.
    controller.flush("while saving").await.unwrap();
    assert_eq!(backend.save_count(), 1);
    assert!(!controller.is_dirty());
    controller.dispose().await;
}
