//! Tests for the app-connection synchronizer.
//!
//! Validates reconcile-on-demand semantics: no remote traffic without a
//! configured entry, exactly one `save_app` per state change, and skip on
//! an unchanged fingerprint.

mod common;

use common::*;
use flowcanvas::app::AppState;
use flowcanvas::services::AppService;

#[tokio::test]
async fn unconfigured_entry_produces_no_remote_traffic() {
    let (editor, _store, apps) = editor_fixture();
    editor.add_node(entry_node(), None).unwrap();
    editor.add_node(end_node(), None).unwrap();

    editor.sync().sync_now().await;
    assert!(apps.save_log().is_empty());
}

#[tokio::test]
async fn repeated_sync_without_change_writes_once() {
    let (editor, _store, apps) = editor_fixture();
    let entry = editor.add_node(entry_node(), None).unwrap();
    editor.add_node(end_node(), None).unwrap();
    editor.configure_app_entry(entry, "Demo").await.unwrap();

    // Let the queue settle, then count.
    editor.sync().sync_now().await;
    let settled = apps.save_log().len();

    editor.sync().sync_now().await;
    editor.sync().sync_now().await;
    assert_eq!(apps.save_log().len(), settled);
}

#[tokio::test]
async fn connecting_persists_connected_state_exactly_once() {
    let (editor, store, apps) = editor_fixture();
    let entry = editor.add_node(entry_node(), None).unwrap();
    let end = editor.add_node(end_node(), None).unwrap();
    editor.configure_app_entry(entry, "Demo").await.unwrap();
    editor.sync().sync_now().await;
    let before = apps.save_log().len();

    let out = output_of(&store, entry);
    let input = input_of(&store, end);
    editor.connect(entry, out, end, input).unwrap();
    editor.sync().sync_now().await;

    let log = apps.save_log();
    assert_eq!(log.len(), before + 1);
    let written = log.last().unwrap();
    assert_eq!(written.state, AppState::Connected);
    assert_eq!(written.end_node_id, Some(end));
}

#[tokio::test]
async fn disconnecting_clears_the_end_node_id() {
    let (editor, store, apps) = editor_fixture();
    let entry = editor.add_node(entry_node(), None).unwrap();
    let end = editor.add_node(end_node(), None).unwrap();
    let app_id = editor.configure_app_entry(entry, "Demo").await.unwrap();

    let out = output_of(&store, entry);
    let input = input_of(&store, end);
    let connection = editor.connect(entry, out, end, input).unwrap();
    editor.sync().sync_now().await;
    assert_eq!(apps.app(app_id).unwrap().state, AppState::Connected);

    let before = apps.save_log().len();
    editor.disconnect(connection).unwrap();
    editor.sync().sync_now().await;

    let log = apps.save_log();
    assert_eq!(log.len(), before + 1);
    let written = log.last().unwrap();
    assert_eq!(written.state, AppState::Disconnected);
    assert!(written.end_node_id.is_none());
}

#[tokio::test]
async fn indirect_paths_count_as_connected() {
    let (editor, store, apps) = editor_fixture();
    let entry = editor.add_node(entry_node(), None).unwrap();
    let generator = editor.add_node(text_node(), None).unwrap();
    let end = editor.add_node(end_node(), None).unwrap();
    let app_id = editor.configure_app_entry(entry, "Demo").await.unwrap();

    let entry_out = output_of(&store, entry);
    editor
        .connect_with_new_input(entry, entry_out, generator, "Context")
        .unwrap();
    let generator_out = output_of(&store, generator);
    let end_in = input_of(&store, end);
    editor.connect(generator, generator_out, end, end_in).unwrap();

    editor.sync().sync_now().await;
    let record = apps.app(app_id).unwrap();
    assert_eq!(record.state, AppState::Connected);
    assert_eq!(record.end_node_id, Some(end));
}

#[tokio::test]
async fn failed_sync_does_not_block_later_requests() {
    let (editor, store, apps) = editor_fixture();
    let entry = editor.add_node(entry_node(), None).unwrap();
    let end = editor.add_node(end_node(), None).unwrap();
    let app_id = editor.configure_app_entry(entry, "Demo").await.unwrap();
    editor.sync().sync_now().await;

    // Simulate the remote record vanishing: get_app fails, the sync is
    // logged and swallowed, and the queue keeps serving.
    apps.delete_app(app_id).await.unwrap();

    let out = output_of(&store, entry);
    let input = input_of(&store, end);
    editor.connect(entry, out, end, input).unwrap();
    editor.sync().sync_now().await;

    // Restore the record; the next request reconciles normally and the
    // still-connected graph is finally written out.
    let mut record = flowcanvas::app::App::new(store.snapshot().id, entry, "Demo");
    record.id = app_id;
    apps.save_app(record).await.unwrap();

    editor.sync().sync_now().await;
    let restored = apps.app(app_id).unwrap();
    assert_eq!(restored.state, AppState::Connected);
    assert_eq!(restored.end_node_id, Some(end));
}
