use livesync_demo::{DemoApp, parse_rows};
use livesync_sync::{LiveSyncConfig, SyncError};
use livesync_types::{JsonRecord, Record, RecordId, UpdateKind};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

fn todo(id: i64, title: &str) -> JsonRecord {
    JsonRecord::with_id(id).set("title", title)
}

fn seed() -> Vec<JsonRecord> {
    vec![todo(1, "one"), todo(2, "two")]
}

fn config() -> LiveSyncConfig {
    let mut config = LiveSyncConfig::default();
    config.realtime.topic = "todos".into();
    config
}

fn ids(rows: &[JsonRecord]) -> Vec<RecordId> {
    rows.iter().map(|r| r.id()).collect()
}

fn rids(raw: &[i64]) -> Vec<RecordId> {
    raw.iter().map(|&id| RecordId::from(id)).collect()
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

async fn advance_ms(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn starts_with_seed_and_subscription() {
    let app = DemoApp::start(&config(), seed()).unwrap();
    assert!(app.is_subscribed());
    assert_eq!(app.view(), seed());
    assert_eq!(app.refresh_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn push_events_patch_the_view() {
    let app = DemoApp::start(&config(), seed()).unwrap();

    assert_eq!(app.server_upsert(todo(3, "three")), 1);
    assert_eq!(app.server_upsert(todo(1, "ONE")), 1);
    settle().await;
    assert_eq!(ids(&app.view()), rids(&[1, 2, 3]));
    assert_eq!(app.view()[0].get("title"), Some(&json!("ONE")));

    assert_eq!(app.server_delete(&RecordId::from(2_i64)), 1);
    settle().await;
    assert_eq!(ids(&app.snapshot()), rids(&[1, 3]));
}

#[tokio::test(start_paused = true)]
async fn optimistic_edit_is_shown_until_it_expires() {
    let app = DemoApp::start(&config(), seed()).unwrap();

    app.local_change(UpdateKind::Update, JsonRecord::with_id(2).set("title", "edited"));
    app.local_change(UpdateKind::Create, todo(9, "draft"));
    assert_eq!(app.pending_count(), 2);

    let view = app.view();
    assert_eq!(ids(&view), rids(&[1, 2, 9]));
    assert_eq!(view[1].get("title"), Some(&json!("edited")));
    // The snapshot itself is untouched.
    assert_eq!(app.snapshot(), seed());

    advance_ms(4_999).await;
    assert_eq!(app.pending_count(), 2);

    advance_ms(2).await;
    assert_eq!(app.pending_count(), 0);
    assert_eq!(app.view(), seed());
}

#[tokio::test(start_paused = true)]
async fn confirmed_edit_is_dropped_immediately() {
    let app = DemoApp::start(&config(), seed()).unwrap();

    let id = app.local_change(UpdateKind::Delete, JsonRecord::with_id(1));
    assert_eq!(ids(&app.view()), rids(&[2]));

    assert!(app.confirm(&id));
    assert!(!app.confirm(&id));
    assert_eq!(app.view(), seed());
}

#[tokio::test(start_paused = true)]
async fn becoming_visible_refreshes_silent_changes() {
    let app = DemoApp::start(&config(), seed()).unwrap();

    app.server_upsert_silently(todo(2, "renamed"));
    settle().await;
    assert_eq!(app.snapshot(), seed());

    assert!(app.set_visible(false));
    settle().await;
    assert_eq!(app.refresh_count(), 0);

    assert!(app.set_visible(true));
    settle().await;
    assert_eq!(app.refresh_count(), 1);
    assert_eq!(app.snapshot()[1].get("title"), Some(&json!("renamed")));
}

#[tokio::test(start_paused = true)]
async fn periodic_refresh_follows_configured_interval() {
    let mut config = config();
    config.scheduler.interval_ms = 1_000;
    let app = DemoApp::start(&config, seed()).unwrap();
    app.server_upsert_silently(todo(5, "five"));

    advance_ms(999).await;
    assert_eq!(app.refresh_count(), 0);

    advance_ms(2).await;
    assert_eq!(app.refresh_count(), 1);
    assert_eq!(ids(&app.snapshot()), rids(&[1, 2, 5]));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_refreshes_and_pushes() {
    let mut config = config();
    config.scheduler.interval_ms = 1_000;
    let mut app = DemoApp::start(&config, seed()).unwrap();

    app.shutdown();
    assert!(!app.is_subscribed());
    assert_eq!(app.server_upsert(todo(3, "three")), 0);

    app.set_visible(false);
    app.set_visible(true);
    advance_ms(10_000).await;
    assert_eq!(app.refresh_count(), 0);
    assert_eq!(app.snapshot(), seed());
}

#[tokio::test(start_paused = true)]
async fn disabled_realtime_never_subscribes() {
    let mut config = config();
    config.realtime.enabled = false;
    let app = DemoApp::start(&config, seed()).unwrap();

    assert!(!app.is_subscribed());
    assert_eq!(app.server_upsert(todo(3, "three")), 0);
    settle().await;
    assert_eq!(app.snapshot(), seed());
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let mut config = config();
    config.overlay.ttl_ms = 0;
    assert!(DemoApp::start(&config, seed()).is_err());
}

#[test]
fn parses_seed_rows() {
    let rows = parse_rows(r#"[{"id": 1, "title": "one"}, {"id": "b", "title": "two"}]"#).unwrap();
    assert_eq!(ids(&rows), vec![RecordId::from(1_i64), RecordId::from("b")]);
}

#[test]
fn seed_rows_without_id_are_record_errors() {
    let result = parse_rows(r#"[{"id": 1}, {"title": "no id"}]"#);
    assert!(matches!(result, Err(SyncError::Record(_))));

    let result = parse_rows(r#"[1, 2]"#);
    assert!(matches!(result, Err(SyncError::Record(_))));
}

#[test]
fn malformed_seed_json_is_serialization_error() {
    assert!(matches!(parse_rows("[{"), Err(SyncError::Serialization(_))));
}
