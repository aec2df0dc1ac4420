use livesync_sync::{
    DEFAULT_SYNC_INTERVAL_MS, DEFAULT_UPDATE_TTL_MS, LiveSyncConfig, OverlayConfig,
    RealtimeConfig, SchedulerConfig, SyncError,
};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;

#[test]
fn defaults() {
    let config = LiveSyncConfig::default();
    assert_eq!(config.overlay.ttl_ms, DEFAULT_UPDATE_TTL_MS);
    assert_eq!(config.overlay.ttl(), Duration::from_secs(5));
    assert_eq!(config.scheduler.interval_ms, DEFAULT_SYNC_INTERVAL_MS as i64);
    assert!(config.scheduler.enabled);
    assert_eq!(config.realtime.topic, "records");
    assert!(config.realtime.enabled);
    config.validate().unwrap();
}

#[test]
fn partial_document_keeps_defaults() {
    let config = LiveSyncConfig::from_json_str(r#"{"scheduler": {"interval_ms": 60000}}"#).unwrap();
    assert_eq!(
        config,
        LiveSyncConfig {
            scheduler: SchedulerConfig {
                interval_ms: 60_000,
                enabled: true,
            },
            ..LiveSyncConfig::default()
        }
    );
}

#[test]
fn negative_interval_is_accepted() {
    let config = LiveSyncConfig::from_json_str(r#"{"scheduler": {"interval_ms": -1}}"#).unwrap();
    assert_eq!(config.scheduler.interval_ms, -1);
}

#[test]
fn empty_topic_rejected_when_enabled() {
    let result = LiveSyncConfig::from_json_str(r#"{"realtime": {"topic": "  "}}"#);
    assert!(matches!(result, Err(SyncError::Config(_))));

    let config =
        LiveSyncConfig::from_json_str(r#"{"realtime": {"topic": "", "enabled": false}}"#).unwrap();
    assert_eq!(
        config.realtime,
        RealtimeConfig {
            topic: String::new(),
            enabled: false,
        }
    );
}

#[test]
fn zero_ttl_rejected() {
    let result = LiveSyncConfig::from_json_str(r#"{"overlay": {"ttl_ms": 0}}"#);
    assert!(matches!(result, Err(SyncError::Config(_))));
}

#[test]
fn malformed_json_is_serialization_error() {
    let result = LiveSyncConfig::from_json_str("{oops");
    assert!(matches!(result, Err(SyncError::Serialization(_))));
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"overlay": {{"ttl_ms": 2500}}, "realtime": {{"topic": "todos"}}}}"#
    )
    .unwrap();

    let config = LiveSyncConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.overlay, OverlayConfig { ttl_ms: 2_500 });
    assert_eq!(config.realtime.topic, "todos");
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = LiveSyncConfig::from_json_file(dir.path().join("missing.json"));
    assert!(matches!(result, Err(SyncError::Io(_))));
}

#[test]
fn serializes_back_to_json() {
    let config = LiveSyncConfig::default();
    let text = serde_json::to_string(&config).unwrap();
    assert_eq!(LiveSyncConfig::from_json_str(&text).unwrap(), config);
}
