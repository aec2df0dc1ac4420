use livesync_types::{RecordId, UpdateId, UpdateKind};
use serde_json::json;
use std::collections::HashSet;

// ── RecordId ──────────────────────────────────────────────────────

#[test]
fn record_id_from_json_int_and_str() {
    assert_eq!(RecordId::from_json(&json!(42)).unwrap(), RecordId::Int(42));
    assert_eq!(
        RecordId::from_json(&json!("abc")).unwrap(),
        RecordId::Str("abc".into())
    );
}

#[test]
fn record_id_rejects_other_json() {
    assert!(RecordId::from_json(&json!(1.5)).is_err());
    assert!(RecordId::from_json(&json!(null)).is_err());
    assert!(RecordId::from_json(&json!({"id": 1})).is_err());
}

#[test]
fn record_id_int_and_str_are_distinct() {
    assert_ne!(RecordId::from(1), RecordId::from("1"));
}

#[test]
fn record_id_display() {
    assert_eq!(RecordId::from(7).to_string(), "7");
    assert_eq!(RecordId::from("note-1").to_string(), "note-1");
}

#[test]
fn record_id_serde_untagged() {
    let json = serde_json::to_string(&RecordId::from(3)).unwrap();
    assert_eq!(json, "3");
    let back: RecordId = serde_json::from_str("\"x\"").unwrap();
    assert_eq!(back, RecordId::from("x"));
}

#[test]
fn record_id_to_json_roundtrip() {
    let id = RecordId::from("k");
    assert_eq!(RecordId::from_json(&id.to_json()).unwrap(), id);
}

#[test]
fn record_id_hash_and_eq() {
    let mut set = HashSet::new();
    set.insert(RecordId::from(1));
    set.insert(RecordId::from(1));
    set.insert(RecordId::from("1"));
    assert_eq!(set.len(), 2);
}

// ── UpdateId ──────────────────────────────────────────────────────

#[test]
fn update_id_format() {
    let id = UpdateId::derive(UpdateKind::Update, &RecordId::from(5), 1_700_000_000_000, 3);
    assert_eq!(id.as_str(), "update-5-1700000000000-3");
    assert_eq!(id.to_string(), id.as_str());
}

#[test]
fn update_id_unique_within_same_millisecond() {
    let rid = RecordId::from(1);
    let a = UpdateId::derive(UpdateKind::Update, &rid, 10, 0);
    let b = UpdateId::derive(UpdateKind::Update, &rid, 10, 1);
    assert_ne!(a, b);
}

#[test]
fn update_id_from_str() {
    let id: UpdateId = "create-1-0-0".parse().unwrap();
    assert_eq!(id, UpdateId::from("create-1-0-0"));
}
