//! Applying push notifications to a local snapshot.
//!
//! Deltas follow the common change-feed shape: inserts and updates carry
//! the full row under `new`, deletes carry at least the id under `old`.

use livesync_sync::{ChangeEvent, ChangeKind};
use livesync_types::{JsonRecord, Record, RecordId};
use tracing::{debug, warn};

/// Applies one change event to `snapshot`. Malformed deltas are skipped.
pub fn apply_change(snapshot: &mut Vec<JsonRecord>, event: &ChangeEvent) {
    match event.kind {
        ChangeKind::Insert | ChangeKind::Update => {
            let Some(row) = event.record_delta.get("new") else {
                warn!(kind = %event.kind, "Change has no `new` row, skipped");
                return;
            };
            match JsonRecord::from_value(row.clone()) {
                Ok(record) => upsert(snapshot, record),
                Err(e) => warn!(kind = %event.kind, "Malformed row, skipped: {e}"),
            }
        }
        ChangeKind::Delete => {
            let id = event
                .record_delta
                .get("old")
                .and_then(|old| old.get(JsonRecord::ID_FIELD))
                .map(RecordId::from_json);
            match id {
                Some(Ok(id)) => {
                    snapshot.retain(|r| r.id() != id);
                    debug!(record_id = %id, "Removed record from snapshot");
                }
                Some(Err(e)) => warn!("Malformed delete, skipped: {e}"),
                None => warn!("Delete has no `old.id`, skipped"),
            }
        }
    }
}

fn upsert(snapshot: &mut Vec<JsonRecord>, record: JsonRecord) {
    let id = record.id();
    match snapshot.iter_mut().find(|r| r.id() == id) {
        Some(existing) => *existing = record,
        None => snapshot.push(record),
    }
    debug!(record_id = %id, "Upserted record into snapshot");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: ChangeKind, delta: serde_json::Value) -> ChangeEvent {
        ChangeEvent {
            topic: "todos".into(),
            kind,
            record_delta: delta,
        }
    }

    #[test]
    fn insert_appends_and_update_replaces() {
        let mut snapshot = vec![JsonRecord::with_id(1)];
        apply_change(&mut snapshot, &event(ChangeKind::Insert, json!({"new": {"id": 2}})));
        apply_change(
            &mut snapshot,
            &event(ChangeKind::Update, json!({"new": {"id": 1, "title": "t"}})),
        );
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].get("title"), Some(&json!("t")));
    }

    #[test]
    fn delete_by_old_id() {
        let mut snapshot = vec![JsonRecord::with_id(1), JsonRecord::with_id(2)];
        apply_change(&mut snapshot, &event(ChangeKind::Delete, json!({"old": {"id": 1}})));
        assert_eq!(snapshot, vec![JsonRecord::with_id(2)]);
    }

    #[test]
    fn malformed_deltas_leave_snapshot_alone() {
        let mut snapshot = vec![JsonRecord::with_id(1)];
        apply_change(&mut snapshot, &event(ChangeKind::Insert, json!({"row": {}})));
        apply_change(&mut snapshot, &event(ChangeKind::Update, json!({"new": {"name": "x"}})));
        apply_change(&mut snapshot, &event(ChangeKind::Delete, json!({"old": {"id": true}})));
        apply_change(&mut snapshot, &event(ChangeKind::Delete, json!({})));
        assert_eq!(snapshot, vec![JsonRecord::with_id(1)]);
    }
}
