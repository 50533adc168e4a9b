//! Audit Recorder — one immutable entry per state-changing operation.
//!
//! `record()` is called inside the mutating transaction, so the primary
//! write and its audit entry commit or roll back as a unit. The acting
//! principal is passed in explicitly by the boundary layer; when none is
//! supplied the `"anonymous"` sentinel is recorded.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::{AuditAction, AuditEntry, EntityKind};

/// Recorded when no acting principal is resolvable.
pub const ANONYMOUS_PRINCIPAL: &str = "anonymous";

// Last issued timestamp in unix seconds. Audit timestamps must be
// non-decreasing per process even if the wall clock steps backwards.
static LAST_TIMESTAMP_SECS: AtomicI64 = AtomicI64::new(0);

fn next_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    let candidate = now.and_utc().timestamp();
    let prev = LAST_TIMESTAMP_SECS.fetch_max(candidate, Ordering::SeqCst);
    if prev <= candidate {
        now
    } else {
        DateTime::from_timestamp(prev, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(now)
    }
}

/// Append one audit entry for a mutation of `(entity_kind, entity_id)`.
pub fn record(
    conn: &Connection,
    principal: Option<&str>,
    action: AuditAction,
    entity_kind: EntityKind,
    entity_id: &Uuid,
) -> Result<(), DatabaseError> {
    let principal = match principal {
        Some(p) if !p.trim().is_empty() => p,
        _ => ANONYMOUS_PRINCIPAL,
    };
    let timestamp = next_timestamp();
    repository::insert_audit_entry(
        conn,
        principal,
        action,
        entity_kind,
        &entity_id.to_string(),
        &timestamp,
    )?;
    tracing::debug!(
        principal,
        action = action.as_str(),
        entity = entity_kind.as_str(),
        id = %entity_id,
        "audit entry recorded"
    );
    Ok(())
}

/// Audit history for one entity, in append order.
pub fn entries_for(
    conn: &Connection,
    entity_kind: EntityKind,
    entity_id: &Uuid,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    repository::query_audit_for_entity(conn, entity_kind, &entity_id.to_string())
}

/// Most recent entries across all entities, newest first.
pub fn recent(conn: &Connection, limit: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
    repository::query_recent_audit(conn, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn record_with_principal() {
        let conn = open_memory_database().unwrap();
        let id = Uuid::new_v4();
        record(&conn, Some("jsmith"), AuditAction::Create, EntityKind::Patient, &id).unwrap();

        let entries = entries_for(&conn, EntityKind::Patient, &id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].principal, "jsmith");
        assert_eq!(entries[0].action, AuditAction::Create);
        assert_eq!(entries[0].entity_id, id.to_string());
    }

    #[test]
    fn missing_principal_records_anonymous() {
        let conn = open_memory_database().unwrap();
        let id = Uuid::new_v4();
        record(&conn, None, AuditAction::Delete, EntityKind::SoapNote, &id).unwrap();
        record(&conn, Some("   "), AuditAction::Update, EntityKind::SoapNote, &id).unwrap();

        let entries = entries_for(&conn, EntityKind::SoapNote, &id).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.principal == ANONYMOUS_PRINCIPAL));
    }

    #[test]
    fn entries_scoped_to_entity() {
        let conn = open_memory_database().unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        record(&conn, Some("x"), AuditAction::Create, EntityKind::Patient, &a).unwrap();
        record(&conn, Some("x"), AuditAction::Create, EntityKind::Therapist, &b).unwrap();

        assert_eq!(entries_for(&conn, EntityKind::Patient, &a).unwrap().len(), 1);
        assert_eq!(entries_for(&conn, EntityKind::Patient, &b).unwrap().len(), 0);
    }

    #[test]
    fn recent_returns_newest_first() {
        let conn = open_memory_database().unwrap();
        let id = Uuid::new_v4();
        record(&conn, Some("x"), AuditAction::Create, EntityKind::Patient, &id).unwrap();
        record(&conn, Some("x"), AuditAction::Update, EntityKind::Patient, &id).unwrap();
        record(&conn, Some("x"), AuditAction::Delete, EntityKind::Patient, &id).unwrap();

        let entries = recent(&conn, 2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::Delete);
        assert_eq!(entries[1].action, AuditAction::Update);
    }

    #[test]
    fn timestamps_non_decreasing() {
        let conn = open_memory_database().unwrap();
        let id = Uuid::new_v4();
        for _ in 0..5 {
            record(&conn, Some("x"), AuditAction::Update, EntityKind::Patient, &id).unwrap();
        }
        let entries = entries_for(&conn, EntityKind::Patient, &id).unwrap();
        for pair in entries.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }
}
