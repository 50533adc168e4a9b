use std::str::FromStr;

use rusqlite::{params, Connection, Row};

use super::{fmt_datetime, parse_datetime};
use crate::db::DatabaseError;
use crate::models::{AuditAction, AuditEntry, EntityKind};

/// Append one audit entry. Called inside the mutation's transaction so the
/// entry commits or rolls back together with the primary write.
pub fn insert_audit_entry(
    conn: &Connection,
    principal: &str,
    action: AuditAction,
    entity_kind: EntityKind,
    entity_id: &str,
    timestamp: &chrono::NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (principal, action, entity_kind, entity_id, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            principal,
            action.as_str(),
            entity_kind.as_str(),
            entity_id,
            fmt_datetime(timestamp),
        ],
    )?;
    Ok(())
}

/// Full audit history for one entity, in append order.
pub fn query_audit_for_entity(
    conn: &Connection,
    entity_kind: EntityKind,
    entity_id: &str,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, principal, action, entity_kind, entity_id, timestamp
         FROM audit_log WHERE entity_kind = ?1 AND entity_id = ?2
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![entity_kind.as_str(), entity_id], audit_row_from_sql)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(audit_from_row(row?)?);
    }
    Ok(entries)
}

/// Most recent audit entries across all entities, newest first.
pub fn query_recent_audit(conn: &Connection, limit: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, principal, action, entity_kind, entity_id, timestamp
         FROM audit_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], audit_row_from_sql)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(audit_from_row(row?)?);
    }
    Ok(entries)
}

// Internal row type for AuditEntry mapping
struct AuditRow {
    id: i64,
    principal: String,
    action: String,
    entity_kind: String,
    entity_id: String,
    timestamp: String,
}

fn audit_row_from_sql(row: &Row<'_>) -> rusqlite::Result<AuditRow> {
    Ok(AuditRow {
        id: row.get(0)?,
        principal: row.get(1)?,
        action: row.get(2)?,
        entity_kind: row.get(3)?,
        entity_id: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

fn audit_from_row(row: AuditRow) -> Result<AuditEntry, DatabaseError> {
    Ok(AuditEntry {
        id: row.id,
        principal: row.principal,
        action: AuditAction::from_str(&row.action)?,
        entity_kind: EntityKind::from_str(&row.entity_kind)?,
        entity_id: row.entity_id,
        timestamp: parse_datetime(&row.timestamp)?,
    })
}
