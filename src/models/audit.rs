use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{AuditAction, EntityKind};

/// One immutable row of the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Append order (AUTOINCREMENT rowid); total order within the process.
    pub id: i64,
    pub principal: String,
    pub action: AuditAction,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub timestamp: NaiveDateTime,
}
