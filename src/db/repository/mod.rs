//! Repository layer — entity-scoped database operations.
//!
//! One sub-module per table; all public functions are re-exported here.
//! Row mapping is two-stage: a raw row struct read inside the rusqlite
//! closure, then a typed conversion that can report id/enum errors.

mod appointment;
mod audit;
mod intake;
mod patient;
mod self_assessment;
mod soap_note;
mod therapist;

use chrono::NaiveDateTime;
use rusqlite::types::ToSql;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::PageRequest;

pub use appointment::*;
pub use audit::*;
pub use intake::*;
pub use patient::*;
pub use self_assessment::*;
pub use soap_note::*;
pub use therapist::*;

pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn fmt_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_datetime(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid datetime '{s}': {e}")))
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid uuid '{s}': {e}")))
}

/// Run a COUNT + LIMIT/OFFSET pair for one page of results.
///
/// `select_sql` must end with `LIMIT ? OFFSET ?` and use unnumbered `?`
/// placeholders throughout so the page bounds can be appended to `params`.
pub(crate) fn paged_query<T, F>(
    conn: &Connection,
    count_sql: &str,
    select_sql: &str,
    params: &[&dyn ToSql],
    page: PageRequest,
    map_row: F,
) -> Result<(Vec<T>, i64), DatabaseError>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let total: i64 = conn.query_row(count_sql, params, |row| row.get(0))?;

    let limit = page.limit();
    let offset = page.offset();
    let mut select_params: Vec<&dyn ToSql> = params.to_vec();
    select_params.push(&limit);
    select_params.push(&offset);

    let mut stmt = conn.prepare(select_sql)?;
    let rows = stmt.query_map(select_params.as_slice(), map_row)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok((items, total))
}
