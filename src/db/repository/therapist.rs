use std::str::FromStr;

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{paged_query, parse_uuid};
use crate::db::DatabaseError;
use crate::error::ServiceError;
use crate::lifecycle::ActiveEntity;
use crate::models::{EntityKind, Page, PageRequest, Therapist, TherapistPatch, TherapistRole};

const COLS: &str = "id, first_name, last_name, username, email, phone_number, role, active";

pub fn insert_therapist(conn: &Connection, t: &Therapist) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO therapists (id, first_name, last_name, username, email, phone_number, role, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            t.id.to_string(),
            t.first_name,
            t.last_name,
            t.username,
            t.email,
            t.phone_number,
            t.role.as_str(),
            t.active as i32,
        ],
    )?;
    Ok(())
}

pub fn fetch_active_therapist(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Therapist>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {COLS} FROM therapists WHERE id = ?1 AND active = 1"),
            params![id.to_string()],
            therapist_row_from_sql,
        )
        .optional()?;
    row.map(therapist_from_row).transpose()
}

pub fn update_therapist_row(conn: &Connection, t: &Therapist) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE therapists SET first_name = ?2, last_name = ?3, email = ?4, phone_number = ?5,
         role = ?6 WHERE id = ?1",
        params![
            t.id.to_string(),
            t.first_name,
            t.last_name,
            t.email,
            t.phone_number,
            t.role.as_str(),
        ],
    )?;
    Ok(())
}

pub fn deactivate_therapist(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE therapists SET active = 0 WHERE id = ?1 AND active = 1",
        params![id.to_string()],
    )?;
    Ok(updated)
}

/// Admin head-count among active therapists; guards against demoting the
/// last remaining admin.
pub fn count_active_admins(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM therapists WHERE role = ?1 AND active = 1",
        params![TherapistRole::Admin.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Active therapists, insertion order; with a query, case-insensitive
/// substring match over first/last name.
pub fn search_therapists(
    conn: &Connection,
    query: Option<&str>,
    page: PageRequest,
) -> Result<Page<Therapist>, DatabaseError> {
    let (raw, total) = match query {
        None => paged_query(
            conn,
            "SELECT COUNT(*) FROM therapists WHERE active = 1",
            &format!("SELECT {COLS} FROM therapists WHERE active = 1 ORDER BY rowid ASC LIMIT ? OFFSET ?"),
            &[],
            page,
            therapist_row_from_sql,
        )?,
        Some(q) => {
            let pattern = format!("%{q}%");
            paged_query(
                conn,
                "SELECT COUNT(*) FROM therapists WHERE active = 1
                 AND (LOWER(first_name) LIKE LOWER(?) OR LOWER(last_name) LIKE LOWER(?))",
                &format!(
                    "SELECT {COLS} FROM therapists WHERE active = 1
                     AND (LOWER(first_name) LIKE LOWER(?) OR LOWER(last_name) LIKE LOWER(?))
                     ORDER BY rowid ASC LIMIT ? OFFSET ?"
                ),
                &[&pattern as &dyn ToSql, &pattern],
                page,
                therapist_row_from_sql,
            )?
        }
    };

    let items = raw
        .into_iter()
        .map(therapist_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page::new(items, page, total))
}

impl ActiveEntity for Therapist {
    type Patch = TherapistPatch;

    const KIND: EntityKind = EntityKind::Therapist;

    fn id(&self) -> Uuid {
        self.id
    }

    fn insert(conn: &Connection, entity: &Self) -> Result<(), DatabaseError> {
        insert_therapist(conn, entity)
    }

    fn fetch_active(conn: &Connection, id: &Uuid) -> Result<Option<Self>, DatabaseError> {
        fetch_active_therapist(conn, id)
    }

    fn update_row(conn: &Connection, entity: &Self) -> Result<(), DatabaseError> {
        update_therapist_row(conn, entity)
    }

    fn deactivate(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
        deactivate_therapist(conn, id)
    }

    fn search_page(
        conn: &Connection,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Self>, DatabaseError> {
        search_therapists(conn, query, page)
    }

    fn apply_patch(&mut self, patch: &TherapistPatch) {
        if let Some(v) = &patch.first_name {
            self.first_name = v.clone();
        }
        if let Some(v) = &patch.last_name {
            self.last_name = v.clone();
        }
        if let Some(v) = &patch.email {
            self.email = Some(v.clone());
        }
        if let Some(v) = &patch.phone_number {
            self.phone_number = Some(v.clone());
        }
        if let Some(v) = patch.role {
            self.role = v;
        }
    }

    /// The practice must keep at least one active admin account.
    fn validate_patch(
        conn: &Connection,
        current: &Self,
        patch: &TherapistPatch,
    ) -> Result<(), ServiceError> {
        let demotes_admin = current.role == TherapistRole::Admin
            && matches!(patch.role, Some(TherapistRole::Therapist));
        if demotes_admin && count_active_admins(conn)? <= 1 {
            return Err(ServiceError::Validation(
                "At least one admin must remain".into(),
            ));
        }
        Ok(())
    }
}

// Internal row type for Therapist mapping
struct TherapistRow {
    id: String,
    first_name: String,
    last_name: String,
    username: String,
    email: Option<String>,
    phone_number: Option<String>,
    role: String,
    active: i32,
}

fn therapist_row_from_sql(row: &Row<'_>) -> rusqlite::Result<TherapistRow> {
    Ok(TherapistRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        username: row.get(3)?,
        email: row.get(4)?,
        phone_number: row.get(5)?,
        role: row.get(6)?,
        active: row.get(7)?,
    })
}

fn therapist_from_row(row: TherapistRow) -> Result<Therapist, DatabaseError> {
    Ok(Therapist {
        id: parse_uuid(&row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        username: row.username,
        email: row.email,
        phone_number: row.phone_number,
        role: TherapistRole::from_str(&row.role)?,
        active: row.active != 0,
    })
}
