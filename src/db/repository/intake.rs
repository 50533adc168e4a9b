use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{paged_query, parse_uuid};
use crate::db::DatabaseError;
use crate::lifecycle::ActiveEntity;
use crate::models::{EntityKind, IntakeForm, IntakeFormPatch, Page, PageRequest};

const COLS: &str = "id, patient_id, practiced_yoga_before, yoga_frequency, active";

pub fn insert_intake_form(conn: &Connection, f: &IntakeForm) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO intake_forms (id, patient_id, practiced_yoga_before, yoga_frequency, active)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            f.id.to_string(),
            f.patient_id.to_string(),
            f.practiced_yoga_before.map(|b| b as i32),
            f.yoga_frequency,
            f.active as i32,
        ],
    )?;
    Ok(())
}

pub fn fetch_active_intake_form(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<IntakeForm>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {COLS} FROM intake_forms WHERE id = ?1 AND active = 1"),
            params![id.to_string()],
            intake_row_from_sql,
        )
        .optional()?;
    row.map(intake_from_row).transpose()
}

/// Most recently created active intake form for a patient, if any.
pub fn latest_intake_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<IntakeForm>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COLS} FROM intake_forms
                 WHERE patient_id = ?1 AND active = 1
                 ORDER BY rowid DESC LIMIT 1"
            ),
            params![patient_id.to_string()],
            intake_row_from_sql,
        )
        .optional()?;
    row.map(intake_from_row).transpose()
}

pub fn update_intake_form_row(conn: &Connection, f: &IntakeForm) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE intake_forms SET practiced_yoga_before = ?2, yoga_frequency = ?3 WHERE id = ?1",
        params![
            f.id.to_string(),
            f.practiced_yoga_before.map(|b| b as i32),
            f.yoga_frequency,
        ],
    )?;
    Ok(())
}

pub fn deactivate_intake_form(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE intake_forms SET active = 0 WHERE id = ?1 AND active = 1",
        params![id.to_string()],
    )?;
    Ok(updated)
}

/// Active intake forms, insertion order; with a query, case-insensitive
/// substring match over the referenced patient's first/last name.
pub fn search_intake_forms(
    conn: &Connection,
    query: Option<&str>,
    page: PageRequest,
) -> Result<Page<IntakeForm>, DatabaseError> {
    let (raw, total) = match query {
        None => paged_query(
            conn,
            "SELECT COUNT(*) FROM intake_forms WHERE active = 1",
            &format!("SELECT {COLS} FROM intake_forms WHERE active = 1 ORDER BY rowid ASC LIMIT ? OFFSET ?"),
            &[],
            page,
            intake_row_from_sql,
        )?,
        Some(q) => {
            let pattern = format!("%{q}%");
            paged_query(
                conn,
                "SELECT COUNT(*) FROM intake_forms f JOIN patients p ON f.patient_id = p.id
                 WHERE f.active = 1
                 AND (LOWER(p.first_name) LIKE LOWER(?) OR LOWER(p.last_name) LIKE LOWER(?))",
                "SELECT f.id, f.patient_id, f.practiced_yoga_before, f.yoga_frequency, f.active
                 FROM intake_forms f JOIN patients p ON f.patient_id = p.id
                 WHERE f.active = 1
                 AND (LOWER(p.first_name) LIKE LOWER(?) OR LOWER(p.last_name) LIKE LOWER(?))
                 ORDER BY f.rowid ASC LIMIT ? OFFSET ?",
                &[&pattern as &dyn ToSql, &pattern],
                page,
                intake_row_from_sql,
            )?
        }
    };

    let items = raw
        .into_iter()
        .map(intake_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page::new(items, page, total))
}

impl ActiveEntity for IntakeForm {
    type Patch = IntakeFormPatch;

    const KIND: EntityKind = EntityKind::IntakeForm;

    fn id(&self) -> Uuid {
        self.id
    }

    fn insert(conn: &Connection, entity: &Self) -> Result<(), DatabaseError> {
        insert_intake_form(conn, entity)
    }

    fn fetch_active(conn: &Connection, id: &Uuid) -> Result<Option<Self>, DatabaseError> {
        fetch_active_intake_form(conn, id)
    }

    fn update_row(conn: &Connection, entity: &Self) -> Result<(), DatabaseError> {
        update_intake_form_row(conn, entity)
    }

    fn deactivate(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
        deactivate_intake_form(conn, id)
    }

    fn search_page(
        conn: &Connection,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Self>, DatabaseError> {
        search_intake_forms(conn, query, page)
    }

    fn apply_patch(&mut self, patch: &IntakeFormPatch) {
        if let Some(v) = patch.practiced_yoga_before {
            self.practiced_yoga_before = Some(v);
        }
        if let Some(v) = &patch.yoga_frequency {
            self.yoga_frequency = Some(v.clone());
        }
    }
}

// Internal row type for IntakeForm mapping
struct IntakeRow {
    id: String,
    patient_id: String,
    practiced_yoga_before: Option<i32>,
    yoga_frequency: Option<String>,
    active: i32,
}

fn intake_row_from_sql(row: &Row<'_>) -> rusqlite::Result<IntakeRow> {
    Ok(IntakeRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        practiced_yoga_before: row.get(2)?,
        yoga_frequency: row.get(3)?,
        active: row.get(4)?,
    })
}

fn intake_from_row(row: IntakeRow) -> Result<IntakeForm, DatabaseError> {
    Ok(IntakeForm {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        practiced_yoga_before: row.practiced_yoga_before.map(|v| v != 0),
        yoga_frequency: row.yoga_frequency,
        active: row.active != 0,
    })
}
