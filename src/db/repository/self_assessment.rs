use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{paged_query, parse_uuid};
use crate::db::DatabaseError;
use crate::lifecycle::ActiveEntity;
use crate::models::{EntityKind, Page, PageRequest, SelfAssessment, SelfAssessmentPatch};

const COLS: &str = "id, patient_id, therapist_id, date_of_session, goal_of_session, assessment, notes, active";

pub fn insert_self_assessment(conn: &Connection, a: &SelfAssessment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO self_assessments (id, patient_id, therapist_id, date_of_session,
         goal_of_session, assessment, notes, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            a.id.to_string(),
            a.patient_id.to_string(),
            a.therapist_id.to_string(),
            a.date_of_session.map(|d| d.to_string()),
            a.goal_of_session,
            a.assessment,
            a.notes,
            a.active as i32,
        ],
    )?;
    Ok(())
}

pub fn fetch_active_self_assessment(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<SelfAssessment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {COLS} FROM self_assessments WHERE id = ?1 AND active = 1"),
            params![id.to_string()],
            assessment_row_from_sql,
        )
        .optional()?;
    row.map(assessment_from_row).transpose()
}

pub fn update_self_assessment_row(
    conn: &Connection,
    a: &SelfAssessment,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE self_assessments SET date_of_session = ?2, goal_of_session = ?3,
         assessment = ?4, notes = ?5 WHERE id = ?1",
        params![
            a.id.to_string(),
            a.date_of_session.map(|d| d.to_string()),
            a.goal_of_session,
            a.assessment,
            a.notes,
        ],
    )?;
    Ok(())
}

pub fn deactivate_self_assessment(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE self_assessments SET active = 0 WHERE id = ?1 AND active = 1",
        params![id.to_string()],
    )?;
    Ok(updated)
}

/// Active self-assessments, insertion order; with a query, case-insensitive
/// substring match over the referenced patient's first/last name.
pub fn search_self_assessments(
    conn: &Connection,
    query: Option<&str>,
    page: PageRequest,
) -> Result<Page<SelfAssessment>, DatabaseError> {
    let (raw, total) = match query {
        None => paged_query(
            conn,
            "SELECT COUNT(*) FROM self_assessments WHERE active = 1",
            &format!("SELECT {COLS} FROM self_assessments WHERE active = 1 ORDER BY rowid ASC LIMIT ? OFFSET ?"),
            &[],
            page,
            assessment_row_from_sql,
        )?,
        Some(q) => {
            let pattern = format!("%{q}%");
            let qualified = COLS
                .split(", ")
                .map(|c| format!("a.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            paged_query(
                conn,
                "SELECT COUNT(*) FROM self_assessments a JOIN patients p ON a.patient_id = p.id
                 WHERE a.active = 1
                 AND (LOWER(p.first_name) LIKE LOWER(?) OR LOWER(p.last_name) LIKE LOWER(?))",
                &format!(
                    "SELECT {qualified} FROM self_assessments a JOIN patients p ON a.patient_id = p.id
                     WHERE a.active = 1
                     AND (LOWER(p.first_name) LIKE LOWER(?) OR LOWER(p.last_name) LIKE LOWER(?))
                     ORDER BY a.rowid ASC LIMIT ? OFFSET ?"
                ),
                &[&pattern as &dyn ToSql, &pattern],
                page,
                assessment_row_from_sql,
            )?
        }
    };

    let items = raw
        .into_iter()
        .map(assessment_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page::new(items, page, total))
}

impl ActiveEntity for SelfAssessment {
    type Patch = SelfAssessmentPatch;

    const KIND: EntityKind = EntityKind::SelfAssessment;

    fn id(&self) -> Uuid {
        self.id
    }

    fn insert(conn: &Connection, entity: &Self) -> Result<(), DatabaseError> {
        insert_self_assessment(conn, entity)
    }

    fn fetch_active(conn: &Connection, id: &Uuid) -> Result<Option<Self>, DatabaseError> {
        fetch_active_self_assessment(conn, id)
    }

    fn update_row(conn: &Connection, entity: &Self) -> Result<(), DatabaseError> {
        update_self_assessment_row(conn, entity)
    }

    fn deactivate(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
        deactivate_self_assessment(conn, id)
    }

    fn search_page(
        conn: &Connection,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Self>, DatabaseError> {
        search_self_assessments(conn, query, page)
    }

    fn apply_patch(&mut self, patch: &SelfAssessmentPatch) {
        if let Some(v) = patch.date_of_session {
            self.date_of_session = Some(v);
        }
        if let Some(v) = &patch.goal_of_session {
            self.goal_of_session = Some(v.clone());
        }
        if let Some(v) = &patch.assessment {
            self.assessment = Some(v.clone());
        }
        if let Some(v) = &patch.notes {
            self.notes = Some(v.clone());
        }
    }
}

// Internal row type for SelfAssessment mapping
struct AssessmentRow {
    id: String,
    patient_id: String,
    therapist_id: String,
    date_of_session: Option<String>,
    goal_of_session: Option<String>,
    assessment: Option<String>,
    notes: Option<String>,
    active: i32,
}

fn assessment_row_from_sql(row: &Row<'_>) -> rusqlite::Result<AssessmentRow> {
    Ok(AssessmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        therapist_id: row.get(2)?,
        date_of_session: row.get(3)?,
        goal_of_session: row.get(4)?,
        assessment: row.get(5)?,
        notes: row.get(6)?,
        active: row.get(7)?,
    })
}

fn assessment_from_row(row: AssessmentRow) -> Result<SelfAssessment, DatabaseError> {
    Ok(SelfAssessment {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        therapist_id: parse_uuid(&row.therapist_id)?,
        date_of_session: row
            .date_of_session
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        goal_of_session: row.goal_of_session,
        assessment: row.assessment,
        notes: row.notes,
        active: row.active != 0,
    })
}
