use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{paged_query, parse_uuid};
use crate::db::DatabaseError;
use crate::lifecycle::ActiveEntity;
use crate::models::{EntityKind, Page, PageRequest, SoapNote, SoapNotePatch};

const COLS: &str = "id, patient_id, therapist_id, date_of_session, time_of_session, \
                    session_length, type_of_session, s_notes, o_notes, a_notes, p_notes, \
                    conditions, medications, medication_note, goals, diet, activity_level, \
                    history_of_conditions, quick_notes, age, active";

pub fn insert_soap_note(conn: &Connection, n: &SoapNote) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO soap_notes (id, patient_id, therapist_id, date_of_session, time_of_session,
         session_length, type_of_session, s_notes, o_notes, a_notes, p_notes, conditions,
         medications, medication_note, goals, diet, activity_level, history_of_conditions,
         quick_notes, age, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            n.id.to_string(),
            n.patient_id.to_string(),
            n.therapist_id.map(|id| id.to_string()),
            n.date_of_session.map(|d| d.to_string()),
            n.time_of_session.map(|t| t.format("%H:%M:%S").to_string()),
            n.session_length,
            n.type_of_session,
            n.s_notes,
            n.o_notes,
            n.a_notes,
            n.p_notes,
            n.conditions,
            n.medications,
            n.medication_note,
            n.goals,
            n.diet,
            n.activity_level,
            n.history_of_conditions,
            n.quick_notes,
            n.age,
            n.active as i32,
        ],
    )?;
    Ok(())
}

pub fn fetch_active_soap_note(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<SoapNote>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {COLS} FROM soap_notes WHERE id = ?1 AND active = 1"),
            params![id.to_string()],
            soap_row_from_sql,
        )
        .optional()?;
    row.map(soap_from_row).transpose()
}

pub fn update_soap_note_row(conn: &Connection, n: &SoapNote) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE soap_notes SET date_of_session = ?2, time_of_session = ?3, session_length = ?4,
         type_of_session = ?5, s_notes = ?6, o_notes = ?7, a_notes = ?8, p_notes = ?9,
         conditions = ?10, medications = ?11, medication_note = ?12, goals = ?13, diet = ?14,
         activity_level = ?15, history_of_conditions = ?16, quick_notes = ?17, age = ?18
         WHERE id = ?1",
        params![
            n.id.to_string(),
            n.date_of_session.map(|d| d.to_string()),
            n.time_of_session.map(|t| t.format("%H:%M:%S").to_string()),
            n.session_length,
            n.type_of_session,
            n.s_notes,
            n.o_notes,
            n.a_notes,
            n.p_notes,
            n.conditions,
            n.medications,
            n.medication_note,
            n.goals,
            n.diet,
            n.activity_level,
            n.history_of_conditions,
            n.quick_notes,
            n.age,
        ],
    )?;
    Ok(())
}

pub fn deactivate_soap_note(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE soap_notes SET active = 0 WHERE id = ?1 AND active = 1",
        params![id.to_string()],
    )?;
    Ok(updated)
}

/// Active SOAP notes, insertion order; with a query, case-insensitive
/// substring match over the referenced patient's first/last name.
pub fn search_soap_notes(
    conn: &Connection,
    query: Option<&str>,
    page: PageRequest,
) -> Result<Page<SoapNote>, DatabaseError> {
    let (raw, total) = match query {
        None => paged_query(
            conn,
            "SELECT COUNT(*) FROM soap_notes WHERE active = 1",
            &format!("SELECT {COLS} FROM soap_notes WHERE active = 1 ORDER BY rowid ASC LIMIT ? OFFSET ?"),
            &[],
            page,
            soap_row_from_sql,
        )?,
        Some(q) => {
            let pattern = format!("%{q}%");
            let qualified = COLS
                .split(", ")
                .map(|c| format!("n.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            paged_query(
                conn,
                "SELECT COUNT(*) FROM soap_notes n JOIN patients p ON n.patient_id = p.id
                 WHERE n.active = 1
                 AND (LOWER(p.first_name) LIKE LOWER(?) OR LOWER(p.last_name) LIKE LOWER(?))",
                &format!(
                    "SELECT {qualified} FROM soap_notes n JOIN patients p ON n.patient_id = p.id
                     WHERE n.active = 1
                     AND (LOWER(p.first_name) LIKE LOWER(?) OR LOWER(p.last_name) LIKE LOWER(?))
                     ORDER BY n.rowid ASC LIMIT ? OFFSET ?"
                ),
                &[&pattern as &dyn ToSql, &pattern],
                page,
                soap_row_from_sql,
            )?
        }
    };

    let items = raw
        .into_iter()
        .map(soap_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page::new(items, page, total))
}

impl ActiveEntity for SoapNote {
    type Patch = SoapNotePatch;

    const KIND: EntityKind = EntityKind::SoapNote;

    fn id(&self) -> Uuid {
        self.id
    }

    fn insert(conn: &Connection, entity: &Self) -> Result<(), DatabaseError> {
        insert_soap_note(conn, entity)
    }

    fn fetch_active(conn: &Connection, id: &Uuid) -> Result<Option<Self>, DatabaseError> {
        fetch_active_soap_note(conn, id)
    }

    fn update_row(conn: &Connection, entity: &Self) -> Result<(), DatabaseError> {
        update_soap_note_row(conn, entity)
    }

    fn deactivate(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
        deactivate_soap_note(conn, id)
    }

    fn search_page(
        conn: &Connection,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Self>, DatabaseError> {
        search_soap_notes(conn, query, page)
    }

    fn apply_patch(&mut self, patch: &SoapNotePatch) {
        if let Some(v) = patch.date_of_session {
            self.date_of_session = Some(v);
        }
        if let Some(v) = patch.time_of_session {
            self.time_of_session = Some(v);
        }
        if let Some(v) = &patch.session_length {
            self.session_length = Some(v.clone());
        }
        if let Some(v) = &patch.type_of_session {
            self.type_of_session = Some(v.clone());
        }
        if let Some(v) = &patch.s_notes {
            self.s_notes = Some(v.clone());
        }
        if let Some(v) = &patch.o_notes {
            self.o_notes = Some(v.clone());
        }
        if let Some(v) = &patch.a_notes {
            self.a_notes = Some(v.clone());
        }
        if let Some(v) = &patch.p_notes {
            self.p_notes = Some(v.clone());
        }
        if let Some(v) = &patch.conditions {
            self.conditions = Some(v.clone());
        }
        if let Some(v) = &patch.medications {
            self.medications = Some(v.clone());
        }
        if let Some(v) = &patch.medication_note {
            self.medication_note = Some(v.clone());
        }
        if let Some(v) = &patch.goals {
            self.goals = Some(v.clone());
        }
        if let Some(v) = &patch.diet {
            self.diet = Some(v.clone());
        }
        if let Some(v) = &patch.activity_level {
            self.activity_level = Some(v.clone());
        }
        if let Some(v) = &patch.history_of_conditions {
            self.history_of_conditions = Some(v.clone());
        }
        if let Some(v) = &patch.quick_notes {
            self.quick_notes = Some(v.clone());
        }
        if let Some(v) = patch.age {
            self.age = Some(v);
        }
    }
}

// Internal row type for SoapNote mapping
struct SoapRow {
    id: String,
    patient_id: String,
    therapist_id: Option<String>,
    date_of_session: Option<String>,
    time_of_session: Option<String>,
    session_length: Option<String>,
    type_of_session: Option<String>,
    s_notes: Option<String>,
    o_notes: Option<String>,
    a_notes: Option<String>,
    p_notes: Option<String>,
    conditions: Option<String>,
    medications: Option<String>,
    medication_note: Option<String>,
    goals: Option<String>,
    diet: Option<String>,
    activity_level: Option<String>,
    history_of_conditions: Option<String>,
    quick_notes: Option<String>,
    age: Option<i64>,
    active: i32,
}

fn soap_row_from_sql(row: &Row<'_>) -> rusqlite::Result<SoapRow> {
    Ok(SoapRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        therapist_id: row.get(2)?,
        date_of_session: row.get(3)?,
        time_of_session: row.get(4)?,
        session_length: row.get(5)?,
        type_of_session: row.get(6)?,
        s_notes: row.get(7)?,
        o_notes: row.get(8)?,
        a_notes: row.get(9)?,
        p_notes: row.get(10)?,
        conditions: row.get(11)?,
        medications: row.get(12)?,
        medication_note: row.get(13)?,
        goals: row.get(14)?,
        diet: row.get(15)?,
        activity_level: row.get(16)?,
        history_of_conditions: row.get(17)?,
        quick_notes: row.get(18)?,
        age: row.get(19)?,
        active: row.get(20)?,
    })
}

fn soap_from_row(row: SoapRow) -> Result<SoapNote, DatabaseError> {
    Ok(SoapNote {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        therapist_id: match row.therapist_id {
            Some(s) => Some(parse_uuid(&s)?),
            None => None,
        },
        date_of_session: row
            .date_of_session
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        time_of_session: row
            .time_of_session
            .and_then(|t| NaiveTime::parse_from_str(&t, "%H:%M:%S").ok()),
        session_length: row.session_length,
        type_of_session: row.type_of_session,
        s_notes: row.s_notes,
        o_notes: row.o_notes,
        a_notes: row.a_notes,
        p_notes: row.p_notes,
        conditions: row.conditions,
        medications: row.medications,
        medication_note: row.medication_note,
        goals: row.goals,
        diet: row.diet,
        activity_level: row.activity_level,
        history_of_conditions: row.history_of_conditions,
        quick_notes: row.quick_notes,
        age: row.age,
        active: row.active != 0,
    })
}
