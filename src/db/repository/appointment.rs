use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Appointment, ParticipantKind};

const COLS: &str = "id, therapist_id, patient_id, start_time, duration_minutes, notes, active";

fn participant_column(kind: ParticipantKind) -> &'static str {
    match kind {
        ParticipantKind::Therapist => "therapist_id",
        ParticipantKind::Patient => "patient_id",
    }
}

pub fn insert_appointment(conn: &Connection, a: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, therapist_id, patient_id, start_time, duration_minutes, notes, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            a.id.to_string(),
            a.therapist_id.to_string(),
            a.patient_id.to_string(),
            fmt_datetime(&a.start_time),
            a.duration_minutes,
            a.notes,
            a.active as i32,
        ],
    )?;
    Ok(())
}

pub fn fetch_active_appointment(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {COLS} FROM appointments WHERE id = ?1 AND active = 1"),
            params![id.to_string()],
            appointment_row_from_sql,
        )
        .optional()?;
    row.map(appointment_from_row).transpose()
}

pub fn deactivate_appointment(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET active = 0 WHERE id = ?1 AND active = 1",
        params![id.to_string()],
    )?;
    Ok(updated)
}

/// Half-open overlap scan over one participant's *active* appointments:
/// `existing.start < candidate.end AND existing.end > candidate.start`.
/// Boundary equality (back-to-back slots) is not an overlap. The stored
/// `end` is derived in SQL from start_time + duration_minutes.
pub fn exists_participant_overlap(
    conn: &Connection,
    kind: ParticipantKind,
    participant_id: &Uuid,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let sql = format!(
        "SELECT EXISTS(
           SELECT 1 FROM appointments
           WHERE {} = ?1
             AND active = 1
             AND start_time < ?3
             AND datetime(start_time, '+' || duration_minutes || ' minutes') > ?2)",
        participant_column(kind)
    );
    let found: bool = conn.query_row(
        &sql,
        params![participant_id.to_string(), fmt_datetime(start), fmt_datetime(end)],
        |row| row.get(0),
    )?;
    Ok(found)
}

/// Active appointments for one participant with start_time in `[from, to]`,
/// ascending by start_time.
pub fn list_appointments_by_participant(
    conn: &Connection,
    kind: ParticipantKind,
    participant_id: &Uuid,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
) -> Result<Vec<Appointment>, DatabaseError> {
    let sql = format!(
        "SELECT {COLS} FROM appointments
         WHERE {} = ?1 AND active = 1 AND start_time BETWEEN ?2 AND ?3
         ORDER BY start_time ASC",
        participant_column(kind)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![participant_id.to_string(), fmt_datetime(from), fmt_datetime(to)],
        appointment_row_from_sql,
    )?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row?)?);
    }
    Ok(appointments)
}

// Internal row type for Appointment mapping
struct AppointmentRow {
    id: String,
    therapist_id: String,
    patient_id: String,
    start_time: String,
    duration_minutes: i64,
    notes: Option<String>,
    active: i32,
}

fn appointment_row_from_sql(row: &Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        therapist_id: row.get(1)?,
        patient_id: row.get(2)?,
        start_time: row.get(3)?,
        duration_minutes: row.get(4)?,
        notes: row.get(5)?,
        active: row.get(6)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        therapist_id: parse_uuid(&row.therapist_id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        start_time: parse_datetime(&row.start_time)?,
        duration_minutes: row.duration_minutes,
        notes: row.notes,
        active: row.active != 0,
    })
}
