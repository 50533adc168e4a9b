//! Appointment scheduling — conflict detection and lifecycle.
//!
//! Slots are half-open intervals `[start, end)` so back-to-back bookings
//! never conflict. The no-overlap invariant holds independently for the
//! therapist and the patient, over *active* appointments only; a cancelled
//! slot may be rebooked freely. A cancelled appointment is terminal —
//! rescheduling is cancel + recreate.

use chrono::{Duration, NaiveDateTime};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit;
use crate::db::repository;
use crate::error::ServiceError;
use crate::models::{
    Appointment, AuditAction, EntityKind, ParticipantKind, DEFAULT_DURATION_MINUTES,
    MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
};

/// Request to book a slot with a therapist for a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub therapist_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: NaiveDateTime,
    /// Defaults to 60 when absent; must fall in [15, 480].
    pub duration_minutes: Option<i64>,
    pub notes: Option<String>,
}

/// Read-only predicate: does `[start, end)` overlap any of this
/// participant's active appointments?
pub fn has_overlap(
    conn: &Connection,
    kind: ParticipantKind,
    participant_id: &Uuid,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> Result<bool, ServiceError> {
    Ok(repository::exists_participant_overlap(conn, kind, participant_id, start, end)?)
}

/// Book an appointment.
///
/// Both participants must exist, and neither may have an active overlapping
/// appointment — the therapist's calendar is checked before the patient's,
/// so when both conflict the therapist conflict is the one reported. The
/// existence checks, the overlap scans, the insert, and the CREATE audit
/// entry all run in one IMMEDIATE transaction: the write lock is taken
/// before the scan, so a concurrent create cannot invalidate the result
/// between check and insert.
pub fn create_appointment(
    conn: &mut Connection,
    principal: Option<&str>,
    req: &ScheduleRequest,
) -> Result<Appointment, ServiceError> {
    let duration = req.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
        return Err(ServiceError::Validation(format!(
            "durationMinutes must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES}, got {duration}"
        )));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if repository::fetch_active_therapist(&tx, &req.therapist_id)?.is_none() {
        return Err(ServiceError::Validation(format!(
            "Therapist not found: {}",
            req.therapist_id
        )));
    }
    if repository::fetch_active_patient(&tx, &req.patient_id)?.is_none() {
        return Err(ServiceError::Validation(format!(
            "Patient not found: {}",
            req.patient_id
        )));
    }

    let start = req.start_time;
    let end = start + Duration::minutes(duration);

    if repository::exists_participant_overlap(
        &tx,
        ParticipantKind::Therapist,
        &req.therapist_id,
        &start,
        &end,
    )? {
        return Err(ServiceError::Conflict("Therapist time conflict".into()));
    }
    if repository::exists_participant_overlap(
        &tx,
        ParticipantKind::Patient,
        &req.patient_id,
        &start,
        &end,
    )? {
        return Err(ServiceError::Conflict("Patient time conflict".into()));
    }

    let appointment = Appointment {
        id: Uuid::new_v4(),
        therapist_id: req.therapist_id,
        patient_id: req.patient_id,
        start_time: start,
        duration_minutes: duration,
        notes: req.notes.clone(),
        active: true,
    };
    repository::insert_appointment(&tx, &appointment)?;
    audit::record(
        &tx,
        principal,
        AuditAction::Create,
        EntityKind::Appointment,
        &appointment.id,
    )?;
    tx.commit()?;

    tracing::info!(
        id = %appointment.id,
        therapist = %appointment.therapist_id,
        patient = %appointment.patient_id,
        start = %appointment.start_time,
        "appointment booked"
    );
    Ok(appointment)
}

/// Active appointments for one participant with start in `[from, to]`,
/// ascending by start time.
pub fn list_by_participant(
    conn: &Connection,
    kind: ParticipantKind,
    participant_id: &Uuid,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
) -> Result<Vec<Appointment>, ServiceError> {
    Ok(repository::list_appointments_by_participant(
        conn,
        kind,
        participant_id,
        from,
        to,
    )?)
}

/// Active-filtered lookup; a cancelled appointment is NotFound to callers.
pub fn find_appointment(conn: &Connection, id: &Uuid) -> Result<Appointment, ServiceError> {
    repository::fetch_active_appointment(conn, id)?.ok_or(ServiceError::NotFound {
        kind: EntityKind::Appointment,
        id: *id,
    })
}

/// Cancel an appointment: flip active to false and record the DELETE audit
/// entry in the same transaction. Cancelling a cancelled or unknown id
/// fails NotFound.
pub fn cancel_appointment(
    conn: &mut Connection,
    principal: Option<&str>,
    id: &Uuid,
) -> Result<(), ServiceError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let cancelled = repository::deactivate_appointment(&tx, id)?;
    if cancelled == 0 {
        return Err(ServiceError::NotFound { kind: EntityKind::Appointment, id: *id });
    }
    audit::record(&tx, principal, AuditAction::Delete, EntityKind::Appointment, id)?;
    tx.commit()?;
    tracing::info!(id = %id, "appointment cancelled");
    Ok(())
}
