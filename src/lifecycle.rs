//! Generic active-entity lifecycle — soft-delete CRUD with audit coupling.
//!
//! Patient, Therapist, IntakeForm, SoapNote, and SelfAssessment all share
//! the same contract: create assigns an id and an active flag, reads apply
//! the active filter, updates are partial patches, deletes flip the flag,
//! and every mutation commits exactly one audit entry in the same
//! transaction. The contract is factored here once; the per-entity SQL
//! lives in `db::repository` behind the [`ActiveEntity`] trait.
//!
//! Appointments have their own manager in [`crate::scheduling`] because
//! creation there runs the conflict check first.

use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::audit;
use crate::db::DatabaseError;
use crate::error::ServiceError;
use crate::models::{AuditAction, EntityKind, Page, PageRequest};

/// Storage and patch hooks one entity kind must provide.
///
/// Mutating hooks are always invoked inside a transaction owned by the
/// generic operations below; implementations must not commit.
pub trait ActiveEntity: Sized {
    /// Partial update; absent fields leave stored values untouched.
    type Patch;

    const KIND: EntityKind;

    fn id(&self) -> Uuid;

    fn insert(conn: &Connection, entity: &Self) -> Result<(), DatabaseError>;

    /// Lookup with the active filter applied; `None` for absent or
    /// soft-deleted rows alike.
    fn fetch_active(conn: &Connection, id: &Uuid) -> Result<Option<Self>, DatabaseError>;

    fn update_row(conn: &Connection, entity: &Self) -> Result<(), DatabaseError>;

    /// Flip active to false. Returns the number of rows changed (0 when the
    /// id is absent or already inactive).
    fn deactivate(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError>;

    fn search_page(
        conn: &Connection,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Self>, DatabaseError>;

    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Entity-specific patch precondition (e.g. the last-admin rule).
    fn validate_patch(
        _conn: &Connection,
        _current: &Self,
        _patch: &Self::Patch,
    ) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Persist a new entity and its CREATE audit entry atomically.
pub fn create<E: ActiveEntity>(
    conn: &mut Connection,
    principal: Option<&str>,
    entity: E,
) -> Result<E, ServiceError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    E::insert(&tx, &entity)?;
    audit::record(&tx, principal, AuditAction::Create, E::KIND, &entity.id())?;
    tx.commit()?;
    tracing::debug!(kind = E::KIND.as_str(), id = %entity.id(), "entity created");
    Ok(entity)
}

/// Apply a partial patch and its UPDATE audit entry atomically.
///
/// The read-check-mutate-persist sequence runs in one IMMEDIATE transaction
/// so two concurrent updates cannot interleave into a lost update.
pub fn update<E: ActiveEntity>(
    conn: &mut Connection,
    principal: Option<&str>,
    id: &Uuid,
    patch: &E::Patch,
) -> Result<E, ServiceError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut entity =
        E::fetch_active(&tx, id)?.ok_or(ServiceError::NotFound { kind: E::KIND, id: *id })?;
    E::validate_patch(&tx, &entity, patch)?;
    entity.apply_patch(patch);
    E::update_row(&tx, &entity)?;
    audit::record(&tx, principal, AuditAction::Update, E::KIND, id)?;
    tx.commit()?;
    tracing::debug!(kind = E::KIND.as_str(), id = %id, "entity updated");
    Ok(entity)
}

/// Active-filtered lookup; absent and soft-deleted ids are both NotFound.
pub fn find_by_id<E: ActiveEntity>(conn: &Connection, id: &Uuid) -> Result<E, ServiceError> {
    E::fetch_active(conn, id)?.ok_or(ServiceError::NotFound { kind: E::KIND, id: *id })
}

/// One page of active rows. A blank or absent search text lists everything
/// in insertion order; otherwise a case-insensitive substring match runs
/// over the entity's name-like fields.
pub fn find_active<E: ActiveEntity>(
    conn: &Connection,
    search: Option<&str>,
    page: PageRequest,
) -> Result<Page<E>, ServiceError> {
    let search = search.map(str::trim).filter(|q| !q.is_empty());
    Ok(E::search_page(conn, search, page)?)
}

/// Soft-delete and its DELETE audit entry atomically. Deleting an absent or
/// already-inactive id fails NotFound, so at most one DELETE entry can ever
/// exist per id.
pub fn delete<E: ActiveEntity>(
    conn: &mut Connection,
    principal: Option<&str>,
    id: &Uuid,
) -> Result<(), ServiceError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let deactivated = E::deactivate(&tx, id)?;
    if deactivated == 0 {
        return Err(ServiceError::NotFound { kind: E::KIND, id: *id });
    }
    audit::record(&tx, principal, AuditAction::Delete, E::KIND, id)?;
    tx.commit()?;
    tracing::debug!(kind = E::KIND.as_str(), id = %id, "entity soft-deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository;
    use crate::db::sqlite::open_memory_database;
    use crate::models::*;

    fn test_db() -> Connection {
        open_memory_database().expect("in-memory DB")
    }

    fn make_patient(conn: &mut Connection, first: &str, last: &str) -> Patient {
        create(conn, Some("tester"), Patient::new(first, last)).unwrap()
    }

    // ───────────────────────────────────────
    // create / find_by_id
    // ───────────────────────────────────────

    #[test]
    fn create_persists_and_audits_once() {
        let mut conn = test_db();
        let saved = make_patient(&mut conn, "Maya", "Rao");
        assert!(saved.active);

        let found: Patient = find_by_id(&conn, &saved.id).unwrap();
        assert_eq!(found.first_name, "Maya");

        let trail = crate::audit::entries_for(&conn, EntityKind::Patient, &saved.id).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::Create);
        assert_eq!(trail[0].principal, "tester");
    }

    #[test]
    fn find_by_id_unknown_is_not_found() {
        let conn = test_db();
        let result: Result<Patient, _> = find_by_id(&conn, &uuid::Uuid::new_v4());
        assert!(matches!(result, Err(ServiceError::NotFound { kind: EntityKind::Patient, .. })));
    }

    // ───────────────────────────────────────
    // update — partial patch semantics
    // ───────────────────────────────────────

    #[test]
    fn update_applies_only_present_fields() {
        let mut conn = test_db();
        let mut p = Patient::new("Maya", "Rao");
        p.email = Some("maya@example.com".into());
        let saved = create(&mut conn, Some("tester"), p).unwrap();

        let patch = PatientPatch {
            last_name: Some("Rao-Iyer".into()),
            ..Default::default()
        };
        let updated: Patient = update(&mut conn, Some("tester"), &saved.id, &patch).unwrap();

        assert_eq!(updated.last_name, "Rao-Iyer");
        // untouched fields survive
        assert_eq!(updated.first_name, "Maya");
        assert_eq!(updated.email.as_deref(), Some("maya@example.com"));

        let trail = crate::audit::entries_for(&conn, EntityKind::Patient, &saved.id).unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[1].action, AuditAction::Update);
    }

    #[test]
    fn update_inactive_is_not_found() {
        let mut conn = test_db();
        let saved = make_patient(&mut conn, "Maya", "Rao");
        delete::<Patient>(&mut conn, Some("tester"), &saved.id).unwrap();

        let patch = PatientPatch { first_name: Some("M".into()), ..Default::default() };
        let result: Result<Patient, _> = update(&mut conn, Some("tester"), &saved.id, &patch);
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[test]
    fn failed_update_leaves_no_audit_entry() {
        let mut conn = test_db();
        let saved = make_patient(&mut conn, "Maya", "Rao");
        delete::<Patient>(&mut conn, Some("tester"), &saved.id).unwrap();
        let before = crate::audit::entries_for(&conn, EntityKind::Patient, &saved.id)
            .unwrap()
            .len();

        let patch = PatientPatch { first_name: Some("M".into()), ..Default::default() };
        let _ = update::<Patient>(&mut conn, Some("tester"), &saved.id, &patch);

        let after = crate::audit::entries_for(&conn, EntityKind::Patient, &saved.id)
            .unwrap()
            .len();
        assert_eq!(before, after);
    }

    // ───────────────────────────────────────
    // delete — soft delete + active filter
    // ───────────────────────────────────────

    #[test]
    fn delete_hides_entity_but_keeps_row() {
        let mut conn = test_db();
        let saved = make_patient(&mut conn, "Maya", "Rao");
        delete::<Patient>(&mut conn, Some("tester"), &saved.id).unwrap();

        let result: Result<Patient, _> = find_by_id(&conn, &saved.id);
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));

        // row still present in storage, only the flag flipped
        let (count, active): (i64, i32) = conn
            .query_row(
                "SELECT COUNT(*), MAX(active) FROM patients WHERE id = ?1",
                rusqlite::params![saved.id.to_string()],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(active, 0);
    }

    #[test]
    fn delete_twice_is_not_found_and_logs_once() {
        let mut conn = test_db();
        let saved = make_patient(&mut conn, "Maya", "Rao");
        delete::<Patient>(&mut conn, Some("tester"), &saved.id).unwrap();

        let second = delete::<Patient>(&mut conn, Some("tester"), &saved.id);
        assert!(matches!(second, Err(ServiceError::NotFound { .. })));

        let deletes = crate::audit::entries_for(&conn, EntityKind::Patient, &saved.id)
            .unwrap()
            .iter()
            .filter(|e| e.action == AuditAction::Delete)
            .count();
        assert_eq!(deletes, 1);
    }

    // ───────────────────────────────────────
    // find_active — search + pagination
    // ───────────────────────────────────────

    #[test]
    fn find_active_excludes_deleted() {
        let mut conn = test_db();
        let a = make_patient(&mut conn, "Maya", "Rao");
        make_patient(&mut conn, "Dev", "Patel");
        delete::<Patient>(&mut conn, Some("tester"), &a.id).unwrap();

        let page: Page<Patient> = find_active(&conn, None, PageRequest::default()).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].first_name, "Dev");
        assert_eq!(page.total_items, 1);
    }

    #[test]
    fn find_active_blank_search_lists_all() {
        let mut conn = test_db();
        make_patient(&mut conn, "Maya", "Rao");
        make_patient(&mut conn, "Dev", "Patel");

        let page: Page<Patient> = find_active(&conn, Some("   "), PageRequest::default()).unwrap();
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn find_active_search_is_case_insensitive_substring() {
        let mut conn = test_db();
        make_patient(&mut conn, "Maya", "Rao");
        make_patient(&mut conn, "Dev", "Patel");
        make_patient(&mut conn, "Amara", "Osei");

        let page: Page<Patient> = find_active(&conn, Some("RA"), PageRequest::default()).unwrap();
        // "RA" matches Rao (last) and Amara (first)
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn find_active_pages_are_sliced_with_metadata() {
        let mut conn = test_db();
        for i in 0..5 {
            make_patient(&mut conn, &format!("P{i}"), "Shared");
        }

        let first: Page<Patient> = find_active(&conn, None, PageRequest::new(0, 2)).unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].first_name, "P0");
        assert_eq!(first.total_items, 5);
        assert_eq!(first.total_pages, 3);

        let last: Page<Patient> = find_active(&conn, None, PageRequest::new(2, 2)).unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].first_name, "P4");
    }

    #[test]
    fn find_active_joins_match_on_patient_name() {
        let mut conn = test_db();
        let patient = make_patient(&mut conn, "Maya", "Rao");
        let other = make_patient(&mut conn, "Dev", "Patel");
        let therapist = create(
            &mut conn,
            Some("tester"),
            Therapist::new("Ana", "Lopez", "alopez", TherapistRole::Admin),
        )
        .unwrap();

        create(&mut conn, Some("tester"), IntakeForm::new(patient.id)).unwrap();
        create(&mut conn, Some("tester"), SoapNote::new(patient.id)).unwrap();
        create(
            &mut conn,
            Some("tester"),
            SelfAssessment::new(patient.id, therapist.id),
        )
        .unwrap();
        create(&mut conn, Some("tester"), IntakeForm::new(other.id)).unwrap();

        // case-insensitive substring of the owning patient's last name
        let intakes: Page<IntakeForm> =
            find_active(&conn, Some("rao"), PageRequest::default()).unwrap();
        assert_eq!(intakes.items.len(), 1);
        assert_eq!(intakes.items[0].patient_id, patient.id);
        assert_eq!(intakes.total_items, 1);

        // first name matches too
        let notes: Page<SoapNote> =
            find_active(&conn, Some("MAY"), PageRequest::default()).unwrap();
        assert_eq!(notes.items.len(), 1);
        assert_eq!(notes.items[0].patient_id, patient.id);

        let assessments: Page<SelfAssessment> =
            find_active(&conn, Some("rao"), PageRequest::default()).unwrap();
        assert_eq!(assessments.items.len(), 1);
        assert_eq!(assessments.items[0].patient_id, patient.id);

        // a name nobody has matches nothing
        let empty: Page<SoapNote> =
            find_active(&conn, Some("zzz"), PageRequest::default()).unwrap();
        assert!(empty.items.is_empty());
        assert_eq!(empty.total_items, 0);
    }

    // ───────────────────────────────────────
    // therapist specifics — last-admin rule
    // ───────────────────────────────────────

    #[test]
    fn demoting_last_admin_is_rejected() {
        let mut conn = test_db();
        let admin = create(
            &mut conn,
            Some("tester"),
            Therapist::new("Ana", "Lopez", "alopez", TherapistRole::Admin),
        )
        .unwrap();

        let patch = TherapistPatch {
            role: Some(TherapistRole::Therapist),
            ..Default::default()
        };
        let result: Result<Therapist, _> = update(&mut conn, Some("tester"), &admin.id, &patch);
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        // still an admin, and the failed attempt was not audited
        let unchanged: Therapist = find_by_id(&conn, &admin.id).unwrap();
        assert_eq!(unchanged.role, TherapistRole::Admin);
        let trail = crate::audit::entries_for(&conn, EntityKind::Therapist, &admin.id).unwrap();
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn demoting_admin_allowed_when_another_remains() {
        let mut conn = test_db();
        let first = create(
            &mut conn,
            Some("tester"),
            Therapist::new("Ana", "Lopez", "alopez", TherapistRole::Admin),
        )
        .unwrap();
        create(
            &mut conn,
            Some("tester"),
            Therapist::new("Ben", "Kim", "bkim", TherapistRole::Admin),
        )
        .unwrap();

        let patch = TherapistPatch {
            role: Some(TherapistRole::Therapist),
            ..Default::default()
        };
        let updated: Therapist = update(&mut conn, Some("tester"), &first.id, &patch).unwrap();
        assert_eq!(updated.role, TherapistRole::Therapist);
    }

    // ───────────────────────────────────────
    // intake specifics — latest per patient
    // ───────────────────────────────────────

    #[test]
    fn latest_intake_skips_deleted_forms() {
        let mut conn = test_db();
        let patient = make_patient(&mut conn, "Maya", "Rao");

        let older = create(&mut conn, Some("tester"), IntakeForm::new(patient.id)).unwrap();
        let newer = create(&mut conn, Some("tester"), IntakeForm::new(patient.id)).unwrap();

        let latest = repository::latest_intake_for_patient(&conn, &patient.id)
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, newer.id);

        delete::<IntakeForm>(&mut conn, Some("tester"), &newer.id).unwrap();
        let latest = repository::latest_intake_for_patient(&conn, &patient.id)
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, older.id);
    }

    // ───────────────────────────────────────
    // audit pairing across entity kinds
    // ───────────────────────────────────────

    #[test]
    fn every_mutation_audits_exactly_once_per_kind() {
        let mut conn = test_db();
        let patient = make_patient(&mut conn, "Maya", "Rao");
        let therapist = create(
            &mut conn,
            Some("tester"),
            Therapist::new("Ana", "Lopez", "alopez", TherapistRole::Admin),
        )
        .unwrap();

        let note = create(&mut conn, Some("tester"), SoapNote::new(patient.id)).unwrap();
        let patch = SoapNotePatch { quick_notes: Some("good session".into()), ..Default::default() };
        update::<SoapNote>(&mut conn, Some("tester"), &note.id, &patch).unwrap();
        delete::<SoapNote>(&mut conn, Some("tester"), &note.id).unwrap();

        let assessment = create(
            &mut conn,
            Some("tester"),
            SelfAssessment::new(patient.id, therapist.id),
        )
        .unwrap();

        let note_trail = crate::audit::entries_for(&conn, EntityKind::SoapNote, &note.id).unwrap();
        let actions: Vec<_> = note_trail.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::Create, AuditAction::Update, AuditAction::Delete]
        );

        let assessment_trail =
            crate::audit::entries_for(&conn, EntityKind::SelfAssessment, &assessment.id).unwrap();
        assert_eq!(assessment_trail.len(), 1);
        assert_eq!(assessment_trail[0].action, AuditAction::Create);
    }
}
