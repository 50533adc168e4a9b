use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{paged_query, parse_uuid};
use crate::db::DatabaseError;
use crate::lifecycle::ActiveEntity;
use crate::models::{EntityKind, Page, PageRequest, Patient, PatientPatch};

const COLS: &str = "id, first_name, last_name, date_of_birth, email, address, city, state, \
                    zip_code, home_phone, cell_phone, work_phone, emergency_contact_name, \
                    emergency_contact_phone, referred_by, active";

pub fn insert_patient(conn: &Connection, p: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, date_of_birth, email, address, city,
         state, zip_code, home_phone, cell_phone, work_phone, emergency_contact_name,
         emergency_contact_phone, referred_by, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            p.id.to_string(),
            p.first_name,
            p.last_name,
            p.date_of_birth.map(|d| d.to_string()),
            p.email,
            p.address,
            p.city,
            p.state,
            p.zip_code,
            p.home_phone,
            p.cell_phone,
            p.work_phone,
            p.emergency_contact_name,
            p.emergency_contact_phone,
            p.referred_by,
            p.active as i32,
        ],
    )?;
    Ok(())
}

pub fn fetch_active_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {COLS} FROM patients WHERE id = ?1 AND active = 1"),
            params![id.to_string()],
            patient_row_from_sql,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

pub fn update_patient_row(conn: &Connection, p: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE patients SET first_name = ?2, last_name = ?3, date_of_birth = ?4, email = ?5,
         address = ?6, city = ?7, state = ?8, zip_code = ?9, home_phone = ?10, cell_phone = ?11,
         work_phone = ?12, emergency_contact_name = ?13, emergency_contact_phone = ?14,
         referred_by = ?15 WHERE id = ?1",
        params![
            p.id.to_string(),
            p.first_name,
            p.last_name,
            p.date_of_birth.map(|d| d.to_string()),
            p.email,
            p.address,
            p.city,
            p.state,
            p.zip_code,
            p.home_phone,
            p.cell_phone,
            p.work_phone,
            p.emergency_contact_name,
            p.emergency_contact_phone,
            p.referred_by,
        ],
    )?;
    Ok(())
}

pub fn deactivate_patient(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET active = 0 WHERE id = ?1 AND active = 1",
        params![id.to_string()],
    )?;
    Ok(updated)
}

/// Active patients, insertion order; with a query, case-insensitive substring
/// match over first/last name.
pub fn search_patients(
    conn: &Connection,
    query: Option<&str>,
    page: PageRequest,
) -> Result<Page<Patient>, DatabaseError> {
    let (raw, total) = match query {
        None => paged_query(
            conn,
            "SELECT COUNT(*) FROM patients WHERE active = 1",
            &format!("SELECT {COLS} FROM patients WHERE active = 1 ORDER BY rowid ASC LIMIT ? OFFSET ?"),
            &[],
            page,
            patient_row_from_sql,
        )?,
        Some(q) => {
            let pattern = format!("%{q}%");
            paged_query(
                conn,
                "SELECT COUNT(*) FROM patients WHERE active = 1
                 AND (LOWER(first_name) LIKE LOWER(?) OR LOWER(last_name) LIKE LOWER(?))",
                &format!(
                    "SELECT {COLS} FROM patients WHERE active = 1
                     AND (LOWER(first_name) LIKE LOWER(?) OR LOWER(last_name) LIKE LOWER(?))
                     ORDER BY rowid ASC LIMIT ? OFFSET ?"
                ),
                &[&pattern as &dyn ToSql, &pattern],
                page,
                patient_row_from_sql,
            )?
        }
    };

    let items = raw
        .into_iter()
        .map(patient_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page::new(items, page, total))
}

impl ActiveEntity for Patient {
    type Patch = PatientPatch;

    const KIND: EntityKind = EntityKind::Patient;

    fn id(&self) -> Uuid {
        self.id
    }

    fn insert(conn: &Connection, entity: &Self) -> Result<(), DatabaseError> {
        insert_patient(conn, entity)
    }

    fn fetch_active(conn: &Connection, id: &Uuid) -> Result<Option<Self>, DatabaseError> {
        fetch_active_patient(conn, id)
    }

    fn update_row(conn: &Connection, entity: &Self) -> Result<(), DatabaseError> {
        update_patient_row(conn, entity)
    }

    fn deactivate(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
        deactivate_patient(conn, id)
    }

    fn search_page(
        conn: &Connection,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Self>, DatabaseError> {
        search_patients(conn, query, page)
    }

    fn apply_patch(&mut self, patch: &PatientPatch) {
        if let Some(v) = &patch.first_name {
            self.first_name = v.clone();
        }
        if let Some(v) = &patch.last_name {
            self.last_name = v.clone();
        }
        if let Some(v) = patch.date_of_birth {
            self.date_of_birth = Some(v);
        }
        if let Some(v) = &patch.email {
            self.email = Some(v.clone());
        }
        if let Some(v) = &patch.address {
            self.address = Some(v.clone());
        }
        if let Some(v) = &patch.city {
            self.city = Some(v.clone());
        }
        if let Some(v) = &patch.state {
            self.state = Some(v.clone());
        }
        if let Some(v) = &patch.zip_code {
            self.zip_code = Some(v.clone());
        }
        if let Some(v) = &patch.home_phone {
            self.home_phone = Some(v.clone());
        }
        if let Some(v) = &patch.cell_phone {
            self.cell_phone = Some(v.clone());
        }
        if let Some(v) = &patch.work_phone {
            self.work_phone = Some(v.clone());
        }
        if let Some(v) = &patch.emergency_contact_name {
            self.emergency_contact_name = Some(v.clone());
        }
        if let Some(v) = &patch.emergency_contact_phone {
            self.emergency_contact_phone = Some(v.clone());
        }
        if let Some(v) = &patch.referred_by {
            self.referred_by = Some(v.clone());
        }
    }
}

// Internal row type for Patient mapping
struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    date_of_birth: Option<String>,
    email: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    home_phone: Option<String>,
    cell_phone: Option<String>,
    work_phone: Option<String>,
    emergency_contact_name: Option<String>,
    emergency_contact_phone: Option<String>,
    referred_by: Option<String>,
    active: i32,
}

fn patient_row_from_sql(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        email: row.get(4)?,
        address: row.get(5)?,
        city: row.get(6)?,
        state: row.get(7)?,
        zip_code: row.get(8)?,
        home_phone: row.get(9)?,
        cell_phone: row.get(10)?,
        work_phone: row.get(11)?,
        emergency_contact_name: row.get(12)?,
        emergency_contact_phone: row.get(13)?,
        referred_by: row.get(14)?,
        active: row.get(15)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        date_of_birth: row
            .date_of_birth
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        email: row.email,
        address: row.address,
        city: row.city,
        state: row.state,
        zip_code: row.zip_code,
        home_phone: row.home_phone,
        cell_phone: row.cell_phone,
        work_phone: row.work_phone,
        emergency_contact_name: row.emergency_contact_name,
        emergency_contact_phone: row.emergency_contact_phone,
        referred_by: row.referred_by,
        active: row.active != 0,
    })
}
