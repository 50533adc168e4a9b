use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub home_phone: Option<String>,
    pub cell_phone: Option<String>,
    pub work_phone: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub referred_by: Option<String>,
    pub active: bool,
}

impl Patient {
    /// New active patient with a fresh id; optional fields start empty.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth: None,
            email: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            home_phone: None,
            cell_phone: None,
            work_phone: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            referred_by: None,
            active: true,
        }
    }
}

/// Partial update — absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub home_phone: Option<String>,
    pub cell_phone: Option<String>,
    pub work_phone: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub referred_by: Option<String>,
}
