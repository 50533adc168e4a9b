use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::TherapistRole;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapist {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Login name; unique across all therapists, active or not.
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: TherapistRole,
    pub active: bool,
}

impl Therapist {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        username: impl Into<String>,
        role: TherapistRole,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            username: username.into(),
            email: None,
            phone_number: None,
            role,
            active: true,
        }
    }
}

/// Partial update — absent fields leave the stored value untouched.
/// Username is immutable once created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TherapistPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<TherapistRole>,
}
