use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeForm {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub practiced_yoga_before: Option<bool>,
    pub yoga_frequency: Option<String>,
    pub active: bool,
}

impl IntakeForm {
    pub fn new(patient_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            practiced_yoga_before: None,
            yoga_frequency: None,
            active: true,
        }
    }
}

/// Partial update — absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntakeFormPatch {
    pub practiced_yoga_before: Option<bool>,
    pub yoga_frequency: Option<String>,
}
