use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfAssessment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    pub date_of_session: Option<NaiveDate>,
    pub goal_of_session: Option<String>,
    pub assessment: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
}

impl SelfAssessment {
    pub fn new(patient_id: Uuid, therapist_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            therapist_id,
            date_of_session: None,
            goal_of_session: None,
            assessment: None,
            notes: None,
            active: true,
        }
    }
}

/// Partial update — absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelfAssessmentPatch {
    pub date_of_session: Option<NaiveDate>,
    pub goal_of_session: Option<String>,
    pub assessment: Option<String>,
    pub notes: Option<String>,
}
