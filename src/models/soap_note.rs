use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// SOAP session note: subjective, objective, assessment, and plan sections
/// plus the session context the therapists record alongside them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoapNote {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Option<Uuid>,
    pub date_of_session: Option<NaiveDate>,
    pub time_of_session: Option<NaiveTime>,
    pub session_length: Option<String>,
    pub type_of_session: Option<String>,
    pub s_notes: Option<String>,
    pub o_notes: Option<String>,
    pub a_notes: Option<String>,
    pub p_notes: Option<String>,
    pub conditions: Option<String>,
    pub medications: Option<String>,
    pub medication_note: Option<String>,
    pub goals: Option<String>,
    pub diet: Option<String>,
    pub activity_level: Option<String>,
    pub history_of_conditions: Option<String>,
    pub quick_notes: Option<String>,
    pub age: Option<i64>,
    pub active: bool,
}

impl SoapNote {
    pub fn new(patient_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            therapist_id: None,
            date_of_session: None,
            time_of_session: None,
            session_length: None,
            type_of_session: None,
            s_notes: None,
            o_notes: None,
            a_notes: None,
            p_notes: None,
            conditions: None,
            medications: None,
            medication_note: None,
            goals: None,
            diet: None,
            activity_level: None,
            history_of_conditions: None,
            quick_notes: None,
            age: None,
            active: true,
        }
    }
}

/// Partial update — absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoapNotePatch {
    pub date_of_session: Option<NaiveDate>,
    pub time_of_session: Option<NaiveTime>,
    pub session_length: Option<String>,
    pub type_of_session: Option<String>,
    pub s_notes: Option<String>,
    pub o_notes: Option<String>,
    pub a_notes: Option<String>,
    pub p_notes: Option<String>,
    pub conditions: Option<String>,
    pub medications: Option<String>,
    pub medication_note: Option<String>,
    pub goals: Option<String>,
    pub diet: Option<String>,
    pub activity_level: Option<String>,
    pub history_of_conditions: Option<String>,
    pub quick_notes: Option<String>,
    pub age: Option<i64>,
}
