use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_DURATION_MINUTES: i64 = 15;
pub const MAX_DURATION_MINUTES: i64 = 480;
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i64,
    pub notes: Option<String>,
    pub active: bool,
}

impl Appointment {
    /// Exclusive end of the booked slot: `[start_time, end_time)`.
    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time + Duration::minutes(self.duration_minutes)
    }
}
