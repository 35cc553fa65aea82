use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A half-hour slot produced by expanding recurrence rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeneratedSlot {
    pub date: NaiveDate,
    /// "HH:MM"
    pub time: String,
}

impl GeneratedSlot {
    pub fn new(date: NaiveDate, time: impl Into<String>) -> Self {
        Self {
            date,
            time: time.into(),
        }
    }
}

// Slot as persisted in the slot store; unique on (date, time)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub date: NaiveDate,
    pub time: String,
    pub available: bool,
}

impl TimeSlot {
    pub fn new(date: NaiveDate, time: &str, available: bool) -> Self {
        Self {
            id: slot_id(date, time),
            date,
            time: time.to_string(),
            available,
        }
    }
}

pub fn slot_id(date: NaiveDate, time: &str) -> String {
    format!("{}-{}", date.format("%Y-%m-%d"), time)
}

// Summary returned after materializing generated slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub generated: usize,
    pub created: usize,
    pub already_present: usize,
}
