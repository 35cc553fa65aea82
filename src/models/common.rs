use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// Optional inclusive date range for listing slots
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// Inclusive date range required when applying rules
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ApplyRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

// Query parameters accepted by admin endpoints
#[derive(Debug, Default, Deserialize)]
pub struct AdminQueryParams {
    pub auth: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewSlotRequest {
    pub date: NaiveDate,
    pub time: String,
}
