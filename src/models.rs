use chrono::NaiveDateTime;
use serde::Serialize;

/// One tipping observation after normalization.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalRecord {
    pub day: i64,
    pub guest: String,
    pub tip: f64,
    pub department: String,
    pub time_of_day: String,
    /// Synthetic instant derived from `day` and the time-of-day bucket.
    /// Only meaningful for relative ordering within one load.
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentTotal {
    pub department: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyTotal {
    pub day: i64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestTotal {
    pub guest: String,
    pub total: f64,
}

/// Scalar facts surfaced as KPI cards and insight blurbs.
#[derive(Debug, Clone, Serialize)]
pub struct InsightFacts {
    pub peak_day: Option<i64>,
    pub average_tip: f64,
    pub top_department: Option<String>,
    pub total_tips: f64,
    pub unique_guests: usize,
    pub department_count: usize,
}
