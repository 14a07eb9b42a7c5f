use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::models::{CanonicalRecord, DailyTotal, DepartmentTotal, GuestTotal, InsightFacts};

/// Sum tips per department, descending by total. Ties keep first-encountered
/// order, so the result is deterministic for a given row order (the bar
/// chart and the top-department insight both read this).
pub fn department_totals(records: &[CanonicalRecord]) -> Vec<DepartmentTotal> {
    let (order, sums) = group_sums(records.iter().map(|r| (r.department.as_str(), r.tip)));
    let mut totals: Vec<DepartmentTotal> = order
        .into_iter()
        .map(|department| DepartmentTotal {
            total: sums[&department],
            department,
        })
        .collect();
    totals.sort_by(|a, b| compare_desc(a.total, b.total));
    totals
}

/// Sum tips per day, ascending by day. Only days present in the input
/// appear; gaps are not synthesized.
pub fn daily_totals(records: &[CanonicalRecord]) -> Vec<DailyTotal> {
    let mut sums: HashMap<i64, f64> = HashMap::new();
    for record in records {
        *sums.entry(record.day).or_insert(0.0) += record.tip;
    }
    let mut totals: Vec<DailyTotal> = sums
        .into_iter()
        .map(|(day, total)| DailyTotal { day, total })
        .collect();
    totals.sort_by_key(|t| t.day);
    totals
}

/// Sum tips per guest, descending by total, truncated to `limit` when given.
pub fn guest_totals(records: &[CanonicalRecord], limit: Option<usize>) -> Vec<GuestTotal> {
    let (order, sums) = group_sums(records.iter().map(|r| (r.guest.as_str(), r.tip)));
    let mut totals: Vec<GuestTotal> = order
        .into_iter()
        .map(|guest| GuestTotal {
            total: sums[&guest],
            guest,
        })
        .collect();
    totals.sort_by(|a, b| compare_desc(a.total, b.total));
    if let Some(limit) = limit {
        totals.truncate(limit);
    }
    totals
}

/// Most recent records first, truncated to `limit`.
pub fn recent_log(records: &[CanonicalRecord], limit: usize) -> Vec<CanonicalRecord> {
    let mut recent = records.to_vec();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(limit);
    recent
}

/// Scalar facts for the KPI cards and insight blurbs. Empty input yields
/// zeroed figures, never an error.
pub fn insight_facts(records: &[CanonicalRecord]) -> InsightFacts {
    let total_tips: f64 = records.iter().map(|r| r.tip).sum();
    let average_tip = if records.is_empty() {
        0.0
    } else {
        total_tips / records.len() as f64
    };

    let mut peak_day = None;
    let mut peak_total = f64::NEG_INFINITY;
    for daily in daily_totals(records) {
        // Strict comparison keeps the earliest day on ties.
        if daily.total > peak_total {
            peak_total = daily.total;
            peak_day = Some(daily.day);
        }
    }

    let unique_guests = records
        .iter()
        .map(|r| r.guest.as_str())
        .collect::<HashSet<_>>()
        .len();
    let department_count = records
        .iter()
        .map(|r| r.department.as_str())
        .collect::<HashSet<_>>()
        .len();

    InsightFacts {
        peak_day,
        average_tip,
        top_department: department_totals(records)
            .into_iter()
            .next()
            .map(|t| t.department),
        total_tips,
        unique_guests,
        department_count,
    }
}

/// Accumulate sums by key while remembering first-encountered key order.
fn group_sums<'a>(
    pairs: impl Iterator<Item = (&'a str, f64)>,
) -> (Vec<String>, HashMap<String, f64>) {
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, f64> = HashMap::new();
    for (key, value) in pairs {
        if !sums.contains_key(key) {
            order.push(key.to_string());
        }
        *sums.entry(key.to_string()).or_insert(0.0) += value;
    }
    (order, sums)
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
