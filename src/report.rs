use std::fmt::Write;

use crate::aggregate;
use crate::ingest::canonical_department;
use crate::models::CanonicalRecord;

pub const RECENT_LOG_LIMIT: usize = 15;

/// Render the dashboard views as a markdown report.
pub fn build_report(records: &[CanonicalRecord], window_days: i64, top_guests: usize) -> String {
    let facts = aggregate::insight_facts(records);
    let departments = aggregate::department_totals(records);
    let daily = aggregate::daily_totals(records);
    let guests = aggregate::guest_totals(records, Some(top_guests));
    let recent = aggregate::recent_log(records, RECENT_LOG_LIMIT);

    let mut output = String::new();

    let _ = writeln!(output, "# TipEase Tipping Report");
    let _ = writeln!(output, "Covering a {window_days}-day observation window");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Figures");
    let _ = writeln!(output, "- Total tips: ${:.2}", facts.total_tips);
    let _ = writeln!(output, "- Unique guests: {}", facts.unique_guests);
    let _ = writeln!(output, "- Departments: {}", facts.department_count);
    let _ = writeln!(output, "- Average tip: ${:.2}", facts.average_tip);
    match facts.peak_day {
        Some(day) => {
            let _ = writeln!(output, "- Peak day: day {day}");
        }
        None => {
            let _ = writeln!(output, "- Peak day: n/a");
        }
    }
    if let Some(top) = &facts.top_department {
        let anchor = canonical_department(top);
        if anchor != top {
            let _ = writeln!(output, "- Top department: {top} ({anchor})");
        } else {
            let _ = writeln!(output, "- Top department: {top}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Tips by Department");
    if departments.is_empty() {
        let _ = writeln!(output, "No tips recorded for this window.");
    } else {
        for total in departments.iter() {
            let _ = writeln!(output, "- {}: ${:.2}", total.department, total.total);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Activity");
    if daily.is_empty() {
        let _ = writeln!(output, "No tips recorded for this window.");
    } else {
        for total in daily.iter() {
            let _ = writeln!(output, "- Day {}: ${:.2}", total.day, total.total);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Tippers");
    if guests.is_empty() {
        let _ = writeln!(output, "No guests recorded for this window.");
    } else {
        for total in guests.iter() {
            let _ = writeln!(output, "- {}: ${:.2}", total.guest, total.total);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Tip Log");
    if recent.is_empty() {
        let _ = writeln!(output, "No tips recorded for this window.");
    } else {
        for record in recent.iter() {
            let _ = writeln!(
                output,
                "- {} — {} tipped ${:.2} at {} ({})",
                record.timestamp.format("%Y-%m-%d %H:%M"),
                record.guest,
                record.tip,
                record.department,
                record.time_of_day
            );
        }
    }

    output
}
