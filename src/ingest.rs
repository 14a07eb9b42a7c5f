use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Duration, NaiveDateTime, Utc};
use thiserror::Error;

use crate::models::CanonicalRecord;

/// Errors that end an ingestion session. Per-cell problems never do; they
/// resolve through the fill policy below.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("no tipping data found at {0} — upload or place the CSV to proceed")]
    MissingSource(String),

    #[error("required column '{column}' is missing after header mapping")]
    MissingRequiredColumn { column: &'static str },

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// What to do with a row whose day cell does not parse. The source data is
/// inconsistent here, so the choice is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidDayPolicy {
    /// Keep the row with day 0, preserving row counts for the aggregates.
    #[default]
    ZeroFill,
    /// Discard the row.
    Drop,
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Length of the observation window in days (15 or 30 depending on the
    /// dataset). Anchors the synthetic timestamps at now minus this many days.
    pub window_days: i64,
    pub invalid_day: InvalidDayPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            window_days: 15,
            invalid_day: InvalidDayPolicy::ZeroFill,
        }
    }
}

/// Verbose bilingual header spellings mapped to canonical field names.
const HEADER_MAP: &[(&str, &str)] = &[
    ("Day / Día", "day"),
    ("Guest ID / Huésped", "guest"),
    ("Tip (USD) / Propina (USD)", "tip"),
    ("Department / Departamento", "dept"),
    ("Time of Day / Hora del Día", "tod"),
];

/// Undo a UTF-8-as-Latin-1 double decode. Headers corrupted that way always
/// contain 'Ã', so anything else passes through untouched. If the header is
/// not actually recoverable the original text is kept.
pub fn repair_header(header: &str) -> String {
    if !header.contains('Ã') {
        return header.to_string();
    }
    let bytes: Option<Vec<u8>> = header
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect();
    bytes
        .and_then(|b| String::from_utf8(b).ok())
        .unwrap_or_else(|| header.to_string())
}

/// Map one header cell onto its canonical field name. Already-canonical and
/// unknown headers pass through unchanged.
pub fn canonical_header(header: &str) -> String {
    let repaired = repair_header(header.trim());
    for (verbose, canonical) in HEADER_MAP {
        if repaired == *verbose {
            return (*canonical).to_string();
        }
    }
    repaired
}

/// Hour-of-day bucket for each time-of-day label, English or Spanish.
/// Unrecognized labels land mid-day.
pub fn bucket_hour(time_of_day: &str) -> i64 {
    match time_of_day {
        "Morning" | "Mañana" => 10,
        "Afternoon" | "Tarde" => 14,
        "Evening" | "Noche" => 19,
        _ => 12,
    }
}

/// Spanish department names folded onto their English equivalents. Used by
/// the presentation layer for anchor lookups; aggregation groups on the raw
/// department string and never calls this.
pub fn canonical_department(department: &str) -> &str {
    match department {
        "Comedor" => "Dining",
        "Limpieza" => "Housekeeping",
        "Piscina" => "Pool",
        "Playa" => "Beachfront",
        "Conserjería" => "Concierge",
        "Servicio a la Habitación" => "Room Service",
        other => other,
    }
}

/// Anchor instant for the synthetic timestamps, computed once per load.
pub fn base_date(window_days: i64) -> NaiveDateTime {
    Utc::now().naive_utc() - Duration::days(window_days.max(1))
}

fn parse_day(cell: Option<&str>) -> Option<i64> {
    let text = cell?.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(|v| v as i64))
}

fn parse_tip(cell: Option<&str>) -> f64 {
    let parsed = cell
        .map(str::trim)
        .and_then(|text| text.parse::<f64>().ok())
        .filter(|v| v.is_finite());
    match parsed {
        Some(v) if v >= 0.0 => v,
        Some(v) => {
            log::warn!("negative tip {v} coerced to 0.00");
            0.0
        }
        None => {
            log::debug!("unparseable tip {:?} filled with 0.00", cell.unwrap_or(""));
            0.0
        }
    }
}

/// Normalize a tipping CSV from any reader into canonical records.
pub fn normalize<R: Read>(reader: R, options: IngestOptions) -> Result<Vec<CanonicalRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(canonical_header).collect();
    let find = |name: &str| headers.iter().position(|h| h == name);

    let guest_idx = find("guest").ok_or(IngestError::MissingRequiredColumn { column: "guest" })?;
    let tip_idx = find("tip").ok_or(IngestError::MissingRequiredColumn { column: "tip" })?;
    let dept_idx = find("dept").ok_or(IngestError::MissingRequiredColumn { column: "dept" })?;
    let day_idx = find("day");
    let tod_idx = find("tod");

    let anchor = base_date(options.window_days);
    let mut records = Vec::new();

    for row in csv_reader.records() {
        let row = row?;

        let day = match parse_day(day_idx.and_then(|i| row.get(i))) {
            Some(day) => day,
            None => match options.invalid_day {
                InvalidDayPolicy::ZeroFill => 0,
                InvalidDayPolicy::Drop => {
                    log::warn!("dropping row with unparseable day: {row:?}");
                    continue;
                }
            },
        };

        let time_of_day = tod_idx
            .and_then(|i| row.get(i))
            .map(str::trim)
            .unwrap_or("")
            .to_string();

        records.push(CanonicalRecord {
            day,
            guest: row.get(guest_idx).unwrap_or("").trim().to_string(),
            tip: parse_tip(row.get(tip_idx)),
            department: row.get(dept_idx).unwrap_or("").trim().to_string(),
            timestamp: anchor + Duration::days(day) + Duration::hours(bucket_hour(&time_of_day)),
            time_of_day,
        });
    }

    Ok(records)
}

/// Normalize a tipping CSV on disk. A missing file is the fatal
/// `MissingSource` case; the caller surfaces it and renders nothing.
pub fn normalize_path(path: &Path, options: IngestOptions) -> Result<Vec<CanonicalRecord>> {
    if !path.exists() {
        return Err(IngestError::MissingSource(path.display().to_string()));
    }
    let file = File::open(path).map_err(|_| IngestError::MissingSource(path.display().to_string()))?;
    normalize(file, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Headers as they arrive when the UTF-8 file was read as Latin-1:
    // "Día" becomes "DÃ\u{ad}a", "Huésped" becomes "HuÃ©sped", and so on.
    const MOJIBAKE_CSV: &str = "Day / D\u{c3}\u{ad}a,Guest ID / Hu\u{c3}\u{a9}sped,Tip (USD) / Propina (USD),Department / Departamento,Time of Day / Hora del D\u{c3}\u{ad}a\n\
1,G1,10,Spa,Morning\n\
1,G2,bad,Spa,Evening\n\
2,G3,4.50,Comedor,Tarde\n";

    #[test]
    fn repairs_mojibake_headers() {
        assert_eq!(repair_header("Day / D\u{c3}\u{ad}a"), "Day / Día");
        assert_eq!(repair_header("Guest ID / Hu\u{c3}\u{a9}sped"), "Guest ID / Huésped");
        // Clean headers pass through untouched.
        assert_eq!(repair_header("Day / Día"), "Day / Día");
    }

    #[test]
    fn corrupted_and_clean_headers_map_to_same_field() {
        assert_eq!(canonical_header("Day / D\u{c3}\u{ad}a"), "day");
        assert_eq!(canonical_header("Day / Día"), "day");
        assert_eq!(canonical_header("Time of Day / Hora del D\u{c3}\u{ad}a"), "tod");
    }

    #[test]
    fn unknown_headers_pass_through() {
        assert_eq!(canonical_header("day"), "day");
        assert_eq!(canonical_header("Room Number"), "Room Number");
    }

    #[test]
    fn bucket_hours_cover_both_languages() {
        assert_eq!(bucket_hour("Morning"), 10);
        assert_eq!(bucket_hour("Mañana"), 10);
        assert_eq!(bucket_hour("Afternoon"), 14);
        assert_eq!(bucket_hour("Noche"), 19);
        assert_eq!(bucket_hour("Midnight"), 12);
    }

    #[test]
    fn normalizes_bilingual_mojibake_csv() {
        let records = normalize(MOJIBAKE_CSV.as_bytes(), IngestOptions::default()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].guest, "G1");
        assert_eq!(records[0].tip, 10.0);
        assert_eq!(records[1].tip, 0.0);
        assert_eq!(records[2].department, "Comedor");
        assert_eq!(records[2].time_of_day, "Tarde");
    }

    #[test]
    fn tips_never_go_negative() {
        let csv = "guest,tip,dept\nG1,-5.00,Spa\nG2,n/a,Pool\n";
        let records = normalize(csv.as_bytes(), IngestOptions::default()).unwrap();
        assert!(records.iter().all(|r| r.tip >= 0.0));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn invalid_day_zero_fill_keeps_the_row() {
        let csv = "day,guest,tip,dept\noops,G1,3.00,Spa\n";
        let records = normalize(csv.as_bytes(), IngestOptions::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].day, 0);
    }

    #[test]
    fn invalid_day_drop_discards_the_row() {
        let csv = "day,guest,tip,dept\noops,G1,3.00,Spa\n2,G2,4.00,Spa\n";
        let options = IngestOptions {
            invalid_day: InvalidDayPolicy::Drop,
            ..IngestOptions::default()
        };
        let records = normalize(csv.as_bytes(), options).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].guest, "G2");
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let csv = "day,guest,tip\n1,G1,2.00\n";
        let err = normalize(csv.as_bytes(), IngestOptions::default()).unwrap_err();
        match err {
            IngestError::MissingRequiredColumn { column } => assert_eq!(column, "dept"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_tod_column_defaults_to_midday() {
        let csv = "day,guest,tip,dept\n1,G1,2.00,Spa\n";
        let records = normalize(csv.as_bytes(), IngestOptions::default()).unwrap();
        let anchor = records[0].timestamp - Duration::days(1) - Duration::hours(12);
        // Anchor should be ~15 days ago; allow slack for test runtime.
        let expected = base_date(15);
        assert!((expected - anchor).num_seconds().abs() < 5);
    }

    #[test]
    fn timestamps_increase_with_day_for_fixed_bucket() {
        let csv = "day,guest,tip,dept,tod\n1,G1,2.00,Spa,Morning\n2,G2,3.00,Spa,Morning\n";
        let records = normalize(csv.as_bytes(), IngestOptions::default()).unwrap();
        assert!(records[1].timestamp > records[0].timestamp);
        assert_eq!(
            records[1].timestamp - records[0].timestamp,
            Duration::days(1)
        );
    }

    #[test]
    fn missing_source_reported_for_absent_file() {
        let err = normalize_path(
            Path::new("definitely_not_here.csv"),
            IngestOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::MissingSource(_)));
    }

    #[test]
    fn department_synonyms_fold_to_english() {
        assert_eq!(canonical_department("Comedor"), "Dining");
        assert_eq!(canonical_department("Servicio a la Habitación"), "Room Service");
        assert_eq!(canonical_department("Spa"), "Spa");
        assert_eq!(canonical_department("Arcade"), "Arcade");
    }
}
