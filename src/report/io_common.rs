// Primitives shared by the readers.

use std::path::Path;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use survey_insights::{FieldKind, FieldSchema, ResponseValue};

// Layouts seen in the exports of the form tools, after RFC 3339.
// `%Y` also accepts two digits, so the `%y` layouts come first and years
// before 100 are rejected.
const TIMESTAMP_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const MIN_YEAR: i32 = 100;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// Reads a submission time. Times without an offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in TIMESTAMP_FORMATS.iter() {
        match NaiveDateTime::parse_from_str(s, fmt) {
            Ok(ndt) if ndt.year() >= MIN_YEAR => return Some(Utc.from_utc_datetime(&ndt)),
            _ => {}
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .filter(|d| d.year() >= MIN_YEAR)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Converts an Excel serial date (days since 1899-12-30, with the time as the fraction).
pub fn excel_serial_to_datetime(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let ndt = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    Some(Utc.from_utc_datetime(&ndt))
}

/// The value of a text cell, for the kind of its field.
///
/// Multiselect cells are split on the delimiter. Blank cells are empty.
pub fn text_cell_value(field: &FieldSchema, cell: &str, delimiter: &str) -> ResponseValue {
    if cell.trim().is_empty() {
        return ResponseValue::Empty;
    }
    match field.kind {
        FieldKind::MultiSelect { .. } => ResponseValue::List(
            cell.split(delimiter)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
        ),
        _ => ResponseValue::Text(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_insights::FieldOption;

    fn multiselect() -> FieldSchema {
        FieldSchema {
            id: "tools".to_string(),
            kind: FieldKind::MultiSelect {
                options: vec![FieldOption::simple("Rust"), FieldOption::simple("Go")],
            },
            order: 1,
            section: None,
            subsection: None,
        }
    }

    #[test]
    fn timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp(" 5/1/2024 10:00:00 "), Some(expected));
        assert_eq!(parse_timestamp("5/1/24 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("5/1/24 10:00"), Some(expected));
        assert_eq!(parse_timestamp("5/1/2024 10:00"), Some(expected));
        assert_eq!(parse_timestamp("0024-05-01"), None);
        assert_eq!(
            parse_timestamp("2024-05-01"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn excel_serials() {
        // 45413.5 is 2024-05-01 at noon.
        assert_eq!(
            excel_serial_to_datetime(45413.5),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(excel_serial_to_datetime(-1.0), None);
    }

    #[test]
    fn multiselect_cells_are_split() {
        let f = multiselect();
        assert_eq!(
            text_cell_value(&f, "Rust; Go;", ";"),
            ResponseValue::List(vec!["Rust".to_string(), "Go".to_string()])
        );
        assert_eq!(text_cell_value(&f, "  ", ";"), ResponseValue::Empty);
    }

    #[test]
    fn default_ids() {
        let f = make_default_id("/tmp/data/responses.csv");
        assert_eq!(f(3), "responses.csv-00000003");
    }
}
