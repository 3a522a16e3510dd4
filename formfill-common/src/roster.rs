//! Roster ingestion and attendee record normalization
//!
//! Reads the uploaded attendee roster (CSV) into loosely-typed rows, then turns
//! each row into a canonical [`AttendeeRecord`]. Normalization never fails:
//! absent columns and unparseable values degrade to the empty string.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;

use crate::{Error, Result};

/// Roster column holding "Last, First" or "First Last"
pub const COL_NAME: &str = "AttendeeName";
/// Roster column holding the date of birth
pub const COL_DATE_OF_BIRTH: &str = "DateOfBirth";
pub const COL_STREET: &str = "Street";
pub const COL_CITY: &str = "City";
pub const COL_POSTAL_CODE: &str = "PostalCode";
pub const COL_EMAIL: &str = "E-mail";
pub const COL_PHONE: &str = "AttendeePhone";

/// Columns the normalizer reads. Any of them may be missing from a roster.
pub const EXPECTED_COLUMNS: [&str; 7] = [
    COL_NAME,
    COL_DATE_OF_BIRTH,
    COL_STREET,
    COL_CITY,
    COL_POSTAL_CODE,
    COL_EMAIL,
    COL_PHONE,
];

/// Width of the birth year written onto a form
///
/// Varies per form type and reflects the width of the year box printed on
/// the target form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YearWidth {
    /// Four digits ("2020")
    Full,
    /// Last two digits ("20")
    TwoDigit,
}

/// One raw roster row: column header → cell text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterRow {
    cells: HashMap<String, String>,
}

impl RosterRow {
    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Cell text for `column`, if the roster has that column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Cell text for `column`, or the empty string when absent
    fn text(&self, column: &str) -> String {
        self.get(column).unwrap_or_default().to_string()
    }
}

/// Canonical attendee record
///
/// All fields are strings; the empty string marks an absent value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendeeRecord {
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub email: String,
    pub phone: String,
    pub birth_day: String,
    pub birth_month: String,
    pub birth_year: String,
}

/// Read a CSV roster into rows
///
/// Headers are trimmed (including a leading byte-order mark), and rows shorter
/// than the header simply lack the trailing columns. Rows whose cells are all
/// blank are kept as blank attendees so later rows keep their slot positions.
/// Input without a header row is rejected as [`Error::InvalidInput`].
pub fn read_roster<R: Read>(reader: R) -> Result<Vec<RosterRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(Error::InvalidInput("Roster has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let row = RosterRow::from_pairs(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, cell)| (h.clone(), cell.to_string())),
        );
        rows.push(row);
    }

    let missing: Vec<&str> = EXPECTED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == col))
        .collect();
    if !missing.is_empty() {
        tracing::warn!(
            missing = ?missing,
            "Roster is missing expected columns; those fields will be left blank"
        );
    }

    tracing::debug!(rows = rows.len(), "Roster read");
    Ok(rows)
}

/// Normalize one roster row into an attendee record
pub fn normalize(row: &RosterRow, year_width: YearWidth) -> AttendeeRecord {
    let (birth_day, birth_month, birth_year) =
        parse_date(row.get(COL_DATE_OF_BIRTH).unwrap_or_default(), year_width);

    AttendeeRecord {
        full_name: clean_name(row.get(COL_NAME).unwrap_or_default()),
        street: row.text(COL_STREET),
        city: row.text(COL_CITY),
        postal_code: row.text(COL_POSTAL_CODE),
        email: row.text(COL_EMAIL),
        phone: row.text(COL_PHONE),
        birth_day,
        birth_month,
        birth_year,
    }
}

/// Reorder "Last, First" into "First Last"
///
/// Only the first comma splits; later commas stay with the given names.
/// Names without a comma pass through untouched.
pub fn clean_name(raw: &str) -> String {
    match raw.split_once(',') {
        Some((last, first)) => format!("{} {}", first.trim(), last.trim()),
        None => raw.to_string(),
    }
}

/// Date-time layouts accepted before falling back to plain dates
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Plain date layouts, day-first readings ahead of month-first ones
///
/// Two-digit-year layouts come before their four-digit twins so "03/04/20"
/// is read as 2020 rather than year 20.
const DATE_FORMATS: &[&str] = &[
    // Day first
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %m %Y",
    // Month first, only reached when the day-first reading is impossible
    "%m/%d/%y",
    "%m-%d-%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m.%d.%Y",
    // Year first
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    // Month names
    "%d %B %Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

/// Parse a date of birth into zero-padded `(day, month, year)`
///
/// Ambiguous numeric dates are read day first. Absent or unparseable input
/// yields three empty strings.
pub fn parse_date(raw: &str, year_width: YearWidth) -> (String, String, String) {
    match parse_calendar_date(raw) {
        Some(date) => {
            let year = match year_width {
                YearWidth::Full => format!("{:04}", date.year()),
                YearWidth::TwoDigit => format!("{:02}", date.year().rem_euclid(100)),
            };
            (
                format!("{:02}", date.day()),
                format!("{:02}", date.month()),
                year,
            )
        }
        None => (String::new(), String::new(), String::new()),
    }
}

fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let plausible = |date: &NaiveDate| (1000..=9999).contains(&date.year());

    DATETIME_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
        .find(plausible)
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .find(plausible)
        })
}
