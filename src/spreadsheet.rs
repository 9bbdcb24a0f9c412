use std::fmt;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn from_export_field(raw: &str) -> Self {
        if raw.is_empty() {
            return Cell::Empty;
        }
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(v) => write!(f, "{}", format_number(*v)),
            Cell::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Cell::DateTime(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", dt.date().format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// Parse one spreadsheet held in memory. `entry` only labels errors.
pub fn read_sheet(entry: &str, bytes: Vec<u8>) -> Result<RawSheet> {
    let malformed = |reason: String| PipelineError::MalformedSpreadsheet {
        entry: entry.to_string(),
        reason,
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|err| malformed(err.to_string()))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Err(malformed("workbook has no sheets".to_string()));
    };
    let range = workbook
        .worksheet_range(first)
        .map_err(|err| malformed(format!("sheet {first:?}: {err}")))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(malformed("sheet has no header row".to_string()));
    };
    let headers: Vec<String> = header_row.iter().map(header_text).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(malformed("header row is blank".to_string()));
    }

    let rows = rows
        .filter(|row| !row.iter().all(|cell| matches!(cell, Data::Empty)))
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().map(cell_from_data).collect();
            cells.resize(headers.len(), Cell::Empty);
            cells
        })
        .collect();

    Ok(RawSheet { headers, rows })
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        other => cell_from_data(other).to_string(),
    }
}

fn cell_from_data(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(v) => Cell::Number(*v),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(Cell::DateTime)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

// 9999-12-31 in the 1900 date system.
const MAX_EXCEL_SERIAL: f64 = 2_958_466.0;

pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(seconds))
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let s = s.trim_end_matches('%');
    let cleaned = s.replace(',', "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn reads_headers_verbatim_and_rows_in_order() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Shots / on target").unwrap();
        sheet.write_string(0, 1, "Goals").unwrap();
        sheet.write_string(1, 0, "A - B 1:0").unwrap();
        sheet.write_number(1, 1, 2.0).unwrap();
        sheet.write_string(2, 0, "C - D 0:0").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let raw = read_sheet("test.xlsx", bytes).expect("sheet should parse");
        assert_eq!(raw.headers, vec!["Shots / on target".to_string(), "Goals".to_string()]);
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[0][1], Cell::Number(2.0));
        assert_eq!(raw.rows[1][1], Cell::Empty);
        assert_eq!(raw.column_index("Goals"), Some(1));
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let err = read_sheet("broken.xlsx", b"not a workbook".to_vec()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSpreadsheet { .. }));
    }

    #[test]
    fn excel_serial_dates() {
        let dt = excel_serial_to_datetime(45_170.0).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2023, 9, 1).unwrap());
        let dt = excel_serial_to_datetime(45_170.5).unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "12:00");
        assert!(excel_serial_to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn cell_display_matches_export_format() {
        assert_eq!(Cell::Number(3.0).to_string(), "3");
        assert_eq!(Cell::Number(0.25).to_string(), "0.25");
        assert_eq!(Cell::Empty.to_string(), "");
        let dt = NaiveDate::from_ymd_opt(2023, 8, 20)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Cell::DateTime(dt).to_string(), "2023-08-20");
    }

    #[test]
    fn export_fields_round_trip_to_cells() {
        assert_eq!(Cell::from_export_field(""), Cell::Empty);
        assert_eq!(Cell::from_export_field("3"), Cell::Number(3.0));
        assert_eq!(
            Cell::from_export_field("Alpha FC"),
            Cell::Text("Alpha FC".to_string())
        );
        assert_eq!(parse_number("45%"), Some(45.0));
        assert_eq!(parse_number("1,200"), Some(1200.0));
        assert_eq!(parse_number("-"), None);
    }
}
