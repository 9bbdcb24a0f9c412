use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::config::SourceColumns;
use crate::error::{PipelineError, Result};
use crate::spreadsheet::{Cell, RawSheet, excel_serial_to_datetime};

const MATCH_SEPARATOR: &str = " - ";
const PENALTY_MARKER: &str = "(P)";

// Year-first patterns come first so `2023-04-05` never reads as day-first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRow {
    pub match_label: String,
    pub date: NaiveDateTime,
    pub competition: String,
    pub home_team: String,
    pub away_team: String,
    pub year: i32,
    /// Source cells in source header order; the date cell holds the parsed date.
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub match_idx: usize,
    pub date_idx: usize,
    pub competition_idx: usize,
}

impl SheetLayout {
    pub fn resolve(sheet: &RawSheet, columns: &SourceColumns, entry: &str) -> Result<Self> {
        let find = |header: &str| {
            sheet
                .column_index(header)
                .ok_or_else(|| PipelineError::MalformedSpreadsheet {
                    entry: entry.to_string(),
                    reason: format!("missing column {header:?}"),
                })
        };
        Ok(Self {
            match_idx: find(&columns.match_column)?,
            date_idx: find(&columns.date_column)?,
            competition_idx: find(&columns.competition_column)?,
        })
    }
}

pub fn normalize_row(layout: &SheetLayout, mut cells: Vec<Cell>) -> Result<MatchRow> {
    let match_label = cell_text(cells.get(layout.match_idx));
    let (home_team, away_team) = split_match(&match_label)?;
    let date = parse_date_cell(cells.get(layout.date_idx).unwrap_or(&Cell::Empty))?;
    let competition = cell_text(cells.get(layout.competition_idx));

    if let Some(slot) = cells.get_mut(layout.date_idx) {
        *slot = Cell::DateTime(date);
    }

    Ok(MatchRow {
        match_label,
        date,
        competition,
        home_team,
        away_team,
        year: date.year(),
        cells,
    })
}

pub fn split_match(label: &str) -> Result<(String, String)> {
    let malformed = || PipelineError::MalformedMatch {
        value: label.to_string(),
    };

    let mut parts = label.split(MATCH_SEPARATOR);
    let home = parts.next().unwrap_or_default().trim();
    let Some(away_raw) = parts.last() else {
        return Err(malformed());
    };

    let away = match away_raw.find(|c: char| c.is_ascii_digit()) {
        Some(idx) => &away_raw[..idx],
        None => away_raw,
    };
    let away = away.trim().replace(PENALTY_MARKER, "");
    let away = away.trim();

    if home.is_empty() || away.is_empty() {
        return Err(malformed());
    }
    Ok((home.to_string(), away.to_string()))
}

pub fn parse_date_cell(cell: &Cell) -> Result<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Ok(*dt),
        Cell::Number(serial) => {
            excel_serial_to_datetime(*serial).ok_or_else(|| PipelineError::UnparseableDate {
                value: cell.to_string(),
            })
        }
        Cell::Text(raw) => parse_date_str(raw),
        other => Err(PipelineError::UnparseableDate {
            value: other.to_string(),
        }),
    }
}

pub fn parse_date_str(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    Err(PipelineError::UnparseableDate {
        value: raw.to_string(),
    })
}

fn cell_text(cell: Option<&Cell>) -> String {
    cell.map(|c| c.to_string()).unwrap_or_default()
}
