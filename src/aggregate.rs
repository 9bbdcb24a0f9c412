use std::collections::HashMap;

use crate::error::{PipelineError, Result};
use crate::normalize::MatchRow;
use crate::spreadsheet::Cell;

pub const DERIVED_COLUMNS: [&str; 5] = ["home_team", "away_team", "year", "team", "player_name"];

#[derive(Debug, Clone)]
pub struct MasterRecord {
    pub player_name: String,
    pub team: String,
    pub row: MatchRow,
}

#[derive(Debug, Clone)]
struct MasterRow {
    // Aligned with a prefix of `MasterTable::source_columns`.
    cells: Vec<Cell>,
    home_team: String,
    away_team: String,
    year: i32,
    team: String,
    player_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct MasterTable {
    source_columns: Vec<String>,
    column_index: HashMap<String, usize>,
    rows: Vec<MasterRow>,
}

impl MasterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> Vec<String> {
        self.source_columns
            .iter()
            .cloned()
            .chain(DERIVED_COLUMNS.iter().map(|c| c.to_string()))
            .collect()
    }

    /// Add one sheet's records. A sheet with no records leaves the columns untouched.
    pub fn append_sheet(&mut self, headers: &[String], records: Vec<MasterRecord>) {
        if records.is_empty() {
            return;
        }
        let mapping = self.map_headers(&dedup_headers(headers));
        for record in records {
            self.push_mapped(&mapping, record);
        }
    }

    pub fn merge(&mut self, other: MasterTable) {
        let mapping = self.map_headers(&other.source_columns);
        for row in other.rows {
            let cells = self.remap_cells(&mapping, row.cells);
            self.rows.push(MasterRow { cells, ..row });
        }
    }

    /// Rename columns positionally to the canonical names.
    pub fn into_canonical(self, canonical: &[String]) -> Result<Table> {
        let produced = self.source_columns.len() + DERIVED_COLUMNS.len();
        if canonical.len() != produced {
            return Err(PipelineError::SchemaMismatch {
                expected: canonical.len(),
                actual: produced,
            });
        }

        let width = self.source_columns.len();
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                let mut cells = row.cells;
                cells.resize(width, Cell::Empty);
                cells.push(Cell::Text(row.home_team));
                cells.push(Cell::Text(row.away_team));
                cells.push(Cell::Number(f64::from(row.year)));
                cells.push(Cell::Text(row.team));
                cells.push(Cell::Text(row.player_name));
                cells
            })
            .collect();

        Ok(Table {
            columns: canonical.to_vec(),
            rows,
        })
    }

    fn map_headers(&mut self, headers: &[String]) -> Vec<usize> {
        headers
            .iter()
            .map(|header| match self.column_index.get(header) {
                Some(idx) => *idx,
                None => {
                    let idx = self.source_columns.len();
                    self.source_columns.push(header.clone());
                    self.column_index.insert(header.clone(), idx);
                    idx
                }
            })
            .collect()
    }

    fn remap_cells(&self, mapping: &[usize], cells: Vec<Cell>) -> Vec<Cell> {
        let width = mapping.iter().copied().max().map_or(0, |m| m + 1);
        let mut out = vec![Cell::Empty; width];
        for (cell, target) in cells.into_iter().zip(mapping) {
            out[*target] = cell;
        }
        out
    }

    fn push_mapped(&mut self, mapping: &[usize], record: MasterRecord) {
        let MasterRecord {
            player_name,
            team,
            row,
        } = record;
        let cells = self.remap_cells(mapping, row.cells);
        self.rows.push(MasterRow {
            cells,
            home_team: row.home_team,
            away_team: row.away_team,
            year: row.year,
            team,
            player_name,
        });
    }
}

fn dedup_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    headers
        .iter()
        .map(|header| {
            let count = seen.entry(header.as_str()).or_insert(0);
            let name = if *count == 0 {
                header.clone()
            } else {
                format!("{header}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}
