use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, Worksheet};

use crate::aggregate::Table;
use crate::error::{PipelineError, Result};
use crate::spreadsheet::Cell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub source: String,
    pub entry: String,
    pub rows: usize,
}

/// Write the table to `path`; `.xlsx` paths get a workbook, anything else CSV.
/// The file only appears once fully written.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    stage_table(table, path)?.commit()
}

/// A fully written `<path>.tmp` waiting to be renamed over `path`.
/// Dropping it without `commit` removes the temp file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.tmp, &self.target).map_err(|err| PipelineError::io(&self.target, err))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

pub fn stage_table(table: &Table, path: &Path) -> Result<StagedFile> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| PipelineError::io(parent, err))?;
    }
    let staged = StagedFile {
        tmp: tmp_path(path),
        target: path.to_path_buf(),
        committed: false,
    };
    if is_xlsx(path) {
        write_xlsx(table, &staged.tmp)?;
    } else {
        write_csv(table, &staged.tmp)?;
    }
    Ok(staged)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|err| PipelineError::export(path, err))?;
    writer
        .write_record(&table.columns)
        .map_err(|err| PipelineError::export(path, err))?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(Cell::to_string))
            .map_err(|err| PipelineError::export(path, err))?;
    }
    writer.flush().map_err(|err| PipelineError::io(path, err))
}

fn write_xlsx(table: &Table, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name("combined")
        .map_err(|err| PipelineError::export(path, err))?;
    write_sheet_rows(sheet, table).map_err(|err| PipelineError::export(path, err))?;
    workbook
        .save(path)
        .map_err(|err| PipelineError::export(path, err))
}

fn write_sheet_rows(
    sheet: &mut Worksheet,
    table: &Table,
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    for (col_idx, name) in table.columns.iter().enumerate() {
        sheet.write_string(0, col_idx as u16, name)?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        let r = row_idx as u32 + 1;
        for (col_idx, cell) in row.iter().enumerate() {
            let c = col_idx as u16;
            match cell {
                Cell::Empty => {}
                Cell::Number(v) => {
                    sheet.write_number(r, c, *v)?;
                }
                Cell::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
                other => {
                    sheet.write_string(r, c, other.to_string())?;
                }
            }
        }
    }
    Ok(())
}

pub fn read_master_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|err| PipelineError::export(path, err))?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(|err| PipelineError::export(path, err))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| PipelineError::export(path, err))?;
        rows.push(record.iter().map(Cell::from_export_field).collect());
    }
    Ok(Table { columns, rows })
}

pub fn stage_review_list(entries: &[ReviewEntry], path: &Path) -> Result<StagedFile> {
    let table = Table {
        columns: vec!["source".to_string(), "entry".to_string(), "rows".to_string()],
        rows: entries
            .iter()
            .map(|e| {
                vec![
                    Cell::Text(e.source.clone()),
                    Cell::Text(e.entry.clone()),
                    Cell::Number(e.rows as f64),
                ]
            })
            .collect(),
    };
    stage_table(&table, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table {
            columns: vec!["Match".into(), "Goals".into(), "player_name".into()],
            rows: vec![
                vec![
                    Cell::Text("Alpha, FC - Beta 1:0".into()),
                    Cell::Number(1.0),
                    Cell::Text("Jane Doe".into()),
                ],
                vec![Cell::Text("Beta - Alpha 0:0".into()), Cell::Empty, Cell::Text("Jane Doe".into())],
            ],
        }
    }

    #[test]
    fn csv_round_trip_keeps_columns_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("combined.csv");
        let table = sample();
        write_table(&table, &path).unwrap();

        let back = read_master_csv(&path).unwrap();
        assert_eq!(back.columns, table.columns);
        assert_eq!(back.len(), table.len());
        assert_eq!(back.rows[0][0], Cell::Text("Alpha, FC - Beta 1:0".into()));
        assert_eq!(back.rows[1][1], Cell::Empty);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn writes_xlsx_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.xlsx");
        write_table(&sample(), &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        let sheet = crate::spreadsheet::read_sheet("combined.xlsx", bytes).unwrap();
        assert_eq!(sheet.headers, sample().columns);
        assert_eq!(sheet.rows.len(), 2);
    }

    #[test]
    fn dropped_stage_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.csv");
        let staged = stage_table(&sample(), &path).unwrap();
        assert!(tmp_path(&path).exists());
        assert!(!path.exists());
        drop(staged);
        assert!(!tmp_path(&path).exists());
        assert!(!path.exists());
    }

    #[test]
    fn tmp_path_sits_next_to_target() {
        assert_eq!(
            tmp_path(Path::new("dash_data/combined.csv")),
            PathBuf::from("dash_data/combined.csv.tmp")
        );
    }
}
