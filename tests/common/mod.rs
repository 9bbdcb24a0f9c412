#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use rust_xlsxwriter::Workbook;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use wsoc_scout::config::{Config, PipelineSettings};
use wsoc_scout::source::SourceFormat;

pub const HEADERS: [&str; 6] = ["Match", "Competition", "Date", "Position", "Goals", "Shots"];

/// (match, competition, date, position, goals, shots)
pub type FixtureRow<'a> = (&'a str, &'a str, &'a str, &'a str, f64, f64);

pub fn xlsx_bytes(rows: &[FixtureRow]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (idx, (label, competition, date, position, goals, shots)) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        sheet.write_string(r, 0, *label).unwrap();
        sheet.write_string(r, 1, *competition).unwrap();
        sheet.write_string(r, 2, *date).unwrap();
        sheet.write_string(r, 3, *position).unwrap();
        sheet.write_number(r, 4, *goals).unwrap();
        sheet.write_number(r, 5, *shots).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

/// Same layout as `xlsx_bytes` with one more numeric column at the end.
pub fn xlsx_bytes_with_column(rows: &[FixtureRow], extra: &str, value: f64) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let extra_col = HEADERS.len() as u16;
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    sheet.write_string(0, extra_col, extra).unwrap();
    for (idx, (label, competition, date, position, goals, shots)) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        sheet.write_string(r, 0, *label).unwrap();
        sheet.write_string(r, 1, *competition).unwrap();
        sheet.write_string(r, 2, *date).unwrap();
        sheet.write_string(r, 3, *position).unwrap();
        sheet.write_number(r, 4, *goals).unwrap();
        sheet.write_number(r, 5, *shots).unwrap();
        sheet.write_number(r, extra_col, value).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

pub fn write_zip(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }
    fs::write(path, buf).unwrap();
}

pub fn jane_rows() -> Vec<FixtureRow<'static>> {
    vec![
        ("Vanderbilt - Alabama 2:1", "United States. NCAA D1", "2023-09-01", "CF", 1.0, 3.0),
        ("Auburn - Vanderbilt 0:0", "United States. NCAA D1", "2023-09-08", "CF", 0.0, 2.0),
        ("Vanderbilt - LSU 1:1 (P)", "United States. NCAA D1", "2023-09-15", "CF", 1.0, 4.0),
        ("Vanderbilt - Club XI 3:0", "Club Friendlies", "2023-08-10", "CF", 2.0, 5.0),
    ]
}

pub fn ana_rows() -> Vec<FixtureRow<'static>> {
    vec![
        ("Georgia - Florida 1:0", "United States. NCAA D1", "2023-09-02", "CF, LW", 0.0, 1.0),
        ("Tennessee - Georgia 2:2", "United States. NCAA D1", "2023-09-09", "CF", 2.0, 4.0),
        ("Georgia - Kentucky 0:1", "United States. NCAA D1", "2023-09-16", "LW", 0.0, 0.0),
        ("Georgia - Select XI 5:0", "Club Friendlies", "2023-08-11", "LW", 3.0, 6.0),
    ]
}

pub fn canonical_names() -> Vec<String> {
    HEADERS
        .iter()
        .copied()
        .chain(["home_team", "away_team", "year", "team", "player_name"])
        .map(str::to_string)
        .collect()
}

pub fn config_for(dir: &Path, source_format: SourceFormat) -> Config {
    Config {
        column_names: canonical_names(),
        metrics: Vec::new(),
        columns_config: Vec::new(),
        pipeline: PipelineSettings {
            input_dir: dir.join("zips"),
            output_path: dir.join("dash_data").join("combined.csv"),
            source_format,
            ..PipelineSettings::default()
        },
    }
}

pub fn sec_format() -> SourceFormat {
    SourceFormat::ArchiveFolder {
        folder: "SEC Players/".to_string(),
    }
}

/// `zips/sec.zip` holding Jane's and Ana's sheets plus OS and non-sheet clutter.
pub fn standard_input(dir: &Path) {
    let zips = dir.join("zips");
    fs::create_dir_all(&zips).unwrap();
    write_zip(
        &zips.join("sec.zip"),
        &[
            ("SEC Players/Player stats Jane Doe.xlsx", xlsx_bytes(&jane_rows())),
            ("SEC Players/stats Ana Lima copy (2).xlsx", xlsx_bytes(&ana_rows())),
            ("__MACOSX/SEC Players/._Player stats Jane Doe.xlsx", b"resource fork".to_vec()),
            ("SEC Players/notes.txt", b"not a sheet".to_vec()),
        ],
    );
}
