use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use wsoc_scout::filename::parse_player_name;
use wsoc_scout::normalize::{SheetLayout, normalize_row, split_match};
use wsoc_scout::radar::percentile_ranks;
use wsoc_scout::spreadsheet::Cell;
use wsoc_scout::team::{infer_team, season_groups};

const ENTRIES: [&str; 6] = [
    "SEC Players/Player stats Jane Doe.xlsx",
    "SEC Players/Player stats Ana Lima copy (2).xlsx",
    "Player stats  Mary-Kate O'Neil (1)(3).XLSX",
    "nested/dir/stats Lee_.xlsx",
    "SEC Players/Player stats copy.xlsx",
    "stats Zoë Álvarez.ods",
];

const TEAMS: [&str; 8] = [
    "Vanderbilt",
    "Alabama",
    "Auburn",
    "LSU",
    "Georgia",
    "Florida",
    "Kentucky",
    "Tennessee",
];

const LAYOUT: SheetLayout = SheetLayout {
    match_idx: 0,
    competition_idx: 1,
    date_idx: 2,
};

fn sample_cells(idx: usize) -> Vec<Cell> {
    let home = TEAMS[idx % TEAMS.len()];
    let away = TEAMS[(idx * 3 + 1) % TEAMS.len()];
    let penalty = if idx % 7 == 0 { " (P)" } else { "" };
    vec![
        Cell::Text(format!("{home} - {away} {}:{}{penalty}", idx % 4, idx % 3)),
        Cell::Text("United States. NCAA D1".to_string()),
        Cell::Text(format!("{}-{:02}-{:02}", 2021 + idx % 4, 1 + idx % 12, 1 + idx % 28)),
        Cell::Text("CF".to_string()),
        Cell::Number((idx % 5) as f64),
    ]
}

fn bench_player_names(c: &mut Criterion) {
    c.bench_function("parse_player_name", |b| {
        b.iter(|| {
            for entry in ENTRIES {
                black_box(parse_player_name(black_box(entry)));
            }
        })
    });
}

fn bench_split_match(c: &mut Criterion) {
    let labels: Vec<String> = (0..64)
        .map(|idx| match sample_cells(idx).into_iter().next() {
            Some(Cell::Text(label)) => label,
            _ => String::new(),
        })
        .collect();
    c.bench_function("split_match", |b| {
        b.iter(|| {
            for label in &labels {
                let _ = black_box(split_match(black_box(label)));
            }
        })
    });
}

fn bench_normalize_rows(c: &mut Criterion) {
    let rows: Vec<Vec<Cell>> = (0..500).map(sample_cells).collect();
    c.bench_function("normalize_500_rows", |b| {
        b.iter(|| {
            let normalized = rows
                .iter()
                .cloned()
                .filter_map(|cells| normalize_row(&LAYOUT, cells).ok())
                .count();
            black_box(normalized);
        })
    });
}

fn bench_team_inference(c: &mut Criterion) {
    let rows: Vec<_> = (0..500)
        .filter_map(|idx| normalize_row(&LAYOUT, sample_cells(idx)).ok())
        .collect();
    c.bench_function("infer_team_by_season", |b| {
        b.iter(|| {
            let groups = season_groups(rows.clone());
            let teams: Vec<_> = groups.iter().filter_map(infer_team).collect();
            black_box(teams.len());
        })
    });
}

fn bench_percentiles(c: &mut Criterion) {
    let values: Vec<f64> = (0..300).map(|idx| ((idx * 37) % 101) as f64 / 10.0).collect();
    c.bench_function("percentile_ranks_300", |b| {
        b.iter(|| {
            black_box(percentile_ranks(black_box(&values)));
        })
    });
}

criterion_group!(
    perf,
    bench_player_names,
    bench_split_match,
    bench_normalize_rows,
    bench_team_inference,
    bench_percentiles
);
criterion_main!(perf);
