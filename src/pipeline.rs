use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::aggregate::{MasterRecord, MasterTable, Table};
use crate::competition::CompetitionFilter;
use crate::config::Config;
use crate::error::{DropReason, PipelineError, Result};
use crate::export::{self, ReviewEntry};
use crate::filename::{PlayerIdentity, parse_player_name};
use crate::normalize::{MatchRow, SheetLayout, normalize_row};
use crate::source::{self, ArchiveSource, SourceFile, SourceKind};
use crate::spreadsheet::read_sheet;
use crate::team::{infer_team, season_groups};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub files_processed: usize,
    pub entries_processed: usize,
    pub entries_failed: usize,
    pub rows_read: usize,
    pub dropped: BTreeMap<DropReason, usize>,
    pub rows_outside_competition: usize,
    pub seasons_assigned: usize,
    pub seasons_skipped: usize,
    pub failures: Vec<String>,
    pub review: Vec<ReviewEntry>,
}

impl RunStats {
    fn drop_rows(&mut self, reason: DropReason, count: usize) {
        *self.dropped.entry(reason).or_insert(0) += count;
    }

    pub fn dropped(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    fn absorb(&mut self, other: RunStats) {
        self.files_processed += other.files_processed;
        self.entries_processed += other.entries_processed;
        self.entries_failed += other.entries_failed;
        self.rows_read += other.rows_read;
        for (reason, count) in other.dropped {
            self.drop_rows(reason, count);
        }
        self.rows_outside_competition += other.rows_outside_competition;
        self.seasons_assigned += other.seasons_assigned;
        self.seasons_skipped += other.seasons_skipped;
        self.failures.extend(other.failures);
        self.review.extend(other.review);
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: RunStats,
    pub rows_exported: usize,
    pub output_path: PathBuf,
    pub review_path: Option<PathBuf>,
}

struct SourceOutcome {
    table: MasterTable,
    stats: RunStats,
}

/// Consolidate every source under the configured input directory and export
/// the master table. Nothing is written when the run fails.
pub fn run(config: &Config) -> Result<RunSummary> {
    let settings = &config.pipeline;
    let sources = source::discover_sources(&settings.input_dir, &settings.source_format)?;
    tracing::info!(
        input = %settings.input_dir.display(),
        sources = sources.len(),
        competition = %settings.competition,
        "starting consolidation"
    );

    let (table, stats) = build_canonical_table(config, &sources)?;

    // Both files are staged before either is published.
    let master = export::stage_table(&table, &settings.output_path)?;
    let review = match settings.review_path.as_ref() {
        Some(path) if !stats.review.is_empty() => {
            Some(export::stage_review_list(&stats.review, path)?)
        }
        _ => None,
    };
    let review_path = review.as_ref().map(|staged| staged.target().to_path_buf());
    if let Some(review) = review {
        review.commit()?;
    }
    if let Err(err) = master.commit() {
        if let Some(path) = review_path.as_ref() {
            let _ = fs::remove_file(path);
        }
        return Err(err);
    }

    tracing::info!(
        rows = table.len(),
        output = %settings.output_path.display(),
        "master table exported"
    );
    Ok(RunSummary {
        rows_exported: table.len(),
        stats,
        output_path: settings.output_path.clone(),
        review_path,
    })
}

pub fn build_canonical_table(config: &Config, sources: &[SourceFile]) -> Result<(Table, RunStats)> {
    let outcomes = if config.pipeline.parallelism > 1 {
        process_parallel(config, sources)
    } else {
        sources.iter().map(|s| process_source(config, s)).collect()
    };

    // Partial tables are merged in source order so row order stays deterministic.
    let mut master = MasterTable::new();
    let mut stats = RunStats::default();
    for outcome in outcomes {
        let outcome = outcome?;
        master.merge(outcome.table);
        stats.absorb(outcome.stats);
    }

    let table = master.into_canonical(&config.column_names)?;
    Ok((table, stats))
}

fn process_parallel(config: &Config, sources: &[SourceFile]) -> Vec<Result<SourceOutcome>> {
    let work = || {
        sources
            .par_iter()
            .map(|s| process_source(config, s))
            .collect::<Vec<_>>()
    };
    match rayon::ThreadPoolBuilder::new()
        .num_threads(config.pipeline.parallelism)
        .build()
    {
        Ok(pool) => pool.install(work),
        Err(err) => {
            tracing::warn!(error = %err, "thread pool unavailable, processing sequentially");
            sources.iter().map(|s| process_source(config, s)).collect()
        }
    }
}

fn process_source(config: &Config, source: &SourceFile) -> Result<SourceOutcome> {
    let label = source.label();
    let _span = tracing::info_span!("source", file = %label).entered();
    let mut table = MasterTable::new();
    let mut stats = RunStats {
        files_processed: 1,
        ..RunStats::default()
    };

    match source.kind {
        SourceKind::Archive => {
            let mut archive = ArchiveSource::open(&source.path)?;
            let names = archive.entry_names(&config.pipeline.source_format);
            tracing::info!(entries = names.len(), "reading archive");
            for name in names {
                let sheet = archive
                    .read_entry(&name)
                    .and_then(|bytes| process_sheet(config, &label, &name, bytes, &mut table, &mut stats));
                settle_entry(config, &label, &name, sheet, &mut stats)?;
            }
        }
        SourceKind::Spreadsheet => {
            let bytes = source::read_loose_file(&source.path)?;
            let sheet = process_sheet(config, &label, &label, bytes, &mut table, &mut stats);
            settle_entry(config, &label, &label, sheet, &mut stats)?;
        }
    }

    Ok(SourceOutcome { table, stats })
}

fn settle_entry(
    config: &Config,
    source: &str,
    entry: &str,
    result: Result<()>,
    stats: &mut RunStats,
) -> Result<()> {
    match result {
        Ok(()) => {
            stats.entries_processed += 1;
            Ok(())
        }
        Err(err @ PipelineError::MalformedSpreadsheet { .. }) => {
            if config.pipeline.fail_fast {
                return Err(err);
            }
            tracing::warn!(source, entry, error = %err, "skipping unreadable spreadsheet");
            stats.entries_failed += 1;
            stats.failures.push(err.to_string());
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn process_sheet(
    config: &Config,
    source: &str,
    entry: &str,
    bytes: Vec<u8>,
    table: &mut MasterTable,
    stats: &mut RunStats,
) -> Result<()> {
    let settings = &config.pipeline;
    let identity = parse_player_name(entry);
    let sheet = read_sheet(entry, bytes)?;
    let layout = SheetLayout::resolve(&sheet, &settings.columns, entry)?;
    stats.rows_read += sheet.rows.len();

    let PlayerIdentity::Named(player_name) = identity else {
        let held = PipelineError::UnknownPlayer {
            entry: entry.to_string(),
        };
        tracing::warn!(rows = sheet.rows.len(), error = %held, "holding rows for review");
        if let Some(reason) = held.drop_reason() {
            stats.drop_rows(reason, sheet.rows.len());
        }
        stats.review.push(ReviewEntry {
            source: source.to_string(),
            entry: entry.to_string(),
            rows: sheet.rows.len(),
        });
        return Ok(());
    };

    let mut normalized: Vec<MatchRow> = Vec::with_capacity(sheet.rows.len());
    for cells in sheet.rows {
        match normalize_row(&layout, cells) {
            Ok(row) => normalized.push(row),
            Err(err) => match err.drop_reason() {
                Some(reason) => {
                    tracing::debug!(entry, error = %err, "dropping row");
                    stats.drop_rows(reason, 1);
                }
                None => return Err(err),
            },
        }
    }

    let years_seen: BTreeSet<i32> = normalized.iter().map(|r| r.year).collect();
    let filter = CompetitionFilter::new(settings.competition.as_str());
    let (kept, rejected) = filter.apply(normalized);
    stats.rows_outside_competition += rejected;

    let groups = season_groups(kept);
    stats.seasons_skipped += years_seen.len() - groups.len();

    let mut records = Vec::new();
    for group in groups {
        let Some(assignment) = infer_team(&group) else {
            continue;
        };
        tracing::debug!(
            player = %player_name,
            year = assignment.year,
            team = %assignment.team,
            appearances = assignment.appearances,
            "assigned season team"
        );
        stats.seasons_assigned += 1;
        records.extend(group.rows.into_iter().map(|row| MasterRecord {
            player_name: player_name.clone(),
            team: assignment.team.clone(),
            row,
        }));
    }

    table.append_sheet(&sheet.headers, records);
    Ok(())
}
