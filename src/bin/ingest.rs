use std::path::PathBuf;

use anyhow::{Context, Result};

use wsoc_scout::config::{self, Config};
use wsoc_scout::error::DropReason;
use wsoc_scout::{logging, pipeline};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init_logging();

    let config_path = parse_value_arg("--config")
        .map(PathBuf::from)
        .or_else(|| std::env::var(config::CONFIG_PATH_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;
    apply_overrides(&mut config)?;

    let summary = pipeline::run(&config).context("consolidation failed, no output written")?;
    let stats = &summary.stats;

    println!("Consolidation complete");
    println!("Output: {}", summary.output_path.display());
    println!("Files processed: {}", stats.files_processed);
    println!(
        "Spreadsheets: {} processed, {} failed",
        stats.entries_processed, stats.entries_failed
    );
    println!("Rows read: {}", stats.rows_read);
    for reason in DropReason::ALL {
        println!("Rows dropped ({}): {}", reason.label(), stats.dropped(reason));
    }
    println!(
        "Rows outside {}: {}",
        config.pipeline.competition, stats.rows_outside_competition
    );
    println!(
        "Seasons: {} assigned, {} without competition matches",
        stats.seasons_assigned, stats.seasons_skipped
    );
    println!("Rows exported: {}", summary.rows_exported);
    if !stats.failures.is_empty() {
        println!("Failures: {}", stats.failures.len());
        for err in stats.failures.iter().take(8) {
            println!(" - {err}");
        }
    }
    if !stats.review.is_empty() {
        println!("Needs review: {} spreadsheets", stats.review.len());
        for item in stats.review.iter().take(8) {
            println!(" - {} :: {} ({} rows)", item.source, item.entry, item.rows);
        }
        if let Some(path) = summary.review_path.as_ref() {
            println!("Review list: {}", path.display());
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config) -> Result<()> {
    if let Some(input) = parse_value_arg("--input") {
        config.pipeline.input_dir = PathBuf::from(input);
    }
    if let Some(output) = parse_value_arg("--output") {
        config.pipeline.output_path = PathBuf::from(output);
    }
    if let Some(review) = parse_value_arg("--review") {
        config.pipeline.review_path = Some(PathBuf::from(review));
    }
    if let Some(raw) = parse_value_arg("--parallelism") {
        config.pipeline.parallelism = raw
            .parse::<usize>()
            .with_context(|| format!("invalid --parallelism {raw:?}"))?;
    }
    if has_flag("--strict") {
        config.pipeline.fail_fast = true;
    }
    config.validate().context("invalid configuration after overrides")?;
    Ok(())
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == flag)
}

fn parse_value_arg(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.clone());
            }
        }
    }
    None
}
