use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use wsoc_scout::config::{self, Config};
use wsoc_scout::radar::{self, PlayerSelection, RadarRequest, Scaling};
use wsoc_scout::{export, logging};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init_logging();

    let config_path = parse_value_arg("--config")
        .map(PathBuf::from)
        .or_else(|| std::env::var(config::CONFIG_PATH_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;

    let data_path = parse_value_arg("--data")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.pipeline.output_path.clone());
    let table = export::read_master_csv(&data_path)
        .with_context(|| format!("read combined table {}", data_path.display()))?;

    let season = match parse_value_arg("--season") {
        Some(raw) => Some(
            raw.parse::<i32>()
                .with_context(|| format!("invalid --season {raw:?}"))?,
        ),
        None => None,
    };
    let players = if has_flag("--all") {
        PlayerSelection::All
    } else {
        match parse_value_arg("--players") {
            Some(raw) => PlayerSelection::Named(
                raw.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
            ),
            None => PlayerSelection::None,
        }
    };
    let scaling = match parse_value_arg("--scaling").as_deref() {
        None | Some("percentile") => Scaling::Percentile,
        Some("minmax") => Scaling::MinMax,
        Some(other) => return Err(anyhow!("unknown --scaling {other:?}")),
    };

    let groups: Vec<String> = match parse_value_arg("--group") {
        Some(group) => vec![group],
        None => config
            .columns_config
            .iter()
            .map(|(name, _)| name.clone())
            .collect(),
    };
    if groups.is_empty() {
        return Err(anyhow!("no position groups configured"));
    }

    let mut charts = Vec::with_capacity(groups.len());
    for group in groups {
        let request = RadarRequest {
            group: group.clone(),
            season,
            players: players.clone(),
            scaling,
        };
        let chart = radar::build_radar(&table, &config, &request)
            .with_context(|| format!("build radar for {group}"))?;
        charts.push(chart);
    }

    let json = serde_json::to_string_pretty(&charts).context("serialize radar charts")?;
    println!("{json}");
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
