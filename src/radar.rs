use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::aggregate::Table;
use crate::config::{Config, MetricRatio};
use crate::error::{PipelineError, Result};
use crate::spreadsheet::Cell;

pub const YEAR_COLUMN: &str = "year";
pub const TEAM_COLUMN: &str = "team";
pub const PLAYER_COLUMN: &str = "player_name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scaling {
    #[default]
    Percentile,
    MinMax,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlayerSelection {
    #[default]
    None,
    Named(Vec<String>),
    All,
}

#[derive(Debug, Clone, Default)]
pub struct RadarRequest {
    pub group: String,
    /// Latest season in the table when unset.
    pub season: Option<i32>,
    pub players: PlayerSelection,
    pub scaling: Scaling,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarSeries {
    pub name: String,
    pub team: Option<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarChart {
    pub group: String,
    pub season: i32,
    pub labels: Vec<String>,
    pub average: RadarSeries,
    pub players: Vec<RadarSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMeans {
    pub team: String,
    pub player_name: String,
    pub values: Vec<f64>,
}

pub fn build_radar(table: &Table, config: &Config, request: &RadarRequest) -> Result<RadarChart> {
    let group = config.radar_group(&request.group).ok_or_else(|| {
        PipelineError::Config(format!("no columns_config entry for {:?}", request.group))
    })?;
    let season = match request.season {
        Some(season) => season,
        None => seasons(table)?.last().copied().ok_or_else(|| {
            PipelineError::Config("table has no seasons to chart".to_string())
        })?,
    };

    let mut data = season_rows(table, season, &config.pipeline.unknown_player_label)?;
    add_derived_metrics(&mut data, &config.metrics)?;
    let codes = group.position_codes(&request.group);
    let subset = position_subset(&data, &config.pipeline.columns.position_column, &codes)?;

    let columns: Vec<String> = group.column_names.iter().map(|(c, _)| c.clone()).collect();
    let labels: Vec<String> = group.column_names.iter().map(|(_, l)| l.clone()).collect();
    let means = player_means(&subset, &columns)?;

    let scaled = scale_columns(&means, columns.len(), request.scaling);
    let average = (0..columns.len())
        .map(|col| {
            let column: Vec<f64> = scaled.iter().map(|row| row[col]).collect();
            round2(mean(&column))
        })
        .collect();

    let players = means
        .iter()
        .zip(&scaled)
        .filter(|(m, _)| match &request.players {
            PlayerSelection::None => false,
            PlayerSelection::All => true,
            PlayerSelection::Named(names) => names.iter().any(|n| n == &m.player_name),
        })
        .map(|(m, values)| RadarSeries {
            name: m.player_name.clone(),
            team: Some(m.team.clone()),
            values: values.clone(),
        })
        .collect();

    tracing::debug!(group = %request.group, season, players = means.len(), "built radar");
    Ok(RadarChart {
        group: request.group.clone(),
        season,
        labels,
        average: RadarSeries {
            name: "Average".to_string(),
            team: None,
            values: average,
        },
        players,
    })
}

pub fn seasons(table: &Table) -> Result<Vec<i32>> {
    let idx = require_column(table, YEAR_COLUMN)?;
    let years: BTreeSet<i32> = table
        .rows
        .iter()
        .filter_map(|row| row.get(idx).and_then(Cell::as_f64))
        .map(|y| y as i32)
        .collect();
    Ok(years.into_iter().collect())
}

pub fn season_rows(table: &Table, season: i32, unknown_label: &str) -> Result<Table> {
    let year_idx = require_column(table, YEAR_COLUMN)?;
    let player_idx = require_column(table, PLAYER_COLUMN)?;
    let rows = table
        .rows
        .iter()
        .filter(|row| row.get(year_idx).and_then(Cell::as_f64) == Some(f64::from(season)))
        .filter(|row| {
            row.get(player_idx)
                .is_some_and(|c| !c.is_empty() && c.to_string() != unknown_label)
        })
        .cloned()
        .collect();
    Ok(Table {
        columns: table.columns.clone(),
        rows,
    })
}

/// Append one column per derived metric; non-finite ratios become 0.
pub fn add_derived_metrics(table: &mut Table, metrics: &[(String, MetricRatio)]) -> Result<()> {
    for (name, ratio) in metrics {
        let num_idx = require_column(table, &ratio.numerator)?;
        let den_idx = require_column(table, &ratio.denominator)?;
        for row in &mut table.rows {
            let num = row.get(num_idx).and_then(Cell::as_f64).unwrap_or(f64::NAN);
            let den = row.get(den_idx).and_then(Cell::as_f64).unwrap_or(f64::NAN);
            let value = num / den;
            row.push(Cell::Number(if value.is_finite() { value } else { 0.0 }));
        }
        table.columns.push(name.clone());
    }
    Ok(())
}

pub fn position_subset(table: &Table, position_column: &str, codes: &[String]) -> Result<Table> {
    let idx = require_column(table, position_column)?;
    let rows = table
        .rows
        .iter()
        .filter(|row| {
            let position = row.get(idx).map(Cell::to_string).unwrap_or_default();
            codes.iter().any(|code| position.contains(code.as_str()))
        })
        .cloned()
        .collect();
    Ok(Table {
        columns: table.columns.clone(),
        rows,
    })
}

pub fn player_means(table: &Table, columns: &[String]) -> Result<Vec<PlayerMeans>> {
    let team_idx = require_column(table, TEAM_COLUMN)?;
    let player_idx = require_column(table, PLAYER_COLUMN)?;
    let value_idx: Vec<usize> = columns
        .iter()
        .map(|c| require_column(table, c))
        .collect::<Result<_>>()?;

    let mut order: Vec<(String, String)> = Vec::new();
    let mut sums: HashMap<(String, String), (Vec<f64>, usize)> = HashMap::new();
    for row in &table.rows {
        let key = (
            row.get(team_idx).map(Cell::to_string).unwrap_or_default(),
            row.get(player_idx).map(Cell::to_string).unwrap_or_default(),
        );
        let entry = sums.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (vec![0.0; value_idx.len()], 0)
        });
        for (slot, idx) in entry.0.iter_mut().zip(&value_idx) {
            *slot += row.get(*idx).and_then(Cell::as_f64).unwrap_or(0.0);
        }
        entry.1 += 1;
    }

    Ok(order
        .into_iter()
        .filter_map(|key| {
            let (totals, n) = sums.remove(&key)?;
            let (team, player_name) = key;
            Some(PlayerMeans {
                team,
                player_name,
                values: totals.into_iter().map(|t| t / n as f64).collect(),
            })
        })
        .collect())
}

fn scale_columns(means: &[PlayerMeans], width: usize, scaling: Scaling) -> Vec<Vec<f64>> {
    let mut out = vec![vec![0.0; width]; means.len()];
    for col in 0..width {
        let column: Vec<f64> = means.iter().map(|m| m.values[col]).collect();
        let scaled = match scaling {
            Scaling::Percentile => percentile_ranks(&column),
            Scaling::MinMax => min_max_scale(&column),
        };
        for (row, value) in out.iter_mut().zip(scaled) {
            row[col] = value;
        }
    }
    out
}

/// Percentile rank (ties share their average rank) on a 0-100 scale in whole points.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1 ..= end+1 share their mean.
        let avg_rank = (start + end + 2) as f64 / 2.0;
        for &idx in &order[start..=end] {
            ranks[idx] = avg_rank;
        }
        start = end + 1;
    }

    ranks
        .into_iter()
        .map(|rank| (rank / n as f64 * 100.0).round_ties_even())
        .collect()
}

pub fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    values
        .iter()
        .map(|v| {
            if span > 0.0 {
                round2((v - min) / span * 100.0)
            } else {
                0.0
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

fn require_column(table: &Table, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| PipelineError::Config(format!("exported table has no column {name:?}")))
}
