use std::collections::{BTreeMap, HashMap};

use crate::normalize::MatchRow;

#[derive(Debug, Clone)]
pub struct SeasonGroup {
    pub year: i32,
    pub rows: Vec<MatchRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamAssignment {
    pub year: i32,
    pub team: String,
    pub appearances: usize,
}

pub fn season_groups(rows: Vec<MatchRow>) -> Vec<SeasonGroup> {
    let mut by_year: BTreeMap<i32, Vec<MatchRow>> = BTreeMap::new();
    for row in rows {
        by_year.entry(row.year).or_default().push(row);
    }
    by_year
        .into_iter()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(year, rows)| SeasonGroup { year, rows })
        .collect()
}

/// Most frequent team across the group's home then away names.
/// Ties go to the alphabetically smallest name, so input order never matters.
pub fn infer_team(group: &SeasonGroup) -> Option<TeamAssignment> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let names = group
        .rows
        .iter()
        .map(|r| r.home_team.as_str())
        .chain(group.rows.iter().map(|r| r.away_team.as_str()));
    for name in names {
        *counts.entry(name).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(name_a, count_a), (name_b, count_b)| {
            count_a.cmp(count_b).then_with(|| name_b.cmp(name_a))
        })
        .map(|(team, appearances)| TeamAssignment {
            year: group.year,
            team: team.to_string(),
            appearances,
        })
}
