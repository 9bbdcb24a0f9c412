use crate::normalize::MatchRow;

#[derive(Debug, Clone)]
pub struct CompetitionFilter {
    needle: String,
}

impl CompetitionFilter {
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }

    pub fn retains(&self, row: &MatchRow) -> bool {
        row.competition.contains(&self.needle)
    }

    pub fn apply(&self, rows: Vec<MatchRow>) -> (Vec<MatchRow>, usize) {
        let before = rows.len();
        let kept: Vec<MatchRow> = rows.into_iter().filter(|row| self.retains(row)).collect();
        let rejected = before - kept.len();
        (kept, rejected)
    }
}
