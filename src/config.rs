use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::source::SourceFormat;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const CONFIG_PATH_ENV: &str = "WSOC_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub column_names: Vec<String>,
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub metrics: Vec<(String, MetricRatio)>,
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub columns_config: Vec<(String, RadarGroup)>,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct MetricRatio {
    pub numerator: String,
    pub denominator: String,
}

impl From<(String, String)> for MetricRatio {
    fn from((numerator, denominator): (String, String)) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RadarGroup {
    #[serde(default)]
    pub positions: Vec<String>,
    #[serde(deserialize_with = "ordered_pairs")]
    pub column_names: Vec<(String, String)>,
}

impl RadarGroup {
    pub fn position_codes(&self, group: &str) -> Vec<String> {
        if !self.positions.is_empty() {
            return self.positions.clone();
        }
        default_position_codes(group)
            .iter()
            .map(|code| code.to_string())
            .collect()
    }
}

pub fn default_position_codes(group: &str) -> &'static [&'static str] {
    match group {
        "Wingers" => &["LW", "RW"],
        "Goalkeepers" => &["GK"],
        "Forwards" => &["CF"],
        "Central Midfielders" => &["CMF", "AMF"],
        "Defensive Midfielders" => &["DMF"],
        "Outside Backs" => &["LB", "RB"],
        "Center Backs" => &["CB"],
        _ => &[],
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    pub competition: String,
    pub source_format: SourceFormat,
    pub fail_fast: bool,
    pub unknown_player_label: String,
    pub review_path: Option<PathBuf>,
    pub parallelism: usize,
    pub columns: SourceColumns,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("zips"),
            output_path: PathBuf::from("dash_data/combined.csv"),
            competition: "NCAA".to_string(),
            source_format: SourceFormat::default(),
            fail_fast: false,
            unknown_player_label: "undefined".to_string(),
            review_path: None,
            parallelism: 1,
            columns: SourceColumns::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceColumns {
    pub match_column: String,
    pub date_column: String,
    pub competition_column: String,
    pub position_column: String,
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            match_column: "Match".to_string(),
            date_column: "Date".to_string(),
            competition_column: "Competition".to_string(),
            position_column: "Position".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
        Self::from_yaml_str(&raw)
            .map_err(|err| PipelineError::Config(format!("{}: {err}", path.display())))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(raw).map_err(|err| PipelineError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.column_names.is_empty() {
            return Err(PipelineError::Config("column_names is empty".to_string()));
        }
        let mut seen = HashSet::new();
        for name in &self.column_names {
            if name.trim().is_empty() {
                return Err(PipelineError::Config(
                    "column_names contains a blank name".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "column_names lists {name:?} twice"
                )));
            }
        }
        for (name, ratio) in &self.metrics {
            if ratio.numerator.trim().is_empty() || ratio.denominator.trim().is_empty() {
                return Err(PipelineError::Config(format!(
                    "metric {name:?} needs both a numerator and a denominator"
                )));
            }
        }
        for (group, radar) in &self.columns_config {
            if radar.column_names.is_empty() {
                return Err(PipelineError::Config(format!(
                    "columns_config group {group:?} has no columns"
                )));
            }
        }
        if self.pipeline.parallelism == 0 {
            return Err(PipelineError::Config(
                "pipeline.parallelism must be at least 1".to_string(),
            ));
        }
        if self.pipeline.competition.is_empty() {
            return Err(PipelineError::Config(
                "pipeline.competition is empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn radar_group(&self, name: &str) -> Option<&RadarGroup> {
        self.columns_config
            .iter()
            .find(|(group, _)| group == name)
            .map(|(_, radar)| radar)
    }
}

/// Deserialize a YAML mapping while keeping its key order.
fn ordered_pairs<'de, D, V>(deserializer: D) -> std::result::Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct PairsVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for PairsVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, V>()? {
                out.push((key, value));
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(PairsVisitor(PhantomData))
}
