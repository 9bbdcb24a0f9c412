use std::fmt;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("malformed spreadsheet {entry}: {reason}")]
    MalformedSpreadsheet { entry: String, reason: String },

    #[error("unparseable date {value:?}")]
    UnparseableDate { value: String },

    #[error("malformed match descriptor {value:?}")]
    MalformedMatch { value: String },

    #[error("schema mismatch: {expected} canonical column names for {actual} produced columns")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("no player name in entry {entry:?}")]
    UnknownPlayer { entry: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("archive {path}: {source}")]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("export to {path} failed: {reason}")]
    Export { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn export(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        PipelineError::Export {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn drop_reason(&self) -> Option<DropReason> {
        match self {
            PipelineError::UnparseableDate { .. } => Some(DropReason::UnparseableDate),
            PipelineError::MalformedMatch { .. } => Some(DropReason::MalformedMatch),
            PipelineError::UnknownPlayer { .. } => Some(DropReason::UnknownPlayer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    UnparseableDate,
    MalformedMatch,
    UnknownPlayer,
}

impl DropReason {
    pub const ALL: [DropReason; 3] = [
        DropReason::UnparseableDate,
        DropReason::MalformedMatch,
        DropReason::UnknownPlayer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DropReason::UnparseableDate => "unparseable date",
            DropReason::MalformedMatch => "malformed match",
            DropReason::UnknownPlayer => "unknown player",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
