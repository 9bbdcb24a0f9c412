pub mod aggregate;
pub mod competition;
pub mod config;
pub mod error;
pub mod export;
pub mod filename;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod radar;
pub mod source;
pub mod spreadsheet;
pub mod team;

pub use config::Config;
pub use error::{DropReason, PipelineError, Result};
