use thiserror::Error;

use crate::status::{JobInventory, OverallStatus};

#[derive(Error, Debug)]
pub enum FlakeTrackerError {
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Card content URL is not an issue URL: {0}")]
    InvalidContentUrl(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FlakeTrackerError>;

/// Reasons a single reported issue could not be linked to a flaking job.
///
/// None of these abort a run: the collection loop logs them and moves on to
/// the next issue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssueError {
    #[error("issue body is missing the \"{header}\" section header")]
    MissingSection { header: &'static str },

    #[error("pattern {pattern} not found in {text:?}")]
    PatternNotFound { pattern: String, text: String },

    #[error("job {job} is not on the dashboard ({inventory})")]
    UnknownJob { job: String, inventory: JobInventory },

    #[error("job {job} is {status}, not flaking ({inventory})")]
    NotFlaking {
        job: String,
        status: OverallStatus,
        inventory: JobInventory,
    },
}

impl IssueError {
    /// Short label used when tallying skipped issues.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingSection { .. } => "missing-section",
            Self::PatternNotFound { .. } => "pattern-not-found",
            Self::UnknownJob { .. } => "unknown-job",
            Self::NotFlaking { .. } => "not-flaking",
        }
    }
}
