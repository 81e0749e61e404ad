mod collector;
mod linker;
mod parser;

pub use collector::{FlakeCollector, LinkSummary, SkippedIssue};
pub use parser::{IssueTextParser, DEFAULT_LINK_HOST};

use crate::status::IssueRef;

/// An issue pulled off the board, ready to be parsed.
#[derive(Debug, Clone)]
pub struct ReportedIssue {
    pub issue: IssueRef,
    pub body: String,
}
