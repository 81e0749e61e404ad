use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{FlakeTrackerError, IssueError};
use crate::logging::Diagnostics;
use crate::status::{IssueRef, StatusSnapshot};

use super::linker::FlakeLinker;
use super::parser::IssueTextParser;
use super::ReportedIssue;

/// An issue that could not be linked, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedIssue {
    pub issue: IssueRef,
    pub kind: &'static str,
    pub reason: String,
}

/// Outcome of one linking pass over a board's issues.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkSummary {
    pub issues_seen: usize,
    /// Issues that produced at least one link
    pub issues_linked: usize,
    /// Issues naming a flaking job but none of its tests
    pub issues_unmatched: usize,
    pub links_appended: usize,
    pub skipped: Vec<SkippedIssue>,
}

impl LinkSummary {
    /// Skipped issue counts keyed by error kind.
    pub fn skipped_by_kind(&self) -> BTreeMap<&'static str, usize> {
        self.skipped.iter().fold(BTreeMap::new(), |mut counts, s| {
            *counts.entry(s.kind).or_insert(0) += 1;
            counts
        })
    }
}

/// Runs every reported issue through the parser and the linker.
pub struct FlakeCollector<'a> {
    parser: IssueTextParser<'a>,
    linker: FlakeLinker<'a>,
    diagnostics: Diagnostics<'a>,
}

impl<'a> FlakeCollector<'a> {
    /// # Errors
    ///
    /// Returns an error if the dashboard link patterns for `link_host` cannot
    /// be compiled.
    pub fn new(link_host: &str, diagnostics: Diagnostics<'a>) -> Result<Self, FlakeTrackerError> {
        Ok(Self {
            parser: IssueTextParser::new(link_host, diagnostics.with_target("flake_tracker::parser"))?,
            linker: FlakeLinker::new(diagnostics.with_target("flake_tracker::linker")),
            diagnostics,
        })
    }

    /// Parses one issue and links it into `snapshot`.
    ///
    /// # Errors
    ///
    /// Any [`IssueError`] from parsing or linking; the snapshot is unchanged
    /// when one is returned.
    pub fn link_issue(
        &self,
        snapshot: &mut StatusSnapshot,
        reported: &ReportedIssue,
    ) -> Result<usize, IssueError> {
        let report = self.parser.parse(&reported.body)?;
        self.linker.link(snapshot, &reported.issue, &report)
    }

    /// Links every issue in order. Failures are logged and tallied, never
    /// fatal.
    pub fn link_all<'i, I>(&self, snapshot: &mut StatusSnapshot, issues: I) -> LinkSummary
    where
        I: IntoIterator<Item = &'i ReportedIssue>,
    {
        let mut summary = LinkSummary::default();

        for reported in issues {
            summary.issues_seen += 1;
            match self.link_issue(snapshot, reported) {
                Ok(0) => summary.issues_unmatched += 1,
                Ok(appended) => {
                    summary.issues_linked += 1;
                    summary.links_appended += appended;
                }
                Err(err) => {
                    self.log_skip(&reported.issue, &err);
                    summary.skipped.push(SkippedIssue {
                        issue: reported.issue.clone(),
                        kind: err.kind(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        self.diagnostics.info(format_args!(
            "linked {} of {} issues ({} links, {} skipped)",
            summary.issues_linked,
            summary.issues_seen,
            summary.links_appended,
            summary.skipped.len()
        ));

        summary
    }

    fn log_skip(&self, issue: &IssueRef, err: &IssueError) {
        match err {
            IssueError::UnknownJob { .. } | IssueError::NotFlaking { .. } => {
                self.diagnostics
                    .error(format_args!("skipping {} {}: {err}", issue.title, issue.url));
            }
            IssueError::MissingSection { .. } | IssueError::PatternNotFound { .. } => {
                self.diagnostics
                    .warn(format_args!("skipping {} {}: {err}", issue.title, issue.url));
            }
        }
    }
}
