use crate::error::IssueError;
use crate::logging::Diagnostics;
use crate::status::{IssueRef, LinkedIssue, OverallStatus, StatusSnapshot};

use super::parser::FlakeReport;

/// Attaches reported flakes to the test results of flaking jobs.
///
/// Linking only ever appends: an issue linked twice shows up twice.
pub struct FlakeLinker<'a> {
    diagnostics: Diagnostics<'a>,
}

impl<'a> FlakeLinker<'a> {
    pub fn new(diagnostics: Diagnostics<'a>) -> Self {
        Self { diagnostics }
    }

    /// Links `issue` to every test of the reported job whose name exactly
    /// matches one of the reported test names.
    ///
    /// Returns the number of [`LinkedIssue`] entries appended. Reported names
    /// that match no test result are dropped.
    ///
    /// # Errors
    ///
    /// [`IssueError::UnknownJob`] when the job is on none of the snapshot's
    /// buckets, [`IssueError::NotFlaking`] when it is passing or failing. The
    /// snapshot is left untouched in both cases.
    pub fn link(
        &self,
        snapshot: &mut StatusSnapshot,
        issue: &IssueRef,
        report: &FlakeReport,
    ) -> Result<usize, IssueError> {
        let job = report.job.as_str();

        match snapshot.job_status(job) {
            Some(OverallStatus::Flaky) => {}
            Some(status) => {
                let inventory = snapshot.inventory();
                self.diagnostics.error(format_args!(
                    "{} ({}) reports job {job} which is {status}, not flaking",
                    issue.title, issue.url
                ));
                self.log_inventory(snapshot);
                return Err(IssueError::NotFlaking {
                    job: job.to_string(),
                    status,
                    inventory,
                });
            }
            None => {
                let inventory = snapshot.inventory();
                self.diagnostics.error(format_args!(
                    "{} ({}) reports job {job} which is not on dashboard {}",
                    issue.title, issue.url, snapshot.name
                ));
                self.log_inventory(snapshot);
                return Err(IssueError::UnknownJob {
                    job: job.to_string(),
                    inventory,
                });
            }
        }

        if report.dashboard != snapshot.name {
            self.diagnostics.debug(format_args!(
                "issue {} names dashboard {} but is linked against {}",
                issue.number, report.dashboard, snapshot.name
            ));
        }

        let Some(results) = snapshot
            .job_mut(job)
            .and_then(|status| status.test_results.as_mut())
        else {
            self.diagnostics
                .debug(format_args!("flaking job {job} has no test results to link"));
            return Ok(0);
        };

        self.diagnostics.info(format_args!(
            "linking issue {} to {}#{job}",
            issue.url, report.dashboard
        ));

        let linked = LinkedIssue {
            issue: issue.clone(),
            dashboard: report.dashboard.clone(),
            job: report.job.clone(),
            tests: report.tests.clone(),
        };

        let mut appended = 0;
        for test in &mut results.tests {
            for reported in &report.tests {
                if test.name == *reported {
                    self.diagnostics
                        .info(format_args!("join {} == {reported}", test.name));
                    test.linked_issues.push(linked.clone());
                    appended += 1;
                }
            }
        }

        for reported in &report.tests {
            if !results.tests.iter().any(|test| test.name == *reported) {
                self.diagnostics.debug(format_args!(
                    "issue {} mentions {reported:?} which job {job} does not list",
                    issue.number
                ));
            }
        }

        Ok(appended)
    }

    fn log_inventory(&self, snapshot: &StatusSnapshot) {
        for status in OverallStatus::ALL {
            self.diagnostics.error(format_args!(
                "{status} jobs: {:?}",
                snapshot.jobs_by_status(status)
            ));
        }
    }
}
