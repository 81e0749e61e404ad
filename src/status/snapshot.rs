use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::sig::extract_sig;

/// Overall status of a job as reported by the dashboard summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Passing,
    Failing,
    Flaky,
}

impl OverallStatus {
    pub const ALL: [Self; 3] = [Self::Passing, Self::Failing, Self::Flaky];

    /// Maps a summary `overall_status` string onto a bucket.
    ///
    /// Statuses outside the three buckets (`STALE`, `BROKEN`, `PENDING`, ...)
    /// map to `None`.
    pub fn from_summary(value: &str) -> Option<Self> {
        match value {
            "PASSING" => Some(Self::Passing),
            "FAILING" => Some(Self::Failing),
            "FLAKY" => Some(Self::Flaky),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passing => "PASSING",
            Self::Failing => "FAILING",
            Self::Flaky => "FLAKY",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job on a dashboard, mirroring a summary entry plus the test table
/// fetched for it.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub overall_status: OverallStatus,
    pub alert: String,
    /// Milliseconds since the epoch
    pub last_run: i64,
    /// Milliseconds since the epoch
    pub last_update: i64,
    pub latest_green: String,
    pub status_description: String,
    /// Machine-readable test table this job's results were read from
    pub url: Option<String>,
    /// Dashboard page for humans
    pub human_url: Option<String>,
    pub test_results: Option<TestResultSet>,
}

impl JobStatus {
    pub fn new(overall_status: OverallStatus) -> Self {
        Self {
            overall_status,
            alert: String::new(),
            last_run: 0,
            last_update: 0,
            latest_green: String::new(),
            status_description: String::new(),
            url: None,
            human_url: None,
            test_results: None,
        }
    }

    /// Time of the last run, when the summary reported one.
    pub fn last_run_at(&self) -> Option<DateTime<Utc>> {
        (self.last_run > 0)
            .then(|| DateTime::from_timestamp_millis(self.last_run))
            .flatten()
    }

    pub fn tests(&self) -> &[TestResult] {
        self.test_results
            .as_ref()
            .map_or(&[], |results| results.tests.as_slice())
    }
}

/// Ordered test results of one job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestResultSet {
    pub test_group_name: String,
    pub tests: Vec<TestResult>,
}

impl TestResultSet {
    pub fn new(test_group_name: impl Into<String>, tests: Vec<TestResult>) -> Self {
        Self {
            test_group_name: test_group_name.into(),
            tests,
        }
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn linked_issue_count(&self) -> usize {
        self.tests.iter().map(|t| t.linked_issues.len()).sum()
    }
}

/// Run-length encoded result cells from the test table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub count: u32,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    /// Join key against reported test names
    pub name: String,
    pub original_name: String,
    pub target: String,
    pub statuses: Vec<RunStatus>,
    pub sig: String,
    pub linked_issues: Vec<LinkedIssue>,
}

impl TestResult {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let sig = extract_sig(&name).to_string();
        Self {
            original_name: name.clone(),
            target: name.clone(),
            name,
            statuses: Vec::new(),
            sig,
            linked_issues: Vec::new(),
        }
    }
}

/// Identity of an issue filed on the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRef {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub url: String,
}

/// Back-reference from a test result to an issue reporting it as flaky,
/// together with what was extracted from that issue's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedIssue {
    pub issue: IssueRef,
    pub dashboard: String,
    pub job: String,
    pub tests: Vec<String>,
}

/// Job names per bucket, sorted, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobInventory {
    pub passing: Vec<String>,
    pub failing: Vec<String>,
    pub flaking: Vec<String>,
}

impl fmt::Display for JobInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "passing: [{}]; failing: [{}]; flaking: [{}]",
            self.passing.join(", "),
            self.failing.join(", "),
            self.flaking.join(", ")
        )
    }
}

/// Job statuses of one dashboard at a point in time.
///
/// Jobs live in exactly one of three buckets keyed by their overall status.
/// The buckets are only reachable through methods that keep that invariant.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub name: String,
    pub collected_at: DateTime<Utc>,
    pub summary_url: Option<String>,
    /// Jobs listed by the summary, including those in no bucket
    pub total_jobs: usize,
    passing: IndexMap<String, JobStatus>,
    failing: IndexMap<String, JobStatus>,
    flaking: IndexMap<String, JobStatus>,
}

impl StatusSnapshot {
    pub fn new(name: impl Into<String>, collected_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            collected_at,
            summary_url: None,
            total_jobs: 0,
            passing: IndexMap::new(),
            failing: IndexMap::new(),
            flaking: IndexMap::new(),
        }
    }

    /// Builds a snapshot from already classified jobs.
    pub fn from_jobs<I>(name: impl Into<String>, collected_at: DateTime<Utc>, jobs: I) -> Self
    where
        I: IntoIterator<Item = (String, JobStatus)>,
    {
        let mut snapshot = Self::new(name, collected_at);
        for (job, status) in jobs {
            snapshot.insert_job(job, status);
        }
        snapshot.total_jobs = snapshot.job_count();
        snapshot
    }

    fn bucket_mut(&mut self, status: OverallStatus) -> &mut IndexMap<String, JobStatus> {
        match status {
            OverallStatus::Passing => &mut self.passing,
            OverallStatus::Failing => &mut self.failing,
            OverallStatus::Flaky => &mut self.flaking,
        }
    }

    pub fn bucket(&self, status: OverallStatus) -> &IndexMap<String, JobStatus> {
        match status {
            OverallStatus::Passing => &self.passing,
            OverallStatus::Failing => &self.failing,
            OverallStatus::Flaky => &self.flaking,
        }
    }

    /// Places a job in the bucket matching its status, evicting it from any
    /// other bucket. Returns the entry it replaced.
    pub fn insert_job(&mut self, name: impl Into<String>, job: JobStatus) -> Option<JobStatus> {
        let name = name.into();
        let previous = OverallStatus::ALL
            .into_iter()
            .find_map(|status| self.bucket_mut(status).shift_remove(&name));
        self.bucket_mut(job.overall_status).insert(name, job);
        previous
    }

    pub fn job(&self, name: &str) -> Option<&JobStatus> {
        OverallStatus::ALL
            .into_iter()
            .find_map(|status| self.bucket(status).get(name))
    }

    pub fn job_mut(&mut self, name: &str) -> Option<&mut JobStatus> {
        let status = self.job_status(name)?;
        self.bucket_mut(status).get_mut(name)
    }

    pub fn jobs_mut(
        &mut self,
        status: OverallStatus,
    ) -> impl Iterator<Item = (&String, &mut JobStatus)> {
        self.bucket_mut(status).iter_mut()
    }

    pub fn is_valid_job(&self, name: &str) -> bool {
        self.job_status(name).is_some()
    }

    pub fn job_status(&self, name: &str) -> Option<OverallStatus> {
        OverallStatus::ALL
            .into_iter()
            .find(|status| self.bucket(*status).contains_key(name))
    }

    pub fn jobs_by_status(&self, status: OverallStatus) -> Vec<&str> {
        self.bucket(status).keys().map(String::as_str).collect()
    }

    pub fn inventory(&self) -> JobInventory {
        let sorted = |status| {
            let mut jobs: Vec<String> = self.bucket(status).keys().cloned().collect();
            jobs.sort();
            jobs
        };
        JobInventory {
            passing: sorted(OverallStatus::Passing),
            failing: sorted(OverallStatus::Failing),
            flaking: sorted(OverallStatus::Flaky),
        }
    }

    /// Number of jobs placed in a bucket.
    pub fn job_count(&self) -> usize {
        self.passing.len() + self.failing.len() + self.flaking.len()
    }

    /// Orders every bucket by job name so reports are stable across runs.
    pub fn sort_jobs(&mut self) {
        self.passing.sort_keys();
        self.failing.sort_keys();
        self.flaking.sort_keys();
    }

    pub fn linked_issue_count(&self) -> usize {
        self.flaking
            .values()
            .filter_map(|job| job.test_results.as_ref())
            .map(TestResultSet::linked_issue_count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot::from_jobs(
            "sig-release-master-informing",
            Utc::now(),
            vec![
                ("gce-cos".to_string(), JobStatus::new(OverallStatus::Passing)),
                ("kind-ipv6".to_string(), JobStatus::new(OverallStatus::Failing)),
                ("aws-e2e".to_string(), JobStatus::new(OverallStatus::Flaky)),
                ("azure-e2e".to_string(), JobStatus::new(OverallStatus::Flaky)),
            ],
        )
    }

    #[test]
    fn summary_statuses_map_onto_buckets() {
        assert_eq!(
            OverallStatus::from_summary("FLAKY"),
            Some(OverallStatus::Flaky)
        );
        assert_eq!(
            OverallStatus::from_summary("PASSING"),
            Some(OverallStatus::Passing)
        );
        assert_eq!(
            OverallStatus::from_summary("FAILING"),
            Some(OverallStatus::Failing)
        );
        assert_eq!(OverallStatus::from_summary("STALE"), None);
        assert_eq!(OverallStatus::from_summary("flaky"), None);
    }

    #[test]
    fn status_serializes_as_summary_string() {
        let json = serde_json::to_string(&OverallStatus::Flaky).unwrap();
        assert_eq!(json, "\"FLAKY\"");
    }

    #[test]
    fn jobs_are_partitioned_by_status() {
        let snapshot = snapshot();
        assert_eq!(snapshot.total_jobs, 4);
        assert_eq!(snapshot.job_count(), 4);
        assert_eq!(snapshot.jobs_by_status(OverallStatus::Passing), vec!["gce-cos"]);
        assert_eq!(snapshot.jobs_by_status(OverallStatus::Failing), vec!["kind-ipv6"]);
        assert_eq!(
            snapshot.jobs_by_status(OverallStatus::Flaky),
            vec!["aws-e2e", "azure-e2e"]
        );
    }

    #[test]
    fn job_status_reports_bucket_membership() {
        let snapshot = snapshot();
        assert_eq!(snapshot.job_status("gce-cos"), Some(OverallStatus::Passing));
        assert_eq!(snapshot.job_status("aws-e2e"), Some(OverallStatus::Flaky));
        assert_eq!(snapshot.job_status("missing"), None);
        assert!(snapshot.is_valid_job("kind-ipv6"));
        assert!(!snapshot.is_valid_job("missing"));
    }

    #[test]
    fn duplicate_jobs_are_counted_once() {
        let snapshot = StatusSnapshot::from_jobs(
            "sig-release-master-informing",
            Utc::now(),
            vec![
                ("gce-cos".to_string(), JobStatus::new(OverallStatus::Passing)),
                ("gce-cos".to_string(), JobStatus::new(OverallStatus::Flaky)),
            ],
        );
        assert_eq!(snapshot.total_jobs, 1);
        assert_eq!(snapshot.job_count(), 1);
        assert_eq!(snapshot.job_status("gce-cos"), Some(OverallStatus::Flaky));
    }

    #[test]
    fn reinserting_a_job_moves_it_between_buckets() {
        let mut snapshot = snapshot();
        let previous = snapshot.insert_job("gce-cos", JobStatus::new(OverallStatus::Flaky));

        assert_eq!(previous.map(|j| j.overall_status), Some(OverallStatus::Passing));
        assert!(snapshot.jobs_by_status(OverallStatus::Passing).is_empty());
        assert_eq!(snapshot.job_status("gce-cos"), Some(OverallStatus::Flaky));
        assert_eq!(snapshot.job_count(), 4);
    }

    #[test]
    fn inventory_is_sorted_per_bucket() {
        let mut snapshot = snapshot();
        snapshot.insert_job("aaa-e2e", JobStatus::new(OverallStatus::Flaky));
        let inventory = snapshot.inventory();

        assert_eq!(inventory.flaking, vec!["aaa-e2e", "aws-e2e", "azure-e2e"]);
        assert_eq!(
            inventory.to_string(),
            "passing: [gce-cos]; failing: [kind-ipv6]; flaking: [aaa-e2e, aws-e2e, azure-e2e]"
        );
    }

    #[test]
    fn sort_jobs_orders_buckets_by_name() {
        let mut snapshot = StatusSnapshot::from_jobs(
            "dash",
            Utc::now(),
            vec![
                ("zeta".to_string(), JobStatus::new(OverallStatus::Flaky)),
                ("alpha".to_string(), JobStatus::new(OverallStatus::Flaky)),
            ],
        );
        snapshot.sort_jobs();
        assert_eq!(snapshot.jobs_by_status(OverallStatus::Flaky), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_result_derives_sig_from_name() {
        let result = TestResult::new("[sig-network] Services should serve endpoints");
        assert_eq!(result.sig, "[sig-network] ");
        assert!(result.linked_issues.is_empty());

        let result = TestResult::new("Overall");
        assert_eq!(result.sig, "job-owner");
    }

    #[test]
    fn job_without_results_has_no_tests() {
        let job = JobStatus::new(OverallStatus::Flaky);
        assert!(job.tests().is_empty());
        assert_eq!(job.last_run_at(), None);
    }

    #[test]
    fn last_run_converts_from_millis() {
        let mut job = JobStatus::new(OverallStatus::Passing);
        job.last_run = 1_600_000_000_000;
        assert_eq!(job.last_run_at().map(|t| t.timestamp()), Some(1_600_000_000));
    }
}
