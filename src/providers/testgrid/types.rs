use indexmap::IndexMap;
use serde::Deserialize;

use crate::status::{JobStatus, OverallStatus, RunStatus, TestResult, TestResultSet};

/// Dashboard summary: job name to summary entry, in server order.
pub type DashboardSummary = IndexMap<String, SummaryEntry>;

/// One job of the dashboard summary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SummaryEntry {
    pub overall_status: Option<String>,
    pub alert: Option<String>,
    #[serde(rename = "last_run_timestamp")]
    pub last_run: Option<i64>,
    #[serde(rename = "last_update_timestamp")]
    pub last_update: Option<i64>,
    pub latest_green: Option<String>,
    pub status: Option<String>,
}

impl SummaryEntry {
    pub fn overall_status(&self) -> &str {
        self.overall_status.as_deref().unwrap_or_default()
    }

    /// Converts the entry into a job status, or `None` when its overall
    /// status is not one the snapshot buckets.
    pub fn into_job_status(self) -> Option<JobStatus> {
        let overall_status = OverallStatus::from_summary(self.overall_status())?;
        let mut job = JobStatus::new(overall_status);
        job.alert = self.alert.unwrap_or_default();
        job.last_run = self.last_run.unwrap_or_default();
        job.last_update = self.last_update.unwrap_or_default();
        job.latest_green = self.latest_green.unwrap_or_default();
        job.status_description = self.status.unwrap_or_default();
        Some(job)
    }
}

/// Test table of one job. Only the fields reports use are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobTable {
    #[serde(rename = "test-group-name", default)]
    pub test_group_name: String,
    #[serde(default)]
    pub tests: Vec<TableTest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableTest {
    pub name: String,
    #[serde(rename = "original-name", default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub statuses: Vec<RunStatus>,
}

impl From<TableTest> for TestResult {
    fn from(test: TableTest) -> Self {
        let mut result = TestResult::new(test.name);
        if let Some(original_name) = test.original_name.filter(|n| !n.is_empty()) {
            result.original_name = original_name;
        }
        if let Some(target) = test.target.filter(|t| !t.is_empty()) {
            result.target = target;
        }
        result.statuses = test.statuses;
        result
    }
}

impl From<JobTable> for TestResultSet {
    fn from(table: JobTable) -> Self {
        TestResultSet::new(
            table.test_group_name,
            table.tests.into_iter().map(TestResult::from).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_entry_deserialization() {
        let json = r#"{
            "gce-cos-master-default": {
                "alert": "",
                "last_run_timestamp": 1612345678000,
                "last_update_timestamp": 1612345699000,
                "latest_green": "1356789",
                "overall_status": "FLAKY",
                "overall_status_icon": "remove_circle_outline",
                "status": "7 of 9 (77.8%) recent columns passed (19491 of 19493 or 99.9% cells)",
                "tests": [],
                "dashboard_name": "sig-release-master-blocking"
            },
            "kind-ipv6": {
                "alert": null,
                "overall_status": "STALE"
            }
        }"#;

        let summary: DashboardSummary = serde_json::from_str(json).unwrap();
        assert_eq!(
            summary.keys().collect::<Vec<_>>(),
            vec!["gce-cos-master-default", "kind-ipv6"]
        );

        let job = summary["gce-cos-master-default"].clone().into_job_status().unwrap();
        assert_eq!(job.overall_status, OverallStatus::Flaky);
        assert_eq!(job.last_run, 1_612_345_678_000);
        assert_eq!(job.latest_green, "1356789");
        assert!(job.status_description.starts_with("7 of 9"));

        assert!(summary["kind-ipv6"].clone().into_job_status().is_none());
    }

    #[test]
    fn test_job_table_conversion_assigns_sigs() {
        let json = r#"{
            "test-group-name": "ci-kubernetes-e2e-gci-gce",
            "query": "gs://kubernetes-jenkins/logs/ci-kubernetes-e2e-gci-gce",
            "tests": [
                {
                    "name": "[sig-network] Services should serve endpoints",
                    "original-name": "[sig-network] Services should serve endpoints",
                    "alert": null,
                    "linked_bugs": [],
                    "messages": ["", ""],
                    "short_texts": ["F", ""],
                    "statuses": [{"count": 1, "value": 12}, {"count": 4, "value": 1}],
                    "target": "[sig-network] Services should serve endpoints",
                    "user_property": null
                },
                {
                    "name": "Overall",
                    "statuses": []
                }
            ]
        }"#;

        let table: JobTable = serde_json::from_str(json).unwrap();
        let results = TestResultSet::from(table);

        assert_eq!(results.test_group_name, "ci-kubernetes-e2e-gci-gce");
        assert_eq!(results.len(), 2);
        assert_eq!(results.tests[0].sig, "[sig-network] ");
        assert_eq!(
            results.tests[0].statuses,
            vec![
                RunStatus { count: 1, value: 12 },
                RunStatus { count: 4, value: 1 }
            ]
        );
        assert_eq!(results.tests[1].sig, "job-owner");
        assert_eq!(results.tests[1].original_name, "Overall");
        assert!(results.tests.iter().all(|t| t.linked_issues.is_empty()));
    }
}
