use chrono::Utc;
use log::{debug, info, warn};

use crate::error::Result;
use crate::status::{OverallStatus, StatusSnapshot, TestResultSet};

use super::client::TestGridClient;
use super::links::{job_human_url, job_table_url, summary_url};

/// Builds [`StatusSnapshot`]s from a TestGrid instance.
pub struct TestGridProvider {
    client: TestGridClient,
}

impl TestGridProvider {
    /// Creates a provider for the TestGrid instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: TestGridClient::new(base_url)?,
        })
    }

    /// Fetches the dashboard summary and sorts its jobs into buckets.
    ///
    /// Jobs are ordered by name and every job gets its human-readable URL.
    /// Test results are not fetched yet, see [`Self::collect_test_results`].
    ///
    /// # Errors
    ///
    /// Returns an error if the summary request fails or cannot be decoded.
    pub async fn fetch_snapshot(&self, dashboard: &str) -> Result<StatusSnapshot> {
        info!("Fetching job status summary for dashboard: {dashboard}");
        let base_url = self.client.base_url();

        let summary = self.client.fetch_summary(dashboard).await?;

        let mut snapshot = StatusSnapshot::new(dashboard, Utc::now());
        snapshot.summary_url = Some(summary_url(base_url, dashboard)?.to_string());
        snapshot.total_jobs = summary.len();

        for (name, entry) in summary {
            let status = entry.overall_status().to_string();
            match entry.into_job_status() {
                Some(job) => {
                    snapshot.insert_job(name, job);
                }
                None => debug!("Job {name} has status {status:?}, leaving it out of every bucket"),
            }
        }
        snapshot.sort_jobs();

        for status in OverallStatus::ALL {
            for (name, job) in snapshot.jobs_mut(status) {
                job.human_url = Some(job_human_url(base_url, dashboard, name)?);
            }
        }

        info!(
            "Dashboard {dashboard}: {} jobs ({} flaking, {} failing, {} passing)",
            snapshot.total_jobs,
            snapshot.bucket(OverallStatus::Flaky).len(),
            snapshot.bucket(OverallStatus::Failing).len(),
            snapshot.bucket(OverallStatus::Passing).len(),
        );

        Ok(snapshot)
    }

    /// Fetches the test table of every flaking and failing job, one job at a
    /// time. Returns the number of tables fetched.
    ///
    /// # Errors
    ///
    /// Returns the first request or decoding error.
    pub async fn collect_test_results(&self, snapshot: &mut StatusSnapshot) -> Result<usize> {
        let dashboard = snapshot.name.clone();
        let base_url = self.client.base_url();
        let mut fetched = 0;

        for status in [OverallStatus::Flaky, OverallStatus::Failing] {
            for (name, job) in snapshot.jobs_mut(status) {
                debug!("Fetching test results for {status} job {name}");
                let table = self.client.fetch_job_table(&dashboard, name).await?;
                let results = TestResultSet::from(table);
                if results.is_empty() {
                    warn!("{status} job {name} reported no failing tests");
                }
                job.url = Some(job_table_url(base_url, &dashboard, name)?.to_string());
                job.test_results = Some(results);
                fetched += 1;
            }
        }

        info!("Fetched test results for {fetched} jobs");
        Ok(fetched)
    }

    /// Snapshot of a dashboard with test results for flaking and failing jobs.
    pub async fn collect_status(&self, dashboard: &str) -> Result<StatusSnapshot> {
        let mut snapshot = self.fetch_snapshot(dashboard).await?;
        self.collect_test_results(&mut snapshot).await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const SUMMARY: &str = r#"{
        "gce-cos": {"overall_status": "PASSING", "last_run_timestamp": 1612345678000},
        "kind-ipv6": {"overall_status": "FAILING"},
        "aws-e2e": {"overall_status": "FLAKY", "latest_green": "42"},
        "old-job": {"overall_status": "STALE"}
    }"#;

    async fn mock_table(server: &mut Server, job: &str, body: &str) -> mockito::Mock {
        server
            .mock("GET", Matcher::Regex("^/dash/table".to_string()))
            .match_query(Matcher::UrlEncoded("tab".into(), job.into()))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_collect_status_builds_snapshot() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/dash/summary")
            .with_status(200)
            .with_body(SUMMARY)
            .create_async()
            .await;
        let flaky = mock_table(
            &mut server,
            "aws-e2e",
            r#"{"test-group-name": "aws-e2e", "tests": [
                {"name": "[sig-network] Services should serve endpoints"},
                {"name": "Overall"}
            ]}"#,
        )
        .await;
        let failing = mock_table(
            &mut server,
            "kind-ipv6",
            r#"{"test-group-name": "kind-ipv6", "tests": [{"name": "[sig-node] Pods"}]}"#,
        )
        .await;

        let provider = TestGridProvider::new(&server.url()).unwrap();
        let snapshot = provider.collect_status("dash").await.unwrap();

        flaky.assert_async().await;
        failing.assert_async().await;

        assert_eq!(snapshot.name, "dash");
        assert_eq!(snapshot.total_jobs, 4);
        assert_eq!(snapshot.job_count(), 3);
        assert_eq!(snapshot.job_status("old-job"), None);
        assert_eq!(
            snapshot.summary_url.as_deref(),
            Some(format!("{}/dash/summary", server.url()).as_str())
        );

        let aws = snapshot.job("aws-e2e").unwrap();
        assert_eq!(aws.latest_green, "42");
        assert_eq!(aws.tests().len(), 2);
        assert_eq!(aws.tests()[0].sig, "[sig-network] ");
        assert_eq!(aws.tests()[1].sig, "job-owner");
        assert!(aws.url.as_deref().unwrap().contains("tab=aws-e2e"));
        assert_eq!(
            aws.human_url.as_deref(),
            Some(format!("{}/dash#aws-e2e&exclude-non-failed-tests=", server.url()).as_str())
        );

        let kind = snapshot.job("kind-ipv6").unwrap();
        assert_eq!(kind.tests()[0].sig, "[sig-node] ");

        let gce = snapshot.job("gce-cos").unwrap();
        assert!(gce.test_results.is_none());
        assert!(gce.human_url.is_some());
        assert!(gce.last_run_at().is_some());
    }

    #[tokio::test]
    async fn test_fetch_snapshot_sorts_jobs() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/dash/summary")
            .with_status(200)
            .with_body(r#"{"zeta": {"overall_status": "FLAKY"}, "alpha": {"overall_status": "FLAKY"}}"#)
            .create_async()
            .await;

        let provider = TestGridProvider::new(&server.url()).unwrap();
        let snapshot = provider.fetch_snapshot("dash").await.unwrap();

        assert_eq!(
            snapshot.jobs_by_status(OverallStatus::Flaky),
            vec!["alpha", "zeta"]
        );
    }

    #[tokio::test]
    async fn test_table_failure_is_returned() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/dash/summary")
            .with_status(200)
            .with_body(r#"{"aws-e2e": {"overall_status": "FLAKY"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", Matcher::Regex("^/dash/table".to_string()))
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let provider = TestGridProvider::new(&server.url()).unwrap();
        assert!(provider.collect_status("dash").await.is_err());
    }
}
