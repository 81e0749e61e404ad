use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{FlakeTrackerError, Result};

use super::links::{job_table_url, summary_url};
use super::types::{DashboardSummary, JobTable};

/// Read-only client for the TestGrid JSON endpoints.
///
/// Every request is attempted once; failures are returned to the caller.
pub struct TestGridClient {
    client: Client,
    base_url: Url,
}

impl TestGridClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("flake-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FlakeTrackerError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| FlakeTrackerError::Config(format!("Invalid TestGrid URL: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(FlakeTrackerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn fetch_summary(&self, dashboard: &str) -> Result<DashboardSummary> {
        self.get_json(summary_url(&self.base_url, dashboard)?).await
    }

    pub async fn fetch_job_table(&self, dashboard: &str, job: &str) -> Result<JobTable> {
        self.get_json(job_table_url(&self.base_url, dashboard, job)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_fetch_summary() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/sig-release-master-informing/summary")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"gce-cos": {"overall_status": "PASSING"}}"#)
            .create_async()
            .await;

        let client = TestGridClient::new(&server.url()).unwrap();
        let summary = client
            .fetch_summary("sig-release-master-informing")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(summary["gce-cos"].overall_status(), "PASSING");
    }

    #[tokio::test]
    async fn test_fetch_job_table_sends_table_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex("^/dash/table".to_string()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("tab".into(), "e2e-job".into()),
                Matcher::UrlEncoded("width".into(), "5".into()),
                Matcher::UrlEncoded("dashboard".into(), "dash".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"test-group-name": "e2e-job", "tests": [{"name": "Overall"}]}"#)
            .create_async()
            .await;

        let client = TestGridClient::new(&server.url()).unwrap();
        let table = client.fetch_job_table("dash", "e2e-job").await.unwrap();

        mock.assert_async().await;
        assert_eq!(table.test_group_name, "e2e-job");
        assert_eq!(table.tests.len(), 1);
    }

    #[tokio::test]
    async fn test_http_error_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing/summary")
            .with_status(404)
            .with_body("dashboard not found")
            .create_async()
            .await;

        let client = TestGridClient::new(&server.url()).unwrap();
        let err = client.fetch_summary("missing").await.unwrap_err();

        match err {
            FlakeTrackerError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "dashboard not found");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/dash/summary")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = TestGridClient::new(&server.url()).unwrap();
        let err = client.fetch_summary("dash").await.unwrap_err();

        assert!(matches!(err, FlakeTrackerError::Json(_)));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            TestGridClient::new("not a url"),
            Err(FlakeTrackerError::Config(_))
        ));
    }
}
