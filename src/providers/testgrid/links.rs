use url::Url;

use crate::error::{FlakeTrackerError, Result};

fn dashboard_url(base_url: &Url, dashboard: &str, tail: Option<&str>) -> Result<Url> {
    let mut url = base_url.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|()| {
            FlakeTrackerError::Config(format!("TestGrid URL cannot be a base: {base_url}"))
        })?;
        segments.pop_if_empty().push(dashboard);
        if let Some(tail) = tail {
            segments.push(tail);
        }
    }
    Ok(url)
}

/// Summary endpoint listing every job of a dashboard with its overall status.
///
/// e.g. <https://testgrid.k8s.io/sig-release-master-informing/summary>
pub fn summary_url(base_url: &Url, dashboard: &str) -> Result<Url> {
    dashboard_url(base_url, dashboard, Some("summary"))
}

/// Table endpoint with the per-test results of one job, flakiest first and
/// limited to tests that failed at least once.
pub fn job_table_url(base_url: &Url, dashboard: &str, job: &str) -> Result<Url> {
    let mut url = dashboard_url(base_url, dashboard, Some("table"))?;
    url.query_pairs_mut()
        .append_pair("tab", job)
        .append_pair("width", "5")
        .append_pair("exclude-non-failed-tests", "")
        .append_pair("sort-by-flakiness", "")
        .append_pair("dashboard", dashboard);
    Ok(url)
}

/// Dashboard page for one job, as a person would open it.
///
/// e.g. <https://testgrid.k8s.io/sig-release-master-informing#gce-cos-master-default&exclude-non-failed-tests=>
pub fn job_human_url(base_url: &Url, dashboard: &str, job: &str) -> Result<String> {
    let mut url = dashboard_url(base_url, dashboard, None)?;
    url.set_fragment(Some(&format!("{job}&exclude-non-failed-tests=")));
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://testgrid.k8s.io").unwrap()
    }

    #[test]
    fn test_summary_url() {
        let url = summary_url(&base(), "sig-release-master-informing").unwrap();
        assert_eq!(
            url.as_str(),
            "https://testgrid.k8s.io/sig-release-master-informing/summary"
        );
    }

    #[test]
    fn test_job_table_url() {
        let url = job_table_url(&base(), "sig-release-master-informing", "gce-cos").unwrap();
        assert_eq!(
            url.as_str(),
            "https://testgrid.k8s.io/sig-release-master-informing/table?tab=gce-cos&width=5&exclude-non-failed-tests=&sort-by-flakiness=&dashboard=sig-release-master-informing"
        );
    }

    #[test]
    fn test_job_table_url_encodes_job_name() {
        let url = job_table_url(&base(), "dash", "e2e job+1").unwrap();
        assert!(url.as_str().contains("tab=e2e+job%2B1&"));
    }

    #[test]
    fn test_job_human_url() {
        let url = job_human_url(&base(), "sig-release-master-blocking", "gce-cos-master-default")
            .unwrap();
        assert_eq!(
            url,
            "https://testgrid.k8s.io/sig-release-master-blocking#gce-cos-master-default&exclude-non-failed-tests="
        );
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let base = Url::parse("http://localhost:8080/testgrid/").unwrap();
        let url = summary_url(&base, "dash").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/testgrid/dash/summary");
    }
}
