use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{FlakeTrackerError, Result};

use super::types::{GitHubIssue, IssueLocator, ProjectCard, ProjectColumn};

const PER_PAGE: usize = 100;
const PROJECTS_PREVIEW: &str = "application/vnd.github.inertia-preview+json";

/// GitHub API client for classic project boards and issues.
#[derive(Clone)]
pub struct GitHubClient {
    /// HTTP client
    client: reqwest::Client,
    /// Base URL for GitHub API
    base_url: Url,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `token` - Personal access token sent as a bearer token
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` does not parse or the token is not a
    /// valid header value.
    pub fn new(base_url: &str, token: &Token) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("flake-tracker/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(PROJECTS_PREVIEW));

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
            .map_err(|_| FlakeTrackerError::Config("GitHub token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| FlakeTrackerError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| FlakeTrackerError::Config(format!("Invalid GitHub URL: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FlakeTrackerError::Config(format!("Invalid GitHub URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
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

    /// Walks `page=1,2,...` until a page comes back shorter than `PER_PAGE`.
    async fn get_paginated<T>(&self, segments: &[&str]) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let mut url = self.endpoint(segments)?;
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let batch: Vec<T> = self.get_json(url).await?;
            let batch_len = batch.len();
            items.extend(batch);

            if batch_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Lists the columns of project board `board_id`.
    pub async fn list_columns(&self, board_id: u64) -> Result<Vec<ProjectColumn>> {
        let board = board_id.to_string();
        self.get_paginated(&["projects", &board, "columns"]).await
    }

    /// Lists every card of column `column_id`.
    pub async fn list_cards(&self, column_id: u64) -> Result<Vec<ProjectCard>> {
        let column = column_id.to_string();
        self.get_paginated(&["projects", "columns", &column, "cards"])
            .await
    }

    pub async fn fetch_issue(&self, locator: &IssueLocator) -> Result<GitHubIssue> {
        let number = locator.number.to_string();
        let url = self.endpoint(&["repos", &locator.owner, &locator.repo, "issues", &number])?;
        self.get_json(url).await
    }
}
