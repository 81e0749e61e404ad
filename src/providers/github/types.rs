use serde::Deserialize;
use url::Url;

use crate::error::{FlakeTrackerError, Result};
use crate::flakes::ReportedIssue;
use crate::status::IssueRef;

/// Column of a classic GitHub project board.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectColumn {
    pub id: u64,
    pub name: String,
}

/// Card on a project column. Issue cards carry a `content_url`, note cards
/// only a `note`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCard {
    pub id: u64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub content_url: Option<String>,
}

impl ProjectCard {
    pub fn content_url(&self) -> Option<&str> {
        self.content_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Issue as returned by the issues API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
}

impl GitHubIssue {
    pub fn into_reported(self) -> ReportedIssue {
        ReportedIssue {
            issue: IssueRef {
                id: self.id,
                number: self.number,
                title: self.title,
                url: self.html_url,
            },
            body: self.body.unwrap_or_default(),
        }
    }
}

/// Repository coordinates of an issue referenced by a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueLocator {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl IssueLocator {
    /// Parses `.../repos/{owner}/{repo}/issues/{number}`.
    pub fn from_content_url(content_url: &str) -> Result<Self> {
        let invalid = || FlakeTrackerError::InvalidContentUrl(content_url.to_string());

        let url = Url::parse(content_url).map_err(|_| invalid())?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [.., owner, repo, "issues", number] => Ok(Self {
                owner: (*owner).to_string(),
                repo: (*repo).to_string(),
                number: number.parse().map_err(|_| invalid())?,
            }),
            _ => Err(invalid()),
        }
    }
}
