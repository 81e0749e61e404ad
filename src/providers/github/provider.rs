use log::{debug, info, warn};

use crate::auth::Token;
use crate::error::{FlakeTrackerError, Result};
use crate::flakes::ReportedIssue;

use super::client::GitHubClient;
use super::types::IssueLocator;

/// Pulls reported flakes off a GitHub project board.
pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    /// Create a provider for the GitHub API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FlakeTrackerError::Config`] when no token is available,
    /// since the project board endpoints reject anonymous requests.
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let token = token.ok_or_else(|| {
            FlakeTrackerError::Config(
                "A GitHub token is required: set GITHUB_AUTH_TOKEN, pass --token or add github.token to the config file"
                    .to_string(),
            )
        })?;

        Ok(Self {
            client: GitHubClient::new(base_url, &token)?,
        })
    }

    /// Fetch the issues on board `board_id`, column by column.
    ///
    /// When `columns` is non-empty only columns with those ids are read.
    /// Note cards, cards whose content URL is not an issue, and issues that
    /// fail to load are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the column or card listings fail.
    pub async fn collect_board_issues(
        &self,
        board_id: u64,
        columns: &[u64],
    ) -> Result<Vec<ReportedIssue>> {
        info!("Fetching reported flakes from project board {board_id}");

        let board_columns = self.client.list_columns(board_id).await?;
        let mut issues = Vec::new();

        for column in board_columns {
            if !columns.is_empty() && !columns.contains(&column.id) {
                debug!("Skipping column {} ({})", column.name, column.id);
                continue;
            }

            let cards = self.client.list_cards(column.id).await?;
            let mut fetched = 0;

            for card in cards {
                let Some(content_url) = card.content_url() else {
                    warn!(
                        "Card {} in column {} is a note, skipping it: {:?}",
                        card.id,
                        column.name,
                        card.note.as_deref().unwrap_or_default()
                    );
                    continue;
                };

                let locator = match IssueLocator::from_content_url(content_url) {
                    Ok(locator) => locator,
                    Err(e) => {
                        warn!("Card {} in column {}: {e}", card.id, column.name);
                        continue;
                    }
                };

                match self.client.fetch_issue(&locator).await {
                    Ok(issue) => {
                        issues.push(issue.into_reported());
                        fetched += 1;
                    }
                    Err(e) => warn!(
                        "Failed to fetch issue {}/{}#{}: {e}",
                        locator.owner, locator.repo, locator.number
                    ),
                }
            }

            info!("Column {}: {fetched} issues", column.name);
        }

        info!("Fetched {} reported flakes from board {board_id}", issues.len());
        Ok(issues)
    }
}
