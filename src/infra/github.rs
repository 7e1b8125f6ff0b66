use anyhow::{anyhow, Context};
use async_trait::async_trait;
use log::info;

use crate::domain::error::LifecycleError;
use crate::domain::port::PullRequestHost;

const GITHUB_API: &str = "https://api.github.com";

/// Marker prepended to the preview comment so a later run can find and
/// update its own comment instead of stacking new ones.
const COMMENT_MARKER: &str = "<!-- previewctl -->";

pub struct GithubClient {
    owner: String,
    repo: String,
    token: String,
    client: reqwest::Client,
}

#[derive(serde_derive::Deserialize)]
struct PullRequest {
    number: u64,
}

#[derive(serde_derive::Deserialize)]
struct Comment {
    id: u64,
    body: String,
}

impl GithubClient {
    pub fn new(repository: &str, token: &str) -> Result<Self, LifecycleError> {
        let (owner, repo) = repository.split_once('/').ok_or_else(|| {
            LifecycleError::Configuration(format!(
                "github_repo must be 'owner/repo', got '{repository}'"
            ))
        })?;
        let client = reqwest::Client::builder()
            .user_agent("previewctl")
            .build()
            .context("Can't build http client")?;
        Ok(GithubClient {
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{GITHUB_API}/repos/{}/{}{path}", self.owner, self.repo)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, LifecycleError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .context("github request failed")?;
        if !response.status().is_success() {
            return Err(LifecycleError::Other(anyhow!(
                "github returned status {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

/// Listing path for the comments of one PR. A single 100-entry page; the
/// marker comment is posted early in a PR's life, so it sits well within it.
fn comments_page_path(pr_number: u64) -> String {
    format!("/issues/{pr_number}/comments?per_page=100")
}

#[async_trait]
impl PullRequestHost for GithubClient {
    async fn list_open_prs(&self) -> Result<Vec<u64>, LifecycleError> {
        let response = self
            .send(self.client.get(self.url(
                "/pulls?state=open&sort=created&direction=asc&per_page=100",
            )))
            .await?;
        let pulls: Vec<PullRequest> = response
            .json()
            .await
            .context("can't decode pull request listing")?;
        Ok(pulls.into_iter().map(|pr| pr.number).collect())
    }

    async fn upsert_comment(&self, pr_number: u64, body: &str) -> Result<(), LifecycleError> {
        let body = format!("{COMMENT_MARKER}\n{body}");
        let comments: Vec<Comment> = self
            .send(self.client.get(self.url(&comments_page_path(pr_number))))
            .await?
            .json()
            .await
            .context("can't decode comment listing")?;

        match comments.iter().find(|c| c.body.starts_with(COMMENT_MARKER)) {
            Some(existing) => {
                info!("updating preview comment {} on pr {}", existing.id, pr_number);
                self.send(
                    self.client
                        .patch(self.url(&format!("/issues/comments/{}", existing.id)))
                        .json(&serde_json::json!({ "body": body })),
                )
                .await?;
            }
            None => {
                info!("posting preview comment on pr {}", pr_number);
                self.send(
                    self.client
                        .post(self.url(&format!("/issues/{pr_number}/comments")))
                        .json(&serde_json::json!({ "body": body })),
                )
                .await?;
            }
        }
        Ok(())
    }
}
