//! GitHub repository operations for the publish workflow.
//!
//! All remote mutations go through the [`RepoClient`] trait so the workflow's
//! state machine can be exercised against an in-memory mock (see
//! `mock_github`) without live network access. The real implementation talks
//! to the REST API with a timeout-bounded `reqwest` client.
//!
//! Every operation reports a distinguishable outcome via [`RepoError`]:
//! "already exists" (idempotent, absorbed by the workflow), "permission
//! denied" (fatal, actionable), and everything else.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{RepoInfo, Settings};

pub type BoxedRepoClient = Arc<dyn RepoClient>;

/// Outcome taxonomy for repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
	/// The ref or pull request already exists. Idempotent success for the
	/// workflow, never fatal.
	#[error("{0} already exists")]
	AlreadyExists(String),

	/// Remote authorization failure. Fatal: retrying with the same credential
	/// cannot succeed.
	#[error("{0}")]
	PermissionDenied(String),

	/// The requested branch or file does not exist on the remote.
	#[error("{0} not found")]
	NotFound(String),

	/// Connectivity or timeout failure.
	#[error("network error")]
	Network(#[from] reqwest::Error),

	/// Any other non-2xx response.
	#[error("{context}: {status} - {body}")]
	Api { context: &'static str, status: StatusCode, body: String },
}

/// Trait defining the repository operations the publish workflow needs.
///
/// Deliberately narrow: head-SHA lookup, ref creation, blob-SHA lookup, file
/// update, PR creation. The remote's SHA checks are the concurrency-control
/// mechanism; nothing is cached locally.
#[async_trait]
pub trait RepoClient: Send + Sync {
	/// SHA of the head commit of `branch`.
	async fn get_head_sha(&self, repo: &RepoInfo, branch: &str) -> Result<String, RepoError>;

	/// Create branch `name` pointing at `sha`.
	async fn create_ref(&self, repo: &RepoInfo, name: &str, sha: &str) -> Result<(), RepoError>;

	/// Current blob SHA of `path` on `branch`, required by `update_file` to
	/// detect concurrent edits.
	async fn get_file_sha(&self, repo: &RepoInfo, path: &str, branch: &str) -> Result<String, RepoError>;

	/// Commit `content` to `path` on `branch`. `sha` must match the current
	/// blob SHA or the remote rejects the update.
	async fn update_file(&self, repo: &RepoInfo, path: &str, message: &str, content: &str, sha: &str, branch: &str) -> Result<(), RepoError>;

	/// Open a pull request from `head` into `base`. Returns its URL.
	async fn create_pull_request(&self, repo: &RepoInfo, title: &str, body: &str, head: &str, base: &str) -> Result<String, RepoError>;
}

//==============================================================================
// Real client
//==============================================================================

/// Repository client backed by the GitHub REST API.
pub struct RealRepoClient {
	http_client: Client,
	github_token: String,
}

impl RealRepoClient {
	pub fn new(settings: &Settings) -> Result<Self, crate::HealError> {
		let github_token = settings.github_token.clone().ok_or(crate::HealError::MissingCredential { var: "GITHUB_TOKEN" })?;
		let http_client = Client::builder().timeout(settings.api_timeout).build().map_err(crate::HealError::Network)?;
		Ok(Self { http_client, github_token })
	}

	fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
		self.http_client
			.request(method, url)
			.header("User-Agent", "autoheal")
			.header("Accept", "application/vnd.github+json")
			.header("Authorization", format!("token {}", self.github_token))
	}

	fn get(&self, url: &str) -> reqwest::RequestBuilder {
		self.request(reqwest::Method::GET, url)
	}

	fn post(&self, url: &str) -> reqwest::RequestBuilder {
		self.request(reqwest::Method::POST, url)
	}

	fn put(&self, url: &str) -> reqwest::RequestBuilder {
		self.request(reqwest::Method::PUT, url)
	}
}

/// Map a non-success response onto the outcome taxonomy.
///
/// GitHub reports both "ref exists" and "PR exists" as 422 with an explanatory
/// body, so the body text is part of the classification.
async fn classify_failure(res: reqwest::Response, context: &'static str) -> RepoError {
	let status = res.status();
	let body = res.text().await.unwrap_or_default();

	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RepoError::PermissionDenied(format!("{context}: {status} - {body}")),
		StatusCode::NOT_FOUND => RepoError::NotFound(context.to_string()),
		StatusCode::UNPROCESSABLE_ENTITY if body.to_lowercase().contains("already exists") => RepoError::AlreadyExists(context.to_string()),
		_ => RepoError::Api { context, status, body },
	}
}

#[derive(Deserialize)]
struct RefObject {
	object: RefTarget,
}

#[derive(Deserialize)]
struct RefTarget {
	sha: String,
}

#[derive(Deserialize)]
struct FileContents {
	sha: String,
}

#[derive(Deserialize)]
struct CreatedPullRequest {
	html_url: String,
}

#[async_trait]
impl RepoClient for RealRepoClient {
	async fn get_head_sha(&self, repo: &RepoInfo, branch: &str) -> Result<String, RepoError> {
		let url = format!("https://api.github.com/repos/{}/{}/git/ref/heads/{branch}", repo.owner(), repo.repo());
		let res = self.get(&url).send().await?;

		if !res.status().is_success() {
			return Err(classify_failure(res, "failed to read branch head").await);
		}

		let git_ref = res.json::<RefObject>().await?;
		Ok(git_ref.object.sha)
	}

	async fn create_ref(&self, repo: &RepoInfo, name: &str, sha: &str) -> Result<(), RepoError> {
		let url = format!("https://api.github.com/repos/{}/{}/git/refs", repo.owner(), repo.repo());
		let json = serde_json::json!({ "ref": format!("refs/heads/{name}"), "sha": sha });
		let res = self.post(&url).json(&json).send().await?;

		if !res.status().is_success() {
			return Err(classify_failure(res, "failed to create branch").await);
		}

		Ok(())
	}

	async fn get_file_sha(&self, repo: &RepoInfo, path: &str, branch: &str) -> Result<String, RepoError> {
		let url = format!("https://api.github.com/repos/{}/{}/contents/{path}?ref={branch}", repo.owner(), repo.repo());
		let res = self.get(&url).send().await?;

		if !res.status().is_success() {
			return Err(classify_failure(res, "failed to read file blob").await);
		}

		let contents = res.json::<FileContents>().await?;
		Ok(contents.sha)
	}

	async fn update_file(&self, repo: &RepoInfo, path: &str, message: &str, content: &str, sha: &str, branch: &str) -> Result<(), RepoError> {
		let url = format!("https://api.github.com/repos/{}/{}/contents/{path}", repo.owner(), repo.repo());
		let json = serde_json::json!({
			"message": message,
			"content": BASE64.encode(content),
			"sha": sha,
			"branch": branch,
		});
		let res = self.put(&url).json(&json).send().await?;

		if !res.status().is_success() {
			return Err(classify_failure(res, "failed to commit file").await);
		}

		Ok(())
	}

	async fn create_pull_request(&self, repo: &RepoInfo, title: &str, body: &str, head: &str, base: &str) -> Result<String, RepoError> {
		let url = format!("https://api.github.com/repos/{}/{}/pulls", repo.owner(), repo.repo());
		let json = serde_json::json!({ "title": title, "body": body, "head": head, "base": base });
		let res = self.post(&url).json(&json).send().await?;

		if !res.status().is_success() {
			return Err(classify_failure(res, "failed to create pull request").await);
		}

		let pr = res.json::<CreatedPullRequest>().await?;
		Ok(pr.html_url)
	}
}
