//! Idempotent branch/commit/PR publish workflow.
//!
//! State machine: `NoBranch -> BranchCreated -> Committed -> PrCreated`, with
//! `Failed` absorbing from any step. Steps run strictly in sequence and each
//! remote effect is awaited before the next step begins, because every
//! precondition (branch before commit, commit before PR) is enforced by the
//! remote, not locally.
//!
//! Repeated or concurrent invocations are tolerated: "already exists" on
//! branch or PR creation is success, and the branch name carries a random
//! suffix so independent runs don't collide by accident. The blob-SHA check on
//! commit is the one place a conflict is fatal — it means another actor
//! mutated the branch mid-run, and retrying would clobber their edit.

use rand::distr::{Alphanumeric, SampleString};

use crate::{
	HealError,
	config::RepoInfo,
	github::{BoxedRepoClient, RepoError},
};

const PR_TITLE: &str = "Automated fix for deployment error";
const PR_BODY: &str = "This pull request applies an automatically generated fix for a failed deployment. \
	The change was merged conservatively: only existing configuration keys mentioned by the proposed fix were touched. \
	Please review the diff before merging.";
const COMMIT_MESSAGE: &str = "Apply automated fix for deployment error";

/// What to publish: created once per invocation.
#[derive(Clone, Debug)]
pub struct PublishRequest {
	pub branch_name: String,
	pub file_path: String,
	pub new_content: String,
	pub base_branch: String,
}

impl PublishRequest {
	/// Build a request with a fresh `autoheal-fix-<random8>` branch name.
	pub fn new(file_path: String, new_content: String, base_branch: String) -> Self {
		let suffix = Alphanumeric.sample_string(&mut rand::rng(), 8).to_lowercase();
		Self {
			branch_name: format!("autoheal-fix-{suffix}"),
			file_path,
			new_content,
			base_branch,
		}
	}
}

/// Where the workflow currently stands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PublishState {
	NoBranch,
	BranchCreated,
	Committed,
	PrCreated { pr_url: Option<String> },
	Failed { reason: String },
}

/// Result of a successful publish.
#[derive(Clone, Debug)]
pub struct PublishReport {
	pub branch: String,
	/// `None` when an earlier run already opened the PR for this branch.
	pub pr_url: Option<String>,
}

pub struct PublishWorkflow {
	client: BoxedRepoClient,
	repo: RepoInfo,
	state: PublishState,
}

impl PublishWorkflow {
	pub fn new(client: BoxedRepoClient, repo: RepoInfo) -> Self {
		Self {
			client,
			repo,
			state: PublishState::NoBranch,
		}
	}

	pub fn state(&self) -> &PublishState {
		&self.state
	}

	/// Drive the state machine to completion.
	///
	/// On error the workflow lands in `Failed` and the error is returned; no
	/// step is retried within a run.
	pub async fn run(&mut self, request: &PublishRequest) -> Result<PublishReport, HealError> {
		match self.drive(request).await {
			Ok(report) => Ok(report),
			Err(e) => {
				self.state = PublishState::Failed { reason: e.to_string() };
				Err(e)
			}
		}
	}

	async fn drive(&mut self, request: &PublishRequest) -> Result<PublishReport, HealError> {
		// Branch creation. "Already exists" means a concurrent or retried run
		// got here first; proceed with the existing branch.
		let base_sha = self.client.get_head_sha(&self.repo, &request.base_branch).await?;
		match self.client.create_ref(&self.repo, &request.branch_name, &base_sha).await {
			Ok(()) => tracing::info!(branch = request.branch_name, %base_sha, "created fix branch"),
			Err(RepoError::AlreadyExists(_)) => tracing::info!(branch = request.branch_name, "fix branch already exists, reusing"),
			Err(e) => return Err(e.into()),
		}
		self.state = PublishState::BranchCreated;

		// Commit. The blob SHA read here is what the contents API compares
		// against; a mismatch on update is fatal, not retried.
		let file_sha = self.client.get_file_sha(&self.repo, &request.file_path, &request.branch_name).await?;
		self.client
			.update_file(&self.repo, &request.file_path, COMMIT_MESSAGE, &request.new_content, &file_sha, &request.branch_name)
			.await?;
		self.state = PublishState::Committed;
		tracing::info!(path = request.file_path, branch = request.branch_name, "committed fix");

		// PR creation, idempotent on "already exists".
		let pr_url = match self.client.create_pull_request(&self.repo, PR_TITLE, PR_BODY, &request.branch_name, &request.base_branch).await {
			Ok(url) => {
				tracing::info!(url, "opened pull request");
				Some(url)
			}
			Err(RepoError::AlreadyExists(_)) => {
				tracing::info!(branch = request.branch_name, "pull request already open for this branch");
				None
			}
			Err(RepoError::PermissionDenied(message)) =>
				return Err(HealError::Permission {
					message: format!("cannot open a pull request on {}: {message}. The credential needs contents write and pull-request create scope.", self.repo),
				}),
			Err(e) => return Err(e.into()),
		};
		self.state = PublishState::PrCreated { pr_url: pr_url.clone() };

		Ok(PublishReport {
			branch: request.branch_name.clone(),
			pr_url,
		})
	}
}
