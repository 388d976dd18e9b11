//! Mock repository client for testing purposes.
//!
//! Implements [`RepoClient`](crate::github::RepoClient) entirely in memory so
//! the publish workflow's state machine can be driven deterministically,
//! including the idempotent "already exists" and the fatal "permission denied"
//! outcomes, without hitting the real API.

use std::{
	collections::HashMap,
	sync::{
		Mutex,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
};

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::instrument;

use crate::{
	config::RepoInfo,
	github::{RepoClient, RepoError},
};

/// A pull request recorded by the mock.
#[derive(Clone, Debug)]
pub struct MockPullRequest {
	pub title: String,
	pub body: String,
	pub head: String,
	pub base: String,
	pub url: String,
}

#[derive(Clone, Debug)]
struct MockFile {
	content: String,
	sha: String,
}

#[derive(Default)]
struct MockRepoState {
	/// branch -> head commit sha
	branches: HashMap<String, String>,
	/// branch -> path -> file
	files: HashMap<String, HashMap<String, MockFile>>,
	pull_requests: Vec<MockPullRequest>,
}

/// Mock repository client that stores all state in memory.
/// Thread-safe for use in async contexts.
pub struct MockRepoClient {
	state: Mutex<MockRepoState>,

	/// Counter for generating commit and blob SHAs
	next_sha: AtomicU64,

	/// Counter for generating pull request numbers
	next_pr_number: AtomicU64,

	/// When set, `create_pull_request` fails with `PermissionDenied`
	deny_pull_requests: AtomicBool,

	/// When set, the next `update_file` fails with a 409 conflict
	conflict_next_update: AtomicBool,

	/// Call log for asserting which operations ran
	call_log: Mutex<Vec<String>>,
}

impl Default for MockRepoClient {
	fn default() -> Self {
		Self::new()
	}
}

impl MockRepoClient {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(MockRepoState::default()),
			next_sha: AtomicU64::new(1000),
			next_pr_number: AtomicU64::new(1),
			deny_pull_requests: AtomicBool::new(false),
			conflict_next_update: AtomicBool::new(false),
			call_log: Mutex::new(Vec::new()),
		}
	}

	fn fresh_sha(&self) -> String {
		format!("sha{:07}", self.next_sha.fetch_add(1, Ordering::SeqCst))
	}

	fn log_call(&self, call: &str) {
		self.call_log.lock().unwrap().push(call.to_string());
	}

	/// Seed a branch with the given files, generating a head SHA and blob SHAs.
	pub fn seed_branch(&self, branch: &str, files: &[(&str, &str)]) {
		let head_sha = self.fresh_sha();
		let mut state = self.state.lock().unwrap();
		state.branches.insert(branch.to_string(), head_sha);
		let branch_files = state.files.entry(branch.to_string()).or_default();
		for (path, content) in files {
			let sha = format!("blob{:07}", self.next_sha.fetch_add(1, Ordering::SeqCst));
			branch_files.insert(path.to_string(), MockFile { content: content.to_string(), sha });
		}
	}

	/// Make subsequent `create_pull_request` calls fail with `PermissionDenied`.
	pub fn deny_pull_requests(&self) {
		self.deny_pull_requests.store(true, Ordering::SeqCst);
	}

	/// Make the next `update_file` call fail with a 409 conflict, simulating
	/// another actor mutating the branch between the SHA read and the write.
	pub fn conflict_next_update(&self) {
		self.conflict_next_update.store(true, Ordering::SeqCst);
	}

	pub fn calls(&self) -> Vec<String> {
		self.call_log.lock().unwrap().clone()
	}

	pub fn branch_exists(&self, branch: &str) -> bool {
		self.state.lock().unwrap().branches.contains_key(branch)
	}

	pub fn file_content(&self, branch: &str, path: &str) -> Option<String> {
		self.state.lock().unwrap().files.get(branch).and_then(|f| f.get(path)).map(|f| f.content.clone())
	}

	pub fn pull_requests(&self) -> Vec<MockPullRequest> {
		self.state.lock().unwrap().pull_requests.clone()
	}
}

#[async_trait]
impl RepoClient for MockRepoClient {
	#[instrument(skip(self), name = "MockRepoClient::get_head_sha")]
	async fn get_head_sha(&self, repo: &RepoInfo, branch: &str) -> Result<String, RepoError> {
		tracing::info!(target: "mock_github", %repo, branch, "get_head_sha");
		self.log_call(&format!("get_head_sha({branch})"));

		let state = self.state.lock().unwrap();
		state.branches.get(branch).cloned().ok_or_else(|| RepoError::NotFound(format!("branch {branch}")))
	}

	#[instrument(skip(self), name = "MockRepoClient::create_ref")]
	async fn create_ref(&self, repo: &RepoInfo, name: &str, sha: &str) -> Result<(), RepoError> {
		tracing::info!(target: "mock_github", %repo, name, sha, "create_ref");
		self.log_call(&format!("create_ref({name}, {sha})"));

		let mut state = self.state.lock().unwrap();
		if state.branches.contains_key(name) {
			return Err(RepoError::AlreadyExists(format!("branch {name}")));
		}

		// The new branch points at the same commit as its source, so it sees
		// the same files.
		let source = state.branches.iter().find(|(_, head)| head.as_str() == sha).map(|(branch, _)| branch.clone());
		let Some(source) = source else {
			return Err(RepoError::Api {
				context: "create_ref",
				status: StatusCode::UNPROCESSABLE_ENTITY,
				body: format!("object {sha} does not exist"),
			});
		};

		let files = state.files.get(&source).cloned().unwrap_or_default();
		state.branches.insert(name.to_string(), sha.to_string());
		state.files.insert(name.to_string(), files);
		Ok(())
	}

	#[instrument(skip(self), name = "MockRepoClient::get_file_sha")]
	async fn get_file_sha(&self, repo: &RepoInfo, path: &str, branch: &str) -> Result<String, RepoError> {
		tracing::info!(target: "mock_github", %repo, path, branch, "get_file_sha");
		self.log_call(&format!("get_file_sha({path}, {branch})"));

		let state = self.state.lock().unwrap();
		state
			.files
			.get(branch)
			.and_then(|files| files.get(path))
			.map(|file| file.sha.clone())
			.ok_or_else(|| RepoError::NotFound(format!("{path} on {branch}")))
	}

	#[instrument(skip(self, content), name = "MockRepoClient::update_file")]
	async fn update_file(&self, repo: &RepoInfo, path: &str, message: &str, content: &str, sha: &str, branch: &str) -> Result<(), RepoError> {
		tracing::info!(target: "mock_github", %repo, path, branch, message, "update_file");
		self.log_call(&format!("update_file({path}, {branch})"));

		if self.conflict_next_update.swap(false, Ordering::SeqCst) {
			return Err(RepoError::Api {
				context: "update_file",
				status: StatusCode::CONFLICT,
				body: format!("{path} does not match {sha}"),
			});
		}

		let new_blob_sha = format!("blob{:07}", self.next_sha.fetch_add(1, Ordering::SeqCst));
		let new_head_sha = self.fresh_sha();

		let mut state = self.state.lock().unwrap();
		let file = state
			.files
			.get_mut(branch)
			.and_then(|files| files.get_mut(path))
			.ok_or_else(|| RepoError::NotFound(format!("{path} on {branch}")))?;

		if file.sha != sha {
			return Err(RepoError::Api {
				context: "update_file",
				status: StatusCode::CONFLICT,
				body: format!("{path} does not match {sha}"),
			});
		}

		file.content = content.to_string();
		file.sha = new_blob_sha;
		state.branches.insert(branch.to_string(), new_head_sha);
		Ok(())
	}

	#[instrument(skip(self, body), name = "MockRepoClient::create_pull_request")]
	async fn create_pull_request(&self, repo: &RepoInfo, title: &str, body: &str, head: &str, base: &str) -> Result<String, RepoError> {
		tracing::info!(target: "mock_github", %repo, title, head, base, "create_pull_request");
		self.log_call(&format!("create_pull_request({head} -> {base})"));

		if self.deny_pull_requests.load(Ordering::SeqCst) {
			return Err(RepoError::PermissionDenied("create_pull_request: 403 - Resource not accessible by integration".to_string()));
		}

		let mut state = self.state.lock().unwrap();
		if state.pull_requests.iter().any(|pr| pr.head == head && pr.base == base) {
			return Err(RepoError::AlreadyExists(format!("pull request {head} -> {base}")));
		}

		let number = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
		let url = format!("https://github.com/{}/{}/pull/{number}", repo.owner(), repo.repo());
		state.pull_requests.push(MockPullRequest {
			title: title.to_string(),
			body: body.to_string(),
			head: head.to_string(),
			base: base.to_string(),
			url: url.clone(),
		});
		Ok(url)
	}
}
