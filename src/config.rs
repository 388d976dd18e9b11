//! Invocation-scoped configuration.
//!
//! Everything a run needs (credentials, repository coordinates, paths,
//! timeout) is collected once into [`Settings`] and passed explicitly into
//! each component. No module-level state: a second invocation with different
//! settings shares nothing with the first, and tests construct `Settings`
//! directly with fakes behind them.

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::error::HealError;

/// An `owner/repo` pair identifying the repository to publish against.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepoInfo {
	owner: String,
	repo: String,
}

impl RepoInfo {
	pub fn new(owner: &str, repo: &str) -> Self {
		Self {
			owner: owner.to_string(),
			repo: repo.to_string(),
		}
	}

	/// Parse from `owner/repo` or a GitHub repository URL
	/// (`https://github.com/owner/repo`, with or without a trailing `.git`).
	pub fn parse(s: &str) -> Result<Self, HealError> {
		let s = s.trim();
		let path = s
			.strip_prefix("https://")
			.or_else(|| s.strip_prefix("http://"))
			.unwrap_or(s)
			.strip_prefix("github.com/")
			.unwrap_or(s);
		let path = path.strip_suffix(".git").unwrap_or(path);

		let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
		match parts[..] {
			[owner, repo] => Ok(Self::new(owner, repo)),
			_ => Err(HealError::RemoteApi(format!("invalid repository `{s}`: expected owner/repo"))),
		}
	}

	pub fn owner(&self) -> &str {
		&self.owner
	}

	pub fn repo(&self) -> &str {
		&self.repo
	}
}

impl std::fmt::Display for RepoInfo {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.owner, self.repo)
	}
}

#[derive(Clone, Debug, Parser)]
#[command(name = "autoheal", about = "Self-healing CI/CD helper: merges AI-proposed config fixes and opens a pull request")]
pub struct Cli {
	/// Repository to publish the fix against, as owner/repo or a GitHub URL.
	#[arg(long)]
	pub repo: String,

	/// Configuration file the fix applies to, as a path relative to the
	/// repository root (also used as the local path).
	#[arg(long)]
	pub target_file: PathBuf,

	/// Repository-relative path of the target file, when it differs from
	/// --target-file (e.g. the helper runs outside the checkout root).
	#[arg(long)]
	pub repo_file: Option<String>,

	/// Branch pull requests are opened against.
	#[arg(long, default_value = "main")]
	pub base_branch: String,

	/// Deployment error log gating the whole run.
	#[arg(long, default_value = "error_log.txt")]
	pub error_log: PathBuf,

	/// Side-channel file receiving the raw AI suggestion for audit.
	#[arg(long, default_value = "ai_fix_suggestion.txt")]
	pub audit_file: PathBuf,

	/// Model name passed to the fix proposer.
	#[arg(long, default_value = "gpt-4")]
	pub model: String,

	/// Per-request timeout for remote calls, in seconds.
	#[arg(long, default_value_t = 30)]
	pub timeout_secs: u64,

	/// Use in-memory collaborators instead of real remotes (no credentials needed).
	#[arg(long)]
	pub mock: bool,

	#[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
	pub github_token: Option<String>,

	#[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
	pub openai_api_key: Option<String>,
}

/// Resolved configuration for one workflow invocation.
#[derive(Clone, Debug)]
pub struct Settings {
	pub repo: RepoInfo,
	pub base_branch: String,
	pub target_file: PathBuf,
	/// Repository-relative override for the contents API; defaults to
	/// `target_file`.
	pub repo_file: Option<String>,
	pub error_log: PathBuf,
	pub audit_file: PathBuf,
	pub model: String,
	pub api_timeout: Duration,
	/// Absent is fine in mock mode; the real client constructor rejects it.
	pub github_token: Option<String>,
	pub openai_api_key: Option<String>,
}

impl Settings {
	pub fn new(cli: &Cli) -> Result<Self, HealError> {
		Ok(Self {
			repo: RepoInfo::parse(&cli.repo)?,
			base_branch: cli.base_branch.clone(),
			target_file: cli.target_file.clone(),
			repo_file: cli.repo_file.clone(),
			error_log: cli.error_log.clone(),
			audit_file: cli.audit_file.clone(),
			model: cli.model.clone(),
			api_timeout: Duration::from_secs(cli.timeout_secs),
			github_token: cli.github_token.clone(),
			openai_api_key: cli.openai_api_key.clone(),
		})
	}

	/// The target file as a repository-relative path with forward slashes,
	/// suitable for the contents API.
	pub fn repo_path(&self) -> String {
		if let Some(repo_file) = &self.repo_file {
			return repo_file.clone();
		}
		let joined = self.target_file.components().filter_map(|c| c.as_os_str().to_str()).collect::<Vec<_>>().join("/");
		joined.strip_prefix("./").unwrap_or(&joined).to_string()
	}
}
