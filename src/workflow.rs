//! Orchestrator: detect error → propose → extract → merge → format → publish.
//!
//! Thin sequencing over the other modules. The only decision it makes itself
//! is the gate: a log without the substring "Error" means there is nothing to
//! heal, and no remote collaborator is contacted at all.

use crate::{
	HealError,
	config::Settings,
	format::format_content,
	github::BoxedRepoClient,
	merge::selective_merge,
	proposal::{FixProposer, extract_fenced_fix},
	publish::{PublishRequest, PublishWorkflow},
};

/// Terminal outcome of one invocation. All variants exit 0.
#[derive(Clone, Debug)]
pub enum Outcome {
	/// The log exists but contains no error; nothing was contacted.
	NoErrorDetected,
	/// The proposal touched no existing key, so there was nothing to publish.
	NothingToApply,
	/// A fix was merged, written locally, and published.
	Published { branch: String, pr_url: Option<String> },
}

pub async fn run(settings: &Settings, proposer: &dyn FixProposer, repo_client: BoxedRepoClient) -> Result<Outcome, HealError> {
	let error_log = tokio::fs::read_to_string(&settings.error_log).await.map_err(|source| HealError::SourceNotFound {
		path: settings.error_log.clone(),
		source,
	})?;

	if !error_log.contains("Error") {
		tracing::info!(log = %settings.error_log.display(), "no deployment error detected, nothing to do");
		return Ok(Outcome::NoErrorDetected);
	}

	let original = tokio::fs::read_to_string(&settings.target_file).await.map_err(|source| HealError::SourceNotFound {
		path: settings.target_file.clone(),
		source,
	})?;

	let response = proposer.propose(&error_log, &original).await?;

	// Raw suggestion goes to the audit side-channel before any processing, so
	// it survives even if the merge or publish fails.
	tokio::fs::write(&settings.audit_file, &response).await.map_err(|source| HealError::Io {
		path: settings.audit_file.clone(),
		source,
	})?;

	let proposal = extract_fenced_fix(&response);
	let merged = selective_merge(&original, &proposal);
	if merged == original {
		tracing::warn!("proposal did not touch any existing key, skipping publish");
		return Ok(Outcome::NothingToApply);
	}

	let formatted = format_content(&settings.target_file, &merged);

	tokio::fs::write(&settings.target_file, &formatted).await.map_err(|source| HealError::Io {
		path: settings.target_file.clone(),
		source,
	})?;

	let request = PublishRequest::new(settings.repo_path(), formatted, settings.base_branch.clone());
	let mut publish = PublishWorkflow::new(repo_client, settings.repo.clone());
	let report = publish.run(&request).await?;

	Ok(Outcome::Published {
		branch: report.branch,
		pr_url: report.pr_url,
	})
}
