//! Error taxonomy for a single workflow invocation.
//!
//! Only non-recoverable failures surface here. Recoverable outcomes are
//! absorbed where they occur:
//! - formatter parse failures fall back to the unformatted content (`format`)
//! - "already exists" from branch or PR creation is treated as success (`publish`)
//!
//! Everything in this enum terminates the invocation with a nonzero exit and a
//! human-readable message. No variant triggers an automatic retry within a run;
//! retries are the invoking scheduler's job.

use std::path::PathBuf;

use thiserror::Error;

use crate::github::RepoError;

#[derive(Debug, Error)]
pub enum HealError {
	/// A required credential was not supplied.
	#[error("missing credential: set the `{var}` environment variable")]
	MissingCredential { var: &'static str },

	/// The error log or the target configuration file is absent.
	#[error("{} not found", path.display())]
	SourceNotFound {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Failed to write a local artifact (merged file or audit side-channel).
	#[error("failed to write {}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Connectivity or timeout failure on a remote call.
	#[error("network failure (connectivity or timeout)")]
	Network(#[source] reqwest::Error),

	/// Non-2xx remote response that is neither an idempotent "already exists"
	/// nor a permission failure.
	#[error("remote API error: {0}")]
	RemoteApi(String),

	/// Remote authorization failure. Retrying with the same credential cannot
	/// succeed, so the message tells the caller what scope is missing.
	#[error("permission denied: {message}")]
	Permission { message: String },
}

impl From<RepoError> for HealError {
	fn from(e: RepoError) -> Self {
		match e {
			RepoError::Network(source) => Self::Network(source),
			RepoError::PermissionDenied(message) => Self::Permission { message },
			// AlreadyExists is absorbed inside PublishWorkflow; if one leaks
			// here it is a programming error, reported as a plain API error.
			other => Self::RemoteApi(other.to_string()),
		}
	}
}
