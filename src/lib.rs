//! Self-healing CI/CD helper.
//!
//! On a failed deployment, the workflow reads the error log, asks a generative
//! model for a corrected configuration, grafts the proposed changes into the
//! existing file with a conservative line-level merge, and publishes the result
//! as a pull request.
//!
//! The two remote collaborators (the fix proposer and the repository host) sit
//! behind narrow traits with real HTTP implementations and in-memory mocks, so
//! the whole pipeline is testable without network access.

pub mod config;
pub mod error;
pub mod format;
pub mod github;
pub mod merge;
pub mod mock_github;
pub mod proposal;
pub mod publish;
pub mod workflow;

pub use config::{RepoInfo, Settings};
pub use error::HealError;
